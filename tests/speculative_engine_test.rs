//! Integration tests for SpeculativeEngine with scripted providers.

use std::cell::Cell;
use std::rc::Rc;

use rand::rngs::mock::StepRng;
use spec_decode::{
    AcceptanceSampler, Error, ModelRole, ProbabilityDistribution, Result, SpeculativeConfig,
    SpeculativeEngine, StaticVocabulary, TokenDistributionProvider,
};

const PROMPT: &str = "Paris is the capital of";

fn dist(probs: &[f32]) -> ProbabilityDistribution {
    ProbabilityDistribution::new(probs.to_vec()).unwrap()
}

fn vocabulary() -> StaticVocabulary {
    StaticVocabulary::new(
        [" France", " Germany", " the", "."]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    )
}

/// Draft provider returning its scripted distributions in turn.
struct ScriptedDraft {
    steps: Vec<ProbabilityDistribution>,
    calls: Rc<Cell<usize>>,
    contexts: Vec<String>,
}

impl ScriptedDraft {
    fn new(steps: Vec<ProbabilityDistribution>) -> Self {
        Self {
            steps,
            calls: Rc::new(Cell::new(0)),
            contexts: Vec::new(),
        }
    }
}

impl TokenDistributionProvider for ScriptedDraft {
    fn vocab_size(&self) -> usize {
        self.steps[0].len()
    }

    fn next_token_distribution(&mut self, context: &str) -> Result<ProbabilityDistribution> {
        let call = self.calls.get();
        self.calls.set(call + 1);
        self.contexts.push(context.to_string());
        Ok(self.steps[call % self.steps.len()].clone())
    }

    fn position_distributions(&mut self, _context: &str) -> Result<Vec<ProbabilityDistribution>> {
        unreachable!("draft provider is only asked for next-token distributions")
    }
}

/// Target provider returning the same positions for every context.
struct ScriptedTarget {
    positions: Vec<ProbabilityDistribution>,
    calls: Rc<Cell<usize>>,
}

impl ScriptedTarget {
    /// `matched` are the distributions for the K draft offsets; they are
    /// surrounded by prompt positions and the trailing bonus position.
    fn new(matched: Vec<ProbabilityDistribution>) -> Self {
        let vocab = matched[0].len();
        let filler = ProbabilityDistribution::uniform(vocab).unwrap();
        let mut positions = vec![filler.clone(); 5];
        positions.extend(matched);
        positions.push(filler);
        Self {
            positions,
            calls: Rc::new(Cell::new(0)),
        }
    }
}

impl TokenDistributionProvider for ScriptedTarget {
    fn vocab_size(&self) -> usize {
        self.positions[0].len()
    }

    fn next_token_distribution(&mut self, _context: &str) -> Result<ProbabilityDistribution> {
        unreachable!("target provider is only asked for position distributions")
    }

    fn position_distributions(&mut self, _context: &str) -> Result<Vec<ProbabilityDistribution>> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.positions.clone())
    }
}

struct FailingProvider {
    role: ModelRole,
    vocab_size: usize,
}

impl TokenDistributionProvider for FailingProvider {
    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn next_token_distribution(&mut self, _context: &str) -> Result<ProbabilityDistribution> {
        Err(Error::provider(self.role, "context too long"))
    }

    fn position_distributions(&mut self, _context: &str) -> Result<Vec<ProbabilityDistribution>> {
        Err(Error::provider(self.role, "context too long"))
    }
}

/// Draft proposes ids 0, 1, 2 with q = 0.9, 0.8, 0.7.
fn paris_draft() -> ScriptedDraft {
    ScriptedDraft::new(vec![
        dist(&[0.9, 0.05, 0.03, 0.02]),
        dist(&[0.1, 0.8, 0.05, 0.05]),
        dist(&[0.1, 0.1, 0.7, 0.1]),
    ])
}

/// Target assigns p = 0.95, 0.1, 0.6 to the drafted ids.
fn paris_target() -> ScriptedTarget {
    ScriptedTarget::new(vec![
        dist(&[0.95, 0.02, 0.02, 0.01]),
        dist(&[0.1, 0.1, 0.05, 0.75]),
        dist(&[0.1, 0.1, 0.6, 0.2]),
    ])
}

/// Target agreeing with the draft at every drafted id.
fn agreeing_target() -> ScriptedTarget {
    ScriptedTarget::new(paris_draft().steps)
}

fn config() -> SpeculativeConfig {
    SpeculativeConfig::default().num_tokens(3)
}

#[test]
fn test_rejection_at_second_offset() {
    let target = paris_target();
    let target_calls = Rc::clone(&target.calls);
    let sampler = AcceptanceSampler::with_rng(StepRng::new(u64::MAX, 0));
    let mut engine =
        SpeculativeEngine::with_sampler(paris_draft(), target, vocabulary(), config(), sampler)
            .unwrap();

    let round = engine.run_round(PROMPT).unwrap();

    assert_eq!(round.tokens(), vec![0, 3]);
    assert_eq!(round.fragments, vec![" France", "."]);
    assert_eq!(round.text, "Paris is the capital of France.");
    assert!(round.outcome.was_resampled());
    assert_eq!(round.outcome.num_accepted(), 1);
    assert_eq!(target_calls.get(), 1);
}

#[test]
fn test_draft_extends_context_greedily() {
    let sampler = AcceptanceSampler::with_rng(StepRng::new(0, 0));
    let mut engine =
        SpeculativeEngine::with_sampler(paris_draft(), paris_target(), vocabulary(), config(), sampler)
            .unwrap();

    let round = engine.run_round(PROMPT).unwrap();

    assert_eq!(
        engine.draft().contexts,
        vec![
            PROMPT.to_string(),
            format!("{PROMPT} France"),
            format!("{PROMPT} France Germany"),
        ]
    );
    assert_eq!(round.tokens(), vec![0, 1, 2]);
    assert_eq!(round.text, "Paris is the capital of France Germany the");
    let matched: Vec<usize> = round.target_positions.iter().map(|p| p.position).collect();
    assert_eq!(matched, vec![5, 6, 7]);
}

#[test]
fn test_all_accepted_returns_exactly_k() {
    let mut engine = SpeculativeEngine::new(
        paris_draft(),
        agreeing_target(),
        vocabulary(),
        config(),
    )
    .unwrap();

    let round = engine.run_round(PROMPT).unwrap();
    assert_eq!(round.tokens().len(), 3);
    assert!(!round.outcome.was_resampled());
}

#[test]
fn test_forced_acceptance_is_deterministic() {
    let texts: Vec<String> = (0..5)
        .map(|_| {
            let mut engine =
                SpeculativeEngine::new(paris_draft(), agreeing_target(), vocabulary(), config())
                    .unwrap();
            engine.run_round(PROMPT).unwrap().text
        })
        .collect();

    assert!(texts.iter().all(|t| t == &texts[0]));
}

#[test]
fn test_same_seed_same_round() {
    let run = |seed: u64| {
        let mut engine = SpeculativeEngine::new(
            paris_draft(),
            paris_target(),
            vocabulary(),
            config().seed(seed),
        )
        .unwrap();
        engine.run_round(PROMPT).unwrap()
    };

    for seed in [0, 7, 31337] {
        let first = run(seed);
        assert_eq!(first.outcome, run(seed).outcome);
        assert!(first.outcome.verdicts()[0].is_accepted());
    }
}

#[test]
fn test_zero_speculative_tokens_rejected() {
    let result = SpeculativeEngine::new(
        paris_draft(),
        paris_target(),
        vocabulary(),
        SpeculativeConfig::default().num_tokens(0),
    );
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_vocabulary_size_mismatch() {
    let draft = ScriptedDraft::new(vec![dist(&[0.5, 0.5])]);
    let result = SpeculativeEngine::new(draft, paris_target(), vocabulary(), config());
    assert!(matches!(
        result,
        Err(Error::VocabularySizeMismatch { draft: 2, target: 4 })
    ));
}

#[test]
fn test_draft_failure_propagates() {
    let draft = FailingProvider {
        role: ModelRole::Draft,
        vocab_size: 4,
    };
    let target = paris_target();
    let target_calls = Rc::clone(&target.calls);
    let mut engine = SpeculativeEngine::new(draft, target, vocabulary(), config()).unwrap();

    let err = engine.run_round(PROMPT).unwrap_err();
    assert!(matches!(
        err,
        Error::Provider {
            role: ModelRole::Draft,
            ..
        }
    ));
    assert_eq!(target_calls.get(), 0);
}

#[test]
fn test_target_failure_propagates() {
    let target = FailingProvider {
        role: ModelRole::Target,
        vocab_size: 4,
    };
    let mut engine = SpeculativeEngine::new(paris_draft(), target, vocabulary(), config()).unwrap();

    let err = engine.run_round(PROMPT).unwrap_err();
    assert_eq!(err.to_string(), "target provider failed: context too long");
}

#[test]
fn test_short_target_pass_is_misaligned() {
    let mut target = paris_target();
    target.positions.truncate(3);
    let mut engine = SpeculativeEngine::new(paris_draft(), target, vocabulary(), config()).unwrap();

    assert!(matches!(
        engine.run_round(PROMPT),
        Err(Error::MisalignedVerification {
            positions: 3,
            speculative: 3
        })
    ));
}

#[test]
fn test_generate_chains_rounds() {
    let target = agreeing_target();
    let target_calls = Rc::clone(&target.calls);
    let mut engine =
        SpeculativeEngine::new(paris_draft(), target, vocabulary(), config().seed(1)).unwrap();

    let output = engine.generate(PROMPT, 7).unwrap();

    assert_eq!(output.tokens, vec![0, 1, 2, 0, 1, 2, 0]);
    assert_eq!(
        output.text,
        "Paris is the capital of France Germany the France Germany the France"
    );
    assert_eq!(output.stats.rounds, 3);
    assert_eq!(output.stats.draft_tokens_proposed, 9);
    assert_eq!(output.stats.draft_tokens_accepted, 9);
    assert_eq!(output.stats.acceptance_rate(), 1.0);
    assert_eq!(output.stats.target_passes(), 3);
    assert_eq!(target_calls.get(), 3);

    // Each round starts from the previous round's text.
    assert_eq!(engine.draft().contexts[3], format!("{PROMPT} France Germany the"));
}

#[test]
fn test_generate_zero_budget() {
    let mut engine =
        SpeculativeEngine::new(paris_draft(), agreeing_target(), vocabulary(), config()).unwrap();
    let output = engine.generate(PROMPT, 0).unwrap();
    assert_eq!(output.text, PROMPT);
    assert!(output.tokens.is_empty());
    assert_eq!(output.stats.rounds, 0);
}
