//! Tests for recording a round and replaying its acceptance walk.

use rand::rngs::mock::StepRng;
use spec_decode::{
    replay_round, AcceptanceSampler, DraftStep, Error, ProbabilityDistribution, RoundRecord,
    TargetPosition, Verdict,
};

fn dist(probs: &[f32]) -> ProbabilityDistribution {
    ProbabilityDistribution::new(probs.to_vec()).unwrap()
}

fn paris_record() -> RoundRecord {
    RoundRecord {
        prompt: "Paris is the capital of".to_string(),
        vocabulary: vec![
            " France".to_string(),
            " Germany".to_string(),
            " the".to_string(),
            ".".to_string(),
        ],
        draft_steps: vec![
            DraftStep::new(0, dist(&[0.9, 0.05, 0.03, 0.02])),
            DraftStep::new(1, dist(&[0.1, 0.8, 0.05, 0.05])),
            DraftStep::new(2, dist(&[0.1, 0.1, 0.7, 0.1])),
        ],
        target_positions: vec![
            TargetPosition::new(5, dist(&[0.95, 0.02, 0.02, 0.01])),
            TargetPosition::new(6, dist(&[0.1, 0.1, 0.05, 0.75])),
            TargetPosition::new(7, dist(&[0.1, 0.1, 0.6, 0.2])),
        ],
    }
}

#[test]
fn test_replay_rejection() {
    let record = paris_record();
    let mut sampler = AcceptanceSampler::with_rng(StepRng::new(u64::MAX, 0));

    let round = replay_round(&record, &mut sampler).unwrap();

    assert_eq!(round.text, "Paris is the capital of France.");
    assert_eq!(round.num_speculative_tokens(), 3);
    assert!(matches!(
        round.outcome.verdicts().last(),
        Some(Verdict::Resampled {
            rejected: 1,
            token: 3
        })
    ));
}

#[test]
fn test_record_survives_json() {
    let record = paris_record();
    let json = serde_json::to_string_pretty(&record).unwrap();
    let parsed: RoundRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, record);

    let mut first = AcceptanceSampler::with_seed(11);
    let mut second = AcceptanceSampler::with_seed(11);
    assert_eq!(
        replay_round(&record, &mut first).unwrap(),
        replay_round(&parsed, &mut second).unwrap()
    );
}

#[test]
fn test_to_record_matches_replay() {
    let record = paris_record();
    let mut sampler = AcceptanceSampler::with_rng(StepRng::new(0, 0));
    let round = replay_round(&record, &mut sampler).unwrap();

    assert_eq!(round.to_record(record.vocabulary.clone()), record);
    assert_eq!(round.text, "Paris is the capital of France Germany the");
}

#[test]
fn test_malformed_record_rejected() {
    // Draft distribution does not sum to 1.
    let json = r#"{
        "prompt": "a",
        "vocabulary": ["a", "b"],
        "draft_steps": [{"token": 0, "distribution": [0.9, 0.9]}],
        "target_positions": [{"position": 0, "distribution": [0.5, 0.5]}]
    }"#;
    assert!(serde_json::from_str::<RoundRecord>(json).is_err());
}

#[test]
fn test_replay_with_short_vocabulary() {
    let mut record = paris_record();
    record.vocabulary.truncate(1);
    let mut sampler = AcceptanceSampler::with_rng(StepRng::new(u64::MAX, 0));

    assert!(matches!(
        replay_round(&record, &mut sampler),
        Err(Error::Tokenization(_))
    ));
}
