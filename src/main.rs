use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use spec_decode::{
    load_config, replay_round, AcceptanceSampler, DecoderConfig, RoundRecord, Verdict,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "spec-decode", version)]
#[command(about = "Speculative decoding acceptance sampling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rerun the acceptance walk of a recorded round
    Replay {
        /// Path to a round record (JSON)
        record: PathBuf,

        /// Configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Seed for the acceptance RNG
        #[arg(long)]
        seed: Option<u64>,

        /// Round probabilities to this many decimal digits before comparing
        #[arg(long)]
        precision: Option<u32>,
    },
    /// Print the default configuration
    Config,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Replay {
            record,
            config,
            seed,
            precision,
        } => {
            let mut config = match config {
                Some(path) => load_config(&path)?,
                None => DecoderConfig::default(),
            };
            if seed.is_some() {
                config.speculative.seed = seed;
            }
            if precision.is_some() {
                config.speculative.probability_precision = precision;
            }
            config.speculative.validate()?;

            let content = std::fs::read_to_string(&record)
                .with_context(|| format!("failed to read {}", record.display()))?;
            let record: RoundRecord = serde_json::from_str(&content)
                .with_context(|| format!("failed to parse {}", record.display()))?;
            info!(k = record.num_speculative_tokens(), "replaying round");

            let mut sampler = match config.speculative.seed {
                Some(seed) => AcceptanceSampler::with_seed(seed),
                None => AcceptanceSampler::new(),
            }
            .precision(config.speculative.probability_precision);

            let round = replay_round(&record, &mut sampler)?;

            println!("Prompt: {}", round.prompt);
            for (offset, (verdict, fragment)) in round
                .outcome
                .verdicts()
                .iter()
                .zip(&round.fragments)
                .enumerate()
            {
                match verdict {
                    Verdict::Accepted { token, acceptance } => {
                        println!("  [{offset}] accept {token} {fragment:?} ({acceptance:?})")
                    }
                    Verdict::Resampled { rejected, token } => {
                        println!("  [{offset}] reject {rejected}, resample {token} {fragment:?}")
                    }
                }
            }
            println!(
                "Accepted {}/{} draft tokens",
                round.outcome.num_accepted(),
                round.num_speculative_tokens()
            );
            println!("Final output: {}", round.text);
        }

        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&DecoderConfig::default())?);
        }
    }

    Ok(())
}
