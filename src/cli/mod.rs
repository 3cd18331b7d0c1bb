// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and hands each subcommand to its
// use case in Layer 2:
//   1. `train`    — fine-tune and checkpoint every epoch
//   2. `evaluate` — one validation pass
//   3. `test`     — write per-image / per-subject prediction CSVs

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvalArgs, TestArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "emotion-finetune",
    version = "0.1.0",
    about = "Fine-tune a pretrained ResNet for seven-class facial emotion recognition."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case. This layer only routes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
            Commands::Test(args)     => run_test(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on dataset: {}", args.model.data);
    let checkpoint_dir = args.checkpoint_dir.clone();
    let best = TrainUseCase::new(args.into()).execute()?;

    println!("Training complete. Best accuracy {:.3}%. Checkpoints in '{}'.", best, checkpoint_dir);
    Ok(())
}

fn run_evaluate(args: EvalArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let summary = EvaluateUseCase::new(args.into()).execute()?;
    println!(" * Accuracy {:.3}  Loss {:.4}", summary.accuracy, summary.loss);
    Ok(())
}

fn run_test(args: TestArgs) -> Result<()> {
    use crate::application::test_use_case::{TestUseCase, IMAGE_CSV, SUBJECT_CSV};

    let data = args.model.data.clone();
    let summary = TestUseCase::new(args.into()).execute()?;
    println!(
        "Wrote {} image predictions to {data}/{IMAGE_CSV} and {} subject predictions to {data}/{SUBJECT_CSV}",
        summary.images, summary.subjects
    );
    Ok(())
}
