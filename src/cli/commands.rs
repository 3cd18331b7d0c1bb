// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands `train`, `evaluate` and `test`
// and all their configurable flags. Model selection flags are
// shared through a flattened `ModelArgs`.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::{
    evaluate_use_case::EvalConfig,
    model_setup::ModelOptions,
    test_use_case::TestConfig,
    train_use_case::TrainConfig,
};
use crate::domain::arch::Arch;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fine-tune on <DATA>/train, validating on <DATA>/val every epoch
    Train(TrainArgs),

    /// Run one validation pass over <DATA>/val
    Evaluate(EvalArgs),

    /// Predict <DATA>/test and write entry.csv / entry2.csv into <DATA>
    Test(TestArgs),
}

/// Dataset root and model selection, shared by every subcommand
#[derive(Args, Debug)]
pub struct ModelArgs {
    /// Dataset root containing train/, val/ and test/
    #[arg(value_name = "DATA")]
    pub data: String,

    /// Backbone: resnet18, resnet34, resnet50, resnet101 or resnet152
    #[arg(long, default_value_t = Arch::default())]
    pub arch: Arch,

    /// torchvision .pth weights for --arch; freezes the backbone
    /// and replaces the classifier with a 7-way layer
    #[arg(long, value_name = "PATH")]
    pub pretrained: Option<String>,

    /// Checkpoint to resume from (.json / .mpk.gz extension optional)
    #[arg(long, value_name = "PATH")]
    pub resume: Option<String>,
}

impl ModelArgs {
    fn options(&self) -> ModelOptions {
        ModelOptions {
            arch:       self.arch,
            pretrained: self.pretrained.clone(),
            resume:     self.resume.clone(),
        }
    }
}

/// All arguments for the `train` command
#[derive(Args, Debug)]
pub struct TrainArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Number of total epochs to run
    #[arg(long, default_value_t = 90)]
    pub epochs: usize,

    /// Epoch to start at (overridden by --resume)
    #[arg(long, default_value_t = 0)]
    pub start_epoch: usize,

    /// Mini-batch size
    #[arg(short = 'b', long, default_value_t = 16)]
    pub batch_size: usize,

    /// Initial learning rate
    #[arg(long = "lr", visible_alias = "learning-rate", default_value_t = 1e-4)]
    pub lr: f64,

    /// L2 weight decay applied by Adam
    #[arg(long, default_value_t = 1e-4)]
    pub weight_decay: f64,

    /// Data loading workers
    #[arg(long, default_value_t = 4)]
    pub workers: usize,

    /// Log every N batches
    #[arg(long, default_value_t = 1)]
    pub print_freq: usize,

    /// Where checkpoints, metrics.csv and train_config.json go
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Decay the learning rate every N epochs
    #[arg(long, default_value_t = 30)]
    pub lr_step: usize,

    /// Multiplicative learning rate decay factor
    #[arg(long, default_value_t = 0.1)]
    pub lr_gamma: f64,

    /// Shuffle seed for the training loader
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            model:          a.model.options(),
            data_dir:       a.model.data,
            checkpoint_dir: a.checkpoint_dir,
            epochs:         a.epochs,
            start_epoch:    a.start_epoch,
            batch_size:     a.batch_size,
            lr:             a.lr,
            weight_decay:   a.weight_decay,
            workers:        a.workers,
            print_freq:     a.print_freq,
            lr_step:        a.lr_step,
            lr_gamma:       a.lr_gamma,
            seed:           a.seed,
        }
    }
}

/// All arguments for the `evaluate` command
#[derive(Args, Debug)]
pub struct EvalArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    #[arg(short = 'b', long, default_value_t = 16)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 4)]
    pub workers: usize,

    #[arg(long, default_value_t = 1)]
    pub print_freq: usize,
}

impl From<EvalArgs> for EvalConfig {
    fn from(a: EvalArgs) -> Self {
        EvalConfig {
            model:      a.model.options(),
            data_dir:   a.model.data,
            batch_size: a.batch_size,
            workers:    a.workers,
            print_freq: a.print_freq,
        }
    }
}

/// All arguments for the `test` command
#[derive(Args, Debug)]
pub struct TestArgs {
    #[command(flatten)]
    pub model: ModelArgs,
}

impl From<TestArgs> for TestConfig {
    fn from(a: TestArgs) -> Self {
        TestConfig {
            model:    a.model.options(),
            data_dir: a.model.data,
        }
    }
}
