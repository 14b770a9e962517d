// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Subcommands `inspect`, `split`, `batch`, `config` and
// `pretrain`, plus the config overrides shared by all of them.
//
// Overrides are applied on top of the --config file (or the
// built-in defaults), so
//
//   mmfeat --config run.json --max-frames 16 inspect --index 3
//
// uses run.json with max_frames replaced.

use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};

use crate::data::archive::FallbackPolicy;
use crate::infra::config::PipelineConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Assemble one record and print its shapes, masks and label
    Inspect(InspectArgs),

    /// Report the seeded train/validation split
    Split,

    /// Run the training loader on the CPU and log batch shapes
    Batch(BatchArgs),

    /// Print the resolved config, or write it to a file
    Config(ConfigArgs),

    /// Show the objectives and shard layout of a pretraining config
    Pretrain(PretrainArgs),
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Record index in the annotation file
    #[arg(long, default_value_t = 0)]
    pub index: usize,

    /// Use inference limits and skip the label
    #[arg(long)]
    pub infer: bool,
}

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// How many training batches to pull
    #[arg(long, default_value_t = 2)]
    pub batches: usize,

    /// Epoch number used for random frame selection
    #[arg(long, default_value_t = 0)]
    pub epoch: u64,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Write the resolved config here instead of printing it
    #[arg(long)]
    pub output: Option<String>,
}

#[derive(Args, Debug)]
pub struct PretrainArgs {
    /// Pretraining JSON config; defaults are shown when omitted
    #[arg(long)]
    pub file: Option<String>,
}

/// CLI spelling of FallbackPolicy
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum FallbackArg {
    /// Only a missing entry moves on to the second shard
    MissingOnly,
    /// Any first-shard failure moves on to the second shard
    AnyError,
}

impl From<FallbackArg> for FallbackPolicy {
    fn from(a: FallbackArg) -> Self {
        match a {
            FallbackArg::MissingOnly => FallbackPolicy::MissingOnly,
            FallbackArg::AnyError    => FallbackPolicy::AnyError,
        }
    }
}

/// Settings that override the config file
#[derive(Args, Debug, Default)]
pub struct ConfigOverrides {
    /// JSON config file; defaults are used when omitted
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Directory with labeled_0.zip and labeled_1.zip
    #[arg(long, global = true)]
    pub feature_dir: Option<String>,

    /// JSON annotation file
    #[arg(long, global = true)]
    pub annotation: Option<String>,

    /// Directory with tokenizer.json or vocab.txt
    #[arg(long, global = true)]
    pub bert_dir: Option<String>,

    /// Category list, one id per line
    #[arg(long, global = true)]
    pub category_list: Option<String>,

    /// Keep case when building the tokenizer from vocab.txt
    #[arg(long, global = true)]
    pub cased: bool,

    #[arg(long, global = true)]
    pub max_frames: Option<usize>,

    #[arg(long, global = true)]
    pub bert_seq_length: Option<usize>,

    /// Loader worker threads (0 = load on the calling thread)
    #[arg(long, global = true)]
    pub num_workers: Option<usize>,

    #[arg(long, global = true)]
    pub batch_size: Option<usize>,

    #[arg(long, global = true)]
    pub seed: Option<u64>,

    #[arg(long, global = true, value_enum)]
    pub fallback: Option<FallbackArg>,
}

impl ConfigOverrides {
    /// Config file (or defaults) with overrides applied, validated
    pub fn resolve(&self) -> Result<PipelineConfig> {
        let mut cfg = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(v) = &self.feature_dir   { cfg.feature_dir = v.clone(); }
        if let Some(v) = &self.annotation    { cfg.annotation = v.clone(); }
        if let Some(v) = &self.bert_dir      { cfg.bert_dir = v.clone(); }
        if let Some(v) = &self.category_list { cfg.category_list = v.clone(); }
        if self.cased                         { cfg.lowercase = false; }
        if let Some(v) = self.max_frames      { cfg.max_frames = v; }
        if let Some(v) = self.bert_seq_length { cfg.bert_seq_length = v; }
        if let Some(v) = self.num_workers     { cfg.num_workers = v; }
        if let Some(v) = self.batch_size      { cfg.batch_size = v; }
        if let Some(v) = self.seed            { cfg.seed = v; }
        if let Some(v) = self.fallback        { cfg.fallback = v.into(); }

        cfg.validate()?;
        Ok(cfg)
    }
}
