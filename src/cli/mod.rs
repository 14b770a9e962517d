// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with clap.
// All work is delegated to Layer 2 (application).
//
// Commands:
//   1. `inspect` — assemble one record and print a summary
//   2. `split`   — show the seeded train/validation split
//   3. `batch`   — pull a few batches through Burn's loader
//   4. `config`  — dump the effective configuration
//   5. `pretrain` — summarise a pretraining config

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{BatchArgs, Commands, ConfigArgs, ConfigOverrides, InspectArgs, PretrainArgs};

use crate::domain::record::Mode;

type CpuBackend = burn::backend::NdArray;

#[derive(Parser, Debug)]
#[command(
    name = "mmfeat",
    version = "0.1.0",
    about = "Assemble multimodal (video features + text) samples for classification finetuning."
)]
pub struct Cli {
    #[command(flatten)]
    pub overrides: ConfigOverrides,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match &self.command {
            Commands::Inspect(args)  => self.run_inspect(args),
            Commands::Split          => self.run_split(),
            Commands::Batch(args)    => self.run_batch(args),
            Commands::Config(args)   => self.run_config(args),
            Commands::Pretrain(args) => run_pretrain(args),
        }
    }

    fn run_inspect(&self, args: &InspectArgs) -> Result<()> {
        use crate::application::inspect_use_case::InspectUseCase;

        let mode = if args.infer { Mode::Inference } else { Mode::Train };
        let summary = InspectUseCase::new(self.overrides.resolve()?, mode).inspect(args.index)?;
        println!("{summary}");
        Ok(())
    }

    fn run_split(&self) -> Result<()> {
        use crate::application::loader_use_case::LoaderUseCase;

        let cfg = self.overrides.resolve()?;
        let (ratio, seed) = (cfg.val_ratio, cfg.seed);
        let (train, val) = LoaderUseCase::new(cfg).split()?;
        println!(
            "train: {}  validation: {}  (val_ratio {ratio}, seed {seed})",
            train.len(),
            val.len()
        );
        Ok(())
    }

    fn run_batch(&self, args: &BatchArgs) -> Result<()> {
        use crate::application::loader_use_case::LoaderUseCase;

        let cfg = self.overrides.resolve()?;
        let device = burn::backend::ndarray::NdArrayDevice::default();
        let loaders = LoaderUseCase::new(cfg).build::<CpuBackend>(device)?;
        loaders.set_epoch(args.epoch);

        let mut seen = 0;
        for (i, batch) in loaders.train.iter().take(args.batches).enumerate() {
            tracing::info!(
                "batch {}: frame_input {:?}, title_input {:?}, labels {:?}",
                i,
                batch.frame_input.dims(),
                batch.title_input.dims(),
                batch.label.as_ref().map(|l| l.dims())
            );
            seen += 1;
        }

        println!("Pulled {seen} training batches.");
        Ok(())
    }

    fn run_config(&self, args: &ConfigArgs) -> Result<()> {
        let cfg = self.overrides.resolve()?;
        match &args.output {
            Some(path) => {
                cfg.save(path)?;
                println!("Config written to '{path}'");
            }
            None => println!("{}", serde_json::to_string_pretty(&cfg)?),
        }
        Ok(())
    }
}

fn run_pretrain(args: &PretrainArgs) -> Result<()> {
    use crate::infra::config::{PretrainConfig, PretrainTask};

    let cfg = match &args.file {
        Some(path) => PretrainConfig::load(path)?,
        None => PretrainConfig::default(),
    };

    let enabled: Vec<&str> = [
        (PretrainTask::Mlm, "mlm"),
        (PretrainTask::Mfm, "mfm"),
        (PretrainTask::Itm, "itm"),
        (PretrainTask::Itc, "itc"),
    ]
    .into_iter()
    .filter(|(task, _)| cfg.uses(*task))
    .map(|(_, name)| name)
    .collect();

    println!("tasks:  {}", enabled.join(", "));
    println!(
        "shards: {} ({:?} loading), {} fold(s), seed {}",
        cfg.pretrain_file_num, cfg.load_data_type, cfg.num_folds, cfg.seed
    );
    Ok(())
}
