use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgAction, Parser};

use crate::config::{Config, DEFAULT_CONFIG_FILE};
use crate::git::GitRepository;
use crate::orchestrator::{DEFAULT_JOBS, Orchestrator};

/// Incrementally deploy a git revision to every configured target.
#[derive(Parser, Debug)]
#[command(name = "git-deploy")]
#[command(version, about, disable_help_flag = true)]
pub struct Cli {
    /// Revision to deploy (defaults to the source tree's HEAD)
    pub revision: Option<String>,

    /// Hard deploy: ignore recorded commits and copy the full tree
    #[arg(short = 'h', long = "hard")]
    pub hard: bool,

    /// Configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Number of targets to work on at once
    #[arg(short, long, default_value_t = DEFAULT_JOBS)]
    pub jobs: usize,

    /// Show what would be deployed without locking or writing
    #[arg(long)]
    pub dry_run: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

impl Cli {
    /// Run the deploy described by the arguments. Returns whether
    /// every target was deployed.
    pub fn execute(&self) -> anyhow::Result<bool> {
        let config = Config::load(&self.config)
            .with_context(|| format!("unable to load {}", self.config.display()))?;
        let repository = GitRepository::open(Path::new(&config.source_path))?;
        let target_count = config.targets.len();

        let orchestrator = Orchestrator::new(config, Arc::new(repository))
            .hard(self.hard)
            .jobs(self.jobs);

        if self.dry_run {
            let report = orchestrator.dry_run(self.revision.as_deref())?;
            print!("{}", report.render());
            return Ok(true);
        }

        eprintln!("Deploying to {target_count} targets...");
        let report = orchestrator.run(self.revision.as_deref())?;
        print!("{}", report.render());
        Ok(report.success())
    }
}
