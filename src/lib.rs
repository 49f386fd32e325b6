pub mod cli;
pub mod error;
pub mod loader;
pub mod model;
pub mod parser;
pub mod processor;
pub mod writer;

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{CommandFactory, Parser};
use log::info;

use crate::cli::{Cli, Command};
use crate::loader::{RunConfig, RunOutcome};
use crate::writer::bin::PackageSummary;

pub const CX_VERSION: &str = "1.0";

pub fn run() -> anyhow::Result<()> {
    let args = Cli::parse();

    match (args.command, args.package) {
        (Some(Command::Build(build_args)), _) => {
            build(&build_args.source, &build_args.out_dir)?;
        }
        (Some(Command::Run(run_args)), _) => {
            let mut config = RunConfig::default();
            if let Some(root) = run_args.scratch_root {
                config.scratch_root = root;
            }
            run_app(&run_args.package, &config)?;
        }
        (Some(Command::Version), _) => {
            println!("CX Programming Language v{CX_VERSION}");
        }
        (None, Some(package)) => {
            if package.extension().is_none_or(|ext| ext != model::package::PACKAGE_EXT) {
                bail!(
                    "Unknown command '{}'\nUse 'cx help' for usage information",
                    package.display()
                );
            }
            run_app(&package, &RunConfig::default())?;
        }
        (None, None) => {
            Cli::command().print_help()?;
        }
    }
    Ok(())
}

/// `cx build`: source → model → package.
pub fn build(source: &Path, out_dir: &Path) -> anyhow::Result<(PathBuf, PackageSummary)> {
    // 1. ── Parse ──────────────────────────────────────────────────────
    if !source.exists() {
        bail!("{} not found", source.display());
    }
    info!("Checking for {}..", source.display());
    let model = parser::load(source).with_context(|| format!("Parsing {}", source.display()))?;

    // 2. ── Process ────────────────────────────────────────────────────
    let processed = processor::run(&model).with_context(|| "Validating / compressing project")?;
    info!("Building app: {}..", processed.settings.project);

    // 3. ── Write outputs ──────────────────────────────────────────────
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Creating {}", out_dir.display()))?;
    writer::bin::emit(&processed, out_dir).with_context(|| "Writing package")
}

/// `cx <app.cxA>`: unpack and run a package.
pub fn run_app(package: &Path, config: &RunConfig) -> anyhow::Result<RunOutcome> {
    loader::run_package(package, config)
}
