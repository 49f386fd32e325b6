use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cx", author, version, about, args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
    /// Package (.cxA) to run
    pub package: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build an application package from main.cx
    Build(BuildArgs),
    /// Run an application package
    Run(RunArgs),
    /// Show version
    Version,
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Source file
    #[arg(long, default_value = crate::parser::SOURCE_FILE)]
    pub source: PathBuf,
    /// Directory the .cxA package is written to
    #[arg(short, long, default_value = ".")]
    pub out_dir: PathBuf,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Package (.cxA) to run
    pub package: PathBuf,
    /// Where the scratch directory is created (defaults to the system temp dir)
    #[arg(long)]
    pub scratch_root: Option<PathBuf>,
}
