use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about = "Infer and validate query pipeline schemas", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Validate a pipeline and print its resulting schema
    Check(CheckArgs),
    /// Print the schema after every valid step of a pipeline
    Steps(PipelineArgs),
    /// List relations a Relate step could join from a pipeline position
    Relations(RelationsArgs),
    /// List the columns of a catalog table
    Columns(ColumnsArgs),
}

#[derive(Debug, Args)]
pub struct PipelineArgs {
    /// Pipeline document (.json, otherwise YAML)
    #[arg(short = 'p', long = "pipeline")]
    pub pipeline: PathBuf,
    /// Catalog document describing tables and relations
    #[arg(short = 'c', long = "catalog")]
    pub catalog: PathBuf,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub inputs: PipelineArgs,
    /// Output format
    #[arg(long, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct RelationsArgs {
    #[command(flatten)]
    pub inputs: PipelineArgs,
    /// Zero-based step whose input schema is inspected (defaults to the end
    /// of the valid prefix)
    #[arg(long)]
    pub step: Option<usize>,
}

#[derive(Debug, Args)]
pub struct ColumnsArgs {
    /// Catalog document describing tables and relations
    #[arg(short = 'c', long = "catalog")]
    pub catalog: PathBuf,
    /// Table id to describe
    #[arg(short = 't', long = "table")]
    pub table: String,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}
