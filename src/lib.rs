pub mod apply;
pub mod catalog;
pub mod cli;
pub mod derive;
pub mod document;
pub mod error;
pub mod filter;
pub mod infer;
pub mod issue;
pub mod pipeline;
pub mod schema;
pub mod table;
pub mod validate;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    catalog::{CatalogSnapshot, TableCatalog},
    cli::{CheckArgs, Cli, ColumnsArgs, Commands, OutputFormat, PipelineArgs, RelationsArgs},
    infer::{PipelineSchemaResult, infer_pipeline, infer_pipeline_schema, joinable_relations},
    pipeline::Pipeline,
};

pub use crate::{
    catalog::Catalogs,
    error::EngineError,
    infer::PipelineInference,
    issue::{Issue, IssueCode},
    schema::{Column, ColumnRef, ColumnType, InferredSchema, TableRef},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("pipeline_schema", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Check(args) => handle_check(&args),
        Commands::Steps(args) => handle_steps(&args),
        Commands::Relations(args) => handle_relations(&args),
        Commands::Columns(args) => handle_columns(&args),
    }
}

fn load_inputs(args: &PipelineArgs) -> Result<(Pipeline, CatalogSnapshot)> {
    let pipeline = Pipeline::load(&args.pipeline)?;
    let catalog = CatalogSnapshot::load(&args.catalog)?;
    debug!(
        "Loaded pipeline with {} step(s) and catalog with {} table(s), {} relation(s)",
        pipeline.steps.len(),
        catalog.tables.len(),
        catalog.relations.len()
    );
    Ok((pipeline, catalog))
}

fn handle_check(args: &CheckArgs) -> Result<()> {
    info!(
        "Checking pipeline {:?} against catalog {:?}",
        args.inputs.pipeline, args.inputs.catalog
    );
    let (pipeline, catalog) = load_inputs(&args.inputs)?;
    let result = infer_pipeline_schema(&pipeline, catalog.catalogs())
        .with_context(|| format!("Inferring schema for {:?}", args.inputs.pipeline))?;

    match args.format {
        OutputFormat::Json => println!("{}", document::to_json_string(&result)?),
        OutputFormat::Table => match &result {
            PipelineSchemaResult::Success { schema } => print!("{}", table::render_schema(schema)),
            PipelineSchemaResult::Failure { issues, .. } => {
                print!("{}", table::render_issues(issues))
            }
        },
    }

    match result {
        PipelineSchemaResult::Success { schema } => {
            info!(
                "Pipeline is valid; {} column(s) and {} relation(s) in the final schema",
                schema.columns.len(),
                schema.relations.len()
            );
            Ok(())
        }
        PipelineSchemaResult::Failure { step_index, issues } => Err(anyhow!(
            "Pipeline is invalid at step {} ({} issue(s))",
            step_index + 1,
            issues.len()
        )),
    }
}

fn handle_steps(args: &PipelineArgs) -> Result<()> {
    let (pipeline, catalog) = load_inputs(args)?;
    let inference = infer_pipeline(&pipeline, catalog.catalogs())
        .with_context(|| format!("Inferring schema for {:?}", args.pipeline))?;

    println!("from {}", pipeline.from);
    print!("{}", table::render_schema(inference.seed()));
    for (index, schema) in inference.outputs().iter().enumerate() {
        println!();
        println!("step {} - {}", index + 1, pipeline.steps[index].kind());
        print!("{}", table::render_schema(schema));
    }

    if let Some((step_index, issues)) = inference.failure() {
        println!();
        print!("{}", table::render_issues(issues));
        let skipped = pipeline.steps.len() - step_index - 1;
        if skipped > 0 {
            info!("{skipped} step(s) after the invalid step were not evaluated");
        }
        bail!("Pipeline is invalid at step {}", step_index + 1);
    }
    Ok(())
}

fn handle_relations(args: &RelationsArgs) -> Result<()> {
    let (pipeline, catalog) = load_inputs(&args.inputs)?;
    let inference = infer_pipeline(&pipeline, catalog.catalogs())
        .with_context(|| format!("Inferring schema for {:?}", args.inputs.pipeline))?;

    let schema = match args.step {
        Some(step) => inference.input_schema(step).ok_or_else(|| {
            anyhow!(
                "Step {step} is not reachable: only {} step(s) are valid",
                inference.valid_steps()
            )
        })?,
        None => inference.final_schema(),
    };
    let candidates = joinable_relations(schema, catalog.catalogs());
    if candidates.is_empty() {
        info!("No relations can be joined from this position");
        return Ok(());
    }
    print!("{}", table::render_candidates(&candidates));
    info!("Listed {} joinable relation(s)", candidates.len());
    Ok(())
}

fn handle_columns(args: &ColumnsArgs) -> Result<()> {
    let catalog = CatalogSnapshot::load(&args.catalog)?;
    let table = catalog
        .resolve_table(&args.table)
        .ok_or_else(|| anyhow!("Table '{}' is not in catalog {:?}", args.table, args.catalog))?;
    if table.columns.is_empty() {
        info!("Table '{}' does not define any columns", table.id);
        return Ok(());
    }
    print!("{}", table::render_table_columns(table));
    info!("Listed {} column(s) of '{}'", table.columns.len(), table.id);
    Ok(())
}
