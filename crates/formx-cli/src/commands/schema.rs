//! Schema command - inspect and validate target schemas.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use console::style;

use formx_core::{MappingEngine, MappingRules, TargetSchema};

use super::load_config;

/// Arguments for the schema command.
#[derive(Args)]
pub struct SchemaArgs {
    #[command(subcommand)]
    command: SchemaCommand,
}

#[derive(Subcommand)]
enum SchemaCommand {
    /// Print a schema as JSON (the built-in one by default)
    Show {
        /// Schema file to print instead
        file: Option<PathBuf>,
    },

    /// Validate a schema file and the rules that target it
    Check {
        /// Schema file
        file: PathBuf,

        /// Rule file to check against the schema (default: built-in rules)
        #[arg(long)]
        rules: Option<PathBuf>,
    },
}

pub async fn run(args: SchemaArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    match args.command {
        SchemaCommand::Show { file } => show_schema(file),
        SchemaCommand::Check { file, rules } => check_schema(file, rules, config_path),
    }
}

fn show_schema(file: Option<PathBuf>) -> anyhow::Result<()> {
    let schema = match file {
        Some(path) => TargetSchema::from_file(&path)?,
        None => TargetSchema::default(),
    };
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn check_schema(file: PathBuf, rules: Option<PathBuf>, config_path: Option<&str>) -> anyhow::Result<()> {
    let schema = TargetSchema::from_file(&file)
        .map_err(|e| anyhow::anyhow!("Invalid schema {}: {}", file.display(), e))?;

    println!(
        "{} {} is valid: {} objects, {} paths",
        style("✓").green(),
        file.display(),
        schema.objects().len(),
        schema.path_count()
    );

    let rules = match rules {
        Some(path) => MappingRules::from_file(&path)?,
        None => MappingRules::default(),
    };
    let config = load_config(config_path)?;
    let engine = MappingEngine::new(schema, rules, &config.mapping);

    if engine.rule_issues().is_empty() {
        println!("{} All mapping rule targets exist", style("✓").green());
    } else {
        println!(
            "{} {} rule targets are missing from the schema:",
            style("⚠").yellow(),
            engine.rule_issues().len()
        );
        for issue in engine.rule_issues() {
            println!("  - {}", issue);
        }
    }

    Ok(())
}
