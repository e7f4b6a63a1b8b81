//! Process command - extract and map fields from a single form.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, info};

use formx_core::export::ExportBundle;
use formx_core::{Choice, Field};

use super::load_config;
use super::pipeline::{Pipeline, PipelineArgs, ProcessedForm};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (PDF or text)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output, one row per value-bearing field
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    #[serde(flatten)]
    form: &'a ProcessedForm,
    export: ExportBundle,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message("Extracting fields...");

    let pipeline = Pipeline::new(config, &args.pipeline)?;
    let form = pipeline.run(&args.input)?;

    pb.finish_and_clear();

    for warning in &form.warnings {
        eprintln!("{} {}", style("⚠").yellow(), warning);
    }

    let output = format_form(&form, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!("{} Output written to {}", style("✓").green(), output_path.display());
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

pub fn format_form(form: &ProcessedForm, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&JsonOutput {
            form,
            export: form.export(),
        })?),
        OutputFormat::Csv => format_csv(form),
        OutputFormat::Text => Ok(format_text(form)),
    }
}

fn format_choices(choices: &[Choice]) -> String {
    choices
        .iter()
        .map(|c| {
            let mark = if c.selected { "*" } else { "" };
            format!("{}: {}{}", c.letter, c.text, mark)
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn resolution(field: &Field) -> (&'static str, String, String) {
    match &field.mapping {
        Some(mapping) => (
            "mapped",
            mapping.target_path.clone(),
            serde_json::to_value(mapping.source)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default(),
        ),
        None if field.in_questionnaire => ("questionnaire", String::new(), String::new()),
        None => ("unresolved", String::new(), String::new()),
    }
}

fn format_csv(form: &ProcessedForm) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "part",
        "identifier",
        "label",
        "kind",
        "status",
        "target_path",
        "source",
        "choices",
        "value",
    ])?;

    for field in form.document.iter_fields().filter(|f| !f.is_container()) {
        let (status, target_path, source) = resolution(field);
        let part = field.part_number.to_string();
        let choices = format_choices(&field.choices);
        wtr.write_record([
            part.as_str(),
            field.identifier.as_str(),
            field.label.as_str(),
            field.kind.as_str(),
            status,
            target_path.as_str(),
            source.as_str(),
            choices.as_str(),
            field.value.as_deref().unwrap_or(""),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(form: &ProcessedForm) -> String {
    let mut output = String::new();

    output.push_str(&format!("Source: {}\n", form.source.display()));
    output.push_str(&format!(
        "Pages: {}  Parts: {}  Fields: {}\n",
        form.document.page_count,
        form.document.parts.len(),
        form.document.field_count()
    ));

    for part in &form.document.parts {
        output.push('\n');
        if part.title.is_empty() {
            output.push_str(&format!("Part {}\n", part.number));
        } else {
            output.push_str(&format!("Part {}: {}\n", part.number, part.title));
        }

        for field in &part.fields {
            let indent = if field.is_subfield { "    " } else { "  " };
            let destination = match (&field.mapping, field.in_questionnaire) {
                (Some(mapping), _) => format!(" -> {}", mapping.target_path),
                (None, true) => " -> questionnaire".to_string(),
                (None, false) => String::new(),
            };
            output.push_str(&format!(
                "{}{} {} [{}]{}\n",
                indent,
                field.identifier,
                field.label,
                field.kind.as_str(),
                destination
            ));
            if !field.choices.is_empty() {
                output.push_str(&format!("{}    ({})\n", indent, format_choices(&field.choices)));
            }
        }
    }

    output.push('\n');
    output.push_str(&format!(
        "Mapped: {}  Questionnaire: {}  Manual: {}\n",
        form.mapping.mapped(),
        form.mapping.questionnaire,
        form.mapping.manual_kept
    ));

    if !form.warnings.is_empty() {
        output.push_str("\nWarnings:\n");
        for warning in &form.warnings {
            output.push_str(&format!("  - {}\n", warning));
        }
    }

    output
}
