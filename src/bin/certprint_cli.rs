//! CLI tool for certprint - renders certificates and inspects template layouts
//!
//! Usage:
//!   certprint_cli render --record rec.json --format pdf --out krstenica.pdf
//!   certprint_cli layout template.xlsx                # Layout JSON to stdout
//!   certprint_cli layout template.xlsx -o layout.json

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use certprint::{
    load_layout, BackgroundPolicy, BaptismRecord, CertprintError, OutputFormat, RenderConfig,
    RenderRequest, Renderer, TemplateVariant,
};

#[derive(Parser)]
#[command(version, about = "Fill baptism certificate templates as XLSX or PDF.")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a record into a document.
    Render(RenderArgs),
    /// Print the resolved layout of a template as JSON.
    Layout {
        template: PathBuf,
        /// Write to a file instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct RenderArgs {
    /// Record as JSON.
    #[arg(long)]
    record: PathBuf,

    /// Template workbook; defaults to the configured one.
    #[arg(long)]
    template: Option<PathBuf>,

    /// JSON configuration file; defaults plus CERTPRINT_* environment overrides otherwise.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "xlsx")]
    format: String,

    /// Template variant: classic (1, v1) or form (2, v2, verzija2).
    #[arg(long, default_value = "classic")]
    variant: String,

    /// Use the preview template.
    #[arg(long)]
    preview: bool,

    /// Background image replacing the variant's default.
    #[arg(long)]
    background: Option<PathBuf>,

    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,

    /// Font family for PDF output.
    #[arg(long)]
    font: Option<String>,

    /// Output path; defaults to the suggested file name.
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyArg {
    FillPage,
    FillContentBox,
}

impl From<PolicyArg> for BackgroundPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::FillPage => Self::FillPage,
            PolicyArg::FillContentBox => Self::FillContentBox,
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Render(args) => run_render(args),
        Command::Layout { template, out } => run_layout(&template, out.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_render(args: RenderArgs) -> certprint::Result<()> {
    let config = match &args.config {
        Some(path) => RenderConfig::load(path)?.with_env_overrides(),
        None => RenderConfig::from_env(),
    };

    let record_json = fs::read(&args.record).map_err(|e| {
        CertprintError::Record(format!("cannot read {}: {e}", args.record.display()))
    })?;
    let record = BaptismRecord::from_json(&record_json)?;

    let request = RenderRequest {
        format: args.format.parse::<OutputFormat>()?,
        variant: args.variant.parse::<TemplateVariant>()?,
        preview: args.preview,
        background: args.background,
        background_policy: args.policy.map(BackgroundPolicy::from),
        font_family: args.font,
    };

    let renderer = Renderer::new(config);
    let document = match &args.template {
        Some(path) => {
            let template = fs::read(path).map_err(|e| {
                CertprintError::TemplateMalformed(format!("cannot read {}: {e}", path.display()))
            })?;
            renderer.render_template(&template, &record, &request)?
        }
        None => renderer.render(&record, &request)?,
    };

    for reference in &document.report.skipped_cells {
        eprintln!("Skipped unresolvable cell: {reference}");
    }

    let out = args.out.unwrap_or_else(|| PathBuf::from(document.filename));
    fs::write(&out, &document.bytes).map_err(|e| {
        CertprintError::OutputWriteFailed(format!("cannot write {}: {e}", out.display()))
    })?;
    eprintln!(
        "Written: {} ({}, {} bytes)",
        out.display(),
        document.content_type,
        document.bytes.len()
    );
    Ok(())
}

fn run_layout(template: &Path, out: Option<&Path>) -> certprint::Result<()> {
    let layout = load_layout(template)?;
    let json = serde_json::to_string_pretty(&layout)?;

    match out {
        Some(path) => {
            fs::write(path, &json)?;
            eprintln!("Written: {}", path.display());
        }
        None => {
            let mut stdout = io::stdout();
            stdout.write_all(json.as_bytes())?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}
