//! fragment-ids - sentence-level ids for narrative XHTML

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use fragment_ids::{
    FragmentConfig, FragmentReport, HeaderFieldSet, NonParagraphPolicy, fragment_dir,
};

#[derive(Parser)]
#[command(name = "fragment-ids")]
#[command(version, long_about = None)]
#[command(about = "Wrap every sentence of a chapter export in an id'd span")]
#[command(after_help = "EXAMPLES:
    fragment-ids export/ out/                  Fragment every page in export/
    fragment-ids export/ out/ --no-header      Skip title page fields
    fragment-ids export/ out/ --report         Print a JSON report per page")]
struct Cli {
    /// Directory of .xhtml chapter pages (plus an optional title page)
    #[arg(value_name = "INPUT_DIR")]
    input: PathBuf,

    /// Directory to write fragmented pages to (created if missing)
    #[arg(value_name = "OUTPUT_DIR")]
    output: PathBuf,

    /// TOML config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Do not wrap title page fields
    #[arg(long)]
    no_header: bool,

    /// Do not wrap chapter titles
    #[arg(long)]
    no_chapter_title: bool,

    /// Keep non-paragraph content in the content region
    #[arg(long)]
    keep_non_paragraphs: bool,

    /// Also wrap the tags field
    #[arg(long)]
    tags: bool,

    /// Give each chapter's notes block an id after its paragraphs
    #[arg(long)]
    notes: bool,

    /// Print a JSON report of every page to stdout
    #[arg(long)]
    report: bool,

    /// Suppress the summary line
    #[arg(short, long)]
    quiet: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "fragment_ids=info",
        1 => "fragment_ids=debug",
        _ => "fragment_ids=trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // stdout is reserved for --report
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

fn resolve_config(cli: &Cli) -> fragment_ids::Result<FragmentConfig> {
    let mut config = match &cli.config {
        Some(path) => FragmentConfig::load(path)?,
        None => FragmentConfig::default(),
    };

    if cli.no_header {
        config.header_fields = HeaderFieldSet::NONE;
    } else if cli.tags {
        config.header_fields.tags = true;
    }
    if cli.no_chapter_title {
        config.wrap_chapter_title = false;
    }
    if cli.notes {
        config.wrap_notes = true;
    }
    if cli.keep_non_paragraphs {
        config.non_paragraph = NonParagraphPolicy::Keep;
    }
    Ok(config)
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = resolve_config(cli).map_err(|e| e.to_string())?;
    let reports = fragment_dir(&cli.input, &cli.output, &config).map_err(|e| e.to_string())?;

    if cli.report {
        let json = serde_json::to_string_pretty(&reports).map_err(|e| e.to_string())?;
        println!("{json}");
    }
    if !cli.quiet {
        print_summary(&reports, cli);
    }
    Ok(())
}

fn print_summary(reports: &[FragmentReport], cli: &Cli) {
    let fragments: usize = reports.iter().map(|r| r.total).sum();
    let skipped: usize = reports.iter().map(|r| r.skipped_fields.len()).sum();

    eprintln!(
        "Fragmented {} page(s), {fragments} id(s), into {}",
        reports.len(),
        cli.output.display()
    );
    if skipped > 0 {
        eprintln!("  {skipped} header field(s) not found and left unwrapped");
    }
}
