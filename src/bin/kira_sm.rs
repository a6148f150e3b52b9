use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kira_sample_metadata::api::MetadataHttpClient;
use kira_sample_metadata::config::{ConfigLoader, ConfigOverrides};
use kira_sample_metadata::domain::Barcode;
use kira_sample_metadata::error::KiraError;
use kira_sample_metadata::input::{read_barcode_file, read_csv_column};
use kira_sample_metadata::output::{JsonOutput, LogProgress, write_report, write_table};
use kira_sample_metadata::pipeline::{CancelToken, Pipeline};

#[derive(Parser)]
#[command(name = "kira-sm")]
#[command(about = "Pull sample metadata for a set of barcodes into one table")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    base_url: Option<String>,

    #[arg(long, global = true)]
    workers: Option<usize>,

    #[arg(long, global = true, help = "Request timeout in seconds")]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Fetch, reconcile and export metadata for barcodes")]
    Pull(PullArgs),
}

#[derive(Args)]
struct PullArgs {
    barcodes: Vec<String>,

    #[arg(long, help = "File with one barcode per line")]
    barcodes_file: Option<Utf8PathBuf>,

    #[arg(long, help = "CSV file holding barcodes in --column")]
    csv: Option<Utf8PathBuf>,

    #[arg(long, default_value = "barcode")]
    column: String,

    #[arg(long, short, help = "TSV output path (default: stdout)")]
    output: Option<Utf8PathBuf>,

    #[arg(long, help = "JSON error report path (default: stderr)")]
    report: Option<Utf8PathBuf>,

    #[arg(long, help = "Print table and report as one JSON document")]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(kira) = report.downcast_ref::<KiraError>() {
            return ExitCode::from(map_exit_code(kira));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &KiraError) -> u8 {
    match error {
        KiraError::EmptyResult | KiraError::MissingConfig => 2,
        KiraError::ApiHttp(_)
        | KiraError::ApiTimeout(_)
        | KiraError::ApiStatus { .. }
        | KiraError::ApiPayload(_) => 3,
        KiraError::Cancelled => 130,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let overrides = ConfigOverrides {
        base_url: cli.base_url,
        timeout_secs: cli.timeout,
        workers: cli.workers,
    };

    match cli.command {
        Commands::Pull(args) => {
            let config = ConfigLoader::resolve(cli.config.as_deref(), overrides)?;
            let client = MetadataHttpClient::new(&config)?;
            run_pull(args, Pipeline::new(client, config.workers))
        }
    }
}

fn run_pull(args: PullArgs, pipeline: Pipeline<MetadataHttpClient>) -> miette::Result<()> {
    let barcodes = collect_barcodes(&args)?;
    if barcodes.is_empty() {
        return Err(miette::Report::msg(
            "no barcodes given (pass them as arguments, --barcodes-file or --csv)",
        ));
    }

    let cancel = CancelToken::new();
    let result = if args.json {
        pipeline.retrieve_metadata(&barcodes, &cancel, &JsonOutput)
    } else {
        pipeline.retrieve_metadata(&barcodes, &cancel, &LogProgress)
    };

    if args.json {
        JsonOutput::print_result(&result).into_diagnostic()?;
    } else {
        if !result.table.is_empty() {
            write_table(&result, args.output.as_deref())?;
        }
        match args.report.as_deref() {
            Some(path) => write_report(&result, path)?,
            None if !result.errors.is_empty() => {
                JsonOutput::print_report(&result).into_diagnostic()?
            }
            None => {}
        }
    }

    if result.cancelled {
        return Err(KiraError::Cancelled.into());
    }
    if result.errors.is_terminal() {
        return Err(KiraError::EmptyResult.into());
    }
    Ok(())
}

fn collect_barcodes(args: &PullArgs) -> Result<Vec<Barcode>, KiraError> {
    let mut barcodes = args
        .barcodes
        .iter()
        .map(|value| value.parse())
        .collect::<Result<Vec<Barcode>, KiraError>>()?;
    if let Some(path) = &args.barcodes_file {
        barcodes.extend(read_barcode_file(path)?);
    }
    if let Some(path) = &args.csv {
        barcodes.extend(read_csv_column(path, &args.column)?);
    }
    Ok(barcodes)
}
