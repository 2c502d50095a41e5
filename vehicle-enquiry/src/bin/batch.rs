use std::{fs::File, io::BufWriter, path::PathBuf, time::Duration};

use chrono::Local;
use clap::{Parser, ValueEnum};
use color_eyre::{eyre::WrapErr, Result};
use log::info;

use vehicle_enquiry::{
    batch::{process, read_registrations, summarize, write_csv, write_json},
    cli::{ConnectionArgs, LoggingArgs},
    RegistryClient,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Csv,
    Json,
}

impl Format {
    fn extension(self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Json => "json",
        }
    }
}

/// Look up every registration number in a CSV file, one request at a time.
#[derive(Debug, Parser)]
#[command(name = "vehicle-enquiry-batch", version)]
struct Cli {
    /// CSV file containing registration numbers.
    input_file: PathBuf,

    #[command(flatten)]
    connection: ConnectionArgs,

    /// Column holding the registration numbers. Guessed from the header if omitted.
    #[arg(long)]
    column: Option<String>,

    /// The input has no header row; the first column is used.
    #[arg(long)]
    no_header: bool,

    /// Output format.
    #[arg(long, value_enum, default_value_t = Format::Csv)]
    format: Format,

    /// Output filename. Defaults to dvla_results_<TIMESTAMP>.<ext>.
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Pause between consecutive requests, to stay under the rate limit.
    #[arg(long, value_name = "MILLISECONDS", default_value_t = 1000)]
    delay_ms: u64,

    #[command(flatten)]
    logging: LoggingArgs,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    cli.logging.init()?;

    let input = File::open(&cli.input_file)
        .wrap_err_with(|| format!("Input file not found: {}", cli.input_file.display()))?;
    let registrations = read_registrations(input, cli.column.as_deref(), !cli.no_header)?;
    info!("Read {} registration numbers", registrations.len());

    let mut client = RegistryClient::new(cli.connection.client_config()?)?;
    let outcomes = process(
        &mut client,
        &registrations,
        Duration::from_millis(cli.delay_ms),
    );

    let path = cli.output.clone().unwrap_or_else(|| {
        PathBuf::from(format!(
            "dvla_results_{}.{}",
            Local::now().format("%Y%m%d_%H%M%S"),
            cli.format.extension()
        ))
    });
    let file = File::create(&path)
        .wrap_err_with(|| format!("Could not create {}", path.display()))?;
    match cli.format {
        Format::Csv => write_csv(&outcomes, BufWriter::new(file))?,
        Format::Json => write_json(&outcomes, BufWriter::new(file))?,
    }
    info!("Results saved to {}", path.display());

    let summary = summarize(&outcomes);
    println!("\nSummary:");
    println!("Total registrations processed: {}", summary.total);
    println!("Successful queries: {}", summary.successful);
    println!("Failed queries: {}", summary.failed);
    println!("Results saved to: {}", path.display());

    Ok(())
}
