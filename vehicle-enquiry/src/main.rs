use std::path::PathBuf;

use clap::{error::ErrorKind as ClapErrorKind, CommandFactory, Parser};
use color_eyre::Result;

use vehicle_enquiry::{
    cli::{ConnectionArgs, LoggingArgs},
    output::{save_csv, save_json, OutputFormat},
    registration::normalize_registration,
    RegistryClient,
};

/// Look up a vehicle in the DVLA vehicle enquiry registry.
#[derive(Debug, Parser)]
#[command(name = "vehicle-enquiry", version)]
struct Cli {
    /// Vehicle registration number.
    registration: String,

    #[command(flatten)]
    connection: ConnectionArgs,

    /// Print the full response as JSON instead of the summary.
    #[arg(long)]
    json: bool,

    /// Save the results to a JSON file.
    #[arg(long)]
    save_json: bool,

    /// Save the results to a CSV file.
    #[arg(long)]
    save_csv: bool,

    /// Filename for the saved results. Defaults to vehicle_<REG>_<TIMESTAMP>.<ext>.
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,

    #[command(flatten)]
    logging: LoggingArgs,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    if cli.output.is_some() && cli.save_json && cli.save_csv {
        Cli::command()
            .error(
                ClapErrorKind::ArgumentConflict,
                "--output names a single file; use it with either --save-json or --save-csv",
            )
            .exit();
    }

    cli.logging.init()?;

    let record = match cli
        .connection
        .client_config()
        .and_then(RegistryClient::new)
        .and_then(|mut client| client.query(&cli.registration))
    {
        Ok(record) => record,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Summary
    };
    println!("{}", format.render(&record)?);

    let queried = normalize_registration(&cli.registration);
    if cli.save_json {
        let path = save_json(&record, cli.output.as_deref(), &queried)?;
        println!("\nResults saved to: {}", path.display());
    }
    if cli.save_csv {
        let path = save_csv(&record, cli.output.as_deref(), &queried)?;
        println!("\nResults saved to: {}", path.display());
    }

    Ok(())
}
