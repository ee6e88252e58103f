mod cmd;
mod core;
mod holistor;
mod money;

use crate::core::ConvertError;
use clap::{Parser, Subcommand};

/// Convert ARCA/AFIP "Recibidos" exports for import into Holistor
#[derive(Parser, Debug)]
#[command(name = "recibidos", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Expand every document into one row per VAT bracket
    Convert(cmd::convert::ConvertCommand),
    /// Totals per VAT bracket
    Summary(cmd::summary::SummaryCommand),
    /// Print the expected input columns or the output layout
    Schema(cmd::schema::SchemaCommand),
}

impl Command {
    fn exec(&self) -> anyhow::Result<()> {
        match self {
            Command::Convert(convert) => convert.exec(),
            Command::Summary(summary) => summary.exec(),
            Command::Schema(schema) => schema.exec(),
        }
    }
}

fn main() {
    pretty_env_logger::init();
    let cli = Cli::parse();

    if let Err(err) = cli.command.exec() {
        match err.downcast_ref::<ConvertError>() {
            // Not failures of the program, just nothing to convert
            Some(e) if matches!(e, ConvertError::MissingInput(_) | ConvertError::EmptyResult) => {
                eprintln!("{}", e)
            }
            _ => eprintln!("Error: {:?}", err),
        }
        std::process::exit(1);
    }
}
