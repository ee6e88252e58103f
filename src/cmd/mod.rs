pub mod convert;
pub mod schema;
pub mod summary;

use crate::core::{read_records, Capabilities, ConvertError, ReadOptions, SourceRecord, Variant};
use clap::{Args, ValueEnum};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

/// Input flags shared by the commands that read an export
#[derive(Args, Debug)]
pub struct InputArgs {
    /// "Recibidos" export, .xlsx or CSV (or "-" for stdin)
    input: PathBuf,

    /// 1-based row holding the column headers (the ARCA export uses 2)
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    header_row: u32,

    /// CSV field delimiter, detected from the header row if omitted
    #[arg(short, long)]
    delimiter: Option<char>,

    /// Layout generation of the export
    #[arg(long, value_enum, default_value_t = VariantArg::ArcaUsd)]
    variant: VariantArg,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum VariantArg {
    /// AFIP export: invoices, credit and debit notes
    Afip,
    /// ARCA export: adds receipts
    Arca,
    /// ARCA export with USD documents and 0% bracket
    #[default]
    ArcaUsd,
}

impl From<VariantArg> for Variant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::Afip => Variant::Afip,
            VariantArg::Arca => Variant::Arca,
            VariantArg::ArcaUsd => Variant::ArcaUsd,
        }
    }
}

impl InputArgs {
    pub fn capabilities(&self) -> Capabilities {
        Variant::from(self.variant).into()
    }

    fn read_options(&self) -> ReadOptions {
        ReadOptions {
            header_row: self.header_row as usize,
            delimiter: self.delimiter,
        }
    }

    /// Read records from the input file (or stdin with "-")
    pub fn read_records(&self) -> Result<Vec<SourceRecord>, ConvertError> {
        let options = self.read_options();
        if self.input.as_os_str() == "-" {
            read_from_stdin(options)
        } else {
            read_from_file(&self.input, options)
        }
    }
}

fn read_from_file(path: &Path, options: ReadOptions) -> Result<Vec<SourceRecord>, ConvertError> {
    if !path.is_file() {
        return Err(ConvertError::MissingInput(path.to_path_buf()));
    }
    log::info!("Reading {}", path.display());
    let file = File::open(path)?;
    read_records(BufReader::new(file), options)
}

fn read_from_stdin(options: ReadOptions) -> Result<Vec<SourceRecord>, ConvertError> {
    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin.lock());

    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer)?;

    if buffer.is_empty() {
        return Err(ConvertError::MissingInput(PathBuf::from("-")));
    }

    read_records(io::Cursor::new(buffer), options)
}
