//! Convert command - expand a "Recibidos" export into the Holistor import file

use super::InputArgs;
use crate::core::{transform, OutputRow};
use crate::holistor::{self, HolistorRow, FIRST_AMOUNT_COLUMN};
use clap::Args;
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table,
};

#[derive(Args, Debug)]
pub struct ConvertCommand {
    #[command(flatten)]
    input: InputArgs,

    /// Output file: .xlsx for a workbook, any other name for CSV ("-" for CSV on stdout)
    #[arg(short, long, default_value = "Recibidos_salida.xlsx")]
    output: PathBuf,

    /// Print the first N output rows as a table
    #[arg(long)]
    preview: Option<usize>,
}

impl ConvertCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let records = self.input.read_records()?;
        let batch = transform(&records, self.input.capabilities())?;

        let to_stdout = self.output.as_os_str() == "-";
        if let Some(limit) = self.preview {
            let table = preview_table(&batch.rows, limit);
            if to_stdout {
                eprintln!("{}", table);
            } else {
                println!("{}", table);
            }
        }

        if to_stdout {
            return holistor::write_csv(&batch.rows, io::stdout());
        }

        if is_xlsx(&self.output) {
            fs::write(&self.output, holistor::xlsx_bytes(&batch.rows)?)?;
        } else {
            let file = File::create(&self.output)?;
            holistor::write_csv(&batch.rows, BufWriter::new(file))?;
        }
        log::info!(
            "Wrote {} rows to {}",
            batch.rows.len(),
            self.output.display()
        );
        Ok(())
    }
}

fn is_xlsx(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"))
}

fn preview_table(rows: &[OutputRow], limit: usize) -> String {
    let preview: Vec<HolistorRow> = rows.iter().take(limit).map(HolistorRow::from).collect();
    Table::new(preview)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(FIRST_AMOUNT_COLUMN..)).with(Alignment::right()))
        .to_string()
}
