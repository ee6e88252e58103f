//! Schema command - print the expected input columns and the output layout

use crate::core::{CsvField, SourceRecord};
use crate::holistor::OUTPUT_COLUMNS;
use clap::Args;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// What to print
    #[arg(value_enum, default_value = "input-fields")]
    format: SchemaFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaFormat {
    /// Header names read from the "Recibidos" export
    InputColumns,
    /// Input column descriptions
    InputFields,
    /// Header row of the Holistor import file
    OutputColumns,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match self.format {
            SchemaFormat::InputColumns => {
                let names: Vec<_> = SourceRecord::csv_schema().iter().map(|f| f.name).collect();
                println!("{}", names.join(";"));
            }
            SchemaFormat::InputFields => print_input_fields(SourceRecord::csv_schema()),
            SchemaFormat::OutputColumns => println!("{}", OUTPUT_COLUMNS.join(",")),
        }
        Ok(())
    }
}

fn print_input_fields(fields: &[CsvField]) {
    println!("Recibidos Input Format");
    println!("======================");
    println!();
    for field in fields {
        let req = if field.required { "required" } else { "optional" };
        println!("{:22} ({:8})  {}", field.name, req, field.description);
        if !field.aliases.is_empty() {
            println!("{:22}  also read as: {}", "", field.aliases.join(", "));
        }
    }
    println!();
    println!("Input is the first worksheet of an .xlsx/.xls/.ods file, or delimited text.");
    println!("Amounts accept 1234.56, 1.234,56 and 1,234.56; unreadable cells count as 0.");
}
