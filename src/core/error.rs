use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("no input file supplied: {0}")]
    MissingInput(PathBuf),
    #[error("No se encontraron comprobantes con importes.")]
    EmptyResult,
    #[error("header row {row} not found, the file has fewer rows")]
    MissingHeaderRow { row: usize },
    #[error("required column '{0}' not found in the header row")]
    MissingColumn(&'static str),
    #[error("delimiter must be a single ASCII character: {0:?}")]
    InvalidDelimiter(char),
    #[error("invalid record at line {line}: {source}")]
    InvalidRecord {
        line: u64,
        #[source]
        source: csv::Error,
    },
    #[error("the workbook has no worksheets")]
    NoWorksheet,
    #[error(transparent)]
    Workbook(#[from] calamine::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
