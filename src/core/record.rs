use super::error::ConvertError;
use crate::money::parse_amount;
use calamine::{Data, DataType, Reader};
use csv::{Position, StringRecord};
use recibidos_derive::CsvSchema;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::borrow::Cow;
use std::io::{Cursor, Read};

/// Column description generated by `#[derive(CsvSchema)]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvField {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub required: bool,
    pub description: &'static str,
}

/// Header of the column holding the document description.
pub const DESCRIPTION_COLUMN: &str = "Tipo";

/// Date cells of a workbook are written the way the CSV export shows them.
const DATE_FORMAT: &str = "%d/%m/%Y";

/// One row of the "Recibidos" export.
///
/// Missing columns and unreadable amounts default to empty/zero, so a row can
/// always be read once the header row has been located.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, CsvSchema)]
pub struct SourceRecord {
    /// Issue date of the document
    #[serde(rename = "Fecha", default)]
    pub date: String,
    /// Document description, e.g. "1 - Factura A"
    #[serde(rename = "Tipo")]
    pub document_description: String,
    /// Sales point of the issuer
    #[serde(rename = "Punto de Venta", default)]
    pub sales_point: String,
    /// First document number
    #[serde(rename = "Número Desde", default)]
    pub number_from: String,
    /// Last document number
    #[serde(rename = "Número Hasta", default)]
    pub number_to: String,
    /// Issuer CUIT
    #[serde(rename = "Nro. Doc. Emisor", default)]
    pub issuer_tax_id: String,
    /// Issuer name
    #[serde(rename = "Denominación Emisor", default)]
    pub issuer_name: String,
    /// Exchange rate to pesos, 0 when absent
    #[serde(
        rename = "Tipo Cambio",
        alias = "Tipo de Cambio",
        default,
        deserialize_with = "amount"
    )]
    pub exchange_rate: Decimal,
    /// Currency code, e.g. "$" or "USD"
    #[serde(rename = "Moneda", default)]
    pub currency_code: String,
    /// VAT at 10.5%
    #[serde(rename = "IVA 10,5%", default, deserialize_with = "amount")]
    pub vat_reduced: Decimal,
    /// Net amount taxed at 10.5%
    #[serde(rename = "Neto Grav. IVA 10,5%", default, deserialize_with = "amount")]
    pub net_reduced: Decimal,
    /// VAT at 21%
    #[serde(rename = "IVA 21%", default, deserialize_with = "amount")]
    pub vat_general: Decimal,
    /// Net amount taxed at 21%
    #[serde(rename = "Neto Grav. IVA 21%", default, deserialize_with = "amount")]
    pub net_general: Decimal,
    /// VAT at 27%
    #[serde(rename = "IVA 27%", default, deserialize_with = "amount")]
    pub vat_differential: Decimal,
    /// Net amount taxed at 27%
    #[serde(rename = "Neto Grav. IVA 27%", default, deserialize_with = "amount")]
    pub net_differential: Decimal,
    /// Net amount taxed at 0%, reported together with exempt amounts
    #[serde(
        rename = "Neto Grav. IVA 0%",
        alias = "Neto Grav. IVA 0 %",
        default,
        deserialize_with = "amount"
    )]
    pub net_zero_rate: Decimal,
    /// Untaxed net amount
    #[serde(rename = "Neto No Gravado", default, deserialize_with = "amount")]
    pub net_untaxed: Decimal,
    /// Exempt operations
    #[serde(rename = "Op. Exentas", default, deserialize_with = "amount")]
    pub exempt_ops: Decimal,
    /// Other taxes and perceptions
    #[serde(rename = "Otros Tributos", default, deserialize_with = "amount")]
    pub other_taxes: Decimal,
    /// Document total
    #[serde(rename = "Imp. Total", default, deserialize_with = "amount")]
    pub total_amount: Decimal,
}

impl SourceRecord {
    /// Records without a description are not documents (blank or summary lines).
    pub fn is_blank(&self) -> bool {
        self.document_description.trim().is_empty()
    }
}

fn amount<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(parse_amount(&raw))
}

#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    /// 1-based position of the header row, counting non-empty lines.
    pub header_row: usize,
    /// Field delimiter; detected from the header row when `None`. Ignored
    /// for workbooks.
    pub delimiter: Option<char>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions {
            header_row: 1,
            delimiter: None,
        }
    }
}

/// Read all records of an export, either a workbook (first worksheet) or
/// delimited text.
pub fn read_records<R: Read>(
    mut reader: R,
    options: ReadOptions,
) -> Result<Vec<SourceRecord>, ConvertError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    if is_workbook(&bytes) {
        let rows = workbook_rows(bytes)?;
        return deserialize_rows(rows.into_iter().map(Ok), options.header_row.max(1));
    }
    let content = decode(&bytes);
    parse_records(content.trim_start_matches('\u{feff}'), options)
}

fn decode(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => {
            log::debug!("Input is not valid UTF-8, decoding as Windows-1252");
            encoding_rs::WINDOWS_1252.decode(bytes).0
        }
    }
}

fn parse_records(content: &str, options: ReadOptions) -> Result<Vec<SourceRecord>, ConvertError> {
    let header_row = options.header_row.max(1);
    let delimiter = match options.delimiter {
        Some(c) => u8::try_from(c)
            .ok()
            .filter(u8::is_ascii)
            .ok_or(ConvertError::InvalidDelimiter(c))?,
        None => detect_delimiter(content, header_row),
    };
    log::debug!(
        "Reading header at row {} with delimiter {:?}",
        header_row,
        delimiter as char
    );

    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .delimiter(delimiter)
        .from_reader(content.as_bytes());
    let rows = rdr.into_records().map(|row| row.map_err(ConvertError::from));
    deserialize_rows(rows, header_row)
}

/// Locate the header row and deserialize every row after it.
fn deserialize_rows<I>(mut rows: I, header_row: usize) -> Result<Vec<SourceRecord>, ConvertError>
where
    I: Iterator<Item = Result<StringRecord, ConvertError>>,
{
    let headers = rows
        .nth(header_row - 1)
        .transpose()?
        .ok_or(ConvertError::MissingHeaderRow { row: header_row })?;
    if !headers.iter().any(|h| h == DESCRIPTION_COLUMN) {
        return Err(ConvertError::MissingColumn(DESCRIPTION_COLUMN));
    }

    let mut records = Vec::new();
    for result in rows {
        let mut row = result?;
        let line = row.position().map_or(0, |p| p.line());
        while row.len() < headers.len() {
            row.push_field("");
        }
        let record: SourceRecord = row
            .deserialize(Some(&headers))
            .map_err(|source| ConvertError::InvalidRecord { line, source })?;
        records.push(record);
    }

    log::info!("Read {} records", records.len());
    Ok(records)
}

/// Zip (xlsx, ods) and OLE (xls) signatures.
fn is_workbook(bytes: &[u8]) -> bool {
    bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0])
}

/// Rows of the first worksheet as text records, skipping empty rows.
fn workbook_rows(bytes: Vec<u8>) -> Result<Vec<StringRecord>, ConvertError> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ConvertError::NoWorksheet)??;
    log::debug!("Reading first worksheet, {} rows", range.height());

    let first_row = range.start().map_or(0, |(row, _)| row);
    let rows = range
        .rows()
        .enumerate()
        .filter(|(_, cells)| cells.iter().any(|cell| !cell.is_empty()))
        .map(|(i, cells)| {
            let mut record: StringRecord = cells.iter().map(cell_text).collect();
            let mut position = Position::new();
            position.set_line(u64::from(first_row) + i as u64 + 1);
            record.set_position(Some(position));
            record
        })
        .collect();
    Ok(rows)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_date()
            .map(|date: chrono::NaiveDate| date.format(DATE_FORMAT).to_string())
            .unwrap_or_else(|| cell.to_string()),
        _ => cell.to_string(),
    }
}

/// Pick the separator that occurs most often in the header line.
fn detect_delimiter(content: &str, header_row: usize) -> u8 {
    let header_line = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .nth(header_row - 1)
        .unwrap_or("");

    let mut best = b',';
    let mut best_count = 0;
    for sep in [b';', b',', b'\t', b'|'] {
        let count = header_line.matches(sep as char).count();
        if count > best_count {
            best = sep;
            best_count = count;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const ARCA_EXPORT: &str = "\
Mis Comprobantes Recibidos - CUIT 20111111112
Fecha;Tipo;Punto de Venta;Número Desde;Número Hasta;Nro. Doc. Emisor;Denominación Emisor;Tipo de Cambio;Moneda;Neto Grav. IVA 0 %;IVA 10,5%;Neto Grav. IVA 10,5%;IVA 21%;Neto Grav. IVA 21%;IVA 27%;Neto Grav. IVA 27%;Neto No Gravado;Op. Exentas;Otros Tributos;Imp. Total
05/03/2024;1 - Factura A;00003;00000125;00000125;30712345678;PROVEEDOR SA;1,00;$;0,00;0,00;0,00;2.100,00;10.000,00;0,00;0,00;0,00;0,00;150,50;12.250,50
06/03/2024;11 - Factura C;2;77;77;20999999991;MONOTRIBUTISTA;1;$;;;;;;;;;;;5.000,00
";

    fn read(content: &str, options: ReadOptions) -> Result<Vec<SourceRecord>, ConvertError> {
        read_records(content.as_bytes(), options)
    }

    #[test]
    fn reads_arca_export_with_title_row() {
        let options = ReadOptions {
            header_row: 2,
            delimiter: None,
        };
        let records = read(ARCA_EXPORT, options).unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.date, "05/03/2024");
        assert_eq!(first.document_description, "1 - Factura A");
        assert_eq!(first.sales_point, "00003");
        assert_eq!(first.issuer_tax_id, "30712345678");
        assert_eq!(first.issuer_name, "PROVEEDOR SA");
        assert_eq!(first.exchange_rate, dec!(1));
        assert_eq!(first.currency_code, "$");
        assert_eq!(first.net_general, dec!(10000));
        assert_eq!(first.vat_general, dec!(2100));
        assert_eq!(first.other_taxes, dec!(150.50));
        assert_eq!(first.total_amount, dec!(12250.50));

        let second = &records[1];
        assert_eq!(second.net_general, Decimal::ZERO);
        assert_eq!(second.total_amount, dec!(5000));
    }

    #[test]
    fn missing_columns_default_to_zero() {
        let content = "Tipo,Imp. Total\n1 - Factura B,100\n";
        let records = read(content, ReadOptions::default()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].exchange_rate, Decimal::ZERO);
        assert_eq!(records[0].currency_code, "");
        assert_eq!(records[0].net_zero_rate, Decimal::ZERO);
        assert_eq!(records[0].total_amount, dec!(100));
    }

    #[test]
    fn short_rows_are_padded() {
        let content = "Fecha,Tipo,Imp. Total\n01/01/2024,1 - Factura A\n";
        let records = read(content, ReadOptions::default()).unwrap();
        assert_eq!(records[0].document_description, "1 - Factura A");
        assert_eq!(records[0].total_amount, Decimal::ZERO);
    }

    #[test]
    fn short_row_without_description_is_blank() {
        let content = "Fecha,Tipo,Imp. Total\nTotales\n";
        let records = read(content, ReadOptions::default()).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].is_blank());
    }

    #[test]
    fn header_aliases_are_accepted() {
        let content = "Tipo;Tipo Cambio;Neto Grav. IVA 0%\n1 - Factura A;350;10\n";
        let records = read(content, ReadOptions::default()).unwrap();
        assert_eq!(records[0].exchange_rate, dec!(350));
        assert_eq!(records[0].net_zero_rate, dec!(10));
    }

    #[test]
    fn malformed_amounts_are_zero() {
        let content = "Tipo;IVA 21%;Imp. Total\n1 - Factura A;abc;#N/A\n";
        let records = read(content, ReadOptions::default()).unwrap();
        assert_eq!(records[0].vat_general, Decimal::ZERO);
        assert_eq!(records[0].total_amount, Decimal::ZERO);
    }

    #[test]
    fn header_row_beyond_file_is_an_error() {
        let content = "Tipo;Imp. Total\n";
        let options = ReadOptions {
            header_row: 3,
            delimiter: None,
        };
        let err = read(content, options).unwrap_err();
        assert!(matches!(err, ConvertError::MissingHeaderRow { row: 3 }));
    }

    #[test]
    fn missing_description_column_is_an_error() {
        let content = "Fecha;Imp. Total\n01/01/2024;100\n";
        let err = read(content, ReadOptions::default()).unwrap_err();
        assert!(matches!(err, ConvertError::MissingColumn("Tipo")));
    }

    #[test]
    fn wrong_header_row_reports_missing_column() {
        let options = ReadOptions {
            header_row: 1,
            delimiter: None,
        };
        let err = read(ARCA_EXPORT, options).unwrap_err();
        assert!(matches!(err, ConvertError::MissingColumn(_)));
    }

    #[test]
    fn explicit_delimiter() {
        let content = "Tipo|Imp. Total\n1 - Factura A|100\n";
        let options = ReadOptions {
            header_row: 1,
            delimiter: Some('|'),
        };
        let records = read(content, options).unwrap();
        assert_eq!(records[0].total_amount, dec!(100));
    }

    #[test]
    fn non_ascii_delimiter_is_rejected() {
        let options = ReadOptions {
            header_row: 1,
            delimiter: Some('¦'),
        };
        let err = read("Tipo\n", options).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidDelimiter('¦')));
    }

    #[test]
    fn byte_order_mark_is_stripped() {
        let content = "\u{feff}Tipo;Imp. Total\n1 - Factura A;100\n";
        let records = read(content, ReadOptions::default()).unwrap();
        assert_eq!(records[0].document_description, "1 - Factura A");
    }

    #[test]
    fn windows_1252_input_is_decoded() {
        let mut bytes = b"Tipo;Denominaci".to_vec();
        bytes.push(0xF3); // ó
        bytes.extend_from_slice(b"n Emisor\n3 - Nota de Cr");
        bytes.push(0xE9); // é
        bytes.extend_from_slice(b"dito A;PE");
        bytes.push(0xD1); // Ñ
        bytes.extend_from_slice(b"A SRL\n");

        let records = read_records(bytes.as_slice(), ReadOptions::default()).unwrap();
        assert_eq!(records[0].document_description, "3 - Nota de Crédito A");
        assert_eq!(records[0].issuer_name, "PEÑA SRL");
    }

    /// Two-row workbook shaped like the ARCA download: a title, then headers.
    fn arca_workbook() -> Vec<u8> {
        use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        let date_format = Format::new().set_num_format("dd/mm/yyyy");
        let headers = [
            "Fecha",
            "Tipo",
            "Punto de Venta",
            "Número Desde",
            "Nro. Doc. Emisor",
            "Denominación Emisor",
            "Tipo Cambio",
            "Moneda",
            "Neto Grav. IVA 21%",
            "IVA 21%",
            "Imp. Total",
        ];

        sheet
            .write_string(0, 0, "Mis Comprobantes Recibidos - CUIT 20111111112")
            .unwrap();
        for (col, header) in headers.iter().enumerate() {
            sheet.write_string(1, col as u16, *header).unwrap();
        }

        let date = ExcelDateTime::from_ymd(2024, 3, 5).unwrap();
        sheet.write_datetime_with_format(2, 0, &date, &date_format).unwrap();
        sheet.write_string(2, 1, " 1 - Factura A ").unwrap();
        sheet.write_number(2, 2, 3).unwrap();
        sheet.write_number(2, 3, 125).unwrap();
        sheet.write_number(2, 4, 30712345678_f64).unwrap();
        sheet.write_string(2, 5, "PROVEEDOR SA").unwrap();
        sheet.write_number(2, 6, 912.5).unwrap();
        sheet.write_string(2, 7, "USD").unwrap();
        sheet.write_number(2, 8, 1.25).unwrap();
        sheet.write_number(2, 9, 0.2625).unwrap();
        sheet.write_number(2, 10, 1.5125).unwrap();

        // blank row, then a letter C invoice with only a text total
        sheet.write_string(4, 1, "11 - Factura C").unwrap();
        sheet.write_string(4, 10, "5.000,00").unwrap();

        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn reads_first_worksheet_of_a_workbook() {
        let options = ReadOptions {
            header_row: 2,
            delimiter: None,
        };
        let records = read_records(arca_workbook().as_slice(), options).unwrap();
        assert_eq!(records.len(), 2);

        let usd = &records[0];
        assert_eq!(usd.date, "05/03/2024");
        assert_eq!(usd.document_description, "1 - Factura A");
        assert_eq!(usd.sales_point, "3");
        assert_eq!(usd.number_from, "125");
        assert_eq!(usd.issuer_tax_id, "30712345678");
        assert_eq!(usd.exchange_rate, dec!(912.5));
        assert_eq!(usd.currency_code, "USD");
        assert_eq!(usd.net_general, dec!(1.25));
        assert_eq!(usd.vat_general, dec!(0.2625));
        assert_eq!(usd.total_amount, dec!(1.5125));

        assert_eq!(records[1].document_description, "11 - Factura C");
        assert_eq!(records[1].total_amount, dec!(5000));
    }

    #[test]
    fn workbook_header_row_must_exist() {
        let options = ReadOptions {
            header_row: 9,
            delimiter: None,
        };
        let err = read_records(arca_workbook().as_slice(), options).unwrap_err();
        assert!(matches!(err, ConvertError::MissingHeaderRow { row: 9 }));
    }

    #[test]
    fn workbook_without_description_column_is_rejected() {
        let err = read_records(arca_workbook().as_slice(), ReadOptions::default()).unwrap_err();
        assert!(matches!(err, ConvertError::MissingColumn("Tipo")));
    }

    #[test]
    fn detects_delimiter_from_header_line() {
        assert_eq!(detect_delimiter("a;b;c\n", 1), b';');
        assert_eq!(detect_delimiter("a,b,c\n", 1), b',');
        assert_eq!(detect_delimiter("a\tb\tc\n", 1), b'\t');
        assert_eq!(detect_delimiter("title\n\na;b;IVA 10,5%\n", 2), b';');
        assert_eq!(detect_delimiter("single\n", 1), b',');
    }

    #[test]
    fn schema_lists_input_columns() {
        let schema = SourceRecord::csv_schema();
        assert_eq!(schema.len(), 20);
        assert_eq!(schema[0].name, "Fecha");
        assert!(!schema[0].required);

        let description = schema.iter().find(|f| f.name == "Tipo").unwrap();
        assert!(description.required);

        let rate = schema.iter().find(|f| f.name == "Tipo Cambio").unwrap();
        assert_eq!(rate.aliases, &["Tipo de Cambio"]);
        assert_eq!(rate.description, "Exchange rate to pesos, 0 when absent");
    }
}
