//! Holistor import layout

use crate::core::OutputRow;
use crate::money::{format_amount, format_rate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;
use std::io::Write;
use tabled::Tabled;

/// Document type code for a CUIT.
pub const CUIT_DOCUMENT_TYPE: u32 = 80;

/// Worksheet name of the xlsx import file.
pub const SHEET_NAME: &str = "Salida";

/// Column positions in [`OUTPUT_COLUMNS`].
const ISSUER_DOCUMENT_TYPE_COLUMN: u16 = 8;
const EXCHANGE_RATE_COLUMN: u16 = 12;
const RATE_COLUMN: u16 = 14;
/// Neto, IVA, Ex/Ng, Otros Conceptos and Total follow in that order.
pub const FIRST_AMOUNT_COLUMN: usize = 15;

const AMOUNT_FORMAT: &str = "#,##0.00";
const RATE_FORMAT: &str = "0.000";
const AMOUNT_COLUMN_WIDTH: f64 = 15.0;

/// Header row of the import file. The downstream import matches columns by
/// name and position.
pub const OUTPUT_COLUMNS: &[&str] = &[
    "Fecha Emisión",
    "Fecha Recepción",
    "Concepto",
    "Tipo",
    "Letra",
    "Punto de Venta",
    "Número Desde",
    "Número Hasta",
    "Tipo Doc. Emisor",
    "Nro. Doc. Emisor",
    "Denominación Emisor",
    "Condición Fiscal",
    "Tipo Cambio",
    "Moneda",
    "Alicuota",
    "Neto",
    "IVA",
    "Ex/Ng",
    "Otros Conceptos",
    "Total",
];

/// Output row formatted for the import file and the preview table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
pub struct HolistorRow {
    #[serde(rename = "Fecha Emisión")]
    #[tabled(rename = "Fecha Emisión")]
    pub issue_date: String,
    #[serde(rename = "Fecha Recepción")]
    #[tabled(rename = "Fecha Recepción")]
    pub reception_date: String,
    #[serde(rename = "Concepto")]
    #[tabled(rename = "Concepto")]
    pub concept: String,
    #[serde(rename = "Tipo")]
    #[tabled(rename = "Tipo")]
    pub document_type: String,
    #[serde(rename = "Letra")]
    #[tabled(rename = "Letra")]
    pub letter: String,
    #[serde(rename = "Punto de Venta")]
    #[tabled(rename = "Punto de Venta")]
    pub sales_point: String,
    #[serde(rename = "Número Desde")]
    #[tabled(rename = "Número Desde")]
    pub number_from: String,
    #[serde(rename = "Número Hasta")]
    #[tabled(rename = "Número Hasta")]
    pub number_to: String,
    #[serde(rename = "Tipo Doc. Emisor")]
    #[tabled(rename = "Tipo Doc. Emisor")]
    pub issuer_document_type: u32,
    #[serde(rename = "Nro. Doc. Emisor")]
    #[tabled(rename = "Nro. Doc. Emisor")]
    pub issuer_tax_id: String,
    #[serde(rename = "Denominación Emisor")]
    #[tabled(rename = "Denominación Emisor")]
    pub issuer_name: String,
    #[serde(rename = "Condición Fiscal")]
    #[tabled(rename = "Condición Fiscal")]
    pub tax_condition: String,
    #[serde(rename = "Tipo Cambio")]
    #[tabled(rename = "Tipo Cambio")]
    pub exchange_rate: String,
    #[serde(rename = "Moneda")]
    #[tabled(rename = "Moneda")]
    pub currency: String,
    #[serde(rename = "Alicuota")]
    #[tabled(rename = "Alicuota")]
    pub rate: String,
    #[serde(rename = "Neto")]
    #[tabled(rename = "Neto")]
    pub net: String,
    #[serde(rename = "IVA")]
    #[tabled(rename = "IVA")]
    pub vat: String,
    #[serde(rename = "Ex/Ng")]
    #[tabled(rename = "Ex/Ng")]
    pub exempt_or_untaxed: String,
    #[serde(rename = "Otros Conceptos")]
    #[tabled(rename = "Otros Conceptos")]
    pub other_concepts: String,
    #[serde(rename = "Total")]
    #[tabled(rename = "Total")]
    pub total: String,
}

impl From<&OutputRow> for HolistorRow {
    fn from(row: &OutputRow) -> Self {
        let header = &row.header;
        HolistorRow {
            issue_date: header.date.clone(),
            reception_date: header.date.clone(),
            concept: header.description.clone(),
            document_type: row.classification.document_type.code().to_string(),
            letter: row.classification.letter.clone(),
            sales_point: header.sales_point.clone(),
            number_from: header.number_from.clone(),
            number_to: header.number_to.clone(),
            issuer_document_type: CUIT_DOCUMENT_TYPE,
            issuer_tax_id: header.issuer_tax_id.clone(),
            issuer_name: header.issuer_name.clone(),
            tax_condition: row.tax_condition.code().to_string(),
            exchange_rate: header.exchange_rate.to_string(),
            currency: header.currency_code.clone(),
            rate: format_rate(row.bracket.rate()),
            net: format_amount(row.net_amount),
            vat: format_amount(row.vat_amount),
            exempt_or_untaxed: format_amount(row.exempt_or_untaxed_amount),
            other_concepts: format_amount(row.other_concepts_amount),
            total: format_amount(row.total_amount),
        }
    }
}

/// Write the import file, header row first.
pub fn write_csv<W: Write>(rows: &[OutputRow], writer: W) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(HolistorRow::from(row))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Build the xlsx import file. Amounts, the rate and the exchange rate are
/// written as numbers; amounts carry a `#,##0.00` display format.
pub fn xlsx_bytes(rows: &[OutputRow]) -> anyhow::Result<Vec<u8>> {
    let amount_format = Format::new().set_num_format(AMOUNT_FORMAT);
    let rate_format = Format::new().set_num_format(RATE_FORMAT);

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, name) in OUTPUT_COLUMNS.iter().enumerate() {
        sheet.write_string(0, col as u16, *name)?;
    }
    for col in FIRST_AMOUNT_COLUMN..OUTPUT_COLUMNS.len() {
        sheet.set_column_width(col as u16, AMOUNT_COLUMN_WIDTH)?;
    }

    for (i, row) in rows.iter().enumerate() {
        let line = i as u32 + 1;
        let text = HolistorRow::from(row);
        let strings = [
            (0, &text.issue_date),
            (1, &text.reception_date),
            (2, &text.concept),
            (3, &text.document_type),
            (4, &text.letter),
            (5, &text.sales_point),
            (6, &text.number_from),
            (7, &text.number_to),
            (9, &text.issuer_tax_id),
            (10, &text.issuer_name),
            (11, &text.tax_condition),
            (13, &text.currency),
        ];
        for (col, value) in strings {
            sheet.write_string(line, col, value.as_str())?;
        }

        sheet.write_number(line, ISSUER_DOCUMENT_TYPE_COLUMN, text.issuer_document_type)?;
        sheet.write_number(line, EXCHANGE_RATE_COLUMN, to_f64(row.header.exchange_rate))?;
        sheet.write_number_with_format(line, RATE_COLUMN, to_f64(row.bracket.rate()), &rate_format)?;

        let amounts = [
            row.net_amount,
            row.vat_amount,
            row.exempt_or_untaxed_amount,
            row.other_concepts_amount,
            row.total_amount,
        ];
        for (offset, amount) in amounts.into_iter().enumerate() {
            let col = (FIRST_AMOUNT_COLUMN + offset) as u16;
            sheet.write_number_with_format(line, col, to_f64(amount), &amount_format)?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn to_f64(amount: Decimal) -> f64 {
    amount.to_f64().unwrap_or_default()
}
