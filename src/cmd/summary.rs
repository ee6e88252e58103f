//! Summary command - totals per VAT bracket for reconciling against the export

use super::InputArgs;
use crate::core::{transform, Batch, Bracket, OutputRow};
use crate::money::{format_amount, format_rate};
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct SummaryCommand {
    #[command(flatten)]
    input: InputArgs,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

/// Totals of the rows reported under one bracket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
struct BracketTotals {
    rows: usize,
    net: Decimal,
    vat: Decimal,
    exempt_or_untaxed: Decimal,
    other_concepts: Decimal,
    total: Decimal,
}

impl BracketTotals {
    fn add(&mut self, row: &OutputRow) {
        self.rows += 1;
        self.net += row.net_amount;
        self.vat += row.vat_amount;
        self.exempt_or_untaxed += row.exempt_or_untaxed_amount;
        self.other_concepts += row.other_concepts_amount;
        self.total += row.total_amount;
    }

    fn merge(&mut self, other: &BracketTotals) {
        self.rows += other.rows;
        self.net += other.net;
        self.vat += other.vat;
        self.exempt_or_untaxed += other.exempt_or_untaxed;
        self.other_concepts += other.other_concepts;
        self.total += other.total;
    }
}

/// Summary data for JSON output
#[derive(Debug, Serialize)]
struct SummaryData {
    documents: usize,
    skipped: usize,
    without_amounts: usize,
    brackets: Vec<BracketSummary>,
    grand_total: BracketTotals,
}

#[derive(Debug, Serialize)]
struct BracketSummary {
    rate: String,
    #[serde(flatten)]
    totals: BracketTotals,
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Alicuota")]
    rate: String,
    #[tabled(rename = "Filas")]
    rows: usize,
    #[tabled(rename = "Neto")]
    net: String,
    #[tabled(rename = "IVA")]
    vat: String,
    #[tabled(rename = "Ex/Ng")]
    exempt_or_untaxed: String,
    #[tabled(rename = "Otros Conceptos")]
    other_concepts: String,
    #[tabled(rename = "Total")]
    total: String,
}

impl SummaryRow {
    fn new(rate: String, totals: &BracketTotals) -> Self {
        SummaryRow {
            rate,
            rows: totals.rows,
            net: format_amount(totals.net),
            vat: format_amount(totals.vat),
            exempt_or_untaxed: format_amount(totals.exempt_or_untaxed),
            other_concepts: format_amount(totals.other_concepts),
            total: format_amount(totals.total),
        }
    }
}

impl SummaryCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let records = self.input.read_records()?;
        let batch = transform(&records, self.input.capabilities())?;
        let summary = summarize(&batch);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            print_summary(&summary);
        }
        Ok(())
    }
}

fn summarize(batch: &Batch) -> SummaryData {
    let mut by_bracket: BTreeMap<Bracket, BracketTotals> = BTreeMap::new();
    for row in &batch.rows {
        by_bracket.entry(row.bracket).or_default().add(row);
    }

    let mut grand_total = BracketTotals::default();
    for totals in by_bracket.values() {
        grand_total.merge(totals);
    }

    SummaryData {
        documents: batch.documents,
        skipped: batch.skipped,
        without_amounts: batch.without_amounts,
        brackets: by_bracket
            .into_iter()
            .map(|(bracket, totals)| BracketSummary {
                rate: format_rate(bracket.rate()),
                totals,
            })
            .collect(),
        grand_total,
    }
}

fn print_summary(summary: &SummaryData) {
    println!();
    println!(
        "RECIBIDOS SUMMARY - {} document(s), {} skipped, {} without amounts",
        summary.documents, summary.skipped, summary.without_amounts
    );
    println!();

    let mut rows: Vec<SummaryRow> = summary
        .brackets
        .iter()
        .map(|b| SummaryRow::new(b.rate.clone(), &b.totals))
        .collect();
    rows.push(SummaryRow::new("Total".to_string(), &summary.grand_total));

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{}", table);
}
