use super::capabilities::Capabilities;
use super::classify::{classify, Classification, DocumentType, TaxCondition};
use super::record::SourceRecord;
use crate::money::round_amount;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fmt;

/// Currency whose amounts are converted to pesos with the row's exchange rate.
pub const FOREIGN_CURRENCY: &str = "USD";

/// VAT rate tier an output row is reported under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bracket {
    /// Rows carrying only exempt, untaxed or other amounts
    Zero,
    Reduced,
    General,
    Differential,
}

impl Bracket {
    pub fn rate(&self) -> Decimal {
        match self {
            Bracket::Zero => Decimal::ZERO,
            Bracket::Reduced => dec!(10.5),
            Bracket::General => dec!(21),
            Bracket::Differential => dec!(27),
        }
    }
}

/// (bracket, net, vat) for each taxed bracket of a record, in emission order.
fn taxed_columns(record: &SourceRecord) -> [(Bracket, Decimal, Decimal); 3] {
    [
        (Bracket::Reduced, record.net_reduced, record.vat_reduced),
        (Bracket::General, record.net_general, record.vat_general),
        (
            Bracket::Differential,
            record.net_differential,
            record.vat_differential,
        ),
    ]
}

impl fmt::Display for Bracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.rate())
    }
}

/// Fields copied verbatim from the source record onto every output row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHeader {
    pub date: String,
    pub description: String,
    pub sales_point: String,
    pub number_from: String,
    pub number_to: String,
    pub issuer_tax_id: String,
    pub issuer_name: String,
    pub exchange_rate: Decimal,
    pub currency_code: String,
}

impl From<&SourceRecord> for RecordHeader {
    fn from(record: &SourceRecord) -> Self {
        RecordHeader {
            date: record.date.clone(),
            description: record.document_description.trim().to_string(),
            sales_point: record.sales_point.clone(),
            number_from: record.number_from.clone(),
            number_to: record.number_to.clone(),
            issuer_tax_id: record.issuer_tax_id.clone(),
            issuer_name: record.issuer_name.clone(),
            exchange_rate: record.exchange_rate,
            currency_code: record.currency_code.clone(),
        }
    }
}

/// One line of the Holistor import, covering a single VAT bracket of a document.
///
/// Amounts are in pesos, rounded to cents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRow {
    pub header: RecordHeader,
    pub classification: Classification,
    pub tax_condition: TaxCondition,
    pub bracket: Bracket,
    pub net_amount: Decimal,
    pub vat_amount: Decimal,
    pub exempt_or_untaxed_amount: Decimal,
    pub other_concepts_amount: Decimal,
    /// Always the sum of the four amounts above.
    pub total_amount: Decimal,
}

impl OutputRow {
    fn new(
        header: &RecordHeader,
        classification: &Classification,
        bracket: Bracket,
        amounts: Amounts,
    ) -> Self {
        OutputRow {
            header: header.clone(),
            classification: classification.clone(),
            tax_condition: classification.tax_condition(),
            bracket,
            net_amount: amounts.net,
            vat_amount: amounts.vat,
            exempt_or_untaxed_amount: amounts.exempt_or_untaxed,
            other_concepts_amount: amounts.other_concepts,
            total_amount: amounts.total(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Amounts {
    net: Decimal,
    vat: Decimal,
    exempt_or_untaxed: Decimal,
    other_concepts: Decimal,
}

impl Amounts {
    fn total(&self) -> Decimal {
        checked_sum([self.net, self.vat, self.exempt_or_untaxed, self.other_concepts])
    }
}

/// Sum amounts, reading a sum that overflows `Decimal` as zero.
fn checked_sum(amounts: impl IntoIterator<Item = Decimal>) -> Decimal {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(amount))
        .unwrap_or_else(|| {
            log::debug!("Sum of amounts overflowed, read as zero");
            Decimal::ZERO
        })
}

/// Sign an amount by document type, ignoring the sign it was reported with.
/// Credit notes are negative, everything else positive.
pub fn signed(amount: Decimal, document_type: DocumentType) -> Decimal {
    if amount.is_zero() {
        Decimal::ZERO
    } else if document_type == DocumentType::CreditNote {
        -amount.abs()
    } else {
        amount.abs()
    }
}

/// Convert a foreign-currency amount to pesos. Amounts in any other currency,
/// or without an exchange rate, are returned unchanged. A product too large
/// for `Decimal` is read as zero.
pub fn convert(amount: Decimal, currency_code: &str, exchange_rate: Decimal) -> Decimal {
    let is_foreign = currency_code.trim().to_uppercase() == FOREIGN_CURRENCY;
    if is_foreign && !exchange_rate.is_zero() {
        amount.checked_mul(exchange_rate).unwrap_or_else(|| {
            log::debug!("{} x {} overflowed, read as zero", amount, exchange_rate);
            Decimal::ZERO
        })
    } else {
        amount
    }
}

/// Per-document parameters for turning raw cells into reported amounts.
#[derive(Debug, Clone, Copy)]
struct Normalizer<'a> {
    document_type: DocumentType,
    currency_code: &'a str,
    exchange_rate: Decimal,
}

impl Normalizer<'_> {
    fn convert(&self, raw: Decimal) -> Decimal {
        convert(raw, self.currency_code, self.exchange_rate)
    }

    /// raw value -> currency conversion -> sign -> cents
    fn apply(&self, raw: Decimal) -> Decimal {
        round_amount(signed(self.convert(raw), self.document_type))
    }

    fn apply_sum(&self, raws: &[Decimal]) -> Decimal {
        let converted = checked_sum(raws.iter().map(|raw| self.convert(*raw)));
        round_amount(signed(converted, self.document_type))
    }
}

/// Explode one source record into its Holistor rows: one per populated VAT
/// bracket, or a single zero-bracket row when no bracket is populated.
///
/// Exempt/untaxed and other amounts are attached to the first bracket row
/// only. A record reporting nothing but a total (e.g. letter C receipts) is
/// emitted as a zero-bracket exempt row. Blank records produce no rows.
pub fn expand(record: &SourceRecord, capabilities: Capabilities) -> Vec<OutputRow> {
    if record.is_blank() {
        return Vec::new();
    }

    let classification = classify(&record.document_description, capabilities);
    let header = RecordHeader::from(record);
    let normalizer = Normalizer {
        document_type: classification.document_type,
        currency_code: if capabilities.supports_currency_conversion {
            record.currency_code.as_str()
        } else {
            ""
        },
        exchange_rate: record.exchange_rate,
    };

    let zero_rate = if capabilities.supports_zero_rate_bracket {
        record.net_zero_rate
    } else {
        Decimal::ZERO
    };
    let exempt_or_untaxed =
        normalizer.apply_sum(&[record.net_untaxed, record.exempt_ops, zero_rate]);
    let other_concepts = normalizer.apply(record.other_taxes);
    let has_extras = !exempt_or_untaxed.is_zero() || !other_concepts.is_zero();

    let mut taxed: Vec<(Bracket, Amounts)> = taxed_columns(record)
        .into_iter()
        .filter_map(|(bracket, net, vat)| {
            let amounts = Amounts {
                net: normalizer.apply(net),
                vat: normalizer.apply(vat),
                ..Amounts::default()
            };
            if amounts.net.is_zero() && amounts.vat.is_zero() {
                None
            } else {
                Some((bracket, amounts))
            }
        })
        .collect();

    if let Some((_, first)) = taxed.first_mut() {
        if has_extras {
            first.exempt_or_untaxed = exempt_or_untaxed;
            first.other_concepts = other_concepts;
        }
    } else if has_extras {
        taxed.push((
            Bracket::Zero,
            Amounts {
                exempt_or_untaxed,
                other_concepts,
                ..Amounts::default()
            },
        ));
    } else {
        let total = normalizer.apply(record.total_amount);
        if !total.is_zero() {
            taxed.push((
                Bracket::Zero,
                Amounts {
                    exempt_or_untaxed: total,
                    ..Amounts::default()
                },
            ));
        }
    }

    log::debug!(
        "{} {} -> {} row(s)",
        classification.document_type,
        header.description,
        taxed.len()
    );

    taxed
        .into_iter()
        .map(|(bracket, amounts)| OutputRow::new(&header, &classification, bracket, amounts))
        .collect()
}
