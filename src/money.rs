use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Parse a spreadsheet amount cell, coercing anything unreadable to zero.
///
/// Accepts plain (`1234.56`), Argentine (`1.234,56`, `1234,56`), thousands-comma
/// (`1,234.56`) and scientific (`1.5E+3`) notation. A lone separator is read as
/// the decimal point.
pub fn parse_amount(raw: &str) -> Decimal {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '$')
        .collect();
    if cleaned.is_empty() {
        return Decimal::ZERO;
    }

    let normalized = normalize_separators(&cleaned);
    Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
        .unwrap_or_else(|_| {
            log::debug!("Non-numeric amount {:?} read as zero", raw);
            Decimal::ZERO
        })
}

fn normalize_separators(s: &str) -> String {
    let commas = s.matches(',').count();
    let dots = s.matches('.').count();
    match (s.rfind(','), s.rfind('.')) {
        // 1.234,56
        (Some(comma), Some(dot)) if comma > dot => s.replace('.', "").replace(',', "."),
        // 1,234.56
        (Some(_), Some(_)) => s.replace(',', ""),
        (Some(_), None) if commas == 1 => s.replace(',', "."),
        (Some(_), None) => s.replace(',', ""),
        (None, Some(_)) if dots > 1 => s.replace('.', ""),
        _ => s.to_string(),
    }
}

/// Round to whole cents, halves away from zero (`1140.625` -> `1140.63`).
pub fn round_amount(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Format an amount the way the Holistor import expects: two decimals with
/// `,` as the thousands separator, e.g. `-1,234.50`.
pub fn format_amount(amount: Decimal) -> String {
    let rounded = round_amount(amount);
    let digits = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{}{}.{}", sign, grouped, frac_part)
}

/// Format a VAT rate as a fixed-point indicator with three decimals, e.g. `10.500`.
pub fn format_rate(rate: Decimal) -> String {
    format!("{:.3}", rate)
}
