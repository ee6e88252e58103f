use super::capabilities::Capabilities;
use std::fmt;

/// Kind of fiscal document, derived from the "Tipo" description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentType {
    Invoice,
    CreditNote,
    DebitNote,
    Receipt,
    Unknown,
}

impl DocumentType {
    /// Code used in the Holistor "Tipo" column.
    pub fn code(&self) -> &'static str {
        match self {
            DocumentType::Invoice => "F",
            DocumentType::CreditNote => "NC",
            DocumentType::DebitNote => "ND",
            DocumentType::Receipt => "R",
            DocumentType::Unknown => "",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentType::Invoice => "Invoice",
            DocumentType::CreditNote => "Credit Note",
            DocumentType::DebitNote => "Debit Note",
            DocumentType::Receipt => "Receipt",
            DocumentType::Unknown => "Unknown",
        };
        write!(f, "{}", name)
    }
}

/// Fiscal condition of the issuer as reported to Holistor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaxCondition {
    /// Responsable Inscripto
    RegisteredResponsible,
    /// Monotributo
    SimplifiedTaxpayer,
}

impl TaxCondition {
    /// Only letter A documents are issued by registered VAT payers.
    pub fn from_letter(letter: &str) -> Self {
        if letter == "A" {
            TaxCondition::RegisteredResponsible
        } else {
            TaxCondition::SimplifiedTaxpayer
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            TaxCondition::RegisteredResponsible => "RI",
            TaxCondition::SimplifiedTaxpayer => "MT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub document_type: DocumentType,
    /// Invoice category (A/B/C...), empty when the description is empty.
    pub letter: String,
}

impl Classification {
    pub fn tax_condition(&self) -> TaxCondition {
        TaxCondition::from_letter(&self.letter)
    }
}

const CREDIT_NOTE_MARKERS: &[&str] = &["Nota de Crédito", "Credit Note"];
const DEBIT_NOTE_MARKERS: &[&str] = &["Nota de Débito", "Debit Note"];
const RECEIPT_MARKERS: &[&str] = &["Recibo", "Receipt"];
const INVOICE_MARKERS: &[&str] = &["Factura", "Invoice"];

/// Code 8 ("Nota de Crédito C") is reported by the tax authority for
/// documents that are actually letter B.
const LETTER_B_OVERRIDE_PREFIX: &str = "8 ";

/// Classify a document description such as `"3 - Nota de Crédito A"`.
pub fn classify(description: &str, capabilities: Capabilities) -> Classification {
    let description = description.trim();
    Classification {
        document_type: document_type(description, capabilities),
        letter: letter(description),
    }
}

fn document_type(description: &str, capabilities: Capabilities) -> DocumentType {
    let contains_any = |markers: &[&str]| markers.iter().any(|m| description.contains(m));

    if description.is_empty() {
        DocumentType::Unknown
    } else if contains_any(CREDIT_NOTE_MARKERS) {
        DocumentType::CreditNote
    } else if contains_any(DEBIT_NOTE_MARKERS) {
        DocumentType::DebitNote
    } else if capabilities.recognizes_receipts && contains_any(RECEIPT_MARKERS) {
        DocumentType::Receipt
    } else if contains_any(INVOICE_MARKERS) {
        DocumentType::Invoice
    } else {
        DocumentType::Unknown
    }
}

fn letter(description: &str) -> String {
    if description.starts_with(LETTER_B_OVERRIDE_PREFIX) {
        return "B".to_string();
    }
    description
        .chars()
        .last()
        .map(String::from)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::capabilities::Variant;

    fn latest(description: &str) -> Classification {
        classify(description, Capabilities::default())
    }

    #[test]
    fn classify_invoice() {
        let c = latest("Invoice A");
        assert_eq!(c.document_type, DocumentType::Invoice);
        assert_eq!(c.letter, "A");

        let c = latest("1 - Factura A");
        assert_eq!(c.document_type, DocumentType::Invoice);
        assert_eq!(c.letter, "A");
    }

    #[test]
    fn classify_empty_description() {
        let c = latest("");
        assert_eq!(c.document_type, DocumentType::Unknown);
        assert_eq!(c.letter, "");

        let c = latest("   ");
        assert_eq!(c.document_type, DocumentType::Unknown);
        assert_eq!(c.letter, "");
    }

    #[test]
    fn code_eight_prefix_forces_letter_b() {
        let c = latest("8 - Credit Note C");
        assert_eq!(c.document_type, DocumentType::CreditNote);
        assert_eq!(c.letter, "B");

        let c = latest("  8 - Nota de Crédito C ");
        assert_eq!(c.document_type, DocumentType::CreditNote);
        assert_eq!(c.letter, "B");
    }

    #[test]
    fn code_eight_prefix_applies_to_any_document_type() {
        let c = latest("8 - Factura C");
        assert_eq!(c.document_type, DocumentType::Invoice);
        assert_eq!(c.letter, "B");
    }

    #[test]
    fn prefix_without_space_is_not_overridden() {
        let c = latest("81 - Factura C");
        assert_eq!(c.letter, "C");
    }

    #[test]
    fn credit_note_wins_over_invoice() {
        let c = latest("Credit Note for Invoice B");
        assert_eq!(c.document_type, DocumentType::CreditNote);
        assert_eq!(c.letter, "B");
    }

    #[test]
    fn debit_note() {
        let c = latest("2 - Nota de Débito A");
        assert_eq!(c.document_type, DocumentType::DebitNote);
        assert_eq!(c.letter, "A");
    }

    #[test]
    fn receipts_depend_on_capability() {
        let c = latest("15 - Recibo C");
        assert_eq!(c.document_type, DocumentType::Receipt);
        assert_eq!(c.letter, "C");

        let c = classify("15 - Recibo C", Capabilities::from(Variant::Afip));
        assert_eq!(c.document_type, DocumentType::Unknown);
        assert_eq!(c.letter, "C");
    }

    #[test]
    fn unrecognised_description() {
        let c = latest("Ticket X");
        assert_eq!(c.document_type, DocumentType::Unknown);
        assert_eq!(c.letter, "X");
    }

    #[test]
    fn tax_condition_from_letter() {
        assert_eq!(latest("Invoice A").tax_condition(), TaxCondition::RegisteredResponsible);
        assert_eq!(latest("Invoice B").tax_condition(), TaxCondition::SimplifiedTaxpayer);
        assert_eq!(latest("Invoice C").tax_condition(), TaxCondition::SimplifiedTaxpayer);
        assert_eq!(TaxCondition::RegisteredResponsible.code(), "RI");
        assert_eq!(TaxCondition::SimplifiedTaxpayer.code(), "MT");
    }

    #[test]
    fn document_type_codes() {
        assert_eq!(DocumentType::Invoice.code(), "F");
        assert_eq!(DocumentType::CreditNote.code(), "NC");
        assert_eq!(DocumentType::DebitNote.code(), "ND");
        assert_eq!(DocumentType::Receipt.code(), "R");
        assert_eq!(DocumentType::Unknown.code(), "");
    }
}
