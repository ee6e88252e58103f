/// Layout generations of the "Recibidos" export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Variant {
    /// Original AFIP export: invoices, credit and debit notes only.
    Afip,
    /// ARCA export, which also lists receipts.
    Arca,
    /// Current ARCA export with foreign-currency documents and a 0% bracket column.
    #[default]
    ArcaUsd,
}

/// What the expander is allowed to interpret in a source row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub recognizes_receipts: bool,
    pub supports_zero_rate_bracket: bool,
    pub supports_currency_conversion: bool,
}

impl Capabilities {
    pub const fn for_variant(variant: Variant) -> Self {
        match variant {
            Variant::Afip => Capabilities {
                recognizes_receipts: false,
                supports_zero_rate_bracket: false,
                supports_currency_conversion: false,
            },
            Variant::Arca => Capabilities {
                recognizes_receipts: true,
                supports_zero_rate_bracket: false,
                supports_currency_conversion: false,
            },
            Variant::ArcaUsd => Capabilities {
                recognizes_receipts: true,
                supports_zero_rate_bracket: true,
                supports_currency_conversion: true,
            },
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities::for_variant(Variant::default())
    }
}

impl From<Variant> for Capabilities {
    fn from(variant: Variant) -> Self {
        Capabilities::for_variant(variant)
    }
}
