//! Tax split for tax-inclusive amounts in minor currency units.

/// Basis points denominator: 10_000 bps = 100%.
pub const BPS_SCALE: i64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxSplit {
    pub amount_including_tax: i64,
    pub amount_excluding_tax: i64,
    pub tax_amount: i64,
}

/// Splits a tax-inclusive `amount` at `rate_bps` (1000 = 10%).
///
/// The exclusive part is floored: `amount * 10000 / (10000 + rate_bps)`.
pub fn split_inclusive(amount: i64, rate_bps: u32) -> TaxSplit {
    let excluding = amount_excluding_tax(amount, rate_bps);
    TaxSplit {
        amount_including_tax: amount,
        amount_excluding_tax: excluding,
        tax_amount: amount - excluding,
    }
}

pub fn amount_excluding_tax(amount: i64, rate_bps: u32) -> i64 {
    // widened so large amounts cannot overflow the multiplication
    let scaled = i128::from(amount) * i128::from(BPS_SCALE);
    let divisor = i128::from(BPS_SCALE) + i128::from(rate_bps);
    (scaled / divisor) as i64
}

pub fn tax_amount(amount: i64, rate_bps: u32) -> i64 {
    amount - amount_excluding_tax(amount, rate_bps)
}
