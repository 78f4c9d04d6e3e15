use super::{require_percent, require_positive, require_term_months, round_currency, CalcError};

/// Converts an annual percentage rate into a monthly decimal rate.
pub(crate) fn monthly_rate(annual_rate_percent: f64) -> f64 {
    annual_rate_percent / 100.0 / 12.0
}

/// Unrounded level payment for `principal` over `term_months` at `rate` per month.
pub(crate) fn amortized_payment(principal: f64, rate: f64, term_months: u32) -> f64 {
    if rate == 0.0 {
        return principal / f64::from(term_months);
    }
    let factor = (1.0 + rate).powi(term_months as i32);
    principal * (rate * factor) / (factor - 1.0)
}

/// Unrounded present value of `term_months` level payments at `rate` per month.
pub(crate) fn present_value(payment: f64, rate: f64, term_months: u32) -> f64 {
    if rate == 0.0 {
        return payment * f64::from(term_months);
    }
    payment * (1.0 - (1.0 + rate).powi(-(term_months as i32))) / rate
}

/// Principal that a fixed monthly payment can service (reverse amortization).
pub fn loan_amount_from_payment(
    monthly_payment: f64,
    annual_rate_percent: f64,
    term_months: u32,
) -> Result<i64, CalcError> {
    let payment = require_positive("monthly_payment", monthly_payment)?;
    let annual_rate_percent = require_percent("interest_rate", annual_rate_percent)?;
    let term_months = require_term_months("term_months", term_months)?;

    Ok(round_currency(present_value(
        payment,
        monthly_rate(annual_rate_percent),
        term_months,
    )))
}

/// Level monthly payment that retires `principal` over `term_months`.
pub fn monthly_payment_from_principal(
    principal: f64,
    annual_rate_percent: f64,
    term_months: u32,
) -> Result<i64, CalcError> {
    let principal = require_positive("principal", principal)?;
    let annual_rate_percent = require_percent("interest_rate", annual_rate_percent)?;
    let term_months = require_term_months("term_months", term_months)?;

    Ok(round_currency(amortized_payment(
        principal,
        monthly_rate(annual_rate_percent),
        term_months,
    )))
}
