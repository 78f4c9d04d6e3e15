use serde::{Deserialize, Serialize};

use super::loan::{amortized_payment, monthly_rate};
use super::{
    require_non_negative, require_percent, require_positive, require_term_months, round_currency,
    round_tenth, CalcError,
};

/// Share of gross monthly income a car payment should stay under.
const AUTO_PAYMENT_LIMIT: f64 = 0.12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutoLoanInput {
    pub vehicle_price: f64,
    pub down_payment: f64,
    pub trade_in: f64,
    pub interest_rate_percent: f64,
    pub term_months: u32,
    /// Gross monthly income; zero skips the affordability check.
    pub monthly_income: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AutoAffordability {
    pub max_payment: i64,
    pub payment_percent_of_max: f64,
    pub affordable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AutoLoanResult {
    pub loan_amount: i64,
    pub monthly_payment: i64,
    pub term_months: u32,
    pub total_payments: i64,
    pub total_interest: i64,
    pub true_cost: i64,
    pub affordability: Option<AutoAffordability>,
}

pub fn compute_auto_loan(input: AutoLoanInput) -> Result<AutoLoanResult, CalcError> {
    let vehicle_price = require_positive("vehicle_price", input.vehicle_price)?;
    let down_payment = require_non_negative("down_payment", input.down_payment)?;
    let trade_in = require_non_negative("trade_in", input.trade_in)?;
    let rate = require_percent("interest_rate", input.interest_rate_percent)?;
    let term_months = require_term_months("term_months", input.term_months)?;
    let monthly_income = require_non_negative("monthly_income", input.monthly_income)?;

    let financed = vehicle_price - down_payment - trade_in;
    if financed <= 0.0 {
        return Err(CalcError::invalid(
            "loan_amount",
            "down payment and trade-in cover the full price",
        ));
    }

    let monthly_payment = round_currency(amortized_payment(
        financed,
        monthly_rate(rate),
        term_months,
    ));
    let loan_amount = round_currency(financed);
    let total_payments = monthly_payment * i64::from(term_months);
    let total_interest = total_payments - loan_amount;

    let affordability = (monthly_income > 0.0).then(|| {
        let max_payment = round_currency(monthly_income * AUTO_PAYMENT_LIMIT);
        let payment_percent_of_max = if max_payment > 0 {
            round_tenth(monthly_payment as f64 / max_payment as f64 * 100.0)
        } else {
            0.0
        };
        AutoAffordability {
            max_payment,
            payment_percent_of_max,
            affordable: monthly_payment <= max_payment,
        }
    });

    Ok(AutoLoanResult {
        loan_amount,
        monthly_payment,
        term_months,
        total_payments,
        total_interest,
        true_cost: round_currency(vehicle_price) + total_interest,
        affordability,
    })
}
