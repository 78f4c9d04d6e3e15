use serde::{Deserialize, Serialize};

use super::loan::{amortized_payment, monthly_rate};
use super::{
    require_growth_rate, require_non_negative, require_percent, require_positive, require_years,
    round_currency, round_tenth, CalcError, MONTHS_PER_YEAR,
};

const MORTGAGE_TERM_MONTHS: u32 = 360;
const PROPERTY_TAX_RATE: f64 = 0.011;
const MONTHLY_INSURANCE: i64 = 100;
const MAINTENANCE_RATE: f64 = 0.01;
const PMI_ANNUAL_RATE: f64 = 0.005;
const PMI_DOWN_PAYMENT_THRESHOLD: f64 = 20.0;
/// Rough share of early mortgage payments that retire principal.
const EARLY_PRINCIPAL_SHARE: f64 = 0.30;
/// Market return assumed for a down payment that stays invested instead.
const OPPORTUNITY_RETURN: f64 = 0.07;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RentVsBuyInput {
    pub home_price: f64,
    pub down_payment_percent: f64,
    pub mortgage_rate_percent: f64,
    pub home_appreciation_percent: f64,
    pub monthly_rent: f64,
    pub rent_increase_percent: f64,
    pub years: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RentVsBuyResult {
    pub years: u32,
    pub buy_wins: bool,
    pub savings: i64,
    pub buy_monthly: i64,
    pub down_payment: i64,
    pub buy_total_paid: i64,
    pub future_home_value: i64,
    pub equity: i64,
    pub buy_net_cost: i64,
    pub rent_start: i64,
    pub rent_end: i64,
    pub rent_total: i64,
    pub investment_returns: i64,
    pub rent_net_cost: i64,
    pub price_to_rent_ratio: f64,
}

/// Compares owning against renting over `years`, net of equity and investment returns.
pub fn compare_rent_vs_buy(input: RentVsBuyInput) -> Result<RentVsBuyResult, CalcError> {
    let home_price = require_positive("home_price", input.home_price)?;
    let monthly_rent = require_positive("monthly_rent", input.monthly_rent)?;
    let down_percent = require_non_negative("down_payment_percent", input.down_payment_percent)?;
    if down_percent > 100.0 {
        return Err(CalcError::invalid(
            "down_payment_percent",
            "must not exceed the home price",
        ));
    }
    let mortgage_rate = require_percent("mortgage_rate", input.mortgage_rate_percent)?;
    let years = require_years("years", input.years)?;
    let appreciation_rate =
        require_growth_rate("home_appreciation", input.home_appreciation_percent)?;
    let rent_increase = require_growth_rate("rent_increase", input.rent_increase_percent)?;
    let months = i64::from(years) * 12;

    let down_payment = home_price * down_percent / 100.0;
    let loan_amount = home_price - down_payment;

    let mortgage = round_currency(amortized_payment(
        loan_amount,
        monthly_rate(mortgage_rate),
        MORTGAGE_TERM_MONTHS,
    ));
    let property_tax = round_currency(home_price * PROPERTY_TAX_RATE / MONTHS_PER_YEAR);
    let maintenance = round_currency(home_price * MAINTENANCE_RATE / MONTHS_PER_YEAR);
    let pmi = if down_percent < PMI_DOWN_PAYMENT_THRESHOLD {
        round_currency(loan_amount * PMI_ANNUAL_RATE / MONTHS_PER_YEAR)
    } else {
        0
    };
    let buy_monthly = mortgage + property_tax + MONTHLY_INSURANCE + maintenance + pmi;
    let buy_total_paid = buy_monthly * months + round_currency(down_payment);

    let appreciation = 1.0 + appreciation_rate / 100.0;
    let future_home_value = home_price * appreciation.powi(years as i32);
    let principal_paid = round_currency((mortgage * months) as f64 * EARLY_PRINCIPAL_SHARE);
    let equity = round_currency(down_payment)
        .saturating_add(round_currency(future_home_value - home_price))
        .saturating_add(principal_paid);
    let buy_net_cost = buy_total_paid.saturating_sub(equity);

    // A century of steep escalation leaves i64 range, so yearly sums saturate.
    let escalation = 1.0 + rent_increase / 100.0;
    let mut rent_total: i64 = 0;
    let mut current_rent = monthly_rent;
    let mut final_rent = monthly_rent;
    for _ in 0..years {
        rent_total = rent_total.saturating_add(round_currency(current_rent * MONTHS_PER_YEAR));
        final_rent = current_rent;
        current_rent *= escalation;
    }

    let invested = down_payment * (1.0 + OPPORTUNITY_RETURN).powi(years as i32);
    let investment_returns = round_currency(invested - down_payment);
    let rent_net_cost = rent_total.saturating_sub(investment_returns);

    let buy_wins = buy_net_cost < rent_net_cost;

    Ok(RentVsBuyResult {
        years,
        buy_wins,
        savings: rent_net_cost.saturating_sub(buy_net_cost).saturating_abs(),
        buy_monthly,
        down_payment: round_currency(down_payment),
        buy_total_paid,
        future_home_value: round_currency(future_home_value),
        equity,
        buy_net_cost,
        rent_start: round_currency(monthly_rent),
        rent_end: round_currency(final_rent),
        rent_total,
        investment_returns,
        rent_net_cost,
        price_to_rent_ratio: round_tenth(home_price / (monthly_rent * MONTHS_PER_YEAR)),
    })
}
