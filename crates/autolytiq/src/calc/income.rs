use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use super::{
    require_positive, round_currency, CalcError, MONTHS_PER_YEAR, WEEKS_PER_YEAR,
};

const DAYS_PER_YEAR: f64 = 365.0;
const AUTO_PAYMENT_SHARE: f64 = 0.12;
const RENT_SHARE: f64 = 0.30;

/// Annualised income extrapolated from a year-to-date paystub figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IncomeProjection {
    pub effective_start: NaiveDate,
    pub days_worked: i64,
    pub gross_annual: i64,
    pub gross_monthly: i64,
    pub gross_weekly: i64,
    pub gross_daily: i64,
    pub max_auto_payment: i64,
    pub max_rent: i64,
}

/// Projects annual income from `ytd_income` earned between `start_date` and `check_date`.
///
/// Earnings before January 1st of the check year are ignored, so the effective start is
/// the later of `start_date` and that January 1st. The day count is inclusive.
pub fn project_income(
    ytd_income: f64,
    start_date: NaiveDate,
    check_date: NaiveDate,
) -> Result<IncomeProjection, CalcError> {
    let ytd_income = require_positive("ytd_income", ytd_income)?;

    let year_start = NaiveDate::from_ymd_opt(check_date.year(), 1, 1)
        .ok_or(CalcError::invalid("check_date", "is outside the supported calendar"))?;
    let effective_start = start_date.max(year_start);

    let days_worked = (check_date - effective_start).num_days() + 1;
    if days_worked <= 0 {
        return Err(CalcError::invalid(
            "check_date",
            "must not precede the start date",
        ));
    }

    let daily = ytd_income / days_worked as f64;
    let annual = daily * DAYS_PER_YEAR;
    let monthly = annual / MONTHS_PER_YEAR;
    let weekly = annual / WEEKS_PER_YEAR;

    Ok(IncomeProjection {
        effective_start,
        days_worked,
        gross_annual: round_currency(annual),
        gross_monthly: round_currency(monthly),
        gross_weekly: round_currency(weekly),
        gross_daily: round_currency(daily),
        max_auto_payment: round_currency(monthly * AUTO_PAYMENT_SHARE),
        max_rent: round_currency(monthly * RENT_SHARE),
    })
}
