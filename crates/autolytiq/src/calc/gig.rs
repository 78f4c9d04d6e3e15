use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::income::{project_income, IncomeProjection};
use super::{require_non_negative, round_currency, CalcError, MONTHS_PER_YEAR};

/// IRS standard mileage rate, dollars per mile.
const MILEAGE_RATE: f64 = 0.67;
const SELF_EMPLOYMENT_TAX_RATE: f64 = 0.153;
const FULL_TIME_HOURS: f64 = 2_080.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GigSource {
    pub name: String,
    pub ytd_income: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GigIncomeInput {
    pub sources: Vec<GigSource>,
    pub miles_driven: f64,
    pub other_expenses: f64,
    pub start_date: NaiveDate,
    pub check_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GigIncomeResult {
    pub total_ytd: i64,
    pub projection: IncomeProjection,
    pub mileage_deduction: i64,
    pub total_expenses: i64,
    pub self_employment_tax: i64,
    pub net_after_expenses: i64,
    pub net_after_tax: i64,
    pub net_monthly: i64,
    pub effective_hourly: i64,
}

/// Projects combined gig earnings and nets out mileage, expenses, and self-employment tax.
pub fn project_gig_income(input: &GigIncomeInput) -> Result<GigIncomeResult, CalcError> {
    let mut total_ytd = 0.0;
    for source in &input.sources {
        total_ytd += require_non_negative("ytd_income", source.ytd_income)?;
    }
    if total_ytd <= 0.0 {
        return Err(CalcError::invalid(
            "sources",
            "at least one gig must report income",
        ));
    }
    let miles = require_non_negative("miles_driven", input.miles_driven)?;
    let other_expenses = require_non_negative("other_expenses", input.other_expenses)?;

    let projection = project_income(total_ytd, input.start_date, input.check_date)?;
    let gross_annual = projection.gross_annual as f64;

    let mileage_deduction = miles * MILEAGE_RATE;
    let total_expenses = mileage_deduction + other_expenses;
    let self_employment_tax = gross_annual * SELF_EMPLOYMENT_TAX_RATE;
    let net_after_expenses = gross_annual - total_expenses;
    let net_after_tax = net_after_expenses - self_employment_tax;

    Ok(GigIncomeResult {
        total_ytd: round_currency(total_ytd),
        projection,
        mileage_deduction: round_currency(mileage_deduction),
        total_expenses: round_currency(total_expenses),
        self_employment_tax: round_currency(self_employment_tax),
        net_after_expenses: round_currency(net_after_expenses),
        net_after_tax: round_currency(net_after_tax),
        net_monthly: round_currency(net_after_tax / MONTHS_PER_YEAR),
        effective_hourly: round_currency(net_after_tax / FULL_TIME_HOURS),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn input() -> GigIncomeInput {
        GigIncomeInput {
            sources: vec![
                GigSource {
                    name: "Rideshare".to_string(),
                    ytd_income: 7_300.0,
                },
                GigSource {
                    name: "Delivery".to_string(),
                    ytd_income: 2_700.0,
                },
            ],
            miles_driven: 1_000.0,
            other_expenses: 330.0,
            start_date: date(2023, 6, 1),
            check_date: date(2024, 4, 9),
        }
    }

    #[test]
    fn combines_sources_and_deducts_costs() {
        let result = project_gig_income(&input()).expect("gig income computes");

        assert_eq!(result.total_ytd, 10_000);
        assert_eq!(result.projection.days_worked, 100);
        assert_eq!(result.projection.gross_annual, 36_500);
        assert_eq!(result.mileage_deduction, 670);
        assert_eq!(result.total_expenses, 1_000);
        assert_eq!(result.net_after_expenses, 35_500);
        assert_eq!(result.self_employment_tax, 5_585);
        assert_eq!(result.net_after_tax, 29_916);
    }

    #[test]
    fn rejects_when_no_source_reports_income() {
        let mut empty = input();
        for source in &mut empty.sources {
            source.ytd_income = 0.0;
        }
        assert!(project_gig_income(&empty).is_err());
    }
}
