use serde::{Deserialize, Serialize};

use super::loan::monthly_rate;
use super::{
    require_non_negative, require_percent, require_positive, require_years, round_currency,
    round_tenth, CalcError,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InflationInput {
    pub amount: f64,
    pub rate_percent: f64,
    pub years: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InflationResult {
    pub original: i64,
    pub future_value: i64,
    pub purchasing_power_lost: i64,
    pub retained_percent: i64,
    pub years: u32,
}

/// Purchasing power of `amount` after `years` of inflation at `rate_percent`.
pub fn inflation_impact(input: InflationInput) -> Result<InflationResult, CalcError> {
    let amount = require_positive("amount", input.amount)?;
    let rate = require_percent("rate", input.rate_percent)?;
    let years = require_years("years", input.years)?;

    let future_value = amount / (1.0 + rate / 100.0).powi(years as i32);

    Ok(InflationResult {
        original: round_currency(amount),
        future_value: round_currency(future_value),
        purchasing_power_lost: round_currency(amount - future_value),
        retained_percent: round_currency(future_value / amount * 100.0),
        years,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompoundInput {
    pub principal: f64,
    pub monthly_contribution: f64,
    pub annual_rate_percent: f64,
    pub years: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompoundResult {
    pub future_value: i64,
    pub total_invested: i64,
    pub interest_earned: i64,
    pub growth_multiple: f64,
    pub years: u32,
}

/// Monthly compounding with a contribution added at the end of each month.
pub fn compound_growth(input: CompoundInput) -> Result<CompoundResult, CalcError> {
    let principal = require_positive("principal", input.principal)?;
    let contribution = require_non_negative("monthly_contribution", input.monthly_contribution)?;
    let rate = monthly_rate(require_percent("rate", input.annual_rate_percent)?);
    let years = require_years("years", input.years)?;
    let months = years * 12;

    let balance = (0..months).fold(principal, |balance, _| balance * (1.0 + rate) + contribution);
    let total_invested = principal + contribution * f64::from(months);

    Ok(CompoundResult {
        future_value: round_currency(balance),
        total_invested: round_currency(total_invested),
        interest_earned: round_currency(balance - total_invested),
        growth_multiple: round_tenth(balance / total_invested),
        years,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inflation_erodes_purchasing_power() {
        let result = inflation_impact(InflationInput {
            amount: 10_000.0,
            rate_percent: 3.0,
            years: 10,
        })
        .expect("computes");

        assert_eq!(result.future_value, 7_441);
        assert_eq!(result.purchasing_power_lost, 2_559);
        assert_eq!(result.retained_percent, 74);
    }

    #[test]
    fn zero_rate_compounding_is_plain_saving() {
        let result = compound_growth(CompoundInput {
            principal: 1_000.0,
            monthly_contribution: 100.0,
            annual_rate_percent: 0.0,
            years: 2,
        })
        .expect("computes");

        assert_eq!(result.future_value, 3_400);
        assert_eq!(result.total_invested, 3_400);
        assert_eq!(result.interest_earned, 0);
        assert_eq!(result.growth_multiple, 1.0);
    }

    #[test]
    fn positive_rate_earns_interest() {
        let result = compound_growth(CompoundInput {
            principal: 10_000.0,
            monthly_contribution: 500.0,
            annual_rate_percent: 8.0,
            years: 10,
        })
        .expect("computes");

        assert!(result.interest_earned > 0);
        assert_eq!(result.total_invested, 70_000);
        assert_eq!(
            result.future_value,
            result.total_invested + result.interest_earned
        );
    }

    #[test]
    fn rejects_horizons_beyond_a_century() {
        let result = compound_growth(CompoundInput {
            principal: 1_000.0,
            monthly_contribution: 100.0,
            annual_rate_percent: 7.0,
            years: 400_000_000,
        });
        assert_eq!(
            result,
            Err(CalcError::invalid("years", "must be between 1 and 100 years"))
        );
        assert!(inflation_impact(InflationInput {
            amount: 100.0,
            rate_percent: 2.0,
            years: 101,
        })
        .is_err());
    }

    #[test]
    fn rejects_zero_years() {
        assert!(inflation_impact(InflationInput {
            amount: 100.0,
            rate_percent: 2.0,
            years: 0,
        })
        .is_err());
    }
}
