use serde::{Deserialize, Serialize};

use super::loan::{amortized_payment, monthly_rate};
use super::{
    require_non_negative, require_percent, require_positive, require_years, round_currency,
    round_tenth, CalcError, MONTHS_PER_YEAR,
};

/// Down payment share below which private mortgage insurance applies.
const PMI_DOWN_PAYMENT_THRESHOLD: f64 = 20.0;
const PMI_ANNUAL_RATE: f64 = 0.005;
/// Front-end ratio ceiling used by lenders (the "28" of the 28/36 rule).
const HOUSING_RATIO_LIMIT: f64 = 28.0;

/// Inputs for a fixed-rate mortgage quote.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MortgageInput {
    pub home_price: f64,
    pub down_payment_percent: f64,
    pub interest_rate_percent: f64,
    pub term_years: u32,
    pub property_tax_rate_percent: f64,
    pub annual_insurance: f64,
}

/// Principal, interest, taxes, and insurance (plus PMI) per month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PitiBreakdown {
    pub principal_interest: i64,
    pub property_tax: i64,
    pub insurance: i64,
    pub pmi: i64,
    pub total_monthly: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MortgageResult {
    pub home_price: f64,
    pub down_payment: i64,
    pub down_payment_percent: f64,
    pub loan_amount: i64,
    pub interest_rate_percent: f64,
    pub term_years: u32,
    pub piti: PitiBreakdown,
    pub total_payments: i64,
    pub total_interest: i64,
}

impl MortgageResult {
    pub fn requires_pmi(&self) -> bool {
        self.piti.pmi > 0
    }
}

pub fn compute_mortgage(input: MortgageInput) -> Result<MortgageResult, CalcError> {
    let home_price = require_positive("home_price", input.home_price)?;
    let down_payment_percent =
        require_non_negative("down_payment_percent", input.down_payment_percent)?;
    if down_payment_percent > 100.0 {
        return Err(CalcError::invalid(
            "down_payment_percent",
            "must not exceed the home price",
        ));
    }
    let interest_rate_percent =
        require_percent("interest_rate", input.interest_rate_percent)?;
    let term_years = require_years("term_years", input.term_years)?;
    let property_tax_rate =
        require_percent("property_tax_rate", input.property_tax_rate_percent)?;
    let annual_insurance = require_non_negative("annual_insurance", input.annual_insurance)?;

    let down_payment = home_price * (down_payment_percent / 100.0);
    let loan_amount = home_price - down_payment;
    let term_months = term_years * 12;

    let principal_interest = amortized_payment(
        loan_amount,
        monthly_rate(interest_rate_percent),
        term_months,
    );
    let property_tax = home_price * (property_tax_rate / 100.0) / MONTHS_PER_YEAR;
    let insurance = annual_insurance / MONTHS_PER_YEAR;
    let pmi = if down_payment_percent < PMI_DOWN_PAYMENT_THRESHOLD {
        loan_amount * PMI_ANNUAL_RATE / MONTHS_PER_YEAR
    } else {
        0.0
    };

    let mut piti = PitiBreakdown {
        principal_interest: round_currency(principal_interest),
        property_tax: round_currency(property_tax),
        insurance: round_currency(insurance),
        pmi: round_currency(pmi),
        total_monthly: 0,
    };
    piti.total_monthly = piti.principal_interest + piti.property_tax + piti.insurance + piti.pmi;

    let total_payments = principal_interest * f64::from(term_months);

    Ok(MortgageResult {
        home_price,
        down_payment: round_currency(down_payment),
        down_payment_percent,
        loan_amount: round_currency(loan_amount),
        interest_rate_percent,
        term_years,
        piti,
        total_payments: round_currency(total_payments),
        total_interest: round_currency(total_payments - loan_amount),
    })
}

/// Housing cost measured against gross income.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HousingAffordability {
    pub housing_ratio_percent: f64,
    pub affordable: bool,
}

/// Compares a monthly housing cost to gross income; `None` when no income is known.
pub fn housing_affordability(total_monthly: i64, annual_income: f64) -> Option<HousingAffordability> {
    if !(annual_income.is_finite() && annual_income > 0.0) {
        return None;
    }
    let ratio = total_monthly as f64 / (annual_income / MONTHS_PER_YEAR) * 100.0;
    Some(HousingAffordability {
        housing_ratio_percent: round_tenth(ratio),
        affordable: ratio <= HOUSING_RATIO_LIMIT,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(down_payment_percent: f64) -> MortgageInput {
        MortgageInput {
            home_price: 400_000.0,
            down_payment_percent,
            interest_rate_percent: 6.5,
            term_years: 30,
            property_tax_rate_percent: 1.2,
            annual_insurance: 1_500.0,
        }
    }

    #[test]
    fn twenty_percent_down_has_no_pmi() {
        let result = compute_mortgage(input(20.0)).expect("quote computes");

        assert_eq!(result.down_payment, 80_000);
        assert_eq!(result.loan_amount, 320_000);
        assert_eq!(result.piti.pmi, 0);
        assert!(!result.requires_pmi());
        assert_eq!(result.piti.principal_interest, 2_023);
        assert_eq!(result.piti.property_tax, 400);
        assert_eq!(result.piti.insurance, 125);
        assert_eq!(
            result.piti.total_monthly,
            result.piti.principal_interest
                + result.piti.property_tax
                + result.piti.insurance
                + result.piti.pmi
        );
    }

    #[test]
    fn under_twenty_percent_down_adds_pmi() {
        let result = compute_mortgage(input(10.0)).expect("quote computes");

        assert_eq!(result.loan_amount, 360_000);
        assert_eq!(result.piti.pmi, 150);
        assert!(result.requires_pmi());
        assert_eq!(
            result.piti.total_monthly,
            result.piti.principal_interest
                + result.piti.property_tax
                + result.piti.insurance
                + result.piti.pmi
        );
    }

    #[test]
    fn totals_cover_whole_term() {
        let result = compute_mortgage(input(20.0)).expect("quote computes");
        assert!(result.total_payments > result.loan_amount);
        assert_eq!(
            result.total_interest,
            result.total_payments - result.loan_amount
        );
    }

    #[test]
    fn zero_rate_divides_evenly() {
        let mut zero = input(20.0);
        zero.interest_rate_percent = 0.0;
        let result = compute_mortgage(zero).expect("quote computes");
        assert_eq!(result.piti.principal_interest, 889);
        assert_eq!(result.total_interest, 0);
    }

    #[test]
    fn rejects_invalid_inputs() {
        let mut bad_price = input(20.0);
        bad_price.home_price = 0.0;
        assert!(compute_mortgage(bad_price).is_err());

        let mut bad_term = input(20.0);
        bad_term.term_years = 0;
        assert!(compute_mortgage(bad_term).is_err());

        let mut endless = input(20.0);
        endless.term_years = 400_000_000;
        assert_eq!(
            compute_mortgage(endless),
            Err(CalcError::invalid("term_years", "must be between 1 and 100 years"))
        );

        assert!(compute_mortgage(input(120.0)).is_err());
    }

    #[test]
    fn housing_ratio_checks_twenty_eight_percent() {
        let ok = housing_affordability(1_700, 75_000.0).expect("income present");
        assert_eq!(ok.housing_ratio_percent, 27.2);
        assert!(ok.affordable);

        let stretched = housing_affordability(2_548, 75_000.0).expect("income present");
        assert!(!stretched.affordable);

        assert!(housing_affordability(2_000, 0.0).is_none());
    }
}
