//! Pure financial calculations backing the calculator pages.
//!
//! Every function maps typed numeric inputs to a typed result. Inputs are validated up
//! front and rejected with [`CalcError::InvalidInput`]; intermediate arithmetic runs in
//! `f64` and each published figure is rounded half away from zero to whole currency units.

mod budget;
mod gig;
mod growth;
mod housing;
mod income;
mod loan;
mod mortgage;
mod streams;
mod tax;
mod vehicle;

pub use budget::{
    allocate_budget, AllocationRule, BudgetAllocation, BudgetCategory, BudgetCategoryKind,
    CategoryRule, Subcategory, SubcategoryRule,
};
pub use gig::{project_gig_income, GigIncomeInput, GigIncomeResult, GigSource};
pub use growth::{
    compound_growth, inflation_impact, CompoundInput, CompoundResult, InflationInput,
    InflationResult,
};
pub use housing::{compare_rent_vs_buy, RentVsBuyInput, RentVsBuyResult};
pub use income::{project_income, IncomeProjection};
pub use loan::{loan_amount_from_payment, monthly_payment_from_principal};
pub use mortgage::{
    compute_mortgage, housing_affordability, HousingAffordability, MortgageInput,
    MortgageResult, PitiBreakdown,
};
pub use streams::{summarize_streams, IncomeStream, StreamShare, StreamsSummary};
pub use tax::{compute_taxes, FilingStatus, TaxBracket, TaxBreakdown, TaxInput, TaxYearConfig};
pub use vehicle::{compute_auto_loan, AutoAffordability, AutoLoanInput, AutoLoanResult};

/// Validation failure raised by the calculation engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalcError {
    #[error("invalid {field}: {reason}")]
    InvalidInput {
        field: &'static str,
        reason: &'static str,
    },
}

impl CalcError {
    pub(crate) const fn invalid(field: &'static str, reason: &'static str) -> Self {
        Self::InvalidInput { field, reason }
    }
}

pub(crate) const MONTHS_PER_YEAR: f64 = 12.0;
pub(crate) const WEEKS_PER_YEAR: f64 = 52.0;

/// Rounds half away from zero to whole currency units.
pub(crate) fn round_currency(value: f64) -> i64 {
    value.round() as i64
}

/// Rounds to a one-decimal percentage.
pub(crate) fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Largest currency amount any calculator accepts.
pub(crate) const MAX_AMOUNT: f64 = 1_000_000_000_000.0;
/// Longest loan term in months (100 years).
pub(crate) const MAX_TERM_MONTHS: u32 = 1_200;
/// Longest horizon in years for projections and mortgage terms.
pub(crate) const MAX_YEARS: u32 = 100;

pub(crate) fn require_positive(field: &'static str, value: f64) -> Result<f64, CalcError> {
    if !(value.is_finite() && value > 0.0) {
        Err(CalcError::invalid(field, "must be a positive amount"))
    } else if value > MAX_AMOUNT {
        Err(CalcError::invalid(field, "exceeds the supported range"))
    } else {
        Ok(value)
    }
}

pub(crate) fn require_non_negative(field: &'static str, value: f64) -> Result<f64, CalcError> {
    if !(value.is_finite() && value >= 0.0) {
        Err(CalcError::invalid(field, "must not be negative"))
    } else if value > MAX_AMOUNT {
        Err(CalcError::invalid(field, "exceeds the supported range"))
    } else {
        Ok(value)
    }
}

/// Percentages such as interest and tax rates, 0 through 100.
pub(crate) fn require_percent(field: &'static str, value: f64) -> Result<f64, CalcError> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(value)
    } else {
        Err(CalcError::invalid(field, "must be a percentage between 0 and 100"))
    }
}

/// Yearly growth or decline rates, -100 through 100.
pub(crate) fn require_growth_rate(field: &'static str, value: f64) -> Result<f64, CalcError> {
    if value.is_finite() && (-100.0..=100.0).contains(&value) {
        Ok(value)
    } else {
        Err(CalcError::invalid(field, "must be a yearly rate between -100 and 100"))
    }
}

pub(crate) fn require_term_months(field: &'static str, value: u32) -> Result<u32, CalcError> {
    if (1..=MAX_TERM_MONTHS).contains(&value) {
        Ok(value)
    } else {
        Err(CalcError::invalid(field, "must be between 1 and 1200 months"))
    }
}

pub(crate) fn require_years(field: &'static str, value: u32) -> Result<u32, CalcError> {
    if (1..=MAX_YEARS).contains(&value) {
        Ok(value)
    } else {
        Err(CalcError::invalid(field, "must be between 1 and 100 years"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(round_currency(2.5), 3);
        assert_eq!(round_currency(-2.5), -3);
        assert_eq!(round_currency(2.49), 2);
        assert_eq!(round_tenth(22.25), 22.3);
    }

    #[test]
    fn positive_guard_rejects_nan_and_zero() {
        assert!(require_positive("amount", f64::NAN).is_err());
        assert!(require_positive("amount", 0.0).is_err());
        assert_eq!(require_positive("amount", 1.5), Ok(1.5));
        assert_eq!(
            require_positive("amount", 2.0e12),
            Err(CalcError::invalid("amount", "exceeds the supported range"))
        );
    }

    #[test]
    fn term_and_year_guards_are_bounded() {
        assert!(require_term_months("term_months", 0).is_err());
        assert_eq!(require_term_months("term_months", 1_200), Ok(1_200));
        assert_eq!(
            require_term_months("term_months", 1_201),
            Err(CalcError::invalid("term_months", "must be between 1 and 1200 months"))
        );
        assert!(require_term_months("term_months", u32::MAX).is_err());
        assert!(require_years("years", 0).is_err());
        assert_eq!(require_years("years", 100), Ok(100));
        assert!(require_years("years", 101).is_err());
    }

    #[test]
    fn percent_guards_reject_out_of_range_rates() {
        assert_eq!(require_percent("rate", 100.0), Ok(100.0));
        assert!(require_percent("rate", 100.5).is_err());
        assert!(require_percent("rate", -0.1).is_err());
        assert_eq!(require_growth_rate("appreciation", -3.0), Ok(-3.0));
        assert!(require_growth_rate("appreciation", f64::INFINITY).is_err());
    }
}
