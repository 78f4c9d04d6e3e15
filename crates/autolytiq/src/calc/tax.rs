use serde::{Deserialize, Serialize};

use super::{
    require_non_negative, require_percent, require_positive, round_currency, CalcError,
    MONTHS_PER_YEAR,
};

/// Filing status the bracket table was published for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilingStatus {
    Single,
}

/// Marginal rate applied to income between `low` and `high` (`None` means unbounded).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaxBracket {
    pub low: f64,
    pub high: Option<f64>,
    pub rate: f64,
}

impl TaxBracket {
    fn width(&self) -> f64 {
        match self.high {
            Some(high) => high - self.low,
            None => f64::INFINITY,
        }
    }
}

/// Tax-year constants: brackets, standard deduction, and payroll tax parameters.
///
/// Values are versioned by year and passed into [`compute_taxes`] explicitly, so several
/// years can be evaluated side by side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxYearConfig {
    pub tax_year: i32,
    pub filing_status: FilingStatus,
    pub standard_deduction: f64,
    pub brackets: Vec<TaxBracket>,
    pub social_security_wage_base: f64,
    pub social_security_rate: f64,
    pub medicare_rate: f64,
}

impl TaxYearConfig {
    pub fn single_filer_2024() -> Self {
        let bracket = |low: f64, high: Option<f64>, rate: f64| TaxBracket { low, high, rate };
        Self {
            tax_year: 2024,
            filing_status: FilingStatus::Single,
            standard_deduction: 14_600.0,
            brackets: vec![
                bracket(0.0, Some(11_600.0), 0.10),
                bracket(11_600.0, Some(47_150.0), 0.12),
                bracket(47_150.0, Some(100_525.0), 0.22),
                bracket(100_525.0, Some(191_950.0), 0.24),
                bracket(191_950.0, Some(243_725.0), 0.32),
                bracket(243_725.0, Some(609_350.0), 0.35),
                bracket(609_350.0, None, 0.37),
            ],
            social_security_wage_base: 168_600.0,
            social_security_rate: 0.062,
            medicare_rate: 0.0145,
        }
    }

    /// Checks that brackets start at zero, are contiguous, and end open-ended.
    pub fn validate(&self) -> Result<(), CalcError> {
        let Some(first) = self.brackets.first() else {
            return Err(CalcError::invalid("brackets", "table is empty"));
        };
        if first.low != 0.0 {
            return Err(CalcError::invalid("brackets", "first bracket must start at zero"));
        }

        let mut expected_low = 0.0;
        for (index, bracket) in self.brackets.iter().enumerate() {
            if bracket.low != expected_low {
                return Err(CalcError::invalid("brackets", "brackets must be contiguous"));
            }
            if !(0.0..1.0).contains(&bracket.rate) {
                return Err(CalcError::invalid("brackets", "rates must be in [0, 1)"));
            }
            let is_last = index + 1 == self.brackets.len();
            match (bracket.high, is_last) {
                (Some(high), false) if high > bracket.low => expected_low = high,
                (None, true) => {}
                (None, false) => {
                    return Err(CalcError::invalid(
                        "brackets",
                        "only the last bracket may be open-ended",
                    ))
                }
                (Some(_), true) => {
                    return Err(CalcError::invalid(
                        "brackets",
                        "last bracket must be open-ended",
                    ))
                }
                (Some(_), false) => {
                    return Err(CalcError::invalid("brackets", "bracket bounds are inverted"))
                }
            }
        }

        require_non_negative("standard_deduction", self.standard_deduction)?;
        require_positive("social_security_wage_base", self.social_security_wage_base)?;
        Ok(())
    }

    /// Progressive tax owed on `taxable_income`.
    pub fn federal_tax(&self, taxable_income: f64) -> f64 {
        let mut remaining = taxable_income;
        let mut tax = 0.0;
        for bracket in &self.brackets {
            if remaining <= 0.0 {
                break;
            }
            let in_bracket = remaining.min(bracket.width());
            tax += in_bracket * bracket.rate;
            remaining -= in_bracket;
        }
        tax
    }
}

impl Default for TaxYearConfig {
    fn default() -> Self {
        Self::single_filer_2024()
    }
}

/// Paycheck inputs for a take-home estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaxInput {
    pub gross_annual: f64,
    pub retirement_401k_percent: f64,
    pub health_insurance_annual: f64,
    pub state_tax_rate_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TaxBreakdown {
    pub tax_year: i32,
    pub gross_annual: i64,
    pub federal_tax: i64,
    pub state_tax: i64,
    pub fica_tax: i64,
    pub social_security: i64,
    pub medicare: i64,
    pub retirement_401k: i64,
    pub health_insurance: i64,
    pub total_deductions: i64,
    pub net_annual: i64,
    pub net_monthly: i64,
    /// Federal, state, and FICA as a share of gross, one decimal.
    pub effective_tax_rate: f64,
}

/// Federal (progressive), state (flat on AGI), and FICA taxes for a single filer.
///
/// Aggregates are summed from the rounded components so that
/// `fica_tax == social_security + medicare` and
/// `net_annual == gross_annual - total_deductions` hold exactly.
pub fn compute_taxes(config: &TaxYearConfig, input: TaxInput) -> Result<TaxBreakdown, CalcError> {
    let gross = require_positive("gross_annual", input.gross_annual)?;
    let retirement_percent =
        require_percent("retirement_401k_percent", input.retirement_401k_percent)?;
    let health_insurance =
        require_non_negative("health_insurance_annual", input.health_insurance_annual)?;
    let state_rate = require_percent("state_tax_rate", input.state_tax_rate_percent)?;

    let retirement = gross * (retirement_percent / 100.0);
    let agi = gross - retirement - health_insurance;

    let taxable_income = (agi - config.standard_deduction).max(0.0);
    let federal_tax = config.federal_tax(taxable_income);
    let state_tax = agi * (state_rate / 100.0);

    let social_security = gross.min(config.social_security_wage_base) * config.social_security_rate;
    let medicare = gross * config.medicare_rate;

    let tax_only = federal_tax + state_tax + social_security + medicare;
    let effective_tax_rate = (tax_only / gross * 1000.0).round() / 10.0;

    let gross_annual = round_currency(gross);
    let federal_tax = round_currency(federal_tax);
    let state_tax = round_currency(state_tax);
    let social_security = round_currency(social_security);
    let medicare = round_currency(medicare);
    let retirement_401k = round_currency(retirement);
    let health_insurance = round_currency(health_insurance);

    let fica_tax = social_security + medicare;
    let total_deductions = federal_tax + state_tax + fica_tax + retirement_401k + health_insurance;
    let net_annual = gross_annual - total_deductions;

    Ok(TaxBreakdown {
        tax_year: config.tax_year,
        gross_annual,
        federal_tax,
        state_tax,
        fica_tax,
        social_security,
        medicare,
        retirement_401k,
        health_insurance,
        total_deductions,
        net_annual,
        net_monthly: round_currency(net_annual as f64 / MONTHS_PER_YEAR),
        effective_tax_rate,
    })
}
