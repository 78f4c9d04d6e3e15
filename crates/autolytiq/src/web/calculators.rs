use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::calc::{
    allocate_budget, compare_rent_vs_buy, compound_growth, compute_auto_loan, compute_mortgage,
    compute_taxes, housing_affordability, inflation_impact, loan_amount_from_payment,
    monthly_payment_from_principal, project_gig_income, project_income, summarize_streams,
    AllocationRule, AutoLoanInput, AutoLoanResult, BudgetAllocation, CalcError, CompoundInput,
    CompoundResult, GigIncomeInput, GigIncomeResult, GigSource, HousingAffordability,
    IncomeProjection, IncomeStream, InflationInput, InflationResult, MortgageInput,
    MortgageResult, RentVsBuyInput, RentVsBuyResult, StreamsSummary, TaxBreakdown, TaxInput,
    TaxYearConfig,
};
use crate::error::AppError;

const DEFAULT_AUTO_TERM_MONTHS: u32 = 60;
const DEFAULT_MORTGAGE_TERM_YEARS: u32 = 30;
const DEFAULT_PROPERTY_TAX_RATE_PERCENT: f64 = 1.1;
const DEFAULT_ANNUAL_INSURANCE: f64 = 1_200.0;
const DEFAULT_RENT_VS_BUY_YEARS: u32 = 5;
pub const MAX_INCOME_STREAMS: usize = 10;

/// Rule tables the calculators read; swapped wholesale when a new tax year lands.
#[derive(Debug, Clone)]
pub struct CalculatorTables {
    pub tax_year: TaxYearConfig,
    pub standard_budget: AllocationRule,
    pub high_cost_budget: AllocationRule,
}

impl Default for CalculatorTables {
    fn default() -> Self {
        Self {
            tax_year: TaxYearConfig::single_filer_2024(),
            standard_budget: AllocationRule::fifty_thirty_twenty(),
            high_cost_budget: AllocationRule::sixty_twenty_twenty(),
        }
    }
}

/// JSON endpoints for every calculator under `/api/v1/calc`.
pub fn calculator_router(tables: Arc<CalculatorTables>) -> Router {
    Router::new()
        .route("/api/v1/calc/income", post(income_handler))
        .route("/api/v1/calc/loan-amount", post(loan_amount_handler))
        .route("/api/v1/calc/loan-payment", post(loan_payment_handler))
        .route("/api/v1/calc/mortgage", post(mortgage_handler))
        .route("/api/v1/calc/taxes", post(taxes_handler))
        .route("/api/v1/calc/budget", post(budget_handler))
        .route("/api/v1/calc/auto", post(auto_handler))
        .route("/api/v1/calc/rent-vs-buy", post(rent_vs_buy_handler))
        .route("/api/v1/calc/inflation", post(inflation_handler))
        .route("/api/v1/calc/compound", post(compound_handler))
        .route("/api/v1/calc/gig", post(gig_handler))
        .route("/api/v1/calc/streams", post(streams_handler))
        .with_state(tables)
}

#[derive(Debug, Deserialize)]
pub struct IncomeRequest {
    pub ytd_income: f64,
    pub start_date: NaiveDate,
    pub check_date: NaiveDate,
}

pub(crate) async fn income_handler(
    Json(request): Json<IncomeRequest>,
) -> Result<Json<IncomeProjection>, AppError> {
    let projection = project_income(request.ytd_income, request.start_date, request.check_date)?;
    Ok(Json(projection))
}

fn default_auto_term() -> u32 {
    DEFAULT_AUTO_TERM_MONTHS
}

#[derive(Debug, Deserialize)]
pub struct LoanAmountRequest {
    pub monthly_payment: f64,
    pub interest_rate_percent: f64,
    #[serde(default = "default_auto_term")]
    pub term_months: u32,
}

pub(crate) async fn loan_amount_handler(
    Json(request): Json<LoanAmountRequest>,
) -> Result<Json<Value>, AppError> {
    let loan_amount = loan_amount_from_payment(
        request.monthly_payment,
        request.interest_rate_percent,
        request.term_months,
    )?;
    Ok(Json(json!({
        "loan_amount": loan_amount,
        "term_months": request.term_months,
    })))
}

#[derive(Debug, Deserialize)]
pub struct LoanPaymentRequest {
    pub loan_amount: f64,
    pub interest_rate_percent: f64,
    #[serde(default = "default_auto_term")]
    pub term_months: u32,
}

pub(crate) async fn loan_payment_handler(
    Json(request): Json<LoanPaymentRequest>,
) -> Result<Json<Value>, AppError> {
    let monthly_payment = monthly_payment_from_principal(
        request.loan_amount,
        request.interest_rate_percent,
        request.term_months,
    )?;
    Ok(Json(json!({
        "monthly_payment": monthly_payment,
        "term_months": request.term_months,
    })))
}

/// Down payment may be given as a percent or in dollars; dollars win when both are set.
#[derive(Debug, Deserialize)]
pub struct MortgageRequest {
    pub home_price: f64,
    #[serde(default)]
    pub down_payment_percent: Option<f64>,
    #[serde(default)]
    pub down_payment: Option<f64>,
    pub interest_rate_percent: f64,
    #[serde(default)]
    pub term_years: Option<u32>,
    #[serde(default)]
    pub property_tax_rate_percent: Option<f64>,
    #[serde(default)]
    pub annual_insurance: Option<f64>,
    #[serde(default)]
    pub annual_income: Option<f64>,
}

impl MortgageRequest {
    fn to_input(&self) -> MortgageInput {
        let down_payment_percent = match (self.down_payment, self.down_payment_percent) {
            (Some(dollars), _) if dollars > 0.0 && self.home_price > 0.0 => {
                dollars / self.home_price * 100.0
            }
            (_, Some(percent)) => percent,
            _ => 0.0,
        };
        MortgageInput {
            home_price: self.home_price,
            down_payment_percent,
            interest_rate_percent: self.interest_rate_percent,
            term_years: self
                .term_years
                .filter(|years| *years > 0)
                .unwrap_or(DEFAULT_MORTGAGE_TERM_YEARS),
            property_tax_rate_percent: self
                .property_tax_rate_percent
                .filter(|rate| *rate > 0.0)
                .unwrap_or(DEFAULT_PROPERTY_TAX_RATE_PERCENT),
            annual_insurance: self
                .annual_insurance
                .filter(|amount| *amount > 0.0)
                .unwrap_or(DEFAULT_ANNUAL_INSURANCE),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MortgageResponse {
    #[serde(flatten)]
    pub mortgage: MortgageResult,
    pub requires_pmi: bool,
    pub affordability: Option<HousingAffordability>,
}

pub(crate) async fn mortgage_handler(
    Json(request): Json<MortgageRequest>,
) -> Result<Json<MortgageResponse>, AppError> {
    let mortgage = compute_mortgage(request.to_input())?;
    let affordability = request
        .annual_income
        .and_then(|income| housing_affordability(mortgage.piti.total_monthly, income));
    Ok(Json(MortgageResponse {
        requires_pmi: mortgage.requires_pmi(),
        mortgage,
        affordability,
    }))
}

#[derive(Debug, Deserialize)]
pub struct TaxRequest {
    pub gross_annual: f64,
    #[serde(default)]
    pub retirement_401k_percent: f64,
    #[serde(default)]
    pub health_insurance_annual: f64,
    #[serde(default)]
    pub state_tax_rate_percent: f64,
}

#[derive(Debug, Serialize)]
pub struct TaxShares {
    pub federal_percent: f64,
    pub state_percent: f64,
    pub fica_percent: f64,
    pub take_home_percent: f64,
}

#[derive(Debug, Serialize)]
pub struct TaxResponse {
    #[serde(flatten)]
    pub breakdown: TaxBreakdown,
    pub net_biweekly: i64,
    pub net_weekly: i64,
    pub shares: TaxShares,
}

fn share_of(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 1_000.0).round() / 10.0
}

pub(crate) async fn taxes_handler(
    State(tables): State<Arc<CalculatorTables>>,
    Json(request): Json<TaxRequest>,
) -> Result<Json<TaxResponse>, AppError> {
    let breakdown = compute_taxes(
        &tables.tax_year,
        TaxInput {
            gross_annual: request.gross_annual,
            retirement_401k_percent: request.retirement_401k_percent,
            health_insurance_annual: request.health_insurance_annual,
            state_tax_rate_percent: request.state_tax_rate_percent,
        },
    )?;
    let gross = breakdown.gross_annual;
    Ok(Json(TaxResponse {
        net_biweekly: (breakdown.net_annual as f64 / 26.0).round() as i64,
        net_weekly: (breakdown.net_annual as f64 / 52.0).round() as i64,
        shares: TaxShares {
            federal_percent: share_of(breakdown.federal_tax, gross),
            state_percent: share_of(breakdown.state_tax, gross),
            fica_percent: share_of(breakdown.fica_tax, gross),
            take_home_percent: share_of(breakdown.net_annual, gross),
        },
        breakdown,
    }))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetRuleChoice {
    #[default]
    Standard,
    HighCost,
}

#[derive(Debug, Deserialize)]
pub struct BudgetRequest {
    pub net_monthly: f64,
    #[serde(default)]
    pub rule: BudgetRuleChoice,
}

#[derive(Debug, Serialize)]
pub struct BudgetResponse {
    #[serde(flatten)]
    pub allocation: BudgetAllocation,
    pub annual_savings: i64,
    pub five_year_savings: i64,
}

pub(crate) async fn budget_handler(
    State(tables): State<Arc<CalculatorTables>>,
    Json(request): Json<BudgetRequest>,
) -> Result<Json<BudgetResponse>, AppError> {
    let rule = match request.rule {
        BudgetRuleChoice::Standard => &tables.standard_budget,
        BudgetRuleChoice::HighCost => &tables.high_cost_budget,
    };
    let allocation = allocate_budget(rule, request.net_monthly)?;
    let annual_savings = allocation.savings.monthly * 12;
    Ok(Json(BudgetResponse {
        allocation,
        annual_savings,
        five_year_savings: annual_savings * 5,
    }))
}

#[derive(Debug, Deserialize)]
pub struct AutoRequest {
    pub vehicle_price: f64,
    #[serde(default)]
    pub down_payment: f64,
    #[serde(default)]
    pub trade_in: f64,
    pub interest_rate_percent: f64,
    #[serde(default = "default_auto_term")]
    pub term_months: u32,
    #[serde(default)]
    pub monthly_income: f64,
}

pub(crate) async fn auto_handler(
    Json(request): Json<AutoRequest>,
) -> Result<Json<AutoLoanResult>, AppError> {
    let result = compute_auto_loan(AutoLoanInput {
        vehicle_price: request.vehicle_price,
        down_payment: request.down_payment,
        trade_in: request.trade_in,
        interest_rate_percent: request.interest_rate_percent,
        term_months: request.term_months,
        monthly_income: request.monthly_income,
    })?;
    Ok(Json(result))
}

fn default_rent_vs_buy_years() -> u32 {
    DEFAULT_RENT_VS_BUY_YEARS
}

#[derive(Debug, Deserialize)]
pub struct RentVsBuyRequest {
    pub home_price: f64,
    #[serde(default)]
    pub down_payment_percent: f64,
    #[serde(default)]
    pub mortgage_rate_percent: f64,
    #[serde(default)]
    pub home_appreciation_percent: f64,
    pub monthly_rent: f64,
    #[serde(default)]
    pub rent_increase_percent: f64,
    #[serde(default = "default_rent_vs_buy_years")]
    pub years: u32,
}

pub(crate) async fn rent_vs_buy_handler(
    Json(request): Json<RentVsBuyRequest>,
) -> Result<Json<RentVsBuyResult>, AppError> {
    let result = compare_rent_vs_buy(RentVsBuyInput {
        home_price: request.home_price,
        down_payment_percent: request.down_payment_percent,
        mortgage_rate_percent: request.mortgage_rate_percent,
        home_appreciation_percent: request.home_appreciation_percent,
        monthly_rent: request.monthly_rent,
        rent_increase_percent: request.rent_increase_percent,
        years: if request.years == 0 {
            DEFAULT_RENT_VS_BUY_YEARS
        } else {
            request.years
        },
    })?;
    Ok(Json(result))
}

pub(crate) async fn inflation_handler(
    Json(input): Json<InflationInput>,
) -> Result<Json<InflationResult>, AppError> {
    Ok(Json(inflation_impact(input)?))
}

#[derive(Debug, Deserialize)]
pub struct CompoundRequest {
    pub principal: f64,
    #[serde(default)]
    pub monthly_contribution: f64,
    pub annual_rate_percent: f64,
    pub years: u32,
}

pub(crate) async fn compound_handler(
    Json(request): Json<CompoundRequest>,
) -> Result<Json<CompoundResult>, AppError> {
    let result = compound_growth(CompoundInput {
        principal: request.principal,
        monthly_contribution: request.monthly_contribution,
        annual_rate_percent: request.annual_rate_percent,
        years: request.years,
    })?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct GigRequest {
    pub sources: Vec<GigSource>,
    #[serde(default)]
    pub miles_driven: f64,
    #[serde(default)]
    pub other_expenses: f64,
    pub start_date: NaiveDate,
    pub check_date: NaiveDate,
}

pub(crate) async fn gig_handler(
    Json(request): Json<GigRequest>,
) -> Result<Json<GigIncomeResult>, AppError> {
    let result = project_gig_income(&GigIncomeInput {
        sources: request.sources,
        miles_driven: request.miles_driven,
        other_expenses: request.other_expenses,
        start_date: request.start_date,
        check_date: request.check_date,
    })?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct StreamsRequest {
    pub streams: Vec<IncomeStream>,
}

pub(crate) async fn streams_handler(
    Json(request): Json<StreamsRequest>,
) -> Result<Json<StreamsSummary>, AppError> {
    if request.streams.len() > MAX_INCOME_STREAMS {
        return Err(CalcError::invalid("streams", "at most 10 income streams are supported").into());
    }
    Ok(Json(summarize_streams(&request.streams)?))
}
