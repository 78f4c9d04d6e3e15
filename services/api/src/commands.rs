use crate::infra::{build_drip, parse_date};
use autolytiq::calc::{
    allocate_budget, compute_mortgage, compute_taxes, housing_affordability, project_income,
    AllocationRule, BudgetCategory, MortgageInput, TaxInput, TaxYearConfig,
};
use autolytiq::config::AppConfig;
use autolytiq::error::AppError;
use autolytiq::leads::SqliteStore;
use autolytiq::telemetry;
use chrono::{Local, NaiveDate, Utc};
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct IncomeArgs {
    /// Year-to-date gross income shown on the paystub
    #[arg(long)]
    pub(crate) ytd: f64,
    /// First day of employment (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) start: NaiveDate,
    /// Paystub date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) check: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub(crate) struct MortgageArgs {
    #[arg(long)]
    pub(crate) price: f64,
    /// Down payment as a percent of the price
    #[arg(long, default_value_t = 20.0)]
    pub(crate) down_percent: f64,
    /// Annual interest rate in percent
    #[arg(long)]
    pub(crate) rate: f64,
    #[arg(long, default_value_t = 30)]
    pub(crate) years: u32,
    /// Annual property tax rate in percent
    #[arg(long, default_value_t = 1.1)]
    pub(crate) tax_rate: f64,
    #[arg(long, default_value_t = 1_200.0)]
    pub(crate) insurance: f64,
    /// Gross annual income, used for the 28% housing-ratio check
    #[arg(long)]
    pub(crate) income: Option<f64>,
}

#[derive(Args, Debug)]
pub(crate) struct TaxesArgs {
    #[arg(long)]
    pub(crate) gross: f64,
    /// 401(k) contribution in percent of gross
    #[arg(long, default_value_t = 0.0)]
    pub(crate) retirement_percent: f64,
    /// Annual health insurance premiums
    #[arg(long, default_value_t = 0.0)]
    pub(crate) health: f64,
    /// Flat state income tax rate in percent
    #[arg(long, default_value_t = 0.0)]
    pub(crate) state_rate: f64,
}

#[derive(Args, Debug)]
pub(crate) struct BudgetArgs {
    /// Monthly take-home pay
    #[arg(long)]
    pub(crate) net_monthly: f64,
    /// Use the 60/20/20 split for high cost-of-living areas
    #[arg(long)]
    pub(crate) high_cost: bool,
}

#[derive(Args, Debug)]
pub(crate) struct DripRunArgs {
    /// List the emails that are due without sending them
    #[arg(long)]
    pub(crate) dry_run: bool,
}

pub(crate) fn run_income(args: IncomeArgs) -> Result<(), AppError> {
    let check = args.check.unwrap_or_else(|| Local::now().date_naive());
    let projection = project_income(args.ytd, args.start, check)?;

    println!("Income projection");
    println!(
        "  Counted from {} ({} days worked)",
        projection.effective_start, projection.days_worked
    );
    println!("  Annual:  ${}", projection.gross_annual);
    println!("  Monthly: ${}", projection.gross_monthly);
    println!("  Weekly:  ${}", projection.gross_weekly);
    println!("  Daily:   ${}", projection.gross_daily);
    println!(
        "  Suggested ceilings: car payment ${} / rent ${}",
        projection.max_auto_payment, projection.max_rent
    );
    Ok(())
}

pub(crate) fn run_mortgage(args: MortgageArgs) -> Result<(), AppError> {
    let result = compute_mortgage(MortgageInput {
        home_price: args.price,
        down_payment_percent: args.down_percent,
        interest_rate_percent: args.rate,
        term_years: args.years,
        property_tax_rate_percent: args.tax_rate,
        annual_insurance: args.insurance,
    })?;
    let piti = result.piti;

    println!("Mortgage quote");
    println!(
        "  Down payment ${} ({}%), loan ${}",
        result.down_payment, result.down_payment_percent, result.loan_amount
    );
    println!("  Principal & interest: ${}", piti.principal_interest);
    println!("  Property tax:         ${}", piti.property_tax);
    println!("  Insurance:            ${}", piti.insurance);
    if result.requires_pmi() {
        println!("  PMI:                  ${}", piti.pmi);
    }
    println!("  Total monthly:        ${}", piti.total_monthly);
    println!(
        "  Over {} years: ${} paid, ${} interest",
        result.term_years, result.total_payments, result.total_interest
    );

    if let Some(check) = args
        .income
        .and_then(|income| housing_affordability(piti.total_monthly, income))
    {
        let verdict = if check.affordable {
            "within"
        } else {
            "above"
        };
        println!(
            "  Housing ratio {}% is {verdict} the 28% guideline",
            check.housing_ratio_percent
        );
    }
    Ok(())
}

pub(crate) fn run_taxes(args: TaxesArgs) -> Result<(), AppError> {
    let config = TaxYearConfig::default();
    let breakdown = compute_taxes(
        &config,
        TaxInput {
            gross_annual: args.gross,
            retirement_401k_percent: args.retirement_percent,
            health_insurance_annual: args.health,
            state_tax_rate_percent: args.state_rate,
        },
    )?;

    println!("Take-home estimate ({} single filer)", breakdown.tax_year);
    println!("  Gross:           ${}", breakdown.gross_annual);
    println!("  Federal:         ${}", breakdown.federal_tax);
    println!("  State:           ${}", breakdown.state_tax);
    println!(
        "  FICA:            ${} (Social Security ${}, Medicare ${})",
        breakdown.fica_tax, breakdown.social_security, breakdown.medicare
    );
    println!("  401(k):          ${}", breakdown.retirement_401k);
    println!("  Health:          ${}", breakdown.health_insurance);
    println!("  Net annual:      ${}", breakdown.net_annual);
    println!("  Net monthly:     ${}", breakdown.net_monthly);
    println!("  Effective rate:  {}%", breakdown.effective_tax_rate);
    Ok(())
}

pub(crate) fn run_budget(args: BudgetArgs) -> Result<(), AppError> {
    let rule = if args.high_cost {
        AllocationRule::sixty_twenty_twenty()
    } else {
        AllocationRule::fifty_thirty_twenty()
    };
    let allocation = allocate_budget(&rule, args.net_monthly)?;

    println!(
        "{} budget for ${}/month",
        allocation.rule, allocation.net_monthly
    );
    for category in [&allocation.needs, &allocation.wants, &allocation.savings] {
        print_category(category);
    }
    Ok(())
}

fn print_category(category: &BudgetCategory) {
    println!(
        "  {} ({}%): ${}/month, ${}/week, ${}/day",
        category.name, category.percent, category.monthly, category.weekly, category.daily
    );
    for sub in &category.subcategories {
        println!("    - {}: ${}", sub.name, sub.monthly);
    }
}

pub(crate) async fn run_drip(args: DripRunArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let store = Arc::new(SqliteStore::open(&config.database.path)?);
    let drip = build_drip(&config, store)?;

    if args.dry_run {
        let preview = drip.preview(Utc::now())?;
        if preview.is_empty() {
            println!("No drip emails are due.");
        }
        for item in preview {
            println!("  step {} -> {}: {}", item.step, item.email, item.subject);
        }
        return Ok(());
    }

    let summary = tokio::task::spawn_blocking(move || drip.run_once(Utc::now()))
        .await
        .map_err(std::io::Error::other)??;
    println!(
        "Drip scan: {} due, {} sent, {} send failures, {} commit failures",
        summary.due, summary.sent, summary.send_failures, summary.commit_failures
    );
    Ok(())
}
