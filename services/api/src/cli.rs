use crate::commands::{
    run_budget, run_drip, run_income, run_mortgage, run_taxes, BudgetArgs, DripRunArgs,
    IncomeArgs, MortgageArgs, TaxesArgs,
};
use crate::server;
use autolytiq::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "Autolytiq",
    about = "Serve the Autolytiq finance API or run its calculators and drip campaign from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run a calculator and print the result
    Calc {
        #[command(subcommand)]
        command: CalcCommand,
    },
    /// Operate the subscriber email sequence
    Drip {
        #[command(subcommand)]
        command: DripCommand,
    },
}

#[derive(Subcommand, Debug)]
enum CalcCommand {
    /// Annualise year-to-date income from a paystub
    Income(IncomeArgs),
    /// Quote a fixed-rate mortgage with taxes, insurance, and PMI
    Mortgage(MortgageArgs),
    /// Estimate take-home pay after federal, state, and FICA taxes
    Taxes(TaxesArgs),
    /// Split monthly take-home pay into needs, wants, and savings
    Budget(BudgetArgs),
}

#[derive(Subcommand, Debug)]
enum DripCommand {
    /// Run one drip scan against the configured lead store
    Run(DripRunArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Calc { command } => match command {
            CalcCommand::Income(args) => run_income(args),
            CalcCommand::Mortgage(args) => run_mortgage(args),
            CalcCommand::Taxes(args) => run_taxes(args),
            CalcCommand::Budget(args) => run_budget(args),
        },
        Command::Drip {
            command: DripCommand::Run(args),
        } => run_drip(args).await,
    }
}
