mod cli;
mod db;
mod dre;
mod error;
mod fmt;
mod importer;
mod layout;
mod models;
mod period;
mod resolver;
mod settings;
mod store;
mod valuation;

use clap::Parser;

use cli::{
    CategoryCommands, Cli, Commands, CompanyCommands, DashboardCommands, DreCommands, IndicatorCommands,
};
use models::ReferenceKind;

fn init_logging(verbose: bool) {
    let level = if verbose {
        "debug".to_string()
    } else {
        settings::load_settings().log_level
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Status => cli::status::run(),
        Commands::Company { command } => match command {
            CompanyCommands::Add { id, name } => cli::company::add(&id, &name),
            CompanyCommands::List => cli::company::list(),
            CompanyCommands::Use { id } => cli::company::use_company(&id),
        },
        Commands::Category { command } => match command {
            CategoryCommands::Add {
                name,
                category_type,
                code,
            } => cli::catalog::add_category(&name, &category_type, code.as_deref()),
            CategoryCommands::List => cli::catalog::list(ReferenceKind::Category),
        },
        Commands::Indicator { command } => match command {
            IndicatorCommands::Add { name, code } => cli::catalog::add_indicator(&name, code.as_deref()),
            IndicatorCommands::List => cli::catalog::list(ReferenceKind::Indicator),
        },
        Commands::Import { file, company } => cli::import::run(&file, company.as_deref()),
        Commands::Dre { command } => match command {
            DreCommands::List { company, month } => cli::dre::list(company.as_deref(), month.as_deref()),
            DreCommands::AddAccount {
                id,
                name,
                account_type,
                symbol,
                order,
                hidden,
            } => cli::dre::add_account(&id, &name, &account_type, symbol.as_deref(), order, hidden),
            DreCommands::EditAccount {
                id,
                name,
                account_type,
                symbol,
                no_symbol,
                order,
                visible,
            } => cli::dre::edit_account(
                &id,
                name,
                account_type.as_deref(),
                symbol.as_deref(),
                no_symbol,
                order,
                visible,
            ),
            DreCommands::DeleteAccount { id } => cli::dre::delete_account(&id),
            DreCommands::AddSecondary {
                account,
                id,
                name,
                order,
                companies,
            } => cli::dre::add_secondary(&account, &id, &name, order, companies),
            DreCommands::EditSecondary {
                id,
                name,
                order,
                companies,
                all_companies,
            } => cli::dre::edit_secondary(&id, name, order, companies, all_companies),
            DreCommands::DeleteSecondary { id } => cli::dre::delete_secondary(&id),
            DreCommands::AddComponent {
                account,
                secondary,
                kind,
                reference,
                weight,
                order,
                name,
            } => cli::dre::add_component(&account, secondary, &kind, &reference, &weight, order, name),
            DreCommands::EditComponent {
                id,
                weight,
                order,
                name,
            } => cli::dre::edit_component(&id, weight.as_deref(), order, name),
            DreCommands::DeleteComponent { id } => cli::dre::delete_component(&id),
            DreCommands::Report {
                company,
                month,
                json,
                strict,
            } => cli::dre::report(company.as_deref(), month.as_deref(), json, strict),
        },
        Commands::Dashboard { command } => match command {
            DashboardCommands::Add {
                company,
                title,
                item_type,
                refs,
                chart,
                top,
                color,
            } => cli::dashboard::add(
                company.as_deref(),
                &title,
                &item_type,
                &refs,
                chart.as_deref(),
                top,
                color.as_deref(),
            ),
            DashboardCommands::List { company } => cli::dashboard::list(company.as_deref()),
            DashboardCommands::Remove { id, company } => cli::dashboard::remove(&id, company.as_deref()),
            DashboardCommands::Move { from, to, company } => {
                cli::dashboard::move_to(from, to, company.as_deref())
            }
            DashboardCommands::Toggle { id, company } => cli::dashboard::toggle(&id, company.as_deref()),
            DashboardCommands::Show { company, month, json } => {
                cli::dashboard::show(company.as_deref(), month.as_deref(), json)
            }
        },
        Commands::Completions { shell } => cli::completions(shell),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
