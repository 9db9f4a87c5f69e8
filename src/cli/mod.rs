pub mod catalog;
pub mod company;
pub mod dashboard;
pub mod dre;
pub mod import;
pub mod init;
pub mod status;

use clap::{Parser, Subcommand};

use crate::db::SqliteStore;
use crate::error::{PainelError, Result};
use crate::period::Period;
use crate::settings::get_db_path;

pub fn completions(shell: clap_complete::Shell) -> Result<()> {
    let mut cmd = <Cli as clap::CommandFactory>::command();
    clap_complete::generate(shell, &mut cmd, "painel", &mut std::io::stdout());
    Ok(())
}

pub(crate) fn open_store() -> Result<SqliteStore> {
    let db_path = get_db_path();
    if !db_path.exists() {
        return Err(PainelError::Settings(
            "Database not found. Run `painel init` to set up.".into(),
        ));
    }
    SqliteStore::open(&db_path)
}

/// `YYYY-MM`, or the current month when omitted.
pub(crate) fn parse_month_opt(month: Option<&str>) -> Result<Period> {
    match month {
        Some(m) => Period::parse(m),
        None => Ok(Period::current()),
    }
}

#[derive(Parser)]
#[command(name = "painel", about = "Financial dashboard and DRE valuation for multi-company bookkeeping.")]
pub struct Cli {
    /// Log at debug level (RUST_LOG still takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for painel data (default: ~/Documents/painel)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Show settings and database counts.
    Status,
    /// Manage companies.
    Company {
        #[command(subcommand)]
        command: CompanyCommands,
    },
    /// Manage revenue and expense categories.
    Category {
        #[command(subcommand)]
        command: CategoryCommands,
    },
    /// Manage non-monetary indicators.
    Indicator {
        #[command(subcommand)]
        command: IndicatorCommands,
    },
    /// Import monthly facts from a CSV file.
    Import {
        /// CSV with columns date (or year, month), kind, reference, amount
        file: String,
        #[arg(long)]
        company: Option<String>,
    },
    /// Configure and report the income statement (DRE).
    Dre {
        #[command(subcommand)]
        command: DreCommands,
    },
    /// Configure and show the dashboard.
    Dashboard {
        #[command(subcommand)]
        command: DashboardCommands,
    },
    /// Print a shell completion script.
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum CompanyCommands {
    /// Register a company.
    Add { id: String, name: String },
    /// List companies.
    List,
    /// Make a company the default for other commands.
    Use { id: String },
}

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// Add a category.
    Add {
        name: String,
        /// receita or despesa
        #[arg(long = "type")]
        category_type: String,
        #[arg(long)]
        code: Option<String>,
    },
    /// List categories.
    List,
}

#[derive(Subcommand)]
pub enum IndicatorCommands {
    /// Add an indicator.
    Add {
        name: String,
        #[arg(long)]
        code: Option<String>,
    },
    /// List indicators.
    List,
}

#[derive(Subcommand)]
pub enum DreCommands {
    /// Show the configured account tree.
    List {
        #[arg(long)]
        company: Option<String>,
        /// Also value each account for this month (YYYY-MM)
        #[arg(long)]
        month: Option<String>,
    },
    /// Add a principal account.
    AddAccount {
        id: String,
        name: String,
        /// simples, composta, formula, indicador or soma_indicadores
        #[arg(long = "type", default_value = "simples")]
        account_type: String,
        /// +, - or =
        #[arg(long, allow_hyphen_values = true)]
        symbol: Option<String>,
        #[arg(long, default_value_t = 0)]
        order: i64,
        /// Keep the account out of the printed statement
        #[arg(long)]
        hidden: bool,
    },
    /// Edit a principal account.
    EditAccount {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "type")]
        account_type: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        symbol: Option<String>,
        /// Remove the account's symbol
        #[arg(long, conflicts_with = "symbol")]
        no_symbol: bool,
        #[arg(long)]
        order: Option<i64>,
        #[arg(long)]
        visible: Option<bool>,
    },
    /// Delete a principal account with its secondaries and components.
    DeleteAccount { id: String },
    /// Add a secondary account under a principal account.
    AddSecondary {
        account: String,
        id: String,
        name: String,
        #[arg(long, default_value_t = 0)]
        order: i64,
        /// Restrict to these companies (repeatable; default: all)
        #[arg(long = "company")]
        companies: Vec<String>,
    },
    /// Edit a secondary account.
    EditSecondary {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        order: Option<i64>,
        #[arg(long = "company")]
        companies: Vec<String>,
        /// Lift any company restriction
        #[arg(long, conflicts_with = "companies")]
        all_companies: bool,
    },
    /// Delete a secondary account and its components.
    DeleteSecondary { id: String },
    /// Link a category or indicator to an account.
    AddComponent {
        account: String,
        #[arg(long)]
        secondary: Option<String>,
        /// categoria or indicador
        #[arg(long)]
        kind: String,
        /// Reference id or code
        #[arg(long)]
        reference: String,
        #[arg(long, default_value = "1", allow_hyphen_values = true)]
        weight: String,
        #[arg(long, default_value_t = 0)]
        order: i64,
        #[arg(long)]
        name: Option<String>,
    },
    /// Edit a component.
    EditComponent {
        id: String,
        #[arg(long, allow_hyphen_values = true)]
        weight: Option<String>,
        #[arg(long)]
        order: Option<i64>,
        #[arg(long)]
        name: Option<String>,
    },
    /// Delete a component.
    DeleteComponent { id: String },
    /// Income statement for one month.
    Report {
        #[arg(long)]
        company: Option<String>,
        /// YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<String>,
        #[arg(long)]
        json: bool,
        /// Fail instead of counting unvalued account types as zero
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Subcommand)]
pub enum DashboardCommands {
    /// Append an item to a company's dashboard.
    Add {
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        title: String,
        /// categoria, indicador, conta_dre, custom_sum, grafico or lista
        #[arg(long = "type")]
        item_type: String,
        /// kind:id-or-code, e.g. categoria:3.01 (repeatable)
        #[arg(long = "ref", required = true)]
        refs: Vec<String>,
        /// linha, barra or pizza
        #[arg(long)]
        chart: Option<String>,
        /// Entries shown by a list item (1-20)
        #[arg(long)]
        top: Option<u8>,
        /// #44FF44 or #FF4444
        #[arg(long)]
        color: Option<String>,
    },
    /// List configured items.
    List {
        #[arg(long)]
        company: Option<String>,
    },
    /// Remove an item.
    Remove {
        id: String,
        #[arg(long)]
        company: Option<String>,
    },
    /// Move the item at one position to another.
    Move {
        from: usize,
        to: usize,
        #[arg(long)]
        company: Option<String>,
    },
    /// Activate or deactivate an item.
    Toggle {
        id: String,
        #[arg(long)]
        company: Option<String>,
    },
    /// Valuate and print the dashboard.
    Show {
        #[arg(long)]
        company: Option<String>,
        /// YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<String>,
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_month_opt() {
        assert_eq!(parse_month_opt(Some("2024-03")).unwrap(), Period::new(2024, 3).unwrap());
        assert!(parse_month_opt(Some("2024-13")).is_err());
        assert_eq!(parse_month_opt(None).unwrap(), Period::current());
    }

    #[test]
    fn test_symbol_accepts_hyphen() {
        let cli = Cli::try_parse_from(["painel", "dre", "add-account", "cv", "Custos", "--symbol", "-"]).unwrap();
        match cli.command {
            Commands::Dre {
                command: DreCommands::AddAccount { symbol, .. },
            } => assert_eq!(symbol.as_deref(), Some("-")),
            _ => panic!("unexpected command"),
        }
    }
}
