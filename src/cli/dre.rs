use std::str::FromStr;

use colored::Colorize;
use comfy_table::{Cell, Table};
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::cli::{open_store, parse_month_opt};
use crate::db;
use crate::dre::{AccountEdit, ComponentEdit, ComponentParent, SecondaryEdit};
use crate::error::{PainelError, Result};
use crate::fmt::money;
use crate::models::{AccountType, DreAccount, DreComponent, DreSecondaryAccount, ReferenceKind, Symbol};
use crate::resolver::{component_display_name, Catalog};
use crate::settings::{load_settings, resolve_scoped_company};
use crate::store::CatalogStore;
use crate::valuation::{AccountValue, DreValuation, Valuator};

fn parse_account_type(raw: &str) -> Result<AccountType> {
    AccountType::parse(raw).ok_or_else(|| PainelError::Other(format!("Unknown account type: {raw}")))
}

fn parse_symbol(raw: &str) -> Result<Symbol> {
    Symbol::parse(raw).ok_or_else(|| PainelError::Other(format!("Unknown symbol: {raw} (use +, - or =)")))
}

/// Weights are plain decimals; a comma is accepted as the decimal mark.
fn parse_weight(raw: &str) -> Result<Decimal> {
    Decimal::from_str(&raw.trim().replace(',', "."))
        .map_err(|_| PainelError::Other(format!("Invalid weight: {raw}")))
}

fn full_catalog(conn: &Connection) -> Result<Catalog> {
    let mut references = db::list_references(conn, ReferenceKind::Category)?;
    references.extend(db::list_references(conn, ReferenceKind::Indicator)?);
    Ok(Catalog::from_references(references))
}

fn component_line(component: &DreComponent, catalog: &Catalog) -> String {
    let weight = if component.weight == Decimal::ONE {
        String::new()
    } else {
        format!(" x{}", component.weight)
    };
    format!(
        "{} [{}]{weight}  ({})",
        component_display_name(component, catalog),
        component.reference_kind.key(),
        component.id
    )
}

fn value_cell(value: Option<&AccountValue>) -> String {
    match value {
        Some(AccountValue::Computed(v)) => money(*v),
        Some(AccountValue::Unimplemented(_)) => "n/a".yellow().to_string(),
        None => "error".red().to_string(),
    }
}

/// With a month, the tree is shown as `company` sees it with each account's value.
pub fn list(company: Option<&str>, month: Option<&str>) -> Result<()> {
    let store = open_store()?;
    let mut model = db::load_dre_model(store.conn())?;
    let catalog = full_catalog(store.conn())?;

    let mut values: Option<DreValuation> = None;
    if let Some(month) = month {
        let company_id = resolve_scoped_company(company)?;
        let period = parse_month_opt(Some(month))?;
        values = Some(Valuator::new(&store).valuate_dre_tree(&company_id, period)?);
        model = model.for_company(&company_id);
        println!("DRE {company_id} {period}");
    }

    if model.accounts().is_empty() {
        println!("No DRE accounts configured. Add one with `painel dre add-account`.");
        return Ok(());
    }
    for account in model.ordered() {
        let symbol = account.symbol.map(|s| s.key()).unwrap_or(" ");
        let mut header = format!(
            "{symbol} {} {}  ({}, order {})",
            account.name.bold(),
            account.id.dimmed(),
            account.account_type.key(),
            account.default_order
        );
        if !account.visible {
            header.push_str("  hidden");
        }
        if let Some(valuation) = &values {
            header.push_str(&format!("  {}", value_cell(valuation.values.get(&account.id))));
        }
        println!("{header}");
        for component in &account.components {
            println!("    {}", component_line(component, &catalog));
        }
        for secondary in &account.secondary_accounts {
            let scope = if secondary.company_ids.is_empty() {
                String::new()
            } else {
                format!("  [{}]", secondary.company_ids.join(", "))
            };
            println!("  - {} {}{scope}", secondary.name, secondary.id.dimmed());
            for component in &secondary.components {
                println!("      {}", component_line(component, &catalog));
            }
        }
    }
    Ok(())
}

pub fn add_account(
    id: &str,
    name: &str,
    account_type: &str,
    symbol: Option<&str>,
    order: i64,
    hidden: bool,
) -> Result<()> {
    let mut account = DreAccount::new(id, name, parse_account_type(account_type)?, symbol.map(parse_symbol).transpose()?);
    account.default_order = order;
    account.visible = !hidden;
    let store = open_store()?;
    db::insert_account(store.conn(), &account)?;
    if !account.account_type.is_computable() {
        println!(
            "{}",
            format!("Note: {} accounts are not valued yet and will show as n/a.", account.account_type.key()).yellow()
        );
    }
    println!("Added DRE account: {name} ({id})");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn edit_account(
    id: &str,
    name: Option<String>,
    account_type: Option<&str>,
    symbol: Option<&str>,
    no_symbol: bool,
    order: Option<i64>,
    visible: Option<bool>,
) -> Result<()> {
    let symbol = if no_symbol {
        Some(None)
    } else {
        symbol.map(parse_symbol).transpose()?.map(Some)
    };
    let edit = AccountEdit {
        name,
        account_type: account_type.map(parse_account_type).transpose()?,
        symbol,
        default_order: order,
        visible,
    };
    let store = open_store()?;
    db::update_account(store.conn(), id, edit)?;
    println!("Updated DRE account {id}");
    Ok(())
}

pub fn delete_account(id: &str) -> Result<()> {
    let mut store = open_store()?;
    store.delete_account_subtree(id)?;
    println!("Deleted DRE account {id} with its secondary accounts and components");
    Ok(())
}

/// Companies named on a secondary account must exist and be in scope.
fn check_companies(conn: &Connection, company_ids: &[String]) -> Result<()> {
    let scope = load_settings().company_scope();
    for company_id in company_ids {
        scope.check(company_id)?;
        if !db::company_exists(conn, company_id)? {
            return Err(PainelError::NotFound(format!("company {company_id}")));
        }
    }
    Ok(())
}

pub fn add_secondary(account: &str, id: &str, name: &str, order: i64, companies: Vec<String>) -> Result<()> {
    let mut secondary = DreSecondaryAccount::new(id, name);
    secondary.order = order;
    secondary.company_ids = companies;
    let mut store = open_store()?;
    check_companies(store.conn(), &secondary.company_ids)?;
    db::insert_secondary(store.conn_mut(), account, &secondary)?;
    println!("Added secondary account: {name} ({id}) under {account}");
    Ok(())
}

pub fn edit_secondary(
    id: &str,
    name: Option<String>,
    order: Option<i64>,
    companies: Vec<String>,
    all_companies: bool,
) -> Result<()> {
    let company_ids = if all_companies {
        Some(Vec::new())
    } else if companies.is_empty() {
        None
    } else {
        Some(companies)
    };
    let mut store = open_store()?;
    if let Some(ids) = &company_ids {
        check_companies(store.conn(), ids)?;
    }
    db::update_secondary(store.conn_mut(), id, SecondaryEdit { name, order, company_ids })?;
    println!("Updated secondary account {id}");
    Ok(())
}

pub fn delete_secondary(id: &str) -> Result<()> {
    let store = open_store()?;
    db::delete_secondary(store.conn(), id)?;
    println!("Deleted secondary account {id}");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn add_component(
    account: &str,
    secondary: Option<String>,
    kind: &str,
    reference: &str,
    weight: &str,
    order: i64,
    name: Option<String>,
) -> Result<()> {
    let kind = ReferenceKind::parse(kind)
        .ok_or_else(|| PainelError::Other(format!("Unknown kind: {kind} (use categoria or indicador)")))?;
    let store = open_store()?;
    let found = db::find_reference(store.conn(), kind, reference)?.ok_or_else(|| PainelError::ReferenceNotFound {
        kind: kind.key().to_string(),
        id: reference.to_string(),
    })?;

    let mut component = DreComponent::new(&db::new_id(), kind, &found.id);
    component.weight = parse_weight(weight)?;
    component.order = order;
    component.display_name = name;
    let parent = match secondary {
        Some(secondary_id) => ComponentParent::Secondary {
            account_id: account.to_string(),
            secondary_id,
        },
        None => ComponentParent::Account(account.to_string()),
    };
    db::insert_component(store.conn(), &parent, &component)?;
    println!("Linked {} to {account} ({})", found.label(), component.id);
    Ok(())
}

pub fn edit_component(id: &str, weight: Option<&str>, order: Option<i64>, name: Option<String>) -> Result<()> {
    let edit = ComponentEdit {
        weight: weight.map(parse_weight).transpose()?,
        order,
        display_name: name.map(|n| if n.is_empty() { None } else { Some(n) }),
    };
    let store = open_store()?;
    db::update_component(store.conn(), id, edit)?;
    println!("Updated component {id}");
    Ok(())
}

pub fn delete_component(id: &str) -> Result<()> {
    let store = open_store()?;
    db::delete_component(store.conn(), id)?;
    println!("Deleted component {id}");
    Ok(())
}

/// With `strict`, an account type that cannot be valued yet is an error
/// instead of a zero.
pub fn report(company: Option<&str>, month: Option<&str>, json: bool, strict: bool) -> Result<()> {
    let company_id = resolve_scoped_company(company)?;
    let period = parse_month_opt(month)?;
    let store = open_store()?;
    let statement = Valuator::new(&store).valuate_statement(&company_id, period)?;
    if strict {
        for line in &statement.lines {
            if let Some(value) = &line.value {
                value.strict_amount(&line.account_id)?;
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&statement)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["", "Account", "Value", "Running total"]);
    for line in statement.lines.iter().filter(|l| l.visible) {
        let symbol = line.symbol.map(|s| s.key()).unwrap_or("");
        let value = value_cell(line.value.as_ref());
        let running = money(line.running_total);
        if line.is_checkpoint() {
            table.add_row(vec![
                Cell::new(symbol),
                Cell::new(line.name.as_str().bold()),
                Cell::new(value),
                Cell::new(running.bold()),
            ]);
        } else {
            table.add_row(vec![
                Cell::new(symbol),
                Cell::new(&line.name),
                Cell::new(value),
                Cell::new(running),
            ]);
        }
    }
    let total_label = if statement.total >= Decimal::ZERO {
        "RESULT".green().bold()
    } else {
        "RESULT".red().bold()
    };
    table.add_row(vec![
        Cell::new(""),
        Cell::new(total_label),
        Cell::new(""),
        Cell::new(money(statement.total)),
    ]);

    println!("DRE {company_id} {}\n{table}", statement.period);
    for failure in &statement.failures {
        println!("{}", format!("{}: {}", failure.account_id, failure.message).red());
    }
    if !statement.complete {
        println!(
            "{}",
            "Some accounts could not be valued; the result is partial.".yellow()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_weight_is_plain_decimal() {
        assert_eq!(parse_weight("1.500").unwrap(), Decimal::new(15, 1));
        assert_eq!(parse_weight("0,25").unwrap(), Decimal::new(25, 2));
        assert_eq!(parse_weight("-1").unwrap(), Decimal::from(-1));
        assert!(parse_weight("meio").is_err());
    }
}
