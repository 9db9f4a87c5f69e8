use comfy_table::{Cell, Table};

use crate::cli::open_store;
use crate::db;
use crate::error::{PainelError, Result};
use crate::settings::{load_settings, save_settings};

pub fn add(id: &str, name: &str) -> Result<()> {
    let store = open_store()?;
    db::add_company(store.conn(), id, name)?;
    println!("Added company: {name} ({id})");
    Ok(())
}

pub fn list() -> Result<()> {
    let store = open_store()?;
    let default = load_settings().default_company;
    let mut table = Table::new();
    table.set_header(vec!["ID", "Trading name", "Active", ""]);
    for company in db::list_companies(store.conn())? {
        let marker = if default.as_deref() == Some(company.id.as_str()) { "default" } else { "" };
        table.add_row(vec![
            Cell::new(&company.id),
            Cell::new(&company.trading_name),
            Cell::new(if company.is_active { "yes" } else { "no" }),
            Cell::new(marker),
        ]);
    }
    println!("Companies\n{table}");
    Ok(())
}

pub fn use_company(id: &str) -> Result<()> {
    let store = open_store()?;
    if !db::company_exists(store.conn(), id)? {
        return Err(PainelError::NotFound(format!("company {id}")));
    }
    let mut settings = load_settings();
    settings.company_scope().check(id)?;
    settings.default_company = Some(id.to_string());
    save_settings(&settings)?;
    println!("Default company: {id}");
    Ok(())
}
