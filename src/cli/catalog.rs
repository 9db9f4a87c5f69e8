use comfy_table::{Cell, Table};

use crate::cli::open_store;
use crate::db;
use crate::error::{PainelError, Result};
use crate::models::{CategoryType, ReferenceKind};

pub fn add_category(name: &str, category_type: &str, code: Option<&str>) -> Result<()> {
    let category_type = CategoryType::parse(category_type).ok_or_else(|| {
        PainelError::Other(format!("Unknown category type: {category_type} (use receita or despesa)"))
    })?;
    let store = open_store()?;
    let id = db::add_category(store.conn(), name, code, category_type)?;
    println!("Added category: {name} ({id})");
    Ok(())
}

pub fn add_indicator(name: &str, code: Option<&str>) -> Result<()> {
    let store = open_store()?;
    let id = db::add_indicator(store.conn(), name, code)?;
    println!("Added indicator: {name} ({id})");
    Ok(())
}

pub fn list(kind: ReferenceKind) -> Result<()> {
    let store = open_store()?;
    let references = db::list_references(store.conn(), kind)?;

    let mut table = Table::new();
    match kind {
        ReferenceKind::Category => table.set_header(vec!["Code", "Name", "Type", "ID"]),
        ReferenceKind::Indicator => table.set_header(vec!["Code", "Name", "ID"]),
    };
    for r in &references {
        let mut row = vec![Cell::new(r.code.as_deref().unwrap_or("")), Cell::new(&r.name)];
        if let Some(t) = r.category_type {
            row.push(Cell::new(t.key()));
        }
        row.push(Cell::new(&r.id));
        table.add_row(row);
    }
    let title = match kind {
        ReferenceKind::Category => "Categories",
        ReferenceKind::Indicator => "Indicators",
    };
    println!("{title}\n{table}");
    Ok(())
}
