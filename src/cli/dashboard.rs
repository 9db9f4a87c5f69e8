use colored::{ColoredString, Colorize};
use comfy_table::{Cell, Table};
use rusqlite::Connection;
use serde_json::json;

use crate::cli::{open_store, parse_month_opt};
use crate::db;
use crate::error::{PainelError, Result};
use crate::fmt::{money, variation};
use crate::layout::{move_item, push_item, remove_item};
use crate::models::{ChartType, DashboardItem, ItemRef, ItemType, LinkKind, ResultColor};
use crate::period::Period;
use crate::settings::{load_settings, resolve_company, resolve_scoped_company};
use crate::store::DashboardStore;
use crate::valuation::{Card, CardValue, ChartSeries, ItemValuation, RankedEntry, Valuator};

/// Resolve `kind:token` to a typed reference carrying its display name.
fn resolve_ref(conn: &Connection, raw: &str) -> Result<ItemRef> {
    let (kind, token) = raw
        .split_once(':')
        .ok_or_else(|| PainelError::Other(format!("Invalid reference '{raw}' (expected kind:id)")))?;
    let kind = LinkKind::parse(kind).ok_or_else(|| PainelError::Other(format!("Unknown reference kind: {kind}")))?;
    let not_found = || PainelError::ReferenceNotFound {
        kind: kind.key().to_string(),
        id: token.to_string(),
    };
    let (id, name) = match kind.as_reference_kind() {
        Some(ref_kind) => {
            let found = db::find_reference(conn, ref_kind, token)?.ok_or_else(not_found)?;
            let label = found.label();
            (found.id, label)
        }
        None => {
            let model = db::load_dre_model(conn)?;
            let account = model.account(token).ok_or_else(not_found)?;
            (account.id.clone(), account.name.clone())
        }
    };
    Ok(ItemRef {
        id,
        kind,
        name: Some(name),
    })
}

fn ref_label(r: &ItemRef) -> &str {
    r.name.as_deref().unwrap_or(&r.id)
}

fn paint(text: String, color: ResultColor) -> ColoredString {
    match color {
        ResultColor::Green => text.green(),
        ResultColor::Red => text.red(),
    }
}

#[allow(clippy::too_many_arguments)]
pub fn add(
    company: Option<&str>,
    title: &str,
    item_type: &str,
    refs: &[String],
    chart: Option<&str>,
    top: Option<u8>,
    color: Option<&str>,
) -> Result<()> {
    let company_id = resolve_scoped_company(company)?;
    let item_type = ItemType::from_key(item_type)
        .ok_or_else(|| PainelError::Other(format!("Unknown item type: {item_type}")))?;
    let mut store = open_store()?;
    if !db::company_exists(store.conn(), &company_id)? {
        return Err(PainelError::NotFound(format!("company {company_id}")));
    }

    let mut item = DashboardItem::new(&company_id, title, item_type);
    for raw in refs {
        item.references.push(resolve_ref(store.conn(), raw)?);
    }
    item.chart_type = chart
        .map(|c| ChartType::parse(c).ok_or_else(|| PainelError::Other(format!("Unknown chart type: {c}"))))
        .transpose()?;
    item.top_limit = top;
    if let Some(c) = color {
        item.result_color = ResultColor::parse(c).ok_or_else(|| PainelError::Other(format!("Unknown color: {c}")))?;
    }

    let mut items = store.fetch_items(&company_id)?;
    let id = item.id.clone();
    push_item(&mut items, item);
    store.save_layout(&company_id, &items)?;
    println!("Added {} item: {title} ({id})", item_type.label());
    Ok(())
}

pub fn list(company: Option<&str>) -> Result<()> {
    let company_id = resolve_scoped_company(company)?;
    let store = open_store()?;
    let items = store.fetch_items(&company_id)?;

    let mut table = Table::new();
    table.set_header(vec!["#", "Title", "Type", "References", "Active", "ID"]);
    for item in &items {
        let refs: Vec<&str> = item.references.iter().map(ref_label).collect();
        table.add_row(vec![
            Cell::new(item.order),
            Cell::new(&item.title),
            Cell::new(item.item_type.label()),
            Cell::new(refs.join(", ")),
            Cell::new(if item.is_active { "yes" } else { "no" }),
            Cell::new(&item.id),
        ]);
    }
    println!("Dashboard {company_id}\n{table}");
    Ok(())
}

pub fn remove(id: &str, company: Option<&str>) -> Result<()> {
    let company_id = resolve_scoped_company(company)?;
    let mut store = open_store()?;
    let mut items = store.fetch_items(&company_id)?;
    let removed = remove_item(&mut items, id)?;
    store.save_layout(&company_id, &items)?;
    println!("Removed {}", removed.title);
    Ok(())
}

pub fn move_to(from: usize, to: usize, company: Option<&str>) -> Result<()> {
    let company_id = resolve_scoped_company(company)?;
    let mut store = open_store()?;
    let mut items = store.fetch_items(&company_id)?;
    move_item(&mut items, from, to)?;
    store.save_layout(&company_id, &items)?;
    println!("Moved item {from} to {to}");
    Ok(())
}

pub fn toggle(id: &str, company: Option<&str>) -> Result<()> {
    let company_id = resolve_scoped_company(company)?;
    let mut store = open_store()?;
    let mut items = store.fetch_items(&company_id)?;
    let item = items
        .iter_mut()
        .find(|i| i.id == id)
        .ok_or_else(|| PainelError::NotFound(format!("dashboard item {id}")))?;
    item.is_active = !item.is_active;
    let state = if item.is_active { "active" } else { "inactive" };
    let title = item.title.clone();
    store.save_layout(&company_id, &items)?;
    println!("{title} is now {state}");
    Ok(())
}

pub fn show(company: Option<&str>, month: Option<&str>, json: bool) -> Result<()> {
    let company_id = resolve_company(company)?;
    let period = parse_month_opt(month)?;
    let scope = load_settings().company_scope();
    let store = open_store()?;
    let items = store.fetch_items(&company_id)?;
    let cards = Valuator::new(&store).valuate_dashboard(&scope, &company_id, &items, period)?;

    if json {
        let out: Vec<serde_json::Value> = cards
            .iter()
            .map(|card| match &card.value {
                Ok(value) => json!({
                    "item_id": card.item.id,
                    "title": card.item.title,
                    "item_type": card.item.item_type.key(),
                    "result_color": card.item.result_color.hex(),
                    "value": value,
                }),
                Err(e) => json!({
                    "item_id": card.item.id,
                    "title": card.item.title,
                    "item_type": card.item.item_type.key(),
                    "error": e.to_string(),
                }),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&json!({ "period": period.key(), "items": out }))?);
        return Ok(());
    }

    println!("{}", format!("Dashboard {company_id} - {period}").bold());
    if cards.is_empty() {
        println!("No active items. Add one with `painel dashboard add`.");
    }
    for card in &cards {
        print_card(card, period);
    }
    Ok(())
}

fn print_card(card: &Card, period: Period) {
    println!();
    println!("{}", card.item.title.bold());
    match &card.value {
        Err(e) => println!("  {}", format!("Error: {e}").red()),
        Ok(CardValue::Amount(valuation)) => print_amount(valuation, card.item.result_color),
        Ok(CardValue::Chart { series }) => print_chart(series, card.item.chart_type, period),
        Ok(CardValue::List { entries }) => print_list(entries),
    }
}

fn print_amount(valuation: &ItemValuation, color: ResultColor) {
    let mut line = format!("  {}", paint(money(valuation.value), color));
    if let Some(v) = &valuation.variation {
        let text = variation(v);
        let text = if v.is_positive { text.green() } else { text.red() };
        line.push_str(&format!("  {text}"));
    }
    if let Some(prior) = valuation.prior_value {
        line.push_str(&format!("  (previous {})", money(prior)));
    }
    println!("{line}");
    if !valuation.is_complete() {
        println!(
            "  {}",
            format!("partial: no valuation rule for {}", valuation.incomplete_accounts.join(", ")).yellow()
        );
    }
}

fn print_chart(series: &[ChartSeries], chart_type: Option<ChartType>, period: Period) {
    let mut table = Table::new();
    let mut header = vec![chart_type.map(|c| c.key()).unwrap_or("").to_string()];
    header.extend(series.iter().map(|s| ref_label(&s.reference).to_string()));
    table.set_header(header);
    for (idx, month) in period.twelve_month_window().into_iter().enumerate() {
        let mut row = vec![Cell::new(month)];
        for s in series {
            let value = s.points.get(idx).map(|p| money(p.value)).unwrap_or_default();
            row.push(Cell::new(value));
        }
        table.add_row(row);
    }
    println!("{table}");
}

fn print_list(entries: &[RankedEntry]) {
    let mut table = Table::new();
    table.set_header(vec!["#", "Name", "Value"]);
    for (idx, entry) in entries.iter().enumerate() {
        table.add_row(vec![
            Cell::new(idx + 1),
            Cell::new(ref_label(&entry.reference)),
            Cell::new(money(entry.value)),
        ]);
    }
    println!("{table}");
}
