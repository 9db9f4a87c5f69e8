use std::collections::HashSet;

use crate::error::{PainelError, Result};
use crate::models::{DashboardItem, ItemType, LinkKind};

pub const MAX_TOP_LIMIT: u8 = 20;

fn invalid(item: &DashboardItem, reason: impl std::fmt::Display) -> PainelError {
    let name = if item.title.is_empty() { &item.id } else { &item.title };
    PainelError::ConfigurationInvalid(format!("{name}: {reason}"))
}

/// Reference kinds each item type accepts.
fn accepted_kinds(item_type: ItemType) -> &'static [LinkKind] {
    match item_type {
        ItemType::CategorySum => &[LinkKind::Category],
        ItemType::IndicatorSum => &[LinkKind::Indicator],
        ItemType::DreAccount => &[LinkKind::DreAccount],
        ItemType::CustomSum => &[LinkKind::Category, LinkKind::Indicator],
        ItemType::Chart | ItemType::List => &[LinkKind::Category, LinkKind::Indicator, LinkKind::DreAccount],
    }
}

/// Structural checks run when a layout is saved. Valuation assumes they hold.
pub fn validate_item(item: &DashboardItem) -> Result<()> {
    if item.references.is_empty() {
        let what = if item.item_type.is_presentational() {
            "linked data"
        } else {
            "reference"
        };
        return Err(invalid(item, format!("{} needs at least one {what}", item.item_type.label())));
    }

    let accepted = accepted_kinds(item.item_type);
    let mut seen = HashSet::new();
    for r in &item.references {
        if !accepted.contains(&r.kind) {
            return Err(invalid(
                item,
                format!("{} cannot reference {} {}", item.item_type.label(), r.kind.key(), r.id),
            ));
        }
        if !seen.insert((r.kind, r.id.as_str())) {
            return Err(invalid(item, format!("duplicate reference {} {}", r.kind.key(), r.id)));
        }
    }

    match (item.item_type, item.chart_type) {
        (ItemType::Chart, None) => return Err(invalid(item, "chart type is required")),
        (ItemType::Chart, Some(_)) | (_, None) => {}
        (_, Some(_)) => return Err(invalid(item, "chart type only applies to charts")),
    }

    match (item.item_type, item.top_limit) {
        (ItemType::List, Some(limit)) if !(1..=MAX_TOP_LIMIT).contains(&limit) => {
            return Err(invalid(item, format!("top limit must be between 1 and {MAX_TOP_LIMIT}")));
        }
        (ItemType::List, _) | (_, None) => {}
        (_, Some(_)) => return Err(invalid(item, "top limit only applies to lists")),
    }

    Ok(())
}

/// A company's layout: every item valid, ids unique, orders exactly `0..n`.
pub fn validate_layout(company_id: &str, items: &[DashboardItem]) -> Result<()> {
    let mut ids = HashSet::new();
    let mut orders = HashSet::new();
    for item in items {
        if item.company_id != company_id {
            return Err(invalid(item, format!("belongs to company {}", item.company_id)));
        }
        validate_item(item)?;
        if !ids.insert(item.id.as_str()) {
            return Err(invalid(item, "duplicate item id"));
        }
        if (item.order as usize) >= items.len() || !orders.insert(item.order) {
            return Err(invalid(
                item,
                format!("order {} is not unique within 0..{}", item.order, items.len()),
            ));
        }
    }
    Ok(())
}

/// Rewrite `order` to match each item's position.
pub fn reindex(items: &mut [DashboardItem]) {
    for (idx, item) in items.iter_mut().enumerate() {
        item.order = idx as u32;
    }
}

/// Append an item at the end of the layout.
pub fn push_item(items: &mut Vec<DashboardItem>, mut item: DashboardItem) {
    item.order = items.len() as u32;
    items.push(item);
}

pub fn remove_item(items: &mut Vec<DashboardItem>, id: &str) -> Result<DashboardItem> {
    let idx = items
        .iter()
        .position(|i| i.id == id)
        .ok_or_else(|| PainelError::NotFound(format!("dashboard item {id}")))?;
    let removed = items.remove(idx);
    reindex(items);
    Ok(removed)
}

pub fn move_item(items: &mut Vec<DashboardItem>, from: usize, to: usize) -> Result<()> {
    if from >= items.len() || to >= items.len() {
        return Err(PainelError::Other(format!(
            "position out of range (layout has {} items)",
            items.len()
        )));
    }
    let item = items.remove(from);
    items.insert(to, item);
    reindex(items);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChartType;

    fn item(item_type: ItemType) -> DashboardItem {
        DashboardItem::new("acme", "Card", item_type)
    }

    #[test]
    fn test_sum_items_need_references() {
        for t in [ItemType::CategorySum, ItemType::IndicatorSum, ItemType::DreAccount, ItemType::CustomSum] {
            let err = validate_item(&item(t)).unwrap_err();
            assert!(matches!(err, PainelError::ConfigurationInvalid(_)), "{t:?}");
        }
    }

    #[test]
    fn test_reference_kind_must_match_type() {
        let wrong = item(ItemType::CategorySum).with_ref("i", LinkKind::Indicator);
        assert!(validate_item(&wrong).is_err());
        let custom = item(ItemType::CustomSum)
            .with_ref("c", LinkKind::Category)
            .with_ref("i", LinkKind::Indicator);
        assert!(validate_item(&custom).is_ok());
        let custom_dre = item(ItemType::CustomSum).with_ref("d", LinkKind::DreAccount);
        assert!(validate_item(&custom_dre).is_err());
    }

    #[test]
    fn test_chart_requires_type_and_linked_data() {
        let mut chart = item(ItemType::Chart);
        chart.chart_type = Some(ChartType::Bar);
        let err = validate_item(&chart).unwrap_err().to_string();
        assert!(err.contains("linked data"), "got: {err}");

        let untyped = item(ItemType::Chart).with_ref("c", LinkKind::Category);
        assert!(validate_item(&untyped).is_err());

        chart = chart.with_ref("d", LinkKind::DreAccount);
        assert!(validate_item(&chart).is_ok());
    }

    #[test]
    fn test_presentation_fields_only_on_their_types() {
        let mut sum = item(ItemType::CategorySum).with_ref("c", LinkKind::Category);
        sum.chart_type = Some(ChartType::Pie);
        assert!(validate_item(&sum).is_err());
        sum.chart_type = None;
        sum.top_limit = Some(3);
        assert!(validate_item(&sum).is_err());
    }

    #[test]
    fn test_list_top_limit_bounds() {
        let mut list = item(ItemType::List).with_ref("c", LinkKind::Category);
        assert!(validate_item(&list).is_ok());
        list.top_limit = Some(0);
        assert!(validate_item(&list).is_err());
        list.top_limit = Some(21);
        assert!(validate_item(&list).is_err());
        list.top_limit = Some(20);
        assert!(validate_item(&list).is_ok());
    }

    #[test]
    fn test_duplicate_references_rejected() {
        let dup = item(ItemType::CategorySum)
            .with_ref("c", LinkKind::Category)
            .with_ref("c", LinkKind::Category);
        assert!(validate_item(&dup).is_err());
    }

    fn layout() -> Vec<DashboardItem> {
        let mut items = Vec::new();
        for title in ["A", "B", "C"] {
            let mut i = item(ItemType::CategorySum).with_ref("c", LinkKind::Category);
            i.title = title.into();
            push_item(&mut items, i);
        }
        items
    }

    #[test]
    fn test_layout_orders_must_be_dense() {
        let mut items = layout();
        assert!(validate_layout("acme", &items).is_ok());
        items[2].order = 5;
        assert!(validate_layout("acme", &items).is_err());
        items[2].order = 1;
        assert!(validate_layout("acme", &items).is_err());
        assert!(validate_layout("other", &layout()).is_err());
    }

    #[test]
    fn test_remove_and_move_reindex() {
        let mut items = layout();
        let first = items[0].id.clone();
        let removed = remove_item(&mut items, &first).unwrap();
        assert_eq!(removed.title, "A");
        assert_eq!(items.iter().map(|i| i.order).collect::<Vec<_>>(), vec![0, 1]);

        let mut items = layout();
        move_item(&mut items, 2, 0).unwrap();
        let titles: Vec<&str> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["C", "A", "B"]);
        assert!(validate_layout("acme", &items).is_ok());
        assert!(move_item(&mut items, 3, 0).is_err());
    }
}
