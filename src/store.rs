use crate::error::Result;
use crate::models::{DashboardItem, DreAccount, RawFact, Reference, ReferenceKind};
use crate::period::Period;

/// A typed pointer at a category or indicator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RefKey {
    pub kind: ReferenceKind,
    pub id: String,
}

impl RefKey {
    pub fn new(kind: ReferenceKind, id: &str) -> Self {
        Self {
            kind,
            id: id.to_string(),
        }
    }
}

/// Read access to recorded facts.
pub trait FactStore {
    /// Facts of `company_id` in `period` whose (kind, id) is one of `refs`.
    /// Each fact carries its kind so sign rules can be applied per fact.
    fn fetch_facts(&self, company_id: &str, period: Period, refs: &[RefKey]) -> Result<Vec<RawFact>>;
}

/// Categories, indicators and the DRE model.
pub trait CatalogStore {
    fn fetch_reference(&self, id: &str, kind: ReferenceKind) -> Result<Option<Reference>>;

    /// The DRE forest as seen by `company_id`, ordered by `default_order`.
    fn fetch_config_model(&self, company_id: &str) -> Result<Vec<DreAccount>>;

    /// Remove a principal account and everything under it. No component may
    /// reference the account afterwards.
    fn delete_account_subtree(&mut self, account_id: &str) -> Result<()>;
}

/// Dashboard layouts per company.
pub trait DashboardStore {
    /// Items of a company ordered by `order`.
    fn fetch_items(&self, company_id: &str) -> Result<Vec<DashboardItem>>;

    /// Replace a company's layout. Items are validated first; nothing is written
    /// when any item is invalid.
    fn save_layout(&mut self, company_id: &str, items: &[DashboardItem]) -> Result<()>;
}

/// Store kept entirely in memory for engine tests.
#[cfg(test)]
pub mod memory {
    use std::collections::HashMap;

    use super::{CatalogStore, DashboardStore, FactStore, RefKey};
    use crate::dre::DreModel;
    use crate::error::Result;
    use crate::layout::validate_layout;
    use crate::models::{DashboardItem, DreAccount, RawFact, Reference, ReferenceKind};
    use crate::period::Period;

    #[derive(Debug, Default)]
    pub struct MemoryStore {
        references: HashMap<(ReferenceKind, String), Reference>,
        facts: Vec<RawFact>,
        pub dre: DreModel,
        items: Vec<DashboardItem>,
    }

    impl MemoryStore {
        pub fn add_reference(&mut self, reference: Reference) {
            self.references
                .insert((reference.kind, reference.id.clone()), reference);
        }

        pub fn add_fact(&mut self, fact: RawFact) {
            self.facts.push(fact);
        }
    }

    impl FactStore for MemoryStore {
        fn fetch_facts(&self, company_id: &str, period: Period, refs: &[RefKey]) -> Result<Vec<RawFact>> {
            Ok(self
                .facts
                .iter()
                .filter(|f| f.company_id == company_id && f.period == period)
                .filter(|f| {
                    refs.iter()
                        .any(|r| r.kind == f.reference_kind && r.id == f.reference_id)
                })
                .cloned()
                .collect())
        }
    }

    impl CatalogStore for MemoryStore {
        fn fetch_reference(&self, id: &str, kind: ReferenceKind) -> Result<Option<Reference>> {
            Ok(self.references.get(&(kind, id.to_string())).cloned())
        }

        fn fetch_config_model(&self, company_id: &str) -> Result<Vec<DreAccount>> {
            Ok(self.dre.for_company(company_id).into_forest())
        }

        fn delete_account_subtree(&mut self, account_id: &str) -> Result<()> {
            self.dre.delete_account(account_id)?;
            Ok(())
        }
    }

    impl DashboardStore for MemoryStore {
        fn fetch_items(&self, company_id: &str) -> Result<Vec<DashboardItem>> {
            let mut items: Vec<DashboardItem> = self
                .items
                .iter()
                .filter(|i| i.company_id == company_id)
                .cloned()
                .collect();
            items.sort_by_key(|i| i.order);
            Ok(items)
        }

        fn save_layout(&mut self, company_id: &str, items: &[DashboardItem]) -> Result<()> {
            validate_layout(company_id, items)?;
            self.items.retain(|i| i.company_id != company_id);
            self.items.extend(items.iter().cloned());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::*;
    use crate::dre::ComponentParent;
    use crate::models::{AccountType, CategoryType, DreComponent, ItemType, LinkKind};
    use rust_decimal::Decimal;

    #[test]
    fn test_fetch_facts_filters_company_period_and_kind() {
        let mut store = MemoryStore::default();
        let march = Period::new(2024, 3).unwrap();
        let base = RawFact {
            company_id: "acme".into(),
            period: march,
            amount: Decimal::from(10),
            reference_id: "x".into(),
            reference_kind: ReferenceKind::Category,
        };
        store.add_fact(base.clone());
        store.add_fact(RawFact {
            reference_kind: ReferenceKind::Indicator,
            ..base.clone()
        });
        store.add_fact(RawFact {
            period: march.previous(),
            ..base.clone()
        });
        store.add_fact(RawFact {
            company_id: "other".into(),
            ..base.clone()
        });
        let facts = store
            .fetch_facts("acme", march, &[RefKey::new(ReferenceKind::Category, "x")])
            .unwrap();
        assert_eq!(facts, vec![base]);
    }

    #[test]
    fn test_fetch_reference() {
        let mut store = MemoryStore::default();
        store.add_reference(Reference::category("c", "Vendas", None, CategoryType::Revenue));
        assert!(store.fetch_reference("c", ReferenceKind::Category).unwrap().is_some());
        assert!(store.fetch_reference("c", ReferenceKind::Indicator).unwrap().is_none());
    }

    #[test]
    fn test_delete_subtree_leaves_no_orphans() {
        let mut store = MemoryStore::default();
        store
            .dre
            .add_account(DreAccount::new("a", "A", AccountType::Simple, None))
            .unwrap();
        store
            .dre
            .add_component(
                &ComponentParent::Account("a".into()),
                DreComponent::new("c", ReferenceKind::Category, "x"),
            )
            .unwrap();
        store.delete_account_subtree("a").unwrap();
        let forest = store.fetch_config_model("acme").unwrap();
        assert!(forest.is_empty());
        assert!(store.dre.find_component("c").is_none());
    }

    #[test]
    fn test_save_layout_rejects_invalid_and_keeps_previous() {
        let mut store = MemoryStore::default();
        let good = DashboardItem::new("acme", "Receita", ItemType::CategorySum)
            .with_ref("c", LinkKind::Category);
        store.save_layout("acme", &[good.clone()]).unwrap();

        let empty = DashboardItem::new("acme", "Vazio", ItemType::CategorySum);
        assert!(store.save_layout("acme", &[empty]).is_err());
        assert_eq!(store.fetch_items("acme").unwrap(), vec![good]);
    }
}
