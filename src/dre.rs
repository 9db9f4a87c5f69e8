use std::collections::HashSet;

use rust_decimal::Decimal;

use crate::error::{PainelError, Result};
use crate::models::{AccountType, DreAccount, DreComponent, DreSecondaryAccount, Symbol};

// ---------------------------------------------------------------------------
// Flat rows, as stored
// ---------------------------------------------------------------------------

/// A secondary account row with its owning principal id.
#[derive(Debug, Clone)]
pub struct SecondaryRow {
    pub account_id: String,
    pub secondary: DreSecondaryAccount,
}

/// A component row. `secondary_id` is null when the component hangs directly
/// off the principal account.
#[derive(Debug, Clone)]
pub struct ComponentRow {
    pub account_id: String,
    pub secondary_id: Option<String>,
    pub component: DreComponent,
}

/// Where a component is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentParent {
    Account(String),
    Secondary {
        account_id: String,
        secondary_id: String,
    },
}

impl ComponentParent {
    pub fn account_id(&self) -> &str {
        match self {
            Self::Account(id) => id,
            Self::Secondary { account_id, .. } => account_id,
        }
    }

    pub fn secondary_id(&self) -> Option<&str> {
        match self {
            Self::Account(_) => None,
            Self::Secondary { secondary_id, .. } => Some(secondary_id),
        }
    }
}

/// Editable fields of a principal account. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct AccountEdit {
    pub name: Option<String>,
    pub account_type: Option<AccountType>,
    pub symbol: Option<Option<Symbol>>,
    pub default_order: Option<i64>,
    pub visible: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct SecondaryEdit {
    pub name: Option<String>,
    pub order: Option<i64>,
    pub company_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct ComponentEdit {
    pub weight: Option<Decimal>,
    pub order: Option<i64>,
    pub display_name: Option<Option<String>>,
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// The income-statement forest. Accounts are kept in insertion order; the
/// ordered view sorts by `default_order` with insertion order breaking ties.
#[derive(Debug, Clone, Default)]
pub struct DreModel {
    accounts: Vec<DreAccount>,
}

impl DreModel {
    pub fn new(accounts: Vec<DreAccount>) -> Result<Self> {
        let model = Self { accounts };
        model.validate()?;
        Ok(model)
    }

    /// Assemble the forest from flat table rows. Every secondary must point at an
    /// existing principal and every component at exactly one existing node.
    pub fn from_rows(
        accounts: Vec<DreAccount>,
        secondaries: Vec<SecondaryRow>,
        components: Vec<ComponentRow>,
    ) -> Result<Self> {
        let mut model = Self::new(accounts)?;
        for row in secondaries {
            model.add_secondary(&row.account_id, row.secondary)?;
        }
        for row in components {
            let parent = match row.secondary_id {
                Some(secondary_id) => ComponentParent::Secondary {
                    account_id: row.account_id,
                    secondary_id,
                },
                None => ComponentParent::Account(row.account_id),
            };
            model.add_component(&parent, row.component)?;
        }
        model.sort_children();
        Ok(model)
    }

    pub fn accounts(&self) -> &[DreAccount] {
        &self.accounts
    }

    /// Accounts by `default_order`; the stable sort keeps insertion order on ties.
    pub fn ordered(&self) -> Vec<&DreAccount> {
        let mut ordered: Vec<&DreAccount> = self.accounts.iter().collect();
        ordered.sort_by_key(|a| a.default_order);
        ordered
    }

    pub fn into_forest(self) -> Vec<DreAccount> {
        self.ordered().into_iter().cloned().collect()
    }

    pub fn account(&self, id: &str) -> Option<&DreAccount> {
        self.accounts.iter().find(|a| a.id == id)
    }

    pub fn secondary(&self, id: &str) -> Option<&DreSecondaryAccount> {
        self.accounts
            .iter()
            .flat_map(|a| a.secondary_accounts.iter())
            .find(|s| s.id == id)
    }

    fn account_mut(&mut self, id: &str) -> Result<&mut DreAccount> {
        self.accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| PainelError::NotFound(format!("DRE account {id}")))
    }

    fn secondary_mut(&mut self, id: &str) -> Result<&mut DreSecondaryAccount> {
        self.accounts
            .iter_mut()
            .flat_map(|a| a.secondary_accounts.iter_mut())
            .find(|s| s.id == id)
            .ok_or_else(|| PainelError::NotFound(format!("DRE secondary account {id}")))
    }

    fn sort_children(&mut self) {
        for account in &mut self.accounts {
            account.components.sort_by_key(|c| c.order);
            account.secondary_accounts.sort_by_key(|s| s.order);
            for secondary in &mut account.secondary_accounts {
                secondary.components.sort_by_key(|c| c.order);
            }
        }
    }

    fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.accounts.iter().flat_map(|a| {
            std::iter::once(a.id.as_str()).chain(a.secondary_accounts.iter().map(|s| s.id.as_str()))
        })
    }

    fn component_ids(&self) -> impl Iterator<Item = &str> {
        self.accounts
            .iter()
            .flat_map(|a| a.all_components().map(|c| c.id.as_str()))
    }

    /// Account and secondary ids share one namespace; component ids another.
    /// Both must be unique across the forest.
    pub fn validate(&self) -> Result<()> {
        let mut nodes: HashSet<&str> = HashSet::new();
        for id in self.node_ids() {
            if !nodes.insert(id) {
                return Err(PainelError::ConfigurationInvalid(format!(
                    "duplicate DRE account id: {id}"
                )));
            }
        }
        let mut components: HashSet<&str> = HashSet::new();
        for id in self.component_ids() {
            if !components.insert(id) {
                return Err(PainelError::ConfigurationInvalid(format!(
                    "duplicate DRE component id: {id}"
                )));
            }
        }
        Ok(())
    }

    /// Copy of the model with secondaries not enabled for `company_id` removed.
    pub fn for_company(&self, company_id: &str) -> DreModel {
        let accounts = self
            .accounts
            .iter()
            .cloned()
            .map(|mut a| {
                a.secondary_accounts.retain(|s| s.applies_to(company_id));
                a
            })
            .collect();
        DreModel { accounts }
    }

    // -- principal accounts ------------------------------------------------

    pub fn add_account(&mut self, account: DreAccount) -> Result<()> {
        if self.node_ids().any(|id| id == account.id) {
            return Err(PainelError::ConfigurationInvalid(format!(
                "duplicate DRE account id: {}",
                account.id
            )));
        }
        if account.name.trim().is_empty() {
            return Err(PainelError::ConfigurationInvalid("account name is required".into()));
        }
        self.accounts.push(account);
        Ok(())
    }

    pub fn update_account(&mut self, id: &str, edit: AccountEdit) -> Result<()> {
        let account = self.account_mut(id)?;
        if let Some(name) = edit.name {
            if name.trim().is_empty() {
                return Err(PainelError::ConfigurationInvalid("account name is required".into()));
            }
            account.name = name;
        }
        if let Some(account_type) = edit.account_type {
            account.account_type = account_type;
        }
        if let Some(symbol) = edit.symbol {
            account.symbol = symbol;
        }
        if let Some(order) = edit.default_order {
            account.default_order = order;
        }
        if let Some(visible) = edit.visible {
            account.visible = visible;
        }
        Ok(())
    }

    /// Remove a principal account together with its secondaries and components.
    pub fn delete_account(&mut self, id: &str) -> Result<DreAccount> {
        let idx = self
            .accounts
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| PainelError::NotFound(format!("DRE account {id}")))?;
        let removed = self.accounts.remove(idx);
        log::info!(
            "deleted DRE account {} with {} secondary account(s) and {} component(s)",
            removed.id,
            removed.secondary_accounts.len(),
            removed.all_components().count()
        );
        Ok(removed)
    }

    // -- secondary accounts ------------------------------------------------

    pub fn add_secondary(&mut self, account_id: &str, secondary: DreSecondaryAccount) -> Result<()> {
        if self.node_ids().any(|id| id == secondary.id) {
            return Err(PainelError::ConfigurationInvalid(format!(
                "duplicate DRE account id: {}",
                secondary.id
            )));
        }
        let account = self.account_mut(account_id)?;
        account.secondary_accounts.push(secondary);
        Ok(())
    }

    pub fn update_secondary(&mut self, id: &str, edit: SecondaryEdit) -> Result<()> {
        let secondary = self.secondary_mut(id)?;
        if let Some(name) = edit.name {
            secondary.name = name;
        }
        if let Some(order) = edit.order {
            secondary.order = order;
        }
        if let Some(company_ids) = edit.company_ids {
            secondary.company_ids = company_ids;
        }
        Ok(())
    }

    pub fn delete_secondary(&mut self, id: &str) -> Result<DreSecondaryAccount> {
        for account in &mut self.accounts {
            if let Some(idx) = account.secondary_accounts.iter().position(|s| s.id == id) {
                return Ok(account.secondary_accounts.remove(idx));
            }
        }
        Err(PainelError::NotFound(format!("DRE secondary account {id}")))
    }

    // -- components --------------------------------------------------------

    pub fn add_component(&mut self, parent: &ComponentParent, component: DreComponent) -> Result<()> {
        if self.component_ids().any(|id| id == component.id) {
            return Err(PainelError::ConfigurationInvalid(format!(
                "duplicate DRE component id: {}",
                component.id
            )));
        }
        let account_id = parent.account_id().to_string();
        let account = self.account_mut(&account_id)?;
        match parent.secondary_id() {
            None => account.components.push(component),
            Some(secondary_id) => {
                let secondary = account
                    .secondary_accounts
                    .iter_mut()
                    .find(|s| s.id == secondary_id)
                    .ok_or_else(|| {
                        PainelError::ConfigurationInvalid(format!(
                            "secondary account {secondary_id} does not belong to account {account_id}"
                        ))
                    })?;
                secondary.components.push(component);
            }
        }
        Ok(())
    }

    pub fn find_component(&self, id: &str) -> Option<(ComponentParent, &DreComponent)> {
        for account in &self.accounts {
            if let Some(c) = account.components.iter().find(|c| c.id == id) {
                return Some((ComponentParent::Account(account.id.clone()), c));
            }
            for secondary in &account.secondary_accounts {
                if let Some(c) = secondary.components.iter().find(|c| c.id == id) {
                    let parent = ComponentParent::Secondary {
                        account_id: account.id.clone(),
                        secondary_id: secondary.id.clone(),
                    };
                    return Some((parent, c));
                }
            }
        }
        None
    }

    fn component_mut(&mut self, id: &str) -> Result<&mut DreComponent> {
        self.accounts
            .iter_mut()
            .flat_map(|a| {
                a.components.iter_mut().chain(
                    a.secondary_accounts
                        .iter_mut()
                        .flat_map(|s| s.components.iter_mut()),
                )
            })
            .find(|c| c.id == id)
            .ok_or_else(|| PainelError::NotFound(format!("DRE component {id}")))
    }

    pub fn update_component(&mut self, id: &str, edit: ComponentEdit) -> Result<()> {
        let component = self.component_mut(id)?;
        if let Some(weight) = edit.weight {
            component.weight = weight;
        }
        if let Some(order) = edit.order {
            component.order = order;
        }
        if let Some(display_name) = edit.display_name {
            component.display_name = display_name;
        }
        Ok(())
    }

    pub fn delete_component(&mut self, id: &str) -> Result<DreComponent> {
        for account in &mut self.accounts {
            if let Some(idx) = account.components.iter().position(|c| c.id == id) {
                return Ok(account.components.remove(idx));
            }
            for secondary in &mut account.secondary_accounts {
                if let Some(idx) = secondary.components.iter().position(|c| c.id == id) {
                    return Ok(secondary.components.remove(idx));
                }
            }
        }
        Err(PainelError::NotFound(format!("DRE component {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReferenceKind;

    fn sample() -> DreModel {
        let mut model = DreModel::default();
        let mut receita = DreAccount::new("rb", "Receita Bruta", AccountType::Simple, Some(Symbol::Add));
        receita.default_order = 1;
        let mut custos = DreAccount::new("cv", "Custos", AccountType::Composite, Some(Symbol::Subtract));
        custos.default_order = 2;
        model.add_account(receita).unwrap();
        model.add_account(custos).unwrap();
        model
            .add_component(
                &ComponentParent::Account("rb".into()),
                DreComponent::new("c-vendas", ReferenceKind::Category, "vendas"),
            )
            .unwrap();
        model
            .add_secondary("cv", DreSecondaryAccount::new("s-pessoal", "Pessoal"))
            .unwrap();
        model
            .add_component(
                &ComponentParent::Secondary {
                    account_id: "cv".into(),
                    secondary_id: "s-pessoal".into(),
                },
                DreComponent::new("c-salarios", ReferenceKind::Category, "salarios"),
            )
            .unwrap();
        model
            .add_component(
                &ComponentParent::Account("cv".into()),
                DreComponent::new("c-insumos", ReferenceKind::Category, "insumos"),
            )
            .unwrap();
        model
    }

    #[test]
    fn test_ordered_breaks_ties_by_insertion() {
        let mut model = DreModel::default();
        for (id, order) in [("a", 5), ("b", 1), ("c", 5), ("d", 1)] {
            let mut acct = DreAccount::new(id, id, AccountType::Simple, None);
            acct.default_order = order;
            model.add_account(acct).unwrap();
        }
        let ids: Vec<&str> = model.ordered().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn test_delete_account_cascades() {
        let mut model = sample();
        let removed = model.delete_account("cv").unwrap();
        assert_eq!(removed.secondary_accounts.len(), 1);
        assert_eq!(removed.all_components().count(), 2);
        assert!(model.account("cv").is_none());
        assert!(model.find_component("c-salarios").is_none());
        assert!(model.find_component("c-insumos").is_none());
        // Untouched sibling keeps its component
        assert!(model.find_component("c-vendas").is_some());
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_delete_missing_account_is_not_found() {
        let mut model = sample();
        assert!(matches!(model.delete_account("nope"), Err(PainelError::NotFound(_))));
    }

    #[test]
    fn test_component_parent_must_resolve() {
        let mut model = sample();
        let orphan = DreComponent::new("c-x", ReferenceKind::Indicator, "ind");
        assert!(model
            .add_component(&ComponentParent::Account("missing".into()), orphan.clone())
            .is_err());
        // Secondary that belongs to a different principal
        let err = model
            .add_component(
                &ComponentParent::Secondary {
                    account_id: "rb".into(),
                    secondary_id: "s-pessoal".into(),
                },
                orphan,
            )
            .unwrap_err();
        assert!(matches!(err, PainelError::ConfigurationInvalid(_)));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut model = sample();
        let dup = DreAccount::new("s-pessoal", "Clash", AccountType::Simple, None);
        assert!(model.add_account(dup).is_err());
        let dup_comp = DreComponent::new("c-vendas", ReferenceKind::Category, "x");
        assert!(model
            .add_component(&ComponentParent::Account("rb".into()), dup_comp)
            .is_err());
    }

    #[test]
    fn test_from_rows_assembles_and_sorts() {
        let accounts = vec![DreAccount::new("rb", "Receita", AccountType::Simple, Some(Symbol::Add))];
        let mut sec = DreSecondaryAccount::new("s1", "Produtos");
        sec.order = 1;
        let secondaries = vec![SecondaryRow {
            account_id: "rb".into(),
            secondary: sec,
        }];
        let mut late = DreComponent::new("c2", ReferenceKind::Category, "b");
        late.order = 2;
        let mut early = DreComponent::new("c1", ReferenceKind::Category, "a");
        early.order = 1;
        let components = vec![
            ComponentRow {
                account_id: "rb".into(),
                secondary_id: Some("s1".into()),
                component: late,
            },
            ComponentRow {
                account_id: "rb".into(),
                secondary_id: Some("s1".into()),
                component: early,
            },
        ];
        let model = DreModel::from_rows(accounts, secondaries, components).unwrap();
        let comps: Vec<&str> = model.accounts()[0].secondary_accounts[0]
            .components
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(comps, vec!["c1", "c2"]);
    }

    #[test]
    fn test_from_rows_rejects_dangling_component() {
        let accounts = vec![DreAccount::new("rb", "Receita", AccountType::Simple, None)];
        let components = vec![ComponentRow {
            account_id: "rb".into(),
            secondary_id: Some("ghost".into()),
            component: DreComponent::new("c1", ReferenceKind::Category, "a"),
        }];
        assert!(DreModel::from_rows(accounts, vec![], components).is_err());
    }

    #[test]
    fn test_update_and_delete_component() {
        let mut model = sample();
        model
            .update_component(
                "c-salarios",
                ComponentEdit {
                    weight: Some(Decimal::new(5, 1)),
                    ..Default::default()
                },
            )
            .unwrap();
        let (parent, comp) = model.find_component("c-salarios").unwrap();
        assert_eq!(parent.secondary_id(), Some("s-pessoal"));
        assert_eq!(comp.weight, Decimal::new(5, 1));
        model.delete_component("c-salarios").unwrap();
        assert!(model.find_component("c-salarios").is_none());
    }

    #[test]
    fn test_delete_secondary_removes_its_components() {
        let mut model = sample();
        let removed = model.delete_secondary("s-pessoal").unwrap();
        assert_eq!(removed.components.len(), 1);
        assert!(model.find_component("c-salarios").is_none());
        assert!(model.find_component("c-insumos").is_some());
    }

    #[test]
    fn test_update_account_fields() {
        let mut model = sample();
        model
            .update_account(
                "rb",
                AccountEdit {
                    symbol: Some(Some(Symbol::Result)),
                    visible: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();
        let acct = model.account("rb").unwrap();
        assert_eq!(acct.symbol, Some(Symbol::Result));
        assert!(!acct.visible);
    }

    #[test]
    fn test_for_company_filters_secondaries() {
        let mut model = sample();
        model
            .update_secondary(
                "s-pessoal",
                SecondaryEdit {
                    company_ids: Some(vec!["acme".into()]),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(model.for_company("acme").account("cv").unwrap().secondary_accounts.len(), 1);
        assert!(model.for_company("other").account("cv").unwrap().secondary_accounts.is_empty());
    }
}
