use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::error::{PainelError, Result};
use crate::models::{CategoryType, DreComponent, RawFact, Reference, ReferenceKind};

/// Snapshot of the category/indicator catalog used for one valuation pass.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    refs: HashMap<(ReferenceKind, String), Reference>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_references(references: impl IntoIterator<Item = Reference>) -> Self {
        let mut catalog = Self::new();
        for reference in references {
            catalog.insert(reference);
        }
        catalog
    }

    pub fn insert(&mut self, reference: Reference) {
        self.refs
            .insert((reference.kind, reference.id.clone()), reference);
    }

    pub fn get(&self, id: &str, kind: ReferenceKind) -> Option<&Reference> {
        self.refs.get(&(kind, id.to_string()))
    }

    pub fn resolve(&self, id: &str, kind: ReferenceKind) -> Result<&Reference> {
        self.get(id, kind).ok_or_else(|| PainelError::ReferenceNotFound {
            kind: kind.key().to_string(),
            id: id.to_string(),
        })
    }

    pub fn contains(&self, id: &str, kind: ReferenceKind) -> bool {
        self.refs.contains_key(&(kind, id.to_string()))
    }
}

/// Amount of a fact with the revenue/expense sign rule applied.
///
/// Indicator facts pass through untouched. Category facts keep their sign for
/// revenue and are negated for expense. A category missing from the catalog
/// yields `ReferenceNotFound`; callers skip the term.
pub fn adjusted_amount(fact: &RawFact, catalog: &Catalog) -> Result<Decimal> {
    match fact.reference_kind {
        ReferenceKind::Indicator => Ok(fact.amount),
        ReferenceKind::Category => {
            let reference = catalog.resolve(&fact.reference_id, ReferenceKind::Category)?;
            Ok(match reference.category_type {
                Some(CategoryType::Expense) => -fact.amount,
                Some(CategoryType::Revenue) => fact.amount,
                None => {
                    log::warn!(
                        "category {} has no revenue/expense type; using raw amount",
                        reference.id
                    );
                    fact.amount
                }
            })
        }
    }
}

pub fn component_display_name(component: &DreComponent, catalog: &Catalog) -> String {
    if let Some(name) = component.display_name.as_deref().filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    catalog
        .get(&component.reference_id, component.reference_kind)
        .map(Reference::label)
        .unwrap_or_else(|| component.reference_id.clone())
}
