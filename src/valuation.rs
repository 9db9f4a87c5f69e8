use std::collections::{BTreeMap, BTreeSet, HashSet};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::error::{PainelError, Result};
use crate::models::{
    AccountType, CompanyScope, DashboardItem, DreAccount, DreComponent, DreSecondaryAccount,
    ItemRef, ItemType, LinkKind, RawFact, ReferenceKind, Symbol,
};
use crate::period::Period;
use crate::resolver::{adjusted_amount, Catalog};
use crate::store::{CatalogStore, FactStore, RefKey};

// ---------------------------------------------------------------------------
// Variation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Variation {
    pub percentage: Decimal,
    pub is_positive: bool,
}

/// Period-over-period change. A zero previous value yields `0%`, positive, as
/// does a change too large to represent.
pub fn calculate_variation(current: Decimal, previous: Decimal) -> Variation {
    let flat = Variation {
        percentage: Decimal::ZERO,
        is_positive: true,
    };
    if previous.is_zero() {
        return flat;
    }
    let Some(ratio) = current.checked_sub(previous).and_then(|d| d.checked_div(previous)) else {
        return flat;
    };
    let Some(scaled) = ratio.checked_mul(Decimal::ONE_HUNDRED) else {
        return flat;
    };
    let percentage = scaled
        .abs()
        .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
    Variation {
        percentage,
        is_positive: ratio >= Decimal::ZERO,
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Value of a DRE account. Unimplemented account types count as zero but stay
/// distinguishable from a computed zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum AccountValue {
    Computed(Decimal),
    Unimplemented(AccountType),
}

impl AccountValue {
    pub fn amount(&self) -> Decimal {
        match self {
            Self::Computed(v) => *v,
            Self::Unimplemented(_) => Decimal::ZERO,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Computed(_))
    }

    /// The amount, or `UnimplementedAccountType` for callers that cannot accept a placeholder.
    pub fn strict_amount(&self, account_id: &str) -> Result<Decimal> {
        match self {
            Self::Computed(v) => Ok(*v),
            Self::Unimplemented(t) => Err(PainelError::UnimplementedAccountType {
                account_id: account_id.to_string(),
                account_type: t.key().to_string(),
            }),
        }
    }
}

#[derive(Debug)]
pub struct AccountFailure {
    pub account_id: String,
    pub error: PainelError,
}

/// Per-account values of a whole DRE forest for one period.
#[derive(Debug, Default)]
pub struct DreValuation {
    pub values: BTreeMap<String, AccountValue>,
    pub failures: Vec<AccountFailure>,
}

impl DreValuation {
    #[cfg(test)]
    pub fn amount(&self, account_id: &str) -> Option<Decimal> {
        self.values.get(account_id).map(AccountValue::amount)
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.values.values().all(AccountValue::is_complete)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementLine {
    pub account_id: String,
    pub name: String,
    pub symbol: Option<Symbol>,
    pub visible: bool,
    /// `None` when the account failed to valuate.
    pub value: Option<AccountValue>,
    /// Signed amount added to the running total; `None` for checkpoint lines.
    pub contribution: Option<Decimal>,
    pub running_total: Decimal,
}

impl StatementLine {
    pub fn is_checkpoint(&self) -> bool {
        matches!(self.symbol, None | Some(Symbol::Result))
    }
}

/// An account left out of a statement and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementFailure {
    pub account_id: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    pub period: Period,
    pub lines: Vec<StatementLine>,
    pub total: Decimal,
    pub complete: bool,
    pub failures: Vec<StatementFailure>,
}

/// Value of a sum or DRE dashboard item, optionally against a prior period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemValuation {
    pub item_id: String,
    pub value: Decimal,
    pub prior_value: Option<Decimal>,
    pub variation: Option<Variation>,
    /// DRE accounts whose type has no valuation rule yet.
    pub incomplete_accounts: Vec<String>,
}

impl ItemValuation {
    pub fn is_complete(&self) -> bool {
        self.incomplete_accounts.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub period: Period,
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub reference: ItemRef,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub reference: ItemRef,
    pub value: Decimal,
}

/// What a dashboard card shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CardValue {
    Amount(ItemValuation),
    Chart { series: Vec<ChartSeries> },
    List { entries: Vec<RankedEntry> },
}

#[derive(Debug)]
pub struct Card {
    pub item: DashboardItem,
    pub value: Result<CardValue>,
}

// ---------------------------------------------------------------------------
// Pure engine over an in-memory snapshot
// ---------------------------------------------------------------------------

/// Facts, catalog and DRE forest already fetched for one valuation pass.
pub struct ValuationContext<'a> {
    pub facts: &'a [RawFact],
    pub catalog: &'a Catalog,
    pub forest: &'a [DreAccount],
}

impl<'a> ValuationContext<'a> {
    pub fn new(facts: &'a [RawFact], catalog: &'a Catalog, forest: &'a [DreAccount]) -> Self {
        Self {
            facts,
            catalog,
            forest,
        }
    }

    /// Σ adjusted amounts of the facts in `period` whose (kind, id) is in `wanted`.
    /// Facts whose category vanished from the catalog are skipped.
    fn sum_matching(&self, wanted: &HashSet<(ReferenceKind, &str)>, period: Period) -> Result<Decimal> {
        self.facts
            .iter()
            .filter(|f| f.period == period)
            .filter(|f| wanted.contains(&(f.reference_kind, f.reference_id.as_str())))
            .filter_map(|f| match adjusted_amount(f, self.catalog) {
                Ok(v) => Some(v),
                Err(e) => {
                    log::warn!("skipping fact for {}: {e}", f.reference_id);
                    None
                }
            })
            .try_fold(Decimal::ZERO, checked_add)
    }

    fn known(&self, id: &str, kind: ReferenceKind) -> bool {
        if self.catalog.contains(id, kind) {
            return true;
        }
        log::warn!("reference {} {id} not in catalog; contributing 0", kind.key());
        false
    }

    /// Signed total of one category or indicator in `period`.
    pub fn reference_total(&self, id: &str, kind: ReferenceKind, period: Period) -> Result<Decimal> {
        if !self.known(id, kind) {
            return Ok(Decimal::ZERO);
        }
        let wanted = HashSet::from([(kind, id)]);
        self.sum_matching(&wanted, period)
    }

    /// Category, indicator and custom sums. The referenced ids form a set, so a
    /// repeated id is counted once; custom sums take the union over both kinds.
    pub fn sum_item(&self, item: &DashboardItem, period: Period) -> Result<Decimal> {
        let wanted: HashSet<(ReferenceKind, &str)> = item
            .references
            .iter()
            .filter_map(|r| r.kind.as_reference_kind().map(|k| (k, r.id.as_str())))
            .filter(|(k, id)| self.known(id, *k))
            .collect();
        self.sum_matching(&wanted, period)
    }

    pub fn component_value(&self, component: &DreComponent, period: Period) -> Result<Decimal> {
        let total = self.reference_total(&component.reference_id, component.reference_kind, period)?;
        component
            .weight
            .checked_mul(total)
            .ok_or_else(|| {
                PainelError::Overflow(format!("{} x {total} in component {}", component.weight, component.id))
            })
    }

    pub fn secondary_value(&self, secondary: &DreSecondaryAccount, period: Period) -> Result<Decimal> {
        secondary
            .components
            .iter()
            .try_fold(Decimal::ZERO, |acc, c| checked_add(acc, self.component_value(c, period)?))
    }

    /// Bottom-up value of one principal account. The walk keeps the ids on the
    /// current path and fails with `CycleDetected` if a child repeats one.
    pub fn account_value(&self, account: &DreAccount, period: Period) -> Result<AccountValue> {
        if !account.account_type.is_computable() {
            return Ok(AccountValue::Unimplemented(account.account_type));
        }
        let mut path: Vec<&str> = vec![account.id.as_str()];
        let mut total = Decimal::ZERO;
        for component in &account.components {
            enter(&path, &component.id)?;
            total = checked_add(total, self.component_value(component, period)?)?;
        }
        for secondary in &account.secondary_accounts {
            enter(&path, &secondary.id)?;
            path.push(secondary.id.as_str());
            for component in &secondary.components {
                enter(&path, &component.id)?;
            }
            total = checked_add(total, self.secondary_value(secondary, period)?)?;
            path.pop();
        }
        Ok(AccountValue::Computed(total))
    }

    /// Every account of the forest. A failing account is recorded and does not
    /// affect its siblings.
    pub fn dre_tree(&self, period: Period) -> DreValuation {
        let mut valuation = DreValuation::default();
        let mut seen: HashSet<&str> = HashSet::new();
        for account in self.forest {
            let result = if seen.insert(account.id.as_str()) {
                self.account_value(account, period)
            } else {
                Err(PainelError::CycleDetected(account.id.clone()))
            };
            match result {
                Ok(value) => {
                    valuation.values.insert(account.id.clone(), value);
                }
                Err(error) => {
                    log::warn!("DRE account {} not valuated: {error}", account.id);
                    valuation.failures.push(AccountFailure {
                        account_id: account.id.clone(),
                        error,
                    });
                }
            }
        }
        valuation
    }

    /// Ordered accumulation of top-level accounts by `default_order`, each
    /// applying its own symbol. `Result` and symbol-less lines are checkpoints
    /// that report the running total without adding to it. Accounts that failed
    /// to valuate are listed in `failures` and contribute nothing.
    pub fn statement(&self, period: Period) -> Result<Statement> {
        let valuation = self.dre_tree(period);
        let mut ordered: Vec<&DreAccount> = self.forest.iter().collect();
        ordered.sort_by_key(|a| a.default_order);

        let mut running = Decimal::ZERO;
        let mut lines = Vec::with_capacity(ordered.len());
        for account in ordered {
            let value = valuation.values.get(&account.id).copied();
            let amount = value.map(|v| v.amount()).unwrap_or(Decimal::ZERO);
            let contribution = match account.symbol {
                Some(Symbol::Add) => Some(amount),
                Some(Symbol::Subtract) => Some(-amount),
                Some(Symbol::Result) | None => None,
            };
            if let Some(c) = contribution {
                running = checked_add(running, c)?;
            }
            lines.push(StatementLine {
                account_id: account.id.clone(),
                name: account.name.clone(),
                symbol: account.symbol,
                visible: account.visible,
                value,
                contribution,
                running_total: running,
            });
        }

        let complete = valuation.is_complete();
        let failures = valuation
            .failures
            .into_iter()
            .map(|f| StatementFailure {
                account_id: f.account_id,
                message: f.error.to_string(),
            })
            .collect();
        Ok(Statement {
            period,
            lines,
            total: running,
            complete,
            failures,
        })
    }

    /// Value of a single linked reference of any kind.
    pub fn link_value(&self, link: &ItemRef, period: Period) -> Result<AccountValue> {
        match link.kind.as_reference_kind() {
            Some(kind) => Ok(AccountValue::Computed(self.reference_total(&link.id, kind, period)?)),
            None => match self.forest.iter().find(|a| a.id == link.id) {
                Some(account) => self.account_value(account, period),
                None => {
                    log::warn!("DRE account {} not in model; contributing 0", link.id);
                    Ok(AccountValue::Computed(Decimal::ZERO))
                }
            },
        }
    }

    /// Value of a sum or DRE item for one period plus the ids of referenced
    /// accounts that could not be computed.
    fn amount_for(&self, item: &DashboardItem, period: Period) -> Result<(Decimal, Vec<String>)> {
        match item.item_type {
            ItemType::CategorySum | ItemType::IndicatorSum | ItemType::CustomSum => {
                Ok((self.sum_item(item, period)?, Vec::new()))
            }
            ItemType::DreAccount => {
                let mut total = Decimal::ZERO;
                let mut incomplete = Vec::new();
                let mut counted: BTreeSet<&str> = BTreeSet::new();
                for link in item.references.iter().filter(|r| r.kind == LinkKind::DreAccount) {
                    if !counted.insert(link.id.as_str()) {
                        continue;
                    }
                    let value = self.link_value(link, period)?;
                    if !value.is_complete() {
                        incomplete.push(link.id.clone());
                    }
                    total = checked_add(total, value.amount())?;
                }
                Ok((total, incomplete))
            }
            ItemType::Chart | ItemType::List => Err(PainelError::ConfigurationInvalid(format!(
                "{} items have no single value",
                item.item_type.label()
            ))),
        }
    }

    /// Value for `period` and, when given, the prior period with the variation between them.
    pub fn valuate_item(
        &self,
        item: &DashboardItem,
        period: Period,
        prior: Option<Period>,
    ) -> Result<ItemValuation> {
        let (value, mut incomplete_accounts) = self.amount_for(item, period)?;
        let (prior_value, variation) = match prior {
            Some(p) => {
                let (prior_value, prior_incomplete) = self.amount_for(item, p)?;
                for id in prior_incomplete {
                    if !incomplete_accounts.contains(&id) {
                        incomplete_accounts.push(id);
                    }
                }
                (Some(prior_value), Some(calculate_variation(value, prior_value)))
            }
            None => (None, None),
        };
        Ok(ItemValuation {
            item_id: item.id.clone(),
            value,
            prior_value,
            variation,
            incomplete_accounts,
        })
    }

    /// One series per linked reference over the twelve months ending at `period`.
    pub fn chart(&self, item: &DashboardItem, period: Period) -> Result<Vec<ChartSeries>> {
        let window = period.twelve_month_window();
        item.references
            .iter()
            .map(|link| {
                let points = window
                    .iter()
                    .map(|p| {
                        Ok(SeriesPoint {
                            period: *p,
                            value: self.link_value(link, *p)?.amount(),
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(ChartSeries {
                    reference: link.clone(),
                    points,
                })
            })
            .collect()
    }

    /// Linked references ranked by value, highest first, cut to the item's top limit.
    /// Ties keep configuration order.
    pub fn ranking(&self, item: &DashboardItem, period: Period) -> Result<Vec<RankedEntry>> {
        let mut entries = item
            .references
            .iter()
            .map(|link| {
                Ok(RankedEntry {
                    reference: link.clone(),
                    value: self.link_value(link, period)?.amount(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        entries.sort_by(|a, b| b.value.cmp(&a.value));
        entries.truncate(item.effective_top_limit());
        Ok(entries)
    }

    pub fn card(&self, item: &DashboardItem, period: Period, prior: Option<Period>) -> Result<CardValue> {
        match item.item_type {
            ItemType::Chart => Ok(CardValue::Chart {
                series: self.chart(item, period)?,
            }),
            ItemType::List => Ok(CardValue::List {
                entries: self.ranking(item, period)?,
            }),
            _ => Ok(CardValue::Amount(self.valuate_item(item, period, prior)?)),
        }
    }
}

fn checked_add(acc: Decimal, term: Decimal) -> Result<Decimal> {
    acc.checked_add(term)
        .ok_or_else(|| PainelError::Overflow(format!("{acc} + {term}")))
}

fn enter(path: &[&str], id: &str) -> Result<()> {
    if path.contains(&id) {
        return Err(PainelError::CycleDetected(id.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Store-backed valuation
// ---------------------------------------------------------------------------

/// Fetches the snapshot an item needs from the stores, then valuates it.
pub struct Valuator<'s, S> {
    store: &'s S,
}

impl<'s, S: FactStore + CatalogStore> Valuator<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    fn catalog_for(&self, keys: &BTreeSet<RefKey>) -> Result<Catalog> {
        let mut catalog = Catalog::new();
        for key in keys {
            match self.store.fetch_reference(&key.id, key.kind)? {
                Some(reference) => catalog.insert(reference),
                None => log::warn!("reference {} {} not found in catalog", key.kind.key(), key.id),
            }
        }
        Ok(catalog)
    }

    fn facts_for(
        &self,
        company_id: &str,
        periods: &[Period],
        keys: &BTreeSet<RefKey>,
    ) -> Result<Vec<RawFact>> {
        let keys: Vec<RefKey> = keys.iter().cloned().collect();
        let mut facts = Vec::new();
        for period in periods {
            facts.extend(self.store.fetch_facts(company_id, *period, &keys)?);
        }
        log::debug!(
            "fetched {} fact(s) for {} reference(s) over {} period(s)",
            facts.len(),
            keys.len(),
            periods.len()
        );
        Ok(facts)
    }

    /// Leaf references an item ultimately reads, including components of linked DRE accounts.
    fn leaf_keys(item: &DashboardItem, forest: &[DreAccount]) -> BTreeSet<RefKey> {
        let mut keys = BTreeSet::new();
        for link in &item.references {
            match link.kind.as_reference_kind() {
                Some(kind) => {
                    keys.insert(RefKey::new(kind, &link.id));
                }
                None => {
                    if let Some(account) = forest.iter().find(|a| a.id == link.id) {
                        keys.extend(forest_keys(std::slice::from_ref(account)));
                    }
                }
            }
        }
        keys
    }

    fn forest_if_needed(&self, company_id: &str, item: &DashboardItem) -> Result<Vec<DreAccount>> {
        if item.references.iter().any(|r| r.kind == LinkKind::DreAccount) {
            self.store.fetch_config_model(company_id)
        } else {
            Ok(Vec::new())
        }
    }

    pub fn valuate_item(
        &self,
        company_id: &str,
        item: &DashboardItem,
        period: Period,
        prior: Option<Period>,
    ) -> Result<ItemValuation> {
        let forest = self.forest_if_needed(company_id, item)?;
        let keys = Self::leaf_keys(item, &forest);
        let catalog = self.catalog_for(&keys)?;
        let periods: Vec<Period> = std::iter::once(period).chain(prior).collect();
        let facts = self.facts_for(company_id, &periods, &keys)?;
        ValuationContext::new(&facts, &catalog, &forest).valuate_item(item, period, prior)
    }

    pub fn valuate_card(
        &self,
        company_id: &str,
        item: &DashboardItem,
        period: Period,
        prior: Option<Period>,
    ) -> Result<CardValue> {
        if !item.item_type.is_presentational() {
            return Ok(CardValue::Amount(self.valuate_item(company_id, item, period, prior)?));
        }
        let forest = self.forest_if_needed(company_id, item)?;
        let keys = Self::leaf_keys(item, &forest);
        let catalog = self.catalog_for(&keys)?;
        let periods: Vec<Period> = match item.item_type {
            ItemType::Chart => period.twelve_month_window(),
            _ => vec![period],
        };
        let facts = self.facts_for(company_id, &periods, &keys)?;
        ValuationContext::new(&facts, &catalog, &forest).card(item, period, prior)
    }

    pub fn valuate_dre_tree(&self, company_id: &str, period: Period) -> Result<DreValuation> {
        let forest = self.store.fetch_config_model(company_id)?;
        let keys = forest_keys(&forest);
        let catalog = self.catalog_for(&keys)?;
        let facts = self.facts_for(company_id, &[period], &keys)?;
        Ok(ValuationContext::new(&facts, &catalog, &forest).dre_tree(period))
    }

    pub fn valuate_statement(&self, company_id: &str, period: Period) -> Result<Statement> {
        let forest = self.store.fetch_config_model(company_id)?;
        let keys = forest_keys(&forest);
        let catalog = self.catalog_for(&keys)?;
        let facts = self.facts_for(company_id, &[period], &keys)?;
        ValuationContext::new(&facts, &catalog, &forest).statement(period)
    }

    /// Active items in display order, each valuated on its own. The prior period
    /// is the calendar month before `period`. One item failing leaves the rest intact.
    pub fn valuate_dashboard(
        &self,
        scope: &CompanyScope,
        company_id: &str,
        items: &[DashboardItem],
        period: Period,
    ) -> Result<Vec<Card>> {
        scope.check(company_id)?;
        let mut active: Vec<&DashboardItem> = items
            .iter()
            .filter(|i| i.is_active && i.company_id == company_id)
            .collect();
        active.sort_by_key(|i| i.order);
        let prior = Some(period.previous());
        Ok(active
            .into_iter()
            .map(|item| Card {
                item: item.clone(),
                value: self.valuate_card(company_id, item, period, prior),
            })
            .collect())
    }
}

/// Leaf references used anywhere in a DRE forest.
pub fn forest_keys(forest: &[DreAccount]) -> BTreeSet<RefKey> {
    forest
        .iter()
        .flat_map(|a| a.all_components())
        .map(|c| RefKey::new(c.reference_kind, &c.reference_id))
        .collect()
}
