use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{PainelError, Result};
use crate::period::Period;

// ---------------------------------------------------------------------------
// Catalog references
// ---------------------------------------------------------------------------

/// Kind of a leaf data source. Facts and DRE components only ever point at these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Category,
    Indicator,
}

impl ReferenceKind {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Category => "categoria",
            Self::Indicator => "indicador",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "categoria" | "category" => Some(Self::Category),
            "indicador" | "indicator" => Some(Self::Indicator),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryType {
    Revenue,
    Expense,
}

impl CategoryType {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Revenue => "revenue",
            Self::Expense => "expense",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "revenue" | "income" | "receita" => Some(Self::Revenue),
            "expense" | "despesa" => Some(Self::Expense),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub id: String,
    pub kind: ReferenceKind,
    pub name: String,
    pub code: Option<String>,
    /// Only set for categories.
    pub category_type: Option<CategoryType>,
}

impl Reference {
    #[cfg(test)]
    pub fn category(id: &str, name: &str, code: Option<&str>, category_type: CategoryType) -> Self {
        Self {
            id: id.to_string(),
            kind: ReferenceKind::Category,
            name: name.to_string(),
            code: code.map(str::to_string),
            category_type: Some(category_type),
        }
    }

    #[cfg(test)]
    pub fn indicator(id: &str, name: &str, code: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            kind: ReferenceKind::Indicator,
            name: name.to_string(),
            code: code.map(str::to_string),
            category_type: None,
        }
    }

    pub fn label(&self) -> String {
        match &self.code {
            Some(code) if !code.is_empty() => format!("{code} - {}", self.name),
            _ => self.name.clone(),
        }
    }
}

/// One transactional amount as recorded by the fact store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFact {
    pub company_id: String,
    pub period: Period,
    pub amount: Decimal,
    pub reference_id: String,
    pub reference_kind: ReferenceKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub trading_name: String,
    pub is_active: bool,
}

/// Which companies the current user may look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompanyScope {
    All,
    Single(String),
}

impl CompanyScope {
    pub fn check(&self, company_id: &str) -> Result<()> {
        match self {
            Self::All => Ok(()),
            Self::Single(id) if id == company_id => Ok(()),
            Self::Single(_) => Err(PainelError::AccessDenied(company_id.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Dashboard items
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    CategorySum,
    IndicatorSum,
    DreAccount,
    CustomSum,
    Chart,
    List,
}

impl ItemType {
    pub const ALL: [ItemType; 6] = [
        Self::CategorySum,
        Self::IndicatorSum,
        Self::DreAccount,
        Self::CustomSum,
        Self::Chart,
        Self::List,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::CategorySum => "categoria",
            Self::IndicatorSum => "indicador",
            Self::DreAccount => "conta_dre",
            Self::CustomSum => "custom_sum",
            Self::Chart => "grafico",
            Self::List => "lista",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::CategorySum => "Category sum",
            Self::IndicatorSum => "Indicator",
            Self::DreAccount => "DRE account",
            Self::CustomSum => "Custom sum",
            Self::Chart => "Chart",
            Self::List => "List",
        }
    }

    pub fn from_key(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.key() == raw.trim())
    }

    /// Chart and list items carry presentation-only linked data.
    pub fn is_presentational(&self) -> bool {
        matches!(self, Self::Chart | Self::List)
    }
}

/// Kind of a reference held by a dashboard item. Superset of [`ReferenceKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    Category,
    Indicator,
    DreAccount,
}

impl LinkKind {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Category => "categoria",
            Self::Indicator => "indicador",
            Self::DreAccount => "conta_dre",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "conta_dre" | "dre" | "dre_account" => Some(Self::DreAccount),
            other => ReferenceKind::parse(other).map(Self::from),
        }
    }

    pub fn as_reference_kind(&self) -> Option<ReferenceKind> {
        match self {
            Self::Category => Some(ReferenceKind::Category),
            Self::Indicator => Some(ReferenceKind::Indicator),
            Self::DreAccount => None,
        }
    }
}

impl From<ReferenceKind> for LinkKind {
    fn from(kind: ReferenceKind) -> Self {
        match kind {
            ReferenceKind::Category => Self::Category,
            ReferenceKind::Indicator => Self::Indicator,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRef {
    pub id: String,
    pub kind: LinkKind,
    pub name: Option<String>,
}

#[cfg(test)]
impl ItemRef {
    pub fn new(id: &str, kind: LinkKind) -> Self {
        Self {
            id: id.to_string(),
            kind,
            name: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    Line,
    Bar,
    Pie,
}

impl ChartType {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Line => "linha",
            Self::Bar => "barra",
            Self::Pie => "pizza",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "linha" | "line" => Some(Self::Line),
            "barra" | "bar" => Some(Self::Bar),
            "pizza" | "pie" => Some(Self::Pie),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultColor {
    #[default]
    Green,
    Red,
}

impl ResultColor {
    pub fn hex(&self) -> &'static str {
        match self {
            Self::Green => "#44FF44",
            Self::Red => "#FF4444",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "#44ff44" | "green" | "verde" => Some(Self::Green),
            "#ff4444" | "red" | "vermelho" => Some(Self::Red),
            _ => None,
        }
    }
}

pub const DEFAULT_TOP_LIMIT: u8 = 5;

/// A configured dashboard card. Every item type resolves to one ordered list of
/// typed references; chart type and top limit are presentation extras.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardItem {
    pub id: String,
    pub company_id: String,
    pub order: u32,
    pub title: String,
    pub is_active: bool,
    pub item_type: ItemType,
    pub references: Vec<ItemRef>,
    pub result_color: ResultColor,
    pub chart_type: Option<ChartType>,
    pub top_limit: Option<u8>,
}

impl DashboardItem {
    pub fn new(company_id: &str, title: &str, item_type: ItemType) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            company_id: company_id.to_string(),
            order: 0,
            title: title.to_string(),
            is_active: true,
            item_type,
            references: Vec::new(),
            result_color: ResultColor::default(),
            chart_type: None,
            top_limit: None,
        }
    }

    #[cfg(test)]
    pub fn with_ref(mut self, id: &str, kind: LinkKind) -> Self {
        self.references.push(ItemRef::new(id, kind));
        self
    }

    pub fn effective_top_limit(&self) -> usize {
        self.top_limit.unwrap_or(DEFAULT_TOP_LIMIT) as usize
    }
}

// ---------------------------------------------------------------------------
// DRE model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Simple,
    Composite,
    Formula,
    Indicator,
    IndicatorSum,
}

impl AccountType {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Simple => "simples",
            Self::Composite => "composta",
            Self::Formula => "formula",
            Self::Indicator => "indicador",
            Self::IndicatorSum => "soma_indicadores",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "simples" | "simple" => Some(Self::Simple),
            "composta" | "composite" => Some(Self::Composite),
            "formula" | "fórmula" => Some(Self::Formula),
            "indicador" | "indicator" => Some(Self::Indicator),
            "soma_indicadores" | "indicator_sum" => Some(Self::IndicatorSum),
            _ => None,
        }
    }

    /// Formula and indicator-sum accounts have no valuation rule yet.
    pub fn is_computable(&self) -> bool {
        !matches!(self, Self::Formula | Self::IndicatorSum)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symbol {
    Add,
    Subtract,
    Result,
}

impl Symbol {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Result => "=",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "+" | "add" => Some(Self::Add),
            "-" | "subtract" => Some(Self::Subtract),
            "=" | "result" => Some(Self::Result),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DreComponent {
    pub id: String,
    pub reference_kind: ReferenceKind,
    pub reference_id: String,
    pub weight: Decimal,
    pub order: i64,
    pub display_name: Option<String>,
}

impl DreComponent {
    pub fn new(id: &str, reference_kind: ReferenceKind, reference_id: &str) -> Self {
        Self {
            id: id.to_string(),
            reference_kind,
            reference_id: reference_id.to_string(),
            weight: Decimal::ONE,
            order: 0,
            display_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DreSecondaryAccount {
    pub id: String,
    pub name: String,
    pub order: i64,
    /// Companies this grouping applies to; empty means every company.
    pub company_ids: Vec<String>,
    pub components: Vec<DreComponent>,
}

impl DreSecondaryAccount {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            order: 0,
            company_ids: Vec::new(),
            components: Vec::new(),
        }
    }

    pub fn applies_to(&self, company_id: &str) -> bool {
        self.company_ids.is_empty() || self.company_ids.iter().any(|c| c == company_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DreAccount {
    pub id: String,
    pub name: String,
    pub account_type: AccountType,
    pub symbol: Option<Symbol>,
    pub default_order: i64,
    pub visible: bool,
    pub secondary_accounts: Vec<DreSecondaryAccount>,
    pub components: Vec<DreComponent>,
}

impl DreAccount {
    pub fn new(id: &str, name: &str, account_type: AccountType, symbol: Option<Symbol>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            account_type,
            symbol,
            default_order: 0,
            visible: true,
            secondary_accounts: Vec::new(),
            components: Vec::new(),
        }
    }

    /// Every component under this account, direct ones first.
    pub fn all_components(&self) -> impl Iterator<Item = &DreComponent> {
        self.components
            .iter()
            .chain(self.secondary_accounts.iter().flat_map(|s| s.components.iter()))
    }
}
