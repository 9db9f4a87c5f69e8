use std::path::Path;
use std::str::FromStr;

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use rust_decimal::Decimal;

use crate::dre::{
    AccountEdit, ComponentEdit, ComponentParent, ComponentRow, DreModel, SecondaryEdit, SecondaryRow,
};
use crate::error::{PainelError, Result};
use crate::layout::validate_layout;
use crate::models::{
    AccountType, CategoryType, ChartType, Company, DashboardItem, DreAccount, DreComponent,
    DreSecondaryAccount, ItemRef, ItemType, LinkKind, RawFact, Reference, ReferenceKind,
    ResultColor, Symbol,
};
use crate::period::Period;
use crate::store::{CatalogStore, DashboardStore, FactStore, RefKey};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS companies (
    id TEXT PRIMARY KEY,
    trading_name TEXT NOT NULL,
    is_active INTEGER DEFAULT 1,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS categories (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    code TEXT,
    category_type TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS indicators (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    code TEXT
);

CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    filename TEXT NOT NULL,
    company_id TEXT NOT NULL,
    import_date TEXT DEFAULT (datetime('now')),
    record_count INTEGER,
    checksum TEXT,
    FOREIGN KEY (company_id) REFERENCES companies(id)
);

CREATE TABLE IF NOT EXISTS facts (
    id INTEGER PRIMARY KEY,
    company_id TEXT NOT NULL,
    year INTEGER NOT NULL,
    month INTEGER NOT NULL,
    amount TEXT NOT NULL,
    reference_kind TEXT NOT NULL,
    reference_id TEXT NOT NULL,
    import_id INTEGER,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (company_id) REFERENCES companies(id),
    FOREIGN KEY (import_id) REFERENCES imports(id)
);

CREATE INDEX IF NOT EXISTS idx_facts_company_period ON facts (company_id, year, month);

CREATE TABLE IF NOT EXISTS dre_accounts (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    account_type TEXT NOT NULL,
    symbol TEXT,
    default_order INTEGER NOT NULL DEFAULT 0,
    visible INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS dre_secondary_accounts (
    id TEXT PRIMARY KEY,
    account_id TEXT NOT NULL,
    name TEXT NOT NULL,
    position INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (account_id) REFERENCES dre_accounts(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS dre_secondary_companies (
    secondary_id TEXT NOT NULL,
    company_id TEXT NOT NULL,
    PRIMARY KEY (secondary_id, company_id),
    FOREIGN KEY (secondary_id) REFERENCES dre_secondary_accounts(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS dre_components (
    id TEXT PRIMARY KEY,
    account_id TEXT NOT NULL,
    secondary_id TEXT,
    reference_kind TEXT NOT NULL,
    reference_id TEXT NOT NULL,
    weight TEXT NOT NULL DEFAULT '1',
    position INTEGER NOT NULL DEFAULT 0,
    display_name TEXT,
    FOREIGN KEY (account_id) REFERENCES dre_accounts(id) ON DELETE CASCADE,
    FOREIGN KEY (secondary_id) REFERENCES dre_secondary_accounts(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS dashboard_items (
    id TEXT PRIMARY KEY,
    company_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    title TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    item_type TEXT NOT NULL,
    result_color TEXT NOT NULL DEFAULT '#44FF44',
    chart_type TEXT,
    top_limit INTEGER,
    UNIQUE (company_id, position),
    FOREIGN KEY (company_id) REFERENCES companies(id)
);

CREATE TABLE IF NOT EXISTS dashboard_item_refs (
    item_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    reference_kind TEXT NOT NULL,
    reference_id TEXT NOT NULL,
    name TEXT,
    PRIMARY KEY (item_id, position),
    FOREIGN KEY (item_id) REFERENCES dashboard_items(id) ON DELETE CASCADE
);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ---------------------------------------------------------------------------
// Column helpers
// ---------------------------------------------------------------------------

fn conversion_error(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, msg.into())
}

fn decimal_at(row: &Row, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw).map_err(|e| conversion_error(idx, format!("{raw}: {e}")))
}

fn enum_at<T>(row: &Row, idx: usize, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| conversion_error(idx, format!("unexpected value: {raw}")))
}

fn opt_enum_at<T>(row: &Row, idx: usize, parse: fn(&str) -> Option<T>) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        None => Ok(None),
        Some(raw) => parse(&raw)
            .map(Some)
            .ok_or_else(|| conversion_error(idx, format!("unexpected value: {raw}"))),
    }
}

// ---------------------------------------------------------------------------
// Companies
// ---------------------------------------------------------------------------

pub fn add_company(conn: &Connection, id: &str, trading_name: &str) -> Result<()> {
    if id.trim().is_empty() || trading_name.trim().is_empty() {
        return Err(PainelError::Other("Company id and name are required".into()));
    }
    conn.execute(
        "INSERT INTO companies (id, trading_name) VALUES (?1, ?2)",
        rusqlite::params![id, trading_name],
    )?;
    Ok(())
}

pub fn list_companies(conn: &Connection) -> Result<Vec<Company>> {
    let mut stmt = conn.prepare("SELECT id, trading_name, is_active FROM companies ORDER BY trading_name")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Company {
                id: row.get(0)?,
                trading_name: row.get(1)?,
                is_active: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn company_exists(conn: &Connection, id: &str) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM companies WHERE id = ?1 AND is_active = 1)",
        [id],
        |row| row.get(0),
    )?)
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

pub fn add_category(
    conn: &Connection,
    name: &str,
    code: Option<&str>,
    category_type: CategoryType,
) -> Result<String> {
    if name.trim().is_empty() {
        return Err(PainelError::Other("Name is required".into()));
    }
    let id = new_id();
    conn.execute(
        "INSERT INTO categories (id, name, code, category_type) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![id, name, code, category_type.key()],
    )?;
    Ok(id)
}

pub fn add_indicator(conn: &Connection, name: &str, code: Option<&str>) -> Result<String> {
    if name.trim().is_empty() {
        return Err(PainelError::Other("Name is required".into()));
    }
    let id = new_id();
    conn.execute(
        "INSERT INTO indicators (id, name, code) VALUES (?1, ?2, ?3)",
        rusqlite::params![id, name, code],
    )?;
    Ok(id)
}

fn category_from_row(row: &Row) -> rusqlite::Result<Reference> {
    Ok(Reference {
        id: row.get(0)?,
        kind: ReferenceKind::Category,
        name: row.get(1)?,
        code: row.get(2)?,
        category_type: Some(enum_at(row, 3, CategoryType::parse)?),
    })
}

fn indicator_from_row(row: &Row) -> rusqlite::Result<Reference> {
    Ok(Reference {
        id: row.get(0)?,
        kind: ReferenceKind::Indicator,
        name: row.get(1)?,
        code: row.get(2)?,
        category_type: None,
    })
}

pub fn list_references(conn: &Connection, kind: ReferenceKind) -> Result<Vec<Reference>> {
    let rows = match kind {
        ReferenceKind::Category => conn
            .prepare("SELECT id, name, code, category_type FROM categories ORDER BY code, name")?
            .query_map([], category_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?,
        ReferenceKind::Indicator => conn
            .prepare("SELECT id, name, code FROM indicators ORDER BY code, name")?
            .query_map([], indicator_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?,
    };
    Ok(rows)
}

/// Look a reference up by id first, then by code.
pub fn find_reference(conn: &Connection, kind: ReferenceKind, token: &str) -> Result<Option<Reference>> {
    let found = match kind {
        ReferenceKind::Category => conn
            .query_row(
                "SELECT id, name, code, category_type FROM categories WHERE id = ?1 OR code = ?1 \
                 ORDER BY id = ?1 DESC LIMIT 1",
                [token],
                category_from_row,
            )
            .optional()?,
        ReferenceKind::Indicator => conn
            .query_row(
                "SELECT id, name, code FROM indicators WHERE id = ?1 OR code = ?1 \
                 ORDER BY id = ?1 DESC LIMIT 1",
                [token],
                indicator_from_row,
            )
            .optional()?,
    };
    Ok(found)
}

// ---------------------------------------------------------------------------
// Facts
// ---------------------------------------------------------------------------

pub fn insert_fact(conn: &Connection, fact: &RawFact, import_id: Option<i64>) -> Result<()> {
    conn.execute(
        "INSERT INTO facts (company_id, year, month, amount, reference_kind, reference_id, import_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            fact.company_id,
            fact.period.year,
            fact.period.month,
            fact.amount.to_string(),
            fact.reference_kind.key(),
            fact.reference_id,
            import_id,
        ],
    )?;
    Ok(())
}

fn fact_from_row(row: &Row) -> rusqlite::Result<RawFact> {
    Ok(RawFact {
        company_id: row.get(0)?,
        period: Period {
            year: row.get(1)?,
            month: row.get(2)?,
        },
        amount: decimal_at(row, 3)?,
        reference_kind: enum_at(row, 4, ReferenceKind::parse)?,
        reference_id: row.get(5)?,
    })
}

pub fn fetch_facts(conn: &Connection, company_id: &str, period: Period, refs: &[RefKey]) -> Result<Vec<RawFact>> {
    if refs.is_empty() {
        return Ok(Vec::new());
    }
    let mut params: Vec<String> = vec![
        company_id.to_string(),
        period.year.to_string(),
        period.month.to_string(),
    ];
    let mut clauses = Vec::new();
    for kind in [ReferenceKind::Category, ReferenceKind::Indicator] {
        let ids: Vec<&RefKey> = refs.iter().filter(|r| r.kind == kind).collect();
        if ids.is_empty() {
            continue;
        }
        params.push(kind.key().to_string());
        let kind_param = params.len();
        let mut placeholders = Vec::with_capacity(ids.len());
        for r in ids {
            params.push(r.id.clone());
            placeholders.push(format!("?{}", params.len()));
        }
        clauses.push(format!(
            "(reference_kind = ?{kind_param} AND reference_id IN ({}))",
            placeholders.join(", ")
        ));
    }
    let sql = format!(
        "SELECT company_id, year, month, amount, reference_kind, reference_id FROM facts \
         WHERE company_id = ?1 AND year = ?2 AND month = ?3 AND ({}) ORDER BY id",
        clauses.join(" OR ")
    );
    let mut stmt = conn.prepare(&sql)?;
    let param_values: Vec<&dyn rusqlite::types::ToSql> = params
        .iter()
        .map(|p| p as &dyn rusqlite::types::ToSql)
        .collect();
    let rows = stmt
        .query_map(param_values.as_slice(), fact_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// DRE model
// ---------------------------------------------------------------------------

pub fn load_dre_model(conn: &Connection) -> Result<DreModel> {
    let accounts = conn
        .prepare(
            "SELECT id, name, account_type, symbol, default_order, visible FROM dre_accounts \
             ORDER BY default_order, rowid",
        )?
        .query_map([], |row| {
            Ok(DreAccount {
                id: row.get(0)?,
                name: row.get(1)?,
                account_type: enum_at(row, 2, AccountType::parse)?,
                symbol: opt_enum_at(row, 3, Symbol::parse)?,
                default_order: row.get(4)?,
                visible: row.get(5)?,
                secondary_accounts: Vec::new(),
                components: Vec::new(),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut secondaries = conn
        .prepare("SELECT id, account_id, name, position FROM dre_secondary_accounts ORDER BY position, rowid")?
        .query_map([], |row| {
            Ok(SecondaryRow {
                account_id: row.get(1)?,
                secondary: DreSecondaryAccount {
                    id: row.get(0)?,
                    name: row.get(2)?,
                    order: row.get(3)?,
                    company_ids: Vec::new(),
                    components: Vec::new(),
                },
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut company_stmt =
        conn.prepare("SELECT company_id FROM dre_secondary_companies WHERE secondary_id = ?1 ORDER BY company_id")?;
    for row in &mut secondaries {
        row.secondary.company_ids = company_stmt
            .query_map([&row.secondary.id], |r| r.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
    }

    let components = conn
        .prepare(
            "SELECT id, account_id, secondary_id, reference_kind, reference_id, weight, position, display_name \
             FROM dre_components ORDER BY position, rowid",
        )?
        .query_map([], |row| {
            Ok(ComponentRow {
                account_id: row.get(1)?,
                secondary_id: row.get(2)?,
                component: DreComponent {
                    id: row.get(0)?,
                    reference_kind: enum_at(row, 3, ReferenceKind::parse)?,
                    reference_id: row.get(4)?,
                    weight: decimal_at(row, 5)?,
                    order: row.get(6)?,
                    display_name: row.get(7)?,
                },
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    DreModel::from_rows(accounts, secondaries, components)
}

pub fn insert_account(conn: &Connection, account: &DreAccount) -> Result<()> {
    let mut model = load_dre_model(conn)?;
    model.add_account(DreAccount {
        secondary_accounts: Vec::new(),
        components: Vec::new(),
        ..account.clone()
    })?;
    conn.execute(
        "INSERT INTO dre_accounts (id, name, account_type, symbol, default_order, visible) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            account.id,
            account.name,
            account.account_type.key(),
            account.symbol.map(|s| s.key()),
            account.default_order,
            account.visible,
        ],
    )?;
    Ok(())
}

pub fn update_account(conn: &Connection, id: &str, edit: AccountEdit) -> Result<()> {
    let mut model = load_dre_model(conn)?;
    model.update_account(id, edit)?;
    let Some(account) = model.account(id) else {
        return Err(PainelError::NotFound(format!("DRE account {id}")));
    };
    conn.execute(
        "UPDATE dre_accounts SET name = ?1, account_type = ?2, symbol = ?3, default_order = ?4, visible = ?5 \
         WHERE id = ?6",
        rusqlite::params![
            account.name,
            account.account_type.key(),
            account.symbol.map(|s| s.key()),
            account.default_order,
            account.visible,
            account.id,
        ],
    )?;
    Ok(())
}

pub fn update_secondary(conn: &mut Connection, id: &str, edit: SecondaryEdit) -> Result<()> {
    let mut model = load_dre_model(conn)?;
    model.update_secondary(id, edit)?;
    let Some(secondary) = model.secondary(id) else {
        return Err(PainelError::NotFound(format!("DRE secondary account {id}")));
    };
    let tx = conn.transaction()?;
    tx.execute(
        "UPDATE dre_secondary_accounts SET name = ?1, position = ?2 WHERE id = ?3",
        rusqlite::params![secondary.name, secondary.order, secondary.id],
    )?;
    tx.execute("DELETE FROM dre_secondary_companies WHERE secondary_id = ?1", [id])?;
    for company_id in &secondary.company_ids {
        tx.execute(
            "INSERT INTO dre_secondary_companies (secondary_id, company_id) VALUES (?1, ?2)",
            rusqlite::params![id, company_id],
        )?;
    }
    tx.commit()?;
    Ok(())
}

pub fn update_component(conn: &Connection, id: &str, edit: ComponentEdit) -> Result<()> {
    let mut model = load_dre_model(conn)?;
    model.update_component(id, edit)?;
    let Some((_, component)) = model.find_component(id) else {
        return Err(PainelError::NotFound(format!("DRE component {id}")));
    };
    conn.execute(
        "UPDATE dre_components SET weight = ?1, position = ?2, display_name = ?3 WHERE id = ?4",
        rusqlite::params![
            component.weight.to_string(),
            component.order,
            component.display_name,
            component.id,
        ],
    )?;
    Ok(())
}

pub fn insert_secondary(conn: &mut Connection, account_id: &str, secondary: &DreSecondaryAccount) -> Result<()> {
    let mut model = load_dre_model(conn)?;
    model.add_secondary(account_id, DreSecondaryAccount {
        components: Vec::new(),
        ..secondary.clone()
    })?;
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO dre_secondary_accounts (id, account_id, name, position) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![secondary.id, account_id, secondary.name, secondary.order],
    )?;
    for company_id in &secondary.company_ids {
        tx.execute(
            "INSERT INTO dre_secondary_companies (secondary_id, company_id) VALUES (?1, ?2)",
            rusqlite::params![secondary.id, company_id],
        )?;
    }
    tx.commit()?;
    Ok(())
}

pub fn insert_component(conn: &Connection, parent: &ComponentParent, component: &DreComponent) -> Result<()> {
    let mut model = load_dre_model(conn)?;
    model.add_component(parent, component.clone())?;
    conn.execute(
        "INSERT INTO dre_components \
         (id, account_id, secondary_id, reference_kind, reference_id, weight, position, display_name) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            component.id,
            parent.account_id(),
            parent.secondary_id(),
            component.reference_kind.key(),
            component.reference_id,
            component.weight.to_string(),
            component.order,
            component.display_name,
        ],
    )?;
    Ok(())
}

pub fn delete_secondary(conn: &Connection, id: &str) -> Result<()> {
    let mut model = load_dre_model(conn)?;
    let removed = model.delete_secondary(id)?;
    let deleted = conn.execute("DELETE FROM dre_secondary_accounts WHERE id = ?1", [id])?;
    if deleted == 0 {
        return Err(PainelError::NotFound(format!("DRE secondary account {id}")));
    }
    log::info!(
        "deleted DRE secondary account {id} and {} component(s)",
        removed.components.len()
    );
    Ok(())
}

pub fn delete_component(conn: &Connection, id: &str) -> Result<()> {
    let mut model = load_dre_model(conn)?;
    model.delete_component(id)?;
    let deleted = conn.execute("DELETE FROM dre_components WHERE id = ?1", [id])?;
    if deleted == 0 {
        return Err(PainelError::NotFound(format!("DRE component {id}")));
    }
    Ok(())
}

/// Delete a principal account with its secondaries and components in one
/// transaction. Rolls back if anything would be left pointing at it.
pub fn delete_account_subtree(conn: &mut Connection, account_id: &str) -> Result<()> {
    let mut model = load_dre_model(conn)?;
    model.delete_account(account_id)?;
    let tx = conn.transaction()?;
    tx.execute(
        "DELETE FROM dre_components WHERE account_id = ?1 \
         OR secondary_id IN (SELECT id FROM dre_secondary_accounts WHERE account_id = ?1)",
        [account_id],
    )?;
    tx.execute(
        "DELETE FROM dre_secondary_companies WHERE secondary_id IN \
         (SELECT id FROM dre_secondary_accounts WHERE account_id = ?1)",
        [account_id],
    )?;
    tx.execute("DELETE FROM dre_secondary_accounts WHERE account_id = ?1", [account_id])?;
    let deleted = tx.execute("DELETE FROM dre_accounts WHERE id = ?1", [account_id])?;
    if deleted == 0 {
        return Err(PainelError::NotFound(format!("DRE account {account_id}")));
    }
    let orphans: i64 = tx.query_row(
        "SELECT count(*) FROM dre_components c \
         WHERE NOT EXISTS (SELECT 1 FROM dre_accounts a WHERE a.id = c.account_id) \
         OR (c.secondary_id IS NOT NULL AND NOT EXISTS \
             (SELECT 1 FROM dre_secondary_accounts s WHERE s.id = c.secondary_id))",
        [],
        |row| row.get(0),
    )?;
    if orphans > 0 {
        return Err(PainelError::Other(format!(
            "delete of DRE account {account_id} would leave {orphans} orphaned component(s)"
        )));
    }
    tx.commit()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Dashboard items
// ---------------------------------------------------------------------------

pub fn fetch_items(conn: &Connection, company_id: &str) -> Result<Vec<DashboardItem>> {
    let mut items = conn
        .prepare(
            "SELECT id, company_id, position, title, is_active, item_type, result_color, chart_type, top_limit \
             FROM dashboard_items WHERE company_id = ?1 ORDER BY position",
        )?
        .query_map([company_id], |row| {
            Ok(DashboardItem {
                id: row.get(0)?,
                company_id: row.get(1)?,
                order: row.get(2)?,
                title: row.get(3)?,
                is_active: row.get(4)?,
                item_type: enum_at(row, 5, ItemType::from_key)?,
                references: Vec::new(),
                result_color: enum_at(row, 6, ResultColor::parse)?,
                chart_type: opt_enum_at(row, 7, ChartType::parse)?,
                top_limit: row.get(8)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut ref_stmt = conn.prepare(
        "SELECT reference_id, reference_kind, name FROM dashboard_item_refs WHERE item_id = ?1 ORDER BY position",
    )?;
    for item in &mut items {
        item.references = ref_stmt
            .query_map([&item.id], |row| {
                Ok(ItemRef {
                    id: row.get(0)?,
                    kind: enum_at(row, 1, LinkKind::parse)?,
                    name: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
    }
    Ok(items)
}

/// Replace a company's whole layout in one transaction.
pub fn save_layout(conn: &mut Connection, company_id: &str, items: &[DashboardItem]) -> Result<()> {
    validate_layout(company_id, items)?;
    let tx = conn.transaction()?;
    tx.execute(
        "DELETE FROM dashboard_item_refs WHERE item_id IN (SELECT id FROM dashboard_items WHERE company_id = ?1)",
        [company_id],
    )?;
    tx.execute("DELETE FROM dashboard_items WHERE company_id = ?1", [company_id])?;
    for item in items {
        tx.execute(
            "INSERT INTO dashboard_items \
             (id, company_id, position, title, is_active, item_type, result_color, chart_type, top_limit) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            rusqlite::params![
                item.id,
                item.company_id,
                item.order,
                item.title,
                item.is_active,
                item.item_type.key(),
                item.result_color.hex(),
                item.chart_type.map(|c| c.key()),
                item.top_limit,
            ],
        )?;
        for (pos, r) in item.references.iter().enumerate() {
            tx.execute(
                "INSERT INTO dashboard_item_refs (item_id, position, reference_kind, reference_id, name) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![item.id, pos as i64, r.kind.key(), r.id, r.name],
            )?;
        }
    }
    tx.commit()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Store implementation
// ---------------------------------------------------------------------------

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = get_connection(db_path)?;
        init_db(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

impl FactStore for SqliteStore {
    fn fetch_facts(&self, company_id: &str, period: Period, refs: &[RefKey]) -> Result<Vec<RawFact>> {
        fetch_facts(&self.conn, company_id, period, refs)
    }
}

impl CatalogStore for SqliteStore {
    fn fetch_reference(&self, id: &str, kind: ReferenceKind) -> Result<Option<Reference>> {
        let found = match kind {
            ReferenceKind::Category => self
                .conn
                .query_row(
                    "SELECT id, name, code, category_type FROM categories WHERE id = ?1",
                    [id],
                    category_from_row,
                )
                .optional()?,
            ReferenceKind::Indicator => self
                .conn
                .query_row("SELECT id, name, code FROM indicators WHERE id = ?1", [id], indicator_from_row)
                .optional()?,
        };
        Ok(found)
    }

    fn fetch_config_model(&self, company_id: &str) -> Result<Vec<DreAccount>> {
        Ok(load_dre_model(&self.conn)?.for_company(company_id).into_forest())
    }

    fn delete_account_subtree(&mut self, account_id: &str) -> Result<()> {
        delete_account_subtree(&mut self.conn, account_id)
    }
}

impl DashboardStore for SqliteStore {
    fn fetch_items(&self, company_id: &str) -> Result<Vec<DashboardItem>> {
        fetch_items(&self.conn, company_id)
    }

    fn save_layout(&mut self, company_id: &str, items: &[DashboardItem]) -> Result<()> {
        save_layout(&mut self.conn, company_id, items)
    }
}
