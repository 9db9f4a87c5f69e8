use std::path::Path;
use std::str::FromStr;

use rusqlite::Connection;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::db;
use crate::error::{PainelError, Result};
use crate::models::{RawFact, ReferenceKind};
use crate::period::Period;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Dots used only as thousands separators: `1.234`, `1.234.567`.
fn is_dot_grouped(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    let mut groups = digits.split('.');
    let first = groups.next().unwrap_or_default();
    let rest: Vec<&str> = groups.collect();
    let all_digits = |g: &str| g.chars().all(|c| c.is_ascii_digit());
    !rest.is_empty()
        && (1..=3).contains(&first.len())
        && !first.starts_with('0')
        && all_digits(first)
        && rest.iter().all(|g| g.len() == 3 && all_digits(g))
}

/// Parse an amount in either Brazilian (`1.234,56`, `1.234`) or plain
/// (`1234.56`) notation. A dot followed by exactly three digits with no comma
/// is a thousands separator. Accepts a leading `R$` and accounting parentheses
/// for negatives.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let s = raw.trim().replace("R$", "").replace(['"', ' '], "");
    let (negative, s) = match s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        Some(inner) => (true, inner.to_string()),
        None => (false, s),
    };
    let normalized = if s.contains(',') {
        s.replace('.', "").replace(',', ".")
    } else if is_dot_grouped(&s) {
        s.replace('.', "")
    } else {
        s
    };
    let value = Decimal::from_str(&normalized).ok()?;
    Some(if negative { -value } else { value })
}

fn parse_period(record: &csv::StringRecord, cols: &Columns) -> Option<Period> {
    if let Some(idx) = cols.date {
        let date = chrono::NaiveDate::parse_from_str(record.get(idx)?.trim(), "%Y-%m-%d").ok()?;
        return Some(Period::from_date(date));
    }
    let year: i32 = record.get(cols.year?)?.trim().parse().ok()?;
    let month: u32 = record.get(cols.month?)?.trim().parse().ok()?;
    Period::new(year, month).ok()
}

fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

struct Columns {
    date: Option<usize>,
    year: Option<usize>,
    month: Option<usize>,
    kind: usize,
    reference: usize,
    amount: usize,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let missing = |name: &str| PainelError::Other(format!("CSV is missing the '{name}' column"));
        let cols = Self {
            date: find("date"),
            year: find("year"),
            month: find("month"),
            kind: find("kind").ok_or_else(|| missing("kind"))?,
            reference: find("reference").ok_or_else(|| missing("reference"))?,
            amount: find("amount").ok_or_else(|| missing("amount"))?,
        };
        if cols.date.is_none() && (cols.year.is_none() || cols.month.is_none()) {
            return Err(missing("date (or year and month)"));
        }
        Ok(cols)
    }
}

// ---------------------------------------------------------------------------
// import_facts
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub duplicate_file: bool,
}

/// Load monthly facts for one company from a CSV file. The same file is only
/// accepted once per company; rows that cannot be parsed or whose reference is
/// unknown are skipped.
pub fn import_facts(conn: &mut Connection, file_path: &Path, company_id: &str) -> Result<ImportResult> {
    if !db::company_exists(conn, company_id)? {
        return Err(PainelError::NotFound(format!("company {company_id}")));
    }

    let checksum = compute_checksum(file_path)?;
    {
        let mut stmt = conn.prepare("SELECT 1 FROM imports WHERE checksum = ?1 AND company_id = ?2")?;
        if stmt.exists(rusqlite::params![checksum, company_id])? {
            log::info!("{} already imported for {company_id}", file_path.display());
            return Ok(ImportResult {
                imported: 0,
                skipped: 0,
                duplicate_file: true,
            });
        }
    }

    let file = std::fs::File::open(file_path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(std::io::BufReader::new(file));
    let cols = Columns::from_headers(rdr.headers()?)?;

    let mut facts = Vec::new();
    let mut skipped = 0usize;
    for (line, result) in rdr.records().enumerate() {
        let record = result?;
        match parse_record(conn, &record, &cols, company_id) {
            Ok(fact) => facts.push(fact),
            Err(reason) => {
                log::warn!("row {}: {reason}", line + 2);
                skipped += 1;
            }
        }
    }

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO imports (filename, company_id, record_count, checksum) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            file_path.file_name().and_then(|n| n.to_str()).unwrap_or(""),
            company_id,
            facts.len() as i64,
            checksum,
        ],
    )?;
    let import_id = tx.last_insert_rowid();
    for fact in &facts {
        db::insert_fact(&tx, fact, Some(import_id))?;
    }
    tx.commit()?;

    Ok(ImportResult {
        imported: facts.len(),
        skipped,
        duplicate_file: false,
    })
}

fn parse_record(
    conn: &Connection,
    record: &csv::StringRecord,
    cols: &Columns,
    company_id: &str,
) -> std::result::Result<RawFact, String> {
    let period = parse_period(record, cols).ok_or("invalid period")?;
    let raw_kind = record.get(cols.kind).unwrap_or_default();
    let kind = ReferenceKind::parse(raw_kind).ok_or_else(|| format!("unknown kind '{raw_kind}'"))?;
    let token = record.get(cols.reference).unwrap_or_default();
    let raw_amount = record.get(cols.amount).unwrap_or_default();
    let amount = parse_amount(raw_amount).ok_or_else(|| format!("invalid amount '{raw_amount}'"))?;
    let reference = db::find_reference(conn, kind, token)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("unknown {} '{token}'", kind.key()))?;
    Ok(RawFact {
        company_id: company_id.to_string(),
        period,
        amount,
        reference_id: reference.id,
        reference_kind: kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CategoryType;
    use crate::store::{FactStore, RefKey};

    #[test]
    fn test_parse_amount_formats() {
        assert_eq!(parse_amount("1.234,56"), Some(Decimal::new(123456, 2)));
        assert_eq!(parse_amount("1234.56"), Some(Decimal::new(123456, 2)));
        assert_eq!(parse_amount("R$ 10,00"), Some(Decimal::new(1000, 2)));
        assert_eq!(parse_amount("(500,00)"), Some(Decimal::new(-50000, 2)));
        assert_eq!(parse_amount("-7"), Some(Decimal::from(-7)));
        assert_eq!(parse_amount("abc"), None);
    }

    #[test]
    fn test_parse_amount_dot_thousands() {
        assert_eq!(parse_amount("1.234"), Some(Decimal::from(1234)));
        assert_eq!(parse_amount("1.234.567"), Some(Decimal::from(1_234_567)));
        assert_eq!(parse_amount("-12.500"), Some(Decimal::from(-12_500)));
        assert_eq!(parse_amount("R$ 2.000"), Some(Decimal::from(2000)));
        // Not three-digit groups: plain decimals
        assert_eq!(parse_amount("0.125"), Some(Decimal::new(125, 3)));
        assert_eq!(parse_amount("12.34"), Some(Decimal::new(1234, 2)));
        assert_eq!(parse_amount("1234.567"), Some(Decimal::new(1234567, 3)));
        assert_eq!(parse_amount("1.23.456"), None);
    }

    fn setup() -> (tempfile::TempDir, db::SqliteStore, String, String) {
        let dir = tempfile::tempdir().unwrap();
        let store = db::SqliteStore::open(&dir.path().join("test.db")).unwrap();
        db::add_company(store.conn(), "acme", "Acme").unwrap();
        let cat = db::add_category(store.conn(), "Vendas", Some("3.01"), CategoryType::Revenue).unwrap();
        let ind = db::add_indicator(store.conn(), "Clientes", Some("IND1")).unwrap();
        (dir, store, cat, ind)
    }

    #[test]
    fn test_import_and_duplicate_file() {
        let (dir, mut store, cat, ind) = setup();
        let csv_path = dir.path().join("facts.csv");
        std::fs::write(
            &csv_path,
            "date,kind,reference,amount\n\
             2024-03-05,categoria,3.01,\"1.000,50\"\n\
             2024-03-20,categoria,3.01,499.50\n\
             2024-03-01,indicador,IND1,12\n\
             2024-03-01,indicador,NOPE,1\n\
             not-a-date,categoria,3.01,1\n",
        )
        .unwrap();

        let result = import_facts(store.conn_mut(), &csv_path, "acme").unwrap();
        assert_eq!(result.imported, 3);
        assert_eq!(result.skipped, 2);
        assert!(!result.duplicate_file);

        let march = Period::new(2024, 3).unwrap();
        let facts = store
            .fetch_facts(
                "acme",
                march,
                &[RefKey::new(ReferenceKind::Category, &cat), RefKey::new(ReferenceKind::Indicator, &ind)],
            )
            .unwrap();
        let total: Decimal = facts
            .iter()
            .filter(|f| f.reference_kind == ReferenceKind::Category)
            .map(|f| f.amount)
            .sum();
        assert_eq!(total, Decimal::from(1500));

        let again = import_facts(store.conn_mut(), &csv_path, "acme").unwrap();
        assert!(again.duplicate_file);
        assert_eq!(again.imported, 0);
    }

    #[test]
    fn test_import_with_year_month_columns() {
        let (dir, mut store, cat, _) = setup();
        let csv_path = dir.path().join("facts.csv");
        std::fs::write(&csv_path, "year,month,kind,reference,amount\n2023,12,categoria,3.01,10\n").unwrap();
        let result = import_facts(store.conn_mut(), &csv_path, "acme").unwrap();
        assert_eq!(result.imported, 1);
        let facts = store
            .fetch_facts("acme", Period::new(2023, 12).unwrap(), &[RefKey::new(ReferenceKind::Category, &cat)])
            .unwrap();
        assert_eq!(facts.len(), 1);
    }

    #[test]
    fn test_import_requires_columns_and_company() {
        let (dir, mut store, _, _) = setup();
        let csv_path = dir.path().join("bad.csv");
        std::fs::write(&csv_path, "date,amount\n2024-01-01,1\n").unwrap();
        assert!(import_facts(store.conn_mut(), &csv_path, "acme").is_err());
        assert!(matches!(
            import_facts(store.conn_mut(), &csv_path, "ghost"),
            Err(PainelError::NotFound(_))
        ));
    }
}
