use crate::db::get_connection;
use crate::error::Result;
use crate::settings::{load_settings, DB_FILE};

pub fn run() -> Result<()> {
    let settings = load_settings();
    let data_dir = std::path::PathBuf::from(&settings.data_dir);
    let db_path = data_dir.join(DB_FILE);

    println!("Data dir:   {}", data_dir.display());
    println!("Database:   {}", db_path.display());
    println!("Company:    {}", settings.default_company.as_deref().unwrap_or("(not set)"));
    if let Some(allowed) = &settings.allowed_company {
        println!("Access:     {allowed} only");
    }
    println!("Log level:  {}", settings.log_level);

    if !db_path.exists() {
        println!();
        println!("Database not found. Run `painel init` to set up.");
        return Ok(());
    }

    let conn = get_connection(&db_path)?;
    let count = |table: &str| -> Result<i64> {
        Ok(conn.query_row(&format!("SELECT count(*) FROM {table}"), [], |r| r.get(0))?)
    };

    println!();
    println!("Companies:        {}", count("companies")?);
    println!("Categories:       {}", count("categories")?);
    println!("Indicators:       {}", count("indicators")?);
    println!("Facts:            {}", count("facts")?);
    println!("DRE accounts:     {}", count("dre_accounts")?);
    println!("Dashboard items:  {}", count("dashboard_items")?);
    Ok(())
}
