use std::path::Path;

use crate::cli::open_store;
use crate::error::Result;
use crate::importer::import_facts;
use crate::settings::resolve_scoped_company;

pub fn run(file: &str, company: Option<&str>) -> Result<()> {
    let company_id = resolve_scoped_company(company)?;
    let mut store = open_store()?;
    let result = import_facts(store.conn_mut(), Path::new(file), &company_id)?;

    if result.duplicate_file {
        println!("This file has already been imported for {company_id}.");
        return Ok(());
    }
    println!("Imported {} fact(s) for {company_id}.", result.imported);
    if result.skipped > 0 {
        println!("Skipped {} row(s) that could not be read.", result.skipped);
    }
    Ok(())
}
