use std::path::PathBuf;

use crate::db::SqliteStore;
use crate::error::Result;
use crate::settings::{load_settings, save_settings, settings_file_exists, shellexpand_path, DB_FILE};

pub fn run(data_dir: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    let data_dir = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let db_path = data_dir.join(DB_FILE);
    SqliteStore::open(&db_path)?;
    let existed = settings_file_exists();
    save_settings(&settings)?;

    log::info!("database ready at {}", db_path.display());
    if existed {
        println!("Updated settings. Data directory: {}", data_dir.display());
    } else {
        println!("Initialized painel in {}", data_dir.display());
    }
    println!("Next: add a company with `painel company add <id> <name>`.");
    Ok(())
}
