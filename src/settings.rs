use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{PainelError, Result};
use crate::models::CompanyScope;

pub const DB_FILE: &str = "painel.db";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    /// Company used when a command is run without `--company`.
    #[serde(default)]
    pub default_company: Option<String>,
    /// When set, dashboards and reports are limited to this company.
    #[serde(default)]
    pub allowed_company: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            default_company: None,
            allowed_company: None,
            log_level: default_log_level(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("painel")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("painel")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| PainelError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn settings_file_exists() -> bool {
    settings_path().exists()
}

pub fn get_data_dir() -> PathBuf {
    PathBuf::from(&load_settings().data_dir)
}

pub fn get_db_path() -> PathBuf {
    get_data_dir().join(DB_FILE)
}

/// Pick the company for a command: explicit flag first, then the configured default.
pub fn resolve_company(explicit: Option<&str>) -> Result<String> {
    if let Some(id) = explicit {
        return Ok(id.to_string());
    }
    load_settings().default_company.ok_or_else(|| {
        PainelError::Settings(
            "No company given. Pass --company or set one with `painel company use <id>`.".into(),
        )
    })
}

/// `resolve_company`, then refuse a company outside the allowed scope.
pub fn resolve_scoped_company(explicit: Option<&str>) -> Result<String> {
    let company_id = resolve_company(explicit)?;
    load_settings().company_scope().check(&company_id)?;
    Ok(company_id)
}

impl Settings {
    pub fn company_scope(&self) -> CompanyScope {
        match &self.allowed_company {
            Some(id) => CompanyScope::Single(id.clone()),
            None => CompanyScope::All,
        }
    }
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_json_roundtrip() {
        let settings = Settings {
            data_dir: "/tmp/painel".to_string(),
            default_company: Some("acme".to_string()),
            allowed_company: None,
            log_level: "debug".to_string(),
        };
        let json = serde_json::to_string_pretty(&settings).unwrap();
        let loaded: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.data_dir, "/tmp/painel");
        assert_eq!(loaded.default_company.as_deref(), Some("acme"));
        assert_eq!(loaded.log_level, "debug");
    }

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert!(s.default_company.is_none());
        assert_eq!(s.log_level, "warn");
        assert!(s.data_dir.ends_with("painel"));
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let s: Settings = serde_json::from_str(r#"{"data_dir": "/tmp/x"}"#).unwrap();
        assert_eq!(s.log_level, "warn");
        assert!(s.default_company.is_none());
    }

    #[test]
    fn test_company_scope_from_settings() {
        let mut s = Settings::default();
        assert_eq!(s.company_scope(), CompanyScope::All);
        s.allowed_company = Some("acme".into());
        assert!(s.company_scope().check("acme").is_ok());
        assert!(s.company_scope().check("beta").is_err());
    }

    #[test]
    fn test_shellexpand_tilde() {
        let expanded = shellexpand_path("~/painel");
        assert!(!expanded.starts_with('~'));
        assert!(expanded.ends_with("painel"));
    }
}
