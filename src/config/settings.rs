//! Process settings loading from config.toml
//!
//! The settings file seeds the member directory on first run and may carry initial
//! salary configuration. Salary entries are not trusted as-is: they are pushed through
//! the same validated `save_config` path as runtime edits.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    /// Optional database URL; `DATABASE_URL` takes precedence
    pub database_url: Option<String>,
    /// Members to seed into the directory when it is empty
    #[serde(default)]
    pub members: Vec<MemberSeed>,
    /// Initial salary configuration, keyed like the `salary_config` table
    #[serde(default)]
    pub salary: HashMap<String, toml::Value>,
}

/// A member to insert on first start
#[derive(Debug, Deserialize, Clone)]
pub struct MemberSeed {
    /// Display name
    pub username: String,
    /// Role name, e.g. `"LEADER"` or `"INTERN"`
    pub role: String,
}

impl Settings {
    /// Salary entries rendered as the opaque strings the config store keeps.
    ///
    /// Integers and booleans are stringified; arrays and tables (such as a check-in tier
    /// list written inline) are rendered as JSON.
    pub fn salary_entries(&self) -> Result<BTreeMap<String, String>> {
        self.salary
            .iter()
            .map(|(key, value)| {
                let rendered = match value {
                    toml::Value::String(s) => s.clone(),
                    toml::Value::Integer(i) => i.to_string(),
                    toml::Value::Boolean(b) => b.to_string(),
                    toml::Value::Float(f) => f.to_string(),
                    other => serde_json::to_string(other)?,
                };
                Ok((key.clone(), rendered))
            })
            .collect()
    }
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads settings from the default location (./config.toml), or defaults if the file
/// does not exist.
pub fn load_default_settings() -> Result<Settings> {
    let path = Path::new("config.toml");
    if path.exists() {
        load_settings(path)
    } else {
        Ok(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_settings() {
        let toml_str = r#"
            database_url = "sqlite::memory:"

            [[members]]
            username = "alice"
            role = "LEADER"

            [[members]]
            username = "bob"
            role = "INTERN"

            [salary]
            salary_pool_total = 3000
            mini_coins_min = "150"
        "#;

        let settings: Settings = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.database_url.as_deref(), Some("sqlite::memory:"));
        assert_eq!(settings.members.len(), 2);
        assert_eq!(settings.members[1].role, "INTERN");

        let entries = settings.salary_entries().unwrap();
        assert_eq!(entries.get("salary_pool_total").unwrap(), "3000");
        assert_eq!(entries.get("mini_coins_min").unwrap(), "150");
    }

    #[test]
    fn test_empty_settings_are_valid() {
        let settings: Settings = toml::from_str("").unwrap();
        assert!(settings.members.is_empty());
        assert!(settings.salary_entries().unwrap().is_empty());
    }

    #[test]
    fn test_inline_tier_table_rendered_as_json() {
        let toml_str = r#"
            [salary]
            checkin_tiers = [{ minCount = 0, maxCount = 999, points = 0, label = "flat" }]
        "#;
        let settings: Settings = toml::from_str(toml_str).unwrap();
        let entries = settings.salary_entries().unwrap();
        let json = entries.get("checkin_tiers").unwrap();
        assert!(json.contains("\"minCount\":0"));
    }
}
