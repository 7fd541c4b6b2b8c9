//! Multi-source config loading: YAML file, then environment, then CLI.

use std::path::Path;

use crate::error::{GraphError, Result};

use super::schema::{AppConfig, JournalMode};

pub const ENV_DB_PATH: &str = "ENTGRAPH_DB_PATH";
pub const ENV_JOURNAL_MODE: &str = "ENTGRAPH_JOURNAL_MODE";
pub const ENV_LOG: &str = "ENTGRAPH_LOG";

/// Values given on the command line. `None` leaves the lower layer alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub db_path: Option<String>,
    pub log_filter: Option<String>,
}

/// Read and parse a YAML config file.
pub fn load_file(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Err(GraphError::Config(format!(
            "No config file found at {}",
            path.display()
        )));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_yaml::from_str(&contents).map_err(|e| {
        GraphError::Config(format!("Failed to parse {}: {e}", path.display()))
    })
}

/// Apply environment overrides, reading variables through `lookup`.
pub fn apply_env(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
    if let Some(path) = lookup(ENV_DB_PATH).filter(|p| !p.trim().is_empty()) {
        config.database.path = path;
    }
    if let Some(mode) = lookup(ENV_JOURNAL_MODE) {
        config.database.journal_mode = JournalMode::from_str_loose(&mode).ok_or_else(|| {
            GraphError::Config(format!("{ENV_JOURNAL_MODE}: unknown journal mode '{mode}'"))
        })?;
    }
    if let Some(filter) = lookup(ENV_LOG).filter(|f| !f.trim().is_empty()) {
        config.logging.filter = filter;
    }
    Ok(())
}

pub fn apply_overrides(config: &mut AppConfig, overrides: &ConfigOverrides) {
    if let Some(path) = &overrides.db_path {
        config.database.path = path.clone();
    }
    if let Some(filter) = &overrides.log_filter {
        config.logging.filter = filter.clone();
    }
}

/// Build the effective config: defaults, then `file` (if given), then the
/// process environment, then `overrides`.
pub fn load(file: Option<&Path>, overrides: &ConfigOverrides) -> Result<AppConfig> {
    let mut config = match file {
        Some(path) => load_file(path)?,
        None => AppConfig::default(),
    };
    apply_env(&mut config, |key| std::env::var(key).ok())?;
    apply_overrides(&mut config, overrides);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn load_file_parses_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("entgraph.yaml");
        std::fs::write(
            &path,
            "database:\n  path: graph.db\n  busy_timeout_ms: 100\nlogging:\n  filter: debug\n",
        )
        .unwrap();

        let config = load_file(&path).unwrap();
        assert_eq!(config.database.path, "graph.db");
        assert_eq!(config.database.busy_timeout_ms, 100);
        assert_eq!(config.logging.filter, "debug");
    }

    #[test]
    fn load_file_missing_is_config_error() {
        let dir = TempDir::new().unwrap();
        let err = load_file(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, GraphError::Config(_)));
    }

    #[test]
    fn load_file_invalid_yaml_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "database: [not, a, map]").unwrap();
        let err = load_file(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = AppConfig::default();
        apply_env(
            &mut config,
            env(&[
                (ENV_DB_PATH, "/var/lib/graph.db"),
                (ENV_JOURNAL_MODE, "Truncate"),
                (ENV_LOG, "entgraph=debug"),
            ]),
        )
        .unwrap();
        assert_eq!(config.database.path, "/var/lib/graph.db");
        assert_eq!(config.database.journal_mode, JournalMode::Truncate);
        assert_eq!(config.logging.filter, "entgraph=debug");
    }

    #[test]
    fn env_blank_values_are_ignored() {
        let mut config = AppConfig::default();
        apply_env(&mut config, env(&[(ENV_DB_PATH, "  "), (ENV_LOG, "")])).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn env_bad_journal_mode_is_rejected() {
        let mut config = AppConfig::default();
        let err = apply_env(&mut config, env(&[(ENV_JOURNAL_MODE, "sideways")])).unwrap_err();
        assert!(err.to_string().contains("sideways"));
    }

    #[test]
    fn cli_overrides_win() {
        let mut config = AppConfig::default();
        apply_env(&mut config, env(&[(ENV_DB_PATH, "env.db")])).unwrap();
        apply_overrides(
            &mut config,
            &ConfigOverrides {
                db_path: Some("cli.db".into()),
                log_filter: None,
            },
        );
        assert_eq!(config.database.path, "cli.db");
        assert_eq!(config.logging.filter, "entgraph=info");
    }
}
