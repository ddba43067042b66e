use anyhow::{Context, Result};
use funnel_core::FunnelConfig;
use std::path::{Path, PathBuf};
use toml::Table;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (defaults, then user, then project)
    pub fn load() -> Result<FunnelConfig> {
        let mut merged = Table::new();

        // Layer 1: User config
        if let Some(user) = Self::read_layer(&Self::user_config_path())? {
            Self::merge_into(&mut merged, user);
        }

        // Layer 2: Project config
        if let Some(project) = Self::read_layer(&Self::project_config_path())? {
            Self::merge_into(&mut merged, project);
        }

        // Fields no layer set fall back to the serde defaults
        let config = FunnelConfig::from_toml_str(&toml::to_string(&merged)?)
            .context("invalid funnel configuration")?;
        Ok(config)
    }

    /// Get user config path
    pub fn user_config_path() -> PathBuf {
        funnel_paths::config_dir().join("config.toml")
    }

    /// Get project config path
    /// Can be overridden with FUNNEL_PROJECT_CONFIG_DIR env var (useful for isolated tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("FUNNEL_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".funnel/config.toml")
        }
    }

    fn read_layer(path: &Path) -> Result<Option<Table>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let table = contents
            .parse::<Table>()
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(Some(table))
    }

    /// Merge two layers (overlay keys override base; nested tables merge per key)
    fn merge_into(base: &mut Table, overlay: Table) {
        for (key, value) in overlay {
            match (base.get_mut(&key), value) {
                (Some(toml::Value::Table(existing)), toml::Value::Table(nested)) => {
                    Self::merge_into(existing, nested);
                }
                (_, value) => {
                    base.insert(key, value);
                }
            }
        }
    }

    /// Load config from a single file (for testing)
    #[cfg(test)]
    pub fn load_from_path(path: &Path) -> Result<FunnelConfig> {
        match Self::read_layer(path)? {
            Some(table) => Ok(FunnelConfig::from_toml_str(&toml::to_string(&table)?)?),
            None => Ok(FunnelConfig::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use funnel_core::{FlushMode, FunnelStep};
    use serial_test::serial;
    use tempfile::TempDir;

    fn table(s: &str) -> Table {
        s.parse().unwrap()
    }

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nonexistent.toml");

        let config = ConfigLoader::load_from_path(&path).unwrap();

        assert_eq!(config, FunnelConfig::default());
    }

    #[test]
    fn test_load_invalid_toml_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("invalid.toml");
        std::fs::write(&path, "this is not valid toml {{{{").unwrap();

        assert!(ConfigLoader::load_from_path(&path).is_err());
    }

    #[test]
    fn test_merge_overlay_overrides_base_per_field() {
        let mut base = table(
            r#"
            [tracking]
            flush_mode = "concurrent"
            session_prefix = "user"
            "#,
        );
        let overlay = table(
            r#"
            [tracking]
            session_prefix = "project"

            [navigation]
            bypass_destination = "/summary"
            "#,
        );

        ConfigLoader::merge_into(&mut base, overlay);
        let config = FunnelConfig::from_toml_str(&toml::to_string(&base).unwrap()).unwrap();

        // Overlay wins where set, base survives where it is not
        assert_eq!(config.tracking.session_prefix, "project");
        assert_eq!(config.tracking.flush_mode, FlushMode::Concurrent);
        assert_eq!(config.navigation.bypass_destination, FunnelStep::Summary);
    }

    #[test]
    fn test_user_config_path() {
        let path = ConfigLoader::user_config_path();
        assert!(path.ends_with("funnel/config.toml"));
    }

    #[test]
    #[serial]
    fn test_project_config_path_default() {
        // SAFETY: tests touching the environment are serialized
        unsafe { std::env::remove_var("FUNNEL_PROJECT_CONFIG_DIR") };
        assert_eq!(
            ConfigLoader::project_config_path(),
            PathBuf::from(".funnel/config.toml")
        );
    }

    #[test]
    #[serial]
    fn test_load_reads_project_override_dir() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("config.toml"),
            "[tracking]\nsession_prefix = \"from-project\"\n",
        )
        .unwrap();

        // SAFETY: tests touching the environment are serialized
        unsafe { std::env::set_var("FUNNEL_PROJECT_CONFIG_DIR", temp_dir.path()) };
        let config = ConfigLoader::load();
        unsafe { std::env::remove_var("FUNNEL_PROJECT_CONFIG_DIR") };

        assert_eq!(config.unwrap().tracking.session_prefix, "from-project");
    }
}
