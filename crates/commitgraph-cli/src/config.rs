use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use commitgraph_core::{GraphConfig, LayoutOptions, RenderConfig};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG_FILENAME: &str = "config.toml";
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Where commit records come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub git_binary: String,
    /// Commits fetched per page.
    pub page_size: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            git_binary: "git".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub layout: LayoutOptions,
    pub render: RenderConfig,
}

impl AppConfig {
    pub fn graph(&self) -> GraphConfig {
        GraphConfig {
            layout: self.layout,
            render: self.render.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.page_size == 0 {
            bail!("invalid configuration: source.page_size must be >= 1");
        }
        if self.source.git_binary.trim().is_empty() {
            bail!("invalid configuration: source.git_binary must not be empty");
        }
        self.graph().validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_location() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("dev", "CommitGraph", "commitgraph")
            .ok_or_else(|| anyhow!("cannot resolve project directories"))?;
        Ok(project_dirs.config_dir().join(DEFAULT_CONFIG_FILENAME))
    }

    /// `--config` when given, the platform config directory otherwise.
    pub fn resolve(explicit: Option<PathBuf>) -> Result<Self> {
        match explicit {
            Some(path) => Ok(Self::at(path)),
            None => Ok(Self::at(Self::default_location()?)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file means defaults.
    pub fn load(&self) -> Result<AppConfig> {
        if !self.path.exists() {
            return Ok(AppConfig::default());
        }
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read config {}", self.path.display()))?;
        let config: AppConfig = toml::from_str(&text)
            .with_context(|| format!("invalid config {}", self.path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config {}", self.path.display()))?;
        Ok(config)
    }

    /// Writes the default configuration. Refuses to overwrite unless `force`.
    pub fn init(&self, force: bool) -> Result<()> {
        if self.path.exists() && !force {
            bail!(
                "{} already exists (pass --force to overwrite)",
                self.path.display()
            );
        }
        self.save(&AppConfig::default())
    }

    pub fn save(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let text = toml::to_string_pretty(config).context("failed to serialize config")?;
        fs::write(&self.path, text)
            .with_context(|| format!("failed to write config {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use commitgraph_core::Rgb;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigStore, DEFAULT_PAGE_SIZE};

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = TempDir::new().expect("tempdir");
        let store = ConfigStore::at(tmp.path().join("nope.toml"));
        let config = store.load().expect("defaults");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.source.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn roundtrip_config_file() {
        let tmp = TempDir::new().expect("tempdir");
        let store = ConfigStore::at(tmp.path().join("nested").join("config.toml"));

        let mut config = AppConfig::default();
        config.source.page_size = 200;
        config.render.row_height = 1.0;
        config.render.background = Rgb::new(0, 0, 0);
        store.save(&config).expect("save config");

        let loaded = store.load().expect("load config");
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("config.toml");
        fs::write(
            &path,
            "[source]\npage_size = 10\n\n[render]\npalette = [\"#ff0000\", \"#00ff00\"]\n",
        )
        .expect("write config");

        let config = ConfigStore::at(path).load().expect("load");
        assert_eq!(config.source.page_size, 10);
        assert_eq!(config.source.git_binary, "git");
        assert_eq!(config.render.palette.len(), 2);
        assert_eq!(config.layout.palette_size, 8);
    }

    #[test]
    fn rejects_invalid_values() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[source]\npage_size = 0\n").expect("write config");
        let err = ConfigStore::at(path).load().expect_err("must fail");
        assert!(format!("{err:#}").contains("page_size"));
    }

    #[test]
    fn init_does_not_clobber() {
        let tmp = TempDir::new().expect("tempdir");
        let store = ConfigStore::at(tmp.path().join("config.toml"));
        store.init(false).expect("first init");
        assert!(store.init(false).is_err());
        store.init(true).expect("forced init");
    }
}
