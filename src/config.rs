use std::{env, fs, io, path::Path, path::PathBuf};

use anyhow::Context;
use serde::Deserialize;

pub const CONFIG_ENV: &str = "ORCAMENTO_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "orcamento.toml";

/// Runtime settings. Read from a toml file, then overridden by
/// `DATABASE_URL` and `LISTEN_ADDR` when those are set.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_url: String,
    pub listen_addr: String,
    pub migrations_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub public_dir: PathBuf,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://orcamento.db".to_string(),
            listen_addr: "0.0.0.0:5000".to_string(),
            migrations_dir: PathBuf::from("./migrations"),
            templates_dir: PathBuf::from("./src/front/templates"),
            public_dir: PathBuf::from("./src/front/public"),
            log_filter: "orcamento=info".to_string(),
        }
    }
}

impl Config {
    /// Loads the file named by `ORCAMENTO_CONFIG` (or `orcamento.toml`).
    /// A missing file yields the defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::from_file(Path::new(&path))?;
        config.apply_env(|key| env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)
                .with_context(|| format!("failed to parse config file {}", path.display())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => {
                Err(err).with_context(|| format!("failed to read config file {}", path.display()))
            }
        }
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(addr) = var("LISTEN_ADDR") {
            self.listen_addr = addr;
        }
    }
}
