use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_DATABASE: &str = "db.json";

#[derive(Parser, Debug, Default)]
#[command(name = "libris")]
#[command(about = "Runs the libris book service", long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<String>,

    /// Overrides the configured listening port
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Overrides the configured store file
    #[arg(long = "db")]
    pub db_path: Option<String>,

    #[arg(long = "json-logs")]
    pub json_logs: bool,
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".libris")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct App {
    #[serde(default)]
    port: Option<u16>,
    #[serde(default = "default_database")]
    database: String,
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

impl Default for App {
    fn default() -> Self {
        App {
            port: None,
            database: default_database(),
        }
    }
}

impl App {
    pub fn get_db(&self) -> &str {
        &self.database
    }

    pub fn get_port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }
}

#[derive(Debug, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub app: App,
}

impl Config {
    pub fn new(path: &str) -> Result<Self> {
        Config::from_file(path, |name| env::var(name).ok())
    }

    fn from_file(path: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let yaml_str =
            fs::read_to_string(path).with_context(|| format!("failed to read config file {}", path))?;
        Config::from_yaml(&yaml_str, lookup)
    }

    /// Picks the config source: `--config`, then the default config file, then
    /// `PORT` / `LIBRIS_DB` from the environment. A config file that leaves
    /// `app.port` unset still takes its port from `PORT`. CLI flags win over all of them.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        Config::resolve_with(cli, default_config_path(), |name| env::var(name).ok())
    }

    fn resolve_with(
        cli: &Cli,
        default_path: PathBuf,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut cfg = match &cli.config_path {
            Some(path) => Config::from_file(path, &lookup)?,
            None if default_path.is_file() => {
                tracing::info!("loading config from {:?}", default_path);
                Config::from_file(&default_path.to_string_lossy(), &lookup)?
            }
            None => Config::from_env(&lookup)?,
        };

        if cfg.app.port.is_none() {
            cfg.app.port = env_port(&lookup)?;
        }
        if let Some(port) = cli.port {
            cfg.app.port = Some(port);
        }
        if let Some(db) = &cli.db_path {
            cfg.app.database = db.clone();
        }
        Ok(cfg)
    }

    pub fn from_env(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = env_port(&lookup)?;
        let database = lookup("LIBRIS_DB")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(default_database);

        Ok(Config {
            app: App { port, database },
        })
    }

    fn from_yaml(yaml_str: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let yaml_with_env = substitute_env_vars(yaml_str, lookup);
        let config: Config = serde_yaml::from_str(&yaml_with_env)?;
        Ok(config)
    }
}

fn env_port(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<u16>> {
    match lookup("PORT").filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse::<u16>()
            .map(Some)
            .with_context(|| format!("invalid PORT value {:?}", raw)),
        None => Ok(None),
    }
}

/// Expands `${VAR}` and `${VAR:-default}`. Unknown variables without a default become empty.
fn substitute_env_vars(yaml_str: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = yaml_str.to_string();
    let mut offset = 0;

    while let Some(start) = result[offset..].find("${") {
        let actual_start = offset + start;
        let Some(end) = result[actual_start..].find('}') else {
            break;
        };
        let expr = &result[actual_start + 2..actual_start + end];

        let value = match expr.split_once(":-") {
            Some((name, default_val)) => lookup(name).unwrap_or_else(|| default_val.to_string()),
            None => lookup(expr).unwrap_or_else(|| {
                tracing::warn!("environment variable '{}' not found", expr);
                String::new()
            }),
        };

        result.replace_range(actual_start..actual_start + end + 1, &value);
        offset = actual_start + value.len();
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_substitute_env_vars() {
        let lookup = vars(&[("PORT", "8080")]);
        assert_eq!(substitute_env_vars("port: ${PORT}", &lookup), "port: 8080");
        assert_eq!(
            substitute_env_vars("db: ${LIBRIS_DB:-books.json}", &lookup),
            "db: books.json"
        );
        assert_eq!(substitute_env_vars("x: ${MISSING}", &lookup), "x: ");
        assert_eq!(substitute_env_vars("x: ${UNCLOSED", &lookup), "x: ${UNCLOSED");
    }

    #[test]
    fn test_from_env_defaults() {
        let cfg = Config::from_env(vars(&[])).unwrap();
        assert_eq!(cfg.app.get_port(), 4000);
        assert_eq!(cfg.app.get_db(), "db.json");
    }

    #[test]
    fn test_from_env_reads_port() {
        let cfg = Config::from_env(vars(&[("PORT", "5050"), ("LIBRIS_DB", "/tmp/b.json")])).unwrap();
        assert_eq!(cfg.app.get_port(), 5050);
        assert_eq!(cfg.app.get_db(), "/tmp/b.json");
    }

    #[test]
    fn test_from_env_rejects_bad_port() {
        assert!(Config::from_env(vars(&[("PORT", "http")])).is_err());
    }

    #[test]
    fn test_from_yaml() {
        let yaml = "app:\n  port: ${PORT:-4000}\n  database: ${LIBRIS_DB:-db.json}\n";
        let cfg = Config::from_yaml(yaml, vars(&[("PORT", "9000")])).unwrap();
        assert_eq!(cfg.app.get_port(), 9000);
        assert_eq!(cfg.app.get_db(), "db.json");
    }

    #[test]
    fn test_from_yaml_fills_defaults() {
        let cfg = Config::from_yaml("app: {}\n", vars(&[])).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn test_cli_overrides_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "app:\n  port: 7000\n  database: file.json\n").unwrap();

        let cli = Cli {
            config_path: Some(path.to_string_lossy().into_owned()),
            port: Some(7100),
            ..Default::default()
        };
        let cfg = Config::resolve(&cli).unwrap();
        assert_eq!(cfg.app.get_port(), 7100);
        assert_eq!(cfg.app.get_db(), "file.json");
    }

    #[test]
    fn test_config_file_without_port_uses_env_port() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "app:\n  database: file.json\n").unwrap();

        let cli = Cli::default();
        let cfg = Config::resolve_with(&cli, path.clone(), vars(&[("PORT", "5151")])).unwrap();
        assert_eq!(cfg.app.get_port(), 5151);
        assert_eq!(cfg.app.get_db(), "file.json");

        let cfg = Config::resolve_with(&cli, path, vars(&[])).unwrap();
        assert_eq!(cfg.app.get_port(), DEFAULT_PORT);
    }

    #[test]
    fn test_config_file_port_wins_over_env_port() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "app:\n  port: 7000\n").unwrap();

        let cli = Cli::default();
        let cfg = Config::resolve_with(&cli, path, vars(&[("PORT", "5151")])).unwrap();
        assert_eq!(cfg.app.get_port(), 7000);
    }

    #[test]
    fn test_config_file_with_bad_env_port_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "app: {}\n").unwrap();

        let result = Config::resolve_with(&Cli::default(), path, vars(&[("PORT", "http")]));
        assert!(result.is_err());
    }
}
