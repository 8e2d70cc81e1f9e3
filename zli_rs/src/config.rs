//! Configuration file support for zli.
//!
//! Loads an optional `.zli.toml` from the working directory or the nearest
//! ancestor that has one. `ZLI_CONFIG` points at an explicit file instead.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File name searched for in the working directory and its ancestors.
pub const CONFIG_FILE_NAME: &str = ".zli.toml";

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "ZLI_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZliConfig {
    /// Directory holding the command tree and the cache artifact. `~` is
    /// expanded; relative paths resolve against the config file's directory.
    pub root: String,
    /// Subdirectory of `root` scanned for command files.
    pub commands_dir: String,
    /// Program name shown in help when the root index declares none.
    pub executable: String,
    /// Interpreter used to run command files and hooks.
    pub interpreter: String,
    /// Recognized command file extensions, without the dot.
    pub extensions: Vec<String>,
    /// Extra glob patterns excluded from discovery.
    pub exclude: Vec<String>,
    /// Cache artifact file name, relative to `root`.
    pub cache_file: String,
    /// Extra string globals visible to option literals.
    pub globals: BTreeMap<String, String>,
    #[serde(skip)]
    base_dir: PathBuf,
    #[serde(skip)]
    source: Option<PathBuf>,
}

impl Default for ZliConfig {
    fn default() -> Self {
        Self {
            root: "zli_commands".to_string(),
            commands_dir: "commands".to_string(),
            executable: "zli".to_string(),
            interpreter: "node".to_string(),
            extensions: vec!["js".to_string(), "mjs".to_string()],
            exclude: Vec::new(),
            cache_file: ".zli-cache.js".to_string(),
            globals: BTreeMap::new(),
            base_dir: PathBuf::from("."),
            source: None,
        }
    }
}

impl ZliConfig {
    /// Defaults anchored at `base_dir`.
    pub fn anchored(base_dir: &Path) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
            ..Self::default()
        }
    }

    /// Resolve the config for an invocation started in `cwd`.
    pub fn load(cwd: &Path) -> Result<Self, ConfigError> {
        if let Some(explicit) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
            return Self::load_from_path(&cwd.join(explicit));
        }
        match find_config(cwd) {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::anchored(cwd)),
        }
    }

    /// Load config from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: ZliConfig =
            toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Config file this was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn root_dir(&self) -> PathBuf {
        let expanded = expand_tilde(&self.root);
        if expanded.is_absolute() {
            expanded
        } else {
            self.base_dir.join(expanded)
        }
    }

    pub fn commands_root(&self) -> PathBuf {
        self.root_dir().join(&self.commands_dir)
    }

    pub fn cache_path(&self) -> PathBuf {
        self.root_dir().join(&self.cache_file)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Nearest `.zli.toml` in `start` or its ancestors.
pub fn find_config(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

fn expand_tilde(raw: &str) -> PathBuf {
    if raw == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(raw));
    }
    match (raw.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ZliConfig::anchored(Path::new("/work"));
        assert_eq!(config.commands_root(), Path::new("/work/zli_commands/commands"));
        assert_eq!(config.cache_path(), Path::new("/work/zli_commands/.zli-cache.js"));
        assert_eq!(config.interpreter, "node");
        assert_eq!(config.extensions, vec!["js", "mjs"]);
        assert!(config.source().is_none());
    }

    #[test]
    fn test_load_valid_config() {
        let temp = TempDir::new().expect("temp dir");
        let config_path = temp.path().join(CONFIG_FILE_NAME);
        let mut file = std::fs::File::create(&config_path).expect("create config");
        writeln!(
            file,
            r#"
root = "tools"
executable = "ops"
exclude = ["**/fixtures/**"]

[globals]
TEAM = "platform"
"#
        )
        .expect("write config");

        let config = ZliConfig::load_from_path(&config_path).expect("valid config");
        assert_eq!(config.executable, "ops");
        assert_eq!(config.commands_root(), temp.path().join("tools/commands"));
        assert_eq!(config.exclude, vec!["**/fixtures/**"]);
        assert_eq!(config.globals.get("TEAM").map(String::as_str), Some("platform"));
        assert_eq!(config.commands_dir, "commands");
    }

    #[test]
    fn test_find_config_in_ancestor() {
        let temp = TempDir::new().expect("temp dir");
        std::fs::write(temp.path().join(CONFIG_FILE_NAME), "").expect("write");
        let nested = temp.path().join("a/b");
        std::fs::create_dir_all(&nested).expect("mkdir");

        let found = find_config(&nested).expect("config in ancestor");
        assert_eq!(found, temp.path().join(CONFIG_FILE_NAME));

        let config = ZliConfig::load_from_path(&found).expect("empty config");
        assert_eq!(config.root_dir(), temp.path().join("zli_commands"));
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "root = [").expect("write");
        let err = ZliConfig::load_from_path(&path).expect_err("malformed");
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(".zli.toml"));
    }

    #[test]
    fn test_absolute_root_ignores_base_dir() {
        let mut config = ZliConfig::anchored(Path::new("/work"));
        config.root = "/opt/cmds".into();
        assert_eq!(config.commands_root(), Path::new("/opt/cmds/commands"));
    }

    #[test]
    fn test_round_trips_through_toml() {
        let config = ZliConfig::default();
        let rendered = config.to_toml().expect("render");
        let parsed: ZliConfig = toml::from_str(&rendered).expect("parse");
        assert_eq!(parsed.root, config.root);
        assert_eq!(parsed.extensions, config.extensions);
    }
}
