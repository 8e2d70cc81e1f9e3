//! `--configure`: write `.zli.toml` and seed a command root.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::{CONFIG_FILE_NAME, ConfigError, ZliConfig};
use crate::types::{OWN_INDEX_STEM, Runtime};

#[derive(Debug, Error)]
pub enum ScaffoldError {
    #[error("{} already exists; pass --overwrite to replace it", .0.display())]
    Exists(PathBuf),
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, Default)]
pub struct ScaffoldOptions {
    /// Command root, relative to the config file.
    pub root: Option<String>,
    pub executable: Option<String>,
    pub overwrite: bool,
}

/// Files touched by a scaffold run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaffoldReport {
    pub config_path: PathBuf,
    pub written: Vec<PathBuf>,
    pub kept: Vec<PathBuf>,
}

fn index_source(executable: &str) -> String {
    let mut options = String::from(
        "    {\n      name: 'verbose',\n      description: 'Like spam? This is for you.',\n      type: OPTION_TYPES.BOOLEAN,\n    },\n",
    );
    for runtime in Runtime::ALL {
        options.push_str(&format!(
            "    {{\n      name: '{flag}',\n      description: 'set {name} runtime',\n      type: OPTION_TYPES.BOOLEAN,\n    }},\n",
            flag = runtime.flag(),
            name = runtime.as_str(),
        ));
    }
    format!(
        "export const OPTS = {{\n  name: '{executable}',\n  description: '{executable} commands',\n  options: [\n{options}  ],\n}};\n"
    )
}

const SHOW_GLOBALS_SOURCE: &str = r#"export const OPTS = {
  name: 'show-globals',
  description: 'Display the globals visible to OPTS literals',
  options: [
    {
      name: 'list',
      description: 'Only list global names',
      type: OPTION_TYPES.BOOLEAN,
    },
  ],
};

const globals = JSON.parse(process.env.ZLI_GLOBALS ?? '{}');
for (const name of [...Object.keys(globals), '_z']) {
  const value = globalThis[name];
  console.log(ARGS.list ? name : `${name} (${typeof value}): ${JSON.stringify(value)}`);
}
"#;

/// Marks the command root as ES modules so `export const OPTS` imports.
const PACKAGE_JSON: &str = "{\n  \"type\": \"module\"\n}\n";

fn write_file(path: &Path, contents: &str) -> Result<(), ScaffoldError> {
    let io_err = |source| ScaffoldError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(io_err)?;
    }
    fs::write(path, contents).map_err(io_err)
}

/// Write `.zli.toml` into `base_dir` and seed the command root.
///
/// Existing command files are kept unless `overwrite` is set.
pub fn configure(base_dir: &Path, options: &ScaffoldOptions) -> Result<ScaffoldReport, ScaffoldError> {
    let config_path = base_dir.join(CONFIG_FILE_NAME);
    if config_path.exists() && !options.overwrite {
        return Err(ScaffoldError::Exists(config_path));
    }

    let mut config = ZliConfig::anchored(base_dir);
    if let Some(root) = &options.root {
        config.root = root.clone();
    }
    if let Some(executable) = &options.executable {
        config.executable = executable.clone();
    }
    write_file(&config_path, &config.to_toml()?)?;

    let commands = config.commands_root();
    let seeds = [
        (
            commands.join(format!("{OWN_INDEX_STEM}.js")),
            index_source(&config.executable),
        ),
        (commands.join("show-globals.js"), SHOW_GLOBALS_SOURCE.to_string()),
        (config.root_dir().join("package.json"), PACKAGE_JSON.to_string()),
    ];

    let mut report = ScaffoldReport {
        config_path,
        written: Vec::new(),
        kept: Vec::new(),
    };
    for (path, contents) in seeds {
        if path.exists() && !options.overwrite {
            tracing::debug!("keeping existing {}", path.display());
            report.kept.push(path);
            continue;
        }
        write_file(&path, &contents)?;
        report.written.push(path);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::discover;
    use crate::context::Context;
    use tempfile::TempDir;

    #[test]
    fn seeds_a_discoverable_tree() {
        let temp = TempDir::new().expect("temp dir");
        let report = configure(
            temp.path(),
            &ScaffoldOptions {
                root: Some("cli".into()),
                executable: Some("ops".into()),
                overwrite: false,
            },
        )
        .expect("configure");
        assert_eq!(report.written.len(), 3);
        assert!(report.written.contains(&temp.path().join("cli/package.json")));

        let config = ZliConfig::load_from_path(&report.config_path).expect("config");
        assert_eq!(config.root, "cli");
        assert_eq!(config.executable, "ops");

        let ctx = Context::new(config, temp.path().to_path_buf());
        let tree = discover(&ctx).expect("discover");
        assert_eq!(tree.root.name, "ops");
        assert_eq!(tree.root.options().len(), 5);
        assert_eq!(tree.subcommands()[0].name, "show-globals");
    }

    #[test]
    fn refuses_to_overwrite_config() {
        let temp = TempDir::new().expect("temp dir");
        configure(temp.path(), &ScaffoldOptions::default()).expect("first run");
        let err = configure(temp.path(), &ScaffoldOptions::default()).expect_err("second run");
        assert!(matches!(err, ScaffoldError::Exists(_)));
    }

    #[test]
    fn overwrite_keeps_nothing() {
        let temp = TempDir::new().expect("temp dir");
        configure(temp.path(), &ScaffoldOptions::default()).expect("first run");
        let index = temp.path().join("zli_commands/commands/index.js");
        fs::write(&index, "export const OPTS = { name: 'mine' };\n").expect("edit");

        let report = configure(
            temp.path(),
            &ScaffoldOptions {
                overwrite: true,
                ..ScaffoldOptions::default()
            },
        )
        .expect("overwrite");
        assert!(report.kept.is_empty());
        let rewritten = fs::read_to_string(index).expect("read");
        assert!(rewritten.contains("name: 'zli'"));
    }
}
