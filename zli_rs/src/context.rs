//! Ambient context shared by every phase of one invocation.
//!
//! Built once in the entrypoint and passed by reference. The globals table is
//! the complete set of free identifiers an option literal may reference.

use std::path::{Path, PathBuf};

use crate::analyzer::value::{Builtin, Object, Value};
use crate::config::ZliConfig;
use crate::types::{OptionType, Runtime};

#[derive(Debug, Clone)]
pub struct Context {
    pub config: ZliConfig,
    pub cwd: PathBuf,
    globals: Object,
}

impl Context {
    pub fn new(config: ZliConfig, cwd: PathBuf) -> Self {
        let globals = build_globals(&config);
        Self {
            config,
            cwd,
            globals,
        }
    }

    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    pub fn globals(&self) -> &Object {
        &self.globals
    }

    pub fn commands_root(&self) -> PathBuf {
        self.config.commands_root()
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }
}

fn build_globals(config: &ZliConfig) -> Object {
    let mut globals = Object::new();

    // user globals first so the reserved names below always win
    for (key, value) in &config.globals {
        globals.insert(key.clone(), Value::String(value.clone()));
    }

    globals.insert(
        "OPTION_TYPES",
        Value::Object(
            OptionType::ALL
                .iter()
                .map(|t| (t.constant(), Value::String(t.tag().to_string())))
                .collect(),
        ),
    );
    globals.insert(
        "RUNTIMES",
        Value::Object(
            Runtime::ALL
                .iter()
                .map(|r| (r.constant(), Value::String(r.as_str().to_string())))
                .collect(),
        ),
    );
    globals.insert(
        "INPUT_TYPES",
        Value::Object(
            [
                ("TEXT", "text"),
                ("PASSWORD", "password"),
                ("CONFIRM", "confirm"),
                ("LIST", "list"),
                ("CHECKBOX", "checkbox"),
            ]
            .into_iter()
            .map(|(k, v)| (k, Value::String(v.to_string())))
            .collect(),
        ),
    );
    globals.insert(
        "root",
        Value::String(config.root_dir().to_string_lossy().into_owned()),
    );
    globals.insert(
        "_z",
        Value::Object(
            [
                ("join", Builtin::Join),
                ("resolve", Builtin::Resolve),
                ("dirname", Builtin::Dirname),
                ("basename", Builtin::Basename),
                ("extname", Builtin::Extname),
            ]
            .into_iter()
            .map(|(k, b)| (k, Value::Builtin(b)))
            .collect(),
        ),
    );
    globals.insert("String", Value::Builtin(Builtin::String));
    globals
}
