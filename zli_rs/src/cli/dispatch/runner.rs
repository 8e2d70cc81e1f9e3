//! Child-process execution of command files and hooks.
//!
//! Nothing runs bare: hooks and command files are both loaded by a small
//! module passed to `<interpreter> --input-type=module -e`. It installs the
//! same globals the option literals were evaluated against, plus `ARGS`,
//! `_z.RUNTIME_FLAGS` and the `when*` runtime helpers, before importing.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context as _, Result, bail};
use serde_json::{Map, Value as Json};

use super::action::validation_messages;
use super::{ArgMap, Invocation};
use crate::analyzer::value::Value;
use crate::context::Context;
use crate::types::Hook;

/// Marks the start of a hook's JSON result on stdout.
const RESULT_MARKER: &str = "__zli_result__:";

/// Runs hooks and command files on behalf of the action handler.
pub trait CommandRunner {
    /// Messages returned by a `validate` hook; empty means valid.
    fn validate(&self, hook: &Hook, invocation: &Invocation) -> Result<Vec<String>>;

    /// Extra arguments returned by a `beforeRun` hook.
    fn before_run(&self, hook: &Hook, invocation: &Invocation) -> Result<ArgMap>;

    /// Execute the command file and return its exit status.
    fn run(&self, invocation: &Invocation) -> Result<i32>;
}

/// Runs everything through an external JavaScript interpreter.
#[derive(Debug, Clone)]
pub struct NodeRunner {
    interpreter: String,
    root: PathBuf,
    globals: Json,
}

impl NodeRunner {
    pub fn new(ctx: &Context) -> Self {
        // helpers are re-created by the driver prelude
        let globals = ctx
            .globals()
            .iter()
            .filter(|(_, value)| !matches!(value, Value::Builtin(_)))
            .filter(|(name, _)| *name != "_z")
            .map(|(name, value)| (name.to_string(), value.to_json()))
            .collect::<Map<_, _>>();
        Self {
            interpreter: ctx.config.interpreter.clone(),
            root: ctx.config.root_dir(),
            globals: Json::Object(globals),
        }
    }

    /// Environment handed to every child process.
    pub fn environment(&self, invocation: &Invocation) -> Vec<(&'static str, String)> {
        let deps = invocation
            .node
            .deps
            .as_ref()
            .map(|deps| deps.join(","))
            .unwrap_or_default();
        vec![
            ("ZLI_ARGS", Json::Object(invocation.args.clone()).to_string()),
            ("ZLI_RUNTIME_FLAGS", invocation.runtime.joined()),
            ("ZLI_COMMAND", invocation.command_name()),
            ("ZLI_ROOT", self.root.to_string_lossy().into_owned()),
            ("ZLI_VERBOSE", if invocation.verbose { "1" } else { "0" }.to_string()),
            ("ZLI_DEPS", deps),
            ("ZLI_GLOBALS", self.globals.to_string()),
        ]
    }

    fn command(&self, invocation: &Invocation) -> Command {
        let mut command = Command::new(&self.interpreter);
        command.envs(self.environment(invocation));
        if let Some(dir) = invocation.node.file_path().and_then(Path::parent) {
            command.current_dir(dir);
        }
        command
    }

    fn driven(&self, invocation: &Invocation, driver: &str) -> Command {
        let mut command = self.command(invocation);
        command.args(["--input-type=module", "-e", driver]);
        command
    }

    fn run_hook(&self, hook: &Hook, invocation: &Invocation) -> Result<Json> {
        let output = self
            .driven(invocation, &hook_driver(hook))
            .stdin(Stdio::inherit())
            .stderr(Stdio::inherit())
            .output()
            .with_context(|| format!("failed to start {}", self.interpreter))?;
        if !output.status.success() {
            bail!("hook exited with {}", output.status);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let Some((printed, result)) = stdout.rsplit_once(RESULT_MARKER) else {
            bail!("hook produced no result");
        };
        if !printed.is_empty() {
            print!("{printed}");
        }
        serde_json::from_str(result.trim()).context("hook result is not valid JSON")
    }
}

/// Globals shared by hooks and command files.
const PRELUDE: &str = r#"import * as __path from "node:path";
import { pathToFileURL as __toFileUrl } from "node:url";
Object.assign(globalThis, JSON.parse(process.env.ZLI_GLOBALS ?? "{}"));
globalThis._z = {
  join: __path.join,
  resolve: __path.resolve,
  dirname: __path.dirname,
  basename: __path.basename,
  extname: __path.extname,
  RUNTIME_FLAGS: (process.env.ZLI_RUNTIME_FLAGS ?? "").split(",").filter(Boolean),
};
globalThis.ARGS = JSON.parse(process.env.ZLI_ARGS ?? "{}");
const __when = (...runtimes) => (callback, onDefault) => {
  const hits = runtimes.filter((r) => _z.RUNTIME_FLAGS.includes(r));
  if (hits.length) return typeof callback === "function" ? callback(hits) : null;
  return typeof onDefault === "function" ? onDefault() : null;
};
Object.assign(globalThis, {
  whenRuntime: __when,
  whenLocal: __when(RUNTIMES.LOCAL),
  whenDevelop: __when(RUNTIMES.DEVELOP),
  whenStaging: __when(RUNTIMES.STAGING),
  whenProduction: __when(RUNTIMES.PRODUCTION),
  whenNonLocal: __when(RUNTIMES.DEVELOP, RUNTIMES.STAGING, RUNTIMES.PRODUCTION),
});
"#;

fn hook_driver(hook: &Hook) -> String {
    format!(
        r#"{PRELUDE}const __hook = ({source});
const __result = await __hook(ARGS);
process.stdout.write("{RESULT_MARKER}" + JSON.stringify(__result ?? null));
"#,
        source = hook.source,
    )
}

fn command_driver(file: &Path) -> String {
    let file = Json::String(file.to_string_lossy().into_owned());
    format!(
        r#"{PRELUDE}globalThis.__filename = {file};
globalThis.__dirname = __path.dirname(__filename);
await import(__toFileUrl(__filename).href);
"#
    )
}

impl CommandRunner for NodeRunner {
    fn validate(&self, hook: &Hook, invocation: &Invocation) -> Result<Vec<String>> {
        Ok(validation_messages(self.run_hook(hook, invocation)?))
    }

    fn before_run(&self, hook: &Hook, invocation: &Invocation) -> Result<ArgMap> {
        match self.run_hook(hook, invocation)? {
            Json::Object(map) => Ok(map),
            Json::Null => Ok(ArgMap::new()),
            other => bail!("beforeRun must return an object, got {other}"),
        }
    }

    fn run(&self, invocation: &Invocation) -> Result<i32> {
        let Some(file) = invocation.node.file_path() else {
            bail!("`{}` has no command file", invocation.command_name());
        };
        // the child starts in the file's directory
        let file = std::path::absolute(file)
            .with_context(|| format!("cannot resolve {}", file.display()))?;
        tracing::debug!("running {} {}", self.interpreter, file.display());
        let status = self
            .driven(invocation, &command_driver(&file))
            .status()
            .with_context(|| format!("failed to start {}", self.interpreter))?;
        Ok(status.code().unwrap_or(1))
    }
}
