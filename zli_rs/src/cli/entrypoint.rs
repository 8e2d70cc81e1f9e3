//! Process entry: reserved flags, the discovery phase, then dispatch.
//!
//! Reserved flags are pulled out of argv before `clap` sees it, so they
//! never collide with options declared by command files. Everything after
//! a bare `--` is left untouched.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, bail};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use super::dispatch::{
    self, ActionOutcome, DispatchError, NodeRunner, VERBOSE_FLAG, find_command, run_action,
};
use super::introspect;
use crate::analyzer::{self, DiscoveryError};
use crate::colors::Painter;
use crate::config::ZliConfig;
use crate::context::Context;
use crate::scaffold::{self, ScaffoldOptions};
use crate::snapshot;
use crate::types::CommandTree;

/// Environment variable holding a `tracing` filter directive.
pub const LOG_ENV: &str = "ZLI_LOG";

/// Options controlling binary-specific behavior.
pub struct EntryOptions {
    /// Program name used when the config and the root index name none.
    pub binary_name: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryError {
    #[error("{0} expects a value")]
    MissingValue(&'static str),
}

/// Flags handled by zli itself rather than by the command tree.
#[derive(Debug, Clone, Default)]
pub struct ReservedFlags {
    pub show_arg_name_map: bool,
    pub write_cache: bool,
    pub fresh: bool,
    pub show_deps: bool,
    pub print_opts: Option<PathBuf>,
    pub configure: Option<ScaffoldOptions>,
}

fn take_value(
    flag: &'static str,
    arg: &str,
    rest: &mut impl Iterator<Item = String>,
) -> Result<Option<String>, EntryError> {
    if arg == flag {
        return rest.next().map(Some).ok_or(EntryError::MissingValue(flag));
    }
    Ok(arg
        .strip_prefix(flag)
        .and_then(|tail| tail.strip_prefix('='))
        .map(str::to_string))
}

/// Split reserved flags off `raw`, returning them and the argv left for `clap`.
///
/// `--root`, `--executable` and `--overwrite` are only reserved alongside
/// `--configure`.
pub fn split_reserved(raw: Vec<String>) -> Result<(ReservedFlags, Vec<String>), EntryError> {
    let split = raw.iter().position(|arg| arg == "--").unwrap_or(raw.len());
    let configuring = raw[..split].iter().any(|arg| arg == "--configure");

    let mut flags = ReservedFlags::default();
    let mut scaffold = ScaffoldOptions::default();
    let mut forwarded = Vec::with_capacity(raw.len());
    let mut args = raw.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--" => {
                forwarded.push(arg);
                forwarded.extend(args.by_ref());
                break;
            }
            "--show-arg-name-map" => flags.show_arg_name_map = true,
            "--write-cache" => flags.write_cache = true,
            "--fresh" => flags.fresh = true,
            "--show-deps" => flags.show_deps = true,
            "--configure" => {}
            "--overwrite" if configuring => scaffold.overwrite = true,
            _ => {
                if let Some(file) = take_value("--print-opts", &arg, &mut args)? {
                    flags.print_opts = Some(PathBuf::from(file));
                } else if configuring
                    && let Some(root) = take_value("--root", &arg, &mut args)?
                {
                    scaffold.root = Some(root);
                } else if configuring
                    && let Some(executable) = take_value("--executable", &arg, &mut args)?
                {
                    scaffold.executable = Some(executable);
                } else {
                    forwarded.push(arg);
                }
            }
        }
    }
    if configuring {
        flags.configure = Some(scaffold);
    }
    Ok((flags, forwarded))
}

fn wants_verbose(argv: &[String]) -> bool {
    let flag = format!("--{VERBOSE_FLAG}");
    argv.iter().take_while(|arg| *arg != "--").any(|arg| *arg == flag)
}

/// Install the stderr subscriber. `ZLI_LOG` wins over `--verbose`.
pub fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .try_init();
}

/// Run the CLI and return the process exit code.
pub fn run(opts: &EntryOptions) -> i32 {
    let raw_args: Vec<String> = std::env::args().skip(1).collect();
    match run_with_args(opts, raw_args) {
        Ok(code) => code,
        Err(err) => {
            report(&err, Painter::for_stderr());
            1
        }
    }
}

/// Body of [`run`] with explicit arguments (program name excluded).
pub fn run_with_args(opts: &EntryOptions, raw_args: Vec<String>) -> Result<i32> {
    let (flags, argv) = split_reserved(raw_args)?;
    let verbose = wants_verbose(&argv);
    init_tracing(verbose);

    let cwd = std::env::current_dir().context("cannot determine the working directory")?;
    if let Some(options) = &flags.configure {
        return configure(&cwd, options);
    }

    let mut config = ZliConfig::load(&cwd)?;
    if config.executable.is_empty() {
        config.executable = opts.binary_name.to_string();
    }
    match config.source() {
        Some(source) => tracing::debug!("using config {}", source.display()),
        None => tracing::debug!("no {} found, using defaults", crate::config::CONFIG_FILE_NAME),
    }
    let ctx = Context::new(config, cwd);

    if let Some(file) = &flags.print_opts {
        let path = ctx.cwd().join(file);
        let Some(source) = analyzer::print_opts(&path)? else {
            bail!("{} does not export OPTS", path.display());
        };
        println!("{source}");
        return Ok(0);
    }
    if flags.show_deps {
        let entries = analyzer::collect_deps(&ctx)?;
        print!("{}", introspect::deps_listing(&ctx.commands_root(), &entries));
        return Ok(0);
    }
    if flags.write_cache {
        let tree = analyzer::discover(&ctx)?;
        let cache = ctx.config.cache_path();
        snapshot::save(&tree, &cache)
            .with_context(|| format!("failed to write {}", cache.display()))?;
        println!("wrote {}", cache.display());
        return Ok(0);
    }

    let tree = load_tree(&ctx, flags.fresh)?;
    let program = ctx.config.executable.clone();
    if flags.show_arg_name_map {
        print!("{}", introspect::arg_name_map(&tree, &program)?);
        return Ok(0);
    }
    dispatch_tree(&ctx, &tree, &program, argv)
}

fn configure(cwd: &Path, options: &ScaffoldOptions) -> Result<i32> {
    let report = scaffold::configure(cwd, options)?;
    println!("wrote {}", report.config_path.display());
    for path in &report.written {
        println!("created {}", path.display());
    }
    for path in &report.kept {
        println!("kept {}", path.display());
    }
    Ok(0)
}

fn load_tree(ctx: &Context, fresh: bool) -> Result<CommandTree, DiscoveryError> {
    if !fresh && let Some(tree) = snapshot::load_if_present(&ctx.config.cache_path(), ctx) {
        return Ok(tree);
    }
    analyzer::discover(ctx)
}

fn dispatch_tree(ctx: &Context, tree: &CommandTree, program: &str, argv: Vec<String>) -> Result<i32> {
    let mut command = dispatch::build_command(tree, program)?;
    let matches = match command
        .clone()
        .try_get_matches_from(std::iter::once(program.to_string()).chain(argv))
    {
        Ok(matches) => matches,
        Err(err) => {
            let code = err.exit_code();
            err.print()?;
            return Ok(code);
        }
    };

    let invocation = dispatch::resolve(tree, program, &matches);
    let help_path = invocation.command_path[1..].to_vec();
    tracing::debug!("dispatching `{}`", invocation.command_name());
    match run_action(invocation, &NodeRunner::new(ctx))? {
        ActionOutcome::ShowHelp => {
            command.build();
            if let Some(target) = find_command(&mut command, &help_path) {
                println!("{}", target.render_help());
            }
            Ok(0)
        }
        ActionOutcome::Exited(code) => Ok(code),
    }
}

/// Top-level message plus any causes not already contained in it.
pub fn describe(err: &anyhow::Error) -> String {
    let mut message = err.to_string();
    for cause in err.chain().skip(1) {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
    }
    message
}

fn report(err: &anyhow::Error, painter: Painter) {
    if let Some(DispatchError::Validation(errors)) = err.downcast_ref::<DispatchError>() {
        eprintln!("{}", painter.error(&errors.to_string()));
        return;
    }
    eprintln!("{}", painter.status_error(&describe(err)));
    if let Some(generated) = err
        .downcast_ref::<DiscoveryError>()
        .and_then(DiscoveryError::generated_source)
    {
        eprintln!("{}", painter.dim(generated));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reserved_flags_are_removed() {
        let (flags, rest) = split_reserved(args(&[
            "deploy",
            "--fresh",
            "--tag",
            "v1",
            "--show-arg-name-map",
            "--print-opts=a.js",
        ]))
        .expect("split");
        assert!(flags.fresh);
        assert!(flags.show_arg_name_map);
        assert_eq!(flags.print_opts, Some(PathBuf::from("a.js")));
        assert_eq!(rest, args(&["deploy", "--tag", "v1"]));
    }

    #[test]
    fn arguments_after_double_dash_pass_through() {
        let (flags, rest) =
            split_reserved(args(&["run", "--", "--write-cache", "--root", "x"])).expect("split");
        assert!(!flags.write_cache);
        assert_eq!(rest, args(&["run", "--", "--write-cache", "--root", "x"]));
    }

    #[test]
    fn configure_claims_its_options() {
        let (flags, rest) = split_reserved(args(&[
            "--configure",
            "--root",
            "cli",
            "--executable=ops",
            "--overwrite",
        ]))
        .expect("split");
        let scaffold = flags.configure.expect("configure");
        assert_eq!(scaffold.root.as_deref(), Some("cli"));
        assert_eq!(scaffold.executable.as_deref(), Some("ops"));
        assert!(scaffold.overwrite);
        assert!(rest.is_empty());
    }

    #[test]
    fn root_is_forwarded_without_configure() {
        let (flags, rest) = split_reserved(args(&["deploy", "--root", "x"])).expect("split");
        assert!(flags.configure.is_none());
        assert_eq!(rest, args(&["deploy", "--root", "x"]));
    }

    #[test]
    fn print_opts_needs_a_file() {
        let err = split_reserved(args(&["--print-opts"])).expect_err("missing value");
        assert_eq!(err, EntryError::MissingValue("--print-opts"));
    }

    #[test]
    fn verbose_is_detected_before_double_dash() {
        assert!(wants_verbose(&args(&["deploy", "--verbose"])));
        assert!(!wants_verbose(&args(&["deploy", "--", "--verbose"])));
    }

    #[test]
    fn describe_skips_repeated_causes() {
        let inner = std::io::Error::other("disk full");
        let err = anyhow::Error::new(inner).context("failed to write cache: disk full");
        assert_eq!(describe(&err), "failed to write cache: disk full");
        let err = anyhow::anyhow!("root cause").context("outer");
        assert_eq!(describe(&err), "outer: root cause");
    }
}
