//! Dispatcher for the discovered command tree.
//!
//! Registers every descriptor as a `clap` subcommand, parses argv against
//! the result, and turns the matches into an [`Invocation`] for the action
//! handler.

mod action;
mod runner;

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use clap::builder::PossibleValuesParser;
use clap::{Arg, ArgAction, ArgMatches, Command};
use serde_json::{Map, Value as Json};
use thiserror::Error;

pub use action::{ActionOutcome, run_action};
pub use runner::{CommandRunner, NodeRunner};

use crate::naming::{NamingError, argument_key, assign_short_flag};
use crate::types::{
    CommandDescriptor, CommandTree, OptionSpec, OptionType, Runtime, RuntimeFlags,
};

/// Parsed option values keyed by lower-camel-case long name.
pub type ArgMap = Map<String, Json>;

/// Arg id and key holding trailing positional arguments.
pub const POSITIONAL_KEY: &str = "_";

/// Modifier accepted by every command.
pub const VERBOSE_FLAG: &str = "verbose";

/// Name clap gives its generated help flag and help subcommand.
pub const HELP_NAME: &str = "help";

/// Long names owned by the dispatcher; options declaring them are skipped.
pub fn reserved_long_names() -> impl Iterator<Item = &'static str> {
    Runtime::ALL
        .iter()
        .map(|runtime| runtime.flag())
        .chain([HELP_NAME, VERBOSE_FLAG, POSITIONAL_KEY])
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("could not register options of `{command}`: {source}")]
    Naming {
        command: String,
        #[source]
        source: NamingError,
    },
    #[error("short flag -{short} is declared twice in `{command}`")]
    DuplicateShort { command: String, short: String },
    #[error("Missing required run time flag.")]
    MissingRuntime,
    #[error("{0}")]
    Validation(ValidationErrors),
    #[error("could not perform {hook} on {}: {source:#}", .path.display())]
    Hook {
        hook: &'static str,
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
    #[error("could not run {}: {source:#}", .path.display())]
    Run {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

/// Every message collected by validation and the required-option check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<String>);

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR:")?;
        for (idx, message) in self.0.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "\t{message}")?;
        }
        Ok(())
    }
}

/// One matched command with everything the action handler needs.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Names from the root down to the matched command.
    pub command_path: Vec<String>,
    pub node: CommandDescriptor,
    pub args: ArgMap,
    pub runtime: RuntimeFlags,
    pub verbose: bool,
}

impl Invocation {
    pub fn command_name(&self) -> String {
        self.command_path.join(" ")
    }
}

/// Help note for runtime-sensitive commands.
pub fn runtime_help(node: &CommandDescriptor) -> Option<String> {
    let requirement = node.requires_run_time.as_ref()?;
    Some(match requirement.default {
        Some(default) => format!(
            "* Command is runtime sensitive, defaults to {default} if no runtime flag provided"
        ),
        None => "* Requires a runtime flag".to_string(),
    })
}

/// Build the `clap` command for the whole tree.
pub fn build_command(tree: &CommandTree, fallback_name: &str) -> Result<Command, DispatchError> {
    let mut root = tree.root.clone();
    if root.name.is_empty() {
        root.name = fallback_name.to_string();
    }
    let mut command = register(&root, true)?;
    for runtime in Runtime::ALL {
        command = command.arg(
            Arg::new(runtime.flag())
                .long(runtime.flag())
                .help(format!("run against the {runtime} runtime"))
                .action(ArgAction::SetTrue)
                .global(true),
        );
    }
    Ok(command.arg(
        Arg::new(VERBOSE_FLAG)
            .long(VERBOSE_FLAG)
            .help("show debug output")
            .action(ArgAction::SetTrue)
            .global(true),
    ))
}

fn register(node: &CommandDescriptor, is_root: bool) -> Result<Command, DispatchError> {
    let mut command = Command::new(node.name.clone());
    if is_root {
        if let Some(description) = &node.description {
            command = command.about(description.clone());
        }
    } else {
        command = command.about(node.description_or_default());
    }
    if let Some(note) = runtime_help(node) {
        command = command.after_help(note);
    }

    let reserved: HashSet<&str> = reserved_long_names().collect();
    let mut used_shorts: HashSet<String> = HashSet::from(["h".to_string()]);
    let mut seen_longs: HashSet<&str> = HashSet::new();
    for option in node.options() {
        let long = option.name.long();
        if reserved.contains(long) {
            tracing::debug!("`{}`: --{long} is a global flag, skipping option", node.name);
            continue;
        }
        if !seen_longs.insert(long) {
            tracing::warn!("`{}`: option --{long} declared twice, keeping the first", node.name);
            continue;
        }
        if let Some(short) = option.name.explicit_short()
            && used_shorts.contains(short)
        {
            return Err(DispatchError::DuplicateShort {
                command: node.name.clone(),
                short: short.to_string(),
            });
        }
        let short = assign_short_flag(option, &mut used_shorts).map_err(|source| {
            DispatchError::Naming {
                command: node.name.clone(),
                source,
            }
        })?;
        command = command.arg(option_arg(option, &short));
    }

    // clap requires names and aliases to be unique among siblings
    let names: HashSet<&str> = node.subcommands.iter().map(|c| c.name.as_str()).collect();
    let mut seen_names: HashSet<&str> = HashSet::new();
    let mut seen_aliases: HashSet<&str> = HashSet::new();
    for child in &node.subcommands {
        if child.name == HELP_NAME {
            tracing::warn!("`{}`: `help` is a built-in subcommand, skipping it", node.name);
            continue;
        }
        if !seen_names.insert(child.name.as_str()) {
            tracing::warn!(
                "`{}`: subcommand `{}` registered twice, keeping the first",
                node.name,
                child.name
            );
            continue;
        }
        let mut subcommand = register(child, false)?;
        if let Some(alias) = child.alias.as_deref() {
            if alias == HELP_NAME || names.contains(alias) || !seen_aliases.insert(alias) {
                tracing::warn!(
                    "`{}`: alias `{alias}` of `{}` is already taken, dropping it",
                    node.name,
                    child.name
                );
            } else {
                subcommand = subcommand.visible_alias(alias.to_string());
            }
        }
        command = command.subcommand(subcommand);
    }

    if node.subcommands.is_empty() {
        command = command.arg(
            Arg::new(POSITIONAL_KEY)
                .value_name("ARGS")
                .num_args(0..)
                .trailing_var_arg(true)
                .help("arguments passed through to the command"),
        );
    }
    Ok(command)
}

fn option_arg(option: &OptionSpec, short: &str) -> Arg {
    let long = option.name.long().to_string();
    let mut arg = Arg::new(long.clone()).long(long.clone());

    // clap only takes single-character shorts; longer ones stay long-only
    let mut chars = short.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        arg = arg.short(c);
    }
    if let Some(description) = &option.description {
        arg = arg.help(description.clone());
    }

    match option.option_type {
        kind if !kind.takes_value() => arg.action(ArgAction::SetTrue),
        kind => {
            arg = arg.value_name(if kind == OptionType::Password {
                "password".to_string()
            } else {
                long.clone()
            });
            arg = if kind.is_multiple() {
                arg.action(ArgAction::Append).num_args(1..)
            } else {
                arg.action(ArgAction::Set)
            };
            if let Some(choices) = &option.choices {
                arg = arg.value_parser(PossibleValuesParser::new(choices.clone()));
            }
            match &option.default_value {
                Some(Json::Array(items)) => {
                    arg.default_values(items.iter().map(json_to_arg_string).collect::<Vec<_>>())
                }
                Some(Json::Null) | None => arg,
                Some(other) => arg.default_value(json_to_arg_string(other)),
            }
        }
    }
}

fn json_to_arg_string(value: &Json) -> String {
    match value {
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Walk `matches` down the tree to the invoked command.
pub fn resolve(tree: &CommandTree, fallback_name: &str, matches: &ArgMatches) -> Invocation {
    let mut node = &tree.root;
    let mut current = matches;
    let mut command_path = vec![if node.name.is_empty() {
        fallback_name.to_string()
    } else {
        node.name.clone()
    }];
    let mut runtimes = collect_runtimes(current);
    let mut verbose = current.get_flag(VERBOSE_FLAG);

    while let Some((name, sub_matches)) = current.subcommand() {
        let Some(child) = node.subcommands.iter().find(|child| child.name == name) else {
            break;
        };
        node = child;
        current = sub_matches;
        command_path.push(child.name.clone());
        runtimes.extend(collect_runtimes(current));
        verbose |= current.get_flag(VERBOSE_FLAG);
    }

    Invocation {
        command_path,
        node: node.clone(),
        args: collect_args(node, current),
        runtime: RuntimeFlags::new(runtimes),
        verbose,
    }
}

fn collect_runtimes(matches: &ArgMatches) -> Vec<Runtime> {
    Runtime::ALL
        .into_iter()
        .filter(|runtime| {
            matches
                .try_get_one::<bool>(runtime.flag())
                .ok()
                .flatten()
                .copied()
                .unwrap_or(false)
        })
        .collect()
}

fn collect_args(node: &CommandDescriptor, matches: &ArgMatches) -> ArgMap {
    let reserved: HashSet<&str> = reserved_long_names().collect();
    let mut args = ArgMap::new();
    for option in node.options() {
        let long = option.name.long();
        if reserved.contains(long) {
            continue;
        }
        let key = argument_key(long);
        let value = match option.option_type {
            OptionType::Boolean | OptionType::Documentation => {
                match matches.try_get_one::<bool>(long).ok().flatten().copied() {
                    Some(true) => Some(Json::Bool(true)),
                    _ => option.default_value.clone().filter(|v| !v.is_null()),
                }
            }
            kind if kind.is_multiple() => matches
                .try_get_many::<String>(long)
                .ok()
                .flatten()
                .map(|values| Json::Array(values.cloned().map(Json::String).collect())),
            _ => matches
                .try_get_one::<String>(long)
                .ok()
                .flatten()
                .map(|value| Json::String(value.clone())),
        };
        if let Some(value) = value {
            args.insert(key, value);
        }
    }

    if let Ok(Some(rest)) = matches.try_get_many::<String>(POSITIONAL_KEY) {
        let rest: Vec<Json> = rest.cloned().map(Json::String).collect();
        if !rest.is_empty() {
            args.insert(POSITIONAL_KEY.to_string(), Json::Array(rest));
        }
    }
    args
}

/// Subcommand of `root` at `path` (names below the root), for help output.
pub fn find_command<'c>(root: &'c mut Command, path: &[String]) -> Option<&'c mut Command> {
    let mut current = root;
    for name in path {
        current = current.find_subcommand_mut(name)?;
    }
    Some(current)
}
