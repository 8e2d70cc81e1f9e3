use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// File stem that makes a command file describe its own directory.
pub const OWN_INDEX_STEM: &str = "index";

/// Description used when a command declares none.
pub fn default_description(name: &str) -> String {
    format!("commands pertaining to {name}-like stuff")
}

/// One CLI command as declared by a command file's `OPTS` literal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// File whose export produced this node; `None` for directory placeholders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    /// `None` when the literal declares no `options` key at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<OptionSpec>>,
    #[serde(default)]
    pub subcommands: Vec<CommandDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_run_time: Option<RuntimeRequirement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_run: Option<Hook>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validate: Option<Hook>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_help_when_no_args: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deps: Option<Vec<String>>,
}

impl CommandDescriptor {
    /// Node created implicitly for a directory segment.
    pub fn placeholder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.file_path.is_none()
    }

    /// Directory this node stands for when it came from an own-index file.
    pub fn index_directory(&self) -> Option<&str> {
        let path = self.file_path.as_deref()?;
        if path.file_stem().and_then(|s| s.to_str()) != Some(OWN_INDEX_STEM) {
            return None;
        }
        path.parent()?.file_name()?.to_str()
    }

    pub fn description_or_default(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| default_description(&self.name))
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn options(&self) -> &[OptionSpec] {
        self.options.as_deref().unwrap_or_default()
    }

    /// Declared options, starting an empty list when there is none yet.
    pub fn options_mut(&mut self) -> &mut Vec<OptionSpec> {
        self.options.get_or_insert_with(Vec::new)
    }

    pub fn shows_help_when_no_args(&self) -> bool {
        self.show_help_when_no_args.unwrap_or(false)
    }
}

/// Root accumulator of the merged command namespace.
///
/// The root itself is a descriptor: the top-level own-index file merges its
/// name and options into it; every other file becomes a descendant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandTree {
    pub root: CommandDescriptor,
}

impl CommandTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subcommands(&self) -> &[CommandDescriptor] {
        &self.root.subcommands
    }

    /// Depth-first walk yielding each node with its ancestry names.
    pub fn walk(&self) -> Vec<(Vec<&str>, &CommandDescriptor)> {
        fn visit<'t>(
            node: &'t CommandDescriptor,
            trail: &mut Vec<&'t str>,
            out: &mut Vec<(Vec<&'t str>, &'t CommandDescriptor)>,
        ) {
            out.push((trail.clone(), node));
            trail.push(node.name.as_str());
            for sub in &node.subcommands {
                visit(sub, trail, out);
            }
            trail.pop();
        }

        let mut out = Vec::new();
        visit(&self.root, &mut Vec::new(), &mut out);
        out
    }
}

/// Option name: either a long name or an explicit `[short, long]` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionName {
    Long(String),
    Pair(String, String),
}

impl OptionName {
    pub fn long(&self) -> &str {
        match self {
            OptionName::Long(long) | OptionName::Pair(_, long) => long,
        }
    }

    pub fn explicit_short(&self) -> Option<&str> {
        match self {
            OptionName::Long(_) => None,
            OptionName::Pair(short, _) => Some(short),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionSpec {
    pub name: OptionName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(rename = "type")]
    pub option_type: OptionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
}

impl OptionSpec {
    pub fn new(name: impl Into<String>, option_type: OptionType) -> Self {
        Self {
            name: OptionName::Long(name.into()),
            description: None,
            default_value: None,
            required: false,
            option_type,
            choices: None,
        }
    }
}

/// Closed set of option kinds, each with one flag rendering rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionType {
    Boolean,
    Input,
    Password,
    OneOf,
    AnyOf,
    Variadic,
    Documentation,
}

impl OptionType {
    pub const ALL: [OptionType; 7] = [
        OptionType::Boolean,
        OptionType::Input,
        OptionType::Password,
        OptionType::OneOf,
        OptionType::AnyOf,
        OptionType::Variadic,
        OptionType::Documentation,
    ];

    /// Constant name under `OPTION_TYPES` in command files.
    pub fn constant(self) -> &'static str {
        match self {
            OptionType::Boolean => "BOOLEAN",
            OptionType::Input => "INPUT",
            OptionType::Password => "PASSWORD",
            OptionType::OneOf => "ONE_OF",
            OptionType::AnyOf => "ANY_OF",
            OptionType::Variadic => "VARIADIC",
            OptionType::Documentation => "DOCUMENTATION",
        }
    }

    /// Serialized tag, as produced by `OPTION_TYPES.<CONSTANT>`.
    pub fn tag(self) -> &'static str {
        match self {
            OptionType::Boolean => "boolean",
            OptionType::Input => "input",
            OptionType::Password => "password",
            OptionType::OneOf => "one_of",
            OptionType::AnyOf => "any_of",
            OptionType::Variadic => "variadic",
            OptionType::Documentation => "documentation",
        }
    }

    /// Trailing part of the rendered flag string.
    pub fn flag_suffix(self, long: &str) -> String {
        match self {
            OptionType::Boolean | OptionType::Documentation => String::new(),
            OptionType::Input | OptionType::OneOf => format!("<{long}>"),
            OptionType::Password => "[password]".to_string(),
            OptionType::AnyOf | OptionType::Variadic => format!("<{long}...>"),
        }
    }

    pub fn takes_value(self) -> bool {
        !matches!(self, OptionType::Boolean | OptionType::Documentation)
    }

    pub fn is_multiple(self) -> bool {
        matches!(self, OptionType::AnyOf | OptionType::Variadic)
    }
}

/// Runtime selector chosen at invocation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Runtime {
    Local,
    Develop,
    Staging,
    #[serde(alias = "prod")]
    Production,
}

impl Runtime {
    pub const ALL: [Runtime; 4] = [
        Runtime::Local,
        Runtime::Develop,
        Runtime::Staging,
        Runtime::Production,
    ];

    /// Global flag selecting this runtime (`--prod` for production).
    pub fn flag(self) -> &'static str {
        match self {
            Runtime::Local => "local",
            Runtime::Develop => "develop",
            Runtime::Staging => "staging",
            Runtime::Production => "prod",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Runtime::Local => "local",
            Runtime::Develop => "develop",
            Runtime::Staging => "staging",
            Runtime::Production => "production",
        }
    }

    /// Constant name under `RUNTIMES` in command files.
    pub fn constant(self) -> &'static str {
        match self {
            Runtime::Local => "LOCAL",
            Runtime::Develop => "DEVELOP",
            Runtime::Staging => "STAGING",
            Runtime::Production => "PRODUCTION",
        }
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime flags active for one invocation, computed once after parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeFlags(BTreeSet<Runtime>);

impl RuntimeFlags {
    pub fn new(runtimes: impl IntoIterator<Item = Runtime>) -> Self {
        Self(runtimes.into_iter().collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, runtime: Runtime) -> bool {
        self.0.contains(&runtime)
    }

    pub fn iter(&self) -> impl Iterator<Item = Runtime> + '_ {
        self.0.iter().copied()
    }

    pub fn joined(&self) -> String {
        self.iter().map(Runtime::as_str).collect::<Vec<_>>().join(",")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeRequirement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Runtime>,
}

/// A function declared in an option literal, kept as source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hook {
    #[serde(rename = "$function")]
    pub source: String,
}

impl Hook {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }
}
