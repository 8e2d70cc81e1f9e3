//! Flag and command naming rules.

use std::collections::HashSet;
use std::path::Path;

use heck::{ToKebabCase, ToLowerCamelCase};
use thiserror::Error;

use crate::types::OptionSpec;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamingError {
    #[error("All easily calculable short flags for {0} already used!")]
    Exhausted(String),
    #[error("option name must not be empty")]
    Empty,
}

/// Short flag for `name` given the flags already taken.
///
/// Tries the lower-cased first letter (`h` becomes `H`, `-h` being help),
/// then the upper-cased one, then the whole name.
pub fn determine_short_flag(name: &str, used: &HashSet<String>) -> Result<String, NamingError> {
    let first = name.chars().next().ok_or(NamingError::Empty)?;
    let lower = if first == 'h' {
        "H".to_string()
    } else {
        first.to_lowercase().to_string()
    };
    let upper = first.to_uppercase().to_string();

    [lower, upper, name.to_string()]
        .into_iter()
        .find(|candidate| !used.contains(candidate))
        .ok_or_else(|| NamingError::Exhausted(name.to_string()))
}

/// Short flag `option` ends up with, recording it in `used`.
pub fn assign_short_flag(
    option: &OptionSpec,
    used: &mut HashSet<String>,
) -> Result<String, NamingError> {
    let short = match option.name.explicit_short() {
        Some(short) => short.to_string(),
        None => determine_short_flag(option.name.long(), used)?,
    };
    used.insert(short.clone());
    Ok(short)
}

/// Help rendering of an option, e.g. `-a, --alpha <alpha>`.
pub fn option_flag_string(
    option: &OptionSpec,
    used: &mut HashSet<String>,
) -> Result<String, NamingError> {
    let short = assign_short_flag(option, used)?;
    let long = option.name.long();
    let rendered = format!("-{short}, --{long} {}", option.option_type.flag_suffix(long));
    Ok(rendered.trim().to_string())
}

fn file_stem_words(file: &str) -> String {
    let stem = Path::new(file)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    stem.replace(['-', '.'], "_").to_lowercase()
}

/// `deploy-app.js` → `deployApp`
pub fn filename_to_variable_name(file: &str) -> String {
    file_stem_words(file).to_lower_camel_case()
}

/// `Deploy_App.js` → `deploy-app`
pub fn filename_to_command_name(file: &str) -> String {
    file_stem_words(file).to_kebab_case()
}

/// Key under which a parsed option value is handed to hooks and commands.
pub fn argument_key(long: &str) -> String {
    long.to_lower_camel_case()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OptionName, OptionType};

    fn used(flags: &[&str]) -> HashSet<String> {
        flags.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn short_flag_progression() {
        assert_eq!(determine_short_flag("alpha", &used(&[])).as_deref(), Ok("a"));
        let taken = used(&["a", "A", "b"]);
        assert_eq!(determine_short_flag("alpha", &taken).as_deref(), Ok("alpha"));
        assert_eq!(determine_short_flag("beta", &taken).as_deref(), Ok("B"));
        assert_eq!(determine_short_flag("gamma", &taken).as_deref(), Ok("g"));
        let taken = used(&["g", "G"]);
        assert_eq!(determine_short_flag("gamma", &taken).as_deref(), Ok("gamma"));
        let taken = used(&["g", "G", "gamma"]);
        assert_eq!(
            determine_short_flag("gamma", &taken).map_err(|e| e.to_string()),
            Err("All easily calculable short flags for gamma already used!".to_string())
        );
    }

    #[test]
    fn help_letter_is_reserved() {
        assert_eq!(determine_short_flag("host", &used(&[])).as_deref(), Ok("H"));
        assert_eq!(determine_short_flag("host", &used(&["H"])).as_deref(), Ok("host"));
    }

    #[test]
    fn option_strings_by_type() {
        let mut taken = HashSet::new();
        let alpha = OptionSpec::new("alpha", OptionType::Input);
        assert_eq!(
            option_flag_string(&alpha, &mut taken).as_deref(),
            Ok("-a, --alpha <alpha>")
        );
        let alpha2 = OptionSpec::new("alpha2", OptionType::Boolean);
        assert_eq!(option_flag_string(&alpha2, &mut taken).as_deref(), Ok("-A, --alpha2"));
        let alpha3 = OptionSpec::new("alpha3", OptionType::Password);
        assert_eq!(
            option_flag_string(&alpha3, &mut taken).as_deref(),
            Ok("-alpha3, --alpha3 [password]")
        );
        let files = OptionSpec::new("files", OptionType::Variadic);
        assert_eq!(
            option_flag_string(&files, &mut taken).as_deref(),
            Ok("-f, --files <files...>")
        );
    }

    #[test]
    fn explicit_short_is_recorded() {
        let mut taken = HashSet::new();
        let mut tag = OptionSpec::new("tag", OptionType::Input);
        tag.name = OptionName::Pair("x".into(), "tag".into());
        assert_eq!(option_flag_string(&tag, &mut taken).as_deref(), Ok("-x, --tag <tag>"));
        assert!(taken.contains("x"));
    }

    #[test]
    fn file_names() {
        assert_eq!(filename_to_variable_name("/c/deploy-app.js"), "deployApp");
        assert_eq!(filename_to_command_name("Deploy_App.v2.js"), "deploy-app-v2");
        assert_eq!(argument_key("dry-run"), "dryRun");
        assert_eq!(argument_key("flag"), "flag");
    }
}
