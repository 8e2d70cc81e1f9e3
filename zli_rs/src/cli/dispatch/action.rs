//! Uniform action handler run for every matched command.

use serde_json::Value as Json;

use super::{CommandRunner, DispatchError, Invocation, ValidationErrors};
use crate::naming::argument_key;
use crate::types::{Runtime, RuntimeFlags};

/// What the caller should do once the handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Print help for the matched command and exit 0.
    ShowHelp,
    /// The command ran; exit with its status.
    Exited(i32),
}

/// Run the checks and hooks for `invocation`, then hand it to `runner`.
///
/// Order: help on empty invocation, runtime requirement, validation hook
/// plus required options, `beforeRun`, run.
pub fn run_action(
    mut invocation: Invocation,
    runner: &dyn CommandRunner,
) -> Result<ActionOutcome, DispatchError> {
    let Some(file_path) = invocation.node.file_path.clone() else {
        return Ok(ActionOutcome::ShowHelp);
    };
    if invocation.node.shows_help_when_no_args() && invocation.args.is_empty() {
        return Ok(ActionOutcome::ShowHelp);
    }

    if let Some(requirement) = &invocation.node.requires_run_time
        && invocation.runtime.is_empty()
    {
        let default = requirement.default.ok_or(DispatchError::MissingRuntime)?;
        tracing::debug!("no runtime flag given, defaulting to {default}");
        invocation.runtime = RuntimeFlags::new([default]);
    }
    if invocation.runtime.contains(Runtime::Production) {
        tracing::warn!("running with production flag toggled");
    }

    let mut errors = Vec::new();
    if let Some(hook) = &invocation.node.validate {
        let messages =
            runner
                .validate(hook, &invocation)
                .map_err(|source| DispatchError::Hook {
                    hook: "validation",
                    path: file_path.clone(),
                    source,
                })?;
        errors.extend(messages);
    }
    let missing: Vec<&str> = invocation
        .node
        .options()
        .iter()
        .filter(|option| option.required)
        .map(|option| option.name.long())
        .filter(|long| !invocation.args.contains_key(&argument_key(long)))
        .collect();
    if !missing.is_empty() {
        errors.push(format!("Missing required argument(s): {}", missing.join(", ")));
    }
    if !errors.is_empty() {
        return Err(DispatchError::Validation(ValidationErrors(errors)));
    }

    if let Some(hook) = invocation.node.before_run.clone() {
        let extra = runner
            .before_run(&hook, &invocation)
            .map_err(|source| DispatchError::Hook {
                hook: "beforeRun",
                path: file_path.clone(),
                source,
            })?;
        for (key, value) in extra {
            invocation.args.insert(key, value);
        }
    }

    let status = runner
        .run(&invocation)
        .map_err(|source| DispatchError::Run {
            path: file_path,
            source,
        })?;
    Ok(ActionOutcome::Exited(status))
}

/// Normalize a validation hook result into messages.
pub(crate) fn validation_messages(result: Json) -> Vec<String> {
    match result {
        Json::Null => Vec::new(),
        Json::Array(items) => items
            .into_iter()
            .filter(|item| !item.is_null())
            .map(|item| match item {
                Json::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        Json::String(s) if s.is_empty() => Vec::new(),
        Json::String(s) => vec![s],
        other => vec![other.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::dispatch::ArgMap;
    use crate::types::{
        CommandDescriptor, Hook, OptionSpec, OptionType, RuntimeRequirement,
    };
    use std::cell::RefCell;
    use std::path::PathBuf;

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<String>>,
        validation: Vec<String>,
        extra: ArgMap,
        ran_with: RefCell<Option<Invocation>>,
    }

    impl CommandRunner for Recorder {
        fn validate(&self, _hook: &Hook, _invocation: &Invocation) -> anyhow::Result<Vec<String>> {
            self.calls.borrow_mut().push("validate".into());
            Ok(self.validation.clone())
        }

        fn before_run(&self, _hook: &Hook, _invocation: &Invocation) -> anyhow::Result<ArgMap> {
            self.calls.borrow_mut().push("beforeRun".into());
            Ok(self.extra.clone())
        }

        fn run(&self, invocation: &Invocation) -> anyhow::Result<i32> {
            self.calls.borrow_mut().push("run".into());
            *self.ran_with.borrow_mut() = Some(invocation.clone());
            Ok(0)
        }
    }

    fn invocation(node: CommandDescriptor) -> Invocation {
        Invocation {
            command_path: vec!["root".into(), node.name.clone()],
            node,
            args: ArgMap::new(),
            runtime: RuntimeFlags::default(),
            verbose: false,
        }
    }

    fn command() -> CommandDescriptor {
        CommandDescriptor {
            name: "deploy".into(),
            file_path: Some(PathBuf::from("/c/deploy.js")),
            ..CommandDescriptor::default()
        }
    }

    #[test]
    fn placeholder_shows_help() {
        let recorder = Recorder::default();
        let outcome = run_action(
            invocation(CommandDescriptor::placeholder("dir")),
            &recorder,
        )
        .expect("help");
        assert_eq!(outcome, ActionOutcome::ShowHelp);
        assert!(recorder.calls.borrow().is_empty());
    }

    #[test]
    fn help_when_no_args() {
        let mut node = command();
        node.show_help_when_no_args = Some(true);
        let outcome = run_action(invocation(node), &Recorder::default()).expect("help");
        assert_eq!(outcome, ActionOutcome::ShowHelp);
    }

    #[test]
    fn runtime_default_is_applied() {
        let mut node = command();
        node.requires_run_time = Some(RuntimeRequirement {
            default: Some(Runtime::Local),
        });
        let recorder = Recorder::default();
        run_action(invocation(node), &recorder).expect("runs");
        let ran = recorder.ran_with.borrow().clone().expect("ran");
        assert!(ran.runtime.contains(Runtime::Local));
    }

    #[test]
    fn missing_runtime_fails() {
        let mut node = command();
        node.requires_run_time = Some(RuntimeRequirement { default: None });
        let recorder = Recorder::default();
        let err = run_action(invocation(node), &recorder).expect_err("no runtime");
        assert_eq!(err.to_string(), "Missing required run time flag.");
        assert!(recorder.calls.borrow().is_empty());
    }

    #[test]
    fn validation_and_required_options_are_reported_together() {
        let mut node = command();
        node.validate = Some(Hook::new("(args) => ['bad tag']"));
        let mut region = OptionSpec::new("region", OptionType::Input);
        region.required = true;
        let mut dry = OptionSpec::new("dry-run", OptionType::Boolean);
        dry.required = true;
        node.options = Some(vec![region, dry]);

        let recorder = Recorder {
            validation: vec!["bad tag".into()],
            ..Recorder::default()
        };
        let err = run_action(invocation(node), &recorder).expect_err("invalid");
        let DispatchError::Validation(ValidationErrors(messages)) = err else {
            panic!("expected validation errors");
        };
        assert_eq!(
            messages,
            vec![
                "bad tag".to_string(),
                "Missing required argument(s): region, dry-run".to_string()
            ]
        );
        assert_eq!(*recorder.calls.borrow(), vec!["validate".to_string()]);
    }

    #[test]
    fn before_run_result_is_merged() {
        let mut node = command();
        node.before_run = Some(Hook::new("(args) => ({ stamped: true })"));
        let mut extra = ArgMap::new();
        extra.insert("stamped".into(), Json::Bool(true));
        let recorder = Recorder {
            extra,
            ..Recorder::default()
        };
        let mut inv = invocation(node);
        inv.args.insert("tag".into(), Json::String("v1".into()));
        let outcome = run_action(inv, &recorder).expect("runs");
        assert_eq!(outcome, ActionOutcome::Exited(0));
        assert_eq!(
            *recorder.calls.borrow(),
            vec!["beforeRun".to_string(), "run".to_string()]
        );
        let ran = recorder.ran_with.borrow().clone().expect("ran");
        assert_eq!(ran.args.get("stamped"), Some(&Json::Bool(true)));
        assert_eq!(ran.args.get("tag"), Some(&Json::String("v1".into())));
    }

    #[test]
    fn hook_results_normalize_to_messages() {
        assert!(validation_messages(Json::Null).is_empty());
        assert_eq!(
            validation_messages(serde_json::json!(["a", null, 2])),
            vec!["a".to_string(), "2".to_string()]
        );
        assert_eq!(validation_messages(serde_json::json!("oops")), vec!["oops".to_string()]);
    }
}
