//! End-to-end CLI tests for zli.
//!
//! The fixture tree runs its command files with `node`. Tests that get as
//! far as running a file return early when `node` is not on `PATH`.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// The zli binary started in `dir` with a clean environment.
fn zli_in(dir: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("zli");
    cmd.current_dir(dir)
        .env_remove("ZLI_CONFIG")
        .env_remove("ZLI_LOG")
        .env("NO_COLOR", "1");
    cmd
}

/// Whether `node` can be started; commands are executed through it.
fn node_available() -> bool {
    std::process::Command::new("node")
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}

macro_rules! require_node {
    () => {
        if !node_available() {
            eprintln!("node not found, skipping");
            return;
        }
    };
}

fn copy_dir(from: &Path, to: &Path) {
    fs::create_dir_all(to).expect("mkdir");
    for entry in fs::read_dir(from).expect("read fixture dir") {
        let entry = entry.expect("entry");
        let target = to.join(entry.file_name());
        if entry.file_type().expect("file type").is_dir() {
            copy_dir(&entry.path(), &target);
        } else {
            fs::copy(entry.path(), target).expect("copy");
        }
    }
}

/// Writable copy of the `basic` fixture.
fn basic_copy() -> TempDir {
    let temp = TempDir::new().expect("temp dir");
    copy_dir(&fixtures_path().join("basic"), temp.path());
    temp
}

// ============================================
// Help and introspection
// ============================================

mod introspection {
    use super::*;

    #[test]
    fn root_help_lists_discovered_commands() {
        zli_in(&fixtures_path().join("basic"))
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("fixture root"))
            .stdout(predicate::str::contains("deploy"))
            .stdout(predicate::str::contains("sub"))
            .stdout(predicate::str::contains("should-not-appear").not());
    }

    #[test]
    fn subcommand_help_renders_short_flags() {
        zli_in(&fixtures_path().join("basic"))
            .args(["sub", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("-f, --flag"))
            .stdout(predicate::str::contains("greet"));
    }

    #[test]
    fn runtime_sensitive_help_mentions_default() {
        zli_in(&fixtures_path().join("basic"))
            .args(["deploy", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("defaults to staging"));
    }

    #[test]
    fn arg_name_map() {
        zli_in(&fixtures_path().join("basic"))
            .arg("--show-arg-name-map")
            .assert()
            .success()
            .stdout(predicate::str::contains("> root\n"))
            .stdout(predicate::str::contains("root > sub\n----> -f, --flag => flag\n"))
            .stdout(predicate::str::contains(
                "sub > greet\n----> -n, --name <name> => name\n----> -l, --loud => loud\n",
            ));
    }

    #[test]
    fn show_deps() {
        zli_in(&fixtures_path().join("basic"))
            .arg("--show-deps")
            .assert()
            .success()
            .stdout(predicate::str::contains("sub/greet.js: echo, tr"))
            .stdout(predicate::str::contains("deploy.js: (no dependencies declared)"));
    }

    #[test]
    fn print_opts_regenerates_the_literal() {
        zli_in(&fixtures_path().join("basic"))
            .args(["--print-opts", "cli/commands/deploy.js"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"deploy\""))
            .stdout(predicate::str::contains("requiresRunTime"))
            .stdout(predicate::str::contains("RUNTIMES.STAGING"));
    }

    #[test]
    fn print_opts_without_opts_fails() {
        zli_in(&fixtures_path().join("basic"))
            .args(["--print-opts", "cli/commands/notes.js"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("does not export OPTS"));
    }
}

// ============================================
// Dispatch
// ============================================

mod dispatch {
    use super::*;

    #[test]
    fn runs_the_matched_file_with_globals_and_args() {
        require_node!();
        zli_in(&fixtures_path().join("basic"))
            .args(["sub", "greet", "--name", "ada"])
            .assert()
            .success()
            .stdout(predicate::str::contains("hello ada from platform"));
        zli_in(&fixtures_path().join("basic"))
            .args(["sub", "greet", "--name", "ada", "-l"])
            .assert()
            .success()
            .stdout(predicate::str::contains("HELLO ADA FROM PLATFORM"));
    }

    #[test]
    fn runtime_default_lets_command_run() {
        require_node!();
        zli_in(&fixtures_path().join("basic"))
            .arg("deploy")
            .assert()
            .success()
            .stdout(predicate::str::contains("deploying v1 to staging"));
    }

    #[test]
    fn runtime_helpers_see_the_selected_flag() {
        require_node!();
        zli_in(&fixtures_path().join("basic"))
            .args(["deploy", "--tag", "v2", "--local"])
            .assert()
            .success()
            .stdout(predicate::str::contains("deploying v2 to local"));
    }

    #[test]
    fn missing_runtime_flag_exits_1() {
        zli_in(&fixtures_path().join("basic"))
            .arg("release")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Missing required run time flag."));
    }

    #[test]
    fn runtime_flag_is_accepted_after_the_command() {
        require_node!();
        zli_in(&fixtures_path().join("basic"))
            .args(["release", "--local"])
            .assert()
            .success()
            .stdout(predicate::str::contains("releasing from commands on local"));
    }

    #[test]
    fn missing_required_option_exits_1() {
        zli_in(&fixtures_path().join("basic"))
            .args(["sub", "greet"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Missing required argument(s): name"));
    }

    #[test]
    fn invalid_choice_is_rejected_by_the_parser() {
        zli_in(&fixtures_path().join("basic"))
            .args(["deploy", "--tag", "v9"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("v9"));
    }
}

// ============================================
// Discovery failures
// ============================================

mod failures {
    use super::*;

    #[test]
    fn syntax_error_aborts_before_dispatch() {
        let temp = basic_copy();
        fs::write(
            temp.path().join("cli/commands/broken.js"),
            "export const OPTS = {\n  name: 'broken',\n",
        )
        .expect("write");

        zli_in(temp.path())
            .args(["sub", "greet", "--name", "ada"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("hello ada").not())
            .stderr(predicate::str::contains("Error:"))
            .stderr(predicate::str::contains("broken.js"));
    }

    #[test]
    fn malformed_descriptor_prints_generated_source() {
        let temp = basic_copy();
        fs::write(
            temp.path().join("cli/commands/odd.js"),
            "export const OPTS = { name: 'odd', options: 'nope' };\n",
        )
        .expect("write");

        zli_in(temp.path())
            .arg("--show-arg-name-map")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("follow conventions"))
            .stderr(predicate::str::contains("\"nope\""));
    }

    #[test]
    fn malformed_config_exits_1() {
        let temp = basic_copy();
        fs::write(temp.path().join(".zli.toml"), "root = [\n").expect("write");

        zli_in(temp.path())
            .arg("--show-arg-name-map")
            .assert()
            .code(1)
            .stderr(predicate::str::contains(".zli.toml"));
    }
}

// ============================================
// Cache and scaffolding
// ============================================

mod cache {
    use super::*;

    #[test]
    fn cached_tree_is_used_until_fresh() {
        let temp = basic_copy();
        zli_in(temp.path())
            .arg("--write-cache")
            .assert()
            .success()
            .stdout(predicate::str::contains(".zli-cache.js"));
        assert!(temp.path().join("cli/.zli-cache.js").is_file());

        fs::remove_file(temp.path().join("cli/commands/release.js")).expect("remove");

        zli_in(temp.path())
            .arg("--show-arg-name-map")
            .assert()
            .success()
            .stdout(predicate::str::contains("root > release"));

        zli_in(temp.path())
            .args(["--fresh", "--show-arg-name-map"])
            .assert()
            .success()
            .stdout(predicate::str::contains("root > release").not());
    }

    #[test]
    fn cached_tree_dispatches() {
        require_node!();
        let temp = basic_copy();
        zli_in(temp.path()).arg("--write-cache").assert().success();
        zli_in(temp.path())
            .args(["sub", "greet", "--name", "ada", "--loud"])
            .assert()
            .success()
            .stdout(predicate::str::contains("HELLO ADA"));
    }
}

mod configure {
    use super::*;

    #[test]
    fn seeds_config_and_commands() {
        let temp = TempDir::new().expect("temp dir");
        zli_in(temp.path())
            .args(["--configure", "--root", "cli", "--executable", "ops"])
            .assert()
            .success()
            .stdout(predicate::str::contains(".zli.toml"));

        let config = fs::read_to_string(temp.path().join(".zli.toml")).expect("config");
        assert!(config.contains("root = \"cli\""));
        assert!(temp.path().join("cli/commands/index.js").is_file());

        zli_in(temp.path())
            .arg("--show-arg-name-map")
            .assert()
            .success()
            .stdout(predicate::str::contains("> ops\n"))
            .stdout(predicate::str::contains("ops > show-globals"));
    }

    #[test]
    fn seeded_command_runs() {
        require_node!();
        let temp = TempDir::new().expect("temp dir");
        zli_in(temp.path()).arg("--configure").assert().success();

        zli_in(temp.path())
            .args(["show-globals", "--list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("OPTION_TYPES\n"))
            .stdout(predicate::str::contains("RUNTIMES\n"))
            .stdout(predicate::str::contains("_z\n"))
            .stderr(predicate::str::contains("ReferenceError").not());

        zli_in(temp.path())
            .arg("show-globals")
            .assert()
            .success()
            .stdout(predicate::str::contains("RUNTIMES (object): {"))
            .stdout(predicate::str::contains("\"LOCAL\":\"local\""));
    }

    #[test]
    fn refuses_existing_config() {
        let temp = TempDir::new().expect("temp dir");
        zli_in(temp.path()).arg("--configure").assert().success();
        zli_in(temp.path())
            .arg("--configure")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("--overwrite"));
        zli_in(temp.path())
            .args(["--configure", "--overwrite"])
            .assert()
            .success();
    }
}
