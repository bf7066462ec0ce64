use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

struct Env {
    home: TempDir,
    config: PathBuf,
}

impl Env {
    fn with(rewrites: Value, projects: Value) -> Self {
        let home = TempDir::new().unwrap();
        let local_root = home.path().join("projects");
        fs::create_dir_all(&local_root).unwrap();

        let config = home.path().join("config.json");
        let doc = json!({
            "ssh_alias": "devbox",
            "paths": {
                "server": { "claude_projects": "/home/dev/.claude/projects" },
                "local": { "claude_projects": local_root.display().to_string() }
            },
            "rewrites": rewrites,
            "projects": projects,
            "transfer": { "timeout_secs": 5, "connect_timeout_secs": 1 }
        });
        fs::write(&config, serde_json::to_string_pretty(&doc).unwrap()).unwrap();
        Self { home, config }
    }

    fn standard() -> Self {
        Self::with(
            json!([
                { "server": "/home/dev", "local": "/Users/dev" },
                { "server": "-home-dev", "local": "-Users-dev" }
            ]),
            json!([
                { "name": "app", "server_dir": "-home-dev-app", "local_dir": "-Users-dev-app", "sync": "pull-only" },
                { "name": "shared", "server_dir": "-home-dev-shared", "local_dir": "-Users-dev-shared", "sync": "bidirectional" },
                { "name": "outbox", "server_dir": "-home-dev-outbox", "local_dir": "-Users-dev-outbox", "sync": "push-only" },
                { "name": "old", "server_dir": "-home-dev-old", "local_dir": "-Users-dev-old", "enabled": false }
            ]),
        )
    }

    fn bare(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("ssync"));
        cmd.env("HOME", self.home.path())
            .env_remove("SSYNC_CONFIG")
            .env_remove("RUST_LOG")
            .current_dir(self.home.path())
            // Keeps stderr to the structured error alone.
            .arg("--quiet");
        cmd
    }

    fn cmd(&self) -> Command {
        let mut cmd = self.bare();
        cmd.arg("--config").arg(&self.config);
        cmd
    }

    fn sample(&self, name: &str, content: &str) -> PathBuf {
        let path = self.home.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }
}

fn stderr_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stderr).expect("structured error on stderr")
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("json on stdout")
}

#[test]
fn list_reports_all_mappings() {
    let env = Env::standard();
    let output = env.cmd().arg("list").output().unwrap();
    assert!(output.status.success());

    let body = stdout_json(&output);
    assert_eq!(body["count"], 4);
    assert_eq!(body["ssh_alias"], "devbox");
    assert_eq!(body["projects"][0]["name"], "app");
    assert_eq!(body["projects"][0]["sync"], "pull-only");
    assert_eq!(body["projects"][1]["name"], "old");
    assert_eq!(body["projects"][1]["enabled"], false);
}

#[test]
fn no_color_output_has_no_ansi() {
    let env = Env::standard();
    env.cmd()
        .args(["--no-color", "list"])
        .assert()
        .success()
        .stdout(contains("app"))
        .stdout(predicate::str::contains("\u{1b}").not());
}

#[test]
fn unknown_project_exits_not_found() {
    let env = Env::standard();
    let output = env.cmd().args(["pull", "nope"]).output().unwrap();
    assert_eq!(output.status.code(), Some(3));

    let err = stderr_json(&output);
    assert_eq!(err["error"]["code"], "PROJECT_NOT_FOUND");
    assert_eq!(err["error"]["exit_code"], 3);
}

#[test]
fn disabled_project_is_not_found() {
    let env = Env::standard();
    env.cmd().args(["pull", "old"]).assert().code(3);
}

#[test]
fn push_to_pull_only_is_policy_violation() {
    let env = Env::standard();
    let output = env.cmd().args(["push", "app", "--yes"]).output().unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert_eq!(stderr_json(&output)["error"]["code"], "POLICY_VIOLATION");
}

#[test]
fn pull_from_push_only_is_policy_violation() {
    let env = Env::standard();
    env.cmd().args(["pull", "outbox"]).assert().code(4);
}

#[test]
fn unattended_push_requires_approval() {
    let env = Env::standard();
    let output = env.cmd().args(["push", "shared"]).output().unwrap();
    assert_eq!(output.status.code(), Some(5));
    assert_eq!(stderr_json(&output)["error"]["code"], "APPROVAL_REQUIRED");
}

#[test]
fn yes_does_not_approve_push_only() {
    let env = Env::standard();
    env.cmd().args(["push", "outbox", "--yes"]).assert().code(5);
}

#[test]
fn ambiguous_rules_fail_the_operation_not_the_config() {
    let env = Env::with(
        json!([
            { "server": "-var-tmp", "local": "-private-tmp" },
            { "server": "-var-tmp", "local": "-tmp" }
        ]),
        json!([{ "name": "app", "server_dir": "-home-dev-app", "local_dir": "-Users-dev-app" }]),
    );

    env.cmd().arg("list").assert().success();

    let output = env.cmd().args(["pull", "app"]).output().unwrap();
    assert_eq!(output.status.code(), Some(7));
    let err = stderr_json(&output);
    assert_eq!(err["error"]["code"], "CONFIG_ERROR");
    assert!(err["error"]["message"].as_str().unwrap().contains("-var-tmp"));
}

#[test]
fn invalid_rule_is_config_error() {
    let env = Env::with(
        json!([{ "server": "-same", "local": "-same" }]),
        json!([]),
    );
    env.cmd().arg("list").assert().code(7);
}

#[test]
fn missing_config_exits_not_found() {
    let env = Env::standard();
    let output = env
        .bare()
        .arg("--config")
        .arg(env.home.path().join("absent.json"))
        .arg("list")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert_eq!(stderr_json(&output)["error"]["code"], "CONFIG_NOT_FOUND");
}

#[test]
fn sync_all_with_nothing_to_pull_succeeds() {
    let env = Env::with(
        json!([{ "server": "-home-dev", "local": "-Users-dev" }]),
        json!([{ "name": "outbox", "server_dir": "-home-dev-o", "local_dir": "-Users-dev-o", "sync": "push-only" }]),
    );
    let output = env.cmd().arg("sync-all").output().unwrap();
    assert!(output.status.success());

    let body = stdout_json(&output);
    assert_eq!(body["total"], 0);
    assert_eq!(body["failed"], 0);
}

#[test]
fn verify_round_trip_is_identical() {
    let env = Env::standard();
    let sample = env.sample(
        "server.jsonl",
        "{\"cwd\":\"/home/dev/code/app\",\"dir\":\"-home-dev-app\"}\n{\"n\":1}\n",
    );

    let output = env.cmd().arg("verify").arg(&sample).output().unwrap();
    assert!(output.status.success());

    let body = stdout_json(&output);
    assert_eq!(body["identical"], true);
    assert_eq!(body["replacements"], 2);
    assert_eq!(body["direction"], "server-to-local");
}

#[test]
fn verify_reports_mismatch() {
    let env = Env::standard();
    // Already carries a local path, so the way back changes it.
    let sample = env.sample("mixed.jsonl", "{\"cwd\":\"/Users/dev/app\"}\n{\"n\":1}\n");

    let output = env.cmd().arg("verify").arg(&sample).output().unwrap();
    assert_eq!(output.status.code(), Some(6));

    let body = stdout_json(&output);
    assert_eq!(body["identical"], false);
    assert_eq!(body["differing_lines"], 1);
    assert_eq!(body["first_differences"][0]["line"], 1);
    assert_eq!(stderr_json(&output)["error"]["code"], "SYNC_FAILED");
}

#[test]
fn verify_from_local_side() {
    let env = Env::standard();
    let sample = env.sample("local.jsonl", "{\"cwd\":\"/Users/dev/app\"}\n");

    let output = env
        .cmd()
        .args(["verify", "--from", "local"])
        .arg(&sample)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["direction"], "local-to-server");
}

#[test]
fn status_lists_configured_projects_without_history() {
    let env = Env::standard();
    let output = env.cmd().arg("status").output().unwrap();
    assert!(output.status.success());

    let body = stdout_json(&output);
    assert_eq!(body["count"], 4);
    assert!(body["projects"][0].get("last_sync").is_none());
    assert!(!env.home.path().join(".session-sync/sync_status.json").exists());
}

#[test]
fn version_prints_json() {
    let env = Env::standard();
    let output = env.cmd().arg("version").output().unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["name"], "session-sync");
}

#[test]
fn setup_refuses_without_terminal() {
    let env = Env::standard();
    env.cmd().arg("setup").assert().code(4);
}

#[test]
fn completions_for_bash() {
    let env = Env::standard();
    env.cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(contains("ssync"));
}

#[test]
fn config_found_in_working_directory() {
    let env = Env::standard();
    // Runs from the temp home, where config.json lives.
    env.bare().arg("list").assert().success();
}

#[test]
fn derived_rules_need_an_absolute_server_root() {
    let env = Env::standard();
    let doc = json!({
        "ssh_alias": "devbox",
        "paths": {
            "server": { "claude_projects": "~/.claude/projects" },
            "local": { "claude_projects": "~/projects" }
        },
        "projects": []
    });
    fs::write(&env.config, doc.to_string()).unwrap();

    let output = env.cmd().arg("list").output().unwrap();
    assert_eq!(output.status.code(), Some(7));
    let err = stderr_json(&output);
    assert_eq!(err["error"]["code"], "CONFIG_ERROR");
    assert!(err["error"]["message"]
        .as_str()
        .unwrap()
        .contains("paths.server.claude_projects"));
}

#[test]
fn derived_root_rule_matches_expanded_local_root() {
    let env = Env::standard();
    let doc = json!({
        "ssh_alias": "devbox",
        "paths": {
            "server": { "claude_projects": "/home/dev/.claude/projects" },
            "local": { "claude_projects": "~/projects" }
        },
        "projects": []
    });
    fs::write(&env.config, doc.to_string()).unwrap();
    // Session content carries the expanded root, never `~`.
    let local_root = env.home.path().join("projects");
    let sample = env.sample(
        "local.jsonl",
        &format!("{{\"cwd\":\"{}/-Users-dev-app\"}}\n", local_root.display()),
    );

    let output = env
        .cmd()
        .args(["verify", "--from", "local"])
        .arg(&sample)
        .output()
        .unwrap();
    assert!(output.status.success());
    let body = stdout_json(&output);
    assert_eq!(body["replacements"], 1);
    assert_eq!(body["identical"], true);
}
