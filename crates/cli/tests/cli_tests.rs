// End-to-end tests for the `rmerge` binary.
//
// Every test gets its own session directory and config home so runs never
// see each other's state or the developer's settings.
//
// Run with: cargo test -p rostermerge-cli --test cli_tests -- --nocapture

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use httpmock::prelude::*;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

struct Env {
    home: tempfile::TempDir,
}

impl Env {
    fn new() -> Self {
        Self { home: tempfile::tempdir().unwrap() }
    }

    fn session_dir(&self) -> PathBuf {
        self.home.path().join("session")
    }

    fn rmerge(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_rmerge"));
        cmd.env("HOME", self.home.path())
            .env("XDG_CONFIG_HOME", self.home.path().join("config"))
            .env("ROSTERMERGE_SESSION_DIR", self.session_dir())
            .env_remove("ROSTERMERGE_API_BASE_URL")
            .env_remove("RUST_LOG");
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        self.rmerge().args(args).output().expect("spawn rmerge")
    }

    fn load_fixtures(&self) {
        let out = self.run(&[
            "load",
            "--onesite",
            fixture("onesite.json").to_str().unwrap(),
            "--apricot",
            fixture("apricot.json").to_str().unwrap(),
        ]);
        assert_success(&out);
    }
}

fn assert_success(out: &Output) {
    assert!(
        out.status.success(),
        "exit code: {:?}\nstdout: {}\nstderr: {}",
        out.status,
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr),
    );
}

fn stdout_json(out: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&out.stdout);
    serde_json::from_str(stdout.trim())
        .unwrap_or_else(|e| panic!("stdout must be valid JSON: {e}\n{stdout}"))
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

// ===========================================================================
// load / columns
// ===========================================================================

#[test]
fn load_then_columns_json() {
    let env = Env::new();
    env.load_fixtures();

    let out = env.run(&["columns", "--json"]);
    assert_success(&out);
    let json = stdout_json(&out);
    assert_eq!(json["onesite"], serde_json::json!(["Name", "DOB", "Building", "Unit"]));
    assert_eq!(json["apricot"], serde_json::json!(["FullName", "BirthDate", "Property"]));

    assert!(env.session_dir().join("onesiteData.json").exists());
    assert!(env.session_dir().join("apricotData.json").exists());
}

#[test]
fn load_without_files_is_usage_error() {
    let env = Env::new();
    let out = env.run(&["load"]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn load_missing_file_is_io_error() {
    let env = Env::new();
    let out = env.run(&["load", "--onesite", "/nonexistent/onesite.json"]);
    assert_eq!(out.status.code(), Some(3));
}

// ===========================================================================
// pairs
// ===========================================================================

#[test]
fn pairs_set_grows_add_slot_and_persists() {
    let env = Env::new();
    env.load_fixtures();

    assert_success(&env.run(&["pairs", "set", "1", "onesite", "Name"]));
    assert_success(&env.run(&["pairs", "set", "1", "apricot", "FullName"]));
    assert_success(&env.run(&["pairs", "set", "2", "onesite", "DOB"]));

    let out = env.run(&["pairs", "show", "--json"]);
    assert_success(&out);
    let json = stdout_json(&out);
    assert_eq!(
        json["pairs"],
        serde_json::json!([
            { "onesite": "Name", "apricot": "FullName" },
            { "onesite": "DOB", "apricot": "" }
        ])
    );
    assert_eq!(json["valid"].as_array().unwrap().len(), 1);
    assert_eq!(json["can_proceed"], true);
}

#[test]
fn pairs_set_unknown_column_rejected() {
    let env = Env::new();
    env.load_fixtures();

    let out = env.run(&["pairs", "set", "1", "apricot", "Nope"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("unknown apricot column 'Nope'"), "{}", stderr(&out));
}

#[test]
fn pairs_set_without_datasets_reports_missing_data() {
    let env = Env::new();
    let out = env.run(&["pairs", "set", "1", "onesite", "Name"]);
    assert_eq!(out.status.code(), Some(12));
}

#[test]
fn pairs_out_of_range_number_is_usage_error() {
    let env = Env::new();
    env.load_fixtures();
    let out = env.run(&["pairs", "remove", "5"]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn pairs_clearing_a_pair_reports_renumbering() {
    let env = Env::new();
    env.load_fixtures();
    assert_success(&env.run(&["pairs", "set", "1", "onesite", "Name"]));
    assert_success(&env.run(&["pairs", "set", "1", "apricot", "FullName"]));
    assert_success(&env.run(&["pairs", "set", "2", "onesite", "DOB"]));

    let out = env.run(&["pairs", "set", "1", "onesite", ""]);
    assert_success(&out);
    assert!(!stderr(&out).contains("renumbered"));

    let out = env.run(&["pairs", "set", "1", "apricot", ""]);
    assert_success(&out);
    assert!(stderr(&out).contains("pair 1 is now empty"), "{}", stderr(&out));

    let json = stdout_json(&env.run(&["pairs", "show", "--json"]));
    assert_eq!(json["pairs"], serde_json::json!([{ "onesite": "DOB", "apricot": "" }]));
}

#[test]
fn pairs_remove_add_slot_is_noop() {
    let env = Env::new();
    env.load_fixtures();
    assert_success(&env.run(&["pairs", "set", "1", "onesite", "Name"]));
    assert_success(&env.run(&["pairs", "set", "1", "apricot", "FullName"]));

    let out = env.run(&["pairs", "remove", "2"]);
    assert_success(&out);
    assert!(stderr(&out).contains("add slot"));

    let json = stdout_json(&env.run(&["pairs", "show", "--json"]));
    assert_eq!(json["pairs"].as_array().unwrap().len(), 2);
}

// ===========================================================================
// run
// ===========================================================================

#[test]
fn run_without_valid_pairs_refused_before_request() {
    let env = Env::new();
    env.load_fixtures();

    let server = MockServer::start();
    let merge_mock = server.mock(|when, then| {
        when.method(POST).path("/merge/");
        then.status(200).json_body(serde_json::json!({}));
    });

    let out = env.run(&["run", "--api-base", &server.base_url()]);
    assert_eq!(out.status.code(), Some(20));
    assert!(stderr(&out).contains("hint:"));
    merge_mock.assert_calls(0);
}

#[test]
fn run_against_service_filters_and_exports() {
    let env = Env::new();
    env.load_fixtures();
    assert_success(&env.run(&["pairs", "set", "1", "onesite", "Name"]));
    assert_success(&env.run(&["pairs", "set", "1", "apricot", "FullName"]));
    assert_success(&env.run(&["pairs", "set", "2", "onesite", "DOB"]));

    let response = std::fs::read_to_string(fixture("response.json")).unwrap();
    let server = MockServer::start();
    let merge_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/merge/")
            .body_includes(r#""merge_columns":[{"onesite":"Name","apricot":"FullName"}]"#);
        then.status(200)
            .header("content-type", "application/json")
            .body(response);
    });

    let export_dir = env.home.path().join("out");
    let out = env.run(&[
        "run",
        "--api-base",
        &server.base_url(),
        "--primary",
        "Jubilee Park",
        "--export",
        export_dir.to_str().unwrap(),
        "--json",
    ]);
    assert_success(&out);
    merge_mock.assert();

    let json = stdout_json(&out);
    assert_eq!(json["categories"][0]["category"], "matched");
    assert_eq!(json["categories"][0]["total"], 2);
    assert_eq!(json["categories"][0]["visible"], 1);
    assert_eq!(json["categories"][1]["visible"], 0);

    // Export ignores the filter and skips empty categories
    assert_eq!(json["export"]["written"].as_array().unwrap().len(), 2);
    assert_eq!(json["export"]["skipped"], serde_json::json!(["name_matched", "dob_matched"]));
    let matched = std::fs::read_to_string(export_dir.join("matched.csv")).unwrap();
    assert_eq!(matched.lines().count(), 3);
    assert!(!matched.contains("Matched in both"));
    assert!(!export_dir.join("dob_matched.csv").exists());
}

#[test]
fn run_service_failure_reports_fetch_message() {
    let env = Env::new();
    env.load_fixtures();
    assert_success(&env.run(&["pairs", "set", "1", "onesite", "Name"]));
    assert_success(&env.run(&["pairs", "set", "1", "apricot", "FullName"]));

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/merge/");
        then.status(500).json_body(serde_json::json!({ "detail": "KeyError: 'Property'" }));
    });

    let out = env.run(&["run", "--api-base", &server.base_url()]);
    assert_eq!(out.status.code(), Some(31));
    let err = stderr(&out);
    assert!(err.contains("Failed to fetch merge results."), "{err}");
    // Cause goes to the log
    assert!(err.contains("KeyError: 'Property'"), "{err}");
}

#[test]
fn run_from_saved_response_with_and_filter() {
    let env = Env::new();
    let out = env.run(&[
        "run",
        "--input",
        fixture("response.json").to_str().unwrap(),
        "--primary",
        "Jubilee Park",
        "--secondary",
        "Ontario Court",
        "--mode",
        "and",
        "--category",
        "matched",
    ]);
    assert_success(&out);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("All Matched: 0 of 2 row(s)"), "{stdout}");
    assert!(!stdout.contains("Unmatched:"));
}

#[test]
fn run_output_saves_raw_response() {
    let env = Env::new();
    let saved = env.home.path().join("saved.json");
    let out = env.run(&[
        "run",
        "--input",
        fixture("response.json").to_str().unwrap(),
        "--output",
        saved.to_str().unwrap(),
    ]);
    assert_success(&out);

    let original: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(fixture("response.json")).unwrap()).unwrap();
    let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&saved).unwrap()).unwrap();
    assert_eq!(original, written);
}

// ===========================================================================
// session
// ===========================================================================

#[test]
fn session_clear_drops_everything() {
    let env = Env::new();
    env.load_fixtures();
    assert_success(&env.run(&["pairs", "set", "1", "onesite", "Name"]));

    let json = stdout_json(&env.run(&["session", "show", "--json"]));
    let keys: Vec<&str> = json["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["apricotData", "mergePairs", "onesiteData"]);

    assert_success(&env.run(&["session", "clear"]));
    let json = stdout_json(&env.run(&["session", "show", "--json"]));
    assert!(json["entries"].as_array().unwrap().is_empty());
    assert!(!Path::new(&env.session_dir().join("mergePairs.json")).exists());
}
