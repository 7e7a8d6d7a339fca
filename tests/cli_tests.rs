#![cfg(feature = "cli")]

use assert_cmd::Command;
use predicates::str::contains as str_contains;
use tempfile::NamedTempFile;

const SETUP: &str = "person add p1 31 Ada Lovelace\n\
person add p2 - Bob Stone\n\
role add r1 #1F77B4 Engineer\n\
product add d1 Sales\n\
assign p1 d1 r1 10\n";

#[allow(deprecated)]
fn run_cli(script: &str) -> assert_cmd::assert::Assert {
    let mut cmd = Command::cargo_bin("cli").expect("cli binary");
    cmd.write_stdin(script.to_string()).assert()
}

#[test]
fn cli_builds_records_and_assigns() {
    run_cli(&format!("{SETUP}quit\n"))
        .success()
        .stdout(str_contains("Person p1 added."))
        .stdout(str_contains("Role r1 added."))
        .stdout(str_contains("Data product d1 added."))
        .stdout(str_contains("Assigned p1 to d1 as r1."));
}

#[test]
fn cli_assembles_team_from_requirements() {
    run_cli(&format!("{SETUP}team r1:8\nquit\n"))
        .success()
        .stdout(str_contains("Ada Lovelace"))
        .stdout(str_contains("Total 8h, feasible: yes"));
}

#[test]
fn cli_warns_when_a_person_fills_two_rows() {
    run_cli(&format!("{SETUP}team r1:5 r1:5\nquit\n"))
        .success()
        .stdout(str_contains("Warning: p1 appears in more than one role"));
}

#[test]
fn cli_reports_requirement_validation_errors() {
    run_cli(&format!("{SETUP}recommend r1:0\nquit\n"))
        .success()
        .stdout(str_contains(
            "Error: invalid requirements: requirement 1: hours must be greater than 0",
        ));
}

#[test]
fn cli_refuses_to_delete_role_in_use() {
    run_cli(&format!("{SETUP}delete role r1\nunassign p1 d1 r1\ndelete role r1\nquit\n"))
        .success()
        .stdout(str_contains(
            "Error: role 'r1' is still used by 1 assignment(s)",
        ))
        .stdout(str_contains("Removed assignment p1/d1/r1."))
        .stdout(str_contains("Deleted role r1."));
}

#[test]
fn cli_save_and_load_json_round_trip() {
    let tmp = NamedTempFile::new().expect("create temp file");
    let path = tmp.path().to_string_lossy().replace('\\', "\\\\");
    let script = format!(
        "{SETUP}save json {path}\nperson add p9 - Temporary\nload json {path}\nshow persons\nquit\n"
    );
    let assert = run_cli(&script).success();
    let output = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(
        output.contains("Planner loaded from"),
        "expected output to mention load completion"
    );
    let after_reload = output
        .split("Planner loaded from")
        .last()
        .unwrap_or_default();
    assert!(after_reload.contains("Ada Lovelace"));
    assert!(
        !after_reload.contains("Temporary"),
        "temporary person should not appear after reload:\n{}",
        after_reload
    );
}

#[test]
fn cli_unknown_command_hints_help() {
    run_cli("frobnicate\nquit\n")
        .success()
        .stdout(str_contains("Unknown command. Type 'help'."));
}
