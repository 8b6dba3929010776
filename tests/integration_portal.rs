//! Integration tests for the portal-backed commands' configuration guards.

mod common;

use common::TestRepo;
use predicates::prelude::*;
use std::fs;

#[test]
fn regress_without_portal_section_fails_with_guidance() {
    let repo = TestRepo::new(&[]);

    repo.command()
        .arg("regress")
        .arg("OLD_TASK_1234")
        .arg("params.json")
        .arg("--view")
        .arg("group_by_spectrum")
        .assert()
        .failure()
        .stderr(predicate::str::contains("[portal]"));
}

#[test]
fn regress_with_unreadable_params_file_fails_before_submission() {
    let repo = TestRepo::new(&[]);
    let config = fs::read_to_string(repo.config_path()).unwrap();
    fs::write(
        repo.config_path(),
        format!("{config}\n[portal]\nbase_url = \"https://portal.invalid/ProteoSAFe\"\n"),
    )
    .unwrap();

    repo.command()
        .arg("regress")
        .arg("OLD_TASK_1234")
        .arg("missing-params.json")
        .arg("--view")
        .arg("group_by_spectrum")
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing-params.json"));
}

#[test]
fn watch_without_portal_section_fails_with_guidance() {
    let repo = TestRepo::new(&[]);

    repo.command()
        .arg("watch")
        .arg("SOME_TASK_1234")
        .assert()
        .failure()
        .stderr(predicate::str::contains("[portal]"));
}
