#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn sentinel(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("sentinel").unwrap();
    cmd.current_dir(dir.path())
        .env("SENTINEL_ROOT", dir.path())
        .env_remove("SENTINEL_USER")
        .env_remove("RUST_LOG");
    cmd
}

fn init_project(dir: &TempDir) {
    sentinel(dir)
        .args(["init", "--project-id", "acme"])
        .assert()
        .success();
}

/// Initialized project with one milestone and one deliverable.
fn project_with_deliverable(dir: &TempDir) {
    init_project(dir);
    sentinel(dir)
        .args(["milestone", "create", "brand", "--title", "Brand refresh"])
        .assert()
        .success();
    sentinel(dir)
        .args([
            "deliverable", "create", "logo", "--milestone", "brand", "--name", "Logo concepts",
            "--visibility", "client",
        ])
        .assert()
        .success();
}

fn deliver(dir: &TempDir, id: &str) {
    sentinel(dir).args(["deliverable", "start", id]).assert().success();
    sentinel(dir)
        .args(["deliverable", "request-approval", id])
        .assert()
        .success()
        .stdout(predicate::str::contains("delivered"));
}

fn add_member(dir: &TempDir, id: &str, role: &str) {
    sentinel(dir)
        .args(["team", "invite", id, &format!("{id}@client.co"), "--role", role, "--id", id])
        .assert()
        .success();
    sentinel(dir)
        .args(["team", "activate", id])
        .assert()
        .success();
}

fn outbox_types(dir: &TempDir) -> Vec<String> {
    let out = sentinel(dir)
        .args(["outbox", "list", "--json"])
        .output()
        .unwrap();
    let events: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    events
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["type"].as_str().unwrap().to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_directory_tree() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    assert!(dir.path().join(".sentinel/deliverables").is_dir());
    assert!(dir.path().join(".sentinel/milestones").is_dir());
    assert!(dir.path().join(".sentinel/config.yaml").exists());

    let team = std::fs::read_to_string(dir.path().join(".sentinel/team.yaml")).unwrap();
    assert!(team.contains("id: owner"));
    assert!(team.contains("status: active"));
}

#[test]
fn init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    sentinel(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("exists:"));
}

#[test]
fn commands_before_init_fail() {
    let dir = TempDir::new().unwrap();
    sentinel(&dir)
        .args(["deliverable", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}

// ---------------------------------------------------------------------------
// approval workflow
// ---------------------------------------------------------------------------

#[test]
fn approve_delivered_deliverable() {
    let dir = TempDir::new().unwrap();
    project_with_deliverable(&dir);
    deliver(&dir, "logo");

    sentinel(&dir)
        .args(["deliverable", "approve", "logo", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"approved\""))
        .stdout(predicate::str::contains("\"is_approved\": true"));

    let manifest =
        std::fs::read_to_string(dir.path().join(".sentinel/deliverables/logo/manifest.yaml"))
            .unwrap();
    assert!(manifest.contains("is_approved: true"));

    let types = outbox_types(&dir);
    assert_eq!(types.first().map(String::as_str), Some("deliverable_added"));
    assert_eq!(types.last().map(String::as_str), Some("deliverable_updated"));
}

#[test]
fn approve_twice_emits_once() {
    let dir = TempDir::new().unwrap();
    project_with_deliverable(&dir);
    deliver(&dir, "logo");

    sentinel(&dir).args(["deliverable", "approve", "logo"]).assert().success();
    let before = outbox_types(&dir).len();
    sentinel(&dir)
        .args(["deliverable", "approve", "logo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("logo: approved"));
    assert_eq!(outbox_types(&dir).len(), before);
}

#[test]
fn reject_requires_feedback() {
    let dir = TempDir::new().unwrap();
    project_with_deliverable(&dir);
    deliver(&dir, "logo");

    sentinel(&dir)
        .args(["deliverable", "reject", "logo", "--feedback", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("feedback required"));

    sentinel(&dir)
        .args(["deliverable", "reject", "logo", "--feedback", "needs revisions"])
        .assert()
        .success()
        .stdout(predicate::str::contains("logo: rejected"));

    sentinel(&dir)
        .args(["deliverable", "show", "logo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("needs revisions"));
}

#[test]
fn owner_rejection_is_recorded_as_client_revision() {
    let dir = TempDir::new().unwrap();
    project_with_deliverable(&dir);
    deliver(&dir, "logo");
    sentinel(&dir)
        .args(["deliverable", "reject", "logo", "--feedback", "needs revisions"])
        .assert()
        .success();

    let out = sentinel(&dir)
        .args(["deliverable", "show", "logo", "--json"])
        .output()
        .unwrap();
    let d: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(d["revisions"][0]["author"], "client");
    assert_eq!(d["revisions"][0]["content"], "needs revisions");
}

#[test]
fn editor_revisions_are_admin_authored_unless_pinned() {
    let dir = TempDir::new().unwrap();
    project_with_deliverable(&dir);
    add_member(&dir, "ed", "editor");
    sentinel(&dir)
        .args([
            "team", "invite", "Cam", "cam@client.co", "--role", "editor", "--id", "cam", "--side",
            "client",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("(client)"));
    sentinel(&dir).args(["team", "activate", "cam"]).assert().success();
    sentinel(&dir).args(["deliverable", "start", "logo"]).assert().success();

    for who in ["ed", "cam"] {
        sentinel(&dir)
            .args(["--as", who, "deliverable", "submit-revision", "logo", "draft"])
            .assert()
            .success();
    }

    let out = sentinel(&dir)
        .args(["deliverable", "show", "logo", "--json"])
        .output()
        .unwrap();
    let d: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(d["revisions"][0]["author"], "admin");
    assert_eq!(d["revisions"][1]["author"], "client");
}

#[test]
fn request_revision_after_approval_reopens() {
    let dir = TempDir::new().unwrap();
    project_with_deliverable(&dir);
    deliver(&dir, "logo");
    sentinel(&dir).args(["deliverable", "approve", "logo"]).assert().success();

    sentinel(&dir)
        .args([
            "deliverable", "request-revision", "logo", "--comment", "please adjust spacing",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("logo: in_progress"));

    sentinel(&dir)
        .args(["feedback", "list", "logo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("please adjust spacing"));
}

#[test]
fn request_approval_before_start_is_illegal() {
    let dir = TempDir::new().unwrap();
    project_with_deliverable(&dir);

    sentinel(&dir)
        .args(["deliverable", "request-approval", "logo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot request approval from 'not_started'"));
}

#[test]
fn viewer_cannot_approve() {
    let dir = TempDir::new().unwrap();
    project_with_deliverable(&dir);
    add_member(&dir, "client", "viewer");
    deliver(&dir, "logo");

    sentinel(&dir)
        .args(["--as", "client", "deliverable", "approve", "logo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("permission denied"));
}

#[test]
fn path_like_ids_are_refused() {
    let dir = TempDir::new().unwrap();
    project_with_deliverable(&dir);

    sentinel(&dir)
        .args(["deliverable", "show", "../milestones/brand", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid id"));
    sentinel(&dir)
        .args(["feedback", "add", "../../outside", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid id"));
    sentinel(&dir)
        .args(["milestone", "complete", "../deliverables/logo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid id"));
}

#[test]
fn json_errors_report_their_kind() {
    let dir = TempDir::new().unwrap();
    project_with_deliverable(&dir);
    deliver(&dir, "logo");

    sentinel(&dir)
        .args(["deliverable", "reject", "logo", "--feedback", " ", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"kind\":\"validation\""));
    sentinel(&dir)
        .args(["feedback", "resolve", "logo", "FB9", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"kind\":\"not_found\""));
}

#[test]
fn last_active_owner_cannot_be_demoted_while_another_is_pending() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    sentinel(&dir)
        .args(["team", "invite", "Pat", "pat@studio.io", "--role", "owner", "--id", "pat"])
        .assert()
        .success();

    sentinel(&dir)
        .args(["team", "role", "owner", "editor"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot demote the last owner"));

    sentinel(&dir).args(["team", "activate", "pat"]).assert().success();
    sentinel(&dir)
        .args(["team", "role", "owner", "editor"])
        .assert()
        .success();
}

#[test]
fn pending_member_cannot_act() {
    let dir = TempDir::new().unwrap();
    project_with_deliverable(&dir);
    sentinel(&dir)
        .args(["team", "invite", "Pat", "pat@client.co", "--id", "pat"])
        .assert()
        .success();

    sentinel(&dir)
        .args(["--as", "pat", "deliverable", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not an active member"));
}

#[test]
fn editor_can_approve_when_configured() {
    let dir = TempDir::new().unwrap();
    project_with_deliverable(&dir);
    add_member(&dir, "ed", "editor");
    deliver(&dir, "logo");

    sentinel(&dir)
        .args(["--as", "ed", "deliverable", "approve", "logo"])
        .assert()
        .failure();

    let path = dir.path().join(".sentinel/config.yaml");
    let mut cfg: serde_yaml::Value =
        serde_yaml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    cfg["permissions"]["approver_roles"] = serde_yaml::from_str("[owner, editor]").unwrap();
    std::fs::write(&path, serde_yaml::to_string(&cfg).unwrap()).unwrap();

    sentinel(&dir)
        .args(["--as", "ed", "deliverable", "approve", "logo"])
        .assert()
        .success();
}

// ---------------------------------------------------------------------------
// feedback
// ---------------------------------------------------------------------------

#[test]
fn viewer_comments_and_owner_resolves() {
    let dir = TempDir::new().unwrap();
    project_with_deliverable(&dir);
    add_member(&dir, "client", "viewer");

    sentinel(&dir)
        .args(["--as", "client", "feedback", "add", "logo", "Can we try navy?"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[FB1]"));

    sentinel(&dir)
        .args(["--as", "client", "feedback", "resolve", "logo", "FB1"])
        .assert()
        .failure();

    sentinel(&dir)
        .args(["feedback", "resolve", "logo", "FB1"])
        .assert()
        .success();

    sentinel(&dir)
        .args(["feedback", "list", "logo", "--unresolved"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No feedback"));

    let types = outbox_types(&dir);
    assert!(types.contains(&"comment_added".to_string()));
}

#[test]
fn resolve_unknown_feedback_fails() {
    let dir = TempDir::new().unwrap();
    project_with_deliverable(&dir);

    sentinel(&dir)
        .args(["feedback", "resolve", "logo", "nonexistent-id"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("feedback not found"));
}

// ---------------------------------------------------------------------------
// visibility / milestones / revisions
// ---------------------------------------------------------------------------

#[test]
fn audience_filter_hides_internal_work() {
    let dir = TempDir::new().unwrap();
    project_with_deliverable(&dir);
    sentinel(&dir)
        .args([
            "deliverable", "create", "wireframes", "--milestone", "brand", "--name", "Wireframes",
        ])
        .assert()
        .success();

    sentinel(&dir)
        .args(["deliverable", "list", "--audience", "client"])
        .assert()
        .success()
        .stdout(predicate::str::contains("logo"))
        .stdout(predicate::str::contains("wireframes").not());
}

#[test]
fn deliverable_requires_existing_milestone() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    sentinel(&dir)
        .args(["deliverable", "create", "logo", "--milestone", "ghost", "--name", "Logo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("milestone not found"));
}

#[test]
fn milestone_completes_once_everything_is_approved() {
    let dir = TempDir::new().unwrap();
    project_with_deliverable(&dir);

    sentinel(&dir)
        .args(["milestone", "complete", "brand"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("every deliverable must be approved"));

    deliver(&dir, "logo");
    sentinel(&dir).args(["deliverable", "approve", "logo"]).assert().success();

    sentinel(&dir)
        .args(["milestone", "complete", "brand"])
        .assert()
        .success()
        .stdout(predicate::str::contains("complete"));

    sentinel(&dir)
        .args(["milestone", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("100%"));

    assert!(outbox_types(&dir).contains(&"milestone_completed".to_string()));
}

#[test]
fn revisions_are_recorded_and_marked_final() {
    let dir = TempDir::new().unwrap();
    project_with_deliverable(&dir);
    sentinel(&dir).args(["deliverable", "start", "logo"]).assert().success();

    sentinel(&dir)
        .args(["deliverable", "submit-revision", "logo", "Three concepts attached"])
        .assert()
        .success();
    sentinel(&dir)
        .args(["deliverable", "mark-final", "logo", "R1"])
        .assert()
        .success();
    sentinel(&dir)
        .args(["deliverable", "mark-final", "logo", "R9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("revision not found"));

    let out = sentinel(&dir)
        .args(["deliverable", "show", "logo", "--json"])
        .output()
        .unwrap();
    let d: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(d["revisions"][0]["content"], "Three concepts attached");
    assert!(d["revisions"][0]["marked_final_at"].is_string());

    assert!(outbox_types(&dir).contains(&"revision_added".to_string()));
}

#[test]
fn config_validate_passes_on_fresh_project() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    sentinel(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config OK"));
}
