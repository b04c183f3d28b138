//! CLI integration tests for taskdeck
//!
//! These tests drive the `deck` binary end to end, from initialization
//! through task lifecycle, queries and statistics.

use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get a command instance for the deck binary
fn deck_cmd() -> assert_cmd::Command {
    assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("deck"))
}

/// Create a temporary directory and initialize a taskdeck project
fn setup_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    deck_cmd().arg("init").arg(dir.path()).assert().success();
    dir
}

/// Add a task and return its ID
fn add_task(dir: &TempDir, args: &[&str]) -> String {
    let output = deck_cmd()
        .current_dir(dir.path())
        .arg("add")
        .args(args)
        .args(["--format", "json"])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    json["id"].as_str().unwrap().to_string()
}

fn list_json(dir: &TempDir, args: &[&str]) -> Vec<serde_json::Value> {
    let output = deck_cmd()
        .current_dir(dir.path())
        .arg("list")
        .args(args)
        .args(["--format", "json"])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    serde_json::from_str(&stdout).unwrap()
}

fn titles(tasks: &[serde_json::Value]) -> Vec<&str> {
    tasks.iter().map(|t| t["title"].as_str().unwrap()).collect()
}

// =============================================================================
// Initialization Tests
// =============================================================================

#[test]
fn test_init_creates_structure() {
    let dir = TempDir::new().unwrap();

    deck_cmd()
        .arg("init")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized taskdeck project"));

    assert!(dir.path().join(".deck").is_dir());
    assert!(dir.path().join(".deck/config.toml").is_file());
    assert!(dir.path().join(".deck/.gitignore").is_file());
}

#[test]
fn test_init_is_idempotent() {
    let dir = TempDir::new().unwrap();

    deck_cmd().arg("init").arg(dir.path()).assert().success();
    deck_cmd().arg("init").arg(dir.path()).assert().success();
}

#[test]
fn test_commands_outside_project_fail() {
    let dir = TempDir::new().unwrap();

    deck_cmd()
        .current_dir(dir.path())
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not in a taskdeck project"));
}

// =============================================================================
// Task Tests
// =============================================================================

#[test]
fn test_add_creates_task() {
    let dir = setup_project();

    deck_cmd()
        .current_dir(dir.path())
        .args(["add", "Write the changelog"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created task"))
        .stdout(predicate::str::contains("Write the changelog"));

    let content = fs::read_to_string(dir.path().join(".deck/tasks.jsonl")).unwrap();
    assert_eq!(content.lines().count(), 1);
    assert!(content.contains("\"status\":\"pending\""));
}

#[test]
fn test_add_json_record_shape() {
    let dir = setup_project();

    let output = deck_cmd()
        .current_dir(dir.path())
        .args([
            "add", "Ship it", "-p", "urgent", "-t", "Release", "--due", "2030-01-15",
            "--format", "json",
        ])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    assert!(json["id"].as_str().unwrap().starts_with("t-"));
    assert_eq!(json["status"], "pending");
    assert_eq!(json["priority"], "urgent");
    assert_eq!(json["tags"], serde_json::json!(["release"]));
    assert!(json["dueDate"].as_str().unwrap().starts_with("2030-01-15T00:00:00"));
    assert!(json.get("completionDuration").is_none());
}

#[test]
fn test_add_rejects_blank_title() {
    let dir = setup_project();

    deck_cmd()
        .current_dir(dir.path())
        .args(["add", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("title must not be empty"));
}

#[test]
fn test_add_respects_configured_title_length() {
    let dir = setup_project();
    fs::write(dir.path().join(".deck/config.toml"), "max_title_length = 5\n").unwrap();

    deck_cmd()
        .current_dir(dir.path())
        .args(["add", "Much too long"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("too long"));

    deck_cmd()
        .current_dir(dir.path())
        .args(["add", "Short"])
        .assert()
        .success();
}

#[test]
fn test_list_shows_tasks_in_insertion_order() {
    let dir = setup_project();

    add_task(&dir, &["First"]);
    add_task(&dir, &["Second"]);
    add_task(&dir, &["Third"]);

    deck_cmd()
        .current_dir(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("First"))
        .stdout(predicate::str::contains("Third"));

    let tasks = list_json(&dir, &[]);
    assert_eq!(titles(&tasks), vec!["First", "Second", "Third"]);
}

#[test]
fn test_task_lifecycle() {
    let dir = setup_project();
    let id = add_task(&dir, &["Lifecycle"]);

    deck_cmd()
        .current_dir(dir.path())
        .args(["start", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Started task"));

    let output = deck_cmd()
        .current_dir(dir.path())
        .args(["done", &id, "--format", "json"])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["status"], "completed");
    assert!(json["completionDuration"].as_i64().unwrap() >= 0);

    // Terminal tasks cannot move again
    deck_cmd()
        .current_dir(dir.path())
        .args(["cancel", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Illegal status transition"));
}

#[test]
fn test_pending_cannot_complete_directly() {
    let dir = setup_project();
    let id = add_task(&dir, &["Skip ahead"]);

    deck_cmd()
        .current_dir(dir.path())
        .args(["done", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pending -> completed"));

    let tasks = list_json(&dir, &[]);
    assert_eq!(tasks[0]["status"], "pending");
}

#[test]
fn test_cancel_pending_task() {
    let dir = setup_project();
    let id = add_task(&dir, &["Never mind"]);

    deck_cmd()
        .current_dir(dir.path())
        .args(["cancel", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cancelled task"));

    let tasks = list_json(&dir, &["--status", "cancelled"]);
    assert_eq!(titles(&tasks), vec!["Never mind"]);
}

#[test]
fn test_show_displays_details() {
    let dir = setup_project();
    let id = add_task(
        &dir,
        &["Detailed", "-d", "All the context", "-t", "docs", "--due", "2000-01-01"],
    );

    deck_cmd()
        .current_dir(dir.path())
        .args(["show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Title: Detailed"))
        .stdout(predicate::str::contains("All the context"))
        .stdout(predicate::str::contains("Tags: docs"))
        .stdout(predicate::str::contains("OVERDUE"));
}

#[test]
fn test_show_unknown_task_fails() {
    let dir = setup_project();

    deck_cmd()
        .current_dir(dir.path())
        .args(["show", "t-missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Task not found"));
}

#[test]
fn test_edit_updates_fields() {
    let dir = setup_project();
    let id = add_task(&dir, &["Draft", "--due", "2030-01-01", "-t", "old"]);

    deck_cmd()
        .current_dir(dir.path())
        .args(["edit", &id, "--title", "Final", "-t", "new", "--clear-due"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated task"));

    let tasks = list_json(&dir, &[]);
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["title"], "Final");
    assert_eq!(tasks[0]["tags"], serde_json::json!(["new"]));
    assert!(tasks[0].get("dueDate").is_none());
}

#[test]
fn test_edit_without_changes_fails() {
    let dir = setup_project();
    let id = add_task(&dir, &["Untouched"]);

    deck_cmd()
        .current_dir(dir.path())
        .args(["edit", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Nothing to change"));
}

#[test]
fn test_remove_task() {
    let dir = setup_project();
    let keep = add_task(&dir, &["Keep"]);
    let drop = add_task(&dir, &["Drop"]);

    deck_cmd()
        .current_dir(dir.path())
        .args(["remove", &drop])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed task"));

    let tasks = list_json(&dir, &[]);
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["id"], keep.as_str());

    deck_cmd()
        .current_dir(dir.path())
        .args(["remove", &drop])
        .assert()
        .failure();
}

// =============================================================================
// Query Tests
// =============================================================================

#[test]
fn test_list_filters() {
    let dir = setup_project();
    add_task(&dir, &["Fix login bug", "-p", "urgent", "-t", "backend"]);
    add_task(&dir, &["Update readme", "-p", "low", "-t", "docs"]);
    add_task(&dir, &["Old chore", "--due", "2000-01-01"]);

    assert_eq!(
        titles(&list_json(&dir, &["--priority", "urgent"])),
        vec!["Fix login bug"]
    );
    assert_eq!(
        titles(&list_json(&dir, &["--tag", "DOCS"])),
        vec!["Update readme"]
    );
    assert_eq!(
        titles(&list_json(&dir, &["--search", "LOGIN"])),
        vec!["Fix login bug"]
    );
    assert_eq!(titles(&list_json(&dir, &["--overdue"])), vec!["Old chore"]);
    assert!(list_json(&dir, &["--status", "inProgress"]).is_empty());
}

#[test]
fn test_list_sort_by_due_date_puts_undated_last() {
    let dir = setup_project();
    add_task(&dir, &["No date"]);
    add_task(&dir, &["Later", "--due", "2030-02-01"]);
    add_task(&dir, &["Sooner", "--due", "2030-01-01"]);

    let ascending = list_json(&dir, &["--sort", "dueDate"]);
    assert_eq!(titles(&ascending), vec!["Sooner", "Later", "No date"]);

    let descending = list_json(&dir, &["--sort", "dueDate", "--desc"]);
    assert_eq!(titles(&descending), vec!["Later", "Sooner", "No date"]);
}

#[test]
fn test_list_sort_by_priority() {
    let dir = setup_project();
    add_task(&dir, &["Medium one"]);
    add_task(&dir, &["Urgent one", "-p", "urgent"]);
    add_task(&dir, &["Low one", "-p", "low"]);

    let tasks = list_json(&dir, &["--sort", "priority", "--desc"]);
    assert_eq!(titles(&tasks), vec!["Urgent one", "Medium one", "Low one"]);
}

#[test]
fn test_list_uses_configured_default_sort() {
    let dir = setup_project();
    fs::write(
        dir.path().join(".deck/config.toml"),
        "[default_sort]\nfield = \"title\"\norder = \"desc\"\n",
    )
    .unwrap();

    add_task(&dir, &["apple"]);
    add_task(&dir, &["cherry"]);
    add_task(&dir, &["banana"]);

    let tasks = list_json(&dir, &[]);
    assert_eq!(titles(&tasks), vec!["cherry", "banana", "apple"]);
}

#[test]
fn test_list_rejects_bad_date() {
    let dir = setup_project();

    deck_cmd()
        .current_dir(dir.path())
        .args(["list", "--created-after", "yesterday-ish"])
        .assert()
        .failure();
}

#[test]
fn test_stats_counts() {
    let dir = setup_project();
    let a = add_task(&dir, &["A", "-p", "high"]);
    let b = add_task(&dir, &["B"]);
    add_task(&dir, &["C", "--due", "2000-01-01"]);

    deck_cmd().current_dir(dir.path()).args(["start", &a]).assert().success();
    deck_cmd().current_dir(dir.path()).args(["done", &a]).assert().success();
    deck_cmd().current_dir(dir.path()).args(["cancel", &b]).assert().success();

    let output = deck_cmd()
        .current_dir(dir.path())
        .args(["stats", "--format", "json"])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let all = &json["all"];

    assert_eq!(all["total"], 3);
    assert_eq!(all["pending"], 1);
    assert_eq!(all["completed"], 1);
    assert_eq!(all["cancelled"], 1);
    assert_eq!(all["overdueCount"], 1);
    assert_eq!(all["highPriorityCount"], 1);
    let rate = all["completionRate"].as_f64().unwrap();
    assert!((rate - 1.0 / 3.0).abs() < 1e-9);
    assert_eq!(json["filtered"], json["all"]);

    deck_cmd()
        .current_dir(dir.path())
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Tasks: 3 total"))
        .stdout(predicate::str::contains("Completion rate: 33.3%"));
}

#[test]
fn test_stats_filtered_view() {
    let dir = setup_project();
    add_task(&dir, &["Tagged", "-t", "ops"]);
    add_task(&dir, &["Untagged"]);

    let output = deck_cmd()
        .current_dir(dir.path())
        .args(["stats", "--tag", "ops", "--format", "json"])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    assert_eq!(json["all"]["total"], 2);
    assert_eq!(json["filtered"]["total"], 1);
    assert_eq!(json["query"]["tagFilter"], "ops");
}

#[test]
fn test_out_of_range_due_soon_hours_is_rejected() {
    let dir = setup_project();
    fs::write(
        dir.path().join(".deck/config.toml"),
        "due_soon_hours = 4294967295\n",
    )
    .unwrap();

    deck_cmd()
        .current_dir(dir.path())
        .args(["stats"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid project config"));
}

#[test]
fn test_hand_edited_tags_match_filters() {
    let dir = setup_project();
    fs::write(
        dir.path().join(".deck/tasks.jsonl"),
        concat!(
            r#"{"id":"api","title":"API","tags":["Backend"],"#,
            r#""createdAt":"2025-01-01T00:00:00Z"}"#,
            "\n"
        ),
    )
    .unwrap();

    assert_eq!(titles(&list_json(&dir, &["--tag", "backend"])), vec!["API"]);
    assert_eq!(titles(&list_json(&dir, &["--search", "backend"])), vec!["API"]);
}

#[test]
fn test_verbose_logs_to_stderr_only() {
    let dir = setup_project();

    deck_cmd()
        .current_dir(dir.path())
        .env_remove("RUST_LOG")
        .args(["--verbose", "list", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("["))
        .stderr(predicate::str::contains("opened project"));
}
