use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

/// Runs `grc` with a config directory isolated from the user's.
fn grc(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("grc").unwrap();
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("GRC_FILE")
        .env_remove("GRC_APP_URL")
        .env_remove("GRC_NOTIFICATION_PREFIX")
        .env_remove("GRC_ISSUE_TRACKER_ENABLED")
        .env_remove("GRC_MEMCACHE_MECHANISM")
        .env_remove("GRC_DEBUG_LOG");
    cmd
}

fn parse_json_output(output: &[u8]) -> Value {
    serde_json::from_str(&String::from_utf8_lossy(output)).expect("Failed to parse JSON output")
}

fn run_ok(dir: &TempDir, file: &Path, args: &[&str]) -> Value {
    let output = grc(dir.path())
        .arg("--file")
        .arg(file)
        .args(args)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json = parse_json_output(&output);
    assert!(json["success"].as_bool().unwrap(), "{}", json);
    json
}

/// Workflow with one cycle and one task due 2026-10-20 assigned to ann.
fn seed(dir: &TempDir, file: &Path) {
    run_ok(dir, file, &["person", "create", "--email", "ann@example.com", "--name", "Ann"]);
    run_ok(dir, file, &["workflow", "create", "--title", "Quarterly controls"]);
    run_ok(dir, file, &["cycle", "create", "--workflow-id", "1", "--title", "Q4 2026"]);
    run_ok(
        dir,
        file,
        &["task", "create", "--cycle-id", "1", "--title", "Collect evidence", "--due", "2026-10-20"],
    );
    run_ok(dir, file, &["task", "assign", "--id", "1", "--email", "ann@example.com"]);
}

mod object_tests {
    use super::*;

    #[test]
    fn test_person_create_and_list() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("grc.json");

        let json = run_ok(&dir, &file, &["person", "create", "--email", "ann@example.com", "--name", "Ann"]);
        assert_eq!(json["data"]["id"], 1);
        assert_eq!(json["data"]["email"], "ann@example.com");
        assert!(json["api_version"].is_string());

        let json = run_ok(&dir, &file, &["person", "list"]);
        assert_eq!(json["data"]["count"], 1);
        assert_eq!(json["data"]["items"][0]["name"], "Ann");
    }

    #[test]
    fn test_duplicate_person_fails() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("grc.json");
        run_ok(&dir, &file, &["person", "create", "--email", "ann@example.com"]);

        grc(dir.path())
            .arg("--file")
            .arg(&file)
            .args(["person", "create", "--email", "ann@example.com"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("\"success\":false"))
            .stderr(predicate::str::contains("already exists"));
    }

    #[test]
    fn test_task_update_status() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("grc.json");
        seed(&dir, &file);

        let json = run_ok(
            &dir,
            &file,
            &["task", "update", "--id", "1", "--status", "in progress", "--description", "Screenshots"],
        );
        assert_eq!(json["data"]["status"], "In Progress");
        assert_eq!(json["data"]["description"], "Screenshots");
        assert_eq!(json["data"]["access_control"][0]["role_name"], "Task Assignees");

        let json = run_ok(&dir, &file, &["task", "list", "--cycle-id", "1"]);
        assert_eq!(json["data"]["count"], 1);
        let json = run_ok(&dir, &file, &["task", "list", "--cycle-id", "2"]);
        assert_eq!(json["data"]["count"], 0);
    }

    #[test]
    fn test_assign_unknown_person() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("grc.json");
        seed(&dir, &file);

        grc(dir.path())
            .arg("--file")
            .arg(&file)
            .args(["task", "assign", "--id", "1", "--email", "nobody@example.com"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Person not found: nobody@example.com"));
    }

    #[test]
    fn test_missing_file_argument() {
        let dir = tempdir().unwrap();
        grc(dir.path())
            .args(["label", "list"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--file is required"));
    }

    #[test]
    fn test_file_from_env() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("grc.json");

        grc(dir.path())
            .env("GRC_FILE", &file)
            .args(["label", "create", "--title", "Urgent"])
            .assert()
            .success();
        assert!(file.exists());
    }
}

mod calendar_tests {
    use super::*;

    #[test]
    fn test_calendar_build_creates_events() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("grc.json");
        seed(&dir, &file);

        let json = run_ok(&dir, &file, &["calendar", "build", "--today", "2026-10-16"]);
        assert_eq!(json["data"]["events_created"], 1);
        assert_eq!(json["data"]["relationships_created"], 1);

        let json = run_ok(&dir, &file, &["calendar", "list"]);
        assert_eq!(json["data"]["count"], 1);
        let event = &json["data"]["items"][0];
        assert_eq!(event["title"], "Your tasks are due today");
        assert_eq!(event["due_date"], "2026-10-20");
        assert!(event["description"].as_str().unwrap().contains("Collect evidence"));

        let json = run_ok(&dir, &file, &["calendar", "build", "--today", "2026-10-16"]);
        assert_eq!(json["data"]["events_created"], 0);
        assert_eq!(json["data"]["descriptions_updated"], 0);
    }

    #[test]
    fn test_notification_prefix_from_env() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("grc.json");
        seed(&dir, &file);

        grc(dir.path())
            .env("GRC_NOTIFICATION_PREFIX", "Staging")
            .arg("--file")
            .arg(&file)
            .args(["calendar", "build", "--today", "2026-10-16"])
            .assert()
            .success();

        let json = run_ok(&dir, &file, &["calendar", "list"]);
        assert_eq!(json["data"]["items"][0]["title"], "[Staging] Your tasks are due today");
    }

    #[test]
    fn test_overdue_task_gets_no_event() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("grc.json");
        seed(&dir, &file);

        let json = run_ok(&dir, &file, &["calendar", "build", "--today", "2026-10-21"]);
        assert_eq!(json["data"]["events_created"], 0);
    }

    #[test]
    fn test_archived_workflow_gets_no_event() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("grc.json");
        run_ok(&dir, &file, &["person", "create", "--email", "ann@example.com"]);
        run_ok(
            &dir,
            &file,
            &[
                "workflow",
                "create",
                "--title",
                "Monthly",
                "--unit",
                "month",
                "--repeat-every",
                "1",
                "--next-cycle-start-date",
                "2026-11-01",
            ],
        );
        run_ok(&dir, &file, &["cycle", "create", "--workflow-id", "1", "--title", "October"]);
        run_ok(
            &dir,
            &file,
            &["task", "create", "--cycle-id", "1", "--title", "Reconcile", "--due", "2026-10-20"],
        );
        run_ok(&dir, &file, &["task", "assign", "--id", "1", "--email", "ann@example.com"]);

        let json = run_ok(&dir, &file, &["workflow", "archive", "--id", "1"]);
        assert_eq!(json["data"]["workflow_archived"], true);

        let json = run_ok(&dir, &file, &["calendar", "build", "--today", "2026-10-16"]);
        assert_eq!(json["data"]["events_created"], 0);
    }
}

mod transfer_tests {
    use super::*;

    const PEOPLE_CSV: &str = "Object type,,\nPerson,Email*,Name\n,ann@example.com,Ann\n,bob@example.com,Bob\n";

    #[test]
    fn test_import_dry_run_does_not_save() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("grc.json");
        let csv = dir.path().join("people.csv");
        fs::write(&csv, PEOPLE_CSV).unwrap();

        let json = run_ok(&dir, &file, &["import", "--csv", csv.to_str().unwrap(), "--dry-run"]);
        assert_eq!(json["data"]["dry_run"], true);
        assert_eq!(json["data"]["blocks"][0]["name"], "Person");
        assert_eq!(json["data"]["blocks"][0]["created"], 2);
        assert!(!file.exists());

        let json = run_ok(&dir, &file, &["import", "--csv", csv.to_str().unwrap()]);
        assert_eq!(json["data"]["blocks"][0]["created"], 2);
        let json = run_ok(&dir, &file, &["person", "list"]);
        assert_eq!(json["data"]["count"], 2);
    }

    #[test]
    fn test_import_reports_row_errors() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("grc.json");
        let csv = dir.path().join("people.csv");
        fs::write(&csv, "Object type,,\nPerson,Email*,Name\n,,Nobody\n,ann@example.com,Ann\n").unwrap();

        let json = run_ok(&dir, &file, &["import", "--csv", csv.to_str().unwrap()]);
        let block = &json["data"]["blocks"][0];
        assert_eq!(block["created"], 1);
        assert_eq!(block["row_errors"].as_array().unwrap().len(), 1);
        assert!(block["row_errors"][0].as_str().unwrap().starts_with("Line 3:"));
    }

    #[test]
    fn test_export_labels() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("grc.json");
        run_ok(&dir, &file, &["label", "create", "--title", "Urgent"]);
        run_ok(&dir, &file, &["label", "create", "--title", "Blocked"]);

        let json = run_ok(
            &dir,
            &file,
            &["export", "--query", r#"[{"object_name": "Label", "ids": [1, 2]}]"#],
        );
        assert_eq!(json["data"]["csv"], "Object type,\nLabel,Title*\n,Urgent\n,Blocked\n,\n,\n");
    }

    #[test]
    fn test_export_to_file_with_exportable_filter() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("grc.json");
        let out = dir.path().join("export.csv");
        seed(&dir, &file);

        run_ok(
            &dir,
            &file,
            &[
                "export",
                "--query",
                r#"[{"object_name": "Person", "ids": [1]}, {"object_name": "Label", "ids": []}]"#,
                "--exportable",
                "0",
                "--output",
                out.to_str().unwrap(),
            ],
        );
        let csv = fs::read_to_string(&out).unwrap();
        assert!(csv.contains("ann@example.com"));
        assert!(!csv.contains("Label"));
    }

    #[test]
    fn test_export_invalid_query() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("grc.json");

        grc(dir.path())
            .arg("--file")
            .arg(&file)
            .args(["export", "--query", "not json"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid export query"));
    }
}

mod sqlite_tests {
    use super::*;

    #[test]
    fn test_sqlite_store_round_trip() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("grc.db");
        seed(&dir, &file);
        run_ok(&dir, &file, &["calendar", "build", "--today", "2026-10-16"]);

        let json = run_ok(&dir, &file, &["task", "list"]);
        assert_eq!(json["data"]["items"][0]["title"], "Collect evidence");
        assert_eq!(json["data"]["items"][0]["access_control"][0]["person_id"], 1);
        let json = run_ok(&dir, &file, &["calendar", "list"]);
        assert_eq!(json["data"]["count"], 1);
    }

    #[test]
    fn test_imported_workflow_codes_stay_unique() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("grc.db");
        let csv = dir.path().join("workflows.csv");
        fs::write(&csv, "Object type,,\nWorkflow,Code,Title*\n,WORKFLOW-2,First\n,,Second\n").unwrap();

        let json = run_ok(&dir, &file, &["import", "--csv", csv.to_str().unwrap()]);
        assert_eq!(json["data"]["blocks"][0]["created"], 2);
        run_ok(&dir, &file, &["workflow", "create", "--title", "Third"]);

        let json = run_ok(&dir, &file, &["workflow", "list"]);
        let slugs: Vec<&str> = json["data"]["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|w| w["slug"].as_str().unwrap())
            .collect();
        assert_eq!(slugs, vec!["WORKFLOW-2", "WORKFLOW-3", "WORKFLOW-4"]);
    }

    #[test]
    fn test_migrate_commands() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("grc.db");

        let json = run_ok(&dir, &file, &["migrate", "current"]);
        assert!(json["data"]["current"].is_null());

        let json = run_ok(&dir, &file, &["migrate", "upgrade"]);
        assert_eq!(json["data"]["applied"], serde_json::json!(["21628bac2031", "4c290531e2cd"]));
        assert_eq!(json["data"]["current"], "4c290531e2cd");

        let json = run_ok(&dir, &file, &["migrate", "downgrade", "--revision", "21628bac2031"]);
        assert_eq!(json["data"]["reverted"], serde_json::json!(["4c290531e2cd"]));
        assert_eq!(json["data"]["current"], "21628bac2031");

        let json = run_ok(&dir, &file, &["migrate", "heads"]);
        assert_eq!(json["data"]["items"], serde_json::json!(["4c290531e2cd"]));

        let json = run_ok(&dir, &file, &["migrate", "history"]);
        assert_eq!(json["data"]["count"], 2);
        assert_eq!(json["data"]["items"][1]["description"], "Create table for Label model");
    }

    #[test]
    fn test_migrate_requires_sqlite() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("grc.json");

        grc(dir.path())
            .arg("--file")
            .arg(&file)
            .args(["migrate", "current"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Migrations need a SQLite data file"));
    }
}

#[test]
fn test_completions() {
    let dir = tempdir().unwrap();
    grc(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("grc"));
}
