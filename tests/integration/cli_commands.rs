//! Integration tests for the CLI route table against a fixture workspace

use crate::integration::test_utils::write_workspace;
use factflow::cli::{Commands, OutputFormat, RunContext};
use factflow::config::FactflowConfig;
use factflow::error::{ApiError, GraphError};
use std::path::PathBuf;
use tempfile::TempDir;

fn context(workspace: &TempDir, format: OutputFormat) -> RunContext {
    write_workspace(workspace.path());
    let mut config = FactflowConfig::default();
    config.system.storage.store_path = Some(PathBuf::from(".factflow/returns"));
    RunContext::from_config(workspace.path(), &config, "2024-pat", format).unwrap()
}

fn set(path: &str, value: &str) -> Commands {
    Commands::Set {
        path: path.to_string(),
        value: value.to_string(),
        json: false,
    }
}

#[test]
fn test_validate_fixture() {
    let workspace = TempDir::new().unwrap();
    let ctx = context(&workspace, OutputFormat::Json);
    let out = ctx.execute(&Commands::Validate).unwrap();
    let report: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(report["valid"], true);
    assert_eq!(report["screens"], 10);
    assert_eq!(report["facts"], 13);
}

#[test]
fn test_item_workflow() {
    let workspace = TempDir::new().unwrap();
    let ctx = context(&workspace, OutputFormat::Text);

    let out = ctx
        .execute(&Commands::AddItem {
            collection: "/formW2s".to_string(),
            id: Some("A".to_string()),
        })
        .unwrap();
    assert_eq!(out, "add #A to /formW2s: saved");

    ctx.execute(&set("/formW2s/#A/wages", "1200")).unwrap();
    assert_eq!(
        ctx.execute(&Commands::Get {
            path: "/totalWages".to_string()
        })
        .unwrap(),
        "/totalWages = 1200.00"
    );

    let next = ctx
        .execute(&Commands::Next {
            location: Some("/income/jobs/intro".to_string()),
            submit: false,
        })
        .unwrap();
    assert_eq!(next, "/income/jobs/employer?collectionId=A");

    ctx.execute(&Commands::RemoveItem {
        collection: "/formW2s".to_string(),
        id: "A".to_string(),
    })
    .unwrap();
    let err = ctx
        .execute(&Commands::Get {
            path: "/formW2s/#A/wages".to_string(),
        })
        .unwrap_err();
    assert!(matches!(err, ApiError::Graph(GraphError::UnknownItem { .. })));
}

#[test]
fn test_rejected_save_is_not_stored() {
    let workspace = TempDir::new().unwrap();
    let ctx = context(&workspace, OutputFormat::Json);

    let out = ctx
        .execute(&set("/filerName", "Someone With A Very Long Name"))
        .unwrap();
    let outcome: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(outcome["outcome"]["valid"], false);
    assert_eq!(outcome["outcome"]["limitViolations"][0]["limit"], "MaxLength");

    let out = ctx
        .execute(&Commands::Get {
            path: "/filerName".to_string(),
        })
        .unwrap();
    let fact: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(fact["result"]["status"], "incomplete");
}

#[test]
fn test_submit_applies_screen_actions() {
    let workspace = TempDir::new().unwrap();
    let ctx = context(&workspace, OutputFormat::Text);
    ctx.execute(&Commands::AddItem {
        collection: "/formW2s".to_string(),
        id: Some("A".to_string()),
    })
    .unwrap();
    ctx.execute(&set("/formW2s/#A/wages", "75")).unwrap();

    let out = ctx
        .execute(&Commands::Next {
            location: Some("/income/summary/agi".to_string()),
            submit: true,
        })
        .unwrap();
    assert_eq!(out, "/review (end of flow)");
    assert_eq!(
        ctx.execute(&Commands::Get {
            path: "/confirmedAgi".to_string()
        })
        .unwrap(),
        "/confirmedAgi = 75.00"
    );
}

#[test]
fn test_export_then_import_into_another_return() {
    let workspace = TempDir::new().unwrap();
    let ctx = context(&workspace, OutputFormat::Text);
    ctx.execute(&set("/isMarried", "true")).unwrap();

    let export_file = workspace.path().join("export.json");
    ctx.execute(&Commands::Export {
        output: Some(export_file.clone()),
    })
    .unwrap();

    let mut config = FactflowConfig::default();
    config.system.storage.store_path = Some(PathBuf::from(".factflow/returns"));
    drop(ctx);
    let other =
        RunContext::from_config(workspace.path(), &config, "2024-copy", OutputFormat::Text)
            .unwrap();
    let out = other
        .execute(&Commands::Import { file: export_file })
        .unwrap();
    assert_eq!(out, "Imported 1 fact(s) into 2024-copy");
    assert_eq!(
        other
            .execute(&Commands::Get {
                path: "/isMarried".to_string()
            })
            .unwrap(),
        "/isMarried = true"
    );

    let listed = other.execute(&Commands::Returns).unwrap();
    assert!(listed.contains("2024-copy"));
    assert!(listed.contains("2024-pat"));
}

#[test]
fn test_checklist_json() {
    let workspace = TempDir::new().unwrap();
    let ctx = context(&workspace, OutputFormat::Json);
    let out = ctx.execute(&Commands::Checklist).unwrap();
    let checklist: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(checklist["total"], 3);
    assert_eq!(checklist["subcategories"][0]["route"], "/you/about");
    assert_eq!(checklist["subcategories"][0]["complete"], false);
}
