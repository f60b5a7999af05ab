//! Integration tests for Configuration System

use crate::integration::test_utils::{with_xdg_env, write_workspace};
use factflow::cli::{Commands, OutputFormat, RunContext};
use factflow::config::ConfigLoader;
use factflow::error::ApiError;
use factflow::logging::LogFormat;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_config(dir: &std::path::Path, name: &str, contents: &str) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join(name), contents).unwrap();
}

#[test]
fn test_environment_overrides_files() {
    let test_dir = TempDir::new().unwrap();
    with_xdg_env(&test_dir, || {
        let workspace = test_dir.path().join("workspace");
        write_config(
            &workspace.join("config"),
            "config.toml",
            "[flow]\nterminal_route = \"/workspace-review\"\n",
        );

        std::env::set_var("FACTFLOW_FLOW__TERMINAL_ROUTE", "/env-review");
        let config = ConfigLoader::load(&workspace).unwrap();
        assert_eq!(config.flow.terminal_route.as_deref(), Some("/env-review"));
    });
}

#[test]
fn test_environment_specific_file() {
    let test_dir = TempDir::new().unwrap();
    with_xdg_env(&test_dir, || {
        let workspace = test_dir.path().join("workspace");
        let config_dir = workspace.join("config");
        write_config(
            &config_dir,
            "config.toml",
            "[flow]\nflow_path = \"base-flow.json\"\n\n[logging]\nformat = \"text\"\n",
        );
        write_config(
            &config_dir,
            "production.toml",
            "[logging]\nformat = \"json\"\nlevel = \"error\"\n",
        );

        let development = ConfigLoader::load(&workspace).unwrap();
        assert_eq!(development.logging.format, LogFormat::Text);

        std::env::set_var("FACTFLOW_ENV", "production");
        let production = ConfigLoader::load(&workspace).unwrap();
        assert_eq!(production.flow.flow_path, PathBuf::from("base-flow.json"));
        assert_eq!(production.logging.format, LogFormat::Json);
        assert_eq!(production.logging.level, "error");
    });
}

#[test]
fn test_user_config_in_xdg_home() {
    let test_dir = TempDir::new().unwrap();
    with_xdg_env(&test_dir, || {
        write_config(
            &test_dir.path().join("factflow"),
            "config.toml",
            "[system.storage]\nstore_path = \"returns-db\"\n",
        );
        let workspace = test_dir.path().join("workspace");
        std::fs::create_dir_all(&workspace).unwrap();

        let config = ConfigLoader::load(&workspace).unwrap();
        assert_eq!(
            config.system.storage.resolve_store_path(&workspace),
            workspace.join("returns-db")
        );
    });
}

#[test]
fn test_invalid_configuration_is_rejected() {
    let test_dir = TempDir::new().unwrap();
    let config_file = test_dir.path().join("bad.toml");
    std::fs::write(&config_file, "[flow]\nterminal_route = \"review\"\n").unwrap();

    let err = ConfigLoader::load_from_file(&config_file).unwrap_err();
    match err {
        ApiError::ConfigError(msg) => assert!(msg.contains("terminal_route")),
        other => panic!("expected config error, got {:?}", other),
    }
}

#[test]
fn test_run_context_uses_configured_terminal_route() {
    let test_dir = TempDir::new().unwrap();
    with_xdg_env(&test_dir, || {
        let workspace = test_dir.path().join("workspace");
        std::fs::create_dir_all(&workspace).unwrap();
        write_workspace(&workspace);
        write_config(
            &workspace.join("config"),
            "config.toml",
            "[flow]\nterminal_route = \"/all-done\"\n\n[system.storage]\nstore_path = \"store\"\n",
        );

        let context =
            RunContext::new(workspace.clone(), None, "r1", OutputFormat::Text).unwrap();
        let out = context
            .execute(&Commands::Next {
                location: Some("/income/summary/agi".to_string()),
                submit: false,
            })
            .unwrap();
        assert_eq!(out, "/all-done (end of flow)");
    });
}
