//! Shared test utilities for integration tests
//!
//! Provides a small tax return fixture (fact dictionary and interview flow)
//! and centralized setup/teardown for XDG directories.

use factflow::fact::FactDictionary;
use factflow::flow::Flow;
use factflow::graph::FactGraph;
use factflow::path::{ConcretePath, ItemId};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Fact dictionary for a single filer with W-2 income
pub const FACTS_JSON: &str = r#"{
    "facts": [
        {"path": "/filerName", "kind": "writable", "type": "String",
         "limits": [{"MaxLength": 20}]},
        {"path": "/isMarried", "kind": "writable", "type": "Boolean"},
        {"path": "/spouseName", "kind": "writable", "type": "String"},
        {"path": "/livedAbroad", "kind": "writable", "type": "Boolean"},
        {"path": "/formW2s", "kind": "collection"},
        {"path": "/formW2s/*/employer", "kind": "writable", "type": "String"},
        {"path": "/formW2s/*/wages", "kind": "writable", "type": "Dollar",
         "limits": [{"Max": {"value": "1000000"}}]},
        {"path": "/formW2s/*/hasTips", "kind": "writable", "type": "Boolean"},
        {"path": "/formW2s/*/tips", "kind": "writable", "type": "Dollar"},
        {"path": "/totalWages", "kind": "derived",
         "expr": {"CollectionSum": "/formW2s/*/wages"}},
        {"path": "/adjustments", "kind": "writable", "type": "Dollar", "default": "0"},
        {"path": "/agi", "kind": "derived",
         "expr": {"Subtract": {"minuend": {"Dependency": "/totalWages"},
                               "subtrahends": [{"Dependency": "/adjustments"}]}}},
        {"path": "/confirmedAgi", "kind": "writable", "type": "Dollar"}
    ]
}"#;

/// Interview over [`FACTS_JSON`]: about you, a W-2 loop, and a summary
pub const FLOW_JSON: &str = r#"{
    "categories": [
        {"route": "/you", "subcategories": [
            {"route": "about", "children": [
                {"node": "screen", "route": "name",
                 "content": [{"type": "fact", "path": "/filerName"}]},
                {"node": "screen", "route": "married",
                 "content": [{"type": "fact", "path": "/isMarried"}]},
                {"node": "screen", "route": "spouse", "conditions": ["/isMarried"],
                 "content": [{"type": "fact", "path": "/spouseName"}]},
                {"node": "screen", "route": "abroad",
                 "content": [{"type": "fact", "path": "/livedAbroad"}]},
                {"node": "screen", "route": "abroad-ko", "conditions": ["/livedAbroad"],
                 "content": [{"type": "knockout", "i18nKey": "ko.livedAbroad"}]}
            ]}
        ]},
        {"route": "/income", "subcategories": [
            {"route": "jobs", "collectionContext": "/formW2s", "children": [
                {"node": "screen", "route": "intro",
                 "content": [{"type": "info", "i18nKey": "jobs.intro"}]},
                {"node": "collectionLoop", "loopName": "w2s", "collection": "/formW2s",
                 "children": [
                    {"node": "screen", "route": "employer",
                     "content": [{"type": "fact", "path": "/formW2s/*/employer"}]},
                    {"node": "screen", "route": "wages",
                     "content": [{"type": "fact", "path": "/formW2s/*/wages"},
                                 {"type": "fact", "path": "/formW2s/*/hasTips"}]},
                    {"node": "screen", "route": "tips", "conditions": ["/formW2s/*/hasTips"],
                     "content": [{"type": "fact", "path": "/formW2s/*/tips"}]}
                 ]}
            ]},
            {"route": "summary", "children": [
                {"node": "screen", "route": "agi",
                 "content": [{"type": "setFactAction", "path": "/confirmedAgi", "source": "/agi"}]}
            ]}
        ]}
    ]
}"#;

pub fn dictionary() -> Arc<FactDictionary> {
    Arc::new(FactDictionary::from_json(FACTS_JSON).unwrap())
}

pub fn flow() -> Flow {
    Flow::from_json(FLOW_JSON).unwrap()
}

pub fn empty_graph() -> FactGraph {
    FactGraph::new(dictionary())
}

pub fn cp(raw: &str) -> ConcretePath {
    ConcretePath::parse(raw).unwrap()
}

pub fn item(id: &str) -> ItemId {
    ItemId::new(id).unwrap()
}

/// Set raw values and save, panicking on any failure
pub fn set_and_save(graph: &mut FactGraph, values: &[(&str, &str)]) {
    for (path, raw) in values {
        graph.set_raw(&cp(path), raw).unwrap();
    }
    let outcome = graph.save();
    assert!(outcome.valid, "save failed: {:?}", outcome.limit_violations);
}

/// Add W-2 items with the given ids and save
pub fn add_w2s(graph: &mut FactGraph, ids: &[&str]) {
    for id in ids {
        graph
            .add_collection_item(&cp("/formW2s"), Some(item(id)))
            .unwrap();
    }
    assert!(graph.save().valid);
}

/// Write the fixture dictionary and flow into a workspace directory
pub fn write_workspace(root: &Path) {
    std::fs::write(root.join("facts.json"), FACTS_JSON).unwrap();
    std::fs::write(root.join("flow.json"), FLOW_JSON).unwrap();
}

/// Global mutex to serialize environment variable access across all tests
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Environment variable state to restore after test
struct EnvState {
    saved: Vec<(&'static str, Option<String>)>,
}

const ISOLATED_VARS: [&str; 5] = [
    "HOME",
    "XDG_CONFIG_HOME",
    "XDG_DATA_HOME",
    "FACTFLOW_ENV",
    "FACTFLOW_FLOW__TERMINAL_ROUTE",
];

impl EnvState {
    fn capture() -> Self {
        Self {
            saved: ISOLATED_VARS
                .iter()
                .map(|var| (*var, std::env::var(var).ok()))
                .collect(),
        }
    }

    fn restore(self) {
        for (var, value) in self.saved {
            match value {
                Some(orig) => std::env::set_var(var, orig),
                None => std::env::remove_var(var),
            }
        }
    }
}

/// Run `f` with HOME and the XDG directories pointed into `test_dir`.
///
/// XDG_CONFIG_HOME is `test_dir` itself, so a user config goes in
/// `test_dir/factflow/config.toml`. The environment is restored afterwards.
pub fn with_xdg_env<F, R>(test_dir: &TempDir, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let env_state = EnvState::capture();

    let test_data_home = test_dir.path().join("data");
    let test_home = test_dir.path().join("home");
    std::fs::create_dir_all(&test_data_home).unwrap();
    std::fs::create_dir_all(&test_home).unwrap();

    std::env::set_var("HOME", &test_home);
    std::env::set_var("XDG_CONFIG_HOME", test_dir.path());
    std::env::set_var("XDG_DATA_HOME", &test_data_home);
    std::env::remove_var("FACTFLOW_ENV");
    std::env::remove_var("FACTFLOW_FLOW__TERMINAL_ROUTE");

    let result = f();

    env_state.restore();

    result
}
