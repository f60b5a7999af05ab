//! Integration tests for the Return Store

use crate::integration::test_utils::{add_w2s, cp, dictionary, empty_graph, set_and_save};
use factflow::fact::FactResult;
use factflow::store::{ReturnRecord, ReturnStore, SledReturnStore};
use tempfile::TempDir;

#[test]
fn test_returns_survive_reopening_the_store() {
    let store_dir = TempDir::new().unwrap();
    let mut graph = empty_graph();
    add_w2s(&mut graph, &["A"]);
    set_and_save(&mut graph, &[("/formW2s/#A/wages", "500")]);

    {
        let store = SledReturnStore::new(store_dir.path()).unwrap();
        store.save_graph("2024-pat", &graph).unwrap();
    }

    let store = SledReturnStore::new(store_dir.path()).unwrap();
    let restored = store.load_graph("2024-pat", dictionary()).unwrap();
    assert_eq!(
        restored.get(&cp("/agi")).unwrap(),
        graph.get(&cp("/agi")).unwrap()
    );
    assert!(restored.get(&cp("/agi")).unwrap().complete());
}

#[test]
fn test_staged_writes_are_not_stored() {
    let store_dir = TempDir::new().unwrap();
    let store = SledReturnStore::new(store_dir.path()).unwrap();

    let mut graph = empty_graph();
    set_and_save(&mut graph, &[("/filerName", "Pat")]);
    graph.set_raw(&cp("/isMarried"), "true").unwrap();
    store.save_graph("r1", &graph).unwrap();

    let restored = store.load_graph("r1", dictionary()).unwrap();
    assert!(restored.get(&cp("/filerName")).unwrap().complete());
    assert_eq!(restored.get(&cp("/isMarried")).unwrap(), FactResult::Incomplete);
}

#[test]
fn test_list_and_delete() {
    let store_dir = TempDir::new().unwrap();
    let store = SledReturnStore::new(store_dir.path()).unwrap();
    let graph = empty_graph();

    for id in ["b-return", "a-return", "c-return"] {
        store.save_graph(id, &graph).unwrap();
    }
    assert_eq!(
        store.list().unwrap(),
        vec!["a-return", "b-return", "c-return"]
    );

    assert!(store.delete("b-return").unwrap());
    assert_eq!(store.list().unwrap(), vec!["a-return", "c-return"]);
    assert!(store.get("b-return").unwrap().is_none());
}

#[test]
fn test_record_holds_persisted_json() {
    let mut graph = empty_graph();
    set_and_save(&mut graph, &[("/isMarried", "true")]);

    let record = ReturnRecord::from_graph("r1", &graph).unwrap();
    let facts: serde_json::Value = serde_json::from_str(&record.facts).unwrap();
    assert_eq!(
        facts["/isMarried"]["$type"],
        "gov.irs.factgraph.persisters.BooleanWrapper"
    );
    assert_eq!(facts["/isMarried"]["item"], true);

    let graph = record.to_graph(dictionary()).unwrap();
    assert!(graph.get(&cp("/isMarried")).unwrap().complete());
}
