//! Integration tests for the persisted JSON form of a graph

use crate::integration::test_utils::{add_w2s, cp, dictionary, empty_graph, set_and_save};
use factflow::error::GraphError;
use factflow::graph::FactGraph;
use serde_json::json;

#[test]
fn test_round_trip_preserves_every_committed_fact() {
    let mut graph = empty_graph();
    add_w2s(&mut graph, &["A", "B"]);
    set_and_save(
        &mut graph,
        &[
            ("/filerName", "Pat"),
            ("/isMarried", "false"),
            ("/formW2s/#A/wages", "120.50"),
            ("/formW2s/#B/employer", "Acme"),
        ],
    );

    let json = graph.to_json_string().unwrap();
    let restored = FactGraph::from_json_str(dictionary(), &json).unwrap();

    let before: Vec<_> = graph.committed_paths().collect();
    let after: Vec<_> = restored.committed_paths().collect();
    assert_eq!(before, after);
    for path in before {
        assert_eq!(graph.get(path).unwrap(), restored.get(path).unwrap());
    }
    assert_eq!(
        graph.get(&cp("/totalWages")).unwrap(),
        restored.get(&cp("/totalWages")).unwrap()
    );
}

#[test]
fn test_wrapper_format() {
    let mut graph = empty_graph();
    add_w2s(&mut graph, &["A"]);
    set_and_save(&mut graph, &[("/formW2s/#A/wages", "50.00")]);

    let json = graph.to_json().unwrap();
    assert_eq!(
        json["/formW2s/#A/wages"],
        json!({"$type": "gov.irs.factgraph.persisters.DollarWrapper", "item": "50.00"})
    );
    assert_eq!(
        json["/formW2s"]["$type"],
        "gov.irs.factgraph.persisters.CollectionWrapper"
    );
    assert_eq!(json["/formW2s"]["item"]["items"], json!(["A"]));
}

#[test]
fn test_staged_writes_are_not_persisted() {
    let mut graph = empty_graph();
    graph.set_raw(&cp("/filerName"), "Pat").unwrap();
    assert_eq!(graph.to_json().unwrap(), json!({}));
}

#[test]
fn test_unknown_derived_and_orphaned_facts_are_dropped() {
    let persisted = json!({
        "/retiredFact": {"$type": "gov.irs.factgraph.persisters.BooleanWrapper", "item": true},
        "/agi": {"$type": "gov.irs.factgraph.persisters.DollarWrapper", "item": "1.00"},
        "/formW2s/#GONE/wages": {"$type": "gov.irs.factgraph.persisters.DollarWrapper", "item": "1.00"},
        "/isMarried": {"$type": "gov.irs.factgraph.persisters.BooleanWrapper", "item": true}
    });
    let graph = FactGraph::from_json(dictionary(), &persisted).unwrap();
    let paths: Vec<String> = graph.committed_paths().map(|p| p.to_string()).collect();
    assert_eq!(paths, vec!["/isMarried".to_string()]);
}

#[test]
fn test_malformed_persisted_values_are_errors() {
    let wrong_type = json!({
        "/isMarried": {"$type": "gov.irs.factgraph.persisters.StringWrapper", "item": "yes"}
    });
    assert!(matches!(
        FactGraph::from_json(dictionary(), &wrong_type).unwrap_err(),
        GraphError::Persistence { .. }
    ));

    assert!(matches!(
        FactGraph::from_json(dictionary(), &json!([1, 2])).unwrap_err(),
        GraphError::NotAnObject
    ));
    assert!(FactGraph::from_json_str(dictionary(), "{not json").is_err());
}
