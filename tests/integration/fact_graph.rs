//! Integration tests for the fact graph over a JSON-declared dictionary

use crate::integration::test_utils::{add_w2s, cp, empty_graph, item, set_and_save};
use factflow::error::{GraphError, ParseError};
use factflow::fact::{Dollar, FactResult, FactValue};

fn dollars(cents: i64) -> FactValue {
    FactValue::Dollar(Dollar::from_cents(cents))
}

#[test]
fn test_agi_completes_once_wages_are_saved() {
    let mut graph = empty_graph();
    add_w2s(&mut graph, &["A"]);

    // Adjustments fall back to their default; wages are still missing
    assert_eq!(
        graph.get(&cp("/adjustments")).unwrap(),
        FactResult::Complete(dollars(0))
    );
    assert_eq!(graph.get(&cp("/agi")).unwrap(), FactResult::Incomplete);

    set_and_save(&mut graph, &[("/formW2s/#A/wages", "50000")]);
    assert_eq!(
        graph.get(&cp("/agi")).unwrap(),
        FactResult::Complete(dollars(5_000_000))
    );

    set_and_save(&mut graph, &[("/adjustments", "1250.50")]);
    assert_eq!(
        graph.get(&cp("/agi")).unwrap(),
        FactResult::Complete(dollars(4_874_950))
    );
}

#[test]
fn test_total_wages_sums_every_item() {
    let mut graph = empty_graph();
    assert_eq!(
        graph.get(&cp("/totalWages")).unwrap(),
        FactResult::Complete(dollars(0)),
        "an empty collection sums to zero"
    );

    add_w2s(&mut graph, &["A", "B"]);
    set_and_save(
        &mut graph,
        &[("/formW2s/#A/wages", "100.25"), ("/formW2s/#B/wages", "200")],
    );
    assert_eq!(
        graph.get(&cp("/totalWages")).unwrap(),
        FactResult::Complete(dollars(30_025))
    );
}

#[test]
fn test_limit_violation_rejects_the_whole_batch() {
    let mut graph = empty_graph();
    add_w2s(&mut graph, &["A"]);

    graph.set_raw(&cp("/filerName"), "Pat").unwrap();
    graph
        .set_raw(&cp("/formW2s/#A/wages"), "2000000")
        .unwrap();
    let outcome = graph.save();

    assert!(!outcome.valid);
    assert_eq!(outcome.limit_violations.len(), 1);
    assert_eq!(outcome.limit_violations[0].path, cp("/formW2s/#A/wages"));
    assert_eq!(outcome.limit_violations[0].limit, "Max");

    // Neither write was committed
    assert_eq!(graph.get(&cp("/filerName")).unwrap(), FactResult::Incomplete);
    assert_eq!(
        graph.get(&cp("/formW2s/#A/wages")).unwrap(),
        FactResult::Incomplete
    );
    assert!(!graph.has_pending_changes());
}

#[test]
fn test_max_length_limit() {
    let mut graph = empty_graph();
    graph
        .set_raw(&cp("/filerName"), "A name well over twenty characters")
        .unwrap();
    let outcome = graph.save();
    assert!(!outcome.valid);
    assert_eq!(outcome.limit_violations[0].limit, "MaxLength");
}

#[test]
fn test_parse_errors_are_synchronous() {
    let mut graph = empty_graph();
    add_w2s(&mut graph, &["A"]);

    let err = graph
        .set_raw(&cp("/formW2s/#A/wages"), "lots")
        .unwrap_err();
    assert!(matches!(err, GraphError::Parse { .. }));
    assert!(!graph.has_pending_changes());

    let err = graph
        .set(&cp("/isMarried"), FactValue::String("yes".to_string()))
        .unwrap_err();
    assert!(matches!(
        err,
        GraphError::Parse {
            source: ParseError::TypeMismatch { .. },
            ..
        }
    ));
}

#[test]
fn test_misuse_errors() {
    let mut graph = empty_graph();
    assert!(matches!(
        graph.set_raw(&cp("/agi"), "10").unwrap_err(),
        GraphError::NotWritable(_)
    ));
    assert!(matches!(
        graph.get(&cp("/nope")).unwrap_err(),
        GraphError::UnknownFact(_)
    ));
    assert!(matches!(
        graph.get(&cp("/formW2s/#Z/wages")).unwrap_err(),
        GraphError::UnknownItem { .. }
    ));
    assert!(matches!(
        graph.get_path("/formW2s/*/wages").unwrap_err(),
        GraphError::WildcardPath(_)
    ));
    assert!(matches!(
        graph
            .add_collection_item(&cp("/filerName"), None)
            .unwrap_err(),
        GraphError::NotACollection(_)
    ));
}

#[test]
fn test_staged_writes_are_visible_until_discarded() {
    let mut graph = empty_graph();
    graph.set_raw(&cp("/isMarried"), "true").unwrap();
    assert_eq!(
        graph.get(&cp("/isMarried")).unwrap(),
        FactResult::Complete(FactValue::Boolean(true))
    );
    assert_eq!(graph.pending_paths(), vec![&cp("/isMarried")]);

    graph.discard();
    assert_eq!(graph.get(&cp("/isMarried")).unwrap(), FactResult::Incomplete);
}

#[test]
fn test_removing_an_item_purges_its_facts() {
    let mut graph = empty_graph();
    add_w2s(&mut graph, &["A", "B"]);
    set_and_save(
        &mut graph,
        &[("/formW2s/#A/wages", "10"), ("/formW2s/#B/wages", "20")],
    );

    graph
        .remove_collection_item(&cp("/formW2s"), &item("A"))
        .unwrap();
    assert!(graph.save().valid);

    assert_eq!(graph.collection_items(&cp("/formW2s")).unwrap(), vec![item("B")]);
    assert!(!graph.committed_paths().any(|p| p == &cp("/formW2s/#A/wages")));
    assert_eq!(
        graph.get(&cp("/totalWages")).unwrap(),
        FactResult::Complete(dollars(2_000))
    );
}

#[test]
fn test_readded_item_does_not_inherit_removed_facts() {
    let mut graph = empty_graph();
    add_w2s(&mut graph, &["A"]);
    set_and_save(&mut graph, &[("/formW2s/#A/wages", "10.00")]);

    graph
        .remove_collection_item(&cp("/formW2s"), &item("A"))
        .unwrap();
    graph
        .add_collection_item(&cp("/formW2s"), Some(item("A")))
        .unwrap();
    assert_eq!(
        graph.get(&cp("/formW2s/#A/wages")).unwrap(),
        FactResult::Incomplete
    );

    assert!(graph.save().valid);
    assert_eq!(
        graph.get(&cp("/formW2s/#A/wages")).unwrap(),
        FactResult::Incomplete
    );
    assert_eq!(graph.get(&cp("/totalWages")).unwrap(), FactResult::Incomplete);
}

#[test]
fn test_generated_item_ids_are_unique() {
    let mut graph = empty_graph();
    let first = graph.add_collection_item(&cp("/formW2s"), None).unwrap();
    let second = graph.add_collection_item(&cp("/formW2s"), None).unwrap();
    assert_ne!(first, second);
    assert!(graph.save().valid);
    assert_eq!(graph.collection_items(&cp("/formW2s")).unwrap().len(), 2);
}

#[test]
fn test_delete_restores_default() {
    let mut graph = empty_graph();
    set_and_save(&mut graph, &[("/adjustments", "10")]);
    graph.delete(&cp("/adjustments")).unwrap();
    assert!(graph.save().valid);
    assert_eq!(
        graph.get(&cp("/adjustments")).unwrap(),
        FactResult::Complete(dollars(0))
    );
}
