//! Property-based tests for fact graph persistence, saves and conditions

use super::{cp, dictionary, MAX_WAGES_CENTS};
use factflow::fact::{Dollar, FactResult, FactValue};
use factflow::flow::{Condition, ConditionOperator};
use factflow::graph::FactGraph;
use factflow::path::{AbstractPath, ItemId};
use proptest::prelude::*;
use std::collections::BTreeMap;

const OPERATORS: [ConditionOperator; 8] = [
    ConditionOperator::IsTrue,
    ConditionOperator::IsTrueAndComplete,
    ConditionOperator::IsTrueOrIncomplete,
    ConditionOperator::IsFalse,
    ConditionOperator::IsFalseAndComplete,
    ConditionOperator::IsFalseOrIncomplete,
    ConditionOperator::IsComplete,
    ConditionOperator::IsIncomplete,
];

fn item_ids() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set("[A-Za-z0-9]{1,8}", 0..6).prop_map(|ids| ids.into_iter().collect())
}

fn wages_path(id: &str) -> String {
    format!("/jobs/#{}/wages", id)
}

/// Graph whose jobs are committed but carry no wages yet
fn graph_with_items(ids: &[String]) -> FactGraph {
    let mut graph = FactGraph::new(dictionary());
    for id in ids {
        graph
            .add_collection_item(&cp("/jobs"), Some(ItemId::new(id.as_str()).unwrap()))
            .unwrap();
    }
    assert!(graph.save().valid);
    graph
}

proptest! {
    #[test]
    fn persisted_json_round_trips(
        entries in prop::collection::btree_map("[A-Za-z0-9]{1,8}", prop::option::of(0..MAX_WAGES_CENTS), 0..6),
        married in prop::option::of(any::<bool>()),
    ) {
        let ids: Vec<String> = entries.keys().cloned().collect();
        let mut graph = graph_with_items(&ids);
        for (id, cents) in &entries {
            if let Some(cents) = cents {
                graph
                    .set(&cp(&wages_path(id)), FactValue::Dollar(Dollar::from_cents(*cents)))
                    .unwrap();
            }
        }
        if let Some(married) = married {
            graph.set(&cp("/isMarried"), FactValue::Boolean(married)).unwrap();
        }
        prop_assert!(graph.save().valid);

        let json = graph.to_json_string().unwrap();
        let restored = FactGraph::from_json_str(dictionary(), &json).unwrap();

        let before: Vec<_> = graph.committed_paths().cloned().collect();
        let after: Vec<_> = restored.committed_paths().cloned().collect();
        prop_assert_eq!(&before, &after);
        for path in &before {
            prop_assert_eq!(graph.get(path).unwrap(), restored.get(path).unwrap());
        }
        prop_assert_eq!(
            graph.get(&cp("/totalWages")).unwrap(),
            restored.get(&cp("/totalWages")).unwrap()
        );
        prop_assert_eq!(restored.to_json_string().unwrap(), json);
    }

    #[test]
    fn save_commits_all_or_nothing(
        ids in item_ids(),
        wages in prop::collection::vec(0..=2 * MAX_WAGES_CENTS, 6),
    ) {
        let mut graph = graph_with_items(&ids);
        let baseline = graph.to_json().unwrap();

        let staged: BTreeMap<&String, i64> = ids.iter().zip(wages.iter().copied()).collect();
        for (id, cents) in &staged {
            graph
                .set(&cp(&wages_path(id)), FactValue::Dollar(Dollar::from_cents(*cents)))
                .unwrap();
        }
        let over_limit = staged.values().filter(|c| **c > MAX_WAGES_CENTS).count();

        let outcome = graph.save();
        prop_assert!(!graph.has_pending_changes());
        prop_assert_eq!(outcome.valid, over_limit == 0);
        prop_assert_eq!(outcome.limit_violations.len(), over_limit);

        if outcome.valid {
            for (id, cents) in &staged {
                prop_assert_eq!(
                    graph.get(&cp(&wages_path(id))).unwrap(),
                    FactResult::Complete(FactValue::Dollar(Dollar::from_cents(*cents)))
                );
            }
        } else {
            prop_assert_eq!(graph.to_json().unwrap(), baseline);
        }
    }

    #[test]
    fn condition_evaluation_is_pure(
        committed in prop::option::of(any::<bool>()),
        staged in prop::option::of(any::<bool>()),
        operator in prop::sample::select(OPERATORS.to_vec()),
        tips in prop::option::of(any::<bool>()),
    ) {
        let mut graph = graph_with_items(&["J".to_string()]);
        if let Some(value) = committed {
            graph.set(&cp("/isMarried"), FactValue::Boolean(value)).unwrap();
        }
        if let Some(value) = tips {
            graph.set(&cp("/jobs/#J/hasTips"), FactValue::Boolean(value)).unwrap();
        }
        prop_assert!(graph.save().valid);
        if let Some(value) = staged {
            graph.set(&cp("/isMarried"), FactValue::Boolean(value)).unwrap();
        }

        let json_before = graph.to_json().unwrap();
        let pending_before: Vec<_> = graph.pending_paths().into_iter().cloned().collect();
        let item = ItemId::new("J").unwrap();

        let married = Condition::new(AbstractPath::parse("/isMarried").unwrap(), operator);
        let per_item = Condition::new(AbstractPath::parse("/jobs/*/hasTips").unwrap(), operator);

        let first = (married.evaluate(&graph, None), per_item.evaluate(&graph, Some(&item)));
        let second = (married.evaluate(&graph, None), per_item.evaluate(&graph, Some(&item)));
        prop_assert_eq!(first, second);

        // A wildcard condition without an item never holds
        prop_assert!(!per_item.evaluate(&graph, None));

        prop_assert_eq!(graph.to_json().unwrap(), json_before);
        let pending_after: Vec<_> = graph.pending_paths().into_iter().cloned().collect();
        prop_assert_eq!(pending_after, pending_before);
    }
}
