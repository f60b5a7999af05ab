//! Property-based tests for navigation termination and loop coverage

use super::{cp, flow, graph_with_jobs};
use factflow::fact::FactValue;
use factflow::flow::{NextKind, NextScreen};
use factflow::graph::FactGraph;
use proptest::prelude::*;

/// Walk from the first screen until a non-screen result, returning every stop
fn walk(graph: &FactGraph, limit: usize) -> (Vec<(String, Option<String>)>, NextScreen) {
    let flow = flow();
    let navigator = flow.navigator();
    let mut stops = Vec::new();
    let mut current = navigator.first_screen(graph);
    while current.kind == NextKind::Screen && stops.len() < limit {
        stops.push((
            current.route.clone(),
            current.collection_id.as_ref().map(|id| id.to_string()),
        ));
        let id = current.collection_id.clone();
        current = navigator
            .next_screen(&current.route, id.as_ref(), graph)
            .unwrap();
    }
    (stops, current)
}

proptest! {
    #[test]
    fn navigation_terminates_and_covers_every_item(
        tips in prop::collection::vec(any::<bool>(), 0..6),
        married in any::<bool>(),
    ) {
        let mut graph = graph_with_jobs(&tips);
        graph.set(&cp("/isMarried"), FactValue::Boolean(married)).unwrap();
        prop_assert!(graph.save().valid);

        let screens = flow().screens().len();
        let limit = screens * (tips.len() + 1) + 1;
        let (stops, end) = walk(&graph, limit);

        prop_assert!(stops.len() < limit, "navigation did not terminate");
        prop_assert_eq!(end.kind, NextKind::Terminal);
        prop_assert_eq!(end.route.as_str(), "/review");

        let mut expected: Vec<(String, Option<String>)> = vec![("/you/about/married".to_string(), None)];
        if married {
            expected.push(("/you/about/spouse".to_string(), None));
        }
        expected.push(("/you/about/abroad".to_string(), None));
        expected.push(("/income/jobs/intro".to_string(), None));
        for (index, has_tips) in tips.iter().enumerate() {
            let id = Some(format!("J{}", index));
            expected.push(("/income/jobs/wages".to_string(), id.clone()));
            if *has_tips {
                expected.push(("/income/jobs/tips".to_string(), id));
            }
        }
        expected.push(("/income/jobs/done".to_string(), None));
        prop_assert_eq!(stops, expected);
    }

    #[test]
    fn knockout_preempts_every_screen(tips in prop::collection::vec(any::<bool>(), 0..4)) {
        let mut graph = graph_with_jobs(&tips);
        graph.set(&cp("/livedAbroad"), FactValue::Boolean(true)).unwrap();
        prop_assert!(graph.save().valid);

        let flow = flow();
        for screen in flow.screens() {
            let next = flow.next_screen(&screen.route, None, &graph).unwrap();
            prop_assert_eq!(next.kind, NextKind::Knockout);
            prop_assert_eq!(next.route.as_str(), "/you/about/ko");
        }
    }
}
