//! Integration tests for walking the interview flow

use crate::integration::test_utils::{add_w2s, cp, empty_graph, flow, item, set_and_save};
use factflow::error::FlowError;
use factflow::fact::{Dollar, FactResult, FactValue};
use factflow::flow::{NextKind, NextScreen, PendingScreen, RouteLocation};
use factflow::graph::FactGraph;
use factflow::path::ItemId;

fn next(graph: &FactGraph, route: &str, id: Option<&str>) -> NextScreen {
    let id = id.map(item);
    flow().next_screen(route, id.as_ref(), graph).unwrap()
}

fn stop(next: &NextScreen) -> (&str, Option<&str>) {
    (
        next.route.as_str(),
        next.collection_id.as_ref().map(ItemId::as_str),
    )
}

#[test]
fn test_first_screen() {
    let graph = empty_graph();
    let first = flow().navigator().first_screen(&graph);
    assert_eq!(first.route, "/you/about/name");
    assert_eq!(first.kind, NextKind::Screen);
}

#[test]
fn test_conditional_screen_is_skipped_until_its_fact_holds() {
    let mut graph = empty_graph();
    assert_eq!(next(&graph, "/you/about/married", None).route, "/you/about/abroad");

    set_and_save(&mut graph, &[("/isMarried", "false")]);
    assert_eq!(next(&graph, "/you/about/married", None).route, "/you/about/abroad");

    set_and_save(&mut graph, &[("/isMarried", "true")]);
    assert_eq!(next(&graph, "/you/about/married", None).route, "/you/about/spouse");
}

#[test]
fn test_loop_visits_each_item_then_exits() {
    let mut graph = empty_graph();
    add_w2s(&mut graph, &["A", "B"]);

    let mut current = next(&graph, "/income/jobs/intro", None);
    let mut visited = vec![];
    while current.kind == NextKind::Screen && current.route.starts_with("/income/jobs") {
        visited.push((
            current.route.clone(),
            current.collection_id.as_ref().map(|i| i.to_string()),
        ));
        let id = current.collection_id.clone();
        current = flow()
            .next_screen(&current.route, id.as_ref(), &graph)
            .unwrap();
    }

    let expected: Vec<(String, Option<String>)> = [
        ("/income/jobs/employer", "A"),
        ("/income/jobs/wages", "A"),
        ("/income/jobs/employer", "B"),
        ("/income/jobs/wages", "B"),
    ]
    .iter()
    .map(|(r, i)| (r.to_string(), Some(i.to_string())))
    .collect();
    assert_eq!(visited, expected);
    assert_eq!(stop(&current), ("/income/summary/agi", None));
}

#[test]
fn test_single_screen_loop_advances_item_by_item() {
    let mut graph = empty_graph();
    add_w2s(&mut graph, &["A", "B"]);
    set_and_save(&mut graph, &[("/formW2s/#A/hasTips", "true")]);

    assert_eq!(
        stop(&next(&graph, "/income/jobs/wages", Some("A"))),
        ("/income/jobs/tips", Some("A"))
    );
    assert_eq!(
        stop(&next(&graph, "/income/jobs/tips", Some("A"))),
        ("/income/jobs/employer", Some("B"))
    );
    // B has no tips, so its wages screen leaves the loop
    assert_eq!(
        stop(&next(&graph, "/income/jobs/wages", Some("B"))),
        ("/income/summary/agi", None)
    );
}

#[test]
fn test_empty_collection_skips_the_loop() {
    let graph = empty_graph();
    assert_eq!(
        stop(&next(&graph, "/income/jobs/intro", None)),
        ("/income/summary/agi", None)
    );
}

#[test]
fn test_knockout_takes_precedence_everywhere() {
    let mut graph = empty_graph();
    assert_eq!(next(&graph, "/you/about/abroad", None).route, "/income/jobs/intro");

    set_and_save(&mut graph, &[("/livedAbroad", "true")]);
    for route in ["/you/about/name", "/you/about/abroad", "/income/jobs/intro"] {
        let ko = next(&graph, route, None);
        assert_eq!(ko.route, "/you/about/abroad-ko");
        assert_eq!(ko.kind, NextKind::Knockout);
    }
}

#[test]
fn test_terminal_route() {
    let graph = empty_graph();
    let end = next(&graph, "/income/summary/agi", None);
    assert!(end.is_terminal());
    assert_eq!(end.route, "/review");

    let mut flow = flow();
    flow.set_terminal_route("/done").unwrap();
    let end = flow
        .next_screen("/income/summary/agi", None, &graph)
        .unwrap();
    assert_eq!(stop(&end), ("/done", None));
}

#[test]
fn test_unknown_route() {
    let graph = empty_graph();
    assert_eq!(
        flow().next_screen("/nowhere", None, &graph).unwrap_err(),
        FlowError::UnknownRoute("/nowhere".to_string())
    );
}

#[test]
fn test_route_location_drives_navigation() {
    let mut graph = empty_graph();
    add_w2s(&mut graph, &["A", "B"]);

    let location = RouteLocation::parse("/income/jobs/wages?collectionId=A").unwrap();
    let next = flow()
        .next_screen(&location.route, location.collection_id.as_ref(), &graph)
        .unwrap();
    assert_eq!(
        RouteLocation::from(&next).to_string(),
        "/income/jobs/employer?collectionId=B"
    );
}

#[test]
fn test_checklist_progress() {
    let flow = flow();
    let mut graph = empty_graph();

    let checklist = flow.checklist(&graph);
    let routes: Vec<&str> = checklist.iter().map(|c| c.route.as_str()).collect();
    assert_eq!(routes, ["/you/about", "/income/jobs", "/income/summary"]);
    assert_eq!(checklist[0].category, "/you");
    assert!(checklist.iter().all(|c| c.available));
    assert!(!checklist[0].complete);
    assert!(checklist[1].complete, "no W-2s means nothing to fill in");
    assert!(checklist[2].complete);

    let about = flow.subcategory("/you/about").unwrap();
    assert_eq!(
        flow.first_incomplete_screen(about, &graph),
        Some(PendingScreen {
            route: "/you/about/name".to_string(),
            collection_id: None,
        })
    );

    set_and_save(
        &mut graph,
        &[
            ("/filerName", "Pat"),
            ("/isMarried", "false"),
            ("/livedAbroad", "false"),
        ],
    );
    assert!(flow.is_subcategory_complete(about, &graph));

    add_w2s(&mut graph, &["A"]);
    set_and_save(&mut graph, &[("/formW2s/#A/employer", "Acme")]);
    let jobs = flow.subcategory("/income/jobs").unwrap();
    assert!(!flow.is_subcategory_complete(jobs, &graph));
    assert_eq!(
        flow.first_incomplete_screen(jobs, &graph),
        Some(PendingScreen {
            route: "/income/jobs/wages".to_string(),
            collection_id: Some(item("A")),
        })
    );
}

#[test]
fn test_screen_actions_copy_complete_values() {
    let flow = flow();
    let mut graph = empty_graph();
    let summary = flow.screen("/income/summary/agi").unwrap();

    add_w2s(&mut graph, &["A"]);
    // AGI is incomplete, so nothing is copied
    assert_eq!(summary.apply_actions(&mut graph, None).unwrap(), 0);

    set_and_save(&mut graph, &[("/formW2s/#A/wages", "99.99")]);
    assert_eq!(summary.apply_actions(&mut graph, None).unwrap(), 1);
    assert!(graph.save().valid);
    assert_eq!(
        graph.get(&cp("/confirmedAgi")).unwrap(),
        FactResult::Complete(FactValue::Dollar(Dollar::from_cents(9_999)))
    );
}
