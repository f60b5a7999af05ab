//! Integration tests for flow construction and static validation

use crate::integration::test_utils::{dictionary, flow};
use factflow::error::{ConfigurationError, FlowError};
use factflow::flow::{validate_flow, Flow};

#[test]
fn test_fixture_flow_is_valid() {
    let findings = validate_flow(&flow(), &dictionary());
    assert!(findings.is_empty(), "unexpected findings: {:?}", findings);
}

#[test]
fn test_every_finding_is_reported() {
    let broken = Flow::from_json(
        r#"{
            "categories": [{"route": "/broken", "subcategories": [
                {"route": "all", "completeIf": ["/noSuchFact"], "children": [
                    {"node": "screen", "route": "name", "conditions": ["/filerName"],
                     "content": [{"type": "fact", "path": "/agi"}]},
                    {"node": "screen", "route": "wages",
                     "content": [{"type": "fact", "path": "/formW2s/*/wages"},
                                 {"type": "info", "i18nKey": "x", "conditions": ["/missing"]},
                                 {"type": "fact", "path": "/alsoMissing"}]},
                    {"node": "collectionLoop", "loopName": "names", "collection": "/filerName",
                     "children": [{"node": "screen", "route": "each"}]}
                ]}
            ]}]
        }"#,
    )
    .unwrap();

    let findings = validate_flow(&broken, &dictionary());
    assert!(findings.contains(&ConfigurationError::LoopNotCollection {
        location: "names".to_string(),
        path: "/filerName".to_string(),
    }));
    assert!(findings.contains(&ConfigurationError::UnknownConditionFact {
        location: "/broken/all".to_string(),
        path: "/noSuchFact".to_string(),
    }));
    assert!(findings.contains(&ConfigurationError::NonBooleanCondition {
        location: "/broken/all/name".to_string(),
        path: "/filerName".to_string(),
    }));
    assert!(findings.contains(&ConfigurationError::DerivedInput {
        location: "/broken/all/name".to_string(),
        path: "/agi".to_string(),
    }));
    assert!(findings.contains(&ConfigurationError::UnknownConditionFact {
        location: "/broken/all/wages".to_string(),
        path: "/missing".to_string(),
    }));
    assert!(findings.contains(&ConfigurationError::UnknownContentFact {
        location: "/broken/all/wages".to_string(),
        path: "/alsoMissing".to_string(),
    }));
    assert!(findings
        .iter()
        .any(|f| matches!(f, ConfigurationError::OutOfLoopScope { path, .. } if path == "/formW2s/*/wages")));
}

#[test]
fn test_malformed_flows_fail_to_build() {
    let duplicate = r#"{"categories": [{"route": "/a", "subcategories": [
        {"route": "b", "children": [
            {"node": "screen", "route": "c"},
            {"node": "screen", "route": "c"}
        ]}]}]}"#;
    assert_eq!(
        Flow::from_json(duplicate).unwrap_err(),
        FlowError::DuplicateRoute("/a/b/c".to_string())
    );

    let nested = r#"{"categories": [{"route": "/a", "subcategories": [
        {"route": "b", "children": [
            {"node": "collectionLoop", "loopName": "outer", "collection": "/formW2s", "children": [
                {"node": "collectionLoop", "loopName": "inner", "collection": "/formW2s",
                 "children": [{"node": "screen", "route": "c"}]}
            ]}
        ]}]}]}"#;
    assert_eq!(
        Flow::from_json(nested).unwrap_err(),
        FlowError::NestedLoop("inner".to_string())
    );

    let wildcard = r#"{"categories": [{"route": "/a", "subcategories": [
        {"route": "b", "children": [
            {"node": "collectionLoop", "loopName": "w", "collection": "/formW2s/*/deps",
             "children": [{"node": "screen", "route": "c"}]}
        ]}]}]}"#;
    assert!(matches!(
        Flow::from_json(wildcard).unwrap_err(),
        FlowError::InvalidLoopCollection { .. }
    ));

    let empty = r#"{"categories": [{"route": "/a", "subcategories": []}]}"#;
    assert!(matches!(
        Flow::from_json(empty).unwrap_err(),
        FlowError::Empty { kind: "Category", .. }
    ));

    assert!(matches!(
        Flow::from_json("{").unwrap_err(),
        FlowError::Json(_)
    ));
}
