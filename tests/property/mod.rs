//! Property-based tests for graph and navigation guarantees

mod graph_invariants;
mod navigation_invariants;

use factflow::fact::{FactDictionary, FactType, LimitDeclaration, WritableDeclaration};
use factflow::fact::{BoundDeclaration, Expr};
use factflow::flow::Flow;
use factflow::graph::FactGraph;
use factflow::path::{ConcretePath, ItemId};
use std::sync::Arc;

pub const MAX_WAGES_CENTS: i64 = 100_000_000;

pub fn dictionary() -> Arc<FactDictionary> {
    Arc::new(
        FactDictionary::builder()
            .writable("/isMarried", FactType::Boolean)
            .writable("/livedAbroad", FactType::Boolean)
            .collection("/jobs")
            .writable_with(
                "/jobs/*/wages",
                WritableDeclaration::new(FactType::Dollar).with_limit(LimitDeclaration::Max(
                    BoundDeclaration::Value("1000000".to_string()),
                )),
            )
            .writable("/jobs/*/hasTips", FactType::Boolean)
            .writable("/jobs/*/tips", FactType::Dollar)
            .derived("/totalWages", Expr::CollectionSum("/jobs/*/wages".to_string()))
            .build()
            .unwrap(),
    )
}

pub fn flow() -> Flow {
    Flow::from_json(
        r#"{
            "categories": [
                {"route": "/you", "subcategories": [{"route": "about", "children": [
                    {"node": "screen", "route": "married"},
                    {"node": "screen", "route": "spouse", "conditions": ["/isMarried"]},
                    {"node": "screen", "route": "abroad"},
                    {"node": "screen", "route": "ko", "isKnockout": true,
                     "conditions": ["/livedAbroad"]}
                ]}]},
                {"route": "/income", "subcategories": [{"route": "jobs", "children": [
                    {"node": "screen", "route": "intro"},
                    {"node": "collectionLoop", "loopName": "jobs", "collection": "/jobs", "children": [
                        {"node": "screen", "route": "wages"},
                        {"node": "screen", "route": "tips", "conditions": ["/jobs/*/hasTips"]}
                    ]},
                    {"node": "screen", "route": "done"}
                ]}]}
            ]
        }"#,
    )
    .unwrap()
}

pub fn cp(raw: &str) -> ConcretePath {
    ConcretePath::parse(raw).unwrap()
}

/// Graph with one committed job per entry of `tips`, ids `J0`, `J1`, ...
pub fn graph_with_jobs(tips: &[bool]) -> FactGraph {
    let mut graph = FactGraph::new(dictionary());
    for (index, has_tips) in tips.iter().enumerate() {
        let id = ItemId::new(format!("J{}", index)).unwrap();
        graph
            .add_collection_item(&cp("/jobs"), Some(id.clone()))
            .unwrap();
        graph
            .set(
                &cp(&format!("/jobs/#{}/hasTips", id)),
                factflow::fact::FactValue::Boolean(*has_tips),
            )
            .unwrap();
    }
    assert!(graph.save().valid);
    graph
}
