//! Static check of a flow against a fact dictionary.
//!
//! Every finding is collected rather than stopping at the first, so a
//! misconfigured flow can be fixed in one pass.

use crate::error::ConfigurationError;
use crate::fact::{FactDictionary, ValueKind};
use crate::flow::condition::Condition;
use crate::flow::model::{Content, Flow, Screen};
use crate::path::AbstractPath;
use tracing::{info, instrument, warn};

#[instrument(skip_all, fields(screens = flow.screens().len()))]
pub fn validate_flow(flow: &Flow, dictionary: &FactDictionary) -> Vec<ConfigurationError> {
    let mut findings = Vec::new();

    // Step 1: loop collections
    for collection_loop in flow.loops() {
        let path = collection_loop.collection.to_abstract();
        if !dictionary
            .definition(&path)
            .map_or(false, |definition| definition.is_collection())
        {
            findings.push(ConfigurationError::LoopNotCollection {
                location: collection_loop.name.clone(),
                path: path.to_string(),
            });
        }
    }

    // Step 2: subcategory completion conditions
    for subcategory in flow.subcategories() {
        let scope = subcategory.collection_context.as_ref();
        for condition in &subcategory.complete_if {
            check_condition(&mut findings, dictionary, &subcategory.route, condition, scope);
        }
    }

    // Step 3: screens
    for screen in flow.screens() {
        let scope = screen_scope(flow, screen);
        let scope = scope.as_ref();
        for condition in &screen.conditions {
            check_condition(&mut findings, dictionary, &screen.route, condition, scope);
        }
        for content in &screen.content {
            for condition in content.conditions() {
                check_condition(&mut findings, dictionary, &screen.route, condition, scope);
            }
            check_content(&mut findings, dictionary, &screen.route, content, scope);
        }
    }

    if findings.is_empty() {
        info!("Flow validation completed");
    } else {
        for finding in &findings {
            warn!(finding = %finding, "Flow validation finding");
        }
    }
    findings
}

/// Collection whose item a screen's wildcard paths resolve against
fn screen_scope(flow: &Flow, screen: &Screen) -> Option<AbstractPath> {
    match flow.loop_of(screen) {
        Some(collection_loop) => Some(collection_loop.collection.to_abstract()),
        None => flow.subcategory_of(screen).collection_context.clone(),
    }
}

fn check_condition(
    findings: &mut Vec<ConfigurationError>,
    dictionary: &FactDictionary,
    location: &str,
    condition: &Condition,
    scope: Option<&AbstractPath>,
) {
    let Some(kind) = dictionary.value_kind(&condition.path) else {
        findings.push(ConfigurationError::UnknownConditionFact {
            location: location.to_string(),
            path: condition.path.to_string(),
        });
        return;
    };
    if condition.operator.reads_boolean() && kind != ValueKind::Boolean {
        findings.push(ConfigurationError::NonBooleanCondition {
            location: location.to_string(),
            path: condition.path.to_string(),
        });
    }
    check_scope(findings, location, &condition.path, scope);
}

fn check_content(
    findings: &mut Vec<ConfigurationError>,
    dictionary: &FactDictionary,
    location: &str,
    content: &Content,
    scope: Option<&AbstractPath>,
) {
    let written = match content {
        Content::Fact { path, .. } => Some(path),
        Content::SetFactAction { path, .. } => Some(path),
        _ => None,
    };
    for path in content.paths() {
        match dictionary.definition(path) {
            None => findings.push(ConfigurationError::UnknownContentFact {
                location: location.to_string(),
                path: path.to_string(),
            }),
            Some(definition) => {
                if written == Some(path) && !definition.is_writable() {
                    findings.push(ConfigurationError::DerivedInput {
                        location: location.to_string(),
                        path: path.to_string(),
                    });
                }
                check_scope(findings, location, path, scope);
            }
        }
    }
}

/// A wildcard path must sit directly under the item in scope
fn check_scope(
    findings: &mut Vec<ConfigurationError>,
    location: &str,
    path: &AbstractPath,
    scope: Option<&AbstractPath>,
) {
    if !path.is_abstract() {
        return;
    }
    let in_scope = match (path.wildcard_prefixes().first(), scope) {
        (Some(prefix), Some(scope)) => path.wildcard_count() == 1 && prefix == scope,
        _ => false,
    };
    if !in_scope {
        findings.push(ConfigurationError::OutOfLoopScope {
            location: location.to_string(),
            path: path.to_string(),
            collection: scope.map_or_else(|| "(none)".to_string(), |s| s.to_string()),
        });
    }
}
