//! Flow configuration: declared shape and the built, navigable form.

use crate::error::FlowError;
use crate::fact::FactValue;
use crate::flow::condition::{all_hold, Condition};
use crate::graph::FactGraph;
use crate::path::{AbstractPath, ConcretePath, ItemId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;
use tracing::debug;

pub const DEFAULT_TERMINAL_ROUTE: &str = "/review";

/// Root of a flow document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowDeclaration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_route: Option<String>,
    pub categories: Vec<CategoryDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDeclaration {
    pub route: String,
    pub subcategories: Vec<SubcategoryDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubcategoryDeclaration {
    pub route: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub complete_if: Vec<Condition>,
    /// Collection whose item the subcategory's screens are shown for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_context: Option<String>,
    pub children: Vec<ChildDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "camelCase")]
pub enum ChildDeclaration {
    Screen(ScreenDeclaration),
    CollectionLoop(LoopDeclaration),
    /// Adds its condition to every screen below it
    Gate(GateDeclaration),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenDeclaration {
    pub route: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<ContentDeclaration>,
    #[serde(default)]
    pub is_knockout: bool,
    #[serde(default = "route_automatically_default")]
    pub route_automatically: bool,
}

fn route_automatically_default() -> bool {
    true
}

impl ScreenDeclaration {
    pub fn new(route: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            conditions: Vec::new(),
            content: Vec::new(),
            is_knockout: false,
            route_automatically: true,
        }
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_content(mut self, content: ContentDeclaration) -> Self {
        self.content.push(content);
        self
    }

    pub fn knockout(mut self) -> Self {
        self.is_knockout = true;
        self
    }

    pub fn manual(mut self) -> Self {
        self.route_automatically = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopDeclaration {
    pub loop_name: String,
    pub collection: String,
    pub children: Vec<ChildDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateDeclaration {
    pub condition: Condition,
    pub children: Vec<ChildDeclaration>,
}

/// Something shown on a screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ContentDeclaration {
    /// Input widget for a writable fact
    #[serde(rename_all = "camelCase")]
    Fact {
        path: String,
        #[serde(default)]
        optional: bool,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        conditions: Vec<Condition>,
    },
    #[serde(rename_all = "camelCase")]
    Info {
        i18n_key: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        conditions: Vec<Condition>,
    },
    #[serde(rename_all = "camelCase")]
    Heading { i18n_key: String },
    /// Marks the screen as a knockout
    #[serde(rename_all = "camelCase")]
    Knockout { i18n_key: String },
    /// Copies `source` into `path` when the screen is submitted
    #[serde(rename_all = "camelCase")]
    SetFactAction { path: String, source: String },
}

/// Built content with parsed paths
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Fact {
        path: AbstractPath,
        optional: bool,
        conditions: Vec<Condition>,
    },
    Info {
        i18n_key: String,
        conditions: Vec<Condition>,
    },
    Heading {
        i18n_key: String,
    },
    Knockout {
        i18n_key: String,
    },
    SetFactAction {
        path: AbstractPath,
        source: AbstractPath,
    },
}

impl Content {
    pub fn conditions(&self) -> &[Condition] {
        match self {
            Content::Fact { conditions, .. } | Content::Info { conditions, .. } => conditions,
            _ => &[],
        }
    }

    /// Fact paths this content reads or writes
    pub fn paths(&self) -> Vec<&AbstractPath> {
        match self {
            Content::Fact { path, .. } => vec![path],
            Content::SetFactAction { path, source } => vec![path, source],
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Screen {
    /// Full route: subcategory route plus the screen's own segment
    pub route: String,
    /// Position in document order
    pub index: usize,
    pub subcategory: usize,
    pub loop_index: Option<usize>,
    /// Own conditions followed by those of enclosing gates
    pub conditions: Vec<Condition>,
    pub content: Vec<Content>,
    pub is_knockout: bool,
    pub route_automatically: bool,
}

impl Screen {
    /// True when every condition holds for `collection_id`
    pub fn conditions_hold(&self, graph: &FactGraph, collection_id: Option<&ItemId>) -> bool {
        all_hold(&self.conditions, graph, collection_id)
    }

    /// Fact inputs currently shown on the screen
    pub fn visible_inputs<'s>(
        &'s self,
        graph: &'s FactGraph,
        collection_id: Option<&'s ItemId>,
    ) -> impl Iterator<Item = (&'s AbstractPath, bool)> + 's {
        self.content.iter().filter_map(move |content| match content {
            Content::Fact {
                path,
                optional,
                conditions,
            } if all_hold(conditions, graph, collection_id) => Some((path, *optional)),
            _ => None,
        })
    }

    /// Stage every `setFactAction` on the screen.
    ///
    /// Actions whose source has no complete value are skipped.
    pub fn apply_actions(
        &self,
        graph: &mut FactGraph,
        collection_id: Option<&ItemId>,
    ) -> Result<usize, FlowError> {
        let mut applied = 0;
        for content in &self.content {
            if let Content::SetFactAction { path, source } = content {
                let source = resolve(source, collection_id)?;
                let target = resolve(path, collection_id)?;
                let value: Option<FactValue> = graph
                    .get(&source)
                    .map_err(|e| FlowError::Action {
                        route: self.route.clone(),
                        reason: e.to_string(),
                    })?
                    .complete_value()
                    .cloned();
                if let Some(value) = value {
                    graph.set(&target, value).map_err(|e| FlowError::Action {
                        route: self.route.clone(),
                        reason: e.to_string(),
                    })?;
                    debug!(source = %source, target = %target, "Applied screen action");
                    applied += 1;
                }
            }
        }
        Ok(applied)
    }
}

/// Resolve a screen path for the item being shown
pub fn resolve(path: &AbstractPath, collection_id: Option<&ItemId>) -> Result<ConcretePath, FlowError> {
    let resolved = match (path.is_abstract(), collection_id) {
        (false, _) => path.to_concrete(),
        (true, Some(id)) => path.as_fact_path().resolve_first(id).and_then(|p| p.into_concrete()),
        (true, None) => return Err(FlowError::MissingItem(path.to_string())),
    };
    Ok(resolved?)
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionLoop {
    pub name: String,
    pub collection: ConcretePath,
    pub subcategory: usize,
    pub screens: Range<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subcategory {
    pub route: String,
    pub category: usize,
    pub complete_if: Vec<Condition>,
    pub collection_context: Option<AbstractPath>,
    pub screens: Range<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub route: String,
    pub subcategories: Range<usize>,
}

/// A built flow: screens flattened in document order
#[derive(Debug, Clone)]
pub struct Flow {
    pub(crate) categories: Vec<Category>,
    pub(crate) subcategories: Vec<Subcategory>,
    pub(crate) loops: Vec<CollectionLoop>,
    pub(crate) screens: Vec<Screen>,
    pub(crate) routes: HashMap<String, usize>,
    pub(crate) terminal_route: String,
}

impl Flow {
    pub fn from_json(json: &str) -> Result<Self, FlowError> {
        let declaration: FlowDeclaration =
            serde_json::from_str(json).map_err(|e| FlowError::Json(e.to_string()))?;
        crate::flow::FlowBuilder::new(declaration).build()
    }

    pub fn screens(&self) -> &[Screen] {
        &self.screens
    }

    pub fn screen(&self, route: &str) -> Option<&Screen> {
        self.routes.get(route).map(|&index| &self.screens[index])
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn subcategories(&self) -> &[Subcategory] {
        &self.subcategories
    }

    pub fn subcategories_of(&self, category: &Category) -> &[Subcategory] {
        &self.subcategories[category.subcategories.clone()]
    }

    pub fn subcategory(&self, route: &str) -> Option<&Subcategory> {
        self.subcategories.iter().find(|s| s.route == route)
    }

    pub fn subcategory_of(&self, screen: &Screen) -> &Subcategory {
        &self.subcategories[screen.subcategory]
    }

    pub fn category_of(&self, subcategory: &Subcategory) -> &Category {
        &self.categories[subcategory.category]
    }

    pub fn screens_of(&self, subcategory: &Subcategory) -> &[Screen] {
        &self.screens[subcategory.screens.clone()]
    }

    pub fn loops(&self) -> &[CollectionLoop] {
        &self.loops
    }

    pub fn collection_loop(&self, name: &str) -> Option<&CollectionLoop> {
        self.loops.iter().find(|l| l.name == name)
    }

    pub fn loop_of(&self, screen: &Screen) -> Option<&CollectionLoop> {
        screen.loop_index.map(|index| &self.loops[index])
    }

    pub fn knockout_screens(&self) -> impl Iterator<Item = &Screen> {
        self.screens.iter().filter(|s| s.is_knockout)
    }

    pub fn terminal_route(&self) -> &str {
        &self.terminal_route
    }

    /// Replace the terminal route; it must be rooted and distinct from every screen
    pub fn set_terminal_route(&mut self, route: impl Into<String>) -> Result<(), FlowError> {
        let route = route.into();
        crate::flow::builder::check_terminal(&route, &self.routes)?;
        self.terminal_route = route;
        Ok(())
    }
}
