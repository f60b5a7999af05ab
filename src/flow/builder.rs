//! Flow Builder
//!
//! Flattens a [`FlowDeclaration`] into document-ordered screens, attaching
//! gate conditions and loop membership along the way.

use crate::error::FlowError;
use crate::flow::condition::Condition;
use crate::flow::model::{
    Category, ChildDeclaration, CollectionLoop, Content, ContentDeclaration, Flow,
    FlowDeclaration, Screen, ScreenDeclaration, Subcategory, DEFAULT_TERMINAL_ROUTE,
};
use crate::path::{AbstractPath, ConcretePath};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

pub struct FlowBuilder {
    declaration: FlowDeclaration,
    terminal_route: Option<String>,
    categories: Vec<Category>,
    subcategories: Vec<Subcategory>,
    loops: Vec<CollectionLoop>,
    screens: Vec<Screen>,
}

impl FlowBuilder {
    pub fn new(declaration: FlowDeclaration) -> Self {
        Self {
            declaration,
            terminal_route: None,
            categories: Vec::new(),
            subcategories: Vec::new(),
            loops: Vec::new(),
            screens: Vec::new(),
        }
    }

    /// Override the declared terminal route
    pub fn with_terminal_route(mut self, route: impl Into<String>) -> Self {
        self.terminal_route = Some(route.into());
        self
    }

    #[instrument(skip(self), fields(categories = self.declaration.categories.len()))]
    pub fn build(mut self) -> Result<Flow, FlowError> {
        // Step 1: terminal route
        let terminal_route = self
            .terminal_route
            .take()
            .or_else(|| self.declaration.terminal_route.take())
            .unwrap_or_else(|| DEFAULT_TERMINAL_ROUTE.to_string());
        check_rooted(&terminal_route)?;

        // Step 2: flatten categories and subcategories
        let categories = std::mem::take(&mut self.declaration.categories);
        for category in categories {
            check_rooted(&category.route)?;
            if category.subcategories.is_empty() {
                return Err(FlowError::Empty {
                    kind: "Category",
                    route: category.route,
                });
            }
            let category_index = self.categories.len();
            let first_subcategory = self.subcategories.len();
            for subcategory in category.subcategories {
                let route = join_route(&category.route, &subcategory.route)?;
                let collection_context = subcategory
                    .collection_context
                    .as_deref()
                    .map(AbstractPath::parse)
                    .transpose()?;
                let subcategory_index = self.subcategories.len();
                let first_screen = self.screens.len();
                self.subcategories.push(Subcategory {
                    route: route.clone(),
                    category: category_index,
                    complete_if: subcategory.complete_if,
                    collection_context,
                    screens: first_screen..first_screen,
                });
                self.flatten(&route, subcategory_index, subcategory.children, &[], None)?;
                if self.screens.len() == first_screen {
                    return Err(FlowError::Empty {
                        kind: "Subcategory",
                        route,
                    });
                }
                self.subcategories[subcategory_index].screens = first_screen..self.screens.len();
            }
            self.categories.push(Category {
                route: category.route,
                subcategories: first_subcategory..self.subcategories.len(),
            });
        }

        if self.screens.is_empty() {
            return Err(FlowError::Empty {
                kind: "Flow",
                route: "/".to_string(),
            });
        }

        // Step 3: index routes, rejecting duplicates and a terminal that shadows a screen
        let mut routes = HashMap::with_capacity(self.screens.len());
        for screen in &self.screens {
            if routes.insert(screen.route.clone(), screen.index).is_some() {
                return Err(FlowError::DuplicateRoute(screen.route.clone()));
            }
        }
        check_terminal(&terminal_route, &routes)?;

        let flow = Flow {
            categories: self.categories,
            subcategories: self.subcategories,
            loops: self.loops,
            screens: self.screens,
            routes,
            terminal_route,
        };
        info!(
            screens = flow.screens.len(),
            loops = flow.loops.len(),
            knockouts = flow.knockout_screens().count(),
            "Flow build completed"
        );
        Ok(flow)
    }

    fn flatten(
        &mut self,
        base_route: &str,
        subcategory: usize,
        children: Vec<ChildDeclaration>,
        gates: &[Condition],
        loop_index: Option<usize>,
    ) -> Result<(), FlowError> {
        for child in children {
            match child {
                ChildDeclaration::Screen(screen) => {
                    self.push_screen(base_route, subcategory, screen, gates, loop_index)?;
                }
                ChildDeclaration::Gate(gate) => {
                    let mut nested = gates.to_vec();
                    nested.push(gate.condition);
                    self.flatten(base_route, subcategory, gate.children, &nested, loop_index)?;
                }
                ChildDeclaration::CollectionLoop(declared) => {
                    if loop_index.is_some() {
                        return Err(FlowError::NestedLoop(declared.loop_name));
                    }
                    if self.loops.iter().any(|l| l.name == declared.loop_name) {
                        return Err(FlowError::DuplicateLoop(declared.loop_name));
                    }
                    let collection = ConcretePath::parse(&declared.collection).map_err(|_| {
                        FlowError::InvalidLoopCollection {
                            loop_name: declared.loop_name.clone(),
                            collection: declared.collection.clone(),
                        }
                    })?;
                    let index = self.loops.len();
                    let first_screen = self.screens.len();
                    self.loops.push(CollectionLoop {
                        name: declared.loop_name.clone(),
                        collection,
                        subcategory,
                        screens: first_screen..first_screen,
                    });
                    self.flatten(base_route, subcategory, declared.children, gates, Some(index))?;
                    if self.screens.len() == first_screen {
                        return Err(FlowError::Empty {
                            kind: "Collection loop",
                            route: declared.loop_name,
                        });
                    }
                    self.loops[index].screens = first_screen..self.screens.len();
                    debug!(loop_name = %self.loops[index].name, "Flattened collection loop");
                }
            }
        }
        Ok(())
    }

    fn push_screen(
        &mut self,
        base_route: &str,
        subcategory: usize,
        declared: ScreenDeclaration,
        gates: &[Condition],
        loop_index: Option<usize>,
    ) -> Result<(), FlowError> {
        let route = join_route(base_route, &declared.route)?;
        let content = declared
            .content
            .into_iter()
            .map(build_content)
            .collect::<Result<Vec<_>, _>>()?;
        let is_knockout = declared.is_knockout
            || content.iter().any(|c| matches!(c, Content::Knockout { .. }));
        let mut conditions = declared.conditions;
        conditions.extend(gates.iter().cloned());
        self.screens.push(Screen {
            route,
            index: self.screens.len(),
            subcategory,
            loop_index,
            conditions,
            content,
            is_knockout,
            route_automatically: declared.route_automatically,
        });
        Ok(())
    }
}

fn build_content(declared: ContentDeclaration) -> Result<Content, FlowError> {
    Ok(match declared {
        ContentDeclaration::Fact {
            path,
            optional,
            conditions,
        } => Content::Fact {
            path: AbstractPath::parse(&path)?,
            optional,
            conditions,
        },
        ContentDeclaration::Info {
            i18n_key,
            conditions,
        } => Content::Info {
            i18n_key,
            conditions,
        },
        ContentDeclaration::Heading { i18n_key } => Content::Heading { i18n_key },
        ContentDeclaration::Knockout { i18n_key } => Content::Knockout { i18n_key },
        ContentDeclaration::SetFactAction { path, source } => Content::SetFactAction {
            path: AbstractPath::parse(&path)?,
            source: AbstractPath::parse(&source)?,
        },
    })
}

/// The terminal route must not collide with a screen route
pub(crate) fn check_terminal(
    route: &str,
    screens: &HashMap<String, usize>,
) -> Result<(), FlowError> {
    check_rooted(route)?;
    if screens.contains_key(route) {
        return Err(FlowError::DuplicateRoute(route.to_string()));
    }
    Ok(())
}

fn check_rooted(route: &str) -> Result<(), FlowError> {
    if route.starts_with('/') && route.len() > 1 && !route.ends_with('/') {
        Ok(())
    } else {
        Err(FlowError::InvalidRoute(route.to_string()))
    }
}

/// Join a child route onto its parent; a rooted child is taken as-is
fn join_route(base: &str, child: &str) -> Result<String, FlowError> {
    let trimmed = child.trim_matches('/');
    if trimmed.is_empty() || trimmed.contains('?') {
        return Err(FlowError::InvalidRoute(child.to_string()));
    }
    let route = if child.starts_with('/') {
        format!("/{}", trimmed)
    } else {
        format!("{}/{}", base.trim_end_matches('/'), trimmed)
    };
    check_rooted(&route)?;
    Ok(route)
}
