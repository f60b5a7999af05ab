//! Navigator: picks the screen that follows the current one.
//!
//! Screens are visited in document order. A collection loop visits its
//! screens once per item of its collection; an empty collection skips the
//! loop. Triggered knockout screens take precedence over any candidate, and
//! when nothing is left the terminal route is returned.

use crate::error::FlowError;
use crate::flow::model::{CollectionLoop, Flow, Screen};
use crate::graph::FactGraph;
use crate::path::ItemId;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NextKind {
    Screen,
    Knockout,
    Terminal,
}

/// Where navigation goes next
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextScreen {
    pub route: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<ItemId>,
    pub kind: NextKind,
}

impl NextScreen {
    pub fn is_terminal(&self) -> bool {
        self.kind == NextKind::Terminal
    }
}

/// A screen paired with the collection item it is shown for
type Stop<'f> = (&'f Screen, Option<ItemId>);

pub struct Navigator<'f> {
    flow: &'f Flow,
}

impl<'f> Navigator<'f> {
    pub fn new(flow: &'f Flow) -> Self {
        Self { flow }
    }

    /// Screen following `route` for the item `collection_id`
    #[instrument(skip(self, graph))]
    pub fn next_screen(
        &self,
        route: &str,
        collection_id: Option<&ItemId>,
        graph: &FactGraph,
    ) -> Result<NextScreen, FlowError> {
        let current = self
            .flow
            .screen(route)
            .ok_or_else(|| FlowError::UnknownRoute(route.to_string()))?;

        // Step 1: the rest of the current loop, item by item
        let mut position = current.index + 1;
        let mut candidate = None;
        if let Some(current_loop) = self.flow.loop_of(current) {
            candidate = self.continue_loop(current_loop, current, collection_id, graph);
            position = current_loop.screens.end;
        }

        // Step 2: everything after it in document order
        if candidate.is_none() {
            candidate = self.scan_from(position, Some(current), collection_id, graph);
        }

        Ok(self.resolve(candidate, graph))
    }

    /// First screen of the flow for a graph
    #[instrument(skip(self, graph))]
    pub fn first_screen(&self, graph: &FactGraph) -> NextScreen {
        let candidate = self.scan_from(0, None, None, graph);
        self.resolve(candidate, graph)
    }

    /// First knockout screen whose conditions hold, in document order.
    ///
    /// Only knockout screens with at least one condition take part. Loop
    /// knockouts are checked for every item of their collection.
    pub fn triggered_knockout(&self, graph: &FactGraph) -> Option<Stop<'f>> {
        self.flow
            .knockout_screens()
            .filter(|screen| screen.route_automatically && !screen.conditions.is_empty())
            .find_map(|screen| match self.flow.loop_of(screen) {
                Some(collection_loop) => self
                    .items(collection_loop, graph)
                    .into_iter()
                    .find(|item| screen.conditions_hold(graph, Some(item)))
                    .map(|item| (screen, Some(item))),
                None => screen
                    .conditions_hold(graph, None)
                    .then_some((screen, None)),
            })
    }

    fn resolve(&self, candidate: Option<Stop<'f>>, graph: &FactGraph) -> NextScreen {
        if let Some((screen, collection_id)) = self.triggered_knockout(graph) {
            info!(route = %screen.route, "Knockout screen triggered");
            return NextScreen {
                route: screen.route.clone(),
                collection_id,
                kind: NextKind::Knockout,
            };
        }
        match candidate {
            Some((screen, collection_id)) => {
                debug!(next = %screen.route, "Selected next screen");
                NextScreen {
                    route: screen.route.clone(),
                    collection_id,
                    kind: NextKind::Screen,
                }
            }
            None => {
                debug!("No screens remain; returning terminal route");
                NextScreen {
                    route: self.flow.terminal_route().to_string(),
                    collection_id: None,
                    kind: NextKind::Terminal,
                }
            }
        }
    }

    fn continue_loop(
        &self,
        collection_loop: &'f CollectionLoop,
        current: &Screen,
        collection_id: Option<&ItemId>,
        graph: &FactGraph,
    ) -> Option<Stop<'f>> {
        let items = self.items(collection_loop, graph);
        let position = match collection_id.and_then(|id| items.iter().position(|i| i == id)) {
            Some(position) => position,
            None => {
                warn!(
                    loop_name = %collection_loop.name,
                    "Current item is not in the loop collection; leaving the loop"
                );
                return None;
            }
        };

        let item = &items[position];
        let rest_of_item = (current.index + 1)..collection_loop.screens.end;
        if let Some(screen) = self.first_available(rest_of_item, Some(item), graph) {
            return Some((screen, Some(item.clone())));
        }
        items[position + 1..].iter().find_map(|item| {
            self.first_available(collection_loop.screens.clone(), Some(item), graph)
                .map(|screen| (screen, Some(item.clone())))
        })
    }

    fn scan_from(
        &self,
        mut position: usize,
        current: Option<&Screen>,
        collection_id: Option<&ItemId>,
        graph: &FactGraph,
    ) -> Option<Stop<'f>> {
        let screens = self.flow.screens();
        while position < screens.len() {
            let screen = &screens[position];
            match self.flow.loop_of(screen) {
                Some(collection_loop) => {
                    for item in self.items(collection_loop, graph) {
                        if let Some(found) =
                            self.first_available(collection_loop.screens.clone(), Some(&item), graph)
                        {
                            return Some((found, Some(item)));
                        }
                    }
                    position = collection_loop.screens.end;
                }
                None => {
                    let context = self.carried_item(screen, current, collection_id);
                    if self.is_available(screen, context.as_ref(), graph) {
                        return Some((screen, context));
                    }
                    position += 1;
                }
            }
        }
        None
    }

    /// Item a non-loop screen is shown for: the current item, kept only
    /// within a subcategory that declares a collection context
    fn carried_item(
        &self,
        screen: &Screen,
        current: Option<&Screen>,
        collection_id: Option<&ItemId>,
    ) -> Option<ItemId> {
        let current = current?;
        let same_subcategory = current.subcategory == screen.subcategory;
        let has_context = self.flow.subcategory_of(screen).collection_context.is_some();
        if same_subcategory && has_context {
            collection_id.cloned()
        } else {
            None
        }
    }

    fn first_available(
        &self,
        range: std::ops::Range<usize>,
        collection_id: Option<&ItemId>,
        graph: &FactGraph,
    ) -> Option<&'f Screen> {
        let flow: &'f Flow = self.flow;
        flow.screens()[range]
            .iter()
            .find(|screen| self.is_available(screen, collection_id, graph))
    }

    fn is_available(&self, screen: &Screen, collection_id: Option<&ItemId>, graph: &FactGraph) -> bool {
        screen.route_automatically && screen.conditions_hold(graph, collection_id)
    }

    fn items(&self, collection_loop: &CollectionLoop, graph: &FactGraph) -> Vec<ItemId> {
        match graph.collection_items(&collection_loop.collection) {
            Ok(items) => items,
            Err(e) => {
                warn!(loop_name = %collection_loop.name, error = %e, "Loop collection could not be read");
                Vec::new()
            }
        }
    }
}

impl Flow {
    pub fn navigator(&self) -> Navigator<'_> {
        Navigator::new(self)
    }

    /// Shorthand for [`Navigator::next_screen`]
    pub fn next_screen(
        &self,
        route: &str,
        collection_id: Option<&ItemId>,
        graph: &FactGraph,
    ) -> Result<NextScreen, FlowError> {
        self.navigator().next_screen(route, collection_id, graph)
    }
}
