//! Checklist: per-subcategory progress for a graph

use crate::flow::model::{resolve, Flow, Screen, Subcategory};
use crate::flow::condition::all_hold;
use crate::graph::FactGraph;
use crate::path::ItemId;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    pub category: String,
    pub route: String,
    /// At least one screen of the subcategory can be shown
    pub available: bool,
    pub complete: bool,
}

/// Screen in need of input, with the item it is shown for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingScreen {
    pub route: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<ItemId>,
}

impl Flow {
    /// Progress of every subcategory in document order
    pub fn checklist(&self, graph: &FactGraph) -> Vec<ChecklistItem> {
        let items: Vec<ChecklistItem> = self
            .subcategories()
            .iter()
            .map(|subcategory| ChecklistItem {
                category: self.category_of(subcategory).route.clone(),
                route: subcategory.route.clone(),
                available: self.is_subcategory_available(subcategory, graph),
                complete: self.is_subcategory_complete(subcategory, graph),
            })
            .collect();
        debug!(
            complete = items.iter().filter(|i| i.complete).count(),
            total = items.len(),
            "Built checklist"
        );
        items
    }

    /// Complete when its `completeIf` conditions hold, or, without any,
    /// when no shown screen has a required input left blank
    pub fn is_subcategory_complete(&self, subcategory: &Subcategory, graph: &FactGraph) -> bool {
        if subcategory.complete_if.is_empty() {
            self.first_incomplete_screen(subcategory, graph).is_none()
        } else {
            all_hold(&subcategory.complete_if, graph, None)
        }
    }

    pub fn is_subcategory_available(&self, subcategory: &Subcategory, graph: &FactGraph) -> bool {
        !self.shown_screens(subcategory, graph).is_empty()
    }

    /// First shown screen with a required input that is not complete
    pub fn first_incomplete_screen(
        &self,
        subcategory: &Subcategory,
        graph: &FactGraph,
    ) -> Option<PendingScreen> {
        self.shown_screens(subcategory, graph)
            .into_iter()
            .find(|(screen, item)| has_missing_input(screen, item.as_ref(), graph))
            .map(|(screen, collection_id)| PendingScreen {
                route: screen.route.clone(),
                collection_id,
            })
    }

    /// Screens of a subcategory whose conditions hold, loop screens once per item
    fn shown_screens<'f>(
        &'f self,
        subcategory: &Subcategory,
        graph: &FactGraph,
    ) -> Vec<(&'f Screen, Option<ItemId>)> {
        let mut shown = Vec::new();
        let screens = self.screens_of(subcategory);
        let mut position = 0;
        while position < screens.len() {
            let screen = &screens[position];
            match self.loop_of(screen) {
                Some(collection_loop) => {
                    let items = graph
                        .collection_items(&collection_loop.collection)
                        .unwrap_or_default();
                    let members = &self.screens()[collection_loop.screens.clone()];
                    for item in items {
                        for member in members {
                            if member.conditions_hold(graph, Some(&item)) {
                                shown.push((member, Some(item.clone())));
                            }
                        }
                    }
                    position += members.len();
                }
                None => {
                    if screen.conditions_hold(graph, None) {
                        shown.push((screen, None));
                    }
                    position += 1;
                }
            }
        }
        shown
    }
}

fn has_missing_input(screen: &Screen, collection_id: Option<&ItemId>, graph: &FactGraph) -> bool {
    screen
        .visible_inputs(graph, collection_id)
        .filter(|(_, optional)| !optional)
        .any(|(path, _)| match resolve(path, collection_id) {
            Ok(concrete) => match graph.get(&concrete) {
                Ok(result) => !result.complete(),
                Err(e) => {
                    warn!(path = %concrete, error = %e, "Input fact could not be read");
                    true
                }
            },
            Err(_) => true,
        })
}
