//! Interview flow: screens, their gating conditions, and navigation.
//!
//! A flow is declared as categories of subcategories of screens. It is
//! built once into a [`Flow`], checked against the fact dictionary with
//! [`validate_flow`], and then walked with a [`Navigator`].

pub mod builder;
pub mod checklist;
pub mod condition;
pub mod model;
pub mod navigator;
pub mod route;
pub mod validate;

pub use builder::FlowBuilder;
pub use checklist::{ChecklistItem, PendingScreen};
pub use condition::{Condition, ConditionOperator, RawCondition};
pub use model::{
    Category, CollectionLoop, Content, Flow, FlowDeclaration, Screen, Subcategory,
    DEFAULT_TERMINAL_ROUTE,
};
pub use navigator::{Navigator, NextKind, NextScreen};
pub use route::RouteLocation;
pub use validate::validate_flow;
