//! factflow: tax interview flows over a typed fact graph
//!
//! A [`graph::FactGraph`] holds the facts of one tax return: writable
//! values a taxpayer supplies and derived values computed from them, with
//! partial completeness and repeatable collections. A [`flow::Flow`]
//! arranges the interview screens that collect those facts, and its
//! navigator decides which screen comes next for the current graph.

pub mod cli;
pub mod config;
pub mod error;
pub mod fact;
pub mod flow;
pub mod graph;
pub mod logging;
pub mod path;
pub mod store;
