//! A road routing engine built around Contraction Hierarchies.
//!
//! The crate contains the base graph storage with turn costs, pluggable weightings,
//! node and edge based Contraction Hierarchies, plain and landmark accelerated
//! bidirectional searches and a query graph overlay which inserts snapped points
//! as virtual nodes without touching the base graph.

#[macro_use]
pub mod report;

pub mod algo;
pub mod cli;
pub mod datastr;
pub mod error;
pub mod io;
pub mod query_graph;
pub mod util;
pub mod weighting;

pub use crate::error::RoutingError;

/// Build time information generated by the `built` crate.
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}
