//! Argument handling shared by the preprocessing and query binaries.

use crate::{
    datastr::graph::{TurnCostStorage, MAX_SPEED},
    io::Reconstruct,
    weighting::*,
};
use std::{path::Path, sync::Arc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CliErr {
    #[error("missing argument <{0}>")]
    MissingArg(&'static str),
    #[error("invalid {name} '{value}', expected {expected}")]
    InvalidArg {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("hierarchy has {ch_nodes} nodes and {ch_edges} edges, the graph {graph_nodes} and {graph_edges}")]
    GraphMismatch {
        ch_nodes: usize,
        ch_edges: usize,
        graph_nodes: usize,
        graph_edges: usize,
    },
    #[error("{0} queries disagree with Dijkstra")]
    Mismatches(usize),
}

/// Positional arguments, consumed front to back.
#[derive(Debug)]
pub struct Args<I> {
    inner: I,
}

impl Args<std::iter::Skip<std::env::Args>> {
    pub fn from_env() -> Self {
        Args {
            inner: std::env::args().skip(1),
        }
    }
}

impl<I: Iterator<Item = String>> Args<I> {
    pub fn new(inner: I) -> Self {
        Args { inner }
    }

    pub fn required(&mut self, name: &'static str) -> Result<String, CliErr> {
        self.inner.next().ok_or(CliErr::MissingArg(name))
    }

    /// The next argument parsed as a number, `default` if there is none.
    pub fn number(&mut self, name: &'static str, default: usize) -> Result<usize, CliErr> {
        match self.inner.next() {
            Some(value) => value.parse().map_err(|_| CliErr::InvalidArg {
                name,
                value,
                expected: "a non negative number",
            }),
            None => Ok(default),
        }
    }

    /// Is the traversal mode argument `edge`? Defaults to node based.
    pub fn edge_based(&mut self) -> Result<bool, CliErr> {
        match self.inner.next().as_deref() {
            None | Some("node") => Ok(false),
            Some("edge") => Ok(true),
            Some(other) => Err(CliErr::InvalidArg {
                name: "traversal mode",
                value: other.to_string(),
                expected: "'node' or 'edge'",
            }),
        }
    }

    /// The weighting name, `fastest` if there is none.
    pub fn weighting_name(&mut self) -> String {
        self.inner.next().unwrap_or_else(|| "fastest".to_string())
    }
}

pub fn weighting_by_name(name: &str, turn_costs: TurnCostProvider) -> Result<Box<dyn Weighting>, CliErr> {
    match name {
        "fastest" => Ok(Box::new(FastestWeighting::new(MAX_SPEED).with_turn_costs(turn_costs))),
        "shortest" => Ok(Box::new(ShortestWeighting::new().with_turn_costs(turn_costs))),
        _ => Err(CliErr::InvalidArg {
            name: "weighting",
            value: name.to_string(),
            expected: "'fastest' or 'shortest'",
        }),
    }
}

/// Turn costs stored next to the graph, none if the directory has no turn cost files.
pub fn load_turn_costs(graph_dir: &str) -> std::io::Result<Option<TurnCostStorage>> {
    if Path::new(graph_dir).join("turn_via").exists() {
        TurnCostStorage::reconstruct_from(&graph_dir).map(Some)
    } else {
        Ok(None)
    }
}

pub fn turn_cost_provider(storage: Option<TurnCostStorage>) -> TurnCostProvider {
    storage.map(|storage| TurnCostProvider::new(Arc::new(storage))).unwrap_or_else(TurnCostProvider::none)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::Deconstruct;

    fn args(values: &[&str]) -> Args<std::vec::IntoIter<String>> {
        Args::new(values.iter().map(|value| value.to_string()).collect::<Vec<_>>().into_iter())
    }

    #[test]
    fn optional_arguments_fall_back_to_defaults() {
        let mut args = args(&["graph"]);
        assert_eq!(args.required("graph dir").unwrap(), "graph");
        assert_eq!(args.required("ch dir"), Err(CliErr::MissingArg("ch dir")));
        assert_eq!(args.number("num queries", 7), Ok(7));
        assert_eq!(args.edge_based(), Ok(false));
        assert_eq!(args.weighting_name(), "fastest");
    }

    #[test]
    fn invalid_arguments_name_what_was_expected() {
        let mut args = args(&["many", "both"]);
        let err = args.number("num queries", 7).unwrap_err();
        assert_eq!(err.to_string(), "invalid num queries 'many', expected a non negative number");
        assert!(matches!(args.edge_based(), Err(CliErr::InvalidArg { name: "traversal mode", .. })));
        assert!(weighting_by_name("curvy", TurnCostProvider::none()).is_err());
        assert_eq!(weighting_by_name("shortest", TurnCostProvider::none()).map(|w| w.name().to_string()).ok().as_deref(), Some("shortest"));
    }

    #[test]
    fn missing_turn_costs_are_no_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap();
        assert!(load_turn_costs(path).unwrap().is_none());
        assert!(!turn_cost_provider(None).is_enabled());

        let mut storage = TurnCostStorage::new();
        storage.restrict(0, 1, 2);
        storage.deconstruct_to(&dir.path()).unwrap();
        let loaded = load_turn_costs(path).unwrap();
        assert_eq!(loaded.as_ref().map(TurnCostStorage::len), Some(1));
        assert!(turn_cost_provider(loaded).is_enabled());
    }
}
