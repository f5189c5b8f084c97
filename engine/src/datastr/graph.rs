//! Road graph primitives.
//!
//! Ids, edge keys, packed edge flags, directed edge states and the traits
//! all graph-like structures (base graph, query graph) implement.

pub mod base_graph;
pub mod turn_costs;

pub use self::base_graph::{BaseGraph, GraphBuilder};
pub use self::turn_costs::{TurnCostEntry, TurnCostStorage};

/// Node ids are 32bit unsigned ints
pub type NodeId = u32;
/// Edge ids are 32bit unsigned ints
pub type EdgeId = u32;
/// Directed edges: `2 * edge + reverse`
pub type EdgeKey = u32;
/// Weights are floats, unreachable is `INFINITY`
pub type Weight = f64;

pub const INFINITY: Weight = f64::INFINITY;
/// Marks "no node", e.g. an unset parent.
pub const NO_NODE: NodeId = u32::MAX;
/// Marks "no edge": no skipped edge, no incoming edge at the start of a path,
/// or as an edge constraint, a query which cannot be satisfied.
pub const NO_EDGE: EdgeId = u32::MAX;
/// As an edge constraint: any edge is fine.
pub const ANY_EDGE: EdgeId = u32::MAX - 1;
/// Marks "no directed edge".
pub const NO_KEY: EdgeKey = u32::MAX;

/// Is this an actual edge id rather than one of the sentinels?
#[inline]
pub fn is_valid_edge(edge: EdgeId) -> bool {
    edge < ANY_EDGE
}

#[inline]
pub fn edge_key(edge: EdgeId, reverse: bool) -> EdgeKey {
    debug_assert!(edge < (1 << 31));
    (edge << 1) | reverse as u32
}

#[inline]
pub fn key_edge(key: EdgeKey) -> EdgeId {
    key >> 1
}

#[inline]
pub fn key_is_reverse(key: EdgeKey) -> bool {
    key & 1 == 1
}

/// The key of the same edge traversed in the other direction.
#[inline]
pub fn reverse_key(key: EdgeKey) -> EdgeKey {
    key ^ 1
}

const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Coordinate { lat, lon }
    }

    /// Great circle distance in meters (haversine).
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let d_lat = lat2 - lat1;
        let d_lon = (other.lon - self.lon).to_radians();
        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
    }

    /// Linear interpolation, good enough along a single road segment.
    pub fn interpolate(&self, other: &Coordinate, fraction: f64) -> Coordinate {
        Coordinate {
            lat: self.lat + (other.lat - self.lat) * fraction,
            lon: self.lon + (other.lon - self.lon) * fraction,
        }
    }
}

const FORWARD_ACCESS: u32 = 1;
const BACKWARD_ACCESS: u32 = 1 << 1;
const SPEED_BITS: u32 = 15;
const SPEED_MASK: u32 = (1 << SPEED_BITS) - 1;
const FORWARD_SPEED_SHIFT: u32 = 2;
const BACKWARD_SPEED_SHIFT: u32 = FORWARD_SPEED_SHIFT + SPEED_BITS;
/// Speeds are stored in steps of 0.1 km/h
const SPEED_FACTOR: f64 = 10.0;
pub const MAX_SPEED: f64 = SPEED_MASK as f64 / SPEED_FACTOR;

/// Per direction access and speed of an edge, packed into 32 bits.
/// Forward refers to the storage direction of the edge (base to adj).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct EdgeFlags(u32);

impl EdgeFlags {
    /// Speeds are in km/h and get rounded to 0.1 km/h.
    /// Panics on negative, NaN or too large speeds.
    pub fn new(forward: bool, backward: bool, forward_speed: f64, backward_speed: f64) -> Self {
        let bits = (forward as u32 * FORWARD_ACCESS)
            | (backward as u32 * BACKWARD_ACCESS)
            | (Self::encode_speed(forward_speed) << FORWARD_SPEED_SHIFT)
            | (Self::encode_speed(backward_speed) << BACKWARD_SPEED_SHIFT);
        EdgeFlags(bits)
    }

    /// Accessible both ways with the same speed.
    pub fn both_directions(speed: f64) -> Self {
        Self::new(true, true, speed, speed)
    }

    /// Accessible only from base to adj.
    pub fn one_way(speed: f64) -> Self {
        Self::new(true, false, speed, 0.0)
    }

    pub fn from_bits(bits: u32) -> Self {
        EdgeFlags(bits)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    fn encode_speed(speed: f64) -> u32 {
        assert!((0.0..=MAX_SPEED).contains(&speed), "invalid speed {}", speed);
        (speed * SPEED_FACTOR).round() as u32
    }

    /// Access against (`reverse == true`) or along the storage direction.
    pub fn access(&self, reverse: bool) -> bool {
        let mask = if reverse { BACKWARD_ACCESS } else { FORWARD_ACCESS };
        self.0 & mask != 0
    }

    /// Speed in km/h against (`reverse == true`) or along the storage direction.
    pub fn speed(&self, reverse: bool) -> f64 {
        let shift = if reverse { BACKWARD_SPEED_SHIFT } else { FORWARD_SPEED_SHIFT };
        ((self.0 >> shift) & SPEED_MASK) as f64 / SPEED_FACTOR
    }
}

/// An edge as seen from one of its end points.
///
/// `reverse` tells whether going from `base` to `adj` traverses the edge against its storage direction.
/// Loops yield two states at their node, one for each direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeState {
    pub edge: EdgeId,
    pub base: NodeId,
    pub adj: NodeId,
    pub reverse: bool,
    pub distance: f64,
    /// Flags in storage direction of the edge.
    pub flags: EdgeFlags,
    /// For virtual edges the real edge they were split from, otherwise `edge`.
    pub orig_edge: EdgeId,
}

impl EdgeState {
    /// Key of traversing this state from base to adj.
    pub fn key(&self) -> EdgeKey {
        edge_key(self.edge, self.reverse)
    }

    /// Like `key` but for the real edge a virtual edge was split from.
    pub fn orig_key(&self) -> EdgeKey {
        edge_key(self.orig_edge, self.reverse)
    }

    /// Can this state be traversed from base to adj (`reverse == false`) or from adj to base?
    pub fn access(&self, reverse: bool) -> bool {
        self.flags.access(self.reverse ^ reverse)
    }

    pub fn speed(&self, reverse: bool) -> f64 {
        self.flags.speed(self.reverse ^ reverse)
    }

    /// The same edge seen from the other end point.
    pub fn reversed(&self) -> EdgeState {
        EdgeState {
            base: self.adj,
            adj: self.base,
            reverse: !self.reverse,
            ..*self
        }
    }

    pub fn is_loop(&self) -> bool {
        self.base == self.adj
    }
}

/// Which edge states an iteration should consider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeFilter {
    All,
    /// accessible from base to adj
    Out,
    /// accessible from adj to base
    In,
}

impl EdgeFilter {
    pub fn accept(&self, state: &EdgeState) -> bool {
        match self {
            EdgeFilter::All => true,
            EdgeFilter::Out => state.access(false),
            EdgeFilter::In => state.access(true),
        }
    }
}

/// Base trait for graphs.
/// Interesting behaviour will be added through subtraits.
pub trait Graph {
    fn num_nodes(&self) -> usize;
    /// Number of directed arcs, for road graphs twice the number of edges.
    fn num_arcs(&self) -> usize;
    fn degree(&self, node: NodeId) -> usize;
}

pub trait LinkIterable<Link>: Graph {
    /// Type of the neighbor iterator.
    type Iter<'a>: Iterator<Item = Link>
    where
        Self: 'a;

    /// Get a iterator over the links of the given node.
    fn link_iter(&self, node: NodeId) -> Self::Iter<'_>;
}

/// Road graphs iterate edge states: every edge incident to a node, regardless of access.
/// Searches filter with an `EdgeFilter` or by the weighting returning `INFINITY`.
pub trait RoadGraph: LinkIterable<EdgeState> + Sync {
    /// Size of the edge id space.
    fn num_edges(&self) -> usize;

    /// The state of `edge` ending at `adj`.
    /// Panics if `edge` is not incident to `adj`. For loops the forward state is returned.
    fn edge_state(&self, edge: EdgeId, adj: NodeId) -> EdgeState;

    /// The state traversing the edge in the direction encoded in `key`.
    fn edge_state_by_key(&self, key: EdgeKey) -> EdgeState;

    fn coordinate(&self, node: NodeId) -> Coordinate;

    /// Number of directed edge keys.
    fn num_keys(&self) -> usize {
        2 * self.num_edges()
    }
}
