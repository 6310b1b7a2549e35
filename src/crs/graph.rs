//! Coordinate reference systems and the projection graph between them.
//!
//! A [`CrsGraph`] owns a set of CRS descriptors and the directed projection
//! edges registered between them. Whether two systems can be projected into
//! each other is answered by a lazy depth-first search over the edges;
//! composed paths are memoized per (source, target) pair once discovered.
//! There are no global CRS singletons: the graph is an explicit object owned
//! by the application and passed by reference to everything that projects.

use crate::core::point::Point;
use fxhash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// Descriptor of a coordinate reference system.
///
/// A CRS may be identified by a numeric/authority code (`"EPSG:3857"`), a
/// well-known-text string, a free-text description, or any combination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crs {
    /// Authority code, e.g. `EPSG:4326`
    pub code: Option<String>,
    /// Well-known-text definition
    pub wkt: Option<String>,
    /// Free-text description; never used for equality
    pub description: Option<String>,
}

impl Crs {
    pub fn from_code(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            ..Self::default()
        }
    }

    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            wkt: Some(wkt.into()),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = &self.code {
            write!(f, "{}", code)
        } else if let Some(wkt) = &self.wkt {
            write!(f, "{}", wkt)
        } else if let Some(description) = &self.description {
            write!(f, "{}", description)
        } else {
            write!(f, "unnamed CRS")
        }
    }
}

/// Handle to a CRS registered in a [`CrsGraph`].
///
/// Handles are only meaningful for the graph that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CrsId(usize);

/// A projection function mapping coordinates from one CRS into another.
///
/// Projections are directed and not automatically invertible; the inverse
/// must be registered as its own edge if it is needed. Cloning is cheap.
#[derive(Clone)]
pub struct Projection {
    func: Arc<dyn Fn(Point) -> Point + Send + Sync>,
}

impl Projection {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(Point) -> Point + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
        }
    }

    /// The identity projection, used when source and target CRS are equal
    pub fn identity() -> Self {
        Self::new(|point| point)
    }

    /// Applies the projection to a single coordinate pair
    pub fn apply(&self, point: Point) -> Point {
        (self.func)(point)
    }

    /// Returns the composition `p -> next(self(p))`
    pub fn then(&self, next: &Projection) -> Projection {
        let first = self.func.clone();
        let second = next.func.clone();
        Projection::new(move |point| second(first(point)))
    }
}

impl fmt::Debug for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Projection")
    }
}

/// Registry of CRS nodes and the directed projection edges between them.
///
/// Path discovery is lazy: the first `projection_to` query for a pair walks
/// the edges depth-first, composes the functions along the found path and
/// memoizes the result (including "no path", see [`CrsGraph::projection_to`]).
pub struct CrsGraph {
    nodes: Vec<Crs>,
    edges: Vec<Vec<(CrsId, Projection)>>,
    /// Memoized search results; `None` records an exhausted, failed search
    cache: Mutex<FxHashMap<(CrsId, CrsId), Option<Projection>>>,
    /// Nodes with a discovery currently on the call stack (cycle guard)
    visiting: Mutex<FxHashSet<usize>>,
}

impl CrsGraph {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            cache: Mutex::new(FxHashMap::default()),
            visiting: Mutex::new(FxHashSet::default()),
        }
    }

    /// Registers a CRS descriptor and returns its handle
    pub fn add_crs(&mut self, crs: Crs) -> CrsId {
        self.nodes.push(crs);
        self.edges.push(Vec::new());
        CrsId(self.nodes.len() - 1)
    }

    /// Looks up the descriptor behind a handle
    pub fn get(&self, id: CrsId) -> Option<&Crs> {
        self.nodes.get(id.0)
    }

    /// Display form of a CRS handle, for error messages
    pub fn describe(&self, id: CrsId) -> String {
        match self.get(id) {
            Some(crs) => crs.to_string(),
            None => format!("unknown CRS #{}", id.0),
        }
    }

    /// CRS equality: same node, or matching non-empty code, or matching
    /// non-empty WKT.
    ///
    /// Reflexive and symmetric, but deliberately not transitive across mixed
    /// description kinds: a node carrying only a code and a node carrying
    /// only a WKT string are never equal, even if a third node matches both.
    /// Free-text descriptions never participate in equality.
    pub fn equals(&self, a: CrsId, b: CrsId) -> bool {
        if a == b {
            return true;
        }
        let (Some(left), Some(right)) = (self.get(a), self.get(b)) else {
            return false;
        };
        if let (Some(lc), Some(rc)) = (&left.code, &right.code) {
            if !lc.is_empty() && lc == rc {
                return true;
            }
        }
        if let (Some(lw), Some(rw)) = (&left.wkt, &right.wkt) {
            if !lw.is_empty() && lw == rw {
                return true;
            }
        }
        false
    }

    /// Registers a direct projection edge from `source` to `target`.
    ///
    /// Memoized results for other pairs are not invalidated: a pair already
    /// cached as unreachable stays unreachable even if the new edge would
    /// now connect it. Caching is monotonic; register edges before querying.
    pub fn set_projection_to(&mut self, source: CrsId, target: CrsId, projection: Projection) {
        if let Some(outgoing) = self.edges.get_mut(source.0) {
            outgoing.push((target, projection));
        }
    }

    /// Resolves a projection from `source` to `target`, composing a path
    /// through intermediate systems if no direct edge exists.
    ///
    /// Returns `None` when no path can be found; callers that require a
    /// projection raise [`crate::MapError::UnprojectableCrs`] themselves.
    /// Both outcomes are memoized for the life of the graph. A node whose
    /// discovery is already on the call stack answers `None` to the nested
    /// query without memoizing it, which bounds the search on cyclic graphs.
    pub fn projection_to(&self, source: CrsId, target: CrsId) -> Option<Projection> {
        if let Some(hit) = lock_tolerant(&self.cache).get(&(source, target)) {
            return hit.clone();
        }

        if self.equals(source, target) {
            let identity = Projection::identity();
            lock_tolerant(&self.cache).insert((source, target), Some(identity.clone()));
            return Some(identity);
        }

        {
            let mut visiting = lock_tolerant(&self.visiting);
            if !visiting.insert(source.0) {
                // Re-entered during an active discovery of this node
                return None;
            }
        }

        let found = self.discover(source, target);

        lock_tolerant(&self.visiting).remove(&source.0);
        lock_tolerant(&self.cache).insert((source, target), found.clone());
        found
    }

    /// True when a projection path from `source` to `target` exists
    pub fn can_project_to(&self, source: CrsId, target: CrsId) -> bool {
        self.projection_to(source, target).is_some()
    }

    /// Walks the direct edges of `source`, recursing through intermediates
    fn discover(&self, source: CrsId, target: CrsId) -> Option<Projection> {
        let outgoing = self.edges.get(source.0)?;
        for (mid, projection) in outgoing {
            if self.equals(*mid, target) {
                return Some(projection.clone());
            }
            if let Some(rest) = self.projection_to(*mid, target) {
                return Some(projection.then(&rest));
            }
        }
        None
    }

    /// Number of registered CRS nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Default for CrsGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CrsGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrsGraph")
            .field("nodes", &self.nodes)
            .finish_non_exhaustive()
    }
}

/// Recovers the guarded data even if a previous holder panicked
fn lock_tolerant<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scale(factor: f64) -> Projection {
        Projection::new(move |p| p.multiply(factor))
    }

    #[test]
    fn test_direct_projection() {
        let mut graph = CrsGraph::new();
        let a = graph.add_crs(Crs::from_code("A"));
        let b = graph.add_crs(Crs::from_code("B"));
        graph.set_projection_to(a, b, scale(2.0));

        let projection = graph.projection_to(a, b).unwrap();
        assert_eq!(projection.apply(Point::new(1.0, 2.0)), Point::new(2.0, 4.0));
        assert!(!graph.can_project_to(b, a));
    }

    #[test]
    fn test_composed_projection() {
        let mut graph = CrsGraph::new();
        let a = graph.add_crs(Crs::from_code("A"));
        let b = graph.add_crs(Crs::from_code("B"));
        let c = graph.add_crs(Crs::from_code("C"));
        graph.set_projection_to(a, b, scale(2.0));
        graph.set_projection_to(b, c, Projection::new(|p| p.add(&Point::new(1.0, 0.0))));

        let projection = graph.projection_to(a, c).unwrap();
        assert_eq!(projection.apply(Point::new(3.0, 1.0)), Point::new(7.0, 2.0));
    }

    #[test]
    fn test_identity_for_equal_nodes() {
        let mut graph = CrsGraph::new();
        let a = graph.add_crs(Crs::from_code("EPSG:4326"));
        let b = graph.add_crs(Crs::from_code("EPSG:4326"));

        let projection = graph.projection_to(a, b).unwrap();
        let p = Point::new(12.5, -3.0);
        assert_eq!(projection.apply(p), p);
    }

    #[test]
    fn test_cycle_terminates() {
        let mut graph = CrsGraph::new();
        let a = graph.add_crs(Crs::from_code("A"));
        let b = graph.add_crs(Crs::from_code("B"));
        let c = graph.add_crs(Crs::from_code("C"));
        graph.set_projection_to(a, b, scale(2.0));
        graph.set_projection_to(b, a, scale(0.5));

        // The A->B->A cycle must not loop forever and must not shadow the
        // direct answers.
        assert!(graph.can_project_to(a, b));
        assert!(graph.can_project_to(b, a));
        assert!(!graph.can_project_to(a, c));
        assert!(!graph.can_project_to(c, a));
    }

    #[test]
    fn test_negative_result_is_memoized() {
        let mut graph = CrsGraph::new();
        let a = graph.add_crs(Crs::from_code("A"));
        let b = graph.add_crs(Crs::from_code("B"));

        assert!(!graph.can_project_to(a, b));

        // Monotonic caching: the failed search stays cached even though an
        // edge now exists.
        graph.set_projection_to(a, b, scale(2.0));
        assert!(!graph.can_project_to(a, b));
    }

    #[test]
    fn test_equality_by_code_and_wkt() {
        let mut graph = CrsGraph::new();
        let by_code = graph.add_crs(Crs::from_code("EPSG:3857"));
        let by_code_too = graph.add_crs(Crs::from_code("EPSG:3857"));
        let by_wkt = graph.add_crs(Crs::from_wkt("PROJCS[\"WGS 84 / Pseudo-Mercator\"]"));
        let both = graph.add_crs(Crs {
            code: Some("EPSG:3857".to_string()),
            wkt: Some("PROJCS[\"WGS 84 / Pseudo-Mercator\"]".to_string()),
            description: None,
        });

        assert!(graph.equals(by_code, by_code_too));
        assert!(graph.equals(by_code_too, by_code));

        // Not transitive across description kinds: `both` matches either
        // side, but code-only and wkt-only nodes never match each other.
        assert!(graph.equals(by_code, both));
        assert!(graph.equals(by_wkt, both));
        assert!(!graph.equals(by_code, by_wkt));
    }

    #[test]
    fn test_description_never_matches() {
        let mut graph = CrsGraph::new();
        let a = graph.add_crs(Crs::default().with_description("my grid"));
        let b = graph.add_crs(Crs::default().with_description("my grid"));

        assert!(!graph.equals(a, b));
        assert!(graph.equals(a, a));
    }
}
