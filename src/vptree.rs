//! Vantage-point tree.
//!
//! Each node holds a vantage point and the median distance from it to the
//! rest of its subtree. Points no farther than the median go inside, the
//! others go outside. Nodes live in an arena and refer to each other by slot.

use ordered_float::OrderedFloat;
use tracing::debug;

use crate::{
    distance::euclidean,
    error::IndexError,
    index::{Point, SpatialIndex},
    neighbors::Neighbors,
};

const NONE: usize = usize::MAX;

#[derive(Debug, Default)]
pub struct VpTree {
    live: usize,
}

struct Node {
    id: usize,
    threshold: f64,
    inside: usize,
    outside: usize,
}

/// Built tree. Owns a copy of the points and the node arena.
pub struct VpArena {
    points: Vec<Point>,
    nodes: Vec<Node>,
    root: usize,
}

impl VpTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of trees built and not yet released.
    #[must_use]
    pub fn live_handles(&self) -> usize {
        self.live
    }
}

impl VpArena {
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height_of(self.root)
    }

    fn height_of(&self, node: usize) -> usize {
        if node == NONE {
            return 0;
        }
        let node = &self.nodes[node];
        1 + self.height_of(node.inside).max(self.height_of(node.outside))
    }

    fn build_node(&mut self, ids: &mut [usize]) -> usize {
        let Some((&mut vantage, rest)) = ids.split_first_mut() else {
            return NONE;
        };
        let slot = self.nodes.len();
        self.nodes.push(Node {
            id: vantage,
            threshold: 0.0,
            inside: NONE,
            outside: NONE,
        });
        if rest.is_empty() {
            return slot;
        }

        // Partition the remaining points around the median distance
        let origin = self.points[vantage];
        let median = rest.len() / 2;
        rest.select_nth_unstable_by_key(median, |&id| {
            OrderedFloat(euclidean(&origin, &self.points[id]))
        });
        let threshold = euclidean(&origin, &self.points[rest[median]]);
        let (inside, outside) = rest.split_at_mut(median);

        let inside = self.build_node(inside);
        let outside = self.build_node(outside);
        let node = &mut self.nodes[slot];
        node.threshold = threshold;
        node.inside = inside;
        node.outside = outside;
        slot
    }

    fn search(&self, node: usize, query: &Point, neighbors: &mut Neighbors) {
        if node == NONE {
            return;
        }
        let node = &self.nodes[node];
        let distance = euclidean(query, &self.points[node.id]);
        neighbors.push(distance, node.id);

        // Visit the likelier side first, then the other one only if the
        // current k-th candidate still reaches across the threshold.
        if distance < node.threshold {
            self.search(node.inside, query, neighbors);
            if distance + neighbors.kth_distance() >= node.threshold {
                self.search(node.outside, query, neighbors);
            }
        } else {
            self.search(node.outside, query, neighbors);
            if distance - neighbors.kth_distance() <= node.threshold {
                self.search(node.inside, query, neighbors);
            }
        }
    }
}

impl SpatialIndex for VpTree {
    type Handle = VpArena;

    fn name(&self) -> &str {
        "VP-Tree"
    }

    fn build(&mut self, points: &[Point]) -> Result<VpArena, IndexError> {
        if let Some(id) = points.iter().position(|p| p.iter().any(|x| x.is_nan())) {
            return Err(IndexError::Build(format!("point {id} is not a number")));
        }
        let mut arena = VpArena {
            points: points.to_vec(),
            nodes: Vec::with_capacity(points.len()),
            root: NONE,
        };
        let mut ids: Vec<usize> = (0..points.len()).collect();
        arena.root = arena.build_node(&mut ids);
        debug!(points = arena.len(), height = arena.height(), "built vp-tree");
        self.live += 1;
        Ok(arena)
    }

    fn nearest_k(
        &self,
        arena: &VpArena,
        query: &Point,
        k: usize,
    ) -> Result<Vec<usize>, IndexError> {
        if query.iter().any(|x| x.is_nan()) {
            return Err(IndexError::Query(format!("query is not a number: {query:?}")));
        }
        let mut neighbors = Neighbors::new(k.min(arena.len()));
        arena.search(arena.root, query, &mut neighbors);
        Ok(neighbors.into_ids())
    }

    fn release(&mut self, arena: VpArena) {
        self.live -= 1;
        debug!(nodes = arena.nodes.len(), "released vp-tree");
        drop(arena);
    }
}
