use geo::BoundingRect;
use geo_types::Rect;
use rstar::{AABB, RStarInsertionStrategy, RTree, RTreeObject, RTreeParams};

use crate::node::NodeArena;

/// Keep R-tree nodes at the capacity the merge workload was tuned for.
pub struct NodeCapacity;

impl RTreeParams for NodeCapacity {
    const MIN_SIZE: usize = 4;
    const MAX_SIZE: usize = 10;
    const REINSERTION_COUNT: usize = 2;
    type DefaultInsertionStrategy = RStarInsertionStrategy;
}

/// Bounding rectangle of one arena entry. The payload is an index into the
/// arena, never a reference, so the tree carries no lifetime of its own.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub idx: usize,
    bbox: Rect<f64>,
}

impl RTreeObject for IndexEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.bbox.min().into(), self.bbox.max().into())
    }
}

/// Bulk-loaded R-tree over the bounding rectangles of every loaded feature.
pub struct SpatialIndex {
    rtree: RTree<IndexEntry, NodeCapacity>,
}

impl SpatialIndex {
    /// Index every node in the arena. Nodes whose geometry has no extent
    /// (empty multipolygons) are left out; they can never touch anything.
    pub fn bulk_load(arena: &NodeArena) -> Self {
        let entries = arena
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(idx, node)| {
                node.geom
                    .bounding_rect()
                    .map(|bbox| IndexEntry { idx, bbox })
            })
            .collect();
        Self {
            rtree: RTree::bulk_load_with_params(entries),
        }
    }

    /// Arena indices of every entry whose bounding rectangle intersects
    /// `rect`. The caller filters out the probing feature itself.
    pub fn probe(&self, rect: Rect<f64>) -> impl Iterator<Item = usize> + '_ {
        let search = AABB::from_corners(rect.min().into(), rect.max().into());
        self.rtree
            .locate_in_envelope_intersecting(&search)
            .map(|entry| entry.idx)
    }
}
