use geo::{BoundingRect, PreparedGeometry, Relate};
use log::{debug, warn};

use crate::geom;
use crate::index::SpatialIndex;
use crate::node::NodeArena;

/// Which touching neighbor absorbs a victim.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MergePolicy {
    #[default]
    LargestArea,
    SmallestArea,
    LongestBoundary,
}

/// A confirmed touching neighbor of one victim.
#[derive(Debug, Clone, Copy)]
pub struct NeighborEdge {
    pub target: usize,
    pub shared_len: f64,
}

/// The merge graph: at most one outgoing edge per victim, none for keeps.
pub struct Assignments {
    pub chosen: Vec<Option<usize>>,
}

/// For each victim, in loader order: probe the index with the victim's
/// bounding rectangle, confirm candidates with the touches predicate against
/// a prepared form of the victim, measure the shared boundary, and pick one
/// neighbor under `policy`. Victims with no touching neighbor stay
/// unassigned and will be dropped.
pub fn resolve(arena: &NodeArena, index: &SpatialIndex, policy: MergePolicy) -> Assignments {
    let mut chosen: Vec<Option<usize>> = vec![None; arena.len()];
    let mut length_warned = false;

    for &v in &arena.victims {
        let node = &arena.nodes[v];
        let Some(bbox) = node.geom.bounding_rect() else {
            warn!("victim {} has an empty geometry, dropping it", node.fid);
            continue;
        };

        // Candidate order is pinned to loader order so tie-breaks stay
        // deterministic regardless of index internals.
        let mut candidates: Vec<usize> = index.probe(bbox).filter(|&c| c != v).collect();
        candidates.sort_unstable();

        if candidates.is_empty() {
            warn!("victim {} has no neighbors, dropping its geometry", node.fid);
            continue;
        }

        let prepared = PreparedGeometry::from(&node.geom);
        let mut edges: Vec<NeighborEdge> = Vec::new();
        for c in candidates {
            let other = &arena.nodes[c];
            if !prepared.relate(&other.geom).is_touches() {
                continue;
            }
            let shared_len = geom::shared_boundary_length(&node.geom, &other.geom);
            if shared_len == 0.0 && !length_warned {
                debug!(
                    "victims touching at a point contribute no boundary length \
                     (first seen between {} and {})",
                    node.fid, other.fid
                );
                length_warned = true;
            }
            edges.push(NeighborEdge { target: c, shared_len });
        }

        if edges.is_empty() {
            warn!(
                "victim {} has no touching neighbors, dropping its geometry",
                node.fid
            );
            continue;
        }

        let best = select_neighbor(&edges, arena, policy);
        chosen[v] = Some(edges[best].target);
    }

    Assignments { chosen }
}

/// Strict comparisons only: an exact tie keeps the earlier edge, so
/// enumeration order is observable exactly where the measures are equal.
fn select_neighbor(edges: &[NeighborEdge], arena: &NodeArena, policy: MergePolicy) -> usize {
    let mut best = 0;
    for (i, edge) in edges.iter().enumerate().skip(1) {
        let better = match policy {
            MergePolicy::LargestArea => {
                arena.nodes[edge.target].area() > arena.nodes[edges[best].target].area()
            }
            MergePolicy::SmallestArea => {
                arena.nodes[edge.target].area() < arena.nodes[edges[best].target].area()
            }
            MergePolicy::LongestBoundary => edge.shared_len > edges[best].shared_len,
        };
        if better {
            best = i;
        }
    }
    best
}
