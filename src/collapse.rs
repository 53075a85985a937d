use log::warn;

use crate::node::NodeArena;
use crate::resolver::Assignments;

/// For each survivor, the transitive set of victims that merge into it.
pub struct MergeGroups {
    /// Indexed by arena position; non-empty only for keep nodes.
    pub absorbed: Vec<Vec<usize>>,
}

/// Collapse the merge graph. The graph is functional (out-degree at most
/// one), so every victim belongs to exactly one survivor's tree or sits on a
/// victim-only cycle; cycle members are diagnosed once and dropped.
pub fn collapse(arena: &NodeArena, assignments: &Assignments) -> MergeGroups {
    // Invert victim -> target edges into per-node incoming lists.
    let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); arena.len()];
    for (victim, target) in assignments.chosen.iter().enumerate() {
        if let Some(target) = target {
            incoming[*target].push(victim);
        }
    }

    let mut absorbed: Vec<Vec<usize>> = vec![Vec::new(); arena.len()];
    let mut reached = vec![false; arena.len()];
    for &survivor in &arena.keep {
        let mut group = Vec::new();
        let mut stack = incoming[survivor].clone();
        while let Some(victim) = stack.pop() {
            if reached[victim] {
                continue;
            }
            reached[victim] = true;
            group.push(victim);
            stack.extend(incoming[victim].iter().copied());
        }
        absorbed[survivor] = group;
    }

    // Anything assigned but never reached drains into a victim-only cycle.
    let mut reported = vec![false; arena.len()];
    for (victim, target) in assignments.chosen.iter().enumerate() {
        if target.is_none() || reached[victim] || reported[victim] {
            continue;
        }
        let mut members = Vec::new();
        let mut cursor = victim;
        loop {
            reported[cursor] = true;
            members.push(arena.nodes[cursor].fid);
            match assignments.chosen[cursor] {
                Some(next) if !reported[next] && !reached[next] => cursor = next,
                _ => break,
            }
        }
        warn!(
            "victims {members:?} form a merge cycle with no surviving neighbor, \
             dropping their geometries"
        );
    }

    MergeGroups { absorbed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{FeatureNode, NodeKind};
    use geo::polygon;
    use geo_types::MultiPolygon;

    fn node(fid: u64, kind: NodeKind) -> FeatureNode {
        let geom = MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
        ]]);
        FeatureNode::new(fid, kind, Vec::new(), geom)
    }

    fn arena_of(kinds: &[NodeKind]) -> NodeArena {
        let mut arena = NodeArena::default();
        for (i, &kind) in kinds.iter().enumerate() {
            arena.push(node(i as u64, kind));
        }
        arena
    }

    #[test]
    fn direct_assignment_collapses() {
        use NodeKind::*;
        let arena = arena_of(&[Keep, Victim]);
        let groups = collapse(&arena, &Assignments { chosen: vec![None, Some(0)] });
        assert_eq!(groups.absorbed[0], vec![1]);
    }

    #[test]
    fn chains_collapse_transitively() {
        use NodeKind::*;
        // keep(0) <- nothing; victim(1) -> victim(2) -> keep(3)
        let arena = arena_of(&[Keep, Victim, Victim, Keep]);
        let groups = collapse(
            &arena,
            &Assignments { chosen: vec![None, Some(2), Some(3), None] },
        );
        assert!(groups.absorbed[0].is_empty());
        let mut group = groups.absorbed[3].clone();
        group.sort_unstable();
        assert_eq!(group, vec![1, 2]);
    }

    #[test]
    fn two_victim_cycle_is_dropped() {
        use NodeKind::*;
        let arena = arena_of(&[Keep, Victim, Victim]);
        let groups = collapse(
            &arena,
            &Assignments { chosen: vec![None, Some(2), Some(1)] },
        );
        assert!(groups.absorbed[0].is_empty());
        assert!(groups.absorbed[1].is_empty());
        assert!(groups.absorbed[2].is_empty());
    }

    #[test]
    fn chain_into_cycle_is_dropped_with_the_cycle() {
        use NodeKind::*;
        // victim(1) -> victim(2) <-> victim(3), keep(0) untouched
        let arena = arena_of(&[Keep, Victim, Victim, Victim]);
        let groups = collapse(
            &arena,
            &Assignments { chosen: vec![None, Some(2), Some(3), Some(2)] },
        );
        assert!(groups.absorbed.iter().all(|g| g.is_empty()));
    }

    #[test]
    fn unassigned_victims_are_left_alone() {
        use NodeKind::*;
        let arena = arena_of(&[Keep, Victim]);
        let groups = collapse(&arena, &Assignments { chosen: vec![None, None] });
        assert!(groups.absorbed[0].is_empty());
    }
}
