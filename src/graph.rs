//! Archetype graph construction.
//!
//! Archetypes form a graph: each vertex is an [`Archetype`], each edge is
//! labeled with the single component that distinguishes the two endpoints.
//! A right edge `(c, B)` on `A` means `B.set() == A.set() + {c}`; the
//! matching left edge `(c, A)` lives on `B`. [`insert_vertex`] creates a new
//! vertex and wires both the edge to its known left neighbor and any
//! sibling edges discovered elsewhere in the graph; [`traverse_and_create`]
//! walks (and extends) the graph from the root to reach an archetype for an
//! arbitrary target set, one component at a time.

use crate::archetype::{Archetype, ArchetypeId};
use crate::component_set::ComponentSet;
use crate::hashmap::EcsMap;
use crate::ids::ComponentId;

/// Borrow two distinct elements of `items` mutably at once, in the order
/// requested, regardless of which index is numerically larger.
///
/// # Panics
/// Panics if `i == j`.
pub(crate) fn borrow_two_mut<T>(items: &mut [T], i: usize, j: usize) -> (&mut T, &mut T) {
    assert_ne!(i, j, "borrow_two_mut requires distinct indices");
    if i < j {
        let (left, right) = items.split_at_mut(j);
        (&mut left[i], &mut right[0])
    } else {
        let (left, right) = items.split_at_mut(i);
        (&mut right[0], &mut left[j])
    }
}

/// Wire a right edge `a -[c]-> b` and the matching left edge `b -[c]-> a`.
pub(crate) fn make_edges(a: &mut Archetype, b: &mut Archetype, c: ComponentId) {
    let a_id = a.id();
    let b_id = b.id();
    a.right_edges.push(c, b_id);
    b.left_edges.push(c, a_id);
}

/// Create a new archetype vertex for `new_set`, wire it as `left`'s right
/// neighbor labeled `component_for_edge`, and discover any existing
/// archetype exactly one component short of `new_set` as an additional
/// left neighbor.
///
/// `left` must already satisfy `new_set == left.set() + {component_for_edge}`.
pub(crate) fn insert_vertex(
    archetypes: &mut Vec<Archetype>,
    type_index: &mut EcsMap<ComponentSet, ArchetypeId>,
    component_size: impl Fn(ComponentId) -> usize + Copy,
    root: ArchetypeId,
    left: ArchetypeId,
    new_set: ComponentSet,
    component_for_edge: ComponentId,
) -> ArchetypeId {
    let id = ArchetypeId(archetypes.len());
    let vertex = Archetype::new(id, new_set.clone(), component_size);
    archetypes.push(vertex);
    type_index.set(new_set.clone(), id);

    {
        let (left_arch, vertex_arch) = borrow_two_mut(archetypes, left.0, id.0);
        make_edges(left_arch, vertex_arch, component_for_edge);
    }

    wire_siblings(archetypes, root, id, &new_set);

    tracing::debug!(
        archetype = id.0,
        components = new_set.len(),
        "created archetype vertex"
    );
    id
}

/// Descend from `root` via right edges only, wiring an edge to every
/// existing archetype whose set is exactly one component short of
/// `new_set` and a subset of it.
///
/// Descending only via right edges from `root` still reaches the whole
/// graph: `root`'s set is empty and every archetype is some number of
/// right-edge hops away from it. A node already wired to `vertex` (for
/// instance `vertex`'s own `left` neighbor, wired by the caller before this
/// runs) is detected via the existing edge and skipped, so this never
/// double-wires regardless of how many paths reach a candidate.
fn wire_siblings(archetypes: &mut Vec<Archetype>, root: ArchetypeId, vertex: ArchetypeId, new_set: &ComponentSet) {
    descend(archetypes, root, vertex, new_set);
}

fn descend(archetypes: &mut Vec<Archetype>, node: ArchetypeId, vertex: ArchetypeId, new_set: &ComponentSet) {
    let node_len = archetypes[node.0].set().len();
    let target_len = new_set.len();

    if node_len >= target_len {
        return;
    }
    if node_len + 1 < target_len {
        let children: Vec<ArchetypeId> = archetypes[node.0].right_edges.iter().map(|(_, n)| n).collect();
        for child in children {
            descend(archetypes, child, vertex, new_set);
        }
        return;
    }

    // node_len + 1 == target_len: node is a candidate sibling iff it is
    // also a subset of new_set.
    if !new_set.is_superset(archetypes[node.0].set()) {
        return;
    }
    let extra = new_set.single_extra_over(archetypes[node.0].set());
    if archetypes[node.0].right_edges.find(extra) == Some(vertex) {
        return;
    }
    let (node_arch, vertex_arch) = borrow_two_mut(archetypes, node.0, vertex.0);
    make_edges(node_arch, vertex_arch, extra);
}

/// Find or create the archetype whose set is exactly `target`, walking
/// from `root` one component at a time and creating any missing vertex
/// along the way.
pub(crate) fn traverse_and_create(
    archetypes: &mut Vec<Archetype>,
    type_index: &mut EcsMap<ComponentSet, ArchetypeId>,
    component_size: impl Fn(ComponentId) -> usize + Copy,
    root: ArchetypeId,
    target: &ComponentSet,
) -> ArchetypeId {
    let mut current = root;
    loop {
        if archetypes[current.0].set() == target {
            return current;
        }

        let next_component = {
            let current_set = archetypes[current.0].set();
            target
                .elements()
                .iter()
                .copied()
                .find(|c| current_set.index_of(*c).is_none())
                .expect("target is reached one component at a time, so one must remain")
        };

        if let Some(next) = archetypes[current.0].right_edges.find(next_component) {
            current = next;
            continue;
        }

        let new_set = {
            let mut set = archetypes[current.0].set().clone();
            set.insert(next_component);
            set
        };
        current = insert_vertex(archetypes, type_index, component_size, root, current, new_set, next_component);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::Entity;

    fn cid(n: u64) -> ComponentId {
        ComponentId(Entity(n))
    }

    fn new_registry_like() -> (Vec<Archetype>, EcsMap<ComponentSet, ArchetypeId>, ArchetypeId) {
        let mut archetypes = Vec::new();
        let root_set = ComponentSet::empty();
        let root = ArchetypeId(0);
        archetypes.push(Archetype::new(root, root_set.clone(), |_| 4));
        let mut type_index = EcsMap::with_capacity(8);
        type_index.set(root_set, root);
        (archetypes, type_index, root)
    }

    #[test]
    fn traverse_and_create_builds_a_path_one_component_at_a_time() {
        let (mut archetypes, mut type_index, root) = new_registry_like();
        let target = ComponentSet::from_ids([cid(1), cid(2), cid(3)]);

        let id = traverse_and_create(&mut archetypes, &mut type_index, |_| 4, root, &target);

        assert_eq!(archetypes[id.0].set(), &target);
        // Root -> {1} -> {1,2} -> {1,2,3}: three new vertices plus root.
        assert_eq!(archetypes.len(), 4);
    }

    #[test]
    fn traverse_and_create_reuses_existing_archetypes() {
        let (mut archetypes, mut type_index, root) = new_registry_like();
        let first = ComponentSet::from_ids([cid(1)]);
        let a = traverse_and_create(&mut archetypes, &mut type_index, |_| 4, root, &first);

        let second = ComponentSet::from_ids([cid(1)]);
        let b = traverse_and_create(&mut archetypes, &mut type_index, |_| 4, root, &second);

        assert_eq!(a, b);
        assert_eq!(archetypes.len(), 2);
    }

    #[test]
    fn sibling_discovery_wires_smaller_existing_archetype_as_a_left_neighbor() {
        let (mut archetypes, mut type_index, root) = new_registry_like();

        // Build {1,2} first, then {1} via a different order ({2} then {1,2})
        // so that inserting {1,2} via {2} should discover the pre-existing
        // {1} archetype as a sibling left neighbor.
        let one = ComponentSet::from_ids([cid(1)]);
        let one_id = traverse_and_create(&mut archetypes, &mut type_index, |_| 4, root, &one);

        let two = ComponentSet::from_ids([cid(2)]);
        let two_id = traverse_and_create(&mut archetypes, &mut type_index, |_| 4, root, &two);

        let both = ComponentSet::from_ids([cid(1), cid(2)]);
        let both_id = insert_vertex(&mut archetypes, &mut type_index, |_| 4, root, two_id, both, cid(1));

        assert_eq!(archetypes[one_id.0].right_edges.find(cid(2)), Some(both_id));
        assert_eq!(archetypes[both_id.0].left_edges.find(cid(2)), Some(one_id));
    }
}
