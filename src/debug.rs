//! Read-only introspection of registry state, gated behind the
//! `debug-dumps` feature (enabled by default). These functions never
//! mutate anything and are safe to call from inside a system callback.

use std::fmt::Write as _;

use crate::archetype::ArchetypeId;
use crate::registry::Registry;

/// Snapshot of one index's probing health: sparse capacity, live entry
/// count, and tombstone count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapStats {
    pub capacity: usize,
    pub len: usize,
    pub tombstones: usize,
}

/// [`MapStats`] for each of the registry's four indices.
#[derive(Debug, Clone, Copy)]
pub struct RegistryMapStats {
    pub entity_index: MapStats,
    pub component_index: MapStats,
    pub system_index: MapStats,
    pub type_index: MapStats,
}

impl Registry {
    /// One line per known archetype: its component ids and current entity
    /// count.
    pub fn dump_type_index(&self) -> String {
        let mut out = String::new();
        for archetype in self.archetypes() {
            let ids: Vec<u64> = archetype.set().elements().iter().map(|c| c.raw()).collect();
            let _ = writeln!(
                out,
                "archetype {:?}: components={:?} entities={}",
                archetype.id(),
                ids,
                archetype.len()
            );
        }
        out
    }

    /// A depth-first, indented rendering of the archetype graph from the
    /// root, following right edges and labeling each hop with the
    /// component that was added.
    pub fn dump_archetype_graph(&self) -> String {
        let mut out = String::new();
        self.dump_archetype_node(self.root_id(), 0, &mut out);
        out
    }

    fn dump_archetype_node(&self, node: ArchetypeId, depth: usize, out: &mut String) {
        let archetype = &self.archetypes()[node.0];
        let indent = "  ".repeat(depth);
        let _ = writeln!(out, "{indent}{:?} ({} entities)", node, archetype.len());
        for (component, neighbor) in archetype.right_edges.iter() {
            let _ = writeln!(out, "{indent}  -[{:?}]->", component);
            self.dump_archetype_node(neighbor, depth + 1, out);
        }
    }

    /// Load factor, tombstone count, and capacity for each of the four
    /// registry indices -- useful for diagnosing pathological collision
    /// patterns during development.
    pub fn dump_map_stats(&self) -> RegistryMapStats {
        let to_stats = |(capacity, len, tombstones): (usize, usize, usize)| MapStats { capacity, len, tombstones };
        RegistryMapStats {
            entity_index: to_stats(self.entity_index.stats()),
            component_index: to_stats(self.component_index.stats()),
            system_index: to_stats(self.system_index.stats()),
            type_index: to_stats(self.type_index.stats()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy)]
    struct Pos {
        _x: f32,
    }

    #[test]
    fn dump_type_index_lists_every_archetype() {
        let mut reg = Registry::new();
        let pos = reg.component::<Pos>();
        let e = reg.entity().unwrap();
        reg.attach(e, pos, Pos { _x: 1.0 }).unwrap();

        let dump = reg.dump_type_index();
        assert!(dump.contains("entities=0")); // the root archetype, now empty
        assert!(dump.contains("entities=1"));
    }

    #[test]
    fn dump_archetype_graph_shows_the_new_edge() {
        let mut reg = Registry::new();
        let pos = reg.component::<Pos>();
        let e = reg.entity().unwrap();
        reg.attach(e, pos, Pos { _x: 1.0 }).unwrap();

        let dump = reg.dump_archetype_graph();
        assert!(dump.contains("->"));
    }

    #[test]
    fn dump_map_stats_reflects_registered_components() {
        let mut reg = Registry::new();
        let _pos = reg.component::<Pos>();
        let stats = reg.dump_map_stats();
        assert_eq!(stats.component_index.len, 1);
    }
}
