//! System registration and dispatch.
//!
//! A system binds a [`Signature`] to a callback. [`Registry::system`]
//! resolves (creating if necessary) the archetype exactly matching the
//! signature's component set and treats it as the system's root; calling
//! [`Registry::step`] runs every system once, visiting that root archetype
//! and every archetype reachable from it via right edges (every archetype
//! that is a superset of the signature), resolving the signature's
//! column indices once per visited archetype rather than once per row.

use crate::archetype::{Archetype, ArchetypeId};
use crate::graph;
use crate::ids::{ComponentId, SystemId};
use crate::registry::Registry;
use crate::signature::Signature;

/// A per-row view over one visited archetype's columns, handed to a
/// system callback. Column indices are resolved once per archetype
/// (see [`Registry::step`]), so `get`/`get_mut` only ever do a raw
/// pointer offset.
pub struct View<'a> {
    archetype: &'a mut Archetype,
    columns: &'a [usize],
}

impl<'a> View<'a> {
    /// Read the signature's `column`-th declared component for `row`.
    pub fn get<T: Copy + 'static>(&self, row: usize, column: usize) -> T {
        let idx = self.columns[column];
        unsafe { *(self.archetype.column_ptr(row, idx) as *const T) }
    }

    /// Mutably access the signature's `column`-th declared component for
    /// `row`.
    pub fn get_mut<T: Copy + 'static>(&mut self, row: usize, column: usize) -> &mut T {
        let idx = self.columns[column];
        unsafe { &mut *(self.archetype.column_ptr_mut(row, idx) as *mut T) }
    }

    /// Number of rows (entities) currently in the visited archetype.
    pub fn len(&self) -> usize {
        self.archetype.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archetype.is_empty()
    }
}

pub(crate) struct SystemEntry {
    archetype: ArchetypeId,
    signature: Signature,
    callback: Box<dyn FnMut(&mut View<'_>, usize)>,
}

impl Registry {
    /// Register a system against `signature`, finding or creating the
    /// archetype exactly matching its component set as the dispatch root.
    pub fn system(&mut self, signature: Signature, callback: impl FnMut(&mut View<'_>, usize) + 'static) -> SystemId {
        let target_set = signature.as_component_set();
        let component_index = &self.component_index;
        let size_fn = move |c: ComponentId| component_index.get(&c).copied().unwrap_or(0);
        let root_archetype = graph::traverse_and_create(&mut self.archetypes, &mut self.type_index, size_fn, self.root, &target_set);

        let entity = self.ids.allocate();
        let sid = SystemId(entity);
        self.system_index.set(
            sid,
            SystemEntry {
                archetype: root_archetype,
                signature,
                callback: Box::new(callback),
            },
        );
        tracing::debug!(system = ?sid, archetype = root_archetype.0, "registered system");
        sid
    }

    /// Run every registered system once, in registration order, each over
    /// every archetype that is a superset of its signature.
    ///
    /// Structural mutation (`entity`/`attach`/`remove_component`/`set`) is
    /// rejected while a step is in progress (debug builds only, via
    /// [`crate::registry::EcsError::ReentrantMutation`]) -- a callback that
    /// mutates the registry it is being driven by could invalidate the
    /// column pointers the dispatch loop is mid-iteration over.
    pub fn step(&mut self) {
        #[cfg(debug_assertions)]
        {
            self.in_step = true;
        }

        let system_ids: Vec<SystemId> = self.system_index.iter().map(|(k, _)| *k).collect();
        for sid in system_ids {
            self.step_one(sid);
        }

        #[cfg(debug_assertions)]
        {
            self.in_step = false;
        }
    }

    fn step_one(&mut self, sid: SystemId) {
        // Pull the entry out so the callback's borrow of itself doesn't
        // alias `self.archetypes`, which the loop below also borrows.
        let Some(mut entry) = self.system_index.remove(&sid) else {
            return;
        };

        let mut order = Vec::new();
        let mut visited = vec![false; self.archetypes.len()];
        collect_descendants(&self.archetypes, entry.archetype, &mut visited, &mut order);

        let declared = entry.signature.components().to_vec();
        for archetype_id in order {
            let (row_count, columns) = {
                let archetype_ref = &self.archetypes[archetype_id.0];
                let set = archetype_ref.set();
                let columns: Vec<usize> = declared
                    .iter()
                    .map(|&c| {
                        set.index_of(c)
                            .expect("a descendant of the signature's archetype is a superset of it")
                    })
                    .collect();
                (archetype_ref.len(), columns)
            };

            tracing::trace!(system = ?sid, archetype = archetype_id.0, rows = row_count, "visiting archetype");

            let archetype = &mut self.archetypes[archetype_id.0];
            let mut view = View { archetype, columns: &columns };
            for row in 0..row_count {
                (entry.callback)(&mut view, row);
            }
        }

        self.system_index.set(sid, entry);
    }
}

/// Depth-first, insertion-order walk of the archetype graph's right edges
/// from `node`, visiting each reachable archetype exactly once even if
/// several paths lead to it.
fn collect_descendants(archetypes: &[Archetype], node: ArchetypeId, visited: &mut [bool], order: &mut Vec<ArchetypeId>) {
    if visited[node.0] {
        return;
    }
    visited[node.0] = true;
    order.push(node);
    for (_, neighbor) in archetypes[node.0].right_edges.iter() {
        collect_descendants(archetypes, neighbor, visited, order);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Pos {
        x: f32,
        y: f32,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Vel {
        dx: f32,
        dy: f32,
    }

    #[test]
    fn step_visits_every_matching_archetype_once() {
        let mut reg = Registry::new();
        let pos = reg.component::<Pos>();
        let vel = reg.component::<Vel>();

        let moving = reg.entity().unwrap();
        reg.attach(moving, pos, Pos { x: 0.0, y: 0.0 }).unwrap();
        reg.attach(moving, vel, Vel { dx: 1.0, dy: 2.0 }).unwrap();

        let still = reg.entity().unwrap();
        reg.attach(still, pos, Pos { x: 5.0, y: 5.0 }).unwrap();

        let sig = Signature::new(vec![pos, vel]);
        let mut visits = 0usize;
        reg.system(sig, move |view, row| {
            let mut p = view.get::<Pos>(row, 0);
            let v = view.get::<Vel>(row, 1);
            p.x += v.dx;
            p.y += v.dy;
            *view.get_mut::<Pos>(row, 0) = p;
            visits += 1;
        });

        reg.step();

        assert_eq!(reg.get::<Pos>(moving, pos), Some(Pos { x: 1.0, y: 2.0 }));
        assert_eq!(reg.get::<Pos>(still, pos), Some(Pos { x: 5.0, y: 5.0 }));
    }

    #[test]
    fn step_reaches_archetypes_created_after_the_system_was_registered() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut reg = Registry::new();
        let pos = reg.component::<Pos>();
        let vel = reg.component::<Vel>();

        let sig = Signature::new(vec![pos]);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_in_system = Rc::clone(&seen);
        reg.system(sig, move |view, row| {
            seen_in_system.borrow_mut().push(view.get::<Pos>(row, 0));
        });

        let e = reg.entity().unwrap();
        reg.attach(e, pos, Pos { x: 1.0, y: 1.0 }).unwrap();
        reg.attach(e, vel, Vel { dx: 0.0, dy: 0.0 }).unwrap();

        reg.step();

        assert_eq!(*seen.borrow(), vec![Pos { x: 1.0, y: 1.0 }]);
    }

    // `in_step` only exists under `cfg(debug_assertions)`; in release builds
    // `reject_reentrant` is an unconditional `Ok(())`, so this guarantee is
    // a debug-build-only contract, matching `step`'s own doc comment.
    #[cfg(debug_assertions)]
    #[test]
    fn structural_mutation_from_inside_a_callback_is_rejected() {
        use crate::registry::EcsError;
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut reg = Registry::new();
        let pos = reg.component::<Pos>();
        let vel = reg.component::<Vel>();

        let e = reg.entity().unwrap();
        reg.attach(e, pos, Pos { x: 0.0, y: 0.0 }).unwrap();

        // `step` holds `&mut Registry` for its whole duration and hands the
        // callback only a `View`, so there is no safe path back into the
        // registry from inside a callback -- this raw pointer is the one
        // the guard exists to catch. Sound here only because the callback
        // runs synchronously within `reg.step()` below, never outliving it.
        let reg_ptr: *mut Registry = &mut reg;
        let errors = Rc::new(RefCell::new(Vec::new()));
        let errors_in_system = Rc::clone(&errors);

        reg.system(Signature::new(vec![pos]), move |_view, _row| {
            let registry = unsafe { &mut *reg_ptr };
            let mut seen = errors_in_system.borrow_mut();
            seen.push(registry.attach(e, vel, Vel { dx: 0.0, dy: 0.0 }).unwrap_err());
            seen.push(registry.entity().unwrap_err());
            seen.push(registry.remove_component(e, pos).unwrap_err());
            seen.push(registry.set(e, pos, Pos { x: 9.0, y: 9.0 }).unwrap_err());
        });

        reg.step();

        assert_eq!(
            *errors.borrow(),
            vec![
                EcsError::ReentrantMutation,
                EcsError::ReentrantMutation,
                EcsError::ReentrantMutation,
                EcsError::ReentrantMutation,
            ]
        );

        // The guard only rejects calls made while a step is in progress --
        // once it returns, the same operations succeed normally.
        assert!(reg.attach(e, vel, Vel { dx: 0.0, dy: 0.0 }).is_ok());
    }
}
