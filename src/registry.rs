//! The `Registry` facade: entity/component/system id allocation, the
//! archetype arena, and the structural-mutation operations (`attach`,
//! `remove_component`, `set`, `get`) that route entities between
//! archetypes via the graph in [`crate::graph`].

use crate::archetype::{self, Archetype, ArchetypeId};
use crate::component_set::ComponentSet;
use crate::graph;
use crate::hashmap::EcsMap;
use crate::ids::{ComponentId, Entity, IdAllocator, SystemId};
use crate::system::SystemEntry;

/// Initial sparse capacity for the entity index.
pub const INITIAL_ENTITY_CAPACITY: usize = 16;
/// Initial sparse capacity for the component-kind index.
pub const INITIAL_COMPONENT_CAPACITY: usize = 8;
/// Initial sparse capacity for the system index.
pub const INITIAL_SYSTEM_CAPACITY: usize = 4;
/// Initial sparse capacity for the archetype type index.
pub const INITIAL_TYPE_CAPACITY: usize = 8;

/// Contract violations a caller can trigger through the public API.
///
/// Internal invariant violations (a corrupted archetype graph, a
/// mismatched column count) are not represented here -- those stay
/// `debug_assert!`/`panic!`, since no caller action can cause them short of
/// a bug in this crate.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EcsError {
    #[error("entity {0:?} is not known to this registry")]
    UnknownEntity(Entity),
    #[error("component {0:?} is not known to this registry")]
    UnknownComponent(ComponentId),
    #[error("system {0:?} is not known to this registry")]
    UnknownSystem(SystemId),
    #[error("entity {entity:?} does not have component {component:?} attached")]
    ComponentNotAttached { entity: Entity, component: ComponentId },
    #[error("entity {entity:?} already has component {component:?} attached")]
    ComponentAlreadyAttached { entity: Entity, component: ComponentId },
    #[error("structural mutation attempted from inside Registry::step")]
    ReentrantMutation,
}

/// Where one entity currently lives: which archetype, and which row within
/// it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Record {
    pub(crate) archetype: ArchetypeId,
    pub(crate) row: usize,
}

/// Owns every entity, component kind, system, and archetype in one ECS
/// world.
pub struct Registry {
    pub(crate) archetypes: Vec<Archetype>,
    pub(crate) type_index: EcsMap<ComponentSet, ArchetypeId>,
    pub(crate) entity_index: EcsMap<Entity, Record>,
    pub(crate) component_index: EcsMap<ComponentId, usize>,
    pub(crate) system_index: EcsMap<SystemId, SystemEntry>,
    pub(crate) ids: IdAllocator,
    pub(crate) root: ArchetypeId,
    #[cfg(debug_assertions)]
    pub(crate) in_step: bool,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        let mut archetypes = Vec::new();
        let mut type_index = EcsMap::with_capacity(INITIAL_TYPE_CAPACITY);
        let root_set = ComponentSet::empty();
        let root = ArchetypeId(0);
        archetypes.push(Archetype::new(root, root_set.clone(), |_| 0));
        type_index.set(root_set, root);

        Self {
            archetypes,
            type_index,
            entity_index: EcsMap::with_capacity(INITIAL_ENTITY_CAPACITY),
            component_index: EcsMap::with_capacity(INITIAL_COMPONENT_CAPACITY),
            system_index: EcsMap::with_capacity(INITIAL_SYSTEM_CAPACITY),
            ids: IdAllocator::new(),
            root,
            #[cfg(debug_assertions)]
            in_step: false,
        }
    }

    /// Allocate a fresh entity, starting out with no components attached
    /// (placed in the root archetype).
    pub fn entity(&mut self) -> Result<Entity, EcsError> {
        self.reject_reentrant()?;
        let e = self.ids.allocate();
        let row = self.archetypes[self.root.0].add_entity(e);
        self.entity_index.set(e, Record { archetype: self.root, row });
        Ok(e)
    }

    /// Register a component kind sized for `T`, returning the id used to
    /// refer to it in `attach`/`set`/`get`/`remove_component`.
    pub fn component<T: Copy + 'static>(&mut self) -> ComponentId {
        let e = self.ids.allocate();
        let cid = ComponentId(e);
        self.component_index.set(cid, std::mem::size_of::<T>());
        cid
    }

    fn reject_reentrant(&self) -> Result<(), EcsError> {
        #[cfg(debug_assertions)]
        if self.in_step {
            return Err(EcsError::ReentrantMutation);
        }
        Ok(())
    }

    /// Attach `component` to `entity` with the given value, migrating the
    /// entity into (finding or creating) the archetype one component
    /// larger.
    pub fn attach<T: Copy + 'static>(
        &mut self,
        entity: Entity,
        component: ComponentId,
        value: T,
    ) -> Result<(), EcsError> {
        self.reject_reentrant()?;
        if !self.component_index.contains_key(&component) {
            return Err(EcsError::UnknownComponent(component));
        }
        let record = *self
            .entity_index
            .get(&entity)
            .ok_or(EcsError::UnknownEntity(entity))?;
        let a_id = record.archetype;
        let a_row = record.row;
        let a_set = self.archetypes[a_id.0].set().clone();

        let mut b_set = a_set.clone();
        b_set.insert(component);
        if b_set == a_set {
            return Err(EcsError::ComponentAlreadyAttached { entity, component });
        }

        let b_id = match self.type_index.get(&b_set).copied() {
            Some(id) => id,
            None => {
                let component_index = &self.component_index;
                let size_fn = move |c: ComponentId| component_index.get(&c).copied().unwrap_or(0);
                graph::insert_vertex(&mut self.archetypes, &mut self.type_index, size_fn, self.root, a_id, b_set, component)
            }
        };

        let (left_arch, right_arch) = graph::borrow_two_mut(&mut self.archetypes, a_id.0, b_id.0);
        let (right_row, swapped) = archetype::move_entity_right(&mut *left_arch, &mut *right_arch, a_row);
        unsafe {
            right_arch.set_component(right_row, component, &value as *const T as *const u8);
        }

        self.entity_index.set(entity, Record { archetype: b_id, row: right_row });
        if let Some(swapped_entity) = swapped {
            self.entity_index.set(swapped_entity, Record { archetype: a_id, row: a_row });
        }

        tracing::debug!(?entity, ?component, from = a_id.0, to = b_id.0, "attached component");
        Ok(())
    }

    /// Remove `component` from `entity`, migrating it into (finding or
    /// creating) the archetype one component smaller.
    pub fn remove_component(&mut self, entity: Entity, component: ComponentId) -> Result<(), EcsError> {
        self.reject_reentrant()?;
        let record = *self
            .entity_index
            .get(&entity)
            .ok_or(EcsError::UnknownEntity(entity))?;
        let a_id = record.archetype;
        let a_row = record.row;
        let a_set = self.archetypes[a_id.0].set().clone();

        if !self.component_index.contains_key(&component) {
            return Err(EcsError::UnknownComponent(component));
        }
        if a_set.index_of(component).is_none() {
            return Err(EcsError::ComponentNotAttached { entity, component });
        }
        let mut b_set = a_set.clone();
        b_set.remove(component);

        let b_id = match self.type_index.get(&b_set).copied() {
            Some(id) => id,
            None => {
                let component_index = &self.component_index;
                let size_fn = move |c: ComponentId| component_index.get(&c).copied().unwrap_or(0);
                graph::traverse_and_create(&mut self.archetypes, &mut self.type_index, size_fn, self.root, &b_set)
            }
        };

        // traverse_and_create only discovers sibling edges one component
        // short of whatever it creates, which does not necessarily include
        // `a_id` (one component *larger* than `b_id`) -- wire that edge
        // directly if it is still missing.
        if self.archetypes[a_id.0].left_edges.find(component) != Some(b_id) {
            let (smaller, bigger) = graph::borrow_two_mut(&mut self.archetypes, b_id.0, a_id.0);
            graph::make_edges(smaller, bigger, component);
        }

        let (left_arch, right_arch) = graph::borrow_two_mut(&mut self.archetypes, a_id.0, b_id.0);
        let (right_row, swapped) = archetype::move_entity_left(&mut *left_arch, &mut *right_arch, a_row);

        self.entity_index.set(entity, Record { archetype: b_id, row: right_row });
        if let Some(swapped_entity) = swapped {
            self.entity_index.set(swapped_entity, Record { archetype: a_id, row: a_row });
        }

        tracing::debug!(?entity, ?component, from = a_id.0, to = b_id.0, "removed component");
        Ok(())
    }

    /// Overwrite `component`'s value on `entity` in place. The entity must
    /// already have `component` attached (use [`Registry::attach`]
    /// otherwise).
    pub fn set<T: Copy + 'static>(&mut self, entity: Entity, component: ComponentId, value: T) -> Result<(), EcsError> {
        self.reject_reentrant()?;
        let record = *self
            .entity_index
            .get(&entity)
            .ok_or(EcsError::UnknownEntity(entity))?;
        let archetype = &mut self.archetypes[record.archetype.0];
        if archetype.set().index_of(component).is_none() {
            return Err(EcsError::ComponentNotAttached { entity, component });
        }
        unsafe {
            archetype.set_component(record.row, component, &value as *const T as *const u8);
        }
        Ok(())
    }

    /// Read `component`'s current value on `entity`, or `None` if the
    /// entity is unknown or does not have `component` attached.
    pub fn get<T: Copy + 'static>(&self, entity: Entity, component: ComponentId) -> Option<T> {
        let record = self.entity_index.get(&entity)?;
        let archetype = &self.archetypes[record.archetype.0];
        let ptr = archetype.component_ptr(record.row, component)?;
        Some(unsafe { *(ptr as *const T) })
    }

    /// `true` iff `entity` is known and currently has `component` attached.
    pub fn has_component(&self, entity: Entity, component: ComponentId) -> bool {
        self.entity_index
            .get(&entity)
            .map(|r| self.archetypes[r.archetype.0].set().index_of(component).is_some())
            .unwrap_or(false)
    }

    pub(crate) fn archetypes(&self) -> &[Archetype] {
        &self.archetypes
    }

    pub(crate) fn root_id(&self) -> ArchetypeId {
        self.root
    }
}
