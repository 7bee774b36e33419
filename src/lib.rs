//! Archetype ECS -- a data-oriented Entity-Component-System core.
//!
//! Entities are stored in archetypes (one per distinct set of attached
//! component kinds), laid out column-major (Structure-of-Arrays) for
//! cache-friendly iteration. Attaching or removing a component relocates
//! an entity's row into a neighboring archetype along an edge of the
//! archetype graph; a system declares a [`Signature`] and is dispatched
//! over every archetype whose set is a superset of it.
//!
//! # Quick Start
//!
//! ```
//! use archetype_ecs::prelude::*;
//!
//! #[derive(Debug, Clone, Copy, PartialEq)]
//! struct Position { x: f32, y: f32 }
//!
//! #[derive(Debug, Clone, Copy, PartialEq)]
//! struct Velocity { dx: f32, dy: f32 }
//!
//! let mut registry = Registry::new();
//! let position = registry.component::<Position>();
//! let velocity = registry.component::<Velocity>();
//!
//! let entity = registry.entity().unwrap();
//! registry.attach(entity, position, Position { x: 0.0, y: 0.0 }).unwrap();
//! registry.attach(entity, velocity, Velocity { dx: 1.0, dy: 2.0 }).unwrap();
//!
//! registry.system(Signature::new(vec![position, velocity]), |view, row| {
//!     let mut pos = view.get::<Position>(row, 0);
//!     let vel = view.get::<Velocity>(row, 1);
//!     pos.x += vel.dx;
//!     pos.y += vel.dy;
//!     *view.get_mut::<Position>(row, 0) = pos;
//! });
//! registry.step();
//!
//! assert_eq!(registry.get::<Position>(entity, position), Some(Position { x: 1.0, y: 2.0 }));
//! ```

#![deny(unsafe_code)]

#[allow(unsafe_code)]
pub mod archetype;
pub mod component_set;
#[cfg(feature = "debug-dumps")]
pub mod debug;
pub mod graph;
pub mod hashmap;
pub mod ids;
#[allow(unsafe_code)]
pub mod registry;
pub mod signature;
#[allow(unsafe_code)]
pub mod system;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::archetype::ArchetypeId;
    pub use crate::component_set::ComponentSet;
    pub use crate::hashmap::{EcsMap, MapKey};
    pub use crate::ids::{ComponentId, Entity, SystemId};
    pub use crate::registry::{EcsError, Registry};
    pub use crate::signature::Signature;
    pub use crate::system::View;
}
