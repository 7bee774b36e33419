//! A system's declared component signature.

use crate::component_set::ComponentSet;
use crate::ids::ComponentId;

/// The ordered, user-declared component list a system registers with.
///
/// Order matters twice over: the *sorted set projection*
/// ([`Signature::as_component_set`]) identifies which archetype the system
/// binds to, while the *declared order* is the column order a callback
/// sees via `View::get(row, column)`.
#[derive(Debug, Clone)]
pub struct Signature {
    components: Vec<ComponentId>,
}

impl Signature {
    /// Build a signature from an ordered list of component ids. Order is
    /// preserved verbatim (duplicates are the caller's responsibility --
    /// a system querying the same component twice is a logic error rather
    /// than a representable half-state, so this constructor does not try
    /// to police it).
    pub fn new(components: Vec<ComponentId>) -> Self {
        Self { components }
    }

    /// Number of declared columns.
    #[inline]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// The declared order of component ids.
    #[inline]
    pub fn components(&self) -> &[ComponentId] {
        &self.components
    }

    /// The sorted-set projection used to find/create the archetype this
    /// signature binds to.
    pub fn as_component_set(&self) -> ComponentSet {
        ComponentSet::from_ids(self.components.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::Entity;

    fn cid(n: u64) -> ComponentId {
        ComponentId(Entity(n))
    }

    #[test]
    fn declared_order_is_preserved() {
        let sig = Signature::new(vec![cid(3), cid(1), cid(2)]);
        assert_eq!(sig.components(), &[cid(3), cid(1), cid(2)]);
    }

    #[test]
    fn as_component_set_sorts_and_dedupes() {
        let sig = Signature::new(vec![cid(3), cid(1), cid(2)]);
        let set = sig.as_component_set();
        assert_eq!(
            set.elements().iter().map(|c| c.raw()).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }
}
