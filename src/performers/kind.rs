//! # Performer capability signature.
//!
//! [`PerformerKind`] is what a plan returns to say "this performer executes
//! me". It bundles the performer's type identity (the registry key), a display
//! name, and the constructor the registry calls on first use.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::performers::{Perform, PerformerContext};

/// Boxed performer as stored by the registry.
pub(crate) type BoxPerformer = Box<dyn Perform>;

type Factory = fn(PerformerContext) -> BoxPerformer;

/// Capability signature of a performer type.
///
/// Equality and hashing only consider the performer's type identity.
#[derive(Clone, Copy)]
pub struct PerformerKind {
    id: TypeId,
    name: &'static str,
    factory: Factory,
}

fn build<P: Perform>(ctx: PerformerContext) -> BoxPerformer {
    Box::new(P::create(ctx))
}

impl PerformerKind {
    /// Returns the signature of performer type `P`.
    pub fn of<P: Perform>() -> Self {
        Self {
            id: TypeId::of::<P>(),
            name: short_type_name::<P>(),
            factory: build::<P>,
        }
    }

    /// Short display name of the performer type.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn create(&self, ctx: PerformerContext) -> BoxPerformer {
        (self.factory)(ctx)
    }
}

impl PartialEq for PerformerKind {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PerformerKind {}

impl Hash for PerformerKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for PerformerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PerformerKind").field(&self.name).finish()
    }
}

/// Last path segment of a type name, without generic arguments.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
