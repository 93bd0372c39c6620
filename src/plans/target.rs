//! # Targets: externally owned objects identified by reference identity.
//!
//! The runtime never interprets a target. It keys its registries by
//! [`TargetId`], the address of the shared allocation, so two targets holding
//! equal values are still distinct targets.
//!
//! The runtime holds a [`Target`] only inside the performers and named-plan
//! records that refer to it; releasing those drops the runtime's reference.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Identity of a [`Target`], stable for as long as any clone of it is alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(usize);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target@{:#x}", self.0)
    }
}

/// Shared, type-erased handle to an externally owned object.
///
/// Cloning a `Target` clones the handle, not the object: clones share one identity.
///
/// # Example
/// ```
/// use motionvisor::Target;
///
/// let a = Target::new(0.5_f32);
/// let b = Target::new(0.5_f32);
///
/// assert_eq!(a.id(), a.clone().id());
/// assert_ne!(a.id(), b.id());
/// assert_eq!(a.downcast_ref::<f32>(), Some(&0.5));
/// ```
#[derive(Clone)]
pub struct Target {
    inner: Arc<dyn Any + Send + Sync>,
}

impl Target {
    /// Wraps a value into a new target with a fresh identity.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }

    /// Wraps an already shared object; the target's identity is the `Arc`'s allocation.
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self { inner: value }
    }

    /// Returns the identity key used by the runtime's registries.
    #[inline]
    pub fn id(&self) -> TargetId {
        TargetId(Arc::as_ptr(&self.inner) as *const () as usize)
    }

    /// Returns `true` if both handles refer to the same object.
    #[inline]
    pub fn ptr_eq(&self, other: &Target) -> bool {
        self.id() == other.id()
    }

    /// Borrows the object as `T` if that is its concrete type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Returns a typed shared handle to the object if it is a `T`.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.inner).downcast::<T>().ok()
    }
}

impl<T: Any + Send + Sync> From<Arc<T>> for Target {
    fn from(value: Arc<T>) -> Self {
        Target::from_arc(value)
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Target").field(&self.id()).finish()
    }
}
