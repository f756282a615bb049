//! Foundation classes for surfit
//!
//! Shared-ownership smart pointers and process-wide id allocation used by
//! the surface engine.

pub mod handles;
pub mod id;

pub use handles::Handle;
pub use id::{IdAllocator, UniqueId};
