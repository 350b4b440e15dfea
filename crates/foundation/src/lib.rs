pub mod bounds;
pub mod math;

// Foundation crate: small, dependency-free primitives only.
pub use bounds::*;
