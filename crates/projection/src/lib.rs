pub mod factory;
pub mod families;
pub mod projector;
pub mod raw;
pub mod rotation;
pub mod stream;

pub use factory::*;
pub use families::*;
pub use projector::*;
pub use raw::*;
pub use rotation::*;
pub use stream::*;
