//! Starting and stopping the order cache, plus log setup.

pub mod facade_system;
pub mod tracing;

pub use facade_system::*;
pub use self::tracing::setup_tracing;
