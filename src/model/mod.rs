//! Pure data structures shared by the order cache, the stores and the host board.

pub mod details;
pub mod drink;
pub mod guest;
pub mod media;
pub mod order;
pub mod room;

pub use details::*;
pub use drink::*;
pub use guest::*;
pub use media::*;
pub use order::*;
pub use room::*;
