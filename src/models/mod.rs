pub mod category;
pub mod labeled;
pub mod message;

pub use category::*;
pub use labeled::*;
pub use message::*;
