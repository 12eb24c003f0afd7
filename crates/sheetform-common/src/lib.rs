pub mod context;
pub mod error;
pub mod range;
pub mod reference;
pub mod selection;
pub mod value;

pub use context::*;
pub use error::*;
pub use range::*;
pub use reference::*;
pub use selection::*;
pub use value::*;
