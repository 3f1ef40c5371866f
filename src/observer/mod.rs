// Observer system: every write runs through the ring pipeline inside one transaction

pub mod context;
pub mod traits;
pub mod pipeline;
pub mod error;
pub mod implementations;

// Re-export core types
pub use context::*;
pub use traits::*;
pub use pipeline::*;
pub use error::*;
