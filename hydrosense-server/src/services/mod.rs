pub mod broadcaster;
pub mod line_reader;
pub mod notifier;
pub mod pipeline;
pub mod state_store;

pub use broadcaster::*;
pub use line_reader::*;
pub use notifier::*;
pub use pipeline::*;
pub use state_store::*;
