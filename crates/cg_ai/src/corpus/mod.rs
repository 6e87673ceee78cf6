mod chunking;
pub mod model;
pub mod store;

pub use model::{Chunk, CorpusStatus};
pub use store::CorpusStore;
