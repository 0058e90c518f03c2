pub mod store;
pub mod memory;

pub use store::SessionStore;
pub use memory::{MemoryStore, StoreConfig};
