mod file_store;
mod memory;
mod object_store;

pub use file_store::FileStore;
pub use memory::MemoryStore;
pub use object_store::{ObjectStore, StoredObject};
