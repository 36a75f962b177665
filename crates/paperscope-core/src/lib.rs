pub mod config;
pub mod error;
pub mod models;
pub mod papers;
pub mod session;
pub mod storage;

pub use config::{AppConfig, FetchConfig, StoreCredentials};
pub use error::{PaperscopeError, Result};
pub use models::*;

pub use papers::{DeleteOutcome, PaperManager};
pub use session::{EndReason, Session, SessionStart, SessionState, SessionSummary, SessionTracker};
pub use storage::{FileStore, MemoryStore, ObjectStore, StoredObject};
