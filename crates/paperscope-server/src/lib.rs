//! Paperscope Server: message handling, session reconciliation and the
//! trust boundary for frontend writes.

pub mod background;
pub mod context;
pub mod error;
pub mod messages;
pub mod trust;

pub use background::Background;
pub use context::{StoreContext, StoreFactory, file_store_factory};
pub use error::{Result, ServerError};
pub use messages::{BrowserEvent, Envelope, MessageSender, Reply, Request, Response};
pub use trust::{TrustPolicy, parse_manually_read};
