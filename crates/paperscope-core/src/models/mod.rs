pub mod interaction;
pub mod keys;
pub mod paper;

pub use interaction::*;
pub use keys::{interaction_key_for, paper_key, validate_paper_key};
pub use paper::*;
