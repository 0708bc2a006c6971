//! Todo items kept in the store next to the dataset.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A todo entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: String,
    pub text: String,
    pub complete: bool,
}

impl Todo {
    /// Create an open todo with a fresh id.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            complete: false,
        }
    }
}
