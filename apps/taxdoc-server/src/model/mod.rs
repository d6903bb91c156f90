//! Model Module
//!
//! Vision/text language model access behind the `ModelClient` trait.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use taxdoc_server::model::{ChatMessage, ModelClient, ModelRequest, OpenAiProvider};
//!
//! let provider = OpenAiProvider::new(base_url, api_key, "gpt-4o", timeout)?;
//! let reply = provider
//!     .complete(ModelRequest::new(vec![ChatMessage::user("Hello")]))
//!     .await?;
//! ```

#[cfg(test)]
pub(crate) mod mock;
mod provider;
mod types;

pub use provider::{ModelClient, OpenAiProvider};
pub use types::{ChatMessage, ModelError, ModelRequest, ResponseSchema, Role};
