//! Tax Document Server
//!
//! Extracts W-2 and 1099-NEC data from uploaded images and PDFs with a
//! vision model, then answers questions about the extracted documents in a
//! per-recipient conversation.
//!
//! # Modules
//!
//! - `document`: Upload containers, extracted records and page rendering
//! - `model`: Language model client seam and the OpenAI-compatible provider
//! - `extraction`: Pages → structured tax record
//! - `session`: Recipient cache and conversation histories
//! - `conversation`: Document-grounded and general chat, summaries
//! - `aggregate`: Totals and per-document summaries
//! - `export`: Table rows and spreadsheet bytes
//! - `advisor`: Tax research queries
//! - `service`: Upload batches and recipient resolution
//! - `routes`: HTTP surface

pub mod advisor;
pub mod aggregate;
pub mod config;
pub mod conversation;
pub mod document;
pub mod error;
pub mod export;
pub mod extraction;
pub mod model;
pub mod prompts;
pub mod routes;
pub mod service;
pub mod session;
pub mod state;

#[cfg(test)]
mod test_fixtures;
