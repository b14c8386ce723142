//! tars-ai: Streaming model gateway
//!
//! This crate provides the transport the agent uses to talk to a language
//! model: one prompt string in, a stream of text deltas out.

pub mod error;
pub mod providers;
pub mod stream;

pub use error::{Error, Result};
pub use providers::GoogleGateway;
pub use stream::{ModelGateway, TextStream, stream_response};
