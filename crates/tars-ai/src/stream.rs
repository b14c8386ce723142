//! Model gateway trait and text streaming helpers

use async_trait::async_trait;
use futures::StreamExt;
use std::pin::Pin;
use tokio_stream::Stream;

use crate::error::Result;

/// A stream of text deltas from the model
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Transport to a language model.
///
/// Takes one opaque prompt string and streams text back. No retries and no
/// tool semantics live here.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Start streaming a response for `prompt`
    async fn stream(&self, prompt: &str) -> Result<TextStream>;
}

/// Stream a response, calling `on_chunk` for each delta, and return the full text.
pub async fn stream_response(
    gateway: &dyn ModelGateway,
    prompt: &str,
    mut on_chunk: impl FnMut(&str) + Send,
) -> Result<String> {
    let mut stream = gateway.stream(prompt).await?;
    let mut full = String::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        on_chunk(&chunk);
        full.push_str(&chunk);
    }

    Ok(full)
}
