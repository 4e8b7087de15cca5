use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use std::task::{Context, Poll};

use futures::{Stream, TryStreamExt};

use crate::error::Result;
use crate::message::{Message, MessageBag, MessageKind};
use crate::tool::ToolCall;

/// One increment of a streamed result
#[derive(Clone, Debug, PartialEq)]
pub enum StreamDelta {
    Text(String),
    ToolCall(ToolCall),
}

/// Lazy, single-consumption stream of deltas
///
/// Nothing is pulled from the provider until the stream is polled.
pub struct ResultStream {
    inner: Mutex<Pin<Box<dyn Stream<Item = Result<StreamDelta>> + Send>>>,
}

impl ResultStream {
    pub fn new(stream: impl Stream<Item = Result<StreamDelta>> + Send + 'static) -> Self {
        Self {
            inner: Mutex::new(Box::pin(stream)),
        }
    }

    /// Stream over already-known deltas
    pub fn from_deltas(deltas: Vec<StreamDelta>) -> Self {
        Self::new(futures::stream::iter(deltas.into_iter().map(Ok)))
    }

    /// Drain the stream, concatenating text and gathering tool calls
    pub async fn collect(mut self) -> Result<AssembledStream> {
        let mut assembled = AssembledStream::default();
        while let Some(delta) = self.try_next().await? {
            match delta {
                StreamDelta::Text(text) => assembled.text.push_str(&text),
                StreamDelta::ToolCall(call) => assembled.tool_calls.push(call),
            }
        }
        Ok(assembled)
    }

    /// Drain the stream and append the assembled assistant message
    pub async fn collect_into(self, messages: &mut MessageBag) -> Result<AssembledStream> {
        let assembled = self.collect().await?;
        messages.push(assembled.to_message())?;
        Ok(assembled)
    }
}

impl Stream for ResultStream {
    type Item = Result<StreamDelta>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut()
            .inner
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
            .poll_next(cx)
    }
}

impl std::fmt::Debug for ResultStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ResultStream")
    }
}

/// Everything a drained stream carried
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssembledStream {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
}

impl AssembledStream {
    pub fn to_message(&self) -> Message {
        let content = (!self.text.is_empty()).then(|| self.text.clone());
        Message::new(MessageKind::Assistant {
            content,
            tool_calls: self.tool_calls.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RelayError;
    use crate::message::Role;
    use futures::StreamExt;
    use serde_json::Map;

    #[tokio::test]
    async fn test_collect_into_appends_assistant_message() {
        let stream = ResultStream::from_deltas(vec![
            StreamDelta::Text("Hel".into()),
            StreamDelta::Text("lo".into()),
        ]);
        let mut messages = MessageBag::new();
        messages.push(Message::user("hi")).unwrap();

        let assembled = stream.collect_into(&mut messages).await.unwrap();

        assert_eq!(assembled.text, "Hello");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages.last().unwrap().role(), Role::Assistant);
        assert_eq!(messages.last().unwrap().text().as_deref(), Some("Hello"));
    }

    #[tokio::test]
    async fn test_collect_gathers_tool_calls() {
        let call = ToolCall::new("call_1", "clock", Map::new());
        let stream = ResultStream::from_deltas(vec![StreamDelta::ToolCall(call.clone())]);

        let assembled = stream.collect().await.unwrap();
        assert!(assembled.text.is_empty());
        assert_eq!(assembled.tool_calls, vec![call]);
    }

    #[tokio::test]
    async fn test_stream_is_lazy_and_stops_on_error() {
        let stream = ResultStream::new(futures::stream::iter(vec![
            Ok(StreamDelta::Text("a".into())),
            Err(RelayError::Runtime("connection reset".into())),
        ]));

        let mut stream = stream;
        assert_eq!(stream.next().await.unwrap().unwrap(), StreamDelta::Text("a".into()));
        assert!(stream.next().await.unwrap().is_err());
    }
}
