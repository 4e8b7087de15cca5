//! Invocation Middleware
//!
//! Hooks run by the platform around every invocation, in the order they were
//! registered. Pre-invocation hooks see the input before it is normalized;
//! post-invocation hooks see the deferred result before the caller does.

use async_trait::async_trait;

use super::deferred::DeferredResult;
use crate::capability::Capability;
use crate::error::Result;
use crate::input::PlatformInput;
use crate::message::{Message, MessageBag};
use crate::model::Model;
use crate::options::Options;

/// Mutable view of an invocation before dispatch
#[derive(Debug)]
pub struct PreInvocation {
    pub model: Model,
    pub input: PlatformInput,
    pub options: Options,
}

/// Mutable view of an invocation after dispatch
#[derive(Debug)]
pub struct PostInvocation {
    pub model: Model,
    pub result: DeferredResult,
    pub options: Options,
}

#[async_trait]
pub trait InvocationMiddleware: Send + Sync {
    async fn before_invoke(&self, _invocation: &mut PreInvocation) -> Result<()> {
        Ok(())
    }

    async fn after_invoke(&self, _invocation: &mut PostInvocation) -> Result<()> {
        Ok(())
    }
}

/// Wraps a text input into a one-message conversation for models that take
/// messages but not raw text
pub struct MessagesInputMiddleware;

#[async_trait]
impl InvocationMiddleware for MessagesInputMiddleware {
    async fn before_invoke(&self, invocation: &mut PreInvocation) -> Result<()> {
        let model = &invocation.model;
        if !model.supports(Capability::InputMessages) || model.supports(Capability::InputText) {
            return Ok(());
        }

        if let PlatformInput::Text(text) = &invocation.input {
            tracing::debug!(model = %model, "Wrapping text input into a conversation");
            let mut messages = MessageBag::new();
            messages.push(Message::user(text.clone()))?;
            invocation.input = PlatformInput::Messages(messages);
        }

        Ok(())
    }
}
