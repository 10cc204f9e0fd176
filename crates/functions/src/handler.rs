use std::future::Future;

use crate::{HandlerOutput, InvocationContext, InvocationEvent};

/// One named serverless-style function.
///
/// Expected outcomes (validation, conflicts, store failures) come back as
/// `Ok` responses. `Err` is an unexpected fault; the dispatcher turns it into
/// a `500` carrying the error's display text.
#[async_trait::async_trait]
pub trait FunctionHandler: Send + Sync {
    async fn call(&self, event: InvocationEvent, ctx: InvocationContext) -> anyhow::Result<HandlerOutput>;
}

/// Adapter turning an async closure into a [`FunctionHandler`].
pub struct FnHandler<F>(F);

pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(InvocationEvent, InvocationContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<HandlerOutput>> + Send,
{
    FnHandler(f)
}

#[async_trait::async_trait]
impl<F, Fut> FunctionHandler for FnHandler<F>
where
    F: Fn(InvocationEvent, InvocationContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<HandlerOutput>> + Send,
{
    async fn call(&self, event: InvocationEvent, ctx: InvocationContext) -> anyhow::Result<HandlerOutput> {
        (self.0)(event, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HttpMethod;
    use serde_json::json;

    #[tokio::test]
    async fn closures_become_handlers() {
        let handler = handler_fn(|event: InvocationEvent, ctx: InvocationContext| async move {
            Ok::<_, anyhow::Error>(HandlerOutput::Payload(json!({
                "function": ctx.function_name,
                "method": event.method().as_str(),
            })))
        });

        let output = handler
            .call(InvocationEvent::new(HttpMethod::Get, "/fn/echo"), InvocationContext::new("echo"))
            .await
            .unwrap();
        assert_eq!(
            output,
            HandlerOutput::Payload(json!({ "function": "echo", "method": "GET" }))
        );
    }
}
