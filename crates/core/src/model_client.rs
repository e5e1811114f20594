use std::error::Error as StdError;
use std::fmt::{self, Debug, Display};
use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;
use std::time::Duration;

use backoff::ExponentialBackoff;
use react_agent_model::{
    ErrorKind, ModelMessage, ModelProvider, ModelProviderError, ModelRequest,
    ModelResponse, ModelResponseEvent,
};
use tracing::Instrument;

type CompleteResult = Result<String, BackendError>;
type BoxedCompleteFuture = Pin<Box<dyn Future<Output = CompleteResult> + Send>>;
type HandlerFn = Arc<dyn Fn(ModelRequest) -> BoxedCompleteFuture + Send + Sync>;

/// A failed call to the language model backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendError {
    kind: ErrorKind,
    message: String,
}

impl BackendError {
    /// Creates a backend error.
    #[inline]
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns the kind reported by the provider.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the message reported by the provider.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns `true` if retrying the same call may succeed.
    #[inline]
    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }

    fn from_provider<E: ModelProviderError>(err: E) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

impl Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl StdError for BackendError {}

/// A wrapper around a model provider that provides a type-erased interface
/// for the agent loop: a list of messages goes in, the complete reply text
/// comes out.
///
/// Cloning is cheap, all clones share the same provider.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
    timeout: Option<Duration>,
    retry: Option<ExponentialBackoff>,
}

impl ModelClient {
    /// Wraps a model provider.
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // Erase `P` so that the agent doesn't need a generic parameter.
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("got a request: {:?}", req);
                    match fut.await {
                        Ok(resp) => collect_reply(resp).await,
                        Err(err) => {
                            error!("got an error: {err}");
                            Err(BackendError::from_provider(err))
                        }
                    }
                }
                .instrument(trace_span!("model client req")),
            )
        });
        Self {
            handler_fn,
            timeout: None,
            retry: None,
        }
    }

    /// Fails every attempt that takes longer than `timeout` with
    /// [`ErrorKind::Timeout`].
    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Retries transient failures (rate limits, timeouts) following the
    /// given backoff. Other failures are returned immediately.
    #[inline]
    pub fn with_retry(mut self, backoff: ExponentialBackoff) -> Self {
        self.retry = Some(backoff);
        self
    }

    /// Sends the messages to the model and waits for the whole reply.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops streaming when the
    /// future is dropped.
    pub async fn complete(&self, messages: &[ModelMessage]) -> CompleteResult {
        let req = ModelRequest {
            messages: messages.to_vec(),
        };
        let Some(backoff) = self.retry.clone() else {
            return self.attempt(req).await;
        };

        backoff::future::retry(backoff, || {
            let req = req.clone();
            async move {
                self.attempt(req).await.map_err(|err| {
                    if err.is_transient() {
                        warn!("transient model error, retrying: {err}");
                        backoff::Error::transient(err)
                    } else {
                        backoff::Error::permanent(err)
                    }
                })
            }
        })
        .await
    }

    async fn attempt(&self, req: ModelRequest) -> CompleteResult {
        let fut = (self.handler_fn)(req);
        let Some(timeout) = self.timeout else {
            return fut.await;
        };
        match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::new(
                ErrorKind::Timeout,
                format!("no reply within {timeout:?}"),
            )),
        }
    }
}

impl Debug for ModelClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelClient")
            .field("timeout", &self.timeout)
            .field("retry", &self.retry.is_some())
            .finish_non_exhaustive()
    }
}

async fn collect_reply<R: ModelResponse>(resp: R) -> CompleteResult {
    let mut reply = String::new();
    let mut pinned_resp = pin!(resp);
    loop {
        let event = poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx))
            .await
            .map_err(|err| {
                error!("got an error while streaming: {err}");
                BackendError::from_provider(err)
            })?;
        let Some(event) = event else {
            break;
        };
        trace!("got an event: {event:?}");
        match event {
            ModelResponseEvent::MessageDelta(delta) => reply.push_str(&delta),
            ModelResponseEvent::Completed(reason) => {
                debug!("model finished: {reason:?}");
            }
        }
    }
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use react_agent_test_model::{
        PresetEvent, PresetResponse, TestModelProvider,
    };

    use super::*;

    fn quick_backoff() -> ExponentialBackoff {
        backoff::ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(1))
            .with_max_interval(Duration::from_millis(5))
            .with_max_elapsed_time(Some(Duration::from_secs(5)))
            .build()
    }

    #[tokio::test]
    async fn test_complete() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_events([
            PresetEvent::MessageDelta("Resposta: ".to_owned()),
            PresetEvent::MessageDelta("Paris".to_owned()),
        ]));

        let client = ModelClient::new(provider.clone());
        let reply = client
            .complete(&[ModelMessage::User("Qual a capital da França?".to_owned())])
            .await
            .unwrap();
        assert_eq!(reply, "Resposta: Paris");
        assert_eq!(provider.request_count(), 1);
    }

    #[tokio::test]
    async fn test_error_without_retry() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_text("ok").with_failures(1));

        let client = ModelClient::new(provider.clone());
        let err = client.complete(&[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        assert!(err.is_transient());
        assert_eq!(provider.request_count(), 1);
    }

    #[tokio::test]
    async fn test_retry_transient_errors() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_text("ok").with_failures(2));

        let client = ModelClient::new(provider.clone()).with_retry(quick_backoff());
        assert_eq!(client.complete(&[]).await.unwrap(), "ok");
        assert_eq!(provider.request_count(), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        // An empty script fails with `ErrorKind::Other`.
        let provider = TestModelProvider::default();
        let client = ModelClient::new(provider.clone()).with_retry(quick_backoff());
        let err = client.complete(&[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(provider.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let mut provider = TestModelProvider::default();
        provider.set_delay(Duration::from_secs(10));
        provider.add_text_response("too late");

        let client =
            ModelClient::new(provider).with_timeout(Duration::from_secs(1));
        let err = client.complete(&[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }
}
