use std::pin::Pin;
use std::task::{Context, Poll, ready};

use pin_project_lite::pin_project;
use react_agent_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
};

use crate::Error;
use crate::io::Lines;
use crate::proto::ChatChunk;

struct PartialState {
    lines: Lines,
    // Set once the `done` record is seen, the next poll emits it.
    pending_finish_reason: Option<ModelFinishReason>,
    finished: bool,
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    pub struct OllamaResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    }
}

impl OllamaResponse {
    #[inline]
    pub fn from_lines(lines: Lines) -> Self {
        let partial_state = PartialState {
            lines,
            pending_finish_reason: None,
            finished: false,
        };
        Self {
            next_event_fut: Some(Box::pin(next_event(partial_state))),
        }
    }
}

impl ModelResponse for OllamaResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        match ready!(next_event_fut.as_mut().poll(cx)) {
            Ok((Some(event), partial_state)) => {
                *this.next_event_fut =
                    Some(Box::pin(next_event(partial_state)));
                Poll::Ready(Ok(Some(event)))
            }
            Ok((None, _)) => {
                *this.next_event_fut = None;
                Poll::Ready(Ok(None))
            }
            Err(err) => {
                *this.next_event_fut = None;
                Poll::Ready(Err(err))
            }
        }
    }
}

async fn next_event(mut partial_state: PartialState) -> NextEvent {
    if let Some(finish_reason) = partial_state.pending_finish_reason.take() {
        partial_state.finished = true;
        return Ok((
            Some(ModelResponseEvent::Completed(finish_reason)),
            partial_state,
        ));
    }
    if partial_state.finished {
        return Ok((None, partial_state));
    }

    loop {
        let line = match partial_state.lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                return Err(Error::new(
                    "stream ended before the final record",
                    ErrorKind::InvalidResponse,
                ));
            }
            Err(err) => {
                return Err(Error::new(
                    format!("{err:?}"),
                    ErrorKind::InvalidResponse,
                ));
            }
        };
        trace!("got ndjson record: {line}");

        let chunk = serde_json::from_str::<ChatChunk>(&line).map_err(|err| {
            Error::new(format!("{err}"), ErrorKind::InvalidResponse)
        })?;
        if let Some(message) = chunk.error {
            return Err(Error::new(message, ErrorKind::Other));
        }

        if chunk.done {
            let finish_reason = match chunk.done_reason.as_deref() {
                Some("length") => ModelFinishReason::Length,
                _ => ModelFinishReason::Stop,
            };
            partial_state.pending_finish_reason = Some(finish_reason);
        }

        let delta = chunk
            .message
            .map(|m| m.content)
            .filter(|content| !content.is_empty());
        if let Some(delta) = delta {
            return Ok((
                Some(ModelResponseEvent::MessageDelta(delta)),
                partial_state,
            ));
        }

        if let Some(finish_reason) = partial_state.pending_finish_reason.take() {
            partial_state.finished = true;
            return Ok((
                Some(ModelResponseEvent::Completed(finish_reason)),
                partial_state,
            ));
        }
    }
}
