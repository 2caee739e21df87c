//! Live change-event stream.
//!
//! Each connection gets its own bus subscription; the payload is the
//! storage key of the changed resource, and clients re-query the read API
//! for current state. Disconnecting drops the subscription, which
//! unregisters the queue from the bus.

use std::convert::Infallible;

use async_stream::stream;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;

use super::AppState;

pub async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut subscription = state.bus.subscribe(state.subscriber_queue_depth);

    let stream = stream! {
        while let Some(key) = subscription.recv().await {
            yield Ok(Event::default().event("change").data(key));
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
