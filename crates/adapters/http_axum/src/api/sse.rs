//! Server-Sent Events (SSE) stream of diagnostics records.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use crate::state::AppState;

/// `GET /api/diagnostics/stream`
///
/// Sends every diagnostics record published after the client connected as
/// a JSON `data:` frame named after the cover. Records dropped because the
/// client lagged are logged and skipped.
pub async fn stream(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, std::convert::Infallible>>> {
    let rx = state.event_bus.subscribe();
    let records = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(diagnostics) => match Event::default()
            .event(diagnostics.cover_id.as_str())
            .json_data(&diagnostics)
        {
            Ok(event) => Some(Ok(event)),
            Err(err) => {
                tracing::warn!(%err, "failed to encode diagnostics for SSE stream");
                None
            }
        },
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "SSE subscriber lagged, some diagnostics were dropped");
            None
        }
    });

    Sse::new(records).keep_alive(KeepAlive::default())
}
