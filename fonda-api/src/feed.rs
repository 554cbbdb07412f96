use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Extension,
};
use fonda_core::SessionContext;
use futures_util::{Stream, StreamExt};
use std::convert::Infallible;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

use crate::{error::AppError, state::AppState};

/// Name of the event telling a client it missed changes and must refetch.
pub const RESYNC_EVENT: &str = "resync";

/// GET /v1/admin/feed
///
/// One SSE event per row change, named after its table (`orders`,
/// `products`, `customers`) with the change event as JSON data.
pub async fn stream_changes(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    session.require_admin()?;
    let rx = state.feed.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(change) => match Event::default().event(change.table.as_str()).json_data(&change) {
                Ok(event) => Some(Ok(event)),
                Err(e) => {
                    tracing::warn!("Dropping unserializable change event: {}", e);
                    None
                }
            },
            Err(BroadcastStreamRecvError::Lagged(missed)) => Some(Ok(Event::default()
                .event(RESYNC_EVENT)
                .data(missed.to_string()))),
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
