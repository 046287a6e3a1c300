use crate::server::AppContext;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::stream::{self, Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;

pub fn sse_routes() -> Router<AppContext> {
    Router::new().route("/progress", get(progress_handler))
}

/// Percentages of the current engine load or conversion.
///
/// The stream ends after it has delivered 100.
pub async fn progress_handler(
    State(ctx): State<AppContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let updates = ctx.progress.read().subscribe();

    let stream = stream::unfold((updates, false), |(mut updates, done)| async move {
        if done {
            return None;
        }
        let pct = updates.next().await?;
        Some((pct, (updates, pct >= 100)))
    })
    .map(|pct| Ok::<_, Infallible>(Event::default().event("progress").data(pct.to_string())));

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}
