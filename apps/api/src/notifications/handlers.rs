use std::convert::Infallible;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::notifications::diff::SessionView;
use crate::notifications::engine::{NotificationSession, NotificationState};
use crate::notifications::strategy::strategy_for;
use crate::state::AppState;

const NOTIFICATIONS_EVENT: &str = "notifications";

#[derive(Deserialize)]
pub struct StreamQuery {
    pub user_id: String,
    pub view: SessionView,
}

/// Yields the session state after every pass. The session lives inside the
/// stream, so dropping the stream unsubscribes.
pub fn state_stream(session: NotificationSession) -> impl Stream<Item = NotificationState> {
    let rx = session.watch_state();
    stream::unfold((session, rx), |(session, mut rx)| async move {
        rx.changed().await.ok()?;
        let state = rx.borrow_and_update().clone();
        Some((state, (session, rx)))
    })
}

fn to_event(state: &NotificationState) -> Event {
    match Event::default().event(NOTIFICATIONS_EVENT).json_data(state) {
        Ok(event) => event,
        Err(e) => {
            warn!("Failed to encode notification state: {e}");
            Event::default().event(NOTIFICATIONS_EVENT).data("{}")
        }
    }
}

/// GET /api/v1/notifications/stream
pub async fn handle_stream(
    State(state): State<AppState>,
    Query(params): Query<StreamQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let user_id = params.user_id.trim().to_string();
    if user_id.is_empty() {
        return Err(AppError::Validation("user_id is required".to_string()));
    }
    info!(user_id, view = ?params.view, "Notification stream opened");

    let session = NotificationSession::spawn(
        state.store.clone(),
        strategy_for(params.view, user_id),
        state.config.notifications.clone(),
        state.alerts.clone(),
    );
    let events = state_stream(session).map(|s| Ok(to_event(&s)));

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
