//! One-shot control messages.

use axum::extract::State;
use axum::http::StatusCode;

use crate::state::AppState;

/// Handle the configuration-open control message.
///
/// Delegates to the navigator and replies with an empty 204: control
/// messages never produce a channel reply or a response body.
pub async fn open_options(State(state): State<AppState>) -> StatusCode {
    state.navigator.open_options();
    StatusCode::NO_CONTENT
}
