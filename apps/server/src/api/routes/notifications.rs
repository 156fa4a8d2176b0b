//! Notification inbox routes

use axum::{
    routing::{get, patch},
    Router,
};

use crate::api::handlers::notifications;
use crate::state::AppState;

pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(notifications::list))
        .route("/:id/read", patch(notifications::mark_read))
}
