use axum::routing::get;
use axum::Router;

use crate::state::AppState;

pub mod handler;
pub mod service;

pub fn router() -> Router<AppState> {
    Router::new().route("/projects/{user_id}", get(handler::list_projects))
}
