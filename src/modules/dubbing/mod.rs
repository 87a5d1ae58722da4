use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub mod dto;
pub mod handler;
pub mod model;
pub mod repository;
pub mod service;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dub", post(handler::submit_dubbing))
        .route("/status/{dubbing_id}", get(handler::get_status))
        .route("/output/{dubbing_id}", get(handler::get_output))
}
