mod dto;
pub mod generate;
mod handlers;
pub mod model;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
