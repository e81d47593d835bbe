pub mod aggregate;
pub mod client;
mod dto;
mod handlers;
pub mod model;
#[cfg(test)]
pub mod testing;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
