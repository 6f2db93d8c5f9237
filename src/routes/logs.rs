use axum::{
    routing::{get, post},
    Router,
};

use crate::controllers::logs;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/logs", post(logs::create).get(logs::list))
        .route("/logs/{id}", get(logs::show).patch(logs::update).delete(logs::destroy))
}
