//! Route table.

use axum::Router;
use axum::routing::{get, post, put};
use tower_http::trace::TraceLayer;

use crate::handlers::{generic_object, habilitation, health, sub_object, suggestion, synthese};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health::health_check))
        .route(
            "/api/generic-object",
            get(generic_object::list).post(generic_object::create),
        )
        .route("/api/generic-object/map", get(generic_object::map))
        .route(
            "/api/generic-object/{id}",
            get(generic_object::get)
                .put(generic_object::update)
                .delete(generic_object::delete),
        )
        .route(
            "/api/generic-object/{id}/history",
            get(generic_object::history),
        )
        .route(
            "/api/generic-object/{id}/children/{sub_id}",
            post(generic_object::attach).delete(generic_object::detach),
        )
        .route(
            "/api/sub-object",
            get(sub_object::list).post(sub_object::create),
        )
        .route(
            "/api/sub-object/{id}",
            get(sub_object::get)
                .put(sub_object::update)
                .delete(sub_object::delete),
        )
        .route(
            "/api/suggestion",
            get(suggestion::list).post(suggestion::submit),
        )
        .route(
            "/api/habilitation",
            get(habilitation::list_mine).post(habilitation::request),
        )
        .route("/api/admin/habilitation", get(habilitation::list_all))
        .route("/api/admin/habilitation/{id}", put(habilitation::decide))
        .route("/api/admin/suggestion/{id}", put(suggestion::review))
        .route("/api/synthese/{id}", get(synthese::build))
        .route("/api/synthese/{id}/print", get(synthese::print))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
