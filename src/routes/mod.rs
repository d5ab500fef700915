pub mod files;
pub mod health;
pub mod materials;
pub mod tests;

use crate::{middleware::auth::require_bearer_auth, AppState};
use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

/// All HTTP routes. Everything under `/api` requires a bearer token.
pub fn api_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/files/upload", post(files::upload_file))
        .route("/api/materials/upload", post(materials::upload_material))
        .route("/api/materials", get(materials::list_materials))
        .route(
            "/api/materials/:id",
            get(materials::get_material)
                .patch(materials::update_material)
                .delete(materials::delete_material),
        )
        .route("/api/tests/generate", post(tests::generate_test))
        .route("/api/tests", get(tests::list_tests))
        .route(
            "/api/tests/:id",
            get(tests::get_test)
                .patch(tests::rename_test)
                .delete(tests::delete_test),
        )
        .route("/api/tests/:id/questions", post(tests::add_question))
        .route(
            "/api/tests/:id/questions/:question_id",
            patch(tests::update_question).delete(tests::delete_question),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer_auth));

    Router::new()
        .route("/health", get(health::health))
        .merge(api)
        .with_state(state)
}
