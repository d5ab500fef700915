use crate::{
    dto::test_dto::{
        GenerateTestPayload, GenerateTestResponse, QuestionCreate, QuestionOut, QuestionUpdate,
        RenameTestPayload, TestDetailOut, TestOut, TestTitleOut,
    },
    error::{Error, Result},
    middleware::auth::AuthUser,
    AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

#[axum::debug_handler]
pub async fn generate_test(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: std::result::Result<Json<GenerateTestPayload>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(payload) = payload.map_err(|e| Error::InvalidRequestShape(e.body_text()))?;
    let request = payload.into_request()?;
    tracing::info!(owner_id = %user.id, has_text = request.text.is_some(), file_id = ?request.file_id, "Test generation requested");

    let summary = state
        .generation_service
        .generate_test_from_input(request, user.id)
        .await?;
    Ok((StatusCode::CREATED, Json(GenerateTestResponse::from(summary))))
}

#[axum::debug_handler]
pub async fn list_tests(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let tests = state.test_service.list_tests_for_user(user.id).await?;
    let body: Vec<TestOut> = tests.into_iter().map(TestOut::from).collect();
    Ok(Json(body))
}

#[axum::debug_handler]
pub async fn get_test(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(test_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let test = state.test_service.get_test_detail(user.id, test_id).await?;
    Ok(Json(TestDetailOut::from(&test)))
}

#[axum::debug_handler]
pub async fn rename_test(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(test_id): Path<Uuid>,
    Json(payload): Json<RenameTestPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let row = state
        .test_service
        .rename_test(user.id, test_id, &payload.title)
        .await?;
    Ok(Json(TestTitleOut::from(row)))
}

#[axum::debug_handler]
pub async fn delete_test(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(test_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.test_service.delete_test(user.id, test_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn add_question(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(test_id): Path<Uuid>,
    Json(payload): Json<QuestionCreate>,
) -> Result<impl IntoResponse> {
    let question = state.test_service.add_question(user.id, test_id, payload).await?;
    Ok((StatusCode::CREATED, Json(QuestionOut::from(&question))))
}

#[axum::debug_handler]
pub async fn update_question(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((test_id, question_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<QuestionUpdate>,
) -> Result<impl IntoResponse> {
    let question = state
        .test_service
        .update_question(user.id, test_id, question_id, payload)
        .await?;
    Ok(Json(QuestionOut::from(&question)))
}

#[axum::debug_handler]
pub async fn delete_question(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((test_id, question_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse> {
    state
        .test_service
        .delete_question(user.id, test_id, question_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
