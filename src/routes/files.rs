use crate::{
    dto::file_dto::FileUploadResponse,
    error::{Error, Result},
    middleware::auth::AuthUser,
    AppState,
};
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};

#[axum::debug_handler]
pub async fn upload_file(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let data = field.bytes().await?;

        let file = state.file_service.upload_file(user.id, &filename, &data).await?;
        return Ok((StatusCode::CREATED, Json(FileUploadResponse::from(file))));
    }

    Err(Error::BadRequest("multipart field 'file' is required".into()))
}
