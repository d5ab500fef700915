use crate::{
    dto::material_dto::{MaterialListItem, MaterialOut, MaterialUpdate},
    error::{Error, Result},
    middleware::auth::AuthUser,
    AppState,
};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;

#[axum::debug_handler]
pub async fn upload_material(
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

        let material = state
            .material_service
            .upload_material(user.id, &filename, &data)
            .await?;
        return Ok((StatusCode::CREATED, Json(MaterialOut::from(material))));
    }

    Err(Error::BadRequest("multipart field 'file' is required".into()))
}

#[axum::debug_handler]
pub async fn list_materials(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let materials = state.material_service.list_materials(user.id).await?;
    let body: Vec<MaterialListItem> = materials.into_iter().map(MaterialListItem::from).collect();
    Ok(Json(body))
}

#[axum::debug_handler]
pub async fn get_material(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(material_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let material = state.material_service.get_material(user.id, material_id).await?;
    Ok(Json(MaterialOut::from(material)))
}

#[axum::debug_handler]
pub async fn update_material(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(material_id): Path<Uuid>,
    Json(payload): Json<MaterialUpdate>,
) -> Result<impl IntoResponse> {
    let material = state
        .material_service
        .update_material(user.id, material_id, payload)
        .await?;
    Ok(Json(MaterialOut::from(material)))
}

#[axum::debug_handler]
pub async fn delete_material(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(material_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.material_service.delete_material(user.id, material_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
