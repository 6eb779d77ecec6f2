use crate::api::error::AppError;
use crate::services::form_template_service::{
    CreateFormTemplateRequest, FormTemplateResponse, UpdateStructureRequest,
};
use crate::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

#[utoipa::path(
    post,
    path = "/form-templates",
    request_body = CreateFormTemplateRequest,
    responses(
        (status = 201, description = "Template created", body = FormTemplateResponse),
        (status = 400, description = "Invalid template"),
        (status = 403, description = "Role not allowed"),
        (status = 409, description = "Unique code already in use")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "form-templates"
)]
pub async fn create_template(
    State(state): State<AppState>,
    Json(payload): Json<CreateFormTemplateRequest>,
) -> Result<(StatusCode, Json<FormTemplateResponse>), AppError> {
    let template = state.template_service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(template.try_into()?)))
}

#[utoipa::path(
    get,
    path = "/form-templates",
    responses(
        (status = 200, description = "All templates, newest first", body = [FormTemplateResponse])
    ),
    security(
        ("jwt" = [])
    ),
    tag = "form-templates"
)]
pub async fn list_templates(
    State(state): State<AppState>,
) -> Result<Json<Vec<FormTemplateResponse>>, AppError> {
    let templates = state
        .template_service
        .find_all()
        .await?
        .into_iter()
        .map(FormTemplateResponse::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(templates))
}

#[utoipa::path(
    get,
    path = "/form-templates/{id}",
    params(
        ("id" = i32, Path, description = "Template ID")
    ),
    responses(
        (status = 200, description = "Template", body = FormTemplateResponse),
        (status = 404, description = "Template not found")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "form-templates"
)]
pub async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<FormTemplateResponse>, AppError> {
    let template = state.template_service.find_one(id).await?;
    Ok(Json(template.try_into()?))
}

#[utoipa::path(
    patch,
    path = "/form-templates/{id}/structure",
    params(
        ("id" = i32, Path, description = "Template ID")
    ),
    request_body = UpdateStructureRequest,
    responses(
        (status = 200, description = "Structure replaced", body = FormTemplateResponse),
        (status = 400, description = "Invalid or duplicated fields"),
        (status = 403, description = "Role not allowed"),
        (status = 404, description = "Template not found")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "form-templates"
)]
pub async fn update_structure(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateStructureRequest>,
) -> Result<Json<FormTemplateResponse>, AppError> {
    let template = state.template_service.update_structure(id, payload).await?;
    Ok(Json(template.try_into()?))
}
