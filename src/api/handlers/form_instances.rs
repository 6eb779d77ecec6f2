use crate::api::error::AppError;
use crate::services::form_instance_service::{
    CreateFormInstanceRequest, FormInstanceResponse, FormInstanceSummary,
    UpdateFormInstanceRequest,
};
use crate::utils::auth::Claims;
use crate::AppState;
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};

#[utoipa::path(
    post,
    path = "/form-instances",
    request_body = CreateFormInstanceRequest,
    responses(
        (status = 201, description = "Instance created", body = FormInstanceResponse),
        (status = 400, description = "Required field missing"),
        (status = 404, description = "Template not found")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "form-instances"
)]
pub async fn create_instance(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateFormInstanceRequest>,
) -> Result<(StatusCode, Json<FormInstanceResponse>), AppError> {
    let instance = state
        .instance_service
        .create_instance(payload, claims.sub)
        .await?;
    Ok((StatusCode::CREATED, Json(instance)))
}

#[utoipa::path(
    get,
    path = "/form-instances/my",
    responses(
        (status = 200, description = "The caller's instances, newest first", body = [FormInstanceSummary])
    ),
    security(
        ("jwt" = [])
    ),
    tag = "form-instances"
)]
pub async fn list_my_instances(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<FormInstanceSummary>>, AppError> {
    let instances = state.instance_service.find_all_for_user(claims.sub).await?;
    Ok(Json(instances))
}

#[utoipa::path(
    get,
    path = "/form-instances/{id}",
    params(
        ("id" = i32, Path, description = "Instance ID")
    ),
    responses(
        (status = 200, description = "Instance with template and files", body = FormInstanceResponse),
        (status = 403, description = "Owned by another user"),
        (status = 404, description = "Instance not found")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "form-instances"
)]
pub async fn get_instance(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> Result<Json<FormInstanceResponse>, AppError> {
    let instance = state
        .instance_service
        .find_one_for_user(id, claims.sub)
        .await?;
    Ok(Json(instance))
}

#[utoipa::path(
    patch,
    path = "/form-instances/{id}",
    params(
        ("id" = i32, Path, description = "Instance ID")
    ),
    request_body = UpdateFormInstanceRequest,
    responses(
        (status = 200, description = "Instance updated", body = FormInstanceResponse),
        (status = 403, description = "Owned by another user or no longer a draft"),
        (status = 404, description = "Instance not found")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "form-instances"
)]
pub async fn update_instance(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateFormInstanceRequest>,
) -> Result<Json<FormInstanceResponse>, AppError> {
    let instance = state
        .instance_service
        .update_instance(id, payload, claims.sub)
        .await?;
    Ok(Json(instance))
}
