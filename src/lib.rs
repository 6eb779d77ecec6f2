pub mod api;
pub mod config;
pub mod entities;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::api::middleware::auth::{TEMPLATE_EDITORS, auth_middleware, require_roles};
use crate::config::SecurityConfig;
use crate::services::auth_service::AuthService;
use crate::services::form_instance_service::FormInstanceService;
use crate::services::form_template_service::FormTemplateService;
use crate::services::storage::StorageService;
use crate::services::upload_service::UploadService;
use crate::services::user_service::UserService;
use axum::{
    Router,
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::auth::register,
        api::handlers::auth::login,
        api::handlers::auth::refresh,
        api::handlers::auth::logout,
        api::handlers::auth::profile,
        api::handlers::form_templates::create_template,
        api::handlers::form_templates::list_templates,
        api::handlers::form_templates::get_template,
        api::handlers::form_templates::update_structure,
        api::handlers::form_instances::create_instance,
        api::handlers::form_instances::list_my_instances,
        api::handlers::form_instances::get_instance,
        api::handlers::form_instances::update_instance,
        api::handlers::storage::upload_file,
        api::handlers::storage::download_file,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::auth::RegisterRequest,
            api::handlers::auth::LoginRequest,
            api::handlers::auth::RefreshRequest,
            api::handlers::auth::MessageResponse,
            api::handlers::health::HealthResponse,
            entities::sea_orm_active_enums::Role,
            entities::sea_orm_active_enums::FormStatus,
            models::FieldDefinition,
            models::FieldOption,
            models::FieldType,
            models::FieldValidations,
            models::FileReference,
            services::auth_service::TokenPair,
            services::user_service::UserProfile,
            services::form_template_service::CreateFormTemplateRequest,
            services::form_template_service::UpdateStructureRequest,
            services::form_template_service::FormTemplateResponse,
            services::form_instance_service::CreateFormInstanceRequest,
            services::form_instance_service::UpdateFormInstanceRequest,
            services::form_instance_service::FormInstanceResponse,
            services::form_instance_service::FormInstanceSummary,
            services::form_instance_service::TemplateSummary,
            services::form_instance_service::FileSummary,
            services::form_instance_service::UploadedFileResponse,
        )
    ),
    tags(
        (name = "auth", description = "Registration, login and token rotation"),
        (name = "form-templates", description = "Form template management"),
        (name = "form-instances", description = "Form submissions"),
        (name = "storage", description = "File upload and download"),
        (name = "system", description = "Health")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub storage: Arc<dyn StorageService>,
    pub config: SecurityConfig,
    pub user_service: UserService,
    pub auth_service: Arc<AuthService>,
    pub template_service: FormTemplateService,
    pub instance_service: FormInstanceService,
    pub upload_service: Arc<UploadService>,
}

impl AppState {
    pub fn new(
        db: DatabaseConnection,
        storage: Arc<dyn StorageService>,
        config: SecurityConfig,
    ) -> Self {
        let user_service = UserService::new(db.clone());
        Self {
            auth_service: Arc::new(AuthService::new(user_service.clone(), config.clone())),
            template_service: FormTemplateService::new(db.clone()),
            instance_service: FormInstanceService::new(db.clone()),
            upload_service: Arc::new(UploadService::new(
                db.clone(),
                storage.clone(),
                config.clone(),
            )),
            user_service,
            db,
            storage,
            config,
        }
    }
}

fn cors_layer(config: &SecurityConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if config.allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", o);
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}

pub fn create_app(state: AppState) -> Router {
    let editors_only = from_fn_with_state(TEMPLATE_EDITORS, require_roles);

    let protected = Router::new()
        .route("/auth/logout", post(api::handlers::auth::logout))
        .route("/auth/profile", get(api::handlers::auth::profile))
        .route(
            "/form-templates",
            post(api::handlers::form_templates::create_template)
                .route_layer(editors_only.clone())
                .get(api::handlers::form_templates::list_templates),
        )
        .route(
            "/form-templates/:id",
            get(api::handlers::form_templates::get_template),
        )
        .route(
            "/form-templates/:id/structure",
            patch(api::handlers::form_templates::update_structure).route_layer(editors_only),
        )
        .route(
            "/form-instances",
            post(api::handlers::form_instances::create_instance),
        )
        .route(
            "/form-instances/my",
            get(api::handlers::form_instances::list_my_instances),
        )
        .route(
            "/form-instances/:id",
            get(api::handlers::form_instances::get_instance)
                .patch(api::handlers::form_instances::update_instance),
        )
        .route(
            "/storage/upload",
            post(api::handlers::storage::upload_file),
        )
        .route(
            "/storage/download/file/:id",
            get(api::handlers::storage::download_file),
        )
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route("/auth/register", post(api::handlers::auth::register))
        .route("/auth/login", post(api::handlers::auth::login))
        .route("/auth/refresh", post(api::handlers::auth::refresh))
        .merge(protected)
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(cors_layer(&state.config))
        .layer(axum::extract::DefaultBodyLimit::max(
            state.config.max_file_size + 1024 * 1024, // multipart overhead
        ))
        .with_state(state)
}
