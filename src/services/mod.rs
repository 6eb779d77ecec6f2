pub mod auth_service;
pub mod form_instance_service;
pub mod form_template_service;
pub mod form_validator;
pub mod storage;
pub mod upload_service;
pub mod user_service;
