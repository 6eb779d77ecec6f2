pub mod auth;
pub mod form_instances;
pub mod form_templates;
pub mod health;
pub mod storage;
