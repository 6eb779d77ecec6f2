pub mod prelude;

pub mod form_instances;
pub mod form_templates;
pub mod sea_orm_active_enums;
pub mod uploaded_files;
pub mod users;
