pub use super::form_instances::Entity as FormInstances;
pub use super::form_templates::Entity as FormTemplates;
pub use super::uploaded_files::Entity as UploadedFiles;
pub use super::users::Entity as Users;
