pub use super::pending_uploads::Entity as PendingUploads;
