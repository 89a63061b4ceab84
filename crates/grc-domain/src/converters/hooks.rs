use grc_core::GrcResult;

use super::models::{MailData, ObjectRef};

/// Background work triggered after an import.
#[cfg_attr(test, mockall::automock)]
pub trait ImportHooks {
    /// Recalculates computed attributes of the changed objects.
    fn compute_attributes(&self, revision_ids: &[ObjectRef], user: &str) -> GrcResult<()>;

    /// Creates or updates issue tracker tickets of the changed objects.
    fn update_issue_tracker(&self, revision_ids: &[ObjectRef], mail_data: &MailData) -> GrcResult<()>;

    fn drop_cache(&self) -> GrcResult<()>;
}

/// Records post-import work in the log without doing it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingImportHooks;

impl ImportHooks for LoggingImportHooks {
    fn compute_attributes(&self, revision_ids: &[ObjectRef], user: &str) -> GrcResult<()> {
        tracing::info!(objects = revision_ids.len(), user, "Computed attributes job queued");
        Ok(())
    }

    fn update_issue_tracker(&self, revision_ids: &[ObjectRef], mail_data: &MailData) -> GrcResult<()> {
        tracing::info!(
            objects = revision_ids.len(),
            filename = %mail_data.filename,
            user_email = %mail_data.user_email,
            "Issue tracker update queued"
        );
        Ok(())
    }

    fn drop_cache(&self) -> GrcResult<()> {
        tracing::info!("Cache cleared");
        Ok(())
    }
}
