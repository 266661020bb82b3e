// Attachments of the current test case, fixture or step

use super::AllureLifecycle;
use crate::model::{ATTACHMENT_FILE_SUFFIX, Attachment};
use crate::state::storage::PendingAttachment;
use tracing::{debug, error, warn};
use uuid::Uuid;

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// `<uuid>-attachment<.ext>`
fn attachment_source(extension: &str) -> String {
    let mut source = format!("{}{}", Uuid::new_v4(), ATTACHMENT_FILE_SUFFIX);
    if !extension.is_empty() {
        if !extension.starts_with('.') {
            source.push('.');
        }
        source.push_str(extension);
    }
    source
}

impl AllureLifecycle {
    /// Register attachment metadata on the current step, test case or fixture
    ///
    /// Returns the source key the bytes must be written under. The key is
    /// returned even when nothing is running on this thread.
    pub fn prepare_attachment(&self, name: &str, content_type: &str, extension: &str) -> String {
        let source = attachment_source(extension);
        let attachment = Attachment {
            name: non_empty(name),
            source: source.clone(),
            content_type: non_empty(content_type),
        };

        match self.current_test_case_or_step() {
            Some(target) => {
                let added = self.storage.apply(&target, attachment, |entry, attachment| {
                    if let Some(item) = entry.item.as_executable_mut() {
                        item.attachments_mut().push(attachment);
                    }
                });
                if added.is_err() {
                    warn!("Could not add attachment {}: {} not found", source, target);
                }
            }
            None => warn!(
                "Could not add attachment {}: no test case or step running",
                source
            ),
        }
        source
    }

    pub fn write_attachment(&self, source: &str, content: &[u8]) {
        match self.writer.write_attachment(source, content) {
            Ok(()) => debug!("Wrote attachment {} ({} bytes)", source, content.len()),
            Err(e) => error!("Could not write attachment {}: {}", source, e),
        }
    }

    /// Attach bytes to the current step, test case or fixture
    pub fn add_attachment(&self, name: &str, content_type: &str, extension: &str, content: &[u8]) {
        let source = self.prepare_attachment(name, content_type, extension);
        self.write_attachment(&source, content);
    }

    /// Attach content produced on a background thread
    ///
    /// The producer inherits this thread's context. Its bytes are written no
    /// later than when the owning entity is stopped or written.
    pub fn add_attachment_async<F>(
        &self,
        name: &str,
        content_type: &str,
        extension: &str,
        producer: F,
    ) -> String
    where
        F: FnOnce() -> Vec<u8> + Send + 'static,
    {
        let source = self.prepare_attachment(name, content_type, extension);
        let Some(owner) = self.current_test_case_or_step() else {
            self.write_attachment(&source, &producer());
            return source;
        };

        let handle = match std::thread::Builder::new()
            .name("allure-attachment".to_string())
            .spawn(self.propagate(producer))
        {
            Ok(handle) => handle,
            Err(e) => {
                error!("Could not spawn producer for attachment {}: {}", source, e);
                return source;
            }
        };

        let pending = PendingAttachment {
            source: source.clone(),
            handle,
        };
        if let Err(pending) = self
            .storage
            .apply(&owner, pending, |entry, pending| entry.pending.push(pending))
        {
            debug!("Owner {} of attachment {} is gone, writing now", owner, source);
            self.resolve_pending(vec![pending]);
        }
        source
    }

    /// Wait for the attachments still produced for `uuid` and write them
    pub(crate) fn await_attachments(&self, uuid: &str) {
        let pending = self.storage.take_pending(uuid);
        self.resolve_pending(pending);
    }

    pub(crate) fn resolve_pending(&self, pending: Vec<PendingAttachment>) {
        for PendingAttachment { source, handle } in pending {
            match handle.join() {
                Ok(content) => self.write_attachment(&source, &content),
                Err(_) => error!("Producer of attachment {} panicked", source),
            }
        }
    }
}
