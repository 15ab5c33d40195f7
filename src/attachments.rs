//! Attachment staging
//!
//! Files uploaded for the next message. Only backend ids are kept; the
//! file bytes are dropped as soon as the upload finishes.
//!
//! `generation` increases every time the staging list is reset so that an
//! upload started for a previous session can be recognised and discarded.

use crate::api::Attachment;

#[derive(Debug, Default, Clone)]
pub struct AttachmentStaging {
    staged: Vec<Attachment>,
    generation: u64,
}

impl AttachmentStaging {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn staged(&self) -> &[Attachment] {
        &self.staged
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Append a successfully uploaded file
    pub fn push(&mut self, attachment: Attachment) {
        self.staged.push(attachment);
    }

    /// Remove by id; `None` if it was not staged
    ///
    /// The uploaded file stays on the backend.
    pub fn unstage(&mut self, attachment_id: &str) -> Option<Attachment> {
        let index = self.staged.iter().position(|a| a.id == attachment_id)?;
        Some(self.staged.remove(index))
    }

    /// Take every staged id, leaving the list empty
    pub fn drain_for_send(&mut self) -> Vec<String> {
        std::mem::take(&mut self.staged)
            .into_iter()
            .map(|a| a.id)
            .collect()
    }

    /// Drop everything and invalidate pending uploads
    pub fn reset(&mut self) {
        self.staged.clear();
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(id: &str) -> Attachment {
        Attachment {
            id: id.to_string(),
            filename: format!("{id}.txt"),
            content_type: None,
            size: None,
        }
    }

    #[test]
    fn test_drain_twice_returns_empty() {
        let mut staging = AttachmentStaging::new();
        staging.push(attachment("f1"));
        staging.push(attachment("f2"));
        assert_eq!(staging.drain_for_send(), ["f1", "f2"]);
        assert!(staging.drain_for_send().is_empty());
    }

    #[test]
    fn test_unstage_missing_is_noop() {
        let mut staging = AttachmentStaging::new();
        staging.push(attachment("f1"));
        assert!(staging.unstage("nope").is_none());
        assert_eq!(staging.staged().len(), 1);
        assert_eq!(staging.unstage("f1").map(|a| a.id), Some("f1".to_string()));
        assert!(staging.is_empty());
    }

    #[test]
    fn test_reset_bumps_generation() {
        let mut staging = AttachmentStaging::new();
        staging.push(attachment("f1"));
        let before = staging.generation();
        staging.reset();
        assert!(staging.is_empty());
        assert_eq!(staging.generation(), before + 1);
    }
}
