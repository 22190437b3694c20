//! Threaded remarks with author-scoped edit and delete.

use chrono::{DateTime, Utc};
use haulage_shared::types::{RemarkId, UserId};
use serde::{Deserialize, Serialize};

use super::error::AuditError;

/// A user-authored comment attached to a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Remark {
    /// Remark id.
    pub id: RemarkId,
    /// Author.
    pub user_id: UserId,
    /// Text.
    pub remark: String,
    /// When it was written.
    pub created_at: DateTime<Utc>,
    /// When it was last edited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Documents that carry a remark thread.
///
/// The default methods are the single implementation of remark handling
/// for every document type.
pub trait Remarkable {
    /// Remarks, oldest first.
    fn remarks(&self) -> &[Remark];

    /// Mutable access to the remark thread.
    fn remarks_mut(&mut self) -> &mut Vec<Remark>;

    /// Appends a remark and returns its id.
    fn add_remark(
        &mut self,
        author: UserId,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<RemarkId, AuditError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AuditError::EmptyRemark);
        }

        let id = RemarkId::new();
        self.remarks_mut().push(Remark {
            id,
            user_id: author,
            remark: text.to_string(),
            created_at: now,
            updated_at: None,
        });
        Ok(id)
    }

    /// Replaces the text of a remark written by `actor`.
    ///
    /// Returns the previous text.
    fn edit_remark(
        &mut self,
        remark_id: RemarkId,
        actor: UserId,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<String, AuditError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AuditError::EmptyRemark);
        }

        let remark = self
            .remarks_mut()
            .iter_mut()
            .find(|r| r.id == remark_id)
            .ok_or(AuditError::RemarkNotFound(remark_id))?;

        if remark.user_id != actor {
            return Err(AuditError::NotRemarkAuthor);
        }

        let previous = std::mem::replace(&mut remark.remark, text.to_string());
        remark.updated_at = Some(now);
        Ok(previous)
    }

    /// Removes a remark written by `actor`.
    fn delete_remark(&mut self, remark_id: RemarkId, actor: UserId) -> Result<Remark, AuditError> {
        let remarks = self.remarks_mut();
        let index = remarks
            .iter()
            .position(|r| r.id == remark_id)
            .ok_or(AuditError::RemarkNotFound(remark_id))?;

        if remarks[index].user_id != actor {
            return Err(AuditError::NotRemarkAuthor);
        }

        Ok(remarks.remove(index))
    }

    /// Author of a remark, if it exists.
    fn remark_author(&self, remark_id: RemarkId) -> Option<UserId> {
        self.remarks()
            .iter()
            .find(|r| r.id == remark_id)
            .map(|r| r.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Thread {
        remarks: Vec<Remark>,
    }

    impl Remarkable for Thread {
        fn remarks(&self) -> &[Remark] {
            &self.remarks
        }

        fn remarks_mut(&mut self) -> &mut Vec<Remark> {
            &mut self.remarks
        }
    }

    #[test]
    fn test_add_remark_trims_text() {
        let mut thread = Thread::default();
        let author = UserId::new();

        let id = thread.add_remark(author, "  tyre burst near Ore  ", Utc::now()).unwrap();

        assert_eq!(thread.remarks.len(), 1);
        assert_eq!(thread.remarks[0].remark, "tyre burst near Ore");
        assert_eq!(thread.remark_author(id), Some(author));
    }

    #[test]
    fn test_add_empty_remark_rejected() {
        let mut thread = Thread::default();
        assert!(matches!(
            thread.add_remark(UserId::new(), "   ", Utc::now()),
            Err(AuditError::EmptyRemark)
        ));
    }

    #[test]
    fn test_only_author_can_edit() {
        let mut thread = Thread::default();
        let author = UserId::new();
        let id = thread.add_remark(author, "first", Utc::now()).unwrap();

        let result = thread.edit_remark(id, UserId::new(), "hijack", Utc::now());
        assert!(matches!(result, Err(AuditError::NotRemarkAuthor)));

        let previous = thread.edit_remark(id, author, "second", Utc::now()).unwrap();
        assert_eq!(previous, "first");
        assert_eq!(thread.remarks[0].remark, "second");
        assert!(thread.remarks[0].updated_at.is_some());
    }

    #[test]
    fn test_only_author_can_delete() {
        let mut thread = Thread::default();
        let author = UserId::new();
        let id = thread.add_remark(author, "note", Utc::now()).unwrap();

        assert!(matches!(
            thread.delete_remark(id, UserId::new()),
            Err(AuditError::NotRemarkAuthor)
        ));
        assert_eq!(thread.delete_remark(id, author).unwrap().remark, "note");
        assert!(thread.remarks.is_empty());
        assert!(matches!(
            thread.delete_remark(id, author),
            Err(AuditError::RemarkNotFound(_))
        ));
    }
}
