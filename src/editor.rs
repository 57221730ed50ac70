// Edit preview/commit state for one open document: a committed text that
// mirrors the backend and at most one outstanding proposal.
use similar::{ChangeTag, TextDiff};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffSegment {
    Equal(String),
    Insert(String),
    Delete(String),
}

#[derive(Debug, Clone)]
pub struct EditSession {
    committed: String,
    proposal: Option<String>,
}

impl EditSession {
    pub fn new(committed: impl Into<String>) -> Self {
        Self {
            committed: committed.into(),
            proposal: None,
        }
    }

    pub fn committed(&self) -> &str {
        &self.committed
    }

    pub fn proposal(&self) -> Option<&str> {
        self.proposal.as_deref()
    }

    pub fn has_proposal(&self) -> bool {
        self.proposal.is_some()
    }

    /// Stores a proposal. A proposal made while one is pending replaces
    /// it outright; committed text is never touched here.
    pub fn propose(&mut self, text: impl Into<String>) {
        self.proposal = Some(text.into());
    }

    /// Drops the pending proposal without touching committed text.
    pub fn discard(&mut self) {
        self.proposal = None;
    }

    /// Promotes the proposal to committed text and clears the slot. Call
    /// only after the server write succeeded; on failure keep the
    /// proposal so the user can retry.
    pub fn commit_proposal(&mut self) -> bool {
        match self.proposal.take() {
            Some(text) => {
                self.committed = text;
                true
            }
            None => false,
        }
    }

    /// Display-only diff of committed vs. proposed text. The commit
    /// payload is always the full proposal, never this diff.
    pub fn diff(&self) -> Vec<DiffSegment> {
        match &self.proposal {
            Some(proposal) => diff_segments(&self.committed, proposal),
            None => Vec::new(),
        }
    }
}

/// Word-level diff with adjacent runs of the same kind merged, which is
/// what the preview renders as highlight spans.
pub fn diff_segments(committed: &str, proposed: &str) -> Vec<DiffSegment> {
    let diff = TextDiff::from_words(committed, proposed);
    let mut segments: Vec<DiffSegment> = Vec::new();
    for change in diff.iter_all_changes() {
        let text = change.value();
        match (change.tag(), segments.last_mut()) {
            (ChangeTag::Equal, Some(DiffSegment::Equal(run))) => run.push_str(text),
            (ChangeTag::Insert, Some(DiffSegment::Insert(run))) => run.push_str(text),
            (ChangeTag::Delete, Some(DiffSegment::Delete(run))) => run.push_str(text),
            (ChangeTag::Equal, _) => segments.push(DiffSegment::Equal(text.to_string())),
            (ChangeTag::Insert, _) => segments.push(DiffSegment::Insert(text.to_string())),
            (ChangeTag::Delete, _) => segments.push(DiffSegment::Delete(text.to_string())),
        }
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_replaces_committed_and_clears_the_slot() {
        let mut session = EditSession::new("old text");
        session.propose("new text");
        assert!(session.commit_proposal());
        assert_eq!(session.committed(), "new text");
        assert!(!session.has_proposal());
    }

    #[test]
    fn discard_keeps_committed_untouched() {
        let mut session = EditSession::new("old text");
        session.propose("new text");
        session.discard();
        assert_eq!(session.committed(), "old text");
        assert!(!session.has_proposal());
    }

    #[test]
    fn commit_without_proposal_is_a_no_op() {
        let mut session = EditSession::new("text");
        assert!(!session.commit_proposal());
        assert_eq!(session.committed(), "text");
    }

    #[test]
    fn second_proposal_replaces_the_first() {
        let mut session = EditSession::new("base");
        session.propose("first attempt");
        session.propose("second attempt");
        assert_eq!(session.proposal(), Some("second attempt"));
    }

    #[test]
    fn diff_marks_insertions_and_deletions() {
        let segments = diff_segments("the quick brown fox", "the slow brown fox");
        assert!(segments.contains(&DiffSegment::Delete("quick".to_string())));
        assert!(segments.contains(&DiffSegment::Insert("slow".to_string())));

        let reconstructed: String = segments
            .iter()
            .filter_map(|segment| match segment {
                DiffSegment::Equal(text) | DiffSegment::Insert(text) => Some(text.as_str()),
                DiffSegment::Delete(_) => None,
            })
            .collect();
        assert_eq!(reconstructed, "the slow brown fox");
    }

    #[test]
    fn identical_texts_diff_to_a_single_equal_run() {
        let segments = diff_segments("same text", "same text");
        assert_eq!(segments, vec![DiffSegment::Equal("same text".to_string())]);
    }

    #[test]
    fn empty_diff_without_proposal() {
        let session = EditSession::new("text");
        assert!(session.diff().is_empty());
    }
}
