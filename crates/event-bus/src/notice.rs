use autofill_core_types::Notice;
use parking_lot::Mutex;
use tracing::debug;

/// Host notice surface. Posting is fire-and-forget, like the event bus.
pub trait NoticeSink: Send + Sync {
    fn post(&self, notice: Notice);

    /// Dismiss every persistent notice currently shown.
    fn clear(&self);
}

/// Notice surface that simply remembers what is on screen.
#[derive(Default)]
pub struct InMemoryNoticeBoard {
    shown: Mutex<Vec<Notice>>,
    history: Mutex<Vec<Notice>>,
}

impl InMemoryNoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persistent notices that have not been cleared yet.
    pub fn shown(&self) -> Vec<Notice> {
        self.shown.lock().clone()
    }

    /// Every notice ever posted, in order.
    pub fn history(&self) -> Vec<Notice> {
        self.history.lock().clone()
    }
}

impl NoticeSink for InMemoryNoticeBoard {
    fn post(&self, notice: Notice) {
        debug!(severity = ?notice.severity, persistent = notice.is_persistent(), "{}", notice.message);
        self.history.lock().push(notice.clone());
        if notice.is_persistent() {
            self.shown.lock().push(notice);
        }
    }

    fn clear(&self) {
        self.shown.lock().retain(|notice| !notice.is_persistent());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autofill_core_types::NoticeSeverity;

    #[test]
    fn persistent_notices_stay_until_cleared() {
        let board = InMemoryNoticeBoard::new();
        board.post(Notice::persistent("Verify identity", NoticeSeverity::Warning));
        board.post(Notice::new("Saved", NoticeSeverity::Success, 3000));

        assert_eq!(board.shown().len(), 1);
        assert_eq!(board.history().len(), 2);

        board.clear();
        assert!(board.shown().is_empty());
        assert_eq!(board.history().len(), 2);
    }
}
