use crate::cards::{CardHandle, CardPatch};
use crate::error::SessionError;
use crate::store::CardStore;

/// What a commit did with the edit buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Written(CardHandle),
    /// The card disappeared while the session was open; nothing was written.
    Voided(CardHandle),
}

#[derive(Debug, Default)]
enum SessionState {
    #[default]
    Closed,
    Open {
        card: CardHandle,
        buffer: String,
        void: bool,
    },
}

/// Single active edit of one card's text.
///
/// The buffer is isolated from the store until [`EditSession::commit`]. Only
/// one session may be open at a time.
#[derive(Debug, Default)]
pub struct EditSession {
    state: SessionState,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, SessionState::Open { .. })
    }

    pub fn card(&self) -> Option<CardHandle> {
        match &self.state {
            SessionState::Open { card, .. } => Some(*card),
            SessionState::Closed => None,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self.state, SessionState::Open { void: true, .. })
    }

    /// Opens a session on `card`, copying its current text into the buffer.
    /// Returns `Ok(false)` and stays closed when the handle is stale.
    pub fn open(&mut self, store: &CardStore, card: CardHandle) -> Result<bool, SessionError> {
        if self.is_open() {
            return Err(SessionError::AlreadyOpen);
        }
        let Some(existing) = store.get(card) else {
            tracing::debug!(%card, "edit session not opened for stale card handle");
            return Ok(false);
        };
        self.state = SessionState::Open {
            card,
            buffer: existing.text().to_string(),
            void: false,
        };
        Ok(true)
    }

    pub fn buffer(&self) -> Option<&str> {
        match &self.state {
            SessionState::Open { buffer, .. } => Some(buffer),
            SessionState::Closed => None,
        }
    }

    pub fn set_buffer(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        match &mut self.state {
            SessionState::Open { buffer, .. } => {
                *buffer = text.into();
                Ok(())
            }
            SessionState::Closed => Err(SessionError::NotOpen),
        }
    }

    /// Marks the session void when it refers to `deleted`.
    pub fn invalidate(&mut self, deleted: CardHandle) {
        if let SessionState::Open { card, void, .. } = &mut self.state {
            if *card == deleted {
                tracing::debug!(card = %deleted, "edit session voided by card deletion");
                *void = true;
            }
        }
    }

    /// Writes the buffer back and closes. A void session closes without
    /// writing.
    pub fn commit(&mut self, store: &mut CardStore) -> Result<CommitOutcome, SessionError> {
        let SessionState::Open { card, buffer, void } = std::mem::take(&mut self.state) else {
            return Err(SessionError::NotOpen);
        };
        if void || !store.update(card, CardPatch::default().text(buffer)) {
            return Ok(CommitOutcome::Voided(card));
        }
        Ok(CommitOutcome::Written(card))
    }

    pub fn discard(&mut self) -> Result<(), SessionError> {
        match std::mem::take(&mut self.state) {
            SessionState::Open { .. } => Ok(()),
            SessionState::Closed => Err(SessionError::NotOpen),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Card, CardFields};
    use assert_matches::assert_matches;

    fn store_with_card() -> (CardStore, CardHandle) {
        let mut store = CardStore::new();
        let handle = store.create(Some(CardFields::new("Prompt").with_text("original")));
        (store, handle)
    }

    #[test]
    fn commit_writes_buffer_and_closes() -> anyhow::Result<()> {
        let (mut store, handle) = store_with_card();
        let mut session = EditSession::new();
        assert!(session.open(&store, handle)?);
        assert_eq!(session.buffer(), Some("original"));

        session.set_buffer("edited")?;
        assert_eq!(store.get(handle).map(Card::text), Some("original"));

        assert_eq!(session.commit(&mut store)?, CommitOutcome::Written(handle));
        assert!(!session.is_open());
        assert_eq!(store.get(handle).map(Card::text), Some("edited"));
        Ok(())
    }

    #[test]
    fn discard_leaves_card_untouched() -> anyhow::Result<()> {
        let (mut store, handle) = store_with_card();
        let mut session = EditSession::new();
        session.open(&store, handle)?;
        session.set_buffer("scratch")?;
        session.discard()?;
        assert!(!session.is_open());
        assert_eq!(store.get(handle).map(Card::text), Some("original"));
        assert_matches!(session.commit(&mut store), Err(SessionError::NotOpen));
        Ok(())
    }

    #[test]
    fn second_open_is_refused() -> anyhow::Result<()> {
        let (mut store, first) = store_with_card();
        let second = store.create(None);
        let mut session = EditSession::new();
        session.open(&store, first)?;
        assert_matches!(session.open(&store, second), Err(SessionError::AlreadyOpen));
        assert_eq!(session.card(), Some(first));
        Ok(())
    }

    #[test]
    fn commit_after_delete_is_a_no_op() -> anyhow::Result<()> {
        let (mut store, handle) = store_with_card();
        let other = store.create(Some(CardFields::new("Other").with_text("keep")));
        let mut session = EditSession::new();
        session.open(&store, handle)?;
        session.set_buffer("lost edit")?;

        store.delete(handle);
        session.invalidate(handle);
        assert!(session.is_void());
        let before = store.serialize();

        assert_eq!(session.commit(&mut store)?, CommitOutcome::Voided(handle));
        assert!(!session.is_open());
        assert_eq!(store.serialize(), before);
        assert_eq!(store.get(other).map(Card::text), Some("keep"));
        Ok(())
    }

    #[test]
    fn invalidating_another_card_keeps_session_live() -> anyhow::Result<()> {
        let (mut store, handle) = store_with_card();
        let other = store.create(None);
        let mut session = EditSession::new();
        session.open(&store, handle)?;
        session.invalidate(other);
        assert!(!session.is_void());
        Ok(())
    }

    #[test]
    fn stale_handle_does_not_open() -> anyhow::Result<()> {
        let (mut store, handle) = store_with_card();
        store.delete(handle);
        let mut session = EditSession::new();
        assert!(!session.open(&store, handle)?);
        assert!(!session.is_open());
        assert_matches!(session.set_buffer("x"), Err(SessionError::NotOpen));
        Ok(())
    }
}
