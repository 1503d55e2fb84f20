use crate::cards::{Card, CardFields, CardHandle, CardPatch};

mod snapshot;

pub use snapshot::{CardRecord, PersistedSnapshot};

/// Ordered card collection. Insertion order is display order.
///
/// Mutations bump [`CardStore::revision`] so that derived views can tell
/// whether they are stale. Operations on handles that are no longer present
/// are silent no-ops.
#[derive(Debug, Default)]
pub struct CardStore {
    cards: Vec<Card>,
    revision: u64,
}

impl CardStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: PersistedSnapshot) -> Self {
        let mut store = Self::new();
        store.load(snapshot);
        store
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter()
    }

    pub fn get(&self, handle: CardHandle) -> Option<&Card> {
        self.cards.iter().find(|card| card.handle() == handle)
    }

    pub fn contains(&self, handle: CardHandle) -> bool {
        self.position(handle).is_some()
    }

    pub fn position(&self, handle: CardHandle) -> Option<usize> {
        self.cards.iter().position(|card| card.handle() == handle)
    }

    pub fn handle_at(&self, index: usize) -> Option<CardHandle> {
        self.cards.get(index).map(Card::handle)
    }

    pub fn create(&mut self, initial: Option<CardFields>) -> CardHandle {
        let card = Card::from_fields(initial.unwrap_or_default());
        let handle = card.handle();
        tracing::debug!(%handle, title = card.title(), "card created");
        self.cards.push(card);
        self.touch();
        handle
    }

    /// Applies `patch` to the card; returns `false` for a stale handle.
    pub fn update(&mut self, handle: CardHandle, patch: CardPatch) -> bool {
        let Some(card) = self.cards.iter_mut().find(|card| card.handle() == handle) else {
            tracing::debug!(%handle, "update ignored for stale card handle");
            return false;
        };
        card.apply(patch);
        self.touch();
        true
    }

    /// Removes the card; returns `false` for a stale handle.
    pub fn delete(&mut self, handle: CardHandle) -> bool {
        let Some(index) = self.position(handle) else {
            tracing::debug!(%handle, "delete ignored for stale card handle");
            return false;
        };
        let card = self.cards.remove(index);
        tracing::debug!(%handle, title = card.title(), "card deleted");
        self.touch();
        true
    }

    pub fn serialize(&self) -> PersistedSnapshot {
        let records = self
            .cards
            .iter()
            .map(|card| CardRecord {
                title: card.title().to_string(),
                url: card.url_block(),
                copy_text: card.text().to_string(),
                tags: card
                    .tags()
                    .iter()
                    .map(|tag| tag.trim().to_string())
                    .filter(|tag| !tag.is_empty())
                    .collect(),
            })
            .collect();
        PersistedSnapshot { records }
    }

    /// Replaces the whole collection. Previously issued handles become stale.
    pub fn load(&mut self, snapshot: PersistedSnapshot) {
        self.cards = snapshot
            .records
            .into_iter()
            .map(|record| Card::from_fields(record.into_fields()))
            .collect();
        tracing::debug!(count = self.cards.len(), "card collection replaced");
        self.touch();
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}
