use std::collections::BTreeSet;

use crate::cards::{Card, CardHandle};

mod tag_cloud;

pub use tag_cloud::{is_upper_tag, locale_cmp, TagCloud, TagCount};

/// Free-text search plus the set of active tag filters.
///
/// A card is visible when its title contains the search text
/// (case-insensitive) and it carries every active tag (exact match).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardQuery {
    search_text: String,
    active_tags: BTreeSet<String>,
}

impl CardQuery {
    pub fn new(search_text: impl Into<String>) -> Self {
        Self {
            search_text: search_text.into(),
            active_tags: BTreeSet::new(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.active_tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn set_search_text(&mut self, text: impl Into<String>) {
        self.search_text = text.into();
    }

    pub fn active_tags(&self) -> &BTreeSet<String> {
        &self.active_tags
    }

    pub fn is_active(&self, tag: &str) -> bool {
        self.active_tags.contains(tag)
    }

    /// Adds the tag when absent, removes it when present. Returns whether the
    /// tag is active afterwards.
    pub fn toggle_tag(&mut self, tag: &str) -> bool {
        if self.active_tags.remove(tag) {
            false
        } else {
            self.active_tags.insert(tag.to_string());
            true
        }
    }

    pub fn clear(&mut self) {
        self.search_text.clear();
        self.active_tags.clear();
    }

    pub fn has_filters(&self) -> bool {
        !self.search_text.trim().is_empty() || !self.active_tags.is_empty()
    }

    pub fn matches_search(&self, card: &Card) -> bool {
        self.search_text.is_empty()
            || card
                .title()
                .to_lowercase()
                .contains(&self.search_text.to_lowercase())
    }

    pub fn matches_tags(&self, card: &Card) -> bool {
        self.active_tags.iter().all(|tag| card.has_tag(tag))
    }

    pub fn matches(&self, card: &Card) -> bool {
        self.matches_search(card) && self.matches_tags(card)
    }

    /// Runs the predicate over every card.
    pub fn evaluate(&self, cards: &[Card]) -> QueryOutcome {
        let visibility: Vec<_> = cards
            .iter()
            .map(|card| (card.handle(), self.matches(card)))
            .collect();
        let visible = visibility.iter().filter(|(_, shown)| *shown).count();
        QueryOutcome {
            visibility,
            visible,
        }
    }
}

/// Per-card visibility in collection order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOutcome {
    pub visibility: Vec<(CardHandle, bool)>,
    pub visible: usize,
}

impl QueryOutcome {
    pub fn total(&self) -> usize {
        self.visibility.len()
    }

    pub fn is_visible(&self, handle: CardHandle) -> bool {
        self.visibility
            .iter()
            .any(|(candidate, shown)| *candidate == handle && *shown)
    }

    pub fn visible_handles(&self) -> impl Iterator<Item = CardHandle> + '_ {
        self.visibility
            .iter()
            .filter(|(_, shown)| *shown)
            .map(|(handle, _)| *handle)
    }

    pub fn count_label(&self) -> String {
        match self.visible {
            0 => "No results".to_string(),
            1 => "1 result".to_string(),
            n => format!("{n} results"),
        }
    }

    /// `"N of M cards"` while filters are active, empty otherwise.
    pub fn summary_label(&self, query: &CardQuery) -> String {
        if query.has_filters() {
            format!("{} of {} cards", self.visible, self.total())
        } else {
            String::new()
        }
    }
}

/// Parses `tag:` prefixed words into active tags; the remaining words form
/// the search text.
pub fn parse_query(input: &str) -> CardQuery {
    let mut query = CardQuery::default();
    let mut words = Vec::new();
    for raw in input.split_whitespace() {
        if let Some(tag) = raw.strip_prefix("tag:") {
            if !tag.is_empty() {
                query.active_tags.insert(tag.to_string());
            }
            continue;
        }
        words.push(raw);
    }
    query.search_text = words.join(" ");
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::CardFields;
    use crate::store::CardStore;

    fn store() -> CardStore {
        let mut store = CardStore::new();
        store.create(Some(CardFields::new("Draft v2").with_tags(["a", "b"])));
        store.create(Some(CardFields::new("Release notes").with_tags(["a"])));
        store.create(Some(CardFields::new("Inbox").with_tags(["c"])));
        store
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let store = store();
        let outcome = CardQuery::new("draft").evaluate(store.cards());
        assert_eq!(outcome.visible, 1);
        assert!(outcome.is_visible(store.cards()[0].handle()));
        assert!(!outcome.is_visible(store.cards()[1].handle()));
    }

    #[test]
    fn empty_query_shows_everything() {
        let store = store();
        let outcome = CardQuery::default().evaluate(store.cards());
        assert_eq!(outcome.visible, 3);
        assert_eq!(outcome.total(), 3);
    }

    #[test]
    fn active_tags_use_and_semantics() {
        let store = store();
        let card = &store.cards()[0];

        assert!(CardQuery::default().with_tags(["a"]).matches(card));
        assert!(CardQuery::default().with_tags(["a", "b"]).matches(card));
        assert!(!CardQuery::default().with_tags(["a", "c"]).matches(card));
    }

    #[test]
    fn tag_matching_is_case_sensitive() {
        let store = store();
        let outcome = CardQuery::default().with_tags(["A"]).evaluate(store.cards());
        assert_eq!(outcome.visible, 0);
    }

    #[test]
    fn adding_tags_never_grows_the_visible_set() {
        let store = store();
        let mut query = CardQuery::default();
        let mut previous = query.evaluate(store.cards()).visible;
        for tag in ["a", "b", "c"] {
            query.toggle_tag(tag);
            let current = query.evaluate(store.cards()).visible;
            assert!(current <= previous, "adding {tag} grew visibility");
            previous = current;
        }
        assert_eq!(previous, 0);
    }

    #[test]
    fn toggle_adds_then_removes() {
        let mut query = CardQuery::default();
        assert!(query.toggle_tag("work"));
        assert!(query.is_active("work"));
        assert!(!query.toggle_tag("work"));
        assert!(query.active_tags().is_empty());
    }

    #[test]
    fn labels_follow_visible_count() {
        let store = store();
        let mut query = CardQuery::default();
        let all = query.evaluate(store.cards());
        assert_eq!(all.count_label(), "3 results");
        assert_eq!(all.summary_label(&query), "");

        query.set_search_text("inbox");
        let one = query.evaluate(store.cards());
        assert_eq!(one.count_label(), "1 result");
        assert_eq!(one.summary_label(&query), "1 of 3 cards");

        query.set_search_text("nothing here");
        assert_eq!(query.evaluate(store.cards()).count_label(), "No results");
    }

    #[test]
    fn parse_query_splits_tags_from_text() {
        let query = parse_query("tag:Work release tag: notes tag:b");
        assert_eq!(query.search_text(), "release notes");
        assert!(query.is_active("Work"));
        assert!(query.is_active("b"));
        assert_eq!(query.active_tags().len(), 2);
    }
}
