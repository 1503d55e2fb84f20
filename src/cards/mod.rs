use std::collections::HashSet;
use std::fmt;

use bitflags::bitflags;
use uuid::Uuid;

pub const DEFAULT_TITLE: &str = "New title";

/// Opaque, stable identity of a card for as long as it stays in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CardHandle(Uuid);

impl CardHandle {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for CardHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

bitflags! {
    /// Actions a card offers, derived from which of its fields carry content.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CardActions: u8 {
        const OPEN_URLS = 0b01;
        const COPY_TEXT = 0b10;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    handle: CardHandle,
    title: String,
    text: String,
    urls: Vec<String>,
    tags: Vec<String>,
}

impl Card {
    pub(crate) fn from_fields(fields: CardFields) -> Self {
        Self {
            handle: CardHandle::generate(),
            title: title_or_default(fields.title),
            text: fields.text,
            urls: normalize_urls(fields.urls),
            tags: normalize_tags(fields.tags),
        }
    }

    pub fn handle(&self) -> CardHandle {
        self.handle
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Raw text, placeholders unresolved.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn url_block(&self) -> String {
        self.urls.join("\n")
    }

    pub fn actions(&self) -> CardActions {
        let mut actions = CardActions::empty();
        if !self.urls.is_empty() {
            actions |= CardActions::OPEN_URLS;
        }
        if !self.text.trim().is_empty() {
            actions |= CardActions::COPY_TEXT;
        }
        actions
    }

    pub fn fields(&self) -> CardFields {
        CardFields {
            title: self.title.clone(),
            text: self.text.clone(),
            urls: self.urls.clone(),
            tags: self.tags.clone(),
        }
    }

    pub(crate) fn apply(&mut self, patch: CardPatch) {
        if let Some(title) = patch.title {
            self.title = title_or_default(title);
        }
        if let Some(text) = patch.text {
            self.text = text;
        }
        if let Some(urls) = patch.urls {
            self.urls = normalize_urls(urls);
        }
        if let Some(tags) = patch.tags {
            self.tags = normalize_tags(tags);
        }
    }
}

/// Field values used to construct a card. Normalised on construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardFields {
    pub title: String,
    pub text: String,
    pub urls: Vec<String>,
    pub tags: Vec<String>,
}

impl CardFields {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.urls = urls.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardPatch {
    pub title: Option<String>,
    pub text: Option<String>,
    pub urls: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

impl CardPatch {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn urls(mut self, urls: Vec<String>) -> Self {
        self.urls = Some(urls);
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.text.is_none() && self.urls.is_none() && self.tags.is_none()
    }
}

/// Splits a newline separated block into trimmed, non-blank URLs.
pub fn parse_url_block(block: &str) -> Vec<String> {
    normalize_urls(block.lines().map(str::to_string).collect())
}

/// Splits a comma separated tag list into trimmed, non-blank tags.
pub fn parse_tag_list(list: &str) -> Vec<String> {
    normalize_tags(vec![list.to_string()])
}

fn title_or_default(title: String) -> String {
    if title.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        title
    }
}

fn normalize_urls(urls: Vec<String>) -> Vec<String> {
    urls.into_iter()
        .flat_map(|entry| {
            entry
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(tags.len());
    for tag in tags.iter().flat_map(|entry| entry.split(',')) {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_string()) {
            out.push(trimmed.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_trimmed_deduplicated_and_case_sensitive() {
        let card = Card::from_fields(
            CardFields::new("T").with_tags([" work", "work ", "", "  ", "Work", "home"]),
        );
        assert_eq!(card.tags(), ["work", "Work", "home"]);
    }

    #[test]
    fn url_block_drops_blank_lines() {
        assert_eq!(
            parse_url_block("https://a.example\n\n   \n https://b.example \n"),
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn empty_title_falls_back_to_default() {
        let card = Card::from_fields(CardFields::default());
        assert_eq!(card.title(), DEFAULT_TITLE);
        assert!(card.urls().is_empty());
        assert_eq!(card.actions(), CardActions::empty());
    }

    #[test]
    fn actions_reflect_content() {
        let card = Card::from_fields(
            CardFields::new("T")
                .with_text("hello")
                .with_urls(["https://example.org"]),
        );
        assert_eq!(
            card.actions(),
            CardActions::OPEN_URLS | CardActions::COPY_TEXT
        );

        let blank_text = Card::from_fields(CardFields::new("T").with_text("   \n"));
        assert!(!blank_text.actions().contains(CardActions::COPY_TEXT));
    }

    #[test]
    fn patch_only_touches_given_fields() {
        let mut card = Card::from_fields(
            CardFields::new("Before")
                .with_text("body")
                .with_tags(["a"]),
        );
        card.apply(CardPatch::default().title("After").tags(vec!["b ".into(), "b".into()]));
        assert_eq!(card.title(), "After");
        assert_eq!(card.text(), "body");
        assert_eq!(card.tags(), ["b"]);
    }

    #[test]
    fn patched_tags_are_split_on_commas() {
        let mut card = Card::from_fields(CardFields::new("T"));
        card.apply(CardPatch::default().tags(vec!["a, b".into(), "b,c".into()]));
        assert_eq!(card.tags(), ["a", "b", "c"]);
        assert!(card.has_tag("a"));
    }

    #[test]
    fn patching_an_empty_title_uses_default() {
        let mut card = Card::from_fields(CardFields::new("Keep"));
        card.apply(CardPatch::default().title(""));
        assert_eq!(card.title(), DEFAULT_TITLE);
    }

    #[test]
    fn tag_list_parsing_splits_on_commas() {
        assert_eq!(parse_tag_list("a, b,,c ,"), vec!["a", "b", "c"]);
    }
}
