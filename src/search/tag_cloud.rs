use std::cmp::Ordering;
use std::collections::HashMap;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::cards::Card;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

/// Tag occurrence counts split into the upper and lower display rows.
///
/// Always rebuilt from the full collection; never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagCloud {
    pub upper: Vec<TagCount>,
    pub lower: Vec<TagCount>,
}

impl TagCloud {
    pub fn build(cards: &[Card]) -> Self {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for card in cards {
            for tag in card.tags() {
                *counts.entry(tag.as_str()).or_default() += 1;
            }
        }

        let mut cloud = TagCloud::default();
        for (tag, count) in counts {
            let entry = TagCount {
                tag: tag.to_string(),
                count,
            };
            if is_upper_tag(tag) {
                cloud.upper.push(entry);
            } else {
                cloud.lower.push(entry);
            }
        }
        cloud.upper.sort_by(|a, b| locale_cmp(&a.tag, &b.tag));
        cloud.lower.sort_by(|a, b| locale_cmp(&a.tag, &b.tag));
        cloud
    }

    pub fn is_empty(&self) -> bool {
        self.upper.is_empty() && self.lower.is_empty()
    }

    pub fn len(&self) -> usize {
        self.upper.len() + self.lower.len()
    }

    pub fn count(&self, tag: &str) -> Option<usize> {
        self.iter()
            .find(|entry| entry.tag == tag)
            .map(|entry| entry.count)
    }

    /// Upper row first, then lower row.
    pub fn iter(&self) -> impl Iterator<Item = &TagCount> {
        self.upper.iter().chain(self.lower.iter())
    }
}

/// True when the first character equals its own upper-case form. Characters
/// without case (digits, punctuation) therefore land in the upper row.
pub fn is_upper_tag(tag: &str) -> bool {
    let Some(first) = tag.chars().next() else {
        return false;
    };
    let mut upper = first.to_uppercase();
    upper.next() == Some(first) && upper.next().is_none()
}

/// Collation order for tag names: base letters first (accents and case
/// ignored), then unaccented before accented, then lower case before upper.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| b.cmp(a))
}

fn collation_key(tag: &str) -> String {
    tag.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}
