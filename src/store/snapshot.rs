use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{serde_as, DefaultOnNull};

use crate::cards::{parse_tag_list, parse_url_block, CardFields};
use crate::error::ImportError;

/// Durable form of one card, in the canonical export layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    pub title: String,
    /// Newline joined URLs.
    pub url: String,
    pub copy_text: String,
    pub tags: Vec<String>,
}

impl CardRecord {
    pub fn into_fields(self) -> CardFields {
        CardFields {
            title: self.title,
            text: self.copy_text,
            urls: parse_url_block(&self.url),
            tags: self.tags,
        }
    }
}

/// Ordered card records; the only representation that is ever persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PersistedSnapshot {
    pub records: Vec<CardRecord>,
}

impl PersistedSnapshot {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn to_json(&self, pretty: bool) -> Result<String, serde_json::Error> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }

    /// Decodes the canonical array layout, its legacy field names, or the
    /// `{"cards": [...]}` demo layout.
    pub fn from_json(raw: &str) -> Result<Self, ImportError> {
        let document: Value = serde_json::from_str(raw)?;
        let records = match document {
            Value::Array(_) => serde_json::from_value::<Vec<IncomingRecord>>(document)?
                .into_iter()
                .map(IncomingRecord::into_record)
                .collect(),
            Value::Object(mut object) => match object.remove("cards") {
                Some(cards @ Value::Array(_)) => serde_json::from_value::<Vec<DemoRecord>>(cards)?
                    .into_iter()
                    .map(DemoRecord::into_record)
                    .collect(),
                _ => return Err(ImportError::UnsupportedShape),
            },
            _ => return Err(ImportError::UnsupportedShape),
        };
        Ok(Self { records })
    }
}

/// Tags arrive either as a list or as one comma separated string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TagsField {
    List(Vec<String>),
    Joined(String),
}

impl Default for TagsField {
    fn default() -> Self {
        TagsField::List(Vec::new())
    }
}

impl TagsField {
    fn into_tags(self) -> Vec<String> {
        match self {
            TagsField::List(tags) => parse_tag_list(&tags.join(",")),
            TagsField::Joined(joined) => parse_tag_list(&joined),
        }
    }
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IncomingRecord {
    #[serde_as(as = "DefaultOnNull")]
    title: String,
    #[serde_as(as = "DefaultOnNull")]
    url: String,
    #[serde_as(as = "DefaultOnNull")]
    link: String,
    #[serde(rename = "copyText")]
    #[serde_as(as = "DefaultOnNull")]
    copy_text: String,
    #[serde_as(as = "DefaultOnNull")]
    copytext: String,
    #[serde_as(as = "DefaultOnNull")]
    tags: TagsField,
}

impl IncomingRecord {
    fn into_record(self) -> CardRecord {
        CardRecord {
            title: self.title,
            url: first_non_empty(self.url, self.link),
            copy_text: first_non_empty(self.copy_text, self.copytext),
            tags: self.tags.into_tags(),
        }
    }
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DemoRecord {
    #[serde_as(as = "DefaultOnNull")]
    title: String,
    #[serde_as(as = "DefaultOnNull")]
    links: Vec<String>,
    #[serde_as(as = "DefaultOnNull")]
    content: String,
    #[serde_as(as = "DefaultOnNull")]
    tags: TagsField,
}

impl DemoRecord {
    fn into_record(self) -> CardRecord {
        CardRecord {
            title: self.title,
            url: self.links.join("\n"),
            copy_text: self.content,
            tags: self.tags.into_tags(),
        }
    }
}

fn first_non_empty(preferred: String, legacy: String) -> String {
    if preferred.is_empty() {
        legacy
    } else {
        preferred
    }
}
