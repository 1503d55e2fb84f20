use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::error::PlaceholderError;
use crate::host::Clipboard;

pub const TIMESTAMP_KEY: &str = "YYYY-MM-DD_HH-mm-SS";
pub const CLIPBOARD_KEY: &str = "clipboard";

/// Produces the value substituted for one placeholder.
pub trait Resolve: Send + Sync {
    fn resolve(&self) -> Result<String, PlaceholderError>;
}

impl<F> Resolve for F
where
    F: Fn() -> Result<String, PlaceholderError> + Send + Sync,
{
    fn resolve(&self) -> Result<String, PlaceholderError> {
        self()
    }
}

/// Source of the local wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> PrimitiveDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> PrimitiveDateTime {
        let now = OffsetDateTime::now_local().unwrap_or_else(|err| {
            tracing::warn!(%err, "local UTC offset unavailable, using UTC");
            OffsetDateTime::now_utc()
        });
        PrimitiveDateTime::new(now.date(), now.time())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub PrimitiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> PrimitiveDateTime {
        self.0
    }
}

pub struct Placeholder {
    pub key: String,
    pub description: String,
    pub example: String,
    resolver: Box<dyn Resolve>,
}

impl Placeholder {
    /// The literal `{key}` token searched for in card text.
    pub fn token(&self) -> String {
        token(&self.key)
    }

    pub fn resolve(&self) -> Result<String, PlaceholderError> {
        self.resolver.resolve()
    }
}

impl fmt::Debug for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Placeholder")
            .field("key", &self.key)
            .field("description", &self.description)
            .field("example", &self.example)
            .finish_non_exhaustive()
    }
}

/// Insertion-ordered placeholder registry and the substitution engine.
#[derive(Debug, Default)]
pub struct PlaceholderRegistry {
    entries: IndexMap<String, Placeholder>,
}

impl PlaceholderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the timestamp and clipboard placeholders.
    pub fn builtin(clock: Arc<dyn Clock>, clipboard: Arc<dyn Clipboard>) -> Self {
        let mut registry = Self::new();
        registry.register(
            TIMESTAMP_KEY,
            "Current local date and time as YYYY-MM-DD_HH-mm-SS",
            "2025-02-19_15-39-05",
            move || format_timestamp(clock.now()),
        );
        registry.register(
            CLIPBOARD_KEY,
            "Current clipboard contents",
            "Copied text...",
            move || match clipboard.read_text() {
                Ok(text) => Ok(text),
                Err(err) => {
                    tracing::warn!(error = %err, "clipboard read failed, keeping placeholder");
                    Ok(token(CLIPBOARD_KEY))
                }
            },
        );
        registry
    }

    /// Registers or replaces a placeholder. Replacing keeps the original
    /// position in the substitution order.
    pub fn register<F>(
        &mut self,
        key: impl Into<String>,
        description: impl Into<String>,
        example: impl Into<String>,
        resolver: F,
    ) -> &mut Self
    where
        F: Fn() -> Result<String, PlaceholderError> + Send + Sync + 'static,
    {
        let key = key.into();
        self.entries.insert(
            key.clone(),
            Placeholder {
                key,
                description: description.into(),
                example: example.into(),
                resolver: Box::new(resolver),
            },
        );
        self
    }

    pub fn get(&self, key: &str) -> Option<&Placeholder> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Placeholder> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replaces every occurrence of each registered `{key}` token, in
    /// registration order. Resolution is skipped for tokens not present. A
    /// failing resolver leaves its token untouched and does not affect other
    /// keys.
    pub fn substitute(&self, text: &str) -> String {
        let mut result = text.to_string();
        for placeholder in self.entries.values() {
            let token = placeholder.token();
            if !result.contains(&token) {
                continue;
            }
            match placeholder.resolve() {
                Ok(value) => {
                    result = result.replace(&token, &value);
                    tracing::debug!(token = %token, "placeholder substituted");
                }
                Err(err) => {
                    tracing::warn!(token = %token, error = %err, "placeholder resolution failed");
                }
            }
        }
        result
    }
}

pub fn token(key: &str) -> String {
    format!("{{{key}}}")
}

pub fn format_timestamp(at: PrimitiveDateTime) -> Result<String, PlaceholderError> {
    let format = format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
    Ok(at.format(format)?)
}
