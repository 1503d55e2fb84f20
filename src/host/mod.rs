//! Host capabilities the card board calls out to: clipboard access, URL
//! launching and markdown rendering. Each is a trait so the board can run
//! against in-memory doubles.

use crate::error::{ClipboardError, OpenError};

mod clipboard;
mod markdown;
mod opener;

pub use clipboard::SystemClipboard;
#[cfg(feature = "markdown")]
pub use markdown::PulldownRenderer;
pub use markdown::{default_renderer, MarkdownRenderer};
pub use opener::SystemOpener;

pub trait Clipboard: Send + Sync {
    fn read_text(&self) -> Result<String, ClipboardError>;
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

pub trait UrlOpener: Send + Sync {
    fn open(&self, url: &str) -> Result<(), OpenError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use parking_lot::Mutex;

    use super::{Clipboard, UrlOpener};
    use crate::error::{ClipboardError, OpenError};

    #[derive(Debug, Default)]
    pub struct MemoryClipboard {
        contents: Mutex<Option<String>>,
        denied: bool,
    }

    impl MemoryClipboard {
        pub fn with_text(text: &str) -> Self {
            Self {
                contents: Mutex::new(Some(text.to_string())),
                denied: false,
            }
        }

        pub fn denied() -> Self {
            Self {
                contents: Mutex::new(None),
                denied: true,
            }
        }

        pub fn contents(&self) -> Option<String> {
            self.contents.lock().clone()
        }
    }

    impl Clipboard for MemoryClipboard {
        fn read_text(&self) -> Result<String, ClipboardError> {
            if self.denied {
                return Err(ClipboardError::Denied("permission denied".into()));
            }
            Ok(self.contents.lock().clone().unwrap_or_default())
        }

        fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
            if self.denied {
                return Err(ClipboardError::Denied("permission denied".into()));
            }
            *self.contents.lock() = Some(text.to_string());
            Ok(())
        }
    }

    /// Records every opened URL; URLs listed in `blocked` fail as blocked.
    #[derive(Debug, Default)]
    pub struct RecordingOpener {
        pub opened: Mutex<Vec<String>>,
        pub blocked: Vec<String>,
    }

    impl RecordingOpener {
        pub fn blocking(urls: &[&str]) -> Self {
            Self {
                opened: Mutex::new(Vec::new()),
                blocked: urls.iter().map(|url| url.to_string()).collect(),
            }
        }

        pub fn opened(&self) -> Vec<String> {
            self.opened.lock().clone()
        }
    }

    impl UrlOpener for RecordingOpener {
        fn open(&self, url: &str) -> Result<(), OpenError> {
            if self.blocked.iter().any(|blocked| blocked == url) {
                return Err(OpenError::Blocked(url.to_string()));
            }
            self.opened.lock().push(url.to_string());
            Ok(())
        }
    }
}
