/// Converts card text to HTML. Optional: the board works without one.
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, text: &str) -> String;
}

/// Renderer compiled into this build, if any and if enabled.
pub fn default_renderer(enabled: bool) -> Option<Box<dyn MarkdownRenderer>> {
    if !enabled {
        return None;
    }
    builtin()
}

#[cfg(feature = "markdown")]
fn builtin() -> Option<Box<dyn MarkdownRenderer>> {
    Some(Box::new(PulldownRenderer))
}

#[cfg(not(feature = "markdown"))]
fn builtin() -> Option<Box<dyn MarkdownRenderer>> {
    None
}

/// CommonMark renderer. Raw HTML is escaped and single newlines become line
/// breaks.
#[cfg(feature = "markdown")]
#[derive(Debug, Clone, Copy, Default)]
pub struct PulldownRenderer;

#[cfg(feature = "markdown")]
impl MarkdownRenderer for PulldownRenderer {
    fn render(&self, text: &str) -> String {
        use pulldown_cmark::{html, Event, Options, Parser};

        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        let events = Parser::new_ext(text, options).map(|event| match event {
            Event::SoftBreak => Event::HardBreak,
            Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
            other => other,
        });
        let mut out = String::with_capacity(text.len() * 3 / 2);
        html::push_html(&mut out, events);
        out
    }
}
