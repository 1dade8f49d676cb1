//! HTML to PDF rendering.
//!
//! The pipeline is: repair the HTML (`sanitize`), re-serialize it as XHTML
//! (`xhtml`), lay it out on print pages (`layout`), encode the pages
//! (`pdf`). The whole document is produced in memory.
//!
//! A `Renderer` holds only immutable configuration. Every call to `render`
//! builds its own `LayoutContext`, so one renderer can serve concurrent calls
//! without locking.
//!
//! Parsing cost grows with element nesting, so input is bounded three ways
//! before and during a render: byte size, estimated nesting depth, and a
//! wall-clock timeout around the blocking task.

pub mod fonts;
pub mod layout;
pub mod pdf;
pub mod sanitize;
pub mod xhtml;

use ammonia::Builder as AmmoniaBuilder;
use std::{fmt, sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{debug, warn};

use self::{
    layout::{PageSetup, paginate},
    pdf::DocumentInfo,
};

/// Default ceiling on accepted HTML input: 2 MiB.
pub const DEFAULT_MAX_HTML_BYTES: usize = 2 * 1024 * 1024;
/// Default ceiling on element nesting.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 512;
/// Default wall-clock budget for one render.
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("html input is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },
    #[error("html nesting exceeds {limit} levels")]
    TooDeep { limit: usize },
    #[error("render did not finish within {0:?}")]
    Timeout(Duration),
    #[error("markup could not be processed: {0}")]
    Markup(String),
    #[error("pdf encoding failed: {0}")]
    Encode(#[from] lopdf::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("render task failed: {0}")]
    Task(String),
}

impl RenderError {
    pub(crate) fn markup<E: fmt::Display>(err: E) -> Self {
        RenderError::Markup(err.to_string())
    }
}

/// Converts HTML to PDF with fixed print settings.
#[derive(Clone)]
pub struct Renderer {
    sanitizer: Arc<AmmoniaBuilder<'static>>,
    setup: PageSetup,
    max_html_bytes: usize,
    max_depth: usize,
    timeout: Duration,
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("setup", &self.setup)
            .field("max_html_bytes", &self.max_html_bytes)
            .field("max_depth", &self.max_depth)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HTML_BYTES)
    }
}

impl Renderer {
    pub fn new(max_html_bytes: usize) -> Self {
        Self {
            sanitizer: Arc::new(sanitize::build_sanitizer()),
            setup: PageSetup::default(),
            max_html_bytes,
            max_depth: DEFAULT_MAX_NESTING_DEPTH,
            timeout: DEFAULT_RENDER_TIMEOUT,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_html_bytes(&self) -> usize {
        self.max_html_bytes
    }

    /// Render `html` to a complete PDF. `title` goes into the document info.
    ///
    /// Malformed markup is repaired rather than rejected; only oversized or
    /// too deeply nested input and encoder failures produce errors.
    pub fn render(&self, html: &str, title: Option<&str>) -> Result<Vec<u8>, RenderError> {
        if html.len() > self.max_html_bytes {
            return Err(RenderError::TooLarge {
                size: html.len(),
                limit: self.max_html_bytes,
            });
        }

        if sanitize::nesting_depth(html, self.max_depth) > self.max_depth {
            return Err(RenderError::TooDeep {
                limit: self.max_depth,
            });
        }

        let repaired = sanitize::repair(&self.sanitizer, html);
        let document = xhtml::to_xhtml(&repaired)?;
        let blocks = layout::collect_blocks(&document)?;
        let pages = paginate(&self.setup, &blocks);

        let info = DocumentInfo {
            title: title.map(str::to_string),
            producer: env!("CARGO_PKG_NAME").to_string(),
        };
        let bytes = pdf::encode(&self.setup, &pages, &info)?;

        debug!(
            html_bytes = html.len(),
            blocks = blocks.len(),
            pages = pages.len(),
            pdf_bytes = bytes.len(),
            "rendered document"
        );
        Ok(bytes)
    }

    /// Run `render` on the blocking pool; layout is CPU-bound. The caller
    /// gets `Timeout` once the budget is spent. The blocking task itself
    /// cannot be interrupted and finishes in the background.
    pub async fn render_blocking(
        &self,
        html: String,
        title: Option<String>,
    ) -> Result<Vec<u8>, RenderError> {
        let renderer = self.clone();
        let html_bytes = html.len();
        let task = tokio::task::spawn_blocking(move || renderer.render(&html, title.as_deref()));

        match tokio::time::timeout(self.timeout, task).await {
            Ok(joined) => joined.map_err(|err| RenderError::Task(err.to_string()))?,
            Err(_) => {
                warn!(html_bytes, timeout = ?self.timeout, "render timed out");
                Err(RenderError::Timeout(self.timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::Document;

    #[test]
    fn renders_simple_html_to_pdf() {
        let bytes = Renderer::default()
            .render("<p>Test 1</p>", Some("t.pdf"))
            .unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn repairs_malformed_markup_instead_of_failing() {
        let html = "<div><p>unclosed <b>bold<li>stray</ul></i>&nbsp;&copy; <table><td>cell";
        let bytes = Renderer::default().render(html, None).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn empty_and_script_only_input_still_produce_a_page() {
        for html in ["", "<script>alert(1)</script>"] {
            let bytes = Renderer::default().render(html, None).unwrap();
            let doc = Document::load_mem(&bytes).unwrap();
            assert_eq!(doc.get_pages().len(), 1);
        }
    }

    #[test]
    fn long_documents_span_several_pages() {
        let html = "<p>A paragraph of moderately long text that wraps.</p>".repeat(300);
        let bytes = Renderer::default().render(&html, None).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert!(doc.get_pages().len() > 1);
    }

    #[test]
    fn oversized_input_is_rejected() {
        let err = Renderer::new(8).render("<p>too long</p>", None).unwrap_err();
        assert!(matches!(err, RenderError::TooLarge { size: 15, limit: 8 }));
    }

    #[test]
    fn deeply_nested_input_is_rejected_before_parsing() {
        let html = "<div>".repeat(400_000);
        let err = Renderer::default().render(&html, None).unwrap_err();
        assert!(matches!(err, RenderError::TooDeep { limit: DEFAULT_MAX_NESTING_DEPTH }));

        let err = Renderer::default()
            .with_max_depth(3)
            .render("<div><ul><li><b>x</b></li></ul></div>", None)
            .unwrap_err();
        assert!(matches!(err, RenderError::TooDeep { limit: 3 }));
    }

    #[test]
    fn nesting_within_the_limit_renders() {
        let html = format!("{}deep{}", "<div>".repeat(200), "</div>".repeat(200));
        let bytes = Renderer::default().render(&html, None).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[tokio::test]
    async fn blocking_render_past_its_budget_times_out() {
        let html = "<p>A paragraph of moderately long text that wraps.</p>".repeat(2_000);
        let err = Renderer::default()
            .with_timeout(Duration::ZERO)
            .render_blocking(html, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Timeout(d) if d == Duration::ZERO));
    }

    #[tokio::test]
    async fn blocking_render_matches_direct_render_shape() {
        let bytes = Renderer::default()
            .render_blocking("<h1>Hi</h1><ul><li>a</li></ul>".into(), None)
            .await
            .unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }
}
