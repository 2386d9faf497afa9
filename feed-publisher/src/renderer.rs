//! Template rendering and document production for a single entry.

use crate::traits::DocumentEngine;
use crate::types::{PublicationRecord, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};
use tracing::{error, info, warn};

pub const TEMPLATE_NAME: &str = "article.html";

/// Template shipped with the crate, used when no template file is available.
pub const BUNDLED_TEMPLATE: &str = include_str!("../templates/article.html");

/// Page and typography settings substituted into the stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSettings {
    pub page_size: String,
    pub margin: String,
    pub font_size: u32,
    pub max_image_width: u32,
}

impl Default for StyleSettings {
    fn default() -> Self {
        Self {
            page_size: "A4".to_string(),
            margin: "0.375in".to_string(),
            font_size: 13,
            max_image_width: 400,
        }
    }
}

/// Read the stylesheet at `css_path`, substituting the configured settings
/// for the stock values. Falls back to [`fallback_stylesheet`] when the file
/// is missing or unreadable.
pub fn load_stylesheet(css_path: &Path, settings: &StyleSettings) -> String {
    match std::fs::read_to_string(css_path) {
        Ok(css) => css
            .replace("13px", &format!("{}px", settings.font_size))
            .replace("400px", &format!("{}px", settings.max_image_width))
            .replace("A4", &settings.page_size)
            .replace("0.375in", &settings.margin),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("CSS file not found: {}, using fallback styles", css_path.display());
            fallback_stylesheet(settings)
        }
        Err(e) => {
            error!("Error reading CSS file {}: {}, using fallback styles", css_path.display(), e);
            fallback_stylesheet(settings)
        }
    }
}

pub fn fallback_stylesheet(settings: &StyleSettings) -> String {
    format!(
        r#"
@page {{
    size: {page_size};
    margin: {margin};
}}
body {{
    font-family: 'Georgia', serif;
    font-size: {font_size}px;
    line-height: 1.5;
    color: #333;
}}
h1 {{ font-size: 24px; color: #2c3e50; }}
.metadata {{ background-color: #f8f9fa; padding: 20px; }}
.content {{ text-align: justify; }}
img {{
    max-width: {max_width}px;
    width: 100%;
    height: auto;
}}
"#,
        page_size = settings.page_size,
        margin = settings.margin,
        font_size = settings.font_size,
        max_width = settings.max_image_width,
    )
}

pub struct DocumentRenderer {
    tera: Tera,
    stylesheet: String,
    engine: Box<dyn DocumentEngine>,
}

impl DocumentRenderer {
    pub fn new(template: &str, stylesheet: String, engine: Box<dyn DocumentEngine>) -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, template)?;
        Ok(Self {
            tera,
            stylesheet,
            engine,
        })
    }

    /// Load the template from disk, or use the bundled one if the file is absent.
    pub fn from_template_file(path: &Path, stylesheet: String, engine: Box<dyn DocumentEngine>) -> Result<Self> {
        if !path.exists() {
            warn!("Template not found at {}, using bundled template", path.display());
            return Self::new(BUNDLED_TEMPLATE, stylesheet, engine);
        }
        let template = std::fs::read_to_string(path)?;
        Self::new(&template, stylesheet, engine)
    }

    pub fn extension(&self) -> &str {
        self.engine.extension()
    }

    pub fn render_html(&self, record: &PublicationRecord) -> Result<String> {
        let mut context = Context::from_serialize(&record.entry)?;
        context.insert("published", &record.published_at);
        Ok(self.tera.render(TEMPLATE_NAME, &context)?)
    }

    /// Render the record's document to its output path.
    ///
    /// Returns the path on success. Failures are logged and reported as `None`;
    /// no partially written file is ever left at the canonical path.
    pub async fn render(&self, record: &PublicationRecord) -> Option<PathBuf> {
        match self.try_render(record).await {
            Ok(()) => {
                info!("Document generated successfully: {}", record.output_path.display());
                Some(record.output_path.clone())
            }
            Err(e) => {
                error!(
                    "Error generating document for '{}': {} [{:?}]{}",
                    record.entry.entry_title,
                    e,
                    e,
                    source_chain(&e)
                );
                None
            }
        }
    }

    async fn try_render(&self, record: &PublicationRecord) -> Result<()> {
        let html = self.render_html(record)?;
        let document = self.engine.render(&html, &self.stylesheet).await?;
        write_atomically(&record.output_path, &document).await
    }
}

fn source_chain(err: &dyn std::error::Error) -> String {
    let mut chain = String::new();
    let mut current = err.source();
    while let Some(cause) = current {
        chain.push_str(" caused by: ");
        chain.push_str(&cause.to_string());
        current = cause.source();
    }
    chain
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".partial");
    PathBuf::from(name)
}

/// Write to a sibling temporary file, then rename it into place.
pub async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let staging = partial_path(path);
    if let Err(e) = tokio::fs::write(&staging, bytes).await {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(e.into());
    }
    if let Err(e) = tokio::fs::rename(&staging, path).await {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NormalizedEntry, PublisherError};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    struct EchoEngine;

    #[async_trait]
    impl DocumentEngine for EchoEngine {
        async fn render(&self, html: &str, stylesheet: &str) -> Result<Vec<u8>> {
            Ok(format!("{}\n{}", stylesheet, html).into_bytes())
        }
    }

    struct BrokenEngine;

    #[async_trait]
    impl DocumentEngine for BrokenEngine {
        async fn render(&self, _html: &str, _stylesheet: &str) -> Result<Vec<u8>> {
            Err(PublisherError::Engine("no fonts available".to_string()))
        }
    }

    fn record(output_path: PathBuf) -> PublicationRecord {
        PublicationRecord {
            entry: NormalizedEntry {
                entry_title: "Hello <World>".to_string(),
                feed_title: "Feed".to_string(),
                content: "<p>Body</p>".to_string(),
                author: "Author".to_string(),
                link: "https://example.com".to_string(),
                entry_id: "id-1".to_string(),
                generated_date: Utc::now(),
            },
            published_at: Utc.with_ymd_and_hms(2025, 7, 28, 10, 0, 0).unwrap(),
            output_path,
        }
    }

    #[test]
    fn bundled_template_renders_entry_fields() {
        let renderer = DocumentRenderer::new(BUNDLED_TEMPLATE, String::new(), Box::new(EchoEngine)).unwrap();
        let html = renderer.render_html(&record(PathBuf::from("x.pdf"))).unwrap();
        assert!(html.contains("Hello &lt;World&gt;"), "title must be escaped: {}", html);
        assert!(html.contains("<p>Body</p>"), "content must not be escaped");
        assert!(html.contains("Author"));
        assert!(html.contains("July 28, 2025"));
    }

    #[test]
    fn invalid_template_is_rejected() {
        let result = DocumentRenderer::new("{% if %}", String::new(), Box::new(EchoEngine));
        assert!(matches!(result, Err(PublisherError::Template(_))));
    }

    #[tokio::test]
    async fn render_writes_document_to_output_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("07-28-2025 Hello World.pdf");
        let renderer = DocumentRenderer::new("{{ entry_title }}", "css".to_string(), Box::new(EchoEngine)).unwrap();

        let rendered = renderer.render(&record(path.clone())).await;

        assert_eq!(rendered, Some(path.clone()));
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("css\n"));
        assert!(!partial_path(&path).exists());
    }

    #[tokio::test]
    async fn engine_failure_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        let renderer = DocumentRenderer::new("{{ entry_title }}", String::new(), Box::new(BrokenEngine)).unwrap();

        assert_eq!(renderer.render(&record(path.clone())).await, None);
        assert!(!path.exists());
        assert!(!partial_path(&path).exists());
    }

    #[tokio::test]
    async fn template_error_at_render_time_is_contained() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        let renderer = DocumentRenderer::new("{{ missing_field }}", String::new(), Box::new(EchoEngine)).unwrap();

        assert_eq!(renderer.render(&record(path.clone())).await, None);
        assert!(!path.exists());
    }

    #[test]
    fn stylesheet_values_are_substituted() {
        let dir = tempfile::tempdir().unwrap();
        let css = dir.path().join("style.css");
        std::fs::write(&css, "@page { size: A4; margin: 0.375in; } body { font-size: 13px; } img { max-width: 400px; }").unwrap();
        let settings = StyleSettings {
            page_size: "Letter".to_string(),
            margin: "1in".to_string(),
            font_size: 15,
            max_image_width: 600,
        };

        let loaded = load_stylesheet(&css, &settings);
        assert_eq!(loaded, "@page { size: Letter; margin: 1in; } body { font-size: 15px; } img { max-width: 600px; }");
    }

    #[test]
    fn missing_stylesheet_uses_fallback() {
        let settings = StyleSettings::default();
        let loaded = load_stylesheet(Path::new("/definitely/not/here.css"), &settings);
        assert_eq!(loaded, fallback_stylesheet(&settings));
        assert!(loaded.contains("size: A4"));
        assert!(loaded.contains("max-width: 400px"));
    }
}
