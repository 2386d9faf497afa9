use crate::traits::Sanitizer;
use crate::types::{PublisherError, Result};
use lol_html::html_content::{ContentType, TextType};

/// Elements dropped together with everything inside them.
pub const REMOVED_ELEMENTS: &[&str] = &["script", "style", "iframe", "object", "embed"];

/// The only attributes that survive sanitization.
pub const ALLOWED_ATTRIBUTES: &[&str] = &["href", "src", "alt", "title", "class", "id"];

/// Escape angle brackets left as literal text. Removing an element can leave
/// a stray `<` next to text that reads as a tag once the two sides join.
fn escape_angle_brackets(text: &str) -> Option<String> {
    if !text.contains(['<', '>']) {
        return None;
    }
    Some(text.replace('<', "&lt;").replace('>', "&gt;"))
}

/// Streaming HTML sanitizer built on `lol_html`.
#[derive(Debug, Clone, Default)]
pub struct HtmlSanitizer;

impl HtmlSanitizer {
    pub fn new() -> Self {
        Self
    }
}

impl Sanitizer for HtmlSanitizer {
    fn sanitize(&self, html: &str) -> Result<String> {
        if html.is_empty() {
            return Ok(String::new());
        }

        let removed_selector = REMOVED_ELEMENTS.join(", ");
        let mut output = String::with_capacity(html.len());
        let mut rewriter = lol_html::HtmlRewriter::new(
            lol_html::Settings {
                element_content_handlers: vec![
                    lol_html::element!(removed_selector, |el| {
                        el.remove();
                        Ok(())
                    }),
                    lol_html::element!("*", |el| {
                        let disallowed: Vec<String> = el
                            .attributes()
                            .iter()
                            .map(|attr| attr.name())
                            .filter(|name| !ALLOWED_ATTRIBUTES.contains(&name.as_str()))
                            .collect();
                        for name in disallowed {
                            el.remove_attribute(&name);
                        }
                        Ok(())
                    }),
                ],
                document_content_handlers: vec![lol_html::doc_text!(|chunk| {
                    if matches!(chunk.text_type(), TextType::Data | TextType::RCData) {
                        if let Some(escaped) = escape_angle_brackets(chunk.as_str()) {
                            chunk.replace(&escaped, ContentType::Html);
                        }
                    }
                    Ok(())
                })],
                ..Default::default()
            },
            |c: &[u8]| {
                output.push_str(&String::from_utf8_lossy(c));
            },
        );

        rewriter
            .write(html.as_bytes())
            .map_err(|e| PublisherError::Sanitize(e.to_string()))?;
        rewriter
            .end()
            .map_err(|e| PublisherError::Sanitize(e.to_string()))?;

        Ok(output)
    }
}
