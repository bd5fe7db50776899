//! crates/learning_session_core/src/journey.rs
//!
//! Learning journeys: standalone HTML pages generated for a topic, stored
//! under a filename and served back verbatim.

use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use maud::{html, Markup, PreEscaped, DOCTYPE};
use regex::Regex;
use tracing::{info, warn};

use crate::error::JourneyError;
use crate::lesson::{spans, Span};
use crate::ports::{
    ImageSearchService, JourneyGenerationService, JourneyPageStore, PortError, PortResult,
};

const DESCRIPTOR_START: &str = "[image_descriptor_start]";
const DESCRIPTOR_END: &str = "[image_descriptor_end]";

const PAGE_STYLE: &str = "\
body { font-family: system-ui, sans-serif; line-height: 1.6; color: #333; max-width: 800px; margin: 0 auto; padding: 20px; background: #f5f5f5; }
.container { background: #fff; padding: 30px; border-radius: 10px; }
h1 { color: #2c3e50; text-align: center; }
img { max-width: 100%; display: block; margin: 20px auto; border-radius: 8px; }
strong { color: #2c3e50; }
.timestamp { text-align: center; color: #666; font-size: 0.9em; }
";

fn image_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[Image: (.*?)\]").expect("valid image pattern"))
}

/// Removes any unresolved image descriptor blocks.
fn strip_descriptors(text: &str) -> String {
    let mut text = text.to_string();
    while let (Some(start), Some(end)) = (text.find(DESCRIPTOR_START), text.find(DESCRIPTOR_END)) {
        if end < start {
            break;
        }
        text.replace_range(start..end + DESCRIPTOR_END.len(), "");
    }
    text
}

fn paragraph(text: &str) -> Markup {
    html! {
        p {
            @for span in spans(text) {
                @match span {
                    Span::Plain(plain) => { (plain) },
                    Span::Bold(bold) => { strong { (bold) } },
                }
            }
        }
    }
}

/// Converts lesson text into HTML: one `<p>` per blank-line separated
/// paragraph, `<img>` for `[Image: url]` paragraphs.
pub fn render_fragment(text: &str) -> Markup {
    let text = strip_descriptors(text);
    let paragraphs = text.split("\n\n").map(str::trim).filter(|p| !p.is_empty());
    html! {
        @for para in paragraphs {
            @if para.contains("[Image:") {
                @if let Some(url) = image_pattern().captures(para).and_then(|c| c.get(1)) {
                    img src=(url.as_str()) alt="Topic illustration";
                }
            } @else {
                (paragraph(para))
            }
        }
    }
}

fn title_case(topic: &str) -> String {
    topic
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Wraps rendered lesson text in a complete page.
pub fn render_page(topic: &str, text: &str, generated_at: DateTime<Utc>) -> String {
    let heading = format!("Learning About {}", title_case(topic));
    let stamp = generated_at.format("%B %d, %Y at %I:%M %p").to_string();
    let page = html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (heading) " - Learning Journey" }
                style { (PreEscaped(PAGE_STYLE)) }
            }
            body {
                div.container {
                    h1 { (heading) }
                    (render_fragment(text))
                    div.timestamp { "Generated on " (stamp) }
                }
            }
        }
    };
    page.into_string()
}

/// `learning_{slug}_{YYYYmmdd_HHMMSS}.html`, with the slug limited to safe characters.
pub fn journey_filename(topic: &str, generated_at: DateTime<Utc>) -> String {
    let slug: String = topic
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("learning_{}_{}.html", slug, generated_at.format("%Y%m%d_%H%M%S"))
}

/// Only generated page names are ever served.
pub fn is_journey_filename(name: &str) -> bool {
    name.starts_with("learning_")
        && name.ends_with(".html")
        && !name.contains(['/', '\\'])
        && !name.contains("..")
}

pub struct JourneyService {
    generator: Option<Arc<dyn JourneyGenerationService>>,
    images: Option<Arc<dyn ImageSearchService>>,
    pages: Arc<dyn JourneyPageStore>,
}

impl JourneyService {
    pub fn new(
        generator: Option<Arc<dyn JourneyGenerationService>>,
        pages: Arc<dyn JourneyPageStore>,
    ) -> Self {
        Self {
            generator,
            images: None,
            pages,
        }
    }

    /// Resolves image descriptors through `images` instead of dropping them.
    pub fn with_image_search(mut self, images: Arc<dyn ImageSearchService>) -> Self {
        self.images = Some(images);
        self
    }

    /// Generates and stores a page, returning its filename.
    pub async fn generate(&self, topic: &str) -> Result<String, JourneyError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(JourneyError::BlankTopic);
        }
        let generator = self.generator.as_ref().ok_or(JourneyError::Disabled)?;

        let text = generator.generate_journey_text(topic).await?;
        let text = self.resolve_images(text).await;
        let now = Utc::now();
        let filename = journey_filename(topic, now);
        self.pages
            .save_page(&filename, &render_page(topic, &text, now))
            .await?;
        info!("Learning journey for '{}' written to {}.", topic, filename);
        Ok(filename)
    }

    /// Replaces each descriptor block with an `[Image: url]` paragraph. Blocks
    /// that find nothing are removed.
    async fn resolve_images(&self, mut text: String) -> String {
        let Some(images) = &self.images else {
            return text;
        };
        let mut from = 0;
        while let Some(start) = text[from..].find(DESCRIPTOR_START).map(|i| i + from) {
            let Some(end) = text[start..].find(DESCRIPTOR_END).map(|i| i + start) else {
                break;
            };
            let descriptor = text[start + DESCRIPTOR_START.len()..end].trim().to_string();
            let found = if descriptor.is_empty() {
                None
            } else {
                match images.find_image(&descriptor).await {
                    Ok(url) => url.filter(|u| u.starts_with("https://") || u.starts_with("http://")),
                    Err(e) => {
                        warn!("Image search for '{}' failed: {}", descriptor, e);
                        None
                    }
                }
            };
            let replacement = match found {
                Some(url) => format!("\n\n[Image: {}]\n\n", url),
                None => String::new(),
            };
            text.replace_range(start..end + DESCRIPTOR_END.len(), &replacement);
            from = start + replacement.len();
        }
        text
    }

    pub async fn open(&self, filename: &str) -> PortResult<String> {
        if !is_journey_filename(filename) {
            return Err(PortError::NotFound(filename.to_string()));
        }
        self.pages.load_page(filename).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct MemoryPages(Mutex<HashMap<String, String>>);

    #[async_trait]
    impl JourneyPageStore for MemoryPages {
        async fn save_page(&self, filename: &str, html: &str) -> PortResult<()> {
            self.0.lock().await.insert(filename.into(), html.into());
            Ok(())
        }

        async fn load_page(&self, filename: &str) -> PortResult<String> {
            self.0
                .lock()
                .await
                .get(filename)
                .cloned()
                .ok_or_else(|| PortError::NotFound(filename.to_string()))
        }
    }

    struct CannedText;

    #[async_trait]
    impl JourneyGenerationService for CannedText {
        async fn generate_journey_text(&self, topic: &str) -> PortResult<String> {
            Ok(format!("All about **{}**.\n\n[Image: https://img.example/x.png]", topic))
        }
    }

    struct CannedImages;

    #[async_trait]
    impl ImageSearchService for CannedImages {
        async fn find_image(&self, descriptor: &str) -> PortResult<Option<String>> {
            match descriptor {
                "nothing" => Ok(None),
                "broken" => Err(PortError::Unexpected("search offline".into())),
                "script" => Ok(Some("javascript:alert(1)".into())),
                other => Ok(Some(format!("https://img.example/{}.png", other.replace(' ', "-")))),
            }
        }
    }

    struct DescribedText;

    #[async_trait]
    impl JourneyGenerationService for DescribedText {
        async fn generate_journey_text(&self, _topic: &str) -> PortResult<String> {
            Ok("Intro.\n[image_descriptor_start] leaf diagram [image_descriptor_end]\n\
                Middle.\n\n[image_descriptor_start]nothing[image_descriptor_end]\n\n\
                [image_descriptor_start]broken[image_descriptor_end]\n\n\
                [image_descriptor_start]script[image_descriptor_end]\n\nEnd."
                .to_string())
        }
    }

    #[test]
    fn fragment_converts_markers() {
        let text = "Intro with **bold** text.\n\n[Image: https://img.example/a.png]\n\nA < B";
        assert_eq!(
            render_fragment(text).into_string(),
            "<p>Intro with <strong>bold</strong> text.</p>\
             <img src=\"https://img.example/a.png\" alt=\"Topic illustration\">\
             <p>A &lt; B</p>"
        );
    }

    #[test]
    fn leftover_descriptors_are_removed() {
        let text = "Before\n\n[image_descriptor_start]a leaf diagram[image_descriptor_end]\n\nAfter";
        assert_eq!(render_fragment(text).into_string(), "<p>Before</p><p>After</p>");
    }

    #[test]
    fn markup_in_text_and_urls_is_escaped() {
        let page = render_page(
            "<script>",
            "**<b>bold</b>**\n\n[Image: https://img.example/a.png\"onerror=\"x]",
            Utc::now(),
        );
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("<h1>Learning About &lt;script&gt;</h1>"));
        assert!(page.contains("<strong>&lt;b&gt;bold&lt;/b&gt;</strong>"));
        assert!(page.contains("src=\"https://img.example/a.png&quot;onerror=&quot;x\""));
        assert!(!page.contains("<script>"));
    }

    #[test]
    fn filename_follows_the_journey_pattern() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let name = journey_filename("Black Holes/../etc", at);
        assert_eq!(name, "learning_black_holes____etc_20240305_140709.html");
        assert!(is_journey_filename(&name));
        assert!(!is_journey_filename("index.html"));
        assert!(!is_journey_filename("learning_../secret.html"));
    }

    #[test]
    fn page_has_title_and_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let page = render_page("black holes", "Dense.", at);
        assert!(page.contains("<h1>Learning About Black Holes</h1>"));
        assert!(page.contains("Generated on March 05, 2024 at 02:07 PM"));
        assert!(page.contains("<p>Dense.</p>"));
        assert!(page.contains("<title>Learning About Black Holes - Learning Journey</title>"));
    }

    #[tokio::test]
    async fn descriptors_become_images_when_a_search_finds_one() {
        let pages = Arc::new(MemoryPages::default());
        let service = JourneyService::new(Some(Arc::new(DescribedText)), pages.clone())
            .with_image_search(Arc::new(CannedImages));

        let filename = service.generate("Leaves").await.unwrap();
        let html = service.open(&filename).await.unwrap();
        assert!(html.contains(
            "<p>Intro.</p><img src=\"https://img.example/leaf-diagram.png\" alt=\"Topic illustration\"><p>Middle.</p>"
        ));
        assert_eq!(html.matches("<img").count(), 1);
        assert!(!html.contains("image_descriptor"));
        assert!(!html.contains("javascript:"));
        assert!(html.contains("<p>End.</p>"));
    }

    #[tokio::test]
    async fn descriptors_are_dropped_without_an_image_search() {
        let service = JourneyService::new(
            Some(Arc::new(DescribedText)),
            Arc::new(MemoryPages::default()),
        );
        let filename = service.generate("Leaves").await.unwrap();
        let html = service.open(&filename).await.unwrap();
        assert!(!html.contains("<img"));
        assert!(!html.contains("image_descriptor"));
        assert!(html.contains("<p>Intro.</p><p>Middle.</p>"));
    }

    #[tokio::test]
    async fn generate_stores_a_page_that_open_returns() {
        let service = JourneyService::new(
            Some(Arc::new(CannedText)),
            Arc::new(MemoryPages::default()),
        );
        let filename = service.generate("Tides").await.unwrap();
        assert!(filename.starts_with("learning_tides_"));

        let html = service.open(&filename).await.unwrap();
        assert!(html.contains("<strong>Tides</strong>"));
        assert!(html.contains("<img src=\"https://img.example/x.png\""));

        assert!(matches!(
            service.open("learning_missing.html").await,
            Err(PortError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn generate_rejects_blank_topics_and_missing_generator() {
        let pages: Arc<dyn JourneyPageStore> = Arc::new(MemoryPages::default());
        let disabled = JourneyService::new(None, pages.clone());
        assert!(matches!(
            disabled.generate("Tides").await,
            Err(JourneyError::Disabled)
        ));

        let service = JourneyService::new(Some(Arc::new(CannedText)), pages);
        assert!(matches!(
            service.generate("   ").await,
            Err(JourneyError::BlankTopic)
        ));
    }
}
