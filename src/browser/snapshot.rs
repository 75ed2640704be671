use super::{PageElement, RenderedPage};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

/// A page reconstructed from saved markup.
///
/// Used for offline extraction and in tests. There is no script runtime
/// behind it, so `eval_string` never yields a value.
pub struct SnapshotPage {
    source: String,
    document: Html,
}

impl SnapshotPage {
    pub fn new(html: impl Into<String>) -> Self {
        let source = html.into();
        let document = Html::parse_document(&source);
        Self { source, document }
    }
}

impl RenderedPage for SnapshotPage {
    fn query_all(&self, selector: &str) -> Vec<Box<dyn PageElement + '_>> {
        let Ok(selector) = Selector::parse(selector) else {
            return Vec::new();
        };
        self.document
            .select(&selector)
            .map(|e| Box::new(SnapshotElement(e)) as Box<dyn PageElement + '_>)
            .collect()
    }

    fn wait_for(&self, selector: &str, _timeout: Duration) -> bool {
        self.query(selector).is_some()
    }

    fn markup(&self) -> Option<String> {
        Some(self.source.clone())
    }
}

struct SnapshotElement<'a>(ElementRef<'a>);

impl PageElement for SnapshotElement<'_> {
    fn attribute(&self, name: &str) -> Option<String> {
        self.0
            .value()
            .attr(name)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn children(&self, selector: &str) -> Vec<Box<dyn PageElement + '_>> {
        let Ok(selector) = Selector::parse(selector) else {
            return Vec::new();
        };
        self.0
            .select(&selector)
            .map(|e| Box::new(SnapshotElement(e)) as Box<dyn PageElement + '_>)
            .collect()
    }

    fn eval_string(&self, _function: &str) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queries_attributes_and_children() {
        let page = SnapshotPage::new(
            r#"<html><body>
                <video data-testid="post-video"><source src="https://video.fbcdn.net/a.mp4"></video>
                <img src="">
            </body></html>"#,
        );

        let video = page.query("[data-testid*='video']").unwrap();
        assert_eq!(video.attribute("data-testid").as_deref(), Some("post-video"));
        assert!(video.attribute("src").is_none());

        let sources = video.children("source");
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].attribute("src").as_deref(), Some("https://video.fbcdn.net/a.mp4"));

        assert!(page.query("img").unwrap().attribute("src").is_none());
        assert!(page.wait_for("video", Duration::ZERO));
        assert!(!page.wait_for("audio", Duration::ZERO));
    }

    #[test]
    fn test_invalid_selector_matches_nothing() {
        let page = SnapshotPage::new("<p>hi</p>");
        assert!(page.query_all("[[nope").is_empty());
        assert!(page.markup().unwrap().contains("<p>hi</p>"));
    }
}
