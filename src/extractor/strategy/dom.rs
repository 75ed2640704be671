use super::{Capability, Strategy};
use crate::browser::{Budget, PageElement, RenderedPage};
use crate::extractor::types::{ExtractionResult, MediaType};
use crate::extractor::validate::{is_strict_image_candidate, is_video_candidate, score_image};
use std::time::Duration;
use tracing::debug;

// Most common first.
const VIDEO_SELECTORS: &[&str] = &[
    "video[src]",
    "video",
    "[data-testid*='video']",
    "[role='video']",
    "video[autoplay]",
    "[data-video-url]",
];

/// Players that attach the stream after the first render never reflect it
/// back into `src`; only the live property has it.
const CURRENT_SRC_JS: &str = "function() { return this.currentSrc || this.src || ''; }";

const IMAGE_ACCEPT_SCORE: u32 = 50;

/// Reads media URLs straight off rendered `<video>` and `<img>` elements.
pub struct DomStrategy {
    timeout: Duration,
}

impl DomStrategy {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn find_video(&self, page: &dyn RenderedPage, budget: &Budget) -> Option<String> {
        for selector in VIDEO_SELECTORS {
            if budget.expired() {
                debug!("DOM video search out of time");
                return None;
            }
            let elements = page.query_all(selector);
            if elements.is_empty() {
                debug!(selector, "No elements found");
                continue;
            }
            debug!(selector, count = elements.len(), "Found video elements");

            for element in &elements {
                if let Some(url) = video_url_from_element(element.as_ref()) {
                    return Some(url);
                }
            }
        }
        None
    }

    fn find_image(&self, page: &dyn RenderedPage, budget: &Budget) -> Option<String> {
        let (best, score) = page
            .query_all("img")
            .iter()
            .take_while(|_| !budget.expired())
            .filter_map(|img| img.attribute("src"))
            .filter(|src| is_strict_image_candidate(src))
            .map(|src| {
                let score = score_image(&src);
                (src, score)
            })
            .fold((None, 0), |(best, best_score), (src, score)| {
                if score > best_score {
                    (Some(src), score)
                } else {
                    (best, best_score)
                }
            });

        if score > IMAGE_ACCEPT_SCORE {
            debug!(score, "DOM found image");
            best
        } else {
            None
        }
    }
}

/// First video candidate among `src`, `data-video-url`, nested `<source>`
/// elements and the live `currentSrc`.
fn video_url_from_element(element: &dyn PageElement) -> Option<String> {
    for attr in ["src", "data-video-url"] {
        if let Some(url) = element.attribute(attr).filter(|u| is_video_candidate(u)) {
            return Some(url);
        }
    }

    let from_source = element
        .children("source")
        .iter()
        .filter_map(|s| s.attribute("src"))
        .find(|src| is_video_candidate(src));
    if from_source.is_some() {
        return from_source;
    }

    element
        .eval_string(CURRENT_SRC_JS)
        .filter(|src| is_video_candidate(src))
}

impl Strategy for DomStrategy {
    fn name(&self) -> &'static str {
        "dom"
    }

    fn capability(&self) -> Capability {
        Capability::TypeGated
    }

    fn attempt(&self, page: &dyn RenderedPage, content_type: MediaType) -> Option<ExtractionResult> {
        let budget = Budget::new(self.timeout);
        page.limit_to(&budget);
        match content_type {
            MediaType::Video => self.find_video(page, &budget).map(ExtractionResult::video),
            MediaType::Image => self.find_image(page, &budget).map(ExtractionResult::image),
        }
    }
}
