use super::{Capability, Strategy};
use crate::browser::{Budget, RenderedPage};
use crate::extractor::types::{ExtractionResult, MediaType};
use crate::extractor::validate::{is_content_cdn, is_ui_asset};
use std::time::Duration;
use tracing::debug;

/// Loosest element scan: any CDN-hosted media element that is not page
/// chrome. Last resort after the stricter strategies.
pub struct FallbackStrategy {
    timeout: Duration,
}

impl FallbackStrategy {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Strategy for FallbackStrategy {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn capability(&self) -> Capability {
        Capability::TypeGated
    }

    fn attempt(&self, page: &dyn RenderedPage, content_type: MediaType) -> Option<ExtractionResult> {
        let budget = Budget::new(self.timeout);
        page.limit_to(&budget);
        let selector = match content_type {
            MediaType::Video => "video",
            MediaType::Image => "img",
        };

        for element in page.query_all(selector) {
            if budget.expired() {
                break;
            }
            let Some(url) = element.attribute("src") else {
                continue;
            };
            debug!(%url, "Fallback checking element");

            if !is_content_cdn(&url) {
                continue;
            }
            match content_type {
                MediaType::Video if !url.starts_with("blob:") => {
                    return Some(ExtractionResult::video(url));
                }
                MediaType::Image if !is_ui_asset(&url) && !url.contains(".mp4") => {
                    return Some(ExtractionResult::image(url));
                }
                _ => {}
            }
        }
        None
    }
}
