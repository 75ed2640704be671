mod classify;
mod metadata;
mod normalize;
mod strategy;
mod types;
mod validate;

pub use classify::Classifier;
pub use metadata::extract_metadata;
pub use normalize::{normalize, normalize_url, CANONICAL_HOST};
pub use strategy::{
    Capability, DomStrategy, FallbackStrategy, MetaTagStrategy, SourceMarkupStrategy, Strategy,
    StrategyChain, StrategyKind,
};
pub use types::*;
pub use validate::{
    is_image_candidate, is_strict_image_candidate, is_video_candidate, score_image, unescape_url,
};

use crate::browser::{BrowserSession, RenderedPage, SnapshotPage};
use crate::config::{Config, TimeoutConfig};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use tracing::{error, info, info_span};

const VIDEO_WAIT_SELECTOR: &str = "video, [data-testid*='video'], [role='video'], video[src]";

/// Classifier plus the active strategy chain. Stateless; safe to share.
pub struct Pipeline {
    classifier: Classifier,
    chain: StrategyChain,
}

impl Pipeline {
    pub fn new(classifier: Classifier, chain: StrategyChain) -> Self {
        Self { classifier, chain }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Classifier::new(config.timeouts.classify_probe()),
            StrategyChain::from_kinds(&config.strategies, &config.timeouts),
        )
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.chain.names()
    }

    /// Classify the page and run the chain. `None` means no strategy found
    /// anything usable.
    pub fn run(&self, page: &dyn RenderedPage) -> Option<ExtractionResult> {
        let content_type = self.classifier.classify(page);
        info!(%content_type, "Classified page");
        self.chain.run(page, content_type)
    }

    /// Run the pipeline over saved markup of a post, without a browser.
    pub fn extract_markup(&self, raw_url: &str, html: &str) -> Result<ExtractionResult, ExtractError> {
        let post = normalize(raw_url)?;
        let _span = info_span!("extract_markup", post = %post.post_id).entered();
        guarded(|| {
            let page = SnapshotPage::new(html);
            self.run(&page).ok_or(ExtractError::NoMediaFound)
        })
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// The operation the serving layer consumes.
pub trait MediaExtractor: Send + Sync {
    fn extract(&self, raw_url: &str) -> Result<ExtractionResult, ExtractError>;
}

/// Entry point for the serving layer: one shared browser session, one tab
/// per call.
pub struct Extractor {
    session: BrowserSession,
    pipeline: Pipeline,
    timeouts: TimeoutConfig,
}

impl Extractor {
    pub fn new(session: BrowserSession, config: &Config) -> Self {
        Self {
            session,
            pipeline: Pipeline::from_config(config),
            timeouts: config.timeouts.clone(),
        }
    }

    pub fn launch(config: &Config) -> Result<Self, ExtractError> {
        let session = BrowserSession::launch(&config.browser)?;
        let extractor = Self::new(session, config);
        info!(strategies = ?extractor.pipeline.strategy_names(), "Extractor ready");
        Ok(extractor)
    }

    /// Resolve a Threads post URL to a direct media URL.
    ///
    /// Input validation happens before any browser work. A panic anywhere in
    /// the browser phase is reported as `ExtractError::Internal`.
    pub fn extract(&self, raw_url: &str) -> Result<ExtractionResult, ExtractError> {
        let post = normalize(raw_url)?;
        let _span = info_span!("extract", post = %post.post_id).entered();
        guarded(|| self.extract_post(&post))
    }

    fn extract_post(&self, post: &PostReference) -> Result<ExtractionResult, ExtractError> {
        let url = post.canonical_url();
        let page = self.session.open_page()?;

        info!("Navigating to {}", url);
        page.navigate(&url, self.timeouts.navigation())?;
        page.wait_for_load(self.timeouts.load_wait());

        thread::sleep(self.timeouts.settle());

        if page.wait_for(VIDEO_WAIT_SELECTOR, self.timeouts.element_wait()) {
            thread::sleep(self.timeouts.element_settle());
        } else {
            info!("No video elements found immediately, proceeding");
        }

        self.pipeline.run(&*page).ok_or(ExtractError::NoMediaFound)
    }

    pub fn close(self) {
        self.session.close();
    }
}

impl MediaExtractor for Extractor {
    fn extract(&self, raw_url: &str) -> Result<ExtractionResult, ExtractError> {
        Extractor::extract(self, raw_url)
    }
}

fn guarded<T>(f: impl FnOnce() -> Result<T, ExtractError>) -> Result<T, ExtractError> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            error!("Panic during extraction: {}", panic_message(payload.as_ref()));
            Err(ExtractError::Internal)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
