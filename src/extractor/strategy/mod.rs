//! Independent ways of locating a media URL on a rendered page, run in a
//! fixed order until one succeeds.

mod dom;
mod fallback;
mod meta_tags;
mod source;

pub use dom::DomStrategy;
pub use fallback::FallbackStrategy;
pub use meta_tags::MetaTagStrategy;
pub use source::SourceMarkupStrategy;

use super::types::{ExtractionResult, MediaType};
use crate::browser::RenderedPage;
use crate::config::TimeoutConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Which content types a strategy can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    VideoOnly,
    ImageOnly,
    /// Behaviour depends on the classified content type.
    TypeGated,
}

impl Capability {
    pub fn applies_to(&self, content_type: MediaType) -> bool {
        match self {
            Capability::VideoOnly => content_type == MediaType::Video,
            Capability::ImageOnly => content_type == MediaType::Image,
            Capability::TypeGated => true,
        }
    }
}

/// One self-contained method of locating a media reference.
///
/// Implementations only read from the page and never fail: anything that
/// goes wrong inside is reported as `None`.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn capability(&self) -> Capability;

    fn attempt(&self, page: &dyn RenderedPage, content_type: MediaType) -> Option<ExtractionResult>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Dom,
    Source,
    MetaTags,
    Fallback,
}

impl StrategyKind {
    pub const DEFAULT_ORDER: [StrategyKind; 4] = [
        StrategyKind::Dom,
        StrategyKind::Source,
        StrategyKind::MetaTags,
        StrategyKind::Fallback,
    ];

    pub fn build(&self, timeouts: &TimeoutConfig) -> Box<dyn Strategy> {
        match self {
            StrategyKind::Dom => Box::new(DomStrategy::new(timeouts.dom_strategy())),
            StrategyKind::Source => Box::new(SourceMarkupStrategy::new(timeouts.markup_strategy())),
            StrategyKind::MetaTags => Box::new(MetaTagStrategy::new(timeouts.markup_strategy())),
            StrategyKind::Fallback => Box::new(FallbackStrategy::new(timeouts.markup_strategy())),
        }
    }
}

/// An explicit, ordered list of strategies.
pub struct StrategyChain {
    strategies: Vec<Box<dyn Strategy>>,
}

impl StrategyChain {
    pub fn new(strategies: Vec<Box<dyn Strategy>>) -> Self {
        Self { strategies }
    }

    pub fn from_kinds(kinds: &[StrategyKind], timeouts: &TimeoutConfig) -> Self {
        Self::new(kinds.iter().map(|k| k.build(timeouts)).collect())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Run strategies in order and return the first result. `None` means
    /// every strategy abstained.
    pub fn run(&self, page: &dyn RenderedPage, content_type: MediaType) -> Option<ExtractionResult> {
        for strategy in &self.strategies {
            if !strategy.capability().applies_to(content_type) {
                debug!(strategy = strategy.name(), %content_type, "Skipping strategy");
                continue;
            }
            if let Some(result) = strategy.attempt(page, content_type) {
                info!(
                    strategy = strategy.name(),
                    media_type = %result.media_type,
                    url = %result.media_url,
                    "Strategy succeeded"
                );
                return Some(result);
            }
            debug!(strategy = strategy.name(), "Strategy abstained");
        }
        None
    }
}

impl Default for StrategyChain {
    fn default() -> Self {
        Self::from_kinds(&StrategyKind::DEFAULT_ORDER, &TimeoutConfig::default())
    }
}
