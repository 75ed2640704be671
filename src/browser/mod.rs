//! The browser control plane as seen by the extraction pipeline.
//!
//! Every read is best-effort: a missing element, a failed attribute read or
//! a script error all come back as "no value" rather than an error.

mod chrome;
mod snapshot;

pub use chrome::{BrowserSession, ChromePage, PageGuard};
pub use snapshot::SnapshotPage;

use std::time::{Duration, Instant};

/// One element of a rendered page, borrowed for the duration of a probe.
pub trait PageElement {
    /// Non-empty value of the named attribute.
    fn attribute(&self, name: &str) -> Option<String>;

    /// Descendants matching `selector`.
    fn children(&self, selector: &str) -> Vec<Box<dyn PageElement + '_>>;

    /// Call a read-only JS function with the element bound to `this` and
    /// return its non-empty string result.
    fn eval_string(&self, function: &str) -> Option<String>;
}

/// A page whose scripts have already run.
pub trait RenderedPage {
    fn query_all(&self, selector: &str) -> Vec<Box<dyn PageElement + '_>>;

    fn query(&self, selector: &str) -> Option<Box<dyn PageElement + '_>> {
        self.query_all(selector).into_iter().next()
    }

    /// Wait until at least one element matches `selector`.
    fn wait_for(&self, selector: &str, timeout: Duration) -> bool;

    /// Full serialized markup of the current DOM.
    fn markup(&self) -> Option<String>;

    /// Bound the page's own blocking reads by what is left of `budget`.
    /// Pages whose reads never block ignore it.
    fn limit_to(&self, _budget: &Budget) {}
}

/// Time allowance for one probing phase.
///
/// Probes check the budget before touching the page; once it runs out the
/// phase abstains instead of blocking the rest of the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct Budget {
    deadline: Instant,
}

impl Budget {
    pub fn new(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
        }
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}
