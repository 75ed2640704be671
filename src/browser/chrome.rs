use super::{Budget, PageElement, RenderedPage};
use crate::config::BrowserConfig;
use crate::extractor::ExtractError;
use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const LAUNCH_FLAGS: &[&str] = &[
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--disable-background-timer-throttling",
    "--disable-backgrounding-occluded-windows",
    "--disable-renderer-backgrounding",
    "--disable-features=TranslateUI",
    "--disable-ipc-flooding-protection",
];

const COMMON_CHROME_PATHS: &[&str] = &[
    "C:\\Program Files\\Google\\Chrome\\Application\\chrome.exe",
    "C:\\Program Files (x86)\\Google\\Chrome\\Application\\chrome.exe",
    "/usr/bin/google-chrome",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
];

/// The process-wide headless Chrome instance. Expensive to start, so one
/// session serves every extraction; each call gets its own tab.
pub struct BrowserSession {
    browser: Browser,
    user_agent: String,
}

impl BrowserSession {
    pub fn launch(config: &BrowserConfig) -> Result<Self, ExtractError> {
        let path = config.chrome_path.clone().or_else(find_chrome);
        match &path {
            Some(p) => info!("Launching Chrome from {}", p.display()),
            None => info!("Launching Chrome from default location"),
        }

        let args: Vec<&OsStr> = LAUNCH_FLAGS.iter().map(OsStr::new).collect();
        let options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(false)
            .window_size(Some((config.viewport_width, config.viewport_height)))
            .path(path)
            .proxy_server(config.proxy.as_deref())
            .idle_browser_timeout(Duration::from_secs(config.idle_timeout_secs))
            .args(args)
            .build()
            .map_err(|e| ExtractError::Browser(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(options)
            .map_err(|e| ExtractError::Browser(format!("Failed to launch browser: {}", e)))?;

        Ok(Self {
            browser,
            user_agent: config.user_agent.clone(),
        })
    }

    /// Open an isolated tab. The returned guard closes it when dropped.
    pub fn open_page(&self) -> Result<PageGuard, ExtractError> {
        let tab = self
            .browser
            .new_tab()
            .map_err(|e| ExtractError::Browser(format!("Failed to create new tab: {}", e)))?;

        if let Err(e) = tab.set_user_agent(&self.user_agent, Some("en-US,en"), None) {
            warn!("Failed to set user agent: {}", e);
        }

        Ok(PageGuard::new(ChromePage { tab }))
    }

    pub fn close(self) {
        info!("Shutting down browser session");
        drop(self.browser);
    }
}

fn find_chrome() -> Option<PathBuf> {
    COMMON_CHROME_PATHS
        .iter()
        .map(Path::new)
        .find(|p| p.exists())
        .map(Path::to_path_buf)
}

/// A live Chrome tab.
pub struct ChromePage {
    tab: Arc<Tab>,
}

impl ChromePage {
    pub fn navigate(&self, url: &str, timeout: Duration) -> Result<(), ExtractError> {
        self.tab.set_default_timeout(timeout);
        self.tab
            .navigate_to(url)
            .map_err(|e| ExtractError::Navigation(e.to_string()))?;
        Ok(())
    }

    /// Wait for the load event. A timeout is not an error; the caller
    /// proceeds with whatever has rendered so far.
    pub fn wait_for_load(&self, timeout: Duration) -> bool {
        self.tab.set_default_timeout(timeout);
        match self.tab.wait_until_navigated() {
            Ok(_) => true,
            Err(e) => {
                warn!("Page load timeout, proceeding anyway: {}", e);
                false
            }
        }
    }
}

impl RenderedPage for ChromePage {
    fn query_all(&self, selector: &str) -> Vec<Box<dyn PageElement + '_>> {
        match self.tab.find_elements(selector) {
            Ok(elements) => elements
                .into_iter()
                .map(|e| Box::new(ChromeElement(e)) as Box<dyn PageElement + '_>)
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    fn wait_for(&self, selector: &str, timeout: Duration) -> bool {
        self.tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .is_ok()
    }

    fn markup(&self) -> Option<String> {
        self.tab.get_content().ok()
    }

    fn limit_to(&self, budget: &Budget) {
        self.tab.set_default_timeout(budget.remaining());
    }
}

struct ChromeElement<'a>(Element<'a>);

impl PageElement for ChromeElement<'_> {
    fn attribute(&self, name: &str) -> Option<String> {
        self.0
            .get_attribute_value(name)
            .ok()
            .flatten()
            .filter(|v| !v.is_empty())
    }

    fn children(&self, selector: &str) -> Vec<Box<dyn PageElement + '_>> {
        match self.0.find_elements(selector) {
            Ok(elements) => elements
                .into_iter()
                .map(|e| Box::new(ChromeElement(e)) as Box<dyn PageElement + '_>)
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    fn eval_string(&self, function: &str) -> Option<String> {
        let object = self.0.call_js_fn(function, vec![], false).ok()?;
        object
            .value
            .and_then(|v| v.as_str().map(str::to_string))
            .filter(|v| !v.is_empty())
    }
}

/// Owns a tab for the duration of one extraction and closes it on every
/// exit path, including unwinding.
pub struct PageGuard {
    page: Option<ChromePage>,
}

impl PageGuard {
    fn new(page: ChromePage) -> Self {
        Self { page: Some(page) }
    }
}

impl Deref for PageGuard {
    type Target = ChromePage;

    fn deref(&self) -> &Self::Target {
        // Only `drop` takes the page out.
        self.page.as_ref().expect("page already released")
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        if let Some(page) = self.page.take() {
            match page.tab.close(true) {
                Ok(_) => debug!("Page closed"),
                Err(e) => warn!("Failed to close page: {}", e),
            }
        }
    }
}
