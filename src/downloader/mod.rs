mod proxy;

pub use proxy::{content_disposition, MediaProxy, ProxiedMedia, ProxyError};
