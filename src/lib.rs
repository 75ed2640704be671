pub mod browser;
pub mod config;
pub mod downloader;
pub mod extractor;
pub mod server;

pub use config::{get_config, Config};
pub use extractor::{ExtractError, ExtractionResult, Extractor, MediaExtractor, MediaType, Pipeline};
