pub mod config;
pub mod error;
pub mod file_config;
pub mod types;

pub use config::{
    Config, CrawlConfig, FetchPolicy, RelevanceMode, RelevanceModes, SitePolicy, SitemapPolicy,
};
pub use error::BylineError;
pub use file_config::{load_config, FileConfig};
pub use types::*;
