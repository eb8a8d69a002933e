pub mod collector;
pub mod enricher;
pub mod extractor;
pub mod finalizer;
pub mod merger;
pub mod progress;
pub mod relevance;
pub mod sitemap;
pub mod state;
pub mod stats;
