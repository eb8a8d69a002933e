pub mod fetch;
pub mod html;
pub mod links;
pub mod page_source;
pub mod util;

pub use fetch::Fetcher;
pub use page_source::{BrowserlessPageSource, HttpPageSource};
