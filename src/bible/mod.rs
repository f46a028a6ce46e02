mod fetcher;

pub use fetcher::{BibleFetcher, VERSIONS};
