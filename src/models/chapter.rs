use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verse {
    pub book: String,
    pub chapter: u32,
    pub verse: u32,
    pub text: String,
}

/// One chapter of Bible text as returned by the text API. An empty verse
/// list is a valid result (no data for this chapter), not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BibleChapter {
    pub book: String,
    pub chapter: u32,
    pub version: String,
    pub verses: Vec<Verse>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStatus {
    #[default]
    NotLoaded,
    Loading,
    Loaded,
    Failed,
    NoBackend,
}
