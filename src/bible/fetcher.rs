use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{BibleChapter, Verse};

#[derive(Debug, Clone, Copy)]
pub struct BibleVersion {
    pub id: &'static str,
    pub name: &'static str,
}

pub const VERSIONS: &[BibleVersion] = &[
    BibleVersion { id: "kjv", name: "King James Version" },
    BibleVersion { id: "nkjv", name: "New King James Version" },
    BibleVersion { id: "niv", name: "New International Version" },
];

/// Proxy response: either the chapter payload or an inline error field.
/// An empty verse list with no error is a valid "no data" result.
#[derive(Debug, Deserialize)]
struct ChapterResponse {
    error: Option<String>,
    book: Option<String>,
    chapter: Option<u32>,
    version: Option<String>,
    #[serde(default)]
    verses: Vec<Verse>,
}

/// Read-only client for the hosted Bible-text proxy function.
#[derive(Clone)]
pub struct BibleFetcher {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl BibleFetcher {
    pub fn new(base_url: Url, api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("verse-tracker/1.0")
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            base_url,
            api_key,
        }
    }

    pub async fn fetch_chapter(
        &self,
        book: &str,
        chapter: u32,
        version: &str,
    ) -> Result<BibleChapter> {
        let url = format!("{}functions/v1/bible-api", self.base_url);
        let response = self
            .client
            .get(url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(&[
                ("book", book.to_lowercase()),
                ("chapter", chapter.to_string()),
                ("version", version.to_lowercase()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Api(format!("HTTP {status}: {body}")));
        }

        let parsed: ChapterResponse = response.json().await?;
        if let Some(error) = parsed.error {
            return Err(AppError::Api(error));
        }

        Ok(BibleChapter {
            book: parsed.book.unwrap_or_else(|| book.to_string()),
            chapter: parsed.chapter.unwrap_or(chapter),
            version: parsed
                .version
                .unwrap_or_else(|| version.to_uppercase()),
            verses: parsed.verses,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_verses_without_error_is_a_valid_chapter() {
        let parsed: ChapterResponse =
            serde_json::from_str(r#"{"book":"Obadiah","chapter":1,"version":"KJV","verses":[]}"#)
                .unwrap();
        assert!(parsed.error.is_none());
        assert!(parsed.verses.is_empty());
    }

    #[test]
    fn inline_error_field_is_detected() {
        let parsed: ChapterResponse =
            serde_json::from_str(r#"{"error":"Book and chapter parameters required"}"#).unwrap();
        assert_eq!(
            parsed.error.as_deref(),
            Some("Book and chapter parameters required")
        );
    }

    #[test]
    fn version_catalog_has_known_ids() {
        assert!(VERSIONS.iter().any(|v| v.id == "kjv"));
        assert_eq!(VERSIONS.len(), 3);
    }
}
