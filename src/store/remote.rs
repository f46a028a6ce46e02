use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Journal, JournalEntry, ReadingProgress, StreakState};
use crate::session::Session;

use super::UserStore;

#[derive(Debug, Serialize)]
struct ProgressRow<'a> {
    user_id: &'a str,
    book_name: &'a str,
    chapter_number: u32,
}

#[derive(Debug, Deserialize)]
struct ProgressRowOut {
    book_name: String,
    chapter_number: u32,
}

#[derive(Debug, Serialize)]
struct StreakRow<'a> {
    user_id: &'a str,
    current_streak: u32,
    last_read_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct StreakRowOut {
    current_streak: u32,
    last_read_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
struct JournalRow<'a> {
    user_id: &'a str,
    entry_date: NaiveDate,
    title: Option<&'a str>,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct JournalRowOut {
    entry_date: NaiveDate,
    title: Option<String>,
    content: String,
}

#[derive(Debug, Serialize)]
struct PasswordCredentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: AuthUser,
}

#[derive(Debug, Deserialize)]
pub struct AuthUser {
    pub id: String,
}

/// Client for the hosted backend: PostgREST rows for user data, GoTrue
/// password auth. Row-level ownership is enforced server-side; every data
/// request carries the project api key plus the user's bearer token.
pub struct RemoteStore {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl RemoteStore {
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

    fn rest_url(&self, table: &str) -> String {
        format!("{}rest/v1/{table}", self.base_url)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}auth/v1/{path}", self.base_url)
    }

    fn authed(&self, builder: RequestBuilder, session: &Session) -> Result<RequestBuilder> {
        let token = session
            .access_token()
            .ok_or_else(|| AppError::Auth("not signed in".to_string()))?;
        Ok(builder
            .header("apikey", &self.api_key)
            .bearer_auth(token))
    }

    fn user_id<'a>(&self, session: &'a Session) -> Result<&'a str> {
        session
            .user_id()
            .ok_or_else(|| AppError::Auth("not signed in".to_string()))
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(AppError::Api(format!("HTTP {status}: {body}")))
    }

    async fn sign_in_or_up(&self, url: String, email: &str, password: &str) -> Result<AuthResponse> {
        let response = self
            .client
            .post(url)
            .header("apikey", &self.api_key)
            .json(&PasswordCredentials { email, password })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Auth(format!("HTTP {status}: {body}")));
        }
        Ok(response.json().await?)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let url = format!("{}?grant_type=password", self.auth_url("token"));
        self.sign_in_or_up(url, email, password).await
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthResponse> {
        self.sign_in_or_up(self.auth_url("signup"), email, password)
            .await
    }
}

#[async_trait]
impl UserStore for RemoteStore {
    async fn load_progress(&self, session: &Session) -> Result<ReadingProgress> {
        let user_id = self.user_id(session)?;
        let request = self
            .client
            .get(self.rest_url("reading_progress"))
            .query(&[
                ("select", "book_name,chapter_number"),
                ("user_id", &format!("eq.{user_id}")),
            ]);
        let response = Self::check(self.authed(request, session)?.send().await?).await?;
        let rows: Vec<ProgressRowOut> = response.json().await?;
        Ok(ReadingProgress::from_rows(
            rows.into_iter().map(|r| (r.book_name, r.chapter_number)),
        ))
    }

    async fn insert_chapter(&self, session: &Session, book: &str, chapter: u32) -> Result<()> {
        let user_id = self.user_id(session)?;
        let request = self
            .client
            .post(self.rest_url("reading_progress"))
            .json(&ProgressRow {
                user_id,
                book_name: book,
                chapter_number: chapter,
            });
        Self::check(self.authed(request, session)?.send().await?).await?;
        Ok(())
    }

    async fn remove_chapter(&self, session: &Session, book: &str, chapter: u32) -> Result<()> {
        let user_id = self.user_id(session)?;
        let request = self
            .client
            .delete(self.rest_url("reading_progress"))
            .query(&[
                ("user_id", format!("eq.{user_id}")),
                ("book_name", format!("eq.{book}")),
                ("chapter_number", format!("eq.{chapter}")),
            ]);
        Self::check(self.authed(request, session)?.send().await?).await?;
        Ok(())
    }

    async fn load_streak(&self, session: &Session) -> Result<StreakState> {
        let user_id = self.user_id(session)?;
        let request = self
            .client
            .get(self.rest_url("user_streaks"))
            .query(&[
                ("select", "current_streak,last_read_date"),
                ("user_id", &format!("eq.{user_id}")),
            ]);
        let response = Self::check(self.authed(request, session)?.send().await?).await?;
        let rows: Vec<StreakRowOut> = response.json().await?;
        // No row yet is a valid fresh state, not an error.
        Ok(rows
            .into_iter()
            .next()
            .map(|r| StreakState::new(r.current_streak, r.last_read_date))
            .unwrap_or_default())
    }

    async fn save_streak(&self, session: &Session, state: StreakState) -> Result<()> {
        let user_id = self.user_id(session)?;
        // Upsert: counter and date travel in one row, so a partial update
        // cannot happen.
        let request = self
            .client
            .post(self.rest_url("user_streaks"))
            .header("Prefer", "resolution=merge-duplicates")
            .query(&[("on_conflict", "user_id")])
            .json(&StreakRow {
                user_id,
                current_streak: state.current,
                last_read_date: state.last_read,
            });
        Self::check(self.authed(request, session)?.send().await?).await?;
        Ok(())
    }

    async fn load_journal(&self, session: &Session) -> Result<Journal> {
        let user_id = self.user_id(session)?;
        let request = self
            .client
            .get(self.rest_url("journal_entries"))
            .query(&[
                ("select", "entry_date,title,content"),
                ("user_id", &format!("eq.{user_id}")),
            ]);
        let response = Self::check(self.authed(request, session)?.send().await?).await?;
        let rows: Vec<JournalRowOut> = response.json().await?;
        let mut journal = Journal::new();
        for row in rows {
            journal.upsert(
                row.entry_date,
                JournalEntry {
                    title: row.title,
                    content: row.content,
                },
            );
        }
        Ok(journal)
    }

    async fn save_journal_entry(
        &self,
        session: &Session,
        date: NaiveDate,
        entry: &JournalEntry,
    ) -> Result<()> {
        let user_id = self.user_id(session)?;
        let request = self
            .client
            .post(self.rest_url("journal_entries"))
            .header("Prefer", "resolution=merge-duplicates")
            .query(&[("on_conflict", "user_id,entry_date")])
            .json(&JournalRow {
                user_id,
                entry_date: date,
                title: entry.title.as_deref(),
                content: &entry.content,
            });
        Self::check(self.authed(request, session)?.send().await?).await?;
        Ok(())
    }

    async fn delete_journal_entry(&self, session: &Session, date: NaiveDate) -> Result<()> {
        let user_id = self.user_id(session)?;
        let request = self
            .client
            .delete(self.rest_url("journal_entries"))
            .query(&[
                ("user_id", format!("eq.{user_id}")),
                ("entry_date", format!("eq.{date}")),
            ]);
        Self::check(self.authed(request, session)?.send().await?).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_calls_require_a_signed_in_session() {
        let store = RemoteStore::new(
            Url::parse("https://example.supabase.co/").unwrap(),
            "anon-key".to_string(),
        );
        let session = Session::guest();
        let err = tokio_test::block_on(store.load_progress(&session)).unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
    }

    #[test]
    fn rest_urls_join_cleanly() {
        let store = RemoteStore::new(
            Url::parse("https://example.supabase.co/").unwrap(),
            "anon-key".to_string(),
        );
        assert_eq!(
            store.rest_url("reading_progress"),
            "https://example.supabase.co/rest/v1/reading_progress"
        );
        assert_eq!(
            store.auth_url("signup"),
            "https://example.supabase.co/auth/v1/signup"
        );
    }
}
