// src/storage/remote.rs
// Talks to the flashcard REST API: the same routes the web client uses.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::deck::source::RepositoryError;
use crate::deck::{Flashcard, FlashcardRepository, FlashcardStats, NewFlashcard};
use crate::review::{Confidence, ReviewError, ReviewSink};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server answered with status {status}")]
    Status { status: u16 },
}

impl From<ClientError> for RepositoryError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Http(e) => RepositoryError::Transport(e.to_string()),
            ClientError::Status { status } => RepositoryError::Status { status },
        }
    }
}

#[derive(Serialize)]
struct ReviewRequest {
    confidence: Confidence,
}

#[derive(Deserialize)]
struct AnalyticsResponse {
    #[serde(default)]
    flashcard_stats: FlashcardStats,
}

pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    http: Client,
}

impl ApiClient {
    /// `base_url` is the server root, e.g. `http://localhost:8080`.
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(ApiClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            http,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/api{}", self.base_url, path);
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn card_path(id: &str, suffix: &str) -> String {
        format!("/flashcards/{}{}", urlencoding::encode(id), suffix)
    }

    fn send(builder: RequestBuilder) -> Result<Response, ClientError> {
        let response = builder.send()?;
        if !response.status().is_success() {
            return Err(ClientError::Status { status: response.status().as_u16() });
        }
        Ok(response)
    }

    pub fn fetch_cards(&self, subject: Option<&str>) -> Result<Vec<Flashcard>, ClientError> {
        let mut builder = self.request(Method::GET, "/flashcards");
        if let Some(subject) = subject {
            builder = builder.query(&[("subject", subject)]);
        }
        Ok(Self::send(builder)?.json()?)
    }

    pub fn create_card(&self, card: &NewFlashcard) -> Result<Flashcard, ClientError> {
        let builder = self.request(Method::POST, "/flashcards").json(card);
        Ok(Self::send(builder)?.json()?)
    }

    pub fn delete_card(&self, id: &str) -> Result<bool, ClientError> {
        match Self::send(self.request(Method::DELETE, &Self::card_path(id, ""))) {
            Ok(_) => Ok(true),
            Err(ClientError::Status { status: 404 }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub fn analytics(&self) -> Result<FlashcardStats, ClientError> {
        let response: AnalyticsResponse = Self::send(self.request(Method::GET, "/study/analytics"))?.json()?;
        Ok(response.flashcard_stats)
    }
}

impl FlashcardRepository for ApiClient {
    fn list(&self, subject: Option<&str>) -> Result<Vec<Flashcard>, RepositoryError> {
        Ok(self.fetch_cards(subject)?)
    }

    fn create(&self, card: NewFlashcard) -> Result<Flashcard, RepositoryError> {
        let card = card.validate()?;
        Ok(self.create_card(&card)?)
    }

    fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        Ok(self.delete_card(id)?)
    }

    fn stats(&self) -> Result<FlashcardStats, RepositoryError> {
        Ok(self.analytics()?)
    }
}

impl ReviewSink for ApiClient {
    fn submit_review(&self, card_id: &str, confidence: Confidence) -> Result<(), ReviewError> {
        let builder = self
            .request(Method::POST, &Self::card_path(card_id, "/review"))
            .json(&ReviewRequest { confidence });
        let response = builder.send().map_err(|e| ReviewError::Transport(e.to_string()))?;
        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(ReviewError::CardNotFound(card_id.to_string())),
            s => Err(ReviewError::Rejected { status: s.as_u16() }),
        }
    }
}
