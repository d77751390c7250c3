//! Traits describing venue and notification capabilities and shared helper types.

use async_trait::async_trait;
use chrono::{Local, NaiveDate, ParseError as ChronoParseError};
use reqwest::{Client, Error as ReqwestError, RequestBuilder, StatusCode};

use crate::model::{ScheduleEntry, VenueMeta};

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while fetching or reading a venue schedule.
pub enum FetchError {
    /// Network layer failed or the venue answered with a non-success status.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// Failed to parse a date or time from the venue markup.
    #[error("Parse error: {0}")]
    Parse(#[from] ChronoParseError),
    /// An element the venue layout relies on is absent.
    #[error("Missing element: {0}")]
    MissingElement(&'static str),
    /// A CSS selector could not be compiled.
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),
    /// Text that should hold a date does not describe a calendar day.
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    /// A localized month name is not in the venue's lookup table.
    #[error("Unknown month: {0}")]
    UnknownMonth(String),
}

#[derive(thiserror::Error, Debug)]
/// Errors raised while delivering a notification.
pub enum NotifyError {
    /// The request could not be sent.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// The endpoint answered with a non-success status.
    #[error("Endpoint {endpoint} rejected the message with status {status}")]
    Rejected {
        /// Endpoint identifier (chat id, webhook name, ...).
        endpoint: String,
        /// HTTP status returned by the endpoint.
        status: StatusCode,
    },
}

#[derive(Debug, Clone)]
/// Raw venue response ready for extraction.
pub struct RawDocument {
    /// URL the document was requested from.
    pub url: String,
    /// Response body, usually HTML.
    pub body: String,
    /// Local date at fetch time; reference point for dates published without a year.
    pub fetched_on: NaiveDate,
}

impl RawDocument {
    /// Wrap an already loaded body, stamping it with the given fetch date.
    #[must_use]
    pub fn new<U: Into<String>, B: Into<String>>(url: U, body: B, fetched_on: NaiveDate) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
            fetched_on,
        }
    }
}

#[async_trait]
/// Trait for venue-specific schedule sources.
pub trait SourceAdapter: Send + Sync {
    /// Metadata describing the venue handled by this adapter.
    fn venue(&self) -> &VenueMeta;

    /// Address of the published schedule.
    fn schedule_url(&self) -> &str;

    /// HTTP client used for fetching.
    fn client(&self) -> &Client;

    /// Download the schedule document. Defaults to a plain GET of [`Self::schedule_url`].
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Network`] on transport failure or a non-success status.
    async fn fetch_raw_schedule(&self) -> Result<RawDocument, FetchError> {
        fetch_document(self.client().get(self.schedule_url())).await
    }

    /// Turn a fetched document into normalized schedule entries.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] when the markup does not have the expected layout.
    fn extract_entries(&self, document: &RawDocument) -> Result<Vec<ScheduleEntry>, FetchError>;

    /// Fetch and extract, swallowing any failure.
    ///
    /// A broken or unreachable venue yields no entries instead of aborting
    /// the whole poll cycle.
    async fn try_extract_entries(&self) -> Vec<ScheduleEntry> {
        let venue = &self.venue().id;

        let outcome = match self.fetch_raw_schedule().await {
            Ok(document) => self.extract_entries(&document),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(entries) => {
                tracing::debug!(%venue, count = entries.len(), "extracted schedule entries");
                entries
            }
            Err(err) => {
                tracing::warn!(%venue, error = %err, "skipping venue for this cycle");
                Vec::new()
            }
        }
    }
}

#[async_trait]
/// Trait for best-effort message delivery.
pub trait Notifier: Send + Sync {
    /// Deliver a formatted message to every configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns a [`NotifyError`] when at least one endpoint did not accept the message.
    async fn notify(&self, body: &str) -> Result<(), NotifyError>;
}

/// Send a prepared request and read the response as a [`RawDocument`].
///
/// # Errors
///
/// Returns [`FetchError::Network`] when the request fails or the status is not a success.
pub async fn fetch_document(req: RequestBuilder) -> Result<RawDocument, FetchError> {
    let response = req
        .send()
        .await
        .map_err(FetchError::from)?
        .error_for_status()
        .map_err(FetchError::from)?;

    let url = response.url().to_string();
    let body = response.text().await.map_err(FetchError::from)?;

    Ok(RawDocument {
        url,
        body,
        fetched_on: Local::now().date_naive(),
    })
}
