//! Venue adapter for Satiričko kazalište Kerempuh.
//!
//! The schedule page only renders events in response to a search form post,
//! and dates come without a year.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use scraper::Html;

use prospero_core::{
    calendar, html,
    model::{ScheduleEntry, VenueId, VenueMeta, Venues},
    plugin::VenuePlugin,
    ports::{FetchError, RawDocument, SourceAdapter, fetch_document},
};

const SCHEDULE_URL: &str = "https://kazalistekerempuh.hr/raspored-predstava/";
const SEARCH_FORM: [(&str, &str); 2] = [("limit", "10000"), ("action", "search_events")];
const LOCATION: &str = "Kerempuh";

/// Schedule adapter for Kerempuh.
pub struct KerempuhAdapter {
    client: Client,
    meta: VenueMeta,
}

impl KerempuhAdapter {
    /// Create a new adapter bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            meta: venue_meta(),
        }
    }
}

#[async_trait]
impl SourceAdapter for KerempuhAdapter {
    fn venue(&self) -> &VenueMeta {
        &self.meta
    }

    fn schedule_url(&self) -> &str {
        SCHEDULE_URL
    }

    fn client(&self) -> &Client {
        &self.client
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn fetch_raw_schedule(&self) -> Result<RawDocument, FetchError> {
        fetch_document(self.client.post(SCHEDULE_URL).form(&SEARCH_FORM)).await
    }

    fn extract_entries(&self, document: &RawDocument) -> Result<Vec<ScheduleEntry>, FetchError> {
        parse_schedule(&document.body, document.fetched_on)
    }
}

/// Build the plugin bundle for Kerempuh.
#[must_use]
pub fn plugin(client: Client) -> VenuePlugin {
    VenuePlugin {
        meta: venue_meta(),
        adapter: Arc::new(KerempuhAdapter::new(client)),
    }
}

fn venue_meta() -> VenueMeta {
    VenueMeta {
        id: VenueId::from(Venues::Kerempuh),
        name: String::from("Kerempuh"),
    }
}

fn parse_schedule(body: &str, today: NaiveDate) -> Result<Vec<ScheduleEntry>, FetchError> {
    let document = Html::parse_document(body);

    let row_sel = html::selector("div.timetable-rows.col.span_12")?;
    let date_sel = html::selector("div.event-date b")?;
    let time_sel = html::selector("div.event-time span")?;
    let title_block_sel = html::selector("div.event-title div")?;
    let link_sel = html::selector("a")?;
    let note_sel = html::selector("div")?;
    let running_time_sel = html::selector("div.event-location span")?;
    let buy_sel = html::selector("div.event-buy-ticket a")?;

    let mut entries = Vec::new();

    for row in document.select(&row_sel) {
        let date_text = html::text_of(html::require(row, &date_sel, "event date")?);
        let time_text = html::text_of(html::require(row, &time_sel, "event time")?);
        let title_block = html::require(row, &title_block_sel, "event title")?;
        let running_time = html::text_of(html::require(row, &running_time_sel, "running time")?);

        let (day, month) = calendar::parse_day_month(&date_text)?;
        let start_datetime =
            calendar::resolve_partial_date(day, month, calendar::parse_clock(&time_text)?, today)?;
        let (duration, includes_break) = parse_running_time(&running_time);

        entries.push(ScheduleEntry {
            start_datetime,
            title: html::text_of(html::require(title_block, &link_sel, "title link")?),
            note: html::optional_text(title_block, &note_sel),
            location: LOCATION.to_owned(),
            duration,
            includes_break,
            buy_tickets_url: html::first(row, &buy_sel).and_then(|link| html::attr(link, "href")),
        });
    }

    tracing::debug!(count = entries.len(), "parsed kerempuh schedule");
    Ok(entries)
}

/// Read `"90 min, s pauzom"`-style text into minutes and an intermission flag.
fn parse_running_time(text: &str) -> (Option<u32>, bool) {
    let words: Vec<String> = text
        .split_whitespace()
        .map(|word| word.trim_matches(|ch: char| ch == ',' || ch == '.').to_lowercase())
        .collect();

    let duration = words.first().and_then(|word| word.parse::<u32>().ok());
    let includes_break = words.last().is_some_and(|word| word.contains("pauz"))
        && !words.iter().any(|word| word == "bez");

    (duration, includes_break)
}
