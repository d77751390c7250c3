//! Venue adapter for Teatar Exit.
//!
//! Dates are printed as a day number followed by a Croatian month name, without a year.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use scraper::Html;

use prospero_core::{
    calendar, html,
    model::{ScheduleEntry, VenueId, VenueMeta, Venues},
    plugin::VenuePlugin,
    ports::{FetchError, RawDocument, SourceAdapter},
};

const SCHEDULE_URL: &str = "https://teatarexit.hr/raspored-predstava/raspored-sve-nadolazece/";

const MONTH_PREFIXES: [(&str, u32); 12] = [
    ("sij", 1),
    ("vel", 2),
    ("ozu", 3),
    ("tra", 4),
    ("svi", 5),
    ("lip", 6),
    ("srp", 7),
    ("kol", 8),
    ("ruj", 9),
    ("lis", 10),
    ("stu", 11),
    ("pro", 12),
];

/// Schedule adapter for Teatar Exit.
pub struct TeatarExitAdapter {
    client: Client,
    meta: VenueMeta,
}

impl TeatarExitAdapter {
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
impl SourceAdapter for TeatarExitAdapter {
    fn venue(&self) -> &VenueMeta {
        &self.meta
    }

    fn schedule_url(&self) -> &str {
        SCHEDULE_URL
    }

    fn client(&self) -> &Client {
        &self.client
    }

    fn extract_entries(&self, document: &RawDocument) -> Result<Vec<ScheduleEntry>, FetchError> {
        parse_schedule(&document.body, document.fetched_on)
    }
}

/// Build the plugin bundle for Teatar Exit.
#[must_use]
pub fn plugin(client: Client) -> VenuePlugin {
    VenuePlugin {
        meta: venue_meta(),
        adapter: Arc::new(TeatarExitAdapter::new(client)),
    }
}

fn venue_meta() -> VenueMeta {
    VenueMeta {
        id: VenueId::from(Venues::TeatarExit),
        name: String::from("Teatar Exit"),
    }
}

/// Map a Croatian month name (full, abbreviated or without diacritics) to its number.
fn month_number(name: &str) -> Result<u32, FetchError> {
    let prefix: String = name
        .trim()
        .to_lowercase()
        .replace('ž', "z")
        .chars()
        .take(3)
        .collect();

    MONTH_PREFIXES
        .iter()
        .find(|(known, _)| *known == prefix)
        .map(|&(_, number)| number)
        .ok_or_else(|| FetchError::UnknownMonth(name.trim().to_owned()))
}

fn parse_schedule(body: &str, today: NaiveDate) -> Result<Vec<ScheduleEntry>, FetchError> {
    let document = Html::parse_document(body);

    let post_sel = html::selector("div.event-post")?;
    let date_sel = html::selector("div.date")?;
    let span_sel = html::selector("span")?;
    let main_sel = html::selector("div.event-data div.schedule_main")?;
    let title_sel = html::selector("a")?;
    let clock_sel = html::selector("div.clock")?;
    let location_sel = html::selector("div.location")?;
    let fee_sel = html::selector("div.fee")?;
    let buy_sel = html::selector("div.event-data div.bw-buttons a.botton.upcoming")?;

    let mut entries = Vec::new();

    for post in document.select(&post_sel) {
        let date_block = html::require(post, &date_sel, "date")?;
        let mut spans = date_block.select(&span_sel);
        // weekday, "21.", "ožujka"
        let (Some(_weekday), Some(day_span), Some(month_span)) =
            (spans.next(), spans.next(), spans.next())
        else {
            return Err(FetchError::MissingElement("date parts"));
        };

        let day_text = html::text_of(day_span);
        let day = day_text
            .trim_matches('.')
            .parse::<u32>()
            .ok()
            .ok_or_else(|| FetchError::InvalidDate(day_text.clone()))?;
        let month = month_number(&html::text_of(month_span))?;

        let main = html::require(post, &main_sel, "event details")?;
        let clock = html::require(main, &clock_sel, "start time")?;
        let start_time = calendar::parse_clock(&html::text_of(clock))?;

        entries.push(ScheduleEntry {
            start_datetime: calendar::resolve_partial_date(day, month, start_time, today)?,
            title: html::text_of(html::require(main, &title_sel, "title")?),
            note: html::optional_text(main, &fee_sel),
            location: html::text_of(html::require(main, &location_sel, "location")?),
            duration: None,
            includes_break: false,
            buy_tickets_url: html::first(post, &buy_sel).and_then(|link| html::attr(link, "href")),
        });
    }

    tracing::debug!(count = entries.len(), "parsed teatar exit schedule");
    Ok(entries)
}
