//! Venue adapter for Gradsko kazalište Komedija.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use reqwest::Client;
use scraper::Html;

use prospero_core::{
    calendar, html,
    model::{ScheduleEntry, VenueId, VenueMeta, Venues},
    plugin::VenuePlugin,
    ports::{FetchError, RawDocument, SourceAdapter, fetch_document},
};

// The public schedule page is filled by this WordPress AJAX endpoint.
const SCHEDULE_URL: &str = "https://www.komedija.hr/www/wp-admin/admin-ajax.php";
const SEARCH_FORM: [(&str, &str); 2] = [("limit", "10000"), ("action", "search_events")];
const DEFAULT_LOCATION: &str = "Komedija";
const MINUTES_PER_DAY: i64 = 24 * 60;

/// Schedule adapter for Komedija.
pub struct KomedijaAdapter {
    client: Client,
    meta: VenueMeta,
}

impl KomedijaAdapter {
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
impl SourceAdapter for KomedijaAdapter {
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

/// Build the plugin bundle for Komedija.
#[must_use]
pub fn plugin(client: Client) -> VenuePlugin {
    VenuePlugin {
        meta: venue_meta(),
        adapter: Arc::new(KomedijaAdapter::new(client)),
    }
}

fn venue_meta() -> VenueMeta {
    VenueMeta {
        id: VenueId::from(Venues::Komedija),
        name: String::from("Komedija"),
    }
}

fn parse_schedule(body: &str, today: NaiveDate) -> Result<Vec<ScheduleEntry>, FetchError> {
    let document = Html::parse_document(body);

    let table_sel = html::selector("table")?;
    let row_sel = html::selector("tbody tr")?;
    let cell_sel = html::selector("td")?;
    let link_sel = html::selector("a")?;
    let stage_sel = html::selector("img")?;

    let table = document
        .select(&table_sel)
        .next()
        .ok_or(FetchError::MissingElement("schedule table"))?;

    let mut entries = Vec::new();

    for row in table.select(&row_sel) {
        let mut cells = row.select(&cell_sel);
        let (Some(when_cell), Some(play_cell), Some(note_cell), Some(tickets_cell)) =
            (cells.next(), cells.next(), cells.next(), cells.next())
        else {
            return Err(FetchError::MissingElement("schedule row cells"));
        };

        // "21.3., četvrtak" followed by "19:30 - 21:45"
        let mut when = html::stripped_strings(when_cell).into_iter();
        let date_text = when.next().ok_or(FetchError::MissingElement("date"))?;
        let times_text = when.next().ok_or(FetchError::MissingElement("time range"))?;

        let date_only = date_text
            .split_once(',')
            .map_or(date_text.as_str(), |(date, _weekday)| date);
        let (start_text, end_text) = times_text
            .split_once('-')
            .ok_or(FetchError::MissingElement("end time"))?;

        let (day, month) = calendar::parse_day_month(date_only)?;
        let start_time = calendar::parse_clock(start_text)?;
        let end_time = calendar::parse_clock(end_text)?;
        let start_datetime = calendar::resolve_partial_date(day, month, start_time, today)?;

        let location = html::first(play_cell, &stage_sel)
            .and_then(|stage| html::attr(stage, "alt"))
            .unwrap_or_else(|| DEFAULT_LOCATION.to_owned());
        let note = Some(html::text_of(note_cell)).filter(|note| !note.is_empty());

        entries.push(ScheduleEntry {
            start_datetime,
            title: html::text_of(html::require(play_cell, &link_sel, "title link")?),
            note,
            location,
            duration: Some(minutes_between(start_time, end_time)),
            includes_break: false,
            buy_tickets_url: html::first(tickets_cell, &link_sel)
                .and_then(|link| html::attr(link, "href")),
        });
    }

    tracing::debug!(count = entries.len(), "parsed komedija schedule");
    Ok(entries)
}

/// Minutes from `start` to `end`, wrapping past midnight.
fn minutes_between(start: NaiveTime, end: NaiveTime) -> u32 {
    let minutes = (end - start).num_minutes().rem_euclid(MINUTES_PER_DAY);
    u32::try_from(minutes).unwrap_or_default()
}
