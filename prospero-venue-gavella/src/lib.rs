//! Venue adapter for Gradsko dramsko kazalište Gavella.
//!
//! Gavella publishes full dates including the year, so no year inference is needed.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use scraper::Html;

use prospero_core::{
    html,
    model::{ScheduleEntry, VenueId, VenueMeta, Venues},
    plugin::VenuePlugin,
    ports::{FetchError, RawDocument, SourceAdapter},
};

const SCHEDULE_URL: &str = "https://www.gavella.hr/raspored-izvedbi/";
const DATETIME_FORMAT: &str = "%d.%m.%Y. %H:%M";

// Stage names that only make sense together with the theater name.
const HOUSE_STAGES: [&str; 2] = ["velika scena", "mala gavella"];

/// Schedule adapter for Gavella.
pub struct GavellaAdapter {
    client: Client,
    meta: VenueMeta,
}

impl GavellaAdapter {
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
impl SourceAdapter for GavellaAdapter {
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
        parse_schedule(&document.body)
    }
}

/// Build the plugin bundle for Gavella.
#[must_use]
pub fn plugin(client: Client) -> VenuePlugin {
    VenuePlugin {
        meta: venue_meta(),
        adapter: Arc::new(GavellaAdapter::new(client)),
    }
}

fn venue_meta() -> VenueMeta {
    VenueMeta {
        id: VenueId::from(Venues::Gavella),
        name: String::from("Gavella"),
    }
}

fn parse_schedule(body: &str) -> Result<Vec<ScheduleEntry>, FetchError> {
    let document = Html::parse_document(body);

    let table_sel = html::selector("table.table")?;
    let row_sel = html::selector("tbody tr")?;
    let date_sel = html::selector("div.date")?;
    let time_sel = html::selector("div.time")?;
    let note_sel = html::selector("div.playcomment")?;
    let place_sel = html::selector("div.place")?;
    let title_sel = html::selector("a")?;
    let buy_sel = html::selector("a.btn.btn-small.btn-primary")?;

    let table = document
        .select(&table_sel)
        .next()
        .ok_or(FetchError::MissingElement("schedule table"))?;

    let mut entries = Vec::new();

    // First body row repeats the column headings.
    for row in table.select(&row_sel).skip(1) {
        let date_text = html::text_of(html::require(row, &date_sel, "date")?);
        let time_text = html::text_of(html::require(row, &time_sel, "time")?);

        // "čet, 21.03.2024." -> "21.03.2024."
        let date_only = date_text
            .split_once(',')
            .map_or(date_text.as_str(), |(_weekday, date)| date)
            .trim();

        let start_datetime =
            NaiveDateTime::parse_from_str(&format!("{date_only} {time_text}"), DATETIME_FORMAT)?;

        let title = html::text_of(html::require(row, &title_sel, "title")?);
        let location = stage_name(&html::text_of(html::require(row, &place_sel, "place")?));

        entries.push(ScheduleEntry {
            start_datetime,
            title,
            note: html::optional_text(row, &note_sel),
            location,
            duration: None,
            includes_break: false,
            buy_tickets_url: html::first(row, &buy_sel).and_then(|link| html::attr(link, "href")),
        });
    }

    tracing::debug!(count = entries.len(), "parsed gavella schedule");
    Ok(entries)
}

fn stage_name(place: &str) -> String {
    if HOUSE_STAGES.contains(&place.to_lowercase().as_str()) {
        format!("Gavella ({place})")
    } else {
        place.to_owned()
    }
}
