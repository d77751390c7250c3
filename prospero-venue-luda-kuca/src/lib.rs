//! Venue adapter for Kazalište Luda kuća.

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

const SCHEDULE_URL: &str = "https://www.ludakuca.hr/raspored/";
const LOCATION: &str = "Luda Kuća";

/// Schedule adapter for Luda kuća.
pub struct LudaKucaAdapter {
    client: Client,
    meta: VenueMeta,
}

impl LudaKucaAdapter {
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
impl SourceAdapter for LudaKucaAdapter {
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

/// Build the plugin bundle for Luda kuća.
#[must_use]
pub fn plugin(client: Client) -> VenuePlugin {
    VenuePlugin {
        meta: venue_meta(),
        adapter: Arc::new(LudaKucaAdapter::new(client)),
    }
}

fn venue_meta() -> VenueMeta {
    VenueMeta {
        id: VenueId::from(Venues::LudaKuca),
        name: String::from("Luda kuća"),
    }
}

fn parse_schedule(body: &str, today: NaiveDate) -> Result<Vec<ScheduleEntry>, FetchError> {
    let document = Html::parse_document(body);

    let card_sel = html::selector("div.kd-photobox")?;
    let content_sel = html::selector("div.phb-content")?;
    let date_sel = html::selector("h5")?;
    let headline_sel = html::selector("p")?;
    let link_sel = html::selector("a")?;

    let mut entries = Vec::new();

    for card in document.select(&card_sel) {
        let content = html::require(card, &content_sel, "card content")?;

        // "21.3. četvrtak"
        let date_text = html::text_of(html::require(content, &date_sel, "date")?);
        let date_only = date_text
            .split_whitespace()
            .next()
            .ok_or(FetchError::MissingElement("date"))?;

        // "Ivanov 20:00"
        let headline = html::text_of(html::require(content, &headline_sel, "title and time")?);
        let (title, time_text) = headline
            .rsplit_once(' ')
            .ok_or(FetchError::MissingElement("start time"))?;

        let (day, month) = calendar::parse_day_month(date_only)?;
        let start_datetime =
            calendar::resolve_partial_date(day, month, calendar::parse_clock(time_text)?, today)?;

        entries.push(ScheduleEntry {
            start_datetime,
            title: title.trim().to_owned(),
            note: None,
            location: LOCATION.to_owned(),
            duration: None,
            includes_break: false,
            buy_tickets_url: html::first(content, &link_sel).and_then(|link| html::attr(link, "href")),
        });
    }

    tracing::debug!(count = entries.len(), "parsed luda kuca schedule");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use super::*;

    const FIXTURE: &str = r#"
        <div class="kd-photobox">
          <img src="/wp-content/uploads/ivanov.jpg">
          <div class="phb-content">
            <h5>21.3. četvrtak</h5>
            <p>Ivanov 20:00</p>
            <a href="https://www.entrio.hr/event/ivanov">Kupi ulaznicu</a>
          </div>
        </div>
        <div class="kd-photobox">
          <div class="phb-content">
            <h5>14.3. četvrtak</h5>
            <p>Tko se boji Virginije Woolf 19:30</p>
          </div>
        </div>
    "#;

    fn datetime(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, minute, 0))
            .expect("valid test datetime")
    }

    #[test]
    fn splits_title_from_trailing_time() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date");
        let entries = parse_schedule(FIXTURE, today).expect("fixture parses");

        let mut ivanov = ScheduleEntry::new(datetime(2024, 3, 21, 20, 0), "Ivanov", "Luda Kuća");
        ivanov.buy_tickets_url = Some("https://www.entrio.hr/event/ivanov".to_owned());

        assert_eq!(
            entries,
            vec![
                ivanov,
                ScheduleEntry::new(
                    datetime(2025, 3, 14, 19, 30),
                    "Tko se boji Virginije Woolf",
                    "Luda Kuća"
                ),
            ],
            "yesterday's date resolves to next year"
        );
    }

    #[test]
    fn headline_without_time_is_an_error() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date");
        let broken = FIXTURE.replace("Ivanov 20:00", "Ivanov");

        assert!(
            matches!(
                parse_schedule(&broken, today),
                Err(FetchError::MissingElement("start time"))
            ),
            "missing time rejected"
        );
    }

    #[test]
    fn empty_page_has_no_entries() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date");

        assert_eq!(
            parse_schedule("<html><body></body></html>", today).expect("parses"),
            Vec::new(),
            "nothing scheduled"
        );
    }
}
