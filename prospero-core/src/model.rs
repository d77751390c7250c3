//! Domain data structures for venues and scheduled performances.

use std::fmt;

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

const LONG_DATE_FORMAT: &str = "%d. %B %Y (%A)";
const CLOCK_FORMAT: &str = "%H:%M";

/// Built-in venues harvested by prospero.
pub enum Venues {
    /// Gradsko dramsko kazalište Gavella.
    Gavella,
    /// Satiričko kazalište Kerempuh.
    Kerempuh,
    /// Gradsko kazalište Komedija.
    Komedija,
    /// Kazalište Luda kuća.
    LudaKuca,
    /// Teatar Exit.
    TeatarExit,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Identifier for a venue known to prospero.
pub struct VenueId(pub String);

impl fmt::Display for Venues {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slug = match self {
            Venues::Gavella => "gavella",
            Venues::Kerempuh => "kerempuh",
            Venues::Komedija => "komedija",
            Venues::LudaKuca => "luda-kuca",
            Venues::TeatarExit => "teatar-exit",
        };
        write!(formatter, "{slug}")
    }
}

impl From<Venues> for VenueId {
    fn from(venue: Venues) -> Self {
        VenueId(venue.to_string())
    }
}

impl fmt::Display for VenueId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Metadata describing a venue and its human-friendly name.
pub struct VenueMeta {
    /// Unique identifier.
    pub id: VenueId,
    /// Display name.
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// One scheduled performance.
///
/// Two entries describe the same event when `start_datetime`, `title` and
/// `location` match; the remaining fields are informational and never take
/// part in deduplication.
pub struct ScheduleEntry {
    /// Local date and time the performance starts.
    pub start_datetime: NaiveDateTime,
    /// Title of the play.
    pub title: String,
    /// Free-form remark published next to the performance (fee, guest show, ...).
    pub note: Option<String>,
    /// Venue or stage name.
    pub location: String,
    /// Running time in minutes.
    pub duration: Option<u32>,
    /// Whether the performance has an intermission.
    pub includes_break: bool,
    /// Link to the ticket shop.
    pub buy_tickets_url: Option<String>,
}

impl ScheduleEntry {
    /// Create an entry with only the identifying fields set.
    #[must_use]
    pub fn new<T: Into<String>, L: Into<String>>(
        start_datetime: NaiveDateTime,
        title: T,
        location: L,
    ) -> Self {
        Self {
            start_datetime,
            title: title.into(),
            note: None,
            location: location.into(),
            duration: None,
            includes_break: false,
            buy_tickets_url: None,
        }
    }

    /// Render the entry as a Telegram-flavoured Markdown message.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let duration = self.duration.filter(|minutes| *minutes > 0);
        let start_time = self.start_datetime.format(CLOCK_FORMAT);

        let clock_line = match duration {
            Some(minutes) => {
                let end = self.start_datetime + TimeDelta::minutes(i64::from(minutes));
                format!("⏰ {start_time} - {}", end.format(CLOCK_FORMAT))
            }
            None => format!("⏰ {start_time}"),
        };

        let mut lines = vec![
            format!("📍 {}", self.location),
            String::new(),
            format!("🎭*{}*🎭", self.title),
            format!("📅 {}", self.start_datetime.format(LONG_DATE_FORMAT)),
            clock_line,
        ];

        if let Some(minutes) = duration {
            lines.push(format!("⏱️ {minutes} minutes"));
        }

        if let Some(note) = self.note.as_deref().filter(|note| !note.is_empty()) {
            lines.push(format!("📝 {note}"));
        }

        if self.includes_break {
            lines.push("☕ Includes break".to_owned());
        }

        if let Some(url) = self.buy_tickets_url.as_deref().filter(|url| !url.is_empty()) {
            lines.push(String::new());
            lines.push(format!("[🎫 Buy tickets 🎫]({url})"));
        }

        lines.join("\n").trim().to_owned()
    }
}

impl fmt::Display for ScheduleEntry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{} @ {} ({})",
            self.title,
            self.location,
            self.start_datetime.format("%Y-%m-%d %H:%M")
        )
    }
}
