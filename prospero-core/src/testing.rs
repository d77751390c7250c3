//! In-process venue and notifier doubles for exercising the service offline.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::{Client, StatusCode};

use crate::model::{ScheduleEntry, VenueId, VenueMeta};
use crate::plugin::VenuePlugin;
use crate::ports::{FetchError, Notifier, NotifyError, RawDocument, SourceAdapter};

pub(crate) enum Behaviour {
    Serve(Vec<ScheduleEntry>),
    Unreachable,
    BrokenMarkup,
}

pub(crate) struct FakeVenue {
    meta: VenueMeta,
    client: Client,
    behaviour: Mutex<Behaviour>,
}

impl FakeVenue {
    pub(crate) fn new(slug: &str, behaviour: Behaviour) -> Self {
        Self {
            meta: VenueMeta {
                id: VenueId(slug.to_owned()),
                name: slug.to_uppercase(),
            },
            client: Client::new(),
            behaviour: Mutex::new(behaviour),
        }
    }

    pub(crate) fn set_behaviour(&self, behaviour: Behaviour) {
        *self.behaviour.lock().expect("behaviour lock") = behaviour;
    }
}

#[async_trait]
impl SourceAdapter for FakeVenue {
    fn venue(&self) -> &VenueMeta {
        &self.meta
    }

    fn schedule_url(&self) -> &str {
        "https://venue.invalid/schedule"
    }

    fn client(&self) -> &Client {
        &self.client
    }

    async fn fetch_raw_schedule(&self) -> Result<RawDocument, FetchError> {
        let unreachable = matches!(
            *self.behaviour.lock().expect("behaviour lock"),
            Behaviour::Unreachable
        );
        if unreachable {
            // A relative URL never leaves the builder, which gives a genuine transport error.
            self.client.get("no-such-host").build()?;
        }

        Ok(RawDocument::new(
            self.schedule_url(),
            "",
            NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date"),
        ))
    }

    fn extract_entries(&self, _document: &RawDocument) -> Result<Vec<ScheduleEntry>, FetchError> {
        match &*self.behaviour.lock().expect("behaviour lock") {
            Behaviour::Serve(entries) => Ok(entries.clone()),
            Behaviour::Unreachable => Ok(Vec::new()),
            Behaviour::BrokenMarkup => Err(FetchError::MissingElement("schedule table")),
        }
    }
}

pub(crate) fn plugin(venue: FakeVenue) -> VenuePlugin {
    VenuePlugin {
        meta: venue.meta.clone(),
        adapter: Arc::new(venue),
    }
}

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    pub(crate) sent: Mutex<Vec<String>>,
    pub(crate) reject_all: bool,
}

impl RecordingNotifier {
    pub(crate) fn rejecting() -> Self {
        Self {
            sent: Mutex::default(),
            reject_all: true,
        }
    }

    pub(crate) fn messages(&self) -> Vec<String> {
        self.sent.lock().expect("sent lock").clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, body: &str) -> Result<(), NotifyError> {
        if self.reject_all {
            return Err(NotifyError::Rejected {
                endpoint: "test-chat".to_owned(),
                status: StatusCode::TOO_MANY_REQUESTS,
            });
        }
        self.sent.lock().expect("sent lock").push(body.to_owned());
        Ok(())
    }
}

pub(crate) fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, day)
        .and_then(|date| date.and_hms_opt(hour, minute, 0))
        .expect("valid test datetime")
}
