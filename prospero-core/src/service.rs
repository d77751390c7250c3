//! Poll cycle: harvest every venue, keep what is new, announce it.

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::model::{ScheduleEntry, VenueMeta};
use crate::plugin::VenueRegistry;
use crate::ports::Notifier;
use crate::store::{ScheduleStore, StoreError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Outcome of one poll cycle.
pub struct CycleReport {
    /// Entries produced by all venues together.
    pub collected: usize,
    /// Entries that were new and got stored.
    pub added: usize,
    /// Entries skipped because they were already known.
    pub duplicates: usize,
    /// New entries whose announcement could not be delivered.
    pub notification_failures: usize,
}

/// Drives the venues, the store, and the notifier through poll cycles.
pub struct AggregationService {
    registry: Arc<VenueRegistry>,
    notifier: Arc<dyn Notifier>,
    notify_delay: Duration,
}

impl AggregationService {
    /// Create a new service bound to the provided registry and notifier.
    #[must_use]
    pub fn new(registry: Arc<VenueRegistry>, notifier: Arc<dyn Notifier>, config: &Config) -> Self {
        Self {
            registry,
            notifier,
            notify_delay: config.notify_delay,
        }
    }

    /// List all registered venues.
    #[must_use]
    pub fn venues(&self) -> Vec<VenueMeta> {
        self.registry.venues()
    }

    /// Fetch every venue one after another and return all entries sorted by start time.
    ///
    /// A venue that fails contributes nothing; the others are unaffected.
    pub async fn collect_entries(&self) -> Vec<ScheduleEntry> {
        let mut entries = Vec::new();
        for adapter in self.registry.adapters() {
            entries.extend(adapter.try_extract_entries().await);
        }

        entries.sort_by_key(|entry| entry.start_datetime);
        entries
    }

    /// Run one poll cycle against `store`.
    ///
    /// New entries are stored and announced in chronological order, with a
    /// pause after every announcement. A failed announcement still leaves the
    /// entry stored. Everything is committed at the end; any store error
    /// drops the session and with it every insertion of this cycle.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if a lookup, insert, or the final commit fails.
    #[tracing::instrument(level = "info", skip_all)]
    pub async fn poll_cycle(&self, store: &mut ScheduleStore) -> Result<CycleReport, StoreError> {
        let entries = self.collect_entries().await;

        let mut report = CycleReport {
            collected: entries.len(),
            ..CycleReport::default()
        };

        let mut session = store.session()?;

        for entry in &entries {
            if session.contains(entry)? {
                tracing::debug!(%entry, "entry already exists");
                report.duplicates += 1;
                continue;
            }

            session.add(entry)?;
            report.added += 1;
            tracing::debug!(%entry, "added new entry, notifying");

            if let Err(err) = self.notifier.notify(&entry.to_markdown()).await {
                tracing::warn!(%entry, error = %err, "notification failed");
                report.notification_failures += 1;
            }

            if !self.notify_delay.is_zero() {
                tokio::time::sleep(self.notify_delay).await;
            }
        }

        session.commit()?;
        Ok(report)
    }

    /// Run one poll cycle and log the outcome; failures never escape.
    pub async fn run_cycle(&self, store: &mut ScheduleStore) -> Option<CycleReport> {
        match self.poll_cycle(store).await {
            Ok(report) => {
                let stored = match store.count() {
                    Ok(count) => Some(count),
                    Err(err) => {
                        tracing::warn!(error = %err, "cannot count stored entries");
                        None
                    }
                };
                tracing::info!(
                    stored,
                    collected = report.collected,
                    added = report.added,
                    duplicates = report.duplicates,
                    notification_failures = report.notification_failures,
                    "poll cycle finished"
                );
                Some(report)
            }
            Err(err) => {
                tracing::error!(error = %err, "poll cycle failed, nothing from this cycle was saved");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Instant;

    use super::*;
    use crate::plugin::VenuePlugin;
    use crate::ports::SourceAdapter;
    use crate::testing::{Behaviour, FakeVenue, RecordingNotifier, at, plugin};

    fn quiet_config() -> Config {
        Config {
            telegram_bot_token: "test-token".to_owned(),
            telegram_chat_ids: vec!["1".to_owned()],
            check_interval: Duration::from_secs(300),
            database_path: PathBuf::from(":memory:"),
            notify_delay: Duration::ZERO,
        }
    }

    fn service(venues: Vec<FakeVenue>, notifier: &Arc<RecordingNotifier>) -> AggregationService {
        paced_service(venues, notifier, Duration::ZERO)
    }

    fn paced_service(
        venues: Vec<FakeVenue>,
        notifier: &Arc<RecordingNotifier>,
        notify_delay: Duration,
    ) -> AggregationService {
        let registry = VenueRegistry::new(venues.into_iter().map(plugin).collect());
        let notifier: Arc<dyn Notifier> = Arc::<RecordingNotifier>::clone(notifier);
        let config = Config {
            notify_delay,
            ..quiet_config()
        };
        AggregationService::new(Arc::new(registry), notifier, &config)
    }

    #[tokio::test]
    async fn notifies_new_entries_in_chronological_order() {
        let notifier = Arc::new(RecordingNotifier::default());
        let service = service(
            vec![
                FakeVenue::new(
                    "kerempuh",
                    Behaviour::Serve(vec![
                        ScheduleEntry::new(at(20, 10, 0), "Ten", "Kerempuh"),
                        ScheduleEntry::new(at(20, 11, 0), "Eleven", "Kerempuh"),
                    ]),
                ),
                FakeVenue::new(
                    "komedija",
                    Behaviour::Serve(vec![ScheduleEntry::new(at(20, 9, 0), "Nine", "Komedija")]),
                ),
            ],
            &notifier,
        );
        let mut store = ScheduleStore::in_memory().expect("store");

        let report = service.poll_cycle(&mut store).await.expect("cycle");

        assert_eq!(report.added, 3, "all new");
        let order: Vec<bool> = notifier
            .messages()
            .iter()
            .zip(["⏰ 09:00", "⏰ 10:00", "⏰ 11:00"])
            .map(|(message, clock)| message.contains(clock))
            .collect();
        assert_eq!(order, vec![true, true, true], "sent as 09:00, 10:00, 11:00");
    }

    #[tokio::test]
    async fn failing_venues_do_not_block_the_others() {
        let notifier = Arc::new(RecordingNotifier::default());
        let service = service(
            vec![
                FakeVenue::new("gavella", Behaviour::Unreachable),
                FakeVenue::new("luda-kuca", Behaviour::BrokenMarkup),
                FakeVenue::new(
                    "teatar-exit",
                    Behaviour::Serve(vec![
                        ScheduleEntry::new(at(21, 20, 0), "Cabaret", "Teatar Exit"),
                        ScheduleEntry::new(at(22, 20, 0), "Cabaret", "Teatar Exit"),
                    ]),
                ),
            ],
            &notifier,
        );
        let mut store = ScheduleStore::in_memory().expect("store");

        let report = service.poll_cycle(&mut store).await.expect("cycle");

        assert_eq!(
            report,
            CycleReport {
                collected: 2,
                added: 2,
                duplicates: 0,
                notification_failures: 0,
            },
            "healthy venue fully processed"
        );
        assert_eq!(notifier.messages().len(), 2, "two announcements");
        assert_eq!(store.count().expect("count"), 2, "two stored");
    }

    #[tokio::test]
    async fn second_cycle_over_unchanged_sources_is_silent() {
        let notifier = Arc::new(RecordingNotifier::default());
        let service = service(
            vec![FakeVenue::new(
                "gavella",
                Behaviour::Serve(vec![
                    ScheduleEntry::new(at(18, 19, 30), "Hamlet", "Gavella (Velika scena)"),
                    ScheduleEntry::new(at(19, 19, 30), "Hamlet", "Gavella (Velika scena)"),
                ]),
            )],
            &notifier,
        );
        let mut store = ScheduleStore::in_memory().expect("store");

        service.poll_cycle(&mut store).await.expect("first cycle");
        let second = service.poll_cycle(&mut store).await.expect("second cycle");

        assert_eq!(second.added, 0, "nothing new");
        assert_eq!(second.duplicates, 2, "everything known");
        assert_eq!(notifier.messages().len(), 2, "only the first cycle announced");
    }

    #[tokio::test]
    async fn later_cycle_announces_only_the_addition() {
        let notifier = Arc::new(RecordingNotifier::default());
        let known = ScheduleEntry::new(at(25, 20, 0), "Ivanov", "Luda Kuća");
        let venue = Arc::new(FakeVenue::new("luda-kuca", Behaviour::Serve(vec![known.clone()])));
        let registry = VenueRegistry::new(vec![VenuePlugin {
            meta: venue.venue().clone(),
            adapter: Arc::<FakeVenue>::clone(&venue),
        }]);
        let service = AggregationService::new(
            Arc::new(registry),
            Arc::<RecordingNotifier>::clone(&notifier),
            &quiet_config(),
        );
        let mut store = ScheduleStore::in_memory().expect("store");

        service.poll_cycle(&mut store).await.expect("first cycle");

        let retroactive = ScheduleEntry::new(at(16, 20, 0), "Ivanov", "Luda Kuća");
        venue.set_behaviour(Behaviour::Serve(vec![known, retroactive]));
        let report = service.poll_cycle(&mut store).await.expect("second cycle");

        assert_eq!(report.added, 1, "one addition");
        let messages = notifier.messages();
        assert_eq!(messages.len(), 2, "one announcement per cycle");
        assert!(
            messages.last().is_some_and(|message| message.contains("16. March 2024")),
            "the retroactive entry was announced last"
        );
    }

    #[tokio::test]
    async fn same_event_from_two_venues_is_announced_once() {
        let notifier = Arc::new(RecordingNotifier::default());
        let shared = ScheduleEntry::new(at(20, 19, 0), "Guest show", "Komedija");
        let mut annotated = shared.clone();
        annotated.note = Some("Gostovanje".to_owned());

        let service = service(
            vec![
                FakeVenue::new("komedija", Behaviour::Serve(vec![shared])),
                FakeVenue::new("kerempuh", Behaviour::Serve(vec![annotated])),
            ],
            &notifier,
        );
        let mut store = ScheduleStore::in_memory().expect("store");

        let report = service.poll_cycle(&mut store).await.expect("cycle");

        assert_eq!(report.added, 1, "stored once");
        assert_eq!(report.duplicates, 1, "second copy skipped");
        assert_eq!(notifier.messages().len(), 1, "announced once");
    }

    #[tokio::test]
    async fn failed_notification_still_marks_entry_as_seen() {
        let notifier = Arc::new(RecordingNotifier::rejecting());
        let service = service(
            vec![FakeVenue::new(
                "kerempuh",
                Behaviour::Serve(vec![ScheduleEntry::new(at(20, 20, 0), "Predstava", "Kerempuh")]),
            )],
            &notifier,
        );
        let mut store = ScheduleStore::in_memory().expect("store");

        let first = service.run_cycle(&mut store).await.expect("cycle succeeds");
        let second = service.run_cycle(&mut store).await.expect("cycle succeeds");

        assert_eq!(first.notification_failures, 1, "delivery failed");
        assert_eq!(first.added, 1, "entry kept anyway");
        assert_eq!(second.added, 0, "not retried");
        assert_eq!(store.count().expect("count"), 1, "persisted");
    }

    #[tokio::test]
    async fn venues_are_listed_in_registration_order() {
        let notifier = Arc::new(RecordingNotifier::default());
        let service = service(
            vec![
                FakeVenue::new("kerempuh", Behaviour::Serve(Vec::new())),
                FakeVenue::new("gavella", Behaviour::Serve(Vec::new())),
            ],
            &notifier,
        );

        let ids: Vec<String> = service.venues().into_iter().map(|meta| meta.id.0).collect();
        assert_eq!(ids, vec!["kerempuh".to_owned(), "gavella".to_owned()], "order kept");
    }

    #[tokio::test]
    async fn every_announcement_is_followed_by_the_delay() {
        let delay = Duration::from_millis(50);
        let notifier = Arc::new(RecordingNotifier::default());
        let service = paced_service(
            vec![
                FakeVenue::new("gavella", Behaviour::Unreachable),
                FakeVenue::new(
                    "kerempuh",
                    Behaviour::Serve(vec![
                        ScheduleEntry::new(at(20, 18, 0), "Skup", "Kerempuh"),
                        ScheduleEntry::new(at(21, 18, 0), "Skup", "Kerempuh"),
                        ScheduleEntry::new(at(22, 18, 0), "Skup", "Kerempuh"),
                    ]),
                ),
            ],
            &notifier,
            delay,
        );
        let mut store = ScheduleStore::in_memory().expect("store");

        let started = Instant::now();
        let first = service.poll_cycle(&mut store).await.expect("first cycle");
        let first_elapsed = started.elapsed();

        assert_eq!(first.added, 3, "all new");
        assert!(
            first_elapsed >= delay * 3,
            "three pauses expected, took {first_elapsed:?}"
        );

        let started = Instant::now();
        let second = service.poll_cycle(&mut store).await.expect("second cycle");
        let second_elapsed = started.elapsed();

        assert_eq!(second.duplicates, 3, "everything known");
        assert!(
            second_elapsed < delay,
            "no announcement means no pause, took {second_elapsed:?}"
        );
    }
}
