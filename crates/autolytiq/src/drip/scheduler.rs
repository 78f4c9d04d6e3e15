use std::sync::{Arc, Mutex, TryLockError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::content::DripSequence;
use super::mailer::{MailSender, OutgoingEmail, DEFAULT_FROM};
use crate::leads::{DripStats, DueLead, LeadStore, StoreError};

pub const DEFAULT_BATCH_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DripSettings {
    pub batch_limit: usize,
    /// Base URL used for links and unsubscribe URLs inside emails.
    pub public_url: String,
    pub from: String,
}

impl Default for DripSettings {
    fn default() -> Self {
        Self {
            batch_limit: DEFAULT_BATCH_LIMIT,
            public_url: "http://localhost:8080".to_string(),
            from: DEFAULT_FROM.to_string(),
        }
    }
}

/// Timing of the background drip ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DripCadence {
    pub initial_delay: Duration,
    pub interval: Duration,
}

impl Default for DripCadence {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(30),
            interval: Duration::from_secs(3600),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DripRunSummary {
    pub due: usize,
    pub sent: usize,
    pub send_failures: usize,
    pub commit_failures: usize,
}

/// A due email as it would be sent, without sending it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DripPreview {
    pub email: String,
    pub step: u8,
    pub subject: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DripError {
    #[error("a drip scan is already running")]
    ScanInProgress,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Sends each due lead its next sequence email and records the delivery.
///
/// Scans are single-flight: the background ticker and manual triggers share
/// one guard, and a scan requested while another runs is rejected.
pub struct DripScheduler<S: ?Sized, M: ?Sized> {
    store: Arc<S>,
    mailer: Arc<M>,
    sequence: DripSequence,
    settings: DripSettings,
    scan_guard: Mutex<()>,
}

impl<S, M> DripScheduler<S, M>
where
    S: LeadStore + ?Sized,
    M: MailSender + ?Sized,
{
    pub fn new(store: Arc<S>, mailer: Arc<M>, settings: DripSettings) -> Self {
        Self {
            store,
            mailer,
            sequence: DripSequence::standard(),
            settings,
            scan_guard: Mutex::new(()),
        }
    }

    pub fn sequence(&self) -> &DripSequence {
        &self.sequence
    }

    pub fn settings(&self) -> &DripSettings {
        &self.settings
    }

    /// Runs one scan-send-commit pass. Per-lead failures are counted, not
    /// returned; a lead whose send fails stays at its step and is retried on
    /// the next pass.
    pub fn run_once(&self, now: DateTime<Utc>) -> Result<DripRunSummary, DripError> {
        let _guard = match self.scan_guard.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return Err(DripError::ScanInProgress),
        };

        let due = self.store.find_due_leads(
            self.sequence.schedule(),
            self.settings.batch_limit,
            now,
        )?;
        let mut summary = DripRunSummary {
            due: due.len(),
            ..DripRunSummary::default()
        };

        for lead in &due {
            let Some(email) = self.compose(lead) else {
                warn!(lead_id = %lead.id, step = lead.next_step, "no content for drip step");
                summary.send_failures += 1;
                continue;
            };

            if let Err(err) = self.mailer.send(&email) {
                warn!(lead_id = %lead.id, step = lead.next_step, error = %err, "drip send failed");
                summary.send_failures += 1;
                continue;
            }

            match self.store.record_drip_send(lead.id, lead.next_step, now) {
                Ok(_) => {
                    debug!(lead_id = %lead.id, step = lead.next_step, "drip email sent");
                    summary.sent += 1;
                }
                Err(err) => {
                    error!(
                        lead_id = %lead.id,
                        step = lead.next_step,
                        error = %err,
                        "drip email sent but progress not recorded"
                    );
                    summary.commit_failures += 1;
                }
            }
        }

        info!(
            due = summary.due,
            sent = summary.sent,
            send_failures = summary.send_failures,
            commit_failures = summary.commit_failures,
            "drip scan finished"
        );
        Ok(summary)
    }

    /// Lists what the next pass would send without sending or recording anything.
    pub fn preview(&self, now: DateTime<Utc>) -> Result<Vec<DripPreview>, DripError> {
        let due = self.store.find_due_leads(
            self.sequence.schedule(),
            self.settings.batch_limit,
            now,
        )?;
        Ok(due
            .iter()
            .filter_map(|lead| {
                self.sequence.email(lead.next_step).map(|email| DripPreview {
                    email: lead.email.clone(),
                    step: lead.next_step,
                    subject: email.subject.to_string(),
                })
            })
            .collect())
    }

    pub fn stats(&self) -> Result<DripStats, DripError> {
        Ok(self
            .store
            .drip_stats(self.sequence.schedule().final_step())?)
    }

    fn compose(&self, lead: &DueLead) -> Option<OutgoingEmail> {
        let rendered = self.sequence.render(
            lead.next_step,
            lead.name.as_deref(),
            &self.settings.public_url,
            &lead.unsubscribe_token,
        )?;
        Some(OutgoingEmail {
            from: self.settings.from.clone(),
            to: lead.email.clone(),
            subject: rendered.subject,
            html_body: rendered.html,
            unsubscribe_url: rendered.unsubscribe_url,
        })
    }
}

impl<S, M> DripScheduler<S, M>
where
    S: LeadStore + ?Sized + 'static,
    M: MailSender + ?Sized + 'static,
{
    /// Starts the background ticker. Each tick runs [`Self::run_once`] on the
    /// blocking pool and waits for it before the next tick.
    pub fn spawn(self: Arc<Self>, cadence: DripCadence) -> (CancellationToken, JoinHandle<()>) {
        let cancel = CancellationToken::new();
        let stop = cancel.clone();

        let handle = tokio::spawn(async move {
            info!(
                initial_delay_secs = cadence.initial_delay.as_secs(),
                interval_secs = cadence.interval.as_secs(),
                "drip scheduler started"
            );

            tokio::select! {
                _ = stop.cancelled() => {
                    info!("drip scheduler stopped before first scan");
                    return;
                }
                _ = tokio::time::sleep(cadence.initial_delay) => {}
            }

            let mut ticker = tokio::time::interval(cadence.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = stop.cancelled() => {
                        info!("drip scheduler shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        let scheduler = Arc::clone(&self);
                        let outcome =
                            tokio::task::spawn_blocking(move || scheduler.run_once(Utc::now())).await;
                        match outcome {
                            Ok(Ok(_)) => {}
                            Ok(Err(DripError::ScanInProgress)) => {
                                debug!("skipping drip tick; a scan is already running");
                            }
                            Ok(Err(err)) => error!(error = %err, "drip scan failed"),
                            Err(err) => error!(error = %err, "drip worker panicked"),
                        }
                    }
                }
            }
        });

        (cancel, handle)
    }
}
