//! Daily reminder jobs.
//!
//! Two jobs, due-soon and overdue, each wake once a day at a configured local time,
//! re-read the sent invoices and hand the eligible ones to the dispatcher. Nothing is
//! remembered between runs; an invoice that stays eligible is reminded again the next
//! day. The scheduler never changes invoice state.

pub mod eligibility;

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone};
use serde::Serialize;
use service_core::error::AppError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ReminderConfig;
use crate::services::mailer::{NotificationDispatcher, ReminderKind};
use crate::services::metrics::{ERRORS_TOTAL, NOTIFICATIONS_TOTAL};
use crate::services::store::EntityStore;

pub use eligibility::{is_due_soon, is_overdue, select_reminders, DUE_SOON_WINDOW_DAYS};

const DUE_SOON_JOB: &str = "due-soon-check";
const OVERDUE_JOB: &str = "overdue-check";

/// Outcome of one reminder pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReminderRunSummary {
    pub kind: ReminderKind,
    pub candidates: usize,
    pub sent: usize,
    pub failed: usize,
}

impl ReminderRunSummary {
    fn empty(kind: ReminderKind) -> Self {
        Self {
            kind,
            candidates: 0,
            sent: 0,
            failed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulerStatus {
    pub email_configured: bool,
    pub running: bool,
    pub jobs: Vec<String>,
}

struct RunningJobs {
    token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

pub struct ReminderScheduler {
    store: Arc<dyn EntityStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    config: ReminderConfig,
    jobs: Mutex<Option<RunningJobs>>,
}

/// Next instant strictly after `now` whose wall-clock time is `at`.
///
/// A time that does not exist on a given day (DST gap) moves to the following day.
pub fn next_run_after<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> DateTime<Tz> {
    let tz = now.timezone();
    let mut date = now.date_naive();
    loop {
        if let Some(candidate) = tz.from_local_datetime(&date.and_time(at)).earliest() {
            if candidate > *now {
                return candidate;
            }
        }
        date = date.succ_opt().unwrap_or(date);
    }
}

impl ReminderScheduler {
    pub fn new(
        store: Arc<dyn EntityStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        config: ReminderConfig,
    ) -> Self {
        Self {
            store,
            dispatcher,
            config,
            jobs: Mutex::new(None),
        }
    }

    /// Spawn both daily jobs. Does nothing if they are already running, if reminders
    /// are disabled, or if no mail transport is configured.
    pub async fn start(self: &Arc<Self>) {
        let mut jobs = self.jobs.lock().await;
        if jobs.is_some() {
            debug!("Reminder scheduler already running");
            return;
        }
        if !self.config.enabled {
            info!("Reminders disabled, scheduler not started");
            return;
        }
        if !self.dispatcher.is_configured() {
            info!("Email service not configured, skipping reminder scheduler");
            return;
        }

        let token = CancellationToken::new();
        let handles = vec![
            self.spawn_job(ReminderKind::DueSoon, self.config.due_soon_time, token.clone()),
            self.spawn_job(ReminderKind::Overdue, self.config.overdue_time, token.clone()),
        ];
        *jobs = Some(RunningJobs { token, handles });

        info!(
            due_soon_time = %self.config.due_soon_time,
            overdue_time = %self.config.overdue_time,
            "Reminder scheduler started"
        );
    }

    /// Cancel both jobs and wait for them to finish. A check already in progress
    /// completes first.
    pub async fn stop(&self) {
        let running = self.jobs.lock().await.take();
        let Some(running) = running else {
            return;
        };

        running.token.cancel();
        for handle in running.handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Reminder job ended abnormally");
            }
        }
        info!("Reminder scheduler stopped");
    }

    pub async fn status(&self) -> SchedulerStatus {
        let running = self.jobs.lock().await.is_some();
        SchedulerStatus {
            email_configured: self.dispatcher.is_configured(),
            running,
            jobs: if running {
                vec![DUE_SOON_JOB.to_string(), OVERDUE_JOB.to_string()]
            } else {
                Vec::new()
            },
        }
    }

    pub async fn run_due_soon_check(&self) -> Result<ReminderRunSummary, AppError> {
        self.run_check_on(ReminderKind::DueSoon, Local::now().date_naive())
            .await
    }

    pub async fn run_overdue_check(&self) -> Result<ReminderRunSummary, AppError> {
        self.run_check_on(ReminderKind::Overdue, Local::now().date_naive())
            .await
    }

    pub async fn run_due_soon_check_on(
        &self,
        today: NaiveDate,
    ) -> Result<ReminderRunSummary, AppError> {
        self.run_check_on(ReminderKind::DueSoon, today).await
    }

    pub async fn run_overdue_check_on(
        &self,
        today: NaiveDate,
    ) -> Result<ReminderRunSummary, AppError> {
        self.run_check_on(ReminderKind::Overdue, today).await
    }

    /// One pass: read sent invoices, filter by `kind`, dispatch one reminder each.
    /// A failed dispatch is logged and counted; the rest of the batch still runs.
    pub async fn run_check_on(
        &self,
        kind: ReminderKind,
        today: NaiveDate,
    ) -> Result<ReminderRunSummary, AppError> {
        if !self.dispatcher.is_configured() {
            info!(kind = kind.as_str(), "Email service not configured, skipping reminder check");
            return Ok(ReminderRunSummary::empty(kind));
        }

        let invoices = self.store.list_reminder_candidates().await?;
        let eligible = select_reminders(&invoices, kind, today);

        let mut summary = ReminderRunSummary::empty(kind);
        summary.candidates = eligible.len();

        for invoice in eligible {
            if self.dispatcher.send_reminder(invoice, kind).await {
                summary.sent += 1;
                NOTIFICATIONS_TOTAL
                    .with_label_values(&[kind.as_str(), "sent"])
                    .inc();
            } else {
                summary.failed += 1;
                NOTIFICATIONS_TOTAL
                    .with_label_values(&[kind.as_str(), "failed"])
                    .inc();
                warn!(
                    number = %invoice.invoice.number,
                    invoice_id = %invoice.invoice.invoice_id,
                    kind = kind.as_str(),
                    "Reminder not delivered"
                );
            }
        }

        info!(
            kind = kind.as_str(),
            %today,
            candidates = summary.candidates,
            sent = summary.sent,
            failed = summary.failed,
            "Reminder check finished"
        );

        Ok(summary)
    }

    fn spawn_job(
        self: &Arc<Self>,
        kind: ReminderKind,
        at: NaiveTime,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let now = Local::now();
                let next = next_run_after(&now, at);
                let wait = (next.clone() - now).to_std().unwrap_or(Duration::ZERO);
                debug!(kind = kind.as_str(), next_run = %next, "Reminder job sleeping");

                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(wait) => {}
                }

                let today = Local::now().date_naive();
                if let Err(e) = scheduler.run_check_on(kind, today).await {
                    ERRORS_TOTAL.with_label_values(&["reminder_check"]).inc();
                    error!(kind = kind.as_str(), error = %e, "Reminder check failed");
                }
            }
            debug!(kind = kind.as_str(), "Reminder job cancelled");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateClient, CreateInvoice, InvoiceAmounts, InvoiceStatus};
    use crate::services::mailer::{DisabledDispatcher, RecordingDispatcher};
    use crate::services::memory::MemoryStore;
    use chrono::{Duration as Days, Utc};
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    async fn seed(store: &MemoryStore, number: &str, status: InvoiceStatus, due_in_days: i64) {
        let owner = Uuid::new_v4();
        let client = store
            .create_client(
                owner,
                &CreateClient {
                    name: "Client".to_string(),
                    email: "client@example.com".to_string(),
                    company: None,
                    phone: None,
                    address: None,
                    billing_rate: None,
                },
            )
            .await
            .unwrap();
        store
            .create_invoice(
                owner,
                &CreateInvoice {
                    number: number.to_string(),
                    client_id: client.client_id,
                    issue_date: today() - Days::days(30),
                    due_date: today() + Days::days(due_in_days),
                    status,
                    notes: None,
                    amounts: InvoiceAmounts::default(),
                },
                &[],
            )
            .await
            .unwrap();
    }

    fn scheduler(
        store: Arc<MemoryStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Arc<ReminderScheduler> {
        Arc::new(ReminderScheduler::new(
            store,
            dispatcher,
            ReminderConfig::default(),
        ))
    }

    #[tokio::test]
    async fn due_soon_check_dispatches_once_per_eligible_invoice() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "SOON-1", InvoiceStatus::Sent, 1).await;
        seed(&store, "SOON-3", InvoiceStatus::Sent, 3).await;
        seed(&store, "LATER", InvoiceStatus::Sent, 10).await;
        seed(&store, "TODAY", InvoiceStatus::Sent, 0).await;
        seed(&store, "DRAFT", InvoiceStatus::Draft, 2).await;
        seed(&store, "PAID", InvoiceStatus::Paid, 2).await;

        let dispatcher = Arc::new(RecordingDispatcher::new());
        let summary = scheduler(store, dispatcher.clone())
            .run_due_soon_check_on(today())
            .await
            .unwrap();

        assert_eq!(summary.candidates, 2);
        assert_eq!(summary.sent, 2);
        let mut numbers: Vec<String> = dispatcher.records().into_iter().map(|r| r.number).collect();
        numbers.sort();
        assert_eq!(numbers, vec!["SOON-1", "SOON-3"]);
    }

    #[tokio::test]
    async fn failed_dispatch_does_not_stop_the_batch() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "LATE-A", InvoiceStatus::Sent, -1).await;
        seed(&store, "LATE-B", InvoiceStatus::Sent, -5).await;
        seed(&store, "LATE-C", InvoiceStatus::Sent, -9).await;

        let dispatcher = Arc::new(RecordingDispatcher::failing_for(["LATE-B"]));
        let summary = scheduler(store, dispatcher.clone())
            .run_overdue_check_on(today())
            .await
            .unwrap();

        assert_eq!(summary.candidates, 3);
        assert_eq!(summary.sent, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(dispatcher.records().len(), 3);
        assert!(dispatcher
            .records()
            .iter()
            .all(|r| r.kind == Some(ReminderKind::Overdue)));
    }

    #[tokio::test]
    async fn reruns_remind_again() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "LATE", InvoiceStatus::Sent, -2).await;

        let dispatcher = Arc::new(RecordingDispatcher::new());
        let scheduler = scheduler(store, dispatcher.clone());
        scheduler.run_overdue_check_on(today()).await.unwrap();
        scheduler
            .run_overdue_check_on(today() + Days::days(1))
            .await
            .unwrap();

        assert_eq!(dispatcher.delivered_count(), 2);
    }

    #[tokio::test]
    async fn unconfigured_dispatcher_skips_the_check() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "LATE", InvoiceStatus::Sent, -2).await;

        let scheduler = scheduler(store, Arc::new(DisabledDispatcher));
        let summary = scheduler.run_overdue_check_on(today()).await.unwrap();

        assert_eq!(summary, ReminderRunSummary::empty(ReminderKind::Overdue));
        assert!(!scheduler.status().await.email_configured);
    }

    #[tokio::test]
    async fn start_is_idempotent_and_stop_cancels() {
        let scheduler = scheduler(
            Arc::new(MemoryStore::new()),
            Arc::new(RecordingDispatcher::new()),
        );

        scheduler.start().await;
        scheduler.start().await;
        let status = scheduler.status().await;
        assert!(status.running);
        assert_eq!(status.jobs, vec![DUE_SOON_JOB, OVERDUE_JOB]);

        scheduler.stop().await;
        let status = scheduler.status().await;
        assert!(!status.running);
        assert!(status.jobs.is_empty());

        scheduler.stop().await;
    }

    #[tokio::test]
    async fn start_without_email_leaves_scheduler_idle() {
        let scheduler = scheduler(Arc::new(MemoryStore::new()), Arc::new(DisabledDispatcher));
        scheduler.start().await;
        assert!(!scheduler.status().await.running);
    }

    #[test]
    fn next_run_is_later_today_or_tomorrow() {
        let at = NaiveTime::from_hms_opt(9, 0, 0).unwrap();

        let morning = Utc.with_ymd_and_hms(2026, 10, 19, 7, 30, 0).unwrap();
        assert_eq!(
            next_run_after(&morning, at),
            Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap()
        );

        let exactly = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        assert_eq!(
            next_run_after(&exactly, at),
            Utc.with_ymd_and_hms(2026, 10, 20, 9, 0, 0).unwrap()
        );

        let evening = Utc.with_ymd_and_hms(2026, 12, 31, 18, 0, 0).unwrap();
        assert_eq!(
            next_run_after(&evening, at),
            Utc.with_ymd_and_hms(2027, 1, 1, 9, 0, 0).unwrap()
        );
    }
}
