//! Daily reminder scanner.
//!
//! Once per day, at a configured local hour, the scanner finds every
//! incomplete todo due "today" across all owners, groups the matches by
//! owner, and sends one digest email per owner through the [`Notifier`]
//! channel. This is the only code path that reads todos across ownership
//! boundaries; it is a trusted internal process with no HTTP surface.

pub mod mailer;

use std::collections::BTreeMap;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Local, NaiveDateTime, NaiveTime, TimeZone, Utc};
use sqlx::{FromRow, PgPool};

use crate::error::AppError;

pub use mailer::{DispatchError, EmailClient, Notifier};

const DIGEST_SUBJECT: &str = "Todolite: Tasks Due Today";

/// One due, incomplete todo joined with its owner's contact details.
#[derive(Debug, FromRow)]
pub struct DueRow {
    pub email: String,
    pub name: String,
    pub title: String,
}

/// All due todo titles for a single owner.
#[derive(Debug, Default)]
pub struct OwnerDigest {
    pub name: String,
    pub titles: Vec<String>,
}

/// Outcome of one scan cycle, for logging and tests.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub notified: usize,
    pub failed: usize,
}

/// Computes the `[start of today, start of tomorrow)` window in server-local
/// time, expressed in UTC for querying.
///
/// Returns `None` only when midnight does not exist in the local timezone
/// (a DST pathology); the caller treats that as an aborted cycle.
pub fn today_window(now: DateTime<Local>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start_naive = now.date_naive().and_time(NaiveTime::MIN);
    let end_naive = start_naive + Duration::days(1);
    let start = resolve_local(start_naive)?;
    let end = resolve_local(end_naive)?;
    Some((start.with_timezone(&Utc), end.with_timezone(&Utc)))
}

fn resolve_local(naive: NaiveDateTime) -> Option<DateTime<Local>> {
    Local.from_local_datetime(&naive).earliest()
}

/// Groups due rows by owner email, preserving row order within each owner.
pub fn group_due_rows(rows: Vec<DueRow>) -> BTreeMap<String, OwnerDigest> {
    let mut digests: BTreeMap<String, OwnerDigest> = BTreeMap::new();
    for row in rows {
        let digest = digests.entry(row.email).or_default();
        digest.name = row.name;
        digest.titles.push(row.title);
    }
    digests
}

/// Renders the digest email body for one owner.
pub fn digest_html(name: &str, titles: &[String]) -> String {
    let items: String = titles
        .iter()
        .map(|title| format!("<li>{}</li>", escape_html(title)))
        .collect();
    format!(
        "<h2>Hello {},</h2>\
         <p>You have {} task(s) due today:</p>\
         <ul>{}</ul>\
         <p>Log in to your Todolite account to complete these tasks.</p>\
         <p>Best regards,<br>The Todolite Team</p>",
        escape_html(name),
        titles.len(),
        items
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Runs one scan cycle: query today's due, incomplete todos across all
/// owners, then dispatch one digest per owner.
///
/// A store failure aborts the cycle (the caller logs it and waits for the
/// next trigger). Dispatch failures are isolated per owner and only counted.
pub async fn run_scan<N: Notifier>(pool: &PgPool, notifier: &N) -> Result<ScanReport, AppError> {
    let (start, end) = today_window(Local::now())
        .ok_or_else(|| AppError::InternalServerError("Could not resolve local day window".into()))?;

    let rows = sqlx::query_as::<_, DueRow>(
        "SELECT u.email, u.name, t.title
         FROM todos t
         JOIN users u ON u.id = t.user_id
         WHERE t.completed = FALSE AND t.due_date >= $1 AND t.due_date < $2
         ORDER BY u.email, t.created_at",
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    Ok(dispatch_digests(group_due_rows(rows), notifier).await)
}

/// Sends one digest per owner. A failed send is logged and counted but does
/// not stop the remaining owners from being notified.
pub async fn dispatch_digests<N: Notifier>(
    digests: BTreeMap<String, OwnerDigest>,
    notifier: &N,
) -> ScanReport {
    let mut report = ScanReport::default();
    for (email, digest) in digests {
        let html = digest_html(&digest.name, &digest.titles);
        match notifier.notify(&email, DIGEST_SUBJECT, &html).await {
            Ok(()) => {
                log::info!("reminder digest sent to {}", email);
                report.notified += 1;
            }
            Err(e) => {
                log::error!("failed to send reminder to {}: {}", email, e);
                report.failed += 1;
            }
        }
    }
    report
}

/// Seconds until the next `hour:00` in local time, strictly in the future.
fn next_fire_delay(now: DateTime<Local>, hour: u32) -> StdDuration {
    let fire_time = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    let mut fire = now.date_naive().and_time(fire_time);
    let mut target = resolve_local(fire);
    if target.map(|t| t <= now).unwrap_or(true) {
        fire += Duration::days(1);
        target = resolve_local(fire);
    }
    match target {
        Some(t) => (t - now).to_std().unwrap_or(StdDuration::from_secs(60)),
        // The fire time falls in a DST gap; try again in an hour.
        None => StdDuration::from_secs(3600),
    }
}

/// Spawns the recurring scan loop on the tokio runtime.
///
/// Each cycle is awaited to completion before the next sleep is armed, so
/// scans never overlap even if one runs long.
pub fn spawn_daily<N>(pool: PgPool, notifier: N, hour: u32) -> tokio::task::JoinHandle<()>
where
    N: Notifier + Send + Sync + 'static,
{
    tokio::spawn(async move {
        log::info!("reminder scanner armed for {:02}:00 local time", hour);
        loop {
            let delay = next_fire_delay(Local::now(), hour);
            tokio::time::sleep(delay).await;
            match run_scan(&pool, &notifier).await {
                Ok(report) => log::info!(
                    "reminder scan finished: {} sent, {} failed",
                    report.notified,
                    report.failed
                ),
                Err(e) => log::error!("reminder scan aborted: {}", e),
            }
        }
    })
}
