//! Lock-contention retry for the append-only writes
//!
//! Audit entries and blocklist upserts are single statements that must not
//! be lost to a busy SQLite file or a deadlocked MySQL row. Anything other
//! than contention or a dropped connection is returned on the first try.

use std::future::Future;
use std::time::Duration;

use sea_orm::DbErr;
use tracing::warn;

use crate::config::DatabaseConfig;

const CONTENTION_MARKERS: &[&str] = &[
    "database is locked",
    "database table is locked",
    "deadlock",
    "lock wait timeout",
    "could not serialize access",
];

#[derive(Debug, Clone, Copy)]
pub struct WriteRetry {
    attempts: u32,
    step: Duration,
}

impl WriteRetry {
    pub fn new(retries: u32, step_ms: u64) -> Self {
        Self {
            attempts: retries.saturating_add(1),
            step: Duration::from_millis(step_ms),
        }
    }

    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self::new(config.retry_count, config.retry_base_delay_ms)
    }

    /// Run `write` until it succeeds, fails for a non-contention reason, or
    /// the attempts run out. The wait grows linearly with each attempt.
    pub async fn run<T, F, Fut>(&self, what: &str, mut write: F) -> Result<T, DbErr>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DbErr>>,
    {
        let mut attempt = 1;
        loop {
            match write().await {
                Err(e) if attempt < self.attempts && is_contention(&e) => {
                    let wait = self.step * attempt;
                    warn!(
                        "{} hit contention (attempt {}/{}), waiting {:?}: {}",
                        what, attempt, self.attempts, wait, e
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

fn is_contention(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => true,
        DbErr::Exec(_) | DbErr::Query(_) => {
            let text = err.to_string().to_lowercase();
            CONTENTION_MARKERS.iter().any(|m| text.contains(m))
        }
        _ => false,
    }
}
