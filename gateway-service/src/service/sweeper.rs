//! Background sweeper: a single ticker task (~5 min) that expires stale
//! `APPROVED` approval entries and purges idempotency records past their
//! TTL. Missed ticks under load are harmless, since every transition it
//! performs is the same conditional `UPDATE`/`DELETE` any other caller
//! could run, so a late or skipped tick never leaves a wrong state behind.

use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use crate::repository::IdempotencyRepository;
use crate::service::approval_queue::ApprovalQueue;

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

pub struct Sweeper {
    approvals: ApprovalQueue,
    idempotency: IdempotencyRepository,
    interval: Duration,
}

impl Sweeper {
    pub fn new(approvals: ApprovalQueue, idempotency: IdempotencyRepository, interval: Duration) -> Self {
        Self { approvals, idempotency, interval }
    }

    /// Runs forever. Intended to be spawned with `tokio::spawn` from
    /// `main` and never awaited to completion.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            self.sweep_once().await;
        }
    }

    async fn sweep_once(&self) {
        match self.approvals.sweep_expired().await {
            Ok(count) if count > 0 => info!(count, "expired stale approval entries"),
            Ok(_) => {}
            Err(err) => warn!(error = %err, "approval sweep failed"),
        }

        match self.idempotency.purge_expired(Utc::now()).await {
            Ok(count) if count > 0 => info!(count, "purged expired idempotency records"),
            Ok(_) => {}
            Err(err) => warn!(error = %err, "idempotency purge failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_interval_is_five_minutes() {
        assert_eq!(DEFAULT_SWEEP_INTERVAL, Duration::from_secs(300));
    }
}
