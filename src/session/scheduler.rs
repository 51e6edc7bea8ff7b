use std::sync::{Arc, PoisonError};

use log::{debug, info};
use tokio::{runtime::Handle, task::JoinHandle, time::MissedTickBehavior};

use super::manager::{SessionInner, SessionStatus};

/// The one live expiry-check task of a session.
pub(super) struct ScheduledCheck {
    pub(super) id: u64,
    pub(super) handle: JoinHandle<()>,
}

/// A refresh is due once the remaining lifetime drops below the margin.
pub fn needs_refresh(expires_at: i64, now: i64, margin_secs: i64) -> bool {
    expires_at - now < margin_secs
}

pub(super) fn spawn_check_loop(runtime: &Handle, inner: Arc<SessionInner>, id: u64) -> JoinHandle<()> {
    runtime.spawn(async move {
        let mut ticker = tokio::time::interval(inner.settings.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if !inner.check_expiry().await {
                inner.release_check(id);
                debug!("Refresh check {} stopped after the session ended", id);
                break;
            }
        }
    })
}

impl SessionInner {
    /// Runs one expiry check. Returns false once there is no session left to
    /// keep alive.
    pub(super) async fn check_expiry(&self) -> bool {
        let expires_at = {
            let state = self.state.borrow();
            match (state.status(), state.identity()) {
                (SessionStatus::Authenticated, Some(identity)) => identity.expires_at,
                (SessionStatus::Unauthenticated, _) => return false,
                _ => return true,
            }
        };

        let now = self.clock.now();
        if !needs_refresh(expires_at, now, self.settings.refresh_margin_secs) {
            return true;
        }

        info!(
            "Credential expires in {}s, refreshing",
            expires_at - now
        );
        self.refresh().await != SessionStatus::Unauthenticated
    }

    /// Forgets the task handle without aborting it, used by the task itself.
    fn release_check(&self, id: u64) {
        let mut slot = self.scheduler.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|check| check.id == id) {
            slot.take();
        }
    }

    /// Aborts the live check, if any. Returns whether one was running.
    pub(super) fn abort_check(&self) -> bool {
        let previous = self
            .scheduler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let Some(check) = previous else {
            return false;
        };
        let was_running = !check.handle.is_finished();
        check.handle.abort();

        // An exchange cut off mid-flight leaves the old credential in place
        self.state.send_if_modified(|state| state.settle_refreshing());
        debug!("Cancelled refresh check {}", check.id);
        was_running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_refresh_only_inside_margin() {
        assert!(!needs_refresh(1_000, 900, 60));
        assert!(!needs_refresh(1_000, 940, 60));
        assert!(needs_refresh(1_000, 941, 60));
        assert!(needs_refresh(1_000, 2_000, 60));
    }
}
