//! Single-fire notification that the server invalidated this session.
//!
//! The broadcaster starts ARMED. The first `trigger` flips it to FIRED with
//! one compare-and-swap, ends the session and notifies the UI. Every later
//! trigger is a no-op until `rearm` is called at the next login.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, error, warn};

use super::SessionManager;

/// Seconds the UI counts down before forcing the logout
pub const DEFAULT_COUNTDOWN_SECS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryState {
    Armed,
    Fired,
}

/// What the UI is told when the session dies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiryNotice {
    pub message: String,
    /// Where the session was taken over from, if the server said.
    pub conflicting_context: Option<String>,
    pub countdown: Duration,
}

impl ExpiryNotice {
    pub fn new(message: &str, countdown: Duration) -> Self {
        Self {
            message: message.to_string(),
            conflicting_context: parse_conflicting_context(message),
            countdown,
        }
    }
}

/// Best-effort: the last parenthesised group, else the text after the last colon.
fn parse_conflicting_context(message: &str) -> Option<String> {
    if let Some(close) = message.rfind(')') {
        if let Some(open) = message[..close].rfind('(') {
            let inner = message[open + 1..close].trim();
            if !inner.is_empty() {
                return Some(inner.to_string());
            }
        }
    }
    let (_, tail) = message.rsplit_once(':')?;
    let tail = tail.trim();
    if tail.is_empty() {
        None
    } else {
        Some(tail.to_string())
    }
}

pub type ExpiryCallback = Arc<dyn Fn(ExpiryNotice) + Send + Sync>;

pub struct ExpiryBroadcaster {
    fired: AtomicBool,
    callback: RwLock<Option<ExpiryCallback>>,
    session: Arc<SessionManager>,
    countdown: Duration,
}

impl ExpiryBroadcaster {
    pub fn new(session: Arc<SessionManager>, countdown: Duration) -> Self {
        Self {
            fired: AtomicBool::new(false),
            callback: RwLock::new(None),
            session,
            countdown,
        }
    }

    /// Register the UI reaction. Replaces any previous callback.
    pub fn on_expired<F>(&self, callback: F)
    where
        F: Fn(ExpiryNotice) + Send + Sync + 'static,
    {
        *self.callback.write() = Some(Arc::new(callback));
    }

    pub fn state(&self) -> ExpiryState {
        if self.fired.load(Ordering::Acquire) {
            ExpiryState::Fired
        } else {
            ExpiryState::Armed
        }
    }

    /// Report an expiry signal seen on a request sent under session `epoch`.
    /// Returns `true` only for the call that fired. Signals from a session
    /// that has already ended are ignored.
    pub fn trigger(&self, message: &str, epoch: u64) -> bool {
        if self.session.epoch() != epoch {
            debug!(epoch, "Expiry signal belongs to an ended session, ignoring");
            return false;
        }
        if self
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Session expiry already reported, ignoring");
            return false;
        }

        match self.session.destroy_if_current(epoch) {
            Ok(true) => {}
            Ok(false) => {
                // A login replaced the session between the check and the fire.
                debug!(epoch, "Session replaced before expiry took effect, ignoring");
                self.fired.store(false, Ordering::Release);
                return false;
            }
            Err(e) => warn!(error = %e, "Failed to clear stored session after expiry"),
        }
        warn!(reason = %message, "Session expired on the server");

        let notice = ExpiryNotice::new(message, self.countdown);
        // Clone out so the callback runs without the lock held.
        let callback = self.callback.read().clone();
        match callback {
            Some(callback) => callback(notice),
            None => {
                // No UI attached: the session and cache are already gone, so
                // the next call starts from a clean slate.
                error!(
                    reason = %notice.message,
                    context = ?notice.conflicting_context,
                    "Session expired, please log in again"
                );
            }
        }
        true
    }

    /// Return to ARMED. Called once per successful login.
    pub fn rearm(&self) {
        self.fired.store(false, Ordering::Release);
        debug!("Session expiry broadcaster armed");
    }
}
