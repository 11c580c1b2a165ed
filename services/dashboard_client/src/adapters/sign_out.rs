//! services/dashboard_client/src/adapters/sign_out.rs
//!
//! The CLI's `SignOutHandler`. There is no login screen to navigate to, so a
//! forced sign-out is logged and remembered; the binary checks the flag to
//! print a notice and pick its exit code.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use task_dashboard_core::ports::SignOutHandler;

#[derive(Default)]
pub struct NoticeSignOut {
    sign_outs: AtomicUsize,
    reason: Mutex<Option<String>>,
}

impl NoticeSignOut {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn was_signed_out(&self) -> bool {
        self.sign_out_count() > 0
    }

    pub fn sign_out_count(&self) -> usize {
        self.sign_outs.load(Ordering::SeqCst)
    }

    /// The reason given with the most recent forced sign-out.
    pub fn reason(&self) -> Option<String> {
        self.reason.lock().ok().and_then(|reason| reason.clone())
    }
}

impl SignOutHandler for NoticeSignOut {
    fn on_forced_sign_out(&self, reason: &str) {
        tracing::warn!(reason, "session ended, sign in again");
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut slot) = self.reason.lock() {
            *slot = Some(reason.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_the_latest_reason() {
        let handler = NoticeSignOut::new();
        assert!(!handler.was_signed_out());
        assert_eq!(handler.reason(), None);

        handler.on_forced_sign_out("no token");
        handler.on_forced_sign_out("refresh rejected");

        assert!(handler.was_signed_out());
        assert_eq!(handler.sign_out_count(), 2);
        assert_eq!(handler.reason().as_deref(), Some("refresh rejected"));
    }
}
