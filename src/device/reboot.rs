use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;
use tracing::warn;

pub trait Reboot: Send + Sync {
    fn request_reboot(&self);
}

/// Records a reboot request and wakes whoever waits on it.
#[derive(Debug, Default)]
pub struct RebootSignal {
    requested: AtomicBool,
    notify: Notify,
}

impl RebootSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Resolves once a reboot has been requested.
    pub async fn requested(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_requested() {
                return;
            }
            notified.await;
        }
    }
}

impl Reboot for RebootSignal {
    fn request_reboot(&self) {
        warn!("reboot requested");
        self.requested.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }
}
