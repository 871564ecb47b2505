use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::{Email, Mailer};

/// Retry schedule for one email: `max_attempts` tries, sleeping
/// `base_delay * 2^attempt` between them.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * (1u32 << attempt.min(16))
    }
}

/// Handle that lets handlers push emails to the background worker.
///
/// A disabled queue (no provider configured) accepts nothing and reports
/// every enqueue as not attempted.
#[derive(Clone)]
pub struct NotificationQueue {
    tx: Option<mpsc::Sender<Email>>,
}

impl NotificationQueue {
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Spawns the delivery worker on the current runtime.
    pub fn spawn(mailer: Arc<dyn Mailer>, capacity: usize, policy: RetryPolicy) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        tokio::spawn(run_worker(mailer, rx, policy));
        Self { tx: Some(tx) }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Queues an email without waiting. Returns whether it was accepted.
    pub fn enqueue(&self, email: Email) -> bool {
        let Some(tx) = &self.tx else {
            warn!(to = %email.to, subject = %email.subject, "Email provider not configured; skipping email");
            return false;
        };

        match tx.try_send(email) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(email)) => {
                error!(to = %email.to, subject = %email.subject, "Notification queue full; dropping email");
                false
            }
            Err(mpsc::error::TrySendError::Closed(email)) => {
                error!(to = %email.to, subject = %email.subject, "Notification worker stopped; dropping email");
                false
            }
        }
    }
}

async fn run_worker(mailer: Arc<dyn Mailer>, mut rx: mpsc::Receiver<Email>, policy: RetryPolicy) {
    info!("Notification worker started");

    while let Some(email) = rx.recv().await {
        deliver(mailer.as_ref(), &email, policy).await;
    }

    info!("Notification worker stopped");
}

/// Sends one email, retrying with exponential backoff. Failures are logged only.
async fn deliver(mailer: &dyn Mailer, email: &Email, policy: RetryPolicy) -> bool {
    let attempts = policy.max_attempts.max(1);

    for attempt in 1..=attempts {
        match mailer.send(email).await {
            Ok(()) => {
                info!(to = %email.to, subject = %email.subject, attempt, "Email delivered");
                return true;
            }
            Err(e) => {
                warn!(to = %email.to, error = %e, attempt, "Email delivery failed");
            }
        }

        if attempt < attempts {
            tokio::time::sleep(policy.delay_after(attempt)).await;
        }
    }

    error!(
        to = %email.to,
        subject = %email.subject,
        "Email delivery failed after {} attempts",
        attempts
    );
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotifyError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` sends, then records deliveries.
    struct FlakyMailer {
        failures: AtomicU32,
        calls: AtomicU32,
        delivered: Mutex<Vec<Email>>,
    }

    impl FlakyMailer {
        fn new(failures: u32) -> Self {
            Self {
                failures: AtomicU32::new(failures),
                calls: AtomicU32::new(0),
                delivered: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Mailer for FlakyMailer {
        async fn send(&self, email: &Email) -> Result<(), NotifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(NotifyError::Rejected {
                    status: 503,
                    body: "busy".to_string(),
                });
            }
            self.delivered.lock().unwrap().push(email.clone());
            Ok(())
        }
    }

    fn email() -> Email {
        Email {
            to: "recruiter@example.com".to_string(),
            subject: "Interview Result".to_string(),
            html: "<p>hi</p>".to_string(),
            attachment: None,
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn retries_until_success() {
        let mailer = FlakyMailer::new(2);
        assert!(deliver(&mailer, &email(), fast_policy()).await);
        assert_eq!(mailer.calls.load(Ordering::SeqCst), 3);
        assert_eq!(mailer.delivered.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let mailer = FlakyMailer::new(10);
        assert!(!deliver(&mailer, &email(), fast_policy()).await);
        assert_eq!(mailer.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn disabled_queue_accepts_nothing() {
        let queue = NotificationQueue::disabled();
        assert!(!queue.is_enabled());
        assert!(!queue.enqueue(email()));
    }

    #[tokio::test]
    async fn worker_delivers_queued_email() {
        let mailer = Arc::new(FlakyMailer::new(0));
        let queue = NotificationQueue::spawn(mailer.clone(), 4, fast_policy());

        assert!(queue.enqueue(email()));

        for _ in 0..100 {
            if !mailer.delivered.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(mailer.delivered.lock().unwrap()[0], email());
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(2), Duration::from_millis(2000));
    }
}
