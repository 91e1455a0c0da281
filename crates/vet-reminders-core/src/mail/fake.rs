//! In-memory transport for tests and dry runs.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{MailError, MailTransport, OutgoingMail};

#[derive(Default)]
struct FakeState {
    sent: Vec<OutgoingMail>,
    attempts: usize,
    fail_sends: bool,
    fail_verify: bool,
    delay: Option<Duration>,
    shut_down: bool,
}

/// Records every message; failures and latency can be injected.
#[derive(Clone, Default)]
pub struct FakeMailer {
    inner: Arc<Mutex<FakeState>>,
}

impl FakeMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages delivered so far.
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.state(|s| s.sent.clone())
    }

    /// Send calls made so far, including failed ones.
    pub fn attempts(&self) -> usize {
        self.state(|s| s.attempts)
    }

    pub fn set_send_fails(&self, fails: bool) {
        self.state(|s| s.fail_sends = fails);
    }

    pub fn set_verify_fails(&self, fails: bool) {
        self.state(|s| s.fail_verify = fails);
    }

    /// Delay every send, e.g. to exercise dispatch timeouts.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.state(|s| s.delay = delay);
    }

    pub fn is_shut_down(&self) -> bool {
        self.state(|s| s.shut_down)
    }

    fn state<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

#[async_trait]
impl MailTransport for FakeMailer {
    fn name(&self) -> &str {
        "fake"
    }

    async fn verify(&self) -> Result<(), MailError> {
        if self.state(|s| s.fail_verify) {
            return Err(MailError::Unreachable("fake relay is down".into()));
        }
        Ok(())
    }

    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let delay = self.state(|s| {
            s.attempts += 1;
            s.delay
        });
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.state(|s| {
            if s.fail_sends {
                return Err(MailError::Rejected {
                    status: 503,
                    body: "fake relay rejected message".into(),
                });
            }
            s.sent.push(mail.clone());
            Ok(())
        })
    }

    async fn shutdown(&self) {
        self.state(|s| s.shut_down = true);
    }
}
