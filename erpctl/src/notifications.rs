//! Background delivery of customer emails.
//!
//! Request handlers never talk to SMTP. They enqueue a [`NotificationEvent`] through the
//! cloneable [`Notifier`] after their transaction commits, and a single dispatcher task drains
//! the queue and sends the emails. A full queue drops the event with a warning rather than
//! blocking the request.
//!
//! In-app notifications are different: they are rows written inside the request's own
//! transaction (see [`crate::db::handlers::Notifications`]).

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::email::{EmailService, RepairStatusEmail};

#[derive(Debug, Clone)]
pub enum NotificationEvent {
    RepairStatusChanged(RepairStatusEmail),
}

impl NotificationEvent {
    fn kind(&self) -> &'static str {
        match self {
            NotificationEvent::RepairStatusChanged(_) => "repair_status",
        }
    }
}

/// Handle for enqueueing notifications. Disabled notifiers accept and discard events.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: Option<mpsc::Sender<NotificationEvent>>,
}

impl Notifier {
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Enqueue without waiting. Returns whether the event was accepted.
    pub fn notify(&self, event: NotificationEvent) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };
        let kind = event.kind();
        match tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(kind, "Notification queue full, dropping event");
                metrics::counter!("erpctl_notifications_dropped_total", "kind" => kind).increment(1);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!(kind, "Notification dispatcher stopped, dropping event");
                false
            }
        }
    }
}

pub struct NotificationDispatcher {
    rx: mpsc::Receiver<NotificationEvent>,
    email: EmailService,
}

impl NotificationDispatcher {
    /// Build the dispatcher and its notifier. With repair emails disabled, or if the email
    /// transport cannot be set up, the notifier is disabled and no dispatcher is returned.
    pub fn from_config(config: &Config) -> (Notifier, Option<Self>) {
        if !config.notifications.repair_emails {
            tracing::info!("Repair emails disabled");
            return (Notifier::disabled(), None);
        }
        let email = match EmailService::new(&config.email) {
            Ok(svc) => svc,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create email service, disabling repair emails");
                return (Notifier::disabled(), None);
            }
        };
        let (tx, rx) = mpsc::channel(config.notifications.queue_capacity.max(1));
        (Notifier { tx: Some(tx) }, Some(Self { rx, email }))
    }

    /// Deliver events until cancelled, then drain whatever is already queued.
    pub async fn run(mut self, shutdown: CancellationToken) {
        tracing::info!("Starting notification dispatcher");
        loop {
            tokio::select! {
                event = self.rx.recv() => match event {
                    Some(event) => self.deliver(event).await,
                    None => break,
                },
                _ = shutdown.cancelled() => {
                    self.rx.close();
                    while let Some(event) = self.rx.recv().await {
                        self.deliver(event).await;
                    }
                    break;
                }
            }
        }
        tracing::info!("Notification dispatcher shut down");
    }

    async fn deliver(&self, event: NotificationEvent) {
        match event {
            NotificationEvent::RepairStatusChanged(email) => match self.email.send_repair_status_email(&email).await {
                Ok(()) => {
                    tracing::info!(order_number = %email.order_number, status = %email.status, "Sent repair status email");
                    metrics::counter!("erpctl_emails_sent_total", "kind" => "repair_status").increment(1);
                }
                Err(e) => {
                    tracing::warn!(order_number = %email.order_number, error = %e, "Failed to send repair status email");
                    metrics::counter!("erpctl_emails_failed_total", "kind" => "repair_status").increment(1);
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmailTransportConfig;
    use crate::repairs::RepairStatus;
    use crate::test_utils::create_test_config;

    fn event(n: u32) -> NotificationEvent {
        NotificationEvent::RepairStatusChanged(RepairStatusEmail {
            to_email: "ana@example.com".into(),
            customer_name: "Ana".into(),
            company_name: "Fix-It".into(),
            order_number: format!("OR-{n:06}"),
            status: RepairStatus::Repaired,
            device: "Laptop".into(),
            total: "10.00".parse().unwrap(),
            balance: "0".parse().unwrap(),
            currency: "USD".into(),
        })
    }

    #[test]
    fn test_disabled_notifier_discards() {
        assert!(!Notifier::disabled().notify(event(1)));
    }

    #[test]
    fn test_disabled_by_config() {
        let mut config = create_test_config();
        config.notifications.repair_emails = false;
        let (notifier, dispatcher) = NotificationDispatcher::from_config(&config);
        assert!(dispatcher.is_none());
        assert!(!notifier.notify(event(1)));
    }

    #[tokio::test]
    async fn test_queue_full_drops() {
        let mut config = create_test_config();
        config.notifications.queue_capacity = 1;
        let (notifier, _dispatcher) = NotificationDispatcher::from_config(&config);
        assert!(notifier.notify(event(1)));
        assert!(!notifier.notify(event(2)));
    }

    #[tokio::test]
    async fn test_dispatcher_delivers_and_drains_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = create_test_config();
        config.email.transport = EmailTransportConfig::File {
            path: dir.path().to_string_lossy().into_owned(),
        };
        let (notifier, dispatcher) = NotificationDispatcher::from_config(&config);
        let dispatcher = dispatcher.unwrap();

        assert!(notifier.notify(event(1)));
        assert!(notifier.notify(event(2)));

        let shutdown = CancellationToken::new();
        shutdown.cancel();
        dispatcher.run(shutdown).await;

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }
}
