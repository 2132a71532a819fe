//! Outgoing customer email: transport setup and template rendering.

use lettre::{
    AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use minijinja::{Environment, context};
use rust_decimal::Decimal;
use std::path::Path;

use crate::{
    config::{EmailConfig, EmailTransportConfig},
    errors::Error,
    repairs::RepairStatus,
};

const REPAIR_STATUS_TEMPLATE: &str = include_str!("../templates/email/repair_status.html");

pub struct EmailService {
    transport: EmailTransport,
    from_email: String,
    from_name: String,
    reply_to: Option<String>,
    templates: Environment<'static>,
}

enum EmailTransport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    File(AsyncFileTransport<Tokio1Executor>),
}

/// Everything the repair status email shows.
#[derive(Debug, Clone)]
pub struct RepairStatusEmail {
    pub to_email: String,
    pub customer_name: String,
    pub company_name: String,
    pub order_number: String,
    pub status: RepairStatus,
    pub device: String,
    pub total: Decimal,
    pub balance: Decimal,
    pub currency: String,
}

impl RepairStatusEmail {
    pub fn subject(&self) -> String {
        match self.status {
            RepairStatus::Repaired => format!("Your repair {} is ready for pickup", self.order_number),
            RepairStatus::Delivered => format!("Your repair {} was delivered", self.order_number),
            other => format!("Your repair {} is now {}", self.order_number, other.label()),
        }
    }
}

impl EmailService {
    pub fn new(config: &EmailConfig) -> Result<Self, Error> {
        let transport = match &config.transport {
            EmailTransportConfig::Smtp {
                host,
                port,
                username,
                password,
                use_tls,
            } => {
                if !use_tls {
                    tracing::warn!("SMTP TLS is disabled - this is not recommended for production");
                }

                let smtp_builder = if *use_tls {
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                } else {
                    Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host))
                }
                .map_err(|e| Error::Internal {
                    operation: format!("create SMTP transport: {e}"),
                })?
                .port(*port)
                .credentials(Credentials::new(username.clone(), password.clone()));

                EmailTransport::Smtp(smtp_builder.build())
            }
            EmailTransportConfig::File { path } => {
                // Development/testing: each message is written to a file
                let emails_dir = Path::new(path);
                if !emails_dir.exists() {
                    std::fs::create_dir_all(emails_dir).map_err(|e| Error::Internal {
                        operation: format!("create emails directory: {e}"),
                    })?;
                }
                EmailTransport::File(AsyncFileTransport::<Tokio1Executor>::new(emails_dir))
            }
        };

        let mut templates = Environment::new();
        templates
            .add_template("repair_status.html", REPAIR_STATUS_TEMPLATE)
            .map_err(|e| Error::Internal {
                operation: format!("load email templates: {e}"),
            })?;

        Ok(Self {
            transport,
            from_email: config.from_email.clone(),
            from_name: config.from_name.clone(),
            reply_to: config.reply_to.clone(),
            templates,
        })
    }

    pub fn render_repair_status(&self, email: &RepairStatusEmail) -> Result<String, Error> {
        let template = self.templates.get_template("repair_status.html").map_err(|e| Error::Internal {
            operation: format!("load repair status template: {e}"),
        })?;

        template
            .render(context! {
                subject => email.subject(),
                customer_name => email.customer_name,
                company_name => email.company_name,
                order_number => email.order_number,
                status => email.status.as_str(),
                device => email.device,
                total => email.total.to_string(),
                balance => email.balance.max(Decimal::ZERO).to_string(),
                balance_due => email.balance > Decimal::ZERO,
                currency => email.currency,
            })
            .map_err(|e| Error::Internal {
                operation: format!("render repair status email: {e}"),
            })
    }

    pub async fn send_repair_status_email(&self, email: &RepairStatusEmail) -> Result<(), Error> {
        let body = self.render_repair_status(email)?;
        self.send_email(&email.to_email, Some(&email.customer_name), &email.subject(), body)
            .await
    }

    async fn send_email(&self, to_email: &str, to_name: Option<&str>, subject: &str, body: String) -> Result<(), Error> {
        let from = format!("{} <{}>", self.from_name, self.from_email)
            .parse::<Mailbox>()
            .map_err(|e| Error::Internal {
                operation: format!("parse from email: {e}"),
            })?;

        let to = match to_name {
            Some(name) => format!("{name} <{to_email}>"),
            None => to_email.to_string(),
        }
        .parse::<Mailbox>()
        .map_err(|e| Error::Internal {
            operation: format!("parse to email: {e}"),
        })?;

        let mut builder = Message::builder().from(from).to(to).subject(subject).header(ContentType::TEXT_HTML);
        if let Some(reply_to) = &self.reply_to {
            let reply_to = reply_to.parse::<Mailbox>().map_err(|e| Error::Internal {
                operation: format!("parse reply-to email: {e}"),
            })?;
            builder = builder.reply_to(reply_to);
        }
        let message = builder.body(body).map_err(|e| Error::Internal {
            operation: format!("build email message: {e}"),
        })?;

        match &self.transport {
            EmailTransport::Smtp(smtp) => {
                smtp.send(message).await.map_err(|e| Error::Internal {
                    operation: format!("send SMTP email: {e}"),
                })?;
            }
            EmailTransport::File(file) => {
                file.send(message).await.map_err(|e| Error::Internal {
                    operation: format!("send file email: {e}"),
                })?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_config(dir: &Path) -> EmailConfig {
        EmailConfig {
            transport: EmailTransportConfig::File {
                path: dir.to_string_lossy().into_owned(),
            },
            ..Default::default()
        }
    }

    fn sample(status: RepairStatus, balance: &str) -> RepairStatusEmail {
        RepairStatusEmail {
            to_email: "ana@example.com".into(),
            customer_name: "Ana".into(),
            company_name: "Fix-It Shop".into(),
            order_number: "OR-000042".into(),
            status,
            device: "iPhone 12".into(),
            total: "120.00".parse().unwrap(),
            balance: balance.parse().unwrap(),
            currency: "USD".into(),
        }
    }

    #[test]
    fn test_repaired_email_mentions_pickup_and_balance() {
        let dir = tempfile::tempdir().unwrap();
        let service = EmailService::new(&file_config(dir.path())).unwrap();

        let email = sample(RepairStatus::Repaired, "70.00");
        assert_eq!(email.subject(), "Your repair OR-000042 is ready for pickup");
        let body = service.render_repair_status(&email).unwrap();
        assert!(body.contains("Hello Ana,"));
        assert!(body.contains("ready for pickup at Fix-It Shop"));
        assert!(body.contains("Balance due:</strong> 70.00 USD"));
    }

    #[test]
    fn test_delivered_email_paid_in_full() {
        let dir = tempfile::tempdir().unwrap();
        let service = EmailService::new(&file_config(dir.path())).unwrap();

        let body = service.render_repair_status(&sample(RepairStatus::Delivered, "0")).unwrap();
        assert!(body.contains("was delivered"));
        assert!(body.contains("Paid in full"));
    }

    #[tokio::test]
    async fn test_file_transport_writes_message() {
        let dir = tempfile::tempdir().unwrap();
        let service = EmailService::new(&file_config(dir.path())).unwrap();

        service
            .send_repair_status_email(&sample(RepairStatus::Repaired, "0"))
            .await
            .unwrap();

        let written = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(written, 1);
    }
}
