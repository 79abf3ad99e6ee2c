//!
//! # Account Emails
//!
//! Sends the welcome and cancellation emails through the SendGrid v3 API.
//! Without a configured API key the mailer degrades to logging the message,
//! so local development and tests never need network access.
//!
//! Delivery is fire-and-forget: the request that triggered the email has
//! already succeeded, and a mail failure is logged rather than surfaced.

use serde_json::json;

const SENDGRID_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

#[derive(Clone)]
pub enum Mailer {
    Sendgrid {
        client: reqwest::Client,
        api_key: String,
        from: String,
    },
    Log,
}

impl Mailer {
    /// Builds a mailer from `SENDGRID_API_KEY` and `MAIL_FROM`; falls back to
    /// the logging variant when either is missing.
    pub fn from_env() -> Self {
        match (std::env::var("SENDGRID_API_KEY"), std::env::var("MAIL_FROM")) {
            (Ok(api_key), Ok(from)) if !api_key.is_empty() && !from.is_empty() => {
                Mailer::Sendgrid {
                    client: reqwest::Client::new(),
                    api_key,
                    from,
                }
            }
            _ => {
                log::info!("SENDGRID_API_KEY or MAIL_FROM not set, account emails are logged only");
                Mailer::Log
            }
        }
    }

    pub fn send_welcome(&self, email: &str, name: &str) {
        self.send(
            email,
            "Thanks for joining in!",
            format!(
                "Welcome to the app, {}. Let me know how you get along with the app.",
                name
            ),
        );
    }

    pub fn send_cancellation(&self, email: &str, name: &str) {
        self.send(
            email,
            "Sorry to see you go!",
            format!("Goodbye, {}. I hope to see you back sometime soon.", name),
        );
    }

    fn send(&self, to: &str, subject: &str, body: String) {
        match self {
            Mailer::Log => {
                log::info!("email to {}: {} - {}", to, subject, body);
            }
            Mailer::Sendgrid {
                client,
                api_key,
                from,
            } => {
                let client = client.clone();
                let api_key = api_key.clone();
                let payload = sendgrid_payload(from, to, subject, &body);
                let to = to.to_string();
                actix_web::rt::spawn(async move {
                    let result = client
                        .post(SENDGRID_SEND_URL)
                        .bearer_auth(api_key)
                        .json(&payload)
                        .send()
                        .await;
                    match result {
                        Ok(res) if res.status().is_success() => {
                            log::debug!("sent email to {}", to);
                        }
                        Ok(res) => {
                            log::error!("sendgrid rejected email to {}: {}", to, res.status());
                        }
                        Err(err) => {
                            log::error!("failed to send email to {}: {}", to, err);
                        }
                    }
                });
            }
        }
    }
}

fn sendgrid_payload(from: &str, to: &str, subject: &str, body: &str) -> serde_json::Value {
    json!({
        "personalizations": [{ "to": [{ "email": to }] }],
        "from": { "email": from },
        "subject": subject,
        "content": [{ "type": "text/plain", "value": body }]
    })
}
