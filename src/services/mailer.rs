use zeroize::Zeroizing;

use crate::config::Config;
use crate::error::{AppError, Result};

const BREVO_SEND_URL: &str = "https://api.brevo.com/v3/smtp/email";

/// Transactional-email client (Brevo). When no API key is configured the
/// mailer runs in mock mode: sends fail and the caller falls back to the
/// developer-visible channel for the code.
#[derive(Clone)]
pub struct Mailer {
    client: reqwest::Client,
    api_key: Option<Zeroizing<String>>,
    sender_email: String,
}

impl Mailer {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.brevo_api_key.clone(),
            sender_email: config.sender_email.clone(),
        }
    }

    /// Whether a provider is configured at all.
    pub fn is_live(&self) -> bool {
        self.api_key.is_some()
    }

    /// Sends the signup verification code to a prospective student.
    ///
    /// # Arguments
    ///
    /// * `email` - The recipient address.
    /// * `first_name` - Used in the greeting.
    /// * `code` - The 4-digit verification code.
    pub async fn send_signup_code(&self, email: &str, first_name: &str, code: &str) -> Result<()> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| AppError::Mail("No email provider configured".to_string()))?;

        let html = format!(
            "<div style=\"font-family:sans-serif;max-width:600px;margin:auto\">\
             <h2>Coursedeck</h2>\
             <p>Hello, {}!</p>\
             <p>Use the verification code below to complete your registration.</p>\
             <p style=\"font-size:32px;font-family:monospace;letter-spacing:4px\"><b>{}</b></p>\
             <p>This code is valid for 5 minutes. If you did not request it, ignore this email.</p>\
             </div>",
            first_name, code
        );

        let payload = sonic_rs::json!({
            "sender": { "name": "Coursedeck", "email": self.sender_email },
            "to": [{ "email": email, "name": first_name }],
            "subject": "Welcome to Coursedeck | Verify Your Email",
            "htmlContent": html,
        });

        let response = self
            .client
            .post(BREVO_SEND_URL)
            .header("api-key", api_key.as_str())
            .header("content-type", "application/json")
            .body(sonic_rs::to_string(&payload).map_err(|e| AppError::Mail(e.to_string()))?)
            .send()
            .await
            .map_err(|e| AppError::Mail(format!("Send failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Mail(format!(
                "Provider returned {}: {}",
                status, body
            )));
        }

        tracing::info!("✅ Verification email sent to {}", email);
        Ok(())
    }
}
