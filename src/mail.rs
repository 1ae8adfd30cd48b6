//! Best-effort mail dispatch to the external notification service.
//!
//! The service builds and delivers the actual message; this side only posts
//! the recipient and the one-time token. Dispatch runs on a detached task
//! whose failures are logged and never surfaced to the request that
//! triggered them.

use tracing::{debug, warn};

/// Which message the service should send. Doubles as the URL path segment.
#[derive(Debug, Clone, Copy)]
enum MailKind {
    EmailVerification,
    PasswordReset,
}

impl MailKind {
    fn path(&self) -> &'static str {
        match self {
            MailKind::EmailVerification => "verify-email",
            MailKind::PasswordReset => "reset-password",
        }
    }
}

/// Client for the mail service. Cheap to clone; the inner reqwest client is
/// already reference-counted.
#[derive(Clone)]
pub struct MailDispatcher {
    client: reqwest::Client,
    service_url: Option<String>,
    service_token: String,
}

impl MailDispatcher {
    pub fn new(service_url: Option<String>, service_token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            service_url: service_url.map(|url| url.trim_end_matches('/').to_string()),
            service_token: service_token.unwrap_or_default(),
        }
    }

    /// A dispatcher with no service configured. Every send is a logged no-op.
    pub fn disabled() -> Self {
        Self::new(None, None)
    }

    /// Ask the service to send a verification link containing `token`.
    pub fn dispatch_verification(&self, email: &str, token: &str) {
        self.dispatch(MailKind::EmailVerification, email, token);
    }

    /// Ask the service to send a password-reset link containing `token`.
    pub fn dispatch_password_reset(&self, email: &str, token: &str) {
        self.dispatch(MailKind::PasswordReset, email, token);
    }

    fn dispatch(&self, kind: MailKind, email: &str, token: &str) {
        let Some(base) = self.service_url.clone() else {
            debug!(email = %email, kind = kind.path(), "Mail service not configured, skipping dispatch");
            return;
        };

        let url = format!("{}/{}/{}/{}", base, kind.path(), token, self.service_token);
        let client = self.client.clone();
        let email = email.to_string();

        tokio::spawn(async move {
            let result = client
                .post(&url)
                .json(&serde_json::json!({ "email": email }))
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {}
                Ok(response) => warn!(
                    email = %email,
                    kind = kind.path(),
                    status = %response.status(),
                    "Mail service rejected dispatch"
                ),
                Err(e) => warn!(
                    email = %email,
                    kind = kind.path(),
                    error = %e,
                    "Mail dispatch failed"
                ),
            }
        });
    }
}
