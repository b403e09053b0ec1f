//! HTTP client for the remote data API.
//!
//! Only the session-result endpoint lives here:
//! `POST {base_url}/sessions/{kind}` with the [`SessionResult`] as JSON.
//! Transport errors and 5xx responses are retried with linear backoff; any
//! other non-success status fails immediately.

use std::time::Duration;

use reqwest::blocking::Client;

use crate::error::SubmitError;
use crate::sink::SessionSink;
use crate::storage::{ApiConfig, Database};
use crate::timer::{SessionKind, SessionResult};

pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
    max_attempts: u32,
    backoff: Duration,
}

impl ApiClient {
    /// Build a client from config. `token` is sent as a bearer token.
    ///
    /// Must not be called from inside an async context; the blocking client
    /// owns its own runtime.
    pub fn new(config: &ApiConfig, token: Option<String>) -> Result<Self, SubmitError> {
        let base_url = config
            .base_url
            .as_deref()
            .map(|u| u.trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .ok_or(SubmitError::NotConfigured)?;
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SubmitError::Transport {
                url: base_url.clone(),
                attempts: 0,
                message: e.to_string(),
            })?;
        Ok(Self {
            http,
            base_url,
            token,
            max_attempts: config.max_attempts.max(1),
            backoff: Duration::from_millis(config.backoff_ms),
        })
    }

    pub fn endpoint(&self, kind: SessionKind) -> String {
        format!("{}/sessions/{}", self.base_url, kind.as_str())
    }

    /// Push every locally logged result the API hasn't accepted yet.
    /// Stops at the first failure; returns how many were synced.
    pub fn flush_pending(&self, db: &Database) -> Result<usize, SubmitError> {
        let mut synced = 0;
        for stored in db.unsynced_results()? {
            self.submit_session_result(stored.result.kind, &stored.result)?;
            db.mark_synced(stored.id)?;
            synced += 1;
        }
        Ok(synced)
    }
}

impl SessionSink for ApiClient {
    fn name(&self) -> &str {
        "api"
    }

    fn submit_session_result(
        &self,
        kind: SessionKind,
        result: &SessionResult,
    ) -> Result<(), SubmitError> {
        let url = self.endpoint(kind);
        let mut last_error = String::new();
        let mut last_rejection = None;

        for attempt in 1..=self.max_attempts {
            let mut request = self.http.post(&url).json(result);
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }

            match request.send() {
                Ok(response) if response.status().is_success() => {
                    tracing::info!(%url, attempt, "session result submitted");
                    return Ok(());
                }
                Ok(response) if response.status().is_server_error() => {
                    let status = response.status().as_u16();
                    let body = response.text().unwrap_or_default();
                    tracing::warn!(%url, attempt, status, "server error submitting session result");
                    last_error = format!("server returned {status}");
                    last_rejection = Some((status, body));
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = response.text().unwrap_or_default();
                    tracing::warn!(%url, status, "session result rejected");
                    return Err(SubmitError::Rejected { status, body });
                }
                Err(e) => {
                    tracing::warn!(%url, attempt, error = %e, "transport error submitting session result");
                    last_error = e.to_string();
                    last_rejection = None;
                }
            }

            if attempt < self.max_attempts {
                std::thread::sleep(self.backoff * attempt);
            }
        }

        match last_rejection {
            Some((status, body)) => Err(SubmitError::Rejected { status, body }),
            None => Err(SubmitError::Transport {
                url,
                attempts: self.max_attempts,
                message: last_error,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_base_url_is_not_configured() {
        let config = ApiConfig::default();
        assert!(matches!(
            ApiClient::new(&config, None),
            Err(SubmitError::NotConfigured)
        ));
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        let config = ApiConfig {
            base_url: Some("https://api.example.com/v1/".into()),
            ..ApiConfig::default()
        };
        let client = ApiClient::new(&config, None).unwrap();
        assert_eq!(
            client.endpoint(SessionKind::PtExercise),
            "https://api.example.com/v1/sessions/pt_exercise"
        );
    }
}
