//! Direct mode: synchronous `POST <job_url>` and wait for the job's answer.

use async_trait::async_trait;
use chrono::Utc;
use std::str;
use std::time::Duration;

use super::token::TokenResolver;
use super::Trigger;
use crate::config::JobConfig;
use crate::error::{ErrorKind, JobError};
use crate::report::RunOutcome;
use crate::retry::TransferError;

#[derive(Clone)]
pub struct DirectTrigger {
    base_url: Option<String>,
    tokens: TokenResolver,
}

impl DirectTrigger {
    pub fn new(base_url: Option<String>, tokens: TokenResolver) -> Self {
        Self { base_url, tokens }
    }
}

/// Blocking POST with an empty JSON object; returns status and body.
fn post_json(
    url: &str,
    token: Option<&str>,
    timeout: Duration,
) -> Result<(u32, Vec<u8>), TransferError> {
    let mut body = Vec::new();
    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.post(true)?;
    easy.post_fields_copy(b"{}")?;
    easy.follow_location(true)?;
    easy.connect_timeout(Duration::from_secs(30).min(timeout))?;
    easy.timeout(timeout)?;

    let mut list = curl::easy::List::new();
    list.append("Content-Type: application/json")?;
    if let Some(t) = token {
        list.append(&format!("Authorization: Bearer {}", t))?;
    }
    easy.http_headers(list)?;

    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }
    let status = easy.response_code()?;
    Ok((status, body))
}

/// Response body as a payload: JSON when it parses, `{}` when empty, else a string.
pub(crate) fn payload_from_body(body: &[u8]) -> serde_json::Value {
    if body.iter().all(u8::is_ascii_whitespace) {
        return serde_json::json!({});
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(body).into_owned()))
}

fn error_body(body: &[u8]) -> String {
    String::from_utf8_lossy(body).into_owned()
}

#[async_trait]
impl Trigger for DirectTrigger {
    async fn invoke(&self, job: &JobConfig) -> RunOutcome {
        let started = Utc::now();
        let Some(url) = job.invocation_url(self.base_url.as_deref()) else {
            return RunOutcome::failed(
                &job.name,
                started,
                JobError::new(ErrorKind::Configuration, "no invocation url"),
            );
        };
        let timeout = job.timeout();
        let tokens = self.tokens.clone();
        tracing::info!(job = %job.name, url = %url, "invoking");

        let call = tokio::task::spawn_blocking(move || {
            let token = tokens.resolve();
            post_json(&url, token.as_deref(), timeout)
        });
        // Outer bound in case the blocking call outlives curl's own timer.
        let result = match tokio::time::timeout(timeout + Duration::from_secs(1), call).await {
            Err(_) => Err(TransferError::Timeout(timeout)),
            Ok(Err(join)) => {
                return RunOutcome::failed(&job.name, started, JobError::internal(join.to_string()))
            }
            Ok(Ok(r)) => r,
        };

        match result {
            Ok((status, body)) if (200..300).contains(&status) => {
                tracing::info!(job = %job.name, status, "job succeeded");
                RunOutcome::success(&job.name, started, payload_from_body(&body))
                    .with_http_status(status)
            }
            Ok((status, body)) => {
                let message = format!("HTTP {}: {}", status, error_body(&body));
                tracing::warn!(job = %job.name, status, "job failed");
                RunOutcome::failed(&job.name, started, JobError::network(message))
                    .with_http_status(status)
            }
            Err(e) => {
                let err = match e.kind() {
                    ErrorKind::Timeout => {
                        JobError::timeout(format!("no response within {}s", timeout.as_secs()))
                    }
                    _ => JobError::from(&e),
                };
                tracing::warn!(job = %job.name, error = %err, "invocation failed");
                RunOutcome::failed(&job.name, started, err)
            }
        }
    }
}
