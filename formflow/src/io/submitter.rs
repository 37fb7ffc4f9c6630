//! Submission endpoint adapter.
//!
//! The [`Submitter`] trait decouples the submission orchestrator from the
//! HTTP transport. Tests use scripted submitters that return predetermined
//! responses without opening sockets.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::core::analytics::Analytics;
use crate::core::types::FieldMap;

/// JSON body sent to the endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub form_data: FieldMap,
    pub analytics: Analytics,
}

/// Parameters for one submission call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    pub endpoint: String,
    /// Sent as `X-CSRF-Token`.
    pub csrf_token: String,
    pub payload: SubmissionPayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitResponse {
    pub status: u16,
}

impl SubmitResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Abstraction over submission transports.
pub trait Submitter {
    /// Deliver the request. Any HTTP status is `Ok`; `Err` means no response
    /// was received.
    fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse>;
}

/// Submitter that POSTs JSON over HTTP.
pub struct HttpSubmitter {
    agent: ureq::Agent,
}

impl HttpSubmitter {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self { agent }
    }
}

impl Submitter for HttpSubmitter {
    #[instrument(skip_all, fields(endpoint = %request.endpoint))]
    fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse> {
        let body =
            serde_json::to_string(&request.payload).context("serialize submission payload")?;
        let result = self
            .agent
            .post(&request.endpoint)
            .set("Content-Type", "application/json")
            .set("X-CSRF-Token", &request.csrf_token)
            .send_string(&body);
        match result {
            Ok(response) => {
                debug!(status = response.status(), "submission accepted");
                Ok(SubmitResponse {
                    status: response.status(),
                })
            }
            Err(ureq::Error::Status(status, _)) => {
                warn!(status, "submission rejected");
                Ok(SubmitResponse { status })
            }
            Err(ureq::Error::Transport(err)) => {
                warn!(error = %err, "submission transport error");
                Err(anyhow!("POST {}: {}", request.endpoint, err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::FieldValue;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    fn request(endpoint: String) -> SubmitRequest {
        let mut form_data = FieldMap::new();
        form_data.insert("email".to_string(), FieldValue::text("jane@example.com"));
        SubmitRequest {
            endpoint,
            csrf_token: "tok-123".to_string(),
            payload: SubmissionPayload {
                form_data,
                analytics: Analytics::new(0),
            },
        }
    }

    /// Serve one request with `status_line`, returning the raw request text.
    fn serve_once(status_line: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream);
            let mut head = String::new();
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).expect("read line");
                if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = value.trim().parse().expect("content length");
                }
                let done = line == "\r\n";
                head.push_str(&line);
                if done {
                    break;
                }
            }
            let mut body = vec![0u8; content_length];
            reader.read_exact(&mut body).expect("read body");
            let response = format!("{status_line}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
            reader
                .get_mut()
                .write_all(response.as_bytes())
                .expect("write response");
            format!("{head}{}", String::from_utf8_lossy(&body))
        });
        (format!("http://{addr}/api/submit"), handle)
    }

    #[test]
    fn posts_json_with_csrf_header() {
        let (endpoint, server) = serve_once("HTTP/1.1 200 OK");
        let submitter = HttpSubmitter::new(Duration::from_secs(5));
        let response = submitter.submit(&request(endpoint)).expect("submit");
        assert!(response.is_success());

        let raw = server.join().expect("server");
        let lower = raw.to_ascii_lowercase();
        assert!(raw.starts_with("POST /api/submit"));
        assert!(lower.contains("x-csrf-token: tok-123"));
        assert!(lower.contains("content-type: application/json"));
        assert!(raw.contains(r#""formData":{"email":"jane@example.com"}"#));
        assert!(raw.contains(r#""analytics":{"startTime":0,"#));
    }

    #[test]
    fn error_status_is_a_response_not_an_error() {
        let (endpoint, server) = serve_once("HTTP/1.1 500 Internal Server Error");
        let submitter = HttpSubmitter::new(Duration::from_secs(5));
        let response = submitter.submit(&request(endpoint)).expect("submit");
        assert_eq!(response.status, 500);
        assert!(!response.is_success());
        server.join().expect("server");
    }

    #[test]
    fn refused_connection_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);
        let submitter = HttpSubmitter::new(Duration::from_secs(5));
        let err = submitter
            .submit(&request(format!("http://{addr}/api/submit")))
            .expect_err("transport error");
        assert!(err.to_string().contains("/api/submit"));
    }
}
