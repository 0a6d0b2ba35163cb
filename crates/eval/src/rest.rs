//! REST collaborator used by `GET`/`POST`/`PUT`/`DELETE` terms.
//!
//! The evaluator treats the collaborator as a blocking function from
//! `(url, method, params)` to the response body. `UreqRestClient` is the
//! network implementation; tests inject their own.

use arbiter_core::RestMethod;
use std::time::Duration;

use crate::value::Value;

/// Failure of a single REST call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RestError {
    /// The server answered with a non-2xx status.
    #[error("HTTP status {status}")]
    Status { status: u16 },
    /// Connection, timeout or body read failure.
    #[error("{message}")]
    Transport { message: String },
    #[error("REST calls are disabled")]
    Disabled,
}

/// Performs the external call of a REST term.
pub trait RestClient: Send + Sync {
    fn call(
        &self,
        url: &str,
        method: RestMethod,
        params: &[(String, Value)],
    ) -> Result<String, RestError>;
}

/// Rejects every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRestClient;

impl RestClient for NoRestClient {
    fn call(
        &self,
        _url: &str,
        _method: RestMethod,
        _params: &[(String, Value)],
    ) -> Result<String, RestError> {
        Err(RestError::Disabled)
    }
}

// ──────────────────────────────────────────────
// ureq client
// ──────────────────────────────────────────────

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);
pub const DEFAULT_USER_AGENT: &str = concat!("arbiter/", env!("CARGO_PKG_VERSION"));

/// HTTP client backed by a `ureq` agent.
///
/// - `GET`/`DELETE`: parameters are sent as query pairs.
/// - `POST`/`PUT`: parameters are sent as a JSON object body.
///
/// Every call is bounded by the agent's global timeout.
pub struct UreqRestClient {
    agent: ureq::Agent,
}

impl Default for UreqRestClient {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)
    }
}

impl UreqRestClient {
    pub fn new(timeout: Duration, user_agent: &str) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .user_agent(user_agent)
            .build()
            .into();
        UreqRestClient { agent }
    }
}

impl RestClient for UreqRestClient {
    fn call(
        &self,
        url: &str,
        method: RestMethod,
        params: &[(String, Value)],
    ) -> Result<String, RestError> {
        let response = match method {
            RestMethod::Get | RestMethod::Delete => {
                let mut request = if method == RestMethod::Get {
                    self.agent.get(url)
                } else {
                    self.agent.delete(url)
                };
                for (name, value) in params {
                    request = request.query(name, value.render());
                }
                request.call()
            }
            RestMethod::Post | RestMethod::Put => {
                let body = json_body(params);
                let request = if method == RestMethod::Post {
                    self.agent.post(url)
                } else {
                    self.agent.put(url)
                };
                request.send_json(&body)
            }
        };

        let mut response = response.map_err(rest_error)?;
        response.body_mut().read_to_string().map_err(rest_error)
    }
}

fn json_body(params: &[(String, Value)]) -> serde_json::Value {
    let mut body = serde_json::Map::new();
    for (name, value) in params {
        body.insert(name.clone(), value.to_json());
    }
    serde_json::Value::Object(body)
}

fn rest_error(e: ureq::Error) -> RestError {
    match e {
        ureq::Error::StatusCode(status) => RestError::Status { status },
        other => RestError::Transport {
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// Answer one HTTP request on a loopback port and hand back what was
    /// received: the request head (lowercased header names) and the body.
    fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, JoinHandle<(String, String)>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut head = String::new();
            let mut content_length = 0usize;
            let mut chunked = false;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                let lower = line.to_ascii_lowercase();
                if let Some(v) = lower.strip_prefix("content-length:") {
                    content_length = v.trim().parse().unwrap();
                }
                if lower.starts_with("transfer-encoding:") && lower.contains("chunked") {
                    chunked = true;
                }
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                head.push_str(&lower);
            }

            let mut received = Vec::new();
            if chunked {
                loop {
                    let mut size = String::new();
                    reader.read_line(&mut size).unwrap();
                    let n = usize::from_str_radix(size.trim(), 16).unwrap();
                    let mut chunk = vec![0; n + 2];
                    reader.read_exact(&mut chunk).unwrap();
                    if n == 0 {
                        break;
                    }
                    received.extend_from_slice(&chunk[..n]);
                }
            } else {
                received.resize(content_length, 0);
                reader.read_exact(&mut received).unwrap();
            }

            write!(
                stream,
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            )
            .unwrap();
            (head, String::from_utf8(received).unwrap())
        });
        (base, handle)
    }

    fn client() -> UreqRestClient {
        UreqRestClient::new(Duration::from_secs(5), "arbiter-test/1")
    }

    fn params() -> Vec<(String, Value)> {
        vec![
            ("who".to_string(), Value::String("a b&c".into())),
            ("n".to_string(), Value::Number(3)),
        ]
    }

    #[test]
    fn no_client_refuses() {
        assert_eq!(
            NoRestClient.call("http://x", RestMethod::Get, &[]),
            Err(RestError::Disabled)
        );
    }

    #[test]
    fn json_body_keeps_parameter_order() {
        let body = json_body(&[
            ("zeta".to_string(), Value::Number(1)),
            ("alpha".to_string(), Value::String("a".into())),
        ]);
        assert_eq!(body.to_string(), r#"{"zeta":1,"alpha":"a"}"#);
    }

    #[test]
    fn get_sends_parameters_as_query_pairs() {
        let (base, server) = serve_once("200 OK", "admin");
        let out = client().call(&format!("{}/roles", base), RestMethod::Get, &params());
        let (head, body) = server.join().unwrap();

        assert_eq!(out, Ok("admin".to_string()));
        assert!(
            head.starts_with("get /roles?who=a%20b%26c&n=3 http/1.1\r\n"),
            "{}",
            head
        );
        assert!(head.contains("user-agent: arbiter-test/1"), "{}", head);
        assert!(body.is_empty());
    }

    #[test]
    fn delete_sends_parameters_as_query_pairs() {
        let (base, server) = serve_once("200 OK", "");
        let out = client().call(&format!("{}/roles", base), RestMethod::Delete, &params());
        let (head, _) = server.join().unwrap();

        assert_eq!(out, Ok(String::new()));
        assert!(
            head.starts_with("delete /roles?who=a%20b%26c&n=3 http/1.1\r\n"),
            "{}",
            head
        );
    }

    #[test]
    fn post_sends_parameters_as_a_json_body() {
        let (base, server) = serve_once("200 OK", "viewer");
        let out = client().call(&format!("{}/roles", base), RestMethod::Post, &params());
        let (head, body) = server.join().unwrap();

        assert_eq!(out, Ok("viewer".to_string()));
        assert!(head.starts_with("post /roles http/1.1\r\n"), "{}", head);
        assert!(head.contains("content-type: application/json"), "{}", head);
        let sent: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(sent, serde_json::json!({"who": "a b&c", "n": 3}));
    }

    #[test]
    fn put_sends_parameters_as_a_json_body() {
        let (base, server) = serve_once("200 OK", "ok");
        let out = client().call(&format!("{}/roles/7", base), RestMethod::Put, &params());
        let (head, body) = server.join().unwrap();

        assert_eq!(out, Ok("ok".to_string()));
        assert!(head.starts_with("put /roles/7 http/1.1\r\n"), "{}", head);
        let sent: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(sent["who"], "a b&c");
    }

    #[test]
    fn non_success_status_is_a_status_error() {
        let (base, server) = serve_once("503 Service Unavailable", "busy");
        let out = client().call(&format!("{}/roles", base), RestMethod::Get, &[]);
        server.join().unwrap();
        assert_eq!(out, Err(RestError::Status { status: 503 }));
    }

    #[test]
    fn refused_connection_is_a_transport_error() {
        let addr = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let out = client().call(&format!("http://{}/roles", addr), RestMethod::Get, &[]);
        assert!(matches!(out, Err(RestError::Transport { .. })), "{:?}", out);
    }
}
