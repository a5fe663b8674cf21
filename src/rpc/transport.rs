//! JSON-RPC transport abstraction and the reqwest-backed HTTP implementation

use crate::error::RpcError;
use crate::rpc::types::{parse_response, Envelope, RpcRequest, RpcResponse};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Issues a single JSON-RPC call against one endpoint URL
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn call(
        &self,
        url: &str,
        request: &RpcRequest,
        timeout: Duration,
    ) -> Result<RpcResponse, RpcError>;
}

/// HTTP POST transport
pub struct HttpTransport {
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new() -> Result<Self, RpcError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("rpc-manager/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RpcError::Transport {
                url: String::new(),
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self::with_client(client))
    }

    /// Use a preconfigured reqwest client (proxy, TLS settings, ...)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            next_id: AtomicU64::new(1),
        }
    }

    fn map_send_error(url: &str, timeout: Duration, e: reqwest::Error) -> RpcError {
        if e.is_timeout() {
            RpcError::Timeout {
                url: url.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }
        } else {
            RpcError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn call(
        &self,
        url: &str,
        request: &RpcRequest,
        timeout: Duration,
    ) -> Result<RpcResponse, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let response = self
            .client
            .post(url)
            .timeout(timeout)
            .json(&Envelope::new(id, request))
            .send()
            .await
            .map_err(|e| Self::map_send_error(url, timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            let message = if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                format!("HTTP {} (rate limited)", status.as_u16())
            } else {
                format!("HTTP {}", status.as_u16())
            };
            return Err(RpcError::Transport {
                url: url.to_string(),
                message,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Self::map_send_error(url, timeout, e))?;

        parse_response(url, &body)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Read one HTTP request (headers plus Content-Length body)
    async fn read_request(socket: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let content_length = text[..end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + content_length {
                    return;
                }
            }
        }
    }

    /// Serve canned `(status line, content type, body)` replies, one per connection
    async fn serve(replies: Vec<(&'static str, &'static str, &'static str)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            for (status, content_type, body) in replies {
                let (mut socket, _) = listener.accept().await.unwrap();
                read_request(&mut socket).await;
                let reply = format!(
                    "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    content_type,
                    body.len(),
                    body
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
        });

        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_http_responses_map_to_errors() {
        let url = serve(vec![
            ("429 Too Many Requests", "text/plain", "slow down"),
            (
                "200 OK",
                "application/json",
                r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32005,"message":"limit exceeded"}}"#,
            ),
            ("200 OK", "text/html", "<html><body>Bad Gateway</body></html>"),
            ("200 OK", "application/json", r#"{"jsonrpc":"2.0","id":4,"result":"0x2a"}"#),
        ])
        .await;

        let transport = HttpTransport::new().unwrap();
        let request = RpcRequest::method("eth_blockNumber");
        let timeout = Duration::from_secs(5);

        match transport.call(&url, &request, timeout).await {
            Err(RpcError::Transport { message, .. }) => {
                assert!(message.contains("429"), "{}", message);
                assert!(message.contains("rate limited"), "{}", message);
            }
            other => panic!("expected transport error, got {:?}", other),
        }

        match transport.call(&url, &request, timeout).await {
            Err(RpcError::Protocol { code, message, .. }) => {
                assert_eq!(code, -32005);
                assert_eq!(message, "limit exceeded");
            }
            other => panic!("expected protocol error, got {:?}", other),
        }

        match transport.call(&url, &request, timeout).await {
            Err(RpcError::Protocol { code, .. }) => {
                assert_eq!(code, crate::rpc::types::INTERNAL_ERROR);
            }
            other => panic!("expected malformed-body error, got {:?}", other),
        }

        let response = transport.call(&url, &request, timeout).await.unwrap();
        assert_eq!(response.as_quantity(), Some(42));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let transport = HttpTransport::new().unwrap();
        // Port 1 on loopback is never listening in test environments
        let err = transport
            .call(
                "http://127.0.0.1:1",
                &RpcRequest::method("eth_blockNumber"),
                Duration::from_secs(2),
            )
            .await
            .unwrap_err();

        assert!(err.is_transport(), "{:?}", err);
        assert_eq!(err.url(), Some("http://127.0.0.1:1"));
    }
}
