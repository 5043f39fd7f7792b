//! Ollama chat API gateway.

use crate::llm::{CompletionGateway, CompletionRequest, GatewayError, TaskKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Connection settings for [`OllamaGateway`].
#[derive(Debug, Clone)]
pub struct OllamaGatewayConfig {
    pub ollama_url: String,
    pub model_name: String,
    /// Model used for [`TaskKind::ComplexReasoning`]; falls back to `model_name`.
    pub reasoning_model: Option<String>,
}

impl Default for OllamaGatewayConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model_name: "llama3.2:latest".to_string(),
            reasoning_model: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Ollama chat API request.
#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Ollama chat API response.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Gateway backed by a local or remote Ollama server.
pub struct OllamaGateway {
    config: OllamaGatewayConfig,
    http_client: reqwest::Client,
}

impl OllamaGateway {
    pub fn new(config: OllamaGatewayConfig) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn model_for(&self, kind: TaskKind) -> &str {
        match kind {
            TaskKind::ComplexReasoning => self
                .config
                .reasoning_model
                .as_deref()
                .unwrap_or(&self.config.model_name),
            TaskKind::Quick => &self.config.model_name,
        }
    }
}

#[async_trait]
impl CompletionGateway for OllamaGateway {
    async fn complete(&self, request: CompletionRequest) -> Result<String, GatewayError> {
        let url = format!("{}/api/chat", self.config.ollama_url.trim_end_matches('/'));
        let model = self.model_for(request.task_kind);

        let body = OllamaChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_prompt,
                },
            ],
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        debug!(
            "Sending chat request to {} ({} prompt chars)",
            model,
            request.user_prompt.len()
        );

        let response = self
            .http_client
            .post(&url)
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout(request.timeout)
                } else if e.is_connect() {
                    GatewayError::Connect {
                        url: self.config.ollama_url.clone(),
                    }
                } else {
                    GatewayError::Transport(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status { status, body });
        }

        let chat_response: OllamaChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout(request.timeout)
            } else {
                GatewayError::InvalidResponse(e.to_string())
            }
        })?;

        let content = chat_response.message.content;
        if content.trim().is_empty() {
            return Err(GatewayError::EmptyAnswer);
        }

        Ok(content)
    }

    fn model_name(&self) -> &str {
        self.model_for(TaskKind::ComplexReasoning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    fn request() -> CompletionRequest {
        CompletionRequest {
            task_kind: TaskKind::ComplexReasoning,
            system_prompt: "You are a structural engineer.".to_string(),
            user_prompt: "Check the slab.".to_string(),
            temperature: 0.5,
            max_tokens: 256,
            timeout: Duration::from_secs(5),
        }
    }

    fn gateway_at(ollama_url: String) -> OllamaGateway {
        OllamaGateway {
            config: OllamaGatewayConfig {
                ollama_url,
                ..OllamaGatewayConfig::default()
            },
            http_client: reqwest::Client::builder().no_proxy().build().unwrap(),
        }
    }

    /// Accept one connection, answer it with a canned response and hand back
    /// the request body.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request_body = read_request_body(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            request_body
        });

        (url, handle)
    }

    async fn read_request_body(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return String::new();
            }
            buf.extend_from_slice(&chunk[..n]);

            let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let headers = String::from_utf8_lossy(&buf[..end]).to_string();
            let length = headers
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);

            let body_start = end + 4;
            if buf.len() >= body_start + length {
                return String::from_utf8_lossy(&buf[body_start..body_start + length]).to_string();
            }
        }
    }

    #[test]
    fn test_gateway_config_default() {
        let config = OllamaGatewayConfig::default();
        assert_eq!(config.model_name, "llama3.2:latest");
        assert!(config.reasoning_model.is_none());
    }

    #[test]
    fn test_reasoning_model_routing() {
        let gateway = OllamaGateway::new(OllamaGatewayConfig {
            reasoning_model: Some("qwen2.5:32b".to_string()),
            ..OllamaGatewayConfig::default()
        })
        .unwrap();

        assert_eq!(gateway.model_for(TaskKind::ComplexReasoning), "qwen2.5:32b");
        assert_eq!(gateway.model_for(TaskKind::Quick), "llama3.2:latest");
        assert_eq!(gateway.model_name(), "qwen2.5:32b");
    }

    #[test]
    fn test_chat_request_serialization() {
        let body = OllamaChatRequest {
            model: "llama3.2:latest",
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "sys",
                },
                ChatMessage {
                    role: "user",
                    content: "usr",
                },
            ],
            stream: false,
            options: OllamaOptions {
                temperature: 0.5,
                num_predict: 256,
            },
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "llama3.2:latest");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["temperature"], 0.5);
        assert_eq!(json["options"]["num_predict"], 256);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "usr");
    }

    #[tokio::test]
    async fn test_successful_chat_round() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"model":"llama3.2:latest","message":{"role":"assistant","content":"Slab is fine."},"done":true}"#,
        )
        .await;

        let answer = gateway_at(url).complete(request()).await.unwrap();
        assert_eq!(answer, "Slab is fine.");

        let sent: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(sent["model"], "llama3.2:latest");
        assert_eq!(sent["stream"], false);
        assert_eq!(sent["options"]["temperature"], 0.5);
        assert_eq!(sent["options"]["num_predict"], 256);
        assert_eq!(sent["messages"][0]["role"], "system");
        assert_eq!(sent["messages"][0]["content"], "You are a structural engineer.");
        assert_eq!(sent["messages"][1]["role"], "user");
        assert_eq!(sent["messages"][1]["content"], "Check the slab.");
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let (url, _server) =
            serve_once("500 Internal Server Error", r#"{"error":"model crashed"}"#).await;

        let err = gateway_at(url).complete(request()).await.unwrap_err();
        match err {
            GatewayError::Status { status, body } => {
                assert_eq!(status, 500);
                assert!(body.contains("model crashed"));
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_blank_answer_is_rejected() {
        let (url, _server) = serve_once("200 OK", r#"{"message":{"content":"  "}}"#).await;

        let err = gateway_at(url).complete(request()).await.unwrap_err();
        assert!(matches!(err, GatewayError::EmptyAnswer));
    }

    #[tokio::test]
    async fn test_undecodable_body_is_invalid_response() {
        let (url, _server) = serve_once("200 OK", "this is not json").await;

        let err = gateway_at(url).complete(request()).await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_an_error() {
        let gateway = gateway_at("http://127.0.0.1:9".to_string());

        let result = gateway
            .complete(CompletionRequest {
                timeout: Duration::from_secs(2),
                ..request()
            })
            .await;

        assert!(result.is_err());
    }
}
