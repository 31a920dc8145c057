use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SignatureError;
use crate::generator::{Signature, SignatureGenerator};

/// Tool name sent when none is configured.
pub const DEFAULT_TOOL: &str = "face_signature";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Builder-style configuration for [`HttpGenerator`].
#[derive(Debug, Clone, Default)]
pub struct GeneratorConfig {
    pub base_url: String,
    pub tool: String,
    pub api_key: String,
    /// Per-request timeout. Zero means the default (5 minutes).
    pub timeout: Duration,
}

impl GeneratorConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Default::default()
        }
    }

    pub fn with_tool(mut self, tool: &str) -> Self {
        self.tool = tool.to_string();
        self
    }

    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = key.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Request body: `{"name": .., "arguments": {"image": <base64>}}`.
#[derive(Serialize)]
struct InvokeRequest<'a> {
    name: &'a str,
    arguments: InvokeArguments,
}

#[derive(Serialize)]
struct InvokeArguments {
    image: String,
}

#[derive(Deserialize)]
struct InvokeResponse {
    #[serde(default)]
    result: Option<InvokeResult>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct InvokeResult {
    #[serde(default)]
    embedding: Option<Vec<f64>>,
    #[serde(default)]
    hash: Option<String>,
}

/// Signature generator reached over HTTP.
///
/// Each call POSTs one image to `base_url` and expects either
/// `{"result": {"embedding": [..]}}` or `{"result": {"hash": ".."}}`.
pub struct HttpGenerator {
    client: Client,
    base_url: String,
    tool: String,
    api_key: String,
}

impl HttpGenerator {
    pub fn new(base_url: &str) -> Result<Self, SignatureError> {
        Self::with_config(GeneratorConfig::new(base_url))
    }

    pub fn with_config(cfg: GeneratorConfig) -> Result<Self, SignatureError> {
        if cfg.base_url.is_empty() {
            return Err(SignatureError::Api("empty base url".into()));
        }
        let timeout = if cfg.timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            cfg.timeout
        };
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: cfg.base_url,
            tool: if cfg.tool.is_empty() {
                DEFAULT_TOOL.to_string()
            } else {
                cfg.tool
            },
            api_key: cfg.api_key,
        })
    }
}

#[async_trait::async_trait]
impl SignatureGenerator for HttpGenerator {
    async fn generate(&self, image: &[u8]) -> Result<Signature, SignatureError> {
        if image.is_empty() {
            return Err(SignatureError::EmptyInput);
        }

        let body = InvokeRequest {
            name: &self.tool,
            arguments: InvokeArguments {
                image: BASE64.encode(image),
            },
        };

        let mut req = self.client.post(&self.base_url).json(&body);
        if !self.api_key.is_empty() {
            req = req.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let resp = req.send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        debug!(%status, len = bytes.len(), tool = %self.tool, "signature: response");

        if !status.is_success() {
            let text = String::from_utf8_lossy(&bytes);
            return match parse_response(&bytes) {
                // A structured error body still says whether a face was found.
                Err(e @ SignatureError::NoSignal(_)) => Err(e),
                _ if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::GATEWAY_TIMEOUT => {
                    Err(SignatureError::Timeout(format!("HTTP {status}")))
                }
                _ => Err(SignatureError::Api(format!("HTTP {status}: {text}"))),
            };
        }
        parse_response(&bytes)
    }
}

/// Decodes a generator response body.
pub(crate) fn parse_response(body: &[u8]) -> Result<Signature, SignatureError> {
    let resp: InvokeResponse = serde_json::from_slice(body)
        .map_err(|e| SignatureError::InvalidResponse(e.to_string()))?;

    if let Some(msg) = resp.error {
        return Err(classify_error(msg));
    }

    let result = resp
        .result
        .ok_or_else(|| SignatureError::InvalidResponse("missing result".into()))?;

    match (result.embedding, result.hash) {
        (Some(emb), _) if !emb.is_empty() => {
            // float64 -> f32, as embeddings are stored.
            Ok(Signature::Embedding(emb.iter().map(|&v| v as f32).collect()))
        }
        (_, Some(hash)) if !hash.trim().is_empty() => Ok(Signature::Hash(hash.trim().to_string())),
        _ => Err(SignatureError::NoSignal("result carries no signature".into())),
    }
}

/// Only face/signal phrases mean "nothing to match". A bare "not found"
/// is a wrong URL or tool name and stays an API error.
fn classify_error(msg: String) -> SignatureError {
    let lower = msg.to_lowercase();
    if lower.contains("no face") || lower.contains("no signal") || lower.contains("face not found") {
        SignatureError::NoSignal(msg)
    } else if lower.contains("timeout") || lower.contains("timed out") {
        SignatureError::Timeout(msg)
    } else {
        SignatureError::Api(msg)
    }
}
