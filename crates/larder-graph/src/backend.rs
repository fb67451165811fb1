//! Transport seam between the client and a graph service.

use std::time::Duration;

use crate::client::{GraphConfig, GraphError};
use crate::response::Envelope;
use crate::script::{self, Request, ScriptMode};

/// Something that can answer graph requests with a status-coded envelope.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    /// Submit one request. `Err` means the transport itself failed; a
    /// server-side failure is an `Ok` envelope with a non-200 status.
    async fn submit(&self, request: &Request) -> Result<Envelope, GraphError>;
}

/// Gremlin Server HTTP endpoint with Basic authentication.
pub struct HttpBackend {
    client: reqwest::Client,
    endpoint: String,
    username: String,
    password: String,
    mode: ScriptMode,
}

impl HttpBackend {
    pub fn new(config: &GraphConfig) -> Result<Self, GraphError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| GraphError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            mode: config.script_mode,
        })
    }
}

#[async_trait::async_trait]
impl Backend for HttpBackend {
    async fn submit(&self, request: &Request) -> Result<Envelope, GraphError> {
        let script = script::render(request, self.mode);
        tracing::debug!(
            endpoint = %self.endpoint,
            gremlin = %script.gremlin,
            bindings = script.bindings.len(),
            "Submitting script"
        );

        let res = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.username, Some(&self.password))
            .json(&script)
            .send()
            .await
            .map_err(|e| GraphError::Transport(e.to_string()))?;

        let http_status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| GraphError::Transport(e.to_string()))?;

        match serde_json::from_str::<Envelope>(&body) {
            Ok(mut envelope) => {
                if envelope.status.code == 0 {
                    envelope.status.code = http_status.as_u16();
                }
                Ok(envelope)
            }
            // Auth failures and proxies answer with non-JSON bodies.
            Err(_) if !http_status.is_success() => {
                Ok(Envelope::failure(http_status.as_u16(), body))
            }
            Err(e) => Err(GraphError::Decode(format!(
                "Response is not a result envelope: {e}"
            ))),
        }
    }
}
