use super::Channel;
use crate::infrastructure::Endpoints;
use crate::transport::{SelectedTransport, TransportCapabilities, TransportFactory};
use crate::types::{ChannelError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for a [`Channel`].
///
/// Deserializable with every field optional, so it can be loaded from a
/// partial JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelOptions {
    /// URL of the hosting page; both endpoints derive from it
    pub page_url: String,
    /// Path inserted between the host and the prefix on the socket endpoint
    pub url_context: String,
    /// Path prefix the server mounts the channel under
    pub url_prefix: String,
    /// Socket id sent to the server. A random v4 UUID when unset.
    pub socket_id: Option<String>,
    pub capabilities: TransportCapabilities,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            page_url: "http://localhost/".to_string(),
            url_context: String::new(),
            url_prefix: String::new(),
            socket_id: None,
            capabilities: TransportCapabilities::default(),
        }
    }
}

/// Builder for Channel that handles initialization
pub struct ChannelBuilder {
    endpoints: Endpoints,
    capabilities: TransportCapabilities,
}

impl ChannelBuilder {
    /// Validates the options and resolves the endpoints
    pub fn new(options: ChannelOptions) -> Result<Self> {
        if options.page_url.trim().is_empty() {
            return Err(ChannelError::InvalidEndpoint(
                "page URL is required".to_string(),
            ));
        }

        let socket_id = options
            .socket_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let endpoints = Endpoints::resolve(
            &options.page_url,
            &options.url_context,
            &options.url_prefix,
            &socket_id,
        )?;

        Ok(Self {
            endpoints,
            capabilities: options.capabilities,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Selects the transport and spawns the channel driver.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Channel<SelectedTransport> {
        let transport = TransportFactory::create(&self.endpoints, self.capabilities);
        Channel::with_transport(transport)
    }
}
