use crate::types::{
    ChannelError, POLLING_PATH, Result, SOCKET_ID_PARAM, WEBSOCKET_PATH,
};
use url::Url;

/// Resolved server endpoints for both transports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// `<ws|wss>://<host><context><prefix>/websocket?SBSocketId=<id>`
    pub socket: String,
    /// `<base_url><prefix>/async?SBSocketId=<id>`, also the POST target
    pub polling: String,
}

impl Endpoints {
    /// Derives both endpoints from the URL of the hosting page.
    pub fn resolve(
        page_url: &str,
        url_context: &str,
        url_prefix: &str,
        socket_id: &str,
    ) -> Result<Self> {
        Ok(Self {
            socket: socket_endpoint(page_url, url_context, url_prefix, socket_id)?,
            polling: polling_endpoint(page_url, url_prefix, socket_id)?,
        })
    }
}

/// Page URL with the fragment marker dropped and a trailing slash ensured
pub fn base_url(page_url: &str) -> String {
    let mut base = page_url.replacen('#', "", 1);
    if !base.ends_with('/') {
        base.push('/');
    }
    base
}

/// Converts the page origin to its WebSocket origin (`http` → `ws`, `https` → `wss`)
pub fn http_to_ws_origin(page_url: &str) -> Result<String> {
    let url = Url::parse(page_url)?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(ChannelError::InvalidEndpoint(format!(
                "unsupported scheme '{}' in {}",
                other, page_url
            )));
        }
    };

    let host = url
        .host_str()
        .ok_or_else(|| ChannelError::InvalidEndpoint(format!("no host in {}", page_url)))?;

    Ok(match url.port() {
        Some(port) => format!("{}://{}:{}", scheme, host, port),
        None => format!("{}://{}", scheme, host),
    })
}

pub fn socket_endpoint(
    page_url: &str,
    url_context: &str,
    url_prefix: &str,
    socket_id: &str,
) -> Result<String> {
    let origin = http_to_ws_origin(page_url)?;
    Ok(format!(
        "{}{}{}{}?{}={}",
        origin, url_context, url_prefix, WEBSOCKET_PATH, SOCKET_ID_PARAM, socket_id
    ))
}

pub fn polling_endpoint(page_url: &str, url_prefix: &str, socket_id: &str) -> Result<String> {
    // Validate before string assembly so a bad page URL fails at construction
    Url::parse(page_url)?;
    Ok(format!(
        "{}{}{}?{}={}",
        base_url(page_url),
        url_prefix,
        POLLING_PATH,
        SOCKET_ID_PARAM,
        socket_id
    ))
}
