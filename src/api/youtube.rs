use regex::Regex;

/// Client version sent when the watch page does not advertise one.
pub const DEFAULT_CLIENT_VERSION: &str = "2.20240101.00.00";

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub struct VideoId(pub String);

impl VideoId {
    /// Accepts a raw video id or a watch / youtu.be / live URL.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        if !input.contains('/') && !input.contains('=') {
            return Some(Self(input.to_string()));
        }

        let id = if let Some(start) = input.find("v=") {
            let rest = &input[start + 2..];
            rest.split('&').next().unwrap_or_default()
        } else if let Some(start) = input.find("youtu.be/") {
            let rest = &input[start + "youtu.be/".len()..];
            rest.split('?').next().unwrap_or_default()
        } else if let Some(start) = input.find("/live/") {
            let rest = &input[start + "/live/".len()..];
            rest.split('?').next().unwrap_or_default()
        } else {
            ""
        };

        if id.is_empty() {
            None
        } else {
            Some(Self(id.to_string()))
        }
    }

    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

#[derive(Debug, Clone, derive_more::Display)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, derive_more::Display)]
pub struct ClientVersion(String);

impl ClientVersion {
    pub fn new(value: String) -> Self {
        Self(value)
    }
}

impl Default for ClientVersion {
    fn default() -> Self {
        Self(DEFAULT_CLIENT_VERSION.to_string())
    }
}

/// Opaque polling handle issued by the server. Echoed back verbatim, never inspected.
#[derive(
    Debug, Clone, PartialEq, Eq, derive_more::Display, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct Continuation(pub String);

pub fn extract_api_key(html: &str) -> Option<ApiKey> {
    Regex::new(r#"['"]INNERTUBE_API_KEY['"]:\s*['"](.+?)['"]"#)
        .ok()?
        .captures(html)
        .and_then(|cap| cap.get(1))
        .map(|m| ApiKey::new(m.as_str().to_string()))
}

pub fn extract_client_version(html: &str) -> Option<ClientVersion> {
    Regex::new(r#"['"]INNERTUBE_CLIENT_VERSION['"]:\s*['"](.+?)['"]"#)
        .ok()?
        .captures(html)
        .and_then(|cap| cap.get(1))
        .map(|m| ClientVersion::new(m.as_str().to_string()))
}

pub fn extract_continuation(html: &str) -> Option<Continuation> {
    Regex::new(r#"['"]continuation['"]:\s*['"](.+?)['"]"#)
        .ok()?
        .captures(html)
        .and_then(|cap| cap.get(1))
        .map(|m| Continuation(m.as_str().to_string()))
}
