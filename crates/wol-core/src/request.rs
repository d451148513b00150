//! Inbound request model.
//!
//! A [`CommandRequest`] lives for one HTTP exchange. Frameworks with their
//! own routing build it from path and query pairs; the ESP32 server hands
//! over the raw URI and lets [`CommandRequest::from_uri`] split it.

use crate::relay::PowerAction;

/// Route selected by the request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Wake,
    Power(PowerAction),
    Status,
    Logs,
}

impl Action {
    /// Match a request path. Trailing slashes are not folded.
    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            "/wake" => Some(Action::Wake),
            "/sleep" => Some(Action::Power(PowerAction::Sleep)),
            "/shutdown" => Some(Action::Power(PowerAction::Shutdown)),
            "/restart" => Some(Action::Power(PowerAction::Restart)),
            "/status" => Some(Action::Status),
            "/logs" => Some(Action::Logs),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::Wake => "wake",
            Action::Power(action) => action.as_str(),
            Action::Status => "status",
            Action::Logs => "logs",
        }
    }

    /// Whether the route needs the shared token.
    pub fn requires_token(&self) -> bool {
        matches!(self, Action::Wake | Action::Power(_))
    }
}

/// One inbound HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub path: String,
    pub action: Option<Action>,
    pub params: Vec<(String, String)>,
}

impl CommandRequest {
    pub fn new(path: impl Into<String>, params: Vec<(String, String)>) -> Self {
        let path = path.into();
        Self {
            action: Action::from_path(&path),
            path,
            params,
        }
    }

    /// Split `/path?query` into path and decoded query pairs.
    pub fn from_uri(uri: &str) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, query),
            None => (uri, ""),
        };
        Self::new(path, parse_query(query))
    }

    /// First value of a query parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn token(&self) -> Option<&str> {
        self.param("token")
    }
}

/// Decode an `application/x-www-form-urlencoded` query string.
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(query.as_bytes())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_route_matching() {
        assert_eq!(Action::from_path("/wake"), Some(Action::Wake));
        assert_eq!(
            Action::from_path("/shutdown"),
            Some(Action::Power(PowerAction::Shutdown))
        );
        assert_eq!(Action::from_path("/logs"), Some(Action::Logs));
        assert_eq!(Action::from_path("/wake/"), None);
        assert_eq!(Action::from_path("/"), None);
    }

    #[test]
    fn test_requires_token() {
        assert!(Action::Wake.requires_token());
        assert!(Action::Power(PowerAction::Sleep).requires_token());
        assert!(!Action::Status.requires_token());
        assert!(!Action::Logs.requires_token());
    }

    #[test]
    fn test_from_uri() {
        let request = CommandRequest::from_uri("/logs?json=true&count=3");
        assert_eq!(request.action, Some(Action::Logs));
        assert_eq!(request.param("json"), Some("true"));
        assert_eq!(request.param("count"), Some("3"));
        assert_eq!(request.token(), None);
    }

    #[test]
    fn test_from_uri_without_query() {
        let request = CommandRequest::from_uri("/status");
        assert_eq!(request.path, "/status");
        assert!(request.params.is_empty());
    }

    #[test]
    fn test_percent_decoding() {
        let request = CommandRequest::from_uri("/wake?token=a%2Bb+c%zz&flag");
        assert_eq!(request.token(), Some("a+b c%zz"));
        assert_eq!(request.param("flag"), Some(""));
    }

    #[test]
    fn test_empty_token_is_present() {
        let request = CommandRequest::from_uri("/wake?token=");
        assert_eq!(request.token(), Some(""));
    }
}
