use thiserror::Error;

/// Errors produced by the platform clients in this crate.
///
/// These never cross the metric-fetch boundary: [`crate::Provider::fetch_analytics`]
/// absorbs every variant into a zero-valued record. They do surface from the
/// OAuth, profile-lookup, and content-analytics operations, where the caller
/// needs to distinguish a deployment defect from a user-correctable failure.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Non-2xx HTTP status outside the shapes handled explicitly.
    #[error("unexpected HTTP status {status} from {context}")]
    UnexpectedStatus { status: u16, context: String },

    /// A server-side credential required for this operation is not
    /// configured. This is a deployment defect, not transient
    /// unavailability, and is the one category allowed to surface as a
    /// hard error to callers.
    #[error("{platform} operation requires {credential} to be configured")]
    MissingCredential {
        platform: &'static str,
        credential: &'static str,
    },

    /// The platform's token endpoint rejected the authorization code.
    #[error("{platform} token exchange failed: {detail}")]
    TokenExchange { platform: String, detail: String },

    /// The profile-lookup API could not return a biography.
    #[error("profile lookup failed with status {status}: {detail}")]
    ProfileLookup { status: u16, detail: String },

    /// The platform does not implement the requested operation.
    #[error("{platform} does not support {operation}")]
    Unsupported {
        platform: String,
        operation: &'static str,
    },

    /// A configured base URL could not be parsed.
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

/// Returns `true` for errors worth retrying after a back-off delay.
///
/// Retriable: network-level failures (timeout, connection reset) and 5xx
/// responses. Everything else — missing credentials, 4xx rejections,
/// malformed payloads — is returned immediately; retrying won't fix it.
pub(crate) fn is_retriable(err: &ProviderError) -> bool {
    match err {
        ProviderError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        ProviderError::UnexpectedStatus { status, .. } => *status >= 500,
        ProviderError::Deserialize { .. }
        | ProviderError::MissingCredential { .. }
        | ProviderError::TokenExchange { .. }
        | ProviderError::ProfileLookup { .. }
        | ProviderError::Unsupported { .. }
        | ProviderError::InvalidBaseUrl { .. } => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credential_is_not_retriable() {
        assert!(!is_retriable(&ProviderError::MissingCredential {
            platform: "YOUTUBE",
            credential: "YOUTUBE_API_KEY",
        }));
    }

    #[test]
    fn server_error_status_is_retriable() {
        assert!(is_retriable(&ProviderError::UnexpectedStatus {
            status: 503,
            context: "videos.list".to_owned(),
        }));
    }

    #[test]
    fn client_error_status_is_not_retriable() {
        assert!(!is_retriable(&ProviderError::UnexpectedStatus {
            status: 403,
            context: "videos.list".to_owned(),
        }));
    }

    #[test]
    fn deserialize_error_is_not_retriable() {
        let source = serde_json::from_str::<()>("nope").unwrap_err();
        assert!(!is_retriable(&ProviderError::Deserialize {
            context: "test".to_owned(),
            source,
        }));
    }
}
