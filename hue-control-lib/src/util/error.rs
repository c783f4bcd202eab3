use thiserror::Error;

/// Everything that can go wrong while talking to the hub.
///
/// The hub reports most failures inside a `200 OK` body, so the variants here come from
/// response classification rather than from HTTP status codes.
#[derive(Debug, Error)]
pub enum HubError {
    /// The hub refused to register a new client because its link button was not pressed.
    #[error("link button not pressed")]
    LinkButtonPending,

    /// The access token was rejected, typically because it was revoked.
    #[error("unauthorized user")]
    Unauthorized,

    /// Any other error the hub reported, carried verbatim.
    #[error("hub error {kind}: {description}")]
    Hub { kind: i64, description: String },

    /// Timeout, refused connection or name resolution failure.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The hub answered with a payload that is neither a resource map nor a result list.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// An authenticated call was attempted on a session without an access token.
    #[error("no access token; pair with the hub first")]
    NotPaired,

    /// The access token could not be read or written.
    #[error("token storage failed: {0}")]
    Storage(#[from] std::io::Error),

    #[error("invalid value: {0}")]
    Value(#[from] ValueError),
}

impl HubError {
    /// True when the same call may succeed later without any change on the client side.
    pub fn is_retryable(&self) -> bool {
        matches!(self, HubError::LinkButtonPending | HubError::Network(_))
    }

    /// True when no further call with the same session can succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, HubError::Unauthorized | HubError::NotPaired)
    }

    /// Operator-facing hint on how to recover, if there is one.
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            HubError::LinkButtonPending => Some(
                "Press the link button on the hub, then run the pairing command again within 30 seconds.",
            ),
            HubError::Unauthorized => Some(
                "The access code was not accepted by the hub. Pair again to obtain a new one.",
            ),
            HubError::NotPaired => {
                Some("No access code is available. Pair with the hub to obtain one.")
            }
            _ => None,
        }
    }
}

/// A user supplied value outside the range the hub accepts.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValueError {
    #[error("hue {0} is out of range [0, 360]")]
    Hue(f64),

    #[error("fraction {0} is out of range [0.0, 1.0]")]
    Fraction(f64),

    #[error("level {0} is out of range [0, 255]")]
    Level(i64),

    #[error("xy coordinate ({0}, {1}) is outside the unit square")]
    Xy(f64, f64),

    #[error("cannot parse literal list: {0}")]
    Literal(String),
}
