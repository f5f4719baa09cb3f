//! Shared secret authentication for trusted clients (chat bots).

use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Identity};

/// Authorization scheme expected in front of the secret.
pub const MUTUAL_SCHEME: &str = "Mutual";

/// Authenticator that validates `Authorization: Mutual <secret>`.
///
/// Only the exact scheme is accepted; any other scheme (e.g. `Bearer`) is
/// rejected with a distinct message so misconfigured clients are easy to spot.
pub struct SharedSecretAuthenticator {
    expected_secret: String,
}

impl SharedSecretAuthenticator {
    pub fn new(secret: String) -> Self {
        Self {
            expected_secret: secret,
        }
    }
}

#[async_trait]
impl Authenticator for SharedSecretAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        let header = request
            .headers
            .get("authorization")
            .ok_or(AuthError::NotAuthenticated)?;

        let (scheme, secret) = header.trim().split_once(' ').unwrap_or((header.trim(), ""));
        if scheme != MUTUAL_SCHEME {
            return Err(AuthError::InvalidCredentials(format!(
                "unsupported authorization scheme, expected {MUTUAL_SCHEME}"
            )));
        }

        if constant_time_eq(secret.trim().as_bytes(), self.expected_secret.as_bytes()) {
            Ok(Identity {
                user_id: "bot".to_string(),
                method: "shared_secret".to_string(),
                claims: std::collections::HashMap::new(),
            })
        } else {
            Err(AuthError::InvalidCredentials("invalid secret".to_string()))
        }
    }

    fn method_name(&self) -> &'static str {
        "shared_secret"
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
