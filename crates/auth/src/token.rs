use std::collections::HashMap;
use std::str::FromStr;

use thiserror::Error;

use stockroom_core::UserId;

use crate::role::Role;

/// Authenticated identity attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
}

/// Token validation seam consumed by the API middleware.
pub trait TokenValidator: Send + Sync {
    /// Resolve a bearer token to a principal, or `None` if unknown.
    fn validate(&self, token: &str) -> Option<Principal>;
}

/// Error parsing a token registry specification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenSpecError {
    #[error("malformed token entry '{0}' (expected token:user-uuid:role)")]
    MalformedEntry(String),

    #[error("invalid user id in token entry: {0}")]
    InvalidUserId(String),

    #[error("unknown role '{0}' (expected admin or operator)")]
    UnknownRole(String),

    #[error("duplicate token in registry")]
    DuplicateToken,
}

/// Static token registry.
///
/// Parsed once at startup from a `token:user-uuid:role` comma-separated
/// specification (the `API_TOKENS` environment variable).
#[derive(Debug, Default)]
pub struct StaticTokenAuth {
    tokens: HashMap<String, Principal>,
}

impl StaticTokenAuth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a registry from its textual specification.
    ///
    /// Entries are separated by commas; whitespace around entries is
    /// ignored. Each entry is `token:user-uuid:role`.
    pub fn from_spec(spec: &str) -> Result<Self, TokenSpecError> {
        let mut auth = Self::new();
        for entry in spec.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }

            let mut parts = entry.splitn(3, ':');
            let (Some(token), Some(user), Some(role)) =
                (parts.next(), parts.next(), parts.next())
            else {
                return Err(TokenSpecError::MalformedEntry(entry.to_string()));
            };
            if token.is_empty() {
                return Err(TokenSpecError::MalformedEntry(entry.to_string()));
            }

            let user_id = UserId::from_str(user)
                .map_err(|e| TokenSpecError::InvalidUserId(e.to_string()))?;
            let role =
                Role::parse(role).ok_or_else(|| TokenSpecError::UnknownRole(role.to_string()))?;

            auth.register(token, Principal { user_id, role })?;
        }
        Ok(auth)
    }

    pub fn register(
        &mut self,
        token: impl Into<String>,
        principal: Principal,
    ) -> Result<(), TokenSpecError> {
        if self.tokens.insert(token.into(), principal).is_some() {
            return Err(TokenSpecError::DuplicateToken);
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl TokenValidator for StaticTokenAuth {
    fn validate(&self, token: &str) -> Option<Principal> {
        self.tokens.get(token).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_parses_multiple_entries() {
        let admin = UserId::new();
        let operator = UserId::new();
        let spec = format!("alpha:{admin}:admin, beta:{operator}:operator");

        let auth = StaticTokenAuth::from_spec(&spec).unwrap();

        let p = auth.validate("alpha").unwrap();
        assert_eq!(p.user_id, admin);
        assert_eq!(p.role, Role::Admin);

        let p = auth.validate("beta").unwrap();
        assert_eq!(p.user_id, operator);
        assert_eq!(p.role, Role::Operator);

        assert!(auth.validate("gamma").is_none());
    }

    #[test]
    fn malformed_entries_are_rejected() {
        assert_eq!(
            StaticTokenAuth::from_spec("just-a-token").unwrap_err(),
            TokenSpecError::MalformedEntry("just-a-token".to_string())
        );
        let user = UserId::new();
        assert!(matches!(
            StaticTokenAuth::from_spec(&format!("t:{user}:root")),
            Err(TokenSpecError::UnknownRole(_))
        ));
        assert!(matches!(
            StaticTokenAuth::from_spec("t:not-a-uuid:admin"),
            Err(TokenSpecError::InvalidUserId(_))
        ));
    }

    #[test]
    fn duplicate_tokens_are_rejected() {
        let user = UserId::new();
        let spec = format!("same:{user}:admin,same:{user}:operator");
        assert_eq!(
            StaticTokenAuth::from_spec(&spec).unwrap_err(),
            TokenSpecError::DuplicateToken
        );
    }

    #[test]
    fn empty_spec_yields_empty_registry() {
        let auth = StaticTokenAuth::from_spec("  ").unwrap();
        assert!(auth.is_empty());
    }
}
