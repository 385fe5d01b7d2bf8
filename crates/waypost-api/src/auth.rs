//! Two-token auth gate.
//!
//! Governance operations run in two lanes with separate bearer tokens:
//! the **submit** token creates and lists moniker requests, the
//! **approve** token decides them and drives node lifecycle. Read
//! operations are anonymous. A legacy write token may stand in for
//! either lane when the split token is unset. Tokens missing from the
//! environment are generated at startup and printed once to the
//! operator log.

use rand::RngCore;
use rand::rngs::OsRng;

use crate::config::Config;
use crate::error::ApiError;

/// Caller role resolved from the presented bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    /// No or unrecognized token. Read operations only.
    Anonymous,
    /// May submit and list moniker requests.
    Submitter,
    /// May approve/reject requests, drive lifecycle and reload the
    /// catalog. Satisfies submitter-level requirements.
    Approver,
}

impl Role {
    /// True when this role meets the `required` minimum.
    #[must_use]
    pub fn satisfies(self, required: Self) -> bool {
        self >= required
    }
}

/// Resolved lane tokens.
#[derive(Clone)]
pub struct AuthTokens {
    submit: String,
    approve: String,
}

impl std::fmt::Debug for AuthTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthTokens")
            .field("submit", &"[REDACTED]")
            .field("approve", &"[REDACTED]")
            .finish()
    }
}

impl AuthTokens {
    /// Resolves lane tokens from configuration.
    ///
    /// Each unset lane falls back to the legacy write token; if that is
    /// also unset, a random token is generated and printed once so the
    /// operator can pick it up from the startup log.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let submit = config
            .submit_token
            .clone()
            .or_else(|| config.write_token.clone())
            .unwrap_or_else(|| {
                let token = generate_token();
                tracing::warn!(
                    token = %token,
                    "WAYPOST_SUBMIT_TOKEN not set; generated a submit token for this run"
                );
                token
            });
        let approve = config
            .approve_token
            .clone()
            .or_else(|| config.write_token.clone())
            .unwrap_or_else(|| {
                let token = generate_token();
                tracing::warn!(
                    token = %token,
                    "WAYPOST_APPROVE_TOKEN not set; generated an approve token for this run"
                );
                token
            });
        Self { submit, approve }
    }

    /// Builds tokens directly; used by tests.
    #[must_use]
    pub fn fixed(submit: impl Into<String>, approve: impl Into<String>) -> Self {
        Self {
            submit: submit.into(),
            approve: approve.into(),
        }
    }

    /// Resolves the role granted by a presented bearer token.
    #[must_use]
    pub fn role_for(&self, bearer: Option<&str>) -> Role {
        match bearer {
            Some(token) if token == self.approve => Role::Approver,
            Some(token) if token == self.submit => Role::Submitter,
            _ => Role::Anonymous,
        }
    }
}

/// Rejects callers below `required`, naming the lane in the error.
///
/// # Errors
///
/// Returns [`ApiError::forbidden`] when the role is insufficient.
pub fn require_role(role: Role, required: Role) -> Result<(), ApiError> {
    if role.satisfies(required) {
        Ok(())
    } else {
        let lane = match required {
            Role::Submitter => "submit",
            Role::Approver => "approve",
            Role::Anonymous => return Ok(()),
        };
        Err(ApiError::forbidden(format!(
            "this operation requires the {lane} token"
        )))
    }
}

/// 32 random bytes, hex-encoded.
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
