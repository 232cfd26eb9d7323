//! Credential verification seam
//!
//! The broker never inspects credentials itself. Each connection's first
//! control frame is handed to a [`CredentialVerifier`]; `Ok(false)` rejects
//! the client, `Err` reports a verifier failure and leaves the response to
//! the caller.

use crate::error::Result;
use crate::protocol::messages::Authentication;

/// Decides whether a client credential is acceptable
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, auth: &Authentication) -> Result<bool>;
}

impl<F> CredentialVerifier for F
where
    F: Fn(&Authentication) -> Result<bool> + Send + Sync,
{
    fn verify(&self, auth: &Authentication) -> Result<bool> {
        self(auth)
    }
}

/// Accepts every client. Useful for development and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl CredentialVerifier for AcceptAll {
    fn verify(&self, _auth: &Authentication) -> Result<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_all() {
        let auth = Authentication {
            auth_name: "token".to_string(),
            auth_payload: "t1".to_string(),
        };
        assert!(AcceptAll.verify(&auth).unwrap());
    }

    #[test]
    fn test_closure_verifier() {
        let verifier = |auth: &Authentication| Ok(auth.auth_payload == "secret");

        let good = Authentication {
            auth_name: "token".to_string(),
            auth_payload: "secret".to_string(),
        };
        let bad = Authentication {
            auth_name: "token".to_string(),
            auth_payload: "guess".to_string(),
        };

        assert!(verifier.verify(&good).unwrap());
        assert!(!verifier.verify(&bad).unwrap());
    }
}
