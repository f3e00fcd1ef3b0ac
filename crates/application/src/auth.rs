use domain::UserId;

use crate::error::ApplicationError;

/// Credential verification seam. The web layer provides the JWT-backed
/// implementation; the identify handshake only needs the resolved user id.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<UserId, ApplicationError>;
}
