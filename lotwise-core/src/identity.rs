use serde::{Deserialize, Serialize};

/// Resolved caller identity, stamped onto bookings as `driver_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRef {
    pub id: String,
    /// Mobile-money contact for push payments.
    pub contact: Option<String>,
}

/// Seam to the identity/profile store. Verification itself is an external
/// collaborator; the engine only needs a stable id (and a payment contact
/// at checkout). Holds may be placed anonymously.
pub trait Identity: Send + Sync {
    fn resolve(&self, token: Option<&str>) -> Option<UserRef>;
}

/// Treats the presented token as an opaque session id. Anonymous carts get
/// no identity and fall back to a caller-supplied session string.
#[derive(Debug, Default)]
pub struct SessionIdentity;

impl Identity for SessionIdentity {
    fn resolve(&self, token: Option<&str>) -> Option<UserRef> {
        token.map(|t| UserRef {
            id: t.to_string(),
            contact: None,
        })
    }
}
