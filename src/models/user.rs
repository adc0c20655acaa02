use serde::{Deserialize, Serialize};

/// Identity resolved by the session collaborator for an incoming request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: String,
}
