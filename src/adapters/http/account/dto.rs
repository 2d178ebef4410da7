//! Request and response bodies for the user account endpoints.

use serde::{Deserialize, Serialize};

/// Query of `DELETE /api/user/delete`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAccountParams {
    #[serde(default)]
    pub user_id: Option<String>,
}

/// `{success: true}`
#[derive(Debug, Clone, Serialize)]
pub struct DeleteAccountResponse {
    pub success: bool,
}
