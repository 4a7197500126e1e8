//! Authentication phases and the credential snapshot.

use serde::Serialize;

/// Where the login flow stands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthPhase {
    #[default]
    Unauthenticated,
    /// Waiting for the user to confirm the login mail.
    PollingConfirmation { polling_id: String },
    Authenticated,
    /// Token refresh in flight.
    Refreshing,
}

/// Everything needed to resume a session in another process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub email: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub datadome_cookie: Option<String>,
}
