//! User profile model.

use serde::{Deserialize, Serialize};

/// User profile stored at `User/{uid}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    /// Auth provider user ID (also the document key)
    pub uid: String,
    /// Display name
    pub name: String,
    /// Age in years
    pub age: Option<u32>,
    /// Email address used to sign in
    pub email: String,
    /// Height, in the unit named by `measurement`
    pub height: Option<f64>,
    pub sex: Option<String>,
    /// Measurement system ("metric" or "imperial")
    pub measurement: Option<String>,
}

impl UserProfile {
    /// Seed profile written at registration time.
    pub fn seed(uid: &str, email: &str) -> Self {
        Self {
            uid: uid.to_string(),
            email: email.to_string(),
            ..Default::default()
        }
    }
}
