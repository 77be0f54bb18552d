//! Session revocation command template.

use crate::registry::{CommandTemplate, Curl};

/// Clears every active session of the user.
pub struct RevokeSessionsTemplate;

impl RevokeSessionsTemplate {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RevokeSessionsTemplate {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandTemplate for RevokeSessionsTemplate {
    fn step_id(&self) -> &str {
        "revoke_sessions"
    }

    fn description(&self) -> &str {
        "Revoke all active sessions for the user."
    }

    fn render(&self, base_url: &str) -> String {
        Curl::new(
            "DELETE",
            format!("{}/api/v1/users/{{userId}}/sessions", base_url),
        )
        .render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_uses_delete_without_body() {
        let command = RevokeSessionsTemplate::new().render("https://acme.okta.com");
        assert!(command.starts_with(
            "curl -X DELETE https://acme.okta.com/api/v1/users/{userId}/sessions"
        ));
        assert!(!command.contains("Content-Type"));
        assert!(!command.contains(" -d "));
    }
}
