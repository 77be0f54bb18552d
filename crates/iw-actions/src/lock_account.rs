//! Suspend-account command template.

use crate::registry::{CommandTemplate, Curl};

/// Suspends the user so no new sign-ins succeed.
pub struct LockAccountTemplate;

impl LockAccountTemplate {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LockAccountTemplate {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandTemplate for LockAccountTemplate {
    fn step_id(&self) -> &str {
        "lock_account"
    }

    fn description(&self) -> &str {
        "Suspend the user account in the identity provider."
    }

    fn render(&self, base_url: &str) -> String {
        Curl::new(
            "POST",
            format!("{}/api/v1/users/{{userId}}/lifecycle/suspend", base_url),
        )
        .json_content()
        .render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        let command = LockAccountTemplate::new().render("https://acme.okta.com");
        assert!(command.starts_with(
            "curl -X POST https://acme.okta.com/api/v1/users/{userId}/lifecycle/suspend"
        ));
        assert!(command.contains("SSWS <REDACTED_TOKEN>"));
    }
}
