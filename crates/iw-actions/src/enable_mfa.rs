//! MFA enrollment command template.
//!
//! Factor enrollment is org-specific, so this renders a generic TOTP enrollment
//! that the analyst is expected to adjust.

use crate::registry::{CommandTemplate, Curl};

const TOTP_FACTOR: &str = r#"{"factorType": "token:software:totp", "provider": "OKTA"}"#;

pub struct EnableMfaTemplate;

impl EnableMfaTemplate {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EnableMfaTemplate {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandTemplate for EnableMfaTemplate {
    fn step_id(&self) -> &str {
        "enable_mfa"
    }

    fn description(&self) -> &str {
        "Enroll an MFA factor for the user (template, adjust factorType/provider)."
    }

    fn render(&self, base_url: &str) -> String {
        let curl = Curl::new(
            "POST",
            format!("{}/api/v1/users/{{userId}}/factors", base_url),
        )
        .json(TOTP_FACTOR)
        .render();
        format!(
            "# Example: enroll an MFA factor for the user via the identity provider API\n{}",
            curl
        )
    }

    fn notes(&self) -> &str {
        "Adjust factorType/provider and {userId} before running."
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_factor_body() {
        let command = EnableMfaTemplate::new().render("https://acme.okta.com");
        assert!(command.starts_with("# Example"));
        assert!(command.contains("https://acme.okta.com/api/v1/users/{userId}/factors"));
        assert!(command.contains(r#"-d '{"factorType": "token:software:totp", "provider": "OKTA"}'"#));
        assert!(EnableMfaTemplate::new().notes().contains("factorType"));
    }
}
