//! Forced password reset command template.

use crate::registry::{CommandTemplate, Curl};

pub struct ForcePasswordResetTemplate;

impl ForcePasswordResetTemplate {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ForcePasswordResetTemplate {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandTemplate for ForcePasswordResetTemplate {
    fn step_id(&self) -> &str {
        "force_password_reset"
    }

    fn description(&self) -> &str {
        "Force a password reset for the user and send the reset email."
    }

    fn render(&self, base_url: &str) -> String {
        Curl::new(
            "POST",
            format!(
                "{}/api/v1/users/{{userId}}/lifecycle/reset_password?sendEmail=true",
                base_url
            ),
        )
        .json_content()
        .render()
    }
}
