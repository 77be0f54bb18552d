//! Maps response plans to read-only command suggestions.

use crate::registry::CommandRegistry;
use iw_core::{CommandSuggestion, CommandSynthesis, ResponsePlan};
use tracing::debug;

/// Deterministic step-to-command mapping.
///
/// Each plan step whose id has a registered template yields exactly one
/// read-only suggestion; other steps are left to the analyst and produce nothing.
pub struct CommandSynthesizer {
    base_url: String,
    registry: CommandRegistry,
}

impl CommandSynthesizer {
    /// Creates a synthesizer with the built-in templates.
    ///
    /// Trailing slashes on `base_url` are trimmed.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            registry: CommandRegistry::with_defaults(),
        }
    }

    pub fn with_registry(mut self, registry: CommandRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }
}

impl CommandSynthesis for CommandSynthesizer {
    fn synthesize(&self, plan: &ResponsePlan) -> Vec<CommandSuggestion> {
        plan.steps
            .iter()
            .filter_map(|step| {
                let Some(template) = self.registry.get(&step.step_id) else {
                    debug!(step_id = %step.step_id, "No command template for step");
                    return None;
                };
                Some(CommandSuggestion {
                    step_id: step.step_id.clone(),
                    description: template.description().to_string(),
                    command: template.render(&self.base_url),
                    system: template.system().to_string(),
                    read_only: true,
                    notes: Some(template.notes().to_string()),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iw_core::ResponseStep;
    use uuid::Uuid;

    fn plan(step_ids: &[&str]) -> ResponsePlan {
        ResponsePlan::new(
            Uuid::new_v4(),
            "Contain account takeover",
            step_ids
                .iter()
                .map(|id| ResponseStep::new(*id, "d", "r"))
                .collect(),
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_one_command_per_canonical_step() {
        let synthesizer = CommandSynthesizer::new("https://acme.okta.com/");
        let commands = synthesizer.synthesize(&plan(&[
            "collect_auth_logs",
            "lock_account",
            "notify_user",
            "revoke_sessions",
        ]));

        let ids: Vec<&str> = commands.iter().map(|c| c.step_id.as_str()).collect();
        assert_eq!(ids, vec!["lock_account", "revoke_sessions"]);
        assert!(commands.iter().all(|c| c.read_only && c.system == "okta_api"));
        assert!(commands[0]
            .command
            .contains("https://acme.okta.com/api/v1/users/{userId}/lifecycle/suspend"));
        assert!(!commands[0].command.contains(".com//"));
    }

    #[test]
    fn test_all_canonical_steps_are_covered() {
        let synthesizer = CommandSynthesizer::new("https://acme.okta.com");
        let commands = synthesizer.synthesize(&plan(&[
            "lock_account",
            "force_password_reset",
            "revoke_sessions",
            "enable_mfa",
        ]));
        assert_eq!(commands.len(), 4);
        assert!(commands
            .iter()
            .all(|c| c.notes.as_deref().is_some_and(|n| n.contains("{userId}"))));
    }

    #[test]
    fn test_unmapped_steps_yield_nothing() {
        let synthesizer = CommandSynthesizer::new("https://acme.okta.com");
        assert!(synthesizer
            .synthesize(&plan(&["forensic_review", "update_incident_status"]))
            .is_empty());
    }

    #[test]
    fn test_base_url_trimming() {
        assert_eq!(
            CommandSynthesizer::new("https://acme.okta.com///").base_url(),
            "https://acme.okta.com"
        );
    }
}
