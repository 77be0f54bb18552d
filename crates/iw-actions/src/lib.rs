//! # iw-actions
//!
//! Read-only remediation commands for IdP Warden.
//!
//! This crate provides the command template registry and the synthesizer that
//! turns response plans into command suggestions for a human analyst. Commands
//! are rendered as text and never executed.

pub mod enable_mfa;
pub mod force_password_reset;
pub mod lock_account;
pub mod registry;
pub mod revoke_sessions;
pub mod synthesizer;

pub use enable_mfa::EnableMfaTemplate;
pub use force_password_reset::ForcePasswordResetTemplate;
pub use lock_account::LockAccountTemplate;
pub use registry::{CommandRegistry, CommandTemplate, OKTA_API_SYSTEM, REDACTED_AUTH};
pub use revoke_sessions::RevokeSessionsTemplate;
pub use synthesizer::CommandSynthesizer;
