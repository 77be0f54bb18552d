//! Subcommand implementations.

mod run;
mod show;

pub use run::{run_pipeline, RunConfig, MAX_HOURS};
pub use show::{show_records, ShowTarget};
