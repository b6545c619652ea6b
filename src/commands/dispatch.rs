//! Command dispatch logic for ufconvert

use std::time::Instant;

use crate::cli::{Cli, Commands};
use crate::commands;
use ufconvert_core::error::Result;

pub fn run(cli: &Cli, start: Instant) -> Result<()> {
    let result = match &cli.command {
        Commands::Convert {
            file,
            remove_unreferenced_objects,
            tokenize_tenant_id,
            max_policy_size,
            output,
        } => commands::convert::execute(
            cli,
            file,
            *remove_unreferenced_objects,
            *tokenize_tenant_id,
            *max_policy_size,
            output.as_deref(),
        ),

        Commands::Check {
            file,
            max_policy_size,
        } => commands::check::execute(cli, file, *max_policy_size),
    };

    tracing::debug!(elapsed = ?start.elapsed(), "command_complete");
    result
}
