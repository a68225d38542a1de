//! Command dispatch: bridges CLI args -> core Context -> output formatting.

pub mod admin;
pub mod area;
pub mod config_cmd;
pub mod entities;
pub mod events;
pub mod sync;

use hactl_core::Context;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a context-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Sync => sync::handle(ctx, global).await,
        Command::Events(args) => events::handle(ctx, args, global).await,
        Command::Area(args) => area::handle(ctx, args, global).await,
        Command::Entities(args) => entities::handle(ctx, args, global),
        Command::Expose { entity_id } => admin::set_exposed(ctx, &entity_id, true, global).await,
        Command::Unexpose { entity_id } => admin::set_exposed(ctx, &entity_id, false, global).await,
        Command::Rename { entity_id, name } => admin::rename(ctx, &entity_id, &name, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Validation {
            field: "command".into(),
            reason: "handled before dispatch".into(),
        }),
    }
}
