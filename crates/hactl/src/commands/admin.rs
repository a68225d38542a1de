//! Entity registry administration: expose, unexpose, rename.
//!
//! All three require filter mode `all`; the check runs in the core
//! before any connection is opened.

use hactl_core::Context;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub async fn set_exposed(
    ctx: &Context,
    entity_id: &str,
    exposed: bool,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    ctx.set_exposed(entity_id, exposed).await?;
    if !global.quiet {
        let state = if exposed { "exposed to" } else { "hidden from" };
        eprintln!("Entity '{entity_id}' is now {state} Assist.");
        eprintln!("Run 'hactl sync' to update the local cache.");
    }
    Ok(())
}

pub async fn rename(
    ctx: &Context,
    entity_id: &str,
    name: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    ctx.rename_entity(entity_id, name).await?;
    if !global.quiet {
        eprintln!("Entity '{entity_id}' renamed to '{name}'.");
    }
    Ok(())
}
