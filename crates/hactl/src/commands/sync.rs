//! `hactl sync`: refresh the local filter cache from the server.

use hactl_core::{Context, SyncReport};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

fn detail(report: &SyncReport) -> String {
    format!(
        "Synced {} exposed entities ({} with an area) to {}",
        report.exposed,
        report.with_area,
        report.cache_dir.display()
    )
}

pub async fn handle(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let report = ctx.sync().await?;
    let out = output::render_single(global.output, &report, detail)?;
    output::print_output(&out, global.quiet);
    Ok(())
}
