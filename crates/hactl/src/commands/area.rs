//! Area command handlers.

use hactl_core::{AreaEntry, Context};
use tabled::Tabled;

use crate::cli::{AreaArgs, AreaCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct AreaRow {
    #[tabled(rename = "Area ID")]
    area_id: String,
    #[tabled(rename = "Name")]
    name: String,
}

impl From<&AreaEntry> for AreaRow {
    fn from(a: &AreaEntry) -> Self {
        Self {
            area_id: a.area_id.clone(),
            name: a.name.clone(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: AreaArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        AreaCommand::List => {
            let areas = ctx.list_areas().await?;
            let out = output::render_list(global.output, &areas, |a| AreaRow::from(a), |a| {
                format!("{} (id={})", a.name, a.area_id)
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
