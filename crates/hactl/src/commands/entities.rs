//! Entity cache queries. These never open a connection.

use hactl_core::{CachedEntity, Context};
use tabled::Tabled;

use crate::cli::{EntitiesArgs, EntitiesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct EntityRow {
    #[tabled(rename = "Entity")]
    entity_id: String,
    #[tabled(rename = "Area")]
    area: String,
}

impl From<&CachedEntity> for EntityRow {
    fn from(e: &CachedEntity) -> Self {
        Self {
            entity_id: e.entity_id.clone(),
            area: e.area_id.clone().unwrap_or_default(),
        }
    }
}

pub fn handle(ctx: &Context, args: EntitiesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        EntitiesCommand::List { area } => {
            let entities = ctx.cached_entities(area.as_deref())?;
            let out = output::render_list(global.output, &entities, |e| EntityRow::from(e), |e| {
                e.entity_id.clone()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
