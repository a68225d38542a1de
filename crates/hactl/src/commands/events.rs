//! `hactl events watch`: stream events until interrupted.

use hactl_core::{Context, EventFilter};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cli::{EventsArgs, EventsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

pub async fn handle(ctx: &Context, args: EventsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        EventsCommand::Watch { event_type, domain } => {
            let mut filter = EventFilter::new();
            if let Some(event_type) = event_type {
                filter = filter.with_event_type(event_type);
            }
            if let Some(domain) = domain {
                filter = filter.with_domain(domain);
            }
            watch(ctx, filter, global).await
        }
    }
}

async fn watch(ctx: &Context, filter: EventFilter, global: &GlobalOpts) -> Result<(), CliError> {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt received, stopping event stream");
            on_interrupt.cancel();
        }
    });

    let mut subscription = ctx.subscribe_events(filter, cancel).await?;
    if !global.quiet {
        eprintln!("connected, streaming events (Ctrl-C to stop)...");
    }

    while let Some(event) = subscription.next_event().await {
        let line = output::render_event(global.output, &event)?;
        output::print_output(&line, global.quiet);
    }
    debug!("event stream ended");
    Ok(())
}
