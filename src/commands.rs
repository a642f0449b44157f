//! Subcommand handlers
//!
//! Reports go to `out` (stdout in the binary), notices to `err`. Filter
//! arguments are parsed before anything is fetched.

use anyhow::{bail, Context, Result};
use localup_inspect_client::{InspectorService, InspectorSource, TailStats};
use localup_inspect_report::{FiltersSummary, ReportFormatter};
use std::io::Write;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::{GetArgs, ListArgs, TailArgs};

/// `list`: filtered Markdown report, or a notice when nothing matches
pub async fn run_list<S, O, E>(
    service: &InspectorService<S>,
    args: &ListArgs,
    base_url: &str,
    out: &mut O,
    err: &mut E,
) -> Result<()>
where
    S: InspectorSource,
    O: Write,
    E: Write,
{
    let filters = args.to_filters()?;
    let options = args.display.to_format_options();
    let summary = FiltersSummary::from_filters(&filters);

    let records = service
        .list(&filters)
        .await
        .context("Failed to list captured requests")?;

    let formatter = ReportFormatter::new();
    if records.is_empty() {
        writeln!(err, "{}", formatter.format_empty(&summary, base_url))?;
        return Ok(());
    }

    writeln!(out, "{}", formatter.format_requests(&records, &options, &summary))?;
    Ok(())
}

/// `get`: one record as Markdown
pub async fn run_get<S, O>(service: &InspectorService<S>, args: &GetArgs, out: &mut O) -> Result<()>
where
    S: InspectorSource,
    O: Write,
{
    let options = args.display.to_format_options();

    let record = service
        .get(&args.id)
        .await
        .context(format!("Failed to get captured request {}", args.id))?;

    writeln!(out, "{}", ReportFormatter::new().format_request(&record, &options))?;
    Ok(())
}

/// `tail`: print new matching records until `cancel` fires
pub async fn run_tail<S, O, E>(
    service: &InspectorService<S>,
    args: &TailArgs,
    base_url: &str,
    poll_interval: Duration,
    cancel: CancellationToken,
    out: &mut O,
    err: &mut E,
) -> Result<TailStats>
where
    S: InspectorSource,
    O: Write,
    E: Write,
{
    let filters = args.filters.to_filters()?;
    let options = args.display.to_format_options();
    let summary = FiltersSummary::from_filters(&filters);

    if summary.is_empty() {
        writeln!(err, "Watching for new requests at {} (Ctrl+C to stop)", base_url)?;
    } else {
        writeln!(
            err,
            "Watching for new requests at {} matching {} (Ctrl+C to stop)",
            base_url, summary
        )?;
    }

    let mut write_error: Option<std::io::Error> = None;
    let stop = cancel.clone();
    let stats = service
        .tail(&filters, options)
        .with_poll_interval(poll_interval)
        .run(cancel, |entry| {
            if write_error.is_some() {
                return;
            }
            if let Err(e) = writeln!(out, "{}\n", entry).and_then(|_| out.flush()) {
                warn!("Failed to write tail output: {}", e);
                write_error = Some(e);
                stop.cancel();
            }
        })
        .await
        .context("Tail stopped")?;

    if let Some(e) = write_error {
        return Err(e).context("Failed to write tail output");
    }

    info!("Tail finished: {:?}", stats);
    Ok(stats)
}

/// `status`: succeed only if the inspector answers
pub async fn run_status<S, O>(service: &InspectorService<S>, base_url: &str, out: &mut O) -> Result<()>
where
    S: InspectorSource,
    O: Write,
{
    if !service.health_check().await {
        bail!(
            "Inspector is not reachable at {}\n\n\
             Make sure the tunnel agent is running, or point --base-url / LOCALUP_INSPECT_URL \
             at its inspector address.",
            base_url
        );
    }

    writeln!(out, "Inspector is reachable at {}", base_url)?;
    Ok(())
}
