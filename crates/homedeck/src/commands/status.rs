//! Status command handler.

use serde::Serialize;

use crate::cli::GlobalOpts;
use crate::config::Session;
use crate::error::CliError;
use crate::output;

// ── Report shape ────────────────────────────────────────────────────

#[derive(Serialize)]
struct StatusReport {
    server: Option<String>,
    hub: Option<String>,
    /// Live probe result, unlike the cached `online` flag.
    connection: String,
    online: bool,
    entities: usize,
    favorites: usize,
    last_sync_epoch: i64,
    sync_interval_secs: u64,
    database: String,
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    let companion = &session.companion;

    let connection = if session.hub_url.is_some() {
        match companion.test_connection().await {
            Ok(()) => "reachable".to_string(),
            Err(err) => format!("unreachable ({err})"),
        }
    } else {
        "not configured".to_string()
    };

    let report = StatusReport {
        server: session.server_name.clone(),
        hub: session.hub_url.clone(),
        connection,
        online: companion.is_online(),
        entities: companion.entity_count()?,
        favorites: companion.favorites()?.len(),
        last_sync_epoch: companion.last_sync(),
        sync_interval_secs: companion.sync_interval(),
        database: session.db_path.display().to_string(),
    };

    let out = output::render_single(&global.output, &report, status_detail, |_| "status".into());
    output::print_output(&out, global.quiet);
    Ok(())
}

fn status_detail(report: &StatusReport) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    match (&report.server, &report.hub) {
        (Some(server), Some(hub)) => {
            let _ = writeln!(out, "Server:        {server} ({hub})");
        }
        _ => {
            let _ = writeln!(out, "Server:        (not configured)");
        }
    }
    let _ = writeln!(
        out,
        "Connection:    {}",
        output::paint_flag(&report.connection, report.connection == "reachable")
    );
    let _ = writeln!(
        out,
        "Cache:         {}",
        output::paint_flag(
            if report.online { "online" } else { "offline" },
            report.online
        )
    );
    let _ = writeln!(out, "Entities:      {}", report.entities);
    let _ = writeln!(out, "Favorites:     {}", report.favorites);
    let _ = writeln!(
        out,
        "Last sync:     {}",
        output::format_age(report.last_sync_epoch)
    );
    let _ = writeln!(out, "Sync interval: {}s", report.sync_interval_secs);
    let _ = writeln!(out, "Database:      {}", report.database);

    out.trim_end().to_string()
}
