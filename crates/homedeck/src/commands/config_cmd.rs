//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Replace stored tokens so `show` never echoes secrets, in any format.
fn redact(mut cfg: Config) -> Config {
    for profile in cfg.servers.values_mut() {
        if profile.token.is_some() {
            profile.token = Some("****".into());
        }
    }
    cfg
}

/// Format config for table display, TOML-shaped for easy copying.
fn format_config(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_server {
        let _ = writeln!(out, "default_server = \"{default}\"");
        let _ = writeln!(out);
    }
    let _ = writeln!(out, "[cache]");
    let _ = writeln!(out, "sync_interval_secs = {}", cfg.cache.sync_interval_secs);
    if let Some(ref db) = cfg.cache.db_path {
        let _ = writeln!(out, "db_path = \"{}\"", db.display());
    }

    for (name, profile) in &cfg.servers {
        let _ = writeln!(out);
        let _ = writeln!(out, "[servers.{name}]");
        if let Some(ref url) = profile.url {
            let _ = writeln!(out, "url = \"{url}\"");
        }
        let _ = writeln!(out, "port = {}", profile.port);
        if let Some(ref token) = profile.token {
            let _ = writeln!(out, "token = \"{token}\"");
        }
        if let Some(ref env) = profile.token_env {
            let _ = writeln!(out, "token_env = \"{env}\"");
        }
        let _ = writeln!(out, "insecure = {}", profile.insecure);
        let _ = writeln!(out, "timeout_secs = {}", profile.timeout_secs);
    }

    out.trim_end().to_string()
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => {
            let path = config::config_path();
            if path.exists() {
                if !global.quiet {
                    eprintln!("Config already exists: {}", path.display());
                }
                return Ok(());
            }

            config::save_config_to(&config::example_config(), &path)?;
            if !global.quiet {
                eprintln!("Wrote starter config to {}", path.display());
                eprintln!(
                    "Edit it with your hub address, then export HOMEDECK_TOKEN \
                     with a long-lived access token."
                );
            }
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = redact(config::load_config()?);
            let out = output::render_single(&global.output, &cfg, format_config, |_| {
                "config".into()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }
    }
}
