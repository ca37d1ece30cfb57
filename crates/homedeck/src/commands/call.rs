//! Service call handler.

use crate::cli::{CallArgs, GlobalOpts};
use crate::config::Session;
use crate::error::CliError;

use super::util;

pub async fn handle(session: &Session, args: &CallArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let data = args
        .data
        .as_deref()
        .map(util::parse_service_data)
        .transpose()?;

    session
        .companion
        .call_service(
            &args.domain,
            &args.service,
            args.entity.as_deref(),
            data.as_ref(),
        )
        .await?;

    if !global.quiet {
        match &args.entity {
            // The facade refetches the target after the call, so the
            // cached state read here is already post-command.
            Some(entity_id) => match session.companion.entity(entity_id)? {
                Some(entity) => eprintln!(
                    "Called {}.{} on {entity_id} (state: {})",
                    args.domain, args.service, entity.state
                ),
                None => eprintln!("Called {}.{} on {entity_id}", args.domain, args.service),
            },
            None => eprintln!("Called {}.{}", args.domain, args.service),
        }
    }
    Ok(())
}
