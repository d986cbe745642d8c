//! Cache invalidation.

use anyhow::{bail, Result};
use colored::Colorize;
use smartlink_core::CacheDirective;
use smartlink_sdk::CacheBackend;

use super::build_sdk;
use crate::cli::{GlobalArgs, InvalidateCommand};

pub async fn execute(cmd: InvalidateCommand, global: &GlobalArgs) -> Result<()> {
    if cmd.entity.is_some() && CacheDirective::from_param(&cmd.directive).is_none() {
        bail!("unknown cache directive '{}'", cmd.directive);
    }

    let sdk = build_sdk(global)?;
    if sdk.config().cache.backend == CacheBackend::Memory {
        println!(
            "{}",
            "○ memory cache lives only as long as this process; nothing to invalidate".yellow()
        );
    }

    let gateway = sdk.gateway();
    let mut invalidated = Vec::new();

    if let Some(entity) = &cmd.entity {
        let tags = sdk.apply_directive(&gateway, entity, &cmd.directive).await;
        if tags.is_empty() {
            println!(
                "{}",
                format!("○ '{}' does not apply to {}", cmd.directive, entity).yellow()
            );
        }
        invalidated.extend(tags);
    }

    if !cmd.tags.is_empty() {
        gateway.cache().invalidate_tags(&cmd.tags).await;
        invalidated.extend(cmd.tags);
    }

    if !invalidated.is_empty() {
        println!("{}", "✓ Invalidated".green());
        for tag in invalidated {
            println!("  {} {}", "→".cyan(), tag);
        }
    }
    Ok(())
}
