//! Entity inspection commands.

use anyhow::{bail, Result};
use colored::Colorize;
use serde_json::{json, Value};

use super::{build_sdk, print_json};
use crate::cli::{EntityAction, EntityCommand, GlobalArgs};

pub async fn execute(cmd: EntityCommand, global: &GlobalArgs) -> Result<()> {
    let sdk = build_sdk(global)?;
    let lang = cmd.lang.as_deref().unwrap_or(&sdk.config().smartlink.default_lang);
    let entity = sdk.entity(cmd.entity, Some(lang))?;

    match cmd.action {
        EntityAction::Configs => print_json(entity.configs().await?),
        EntityAction::Config { key, attrs } => {
            if attrs.is_empty() {
                return print_json(&entity.config(&key).await?.unwrap_or(Value::Null));
            }
            let attrs: Vec<&str> = attrs.iter().map(String::as_str).collect();
            print_json(&entity.config_attrs(&key, &attrs).await?)
        }
        EntityAction::Infos => print_json(entity.infos().await?),
        EntityAction::Translate { key, args } => {
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            println!("{}", entity.translate(&key, &args).await);
            Ok(())
        }
        EntityAction::Languages => print_json(entity.languages().await?),
        EntityAction::Channels => {
            let channels = entity.channels().await?;
            if channels.is_empty() {
                println!("{}", format!("No channels for {}", entity.entity_ref()).yellow());
                return Ok(());
            }
            for channel in channels {
                let kind = json!(channel.channel_type);
                println!(
                    "  {} {} {}",
                    "→".cyan(),
                    kind.as_str().unwrap_or("other").bold(),
                    channel.url
                );
            }
            Ok(())
        }
        EntityAction::Stylesheet { files } => match sdk.stylesheet(&entity, &files).await {
            Some(css) => {
                print!("{}", css);
                Ok(())
            }
            None => bail!("stylesheet of {} could not be compiled", entity.entity_ref()),
        },
    }
}
