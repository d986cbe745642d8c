//! Fetch an API route through the tagged cache.

use anyhow::Result;
use colored::Colorize;
use smartlink_core::client::QueryParams;

use super::{build_sdk, print_json};
use crate::cli::{FetchCommand, GlobalArgs};

pub async fn execute(cmd: FetchCommand, global: &GlobalArgs) -> Result<()> {
    let sdk = build_sdk(global)?;
    let gateway = sdk.gateway();

    let params: QueryParams = cmd.params.into_iter().collect();
    let value = gateway.fetch(&cmd.route, cmd.lang.as_deref(), &params).await?;

    if cmd.tags {
        match gateway.tags_for(&cmd.route, &value).await? {
            Some(tags) => {
                let tags: Vec<&str> = tags.iter().map(String::as_str).collect();
                eprintln!("{} {}", "tags:".cyan(), tags.join(", "));
            }
            None => eprintln!("{}", "not cacheable".yellow()),
        }
    }

    print_json(&value)
}
