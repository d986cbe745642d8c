//! Resolve a SmartLink for a simulated request.

use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use serde::Serialize;

use smartlink_sdk::{LinkSummary, MetaTag, RequestContext, SetCookie};

use super::{build_sdk, print_json};
use crate::cli::{GlobalArgs, UrlCommand};

#[derive(Debug, Serialize)]
struct UrlOutput {
    #[serde(flatten)]
    summary: LinkSummary,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    set_cookies: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    meta: Vec<MetaTag>,
}

/// Request context from the command line
pub fn request_from(cmd: &UrlCommand) -> RequestContext {
    let mut ctx = RequestContext::from_query_string(cmd.query.trim_start_matches('?'));
    if let Some(user_agent) = &cmd.user_agent {
        ctx = ctx.with_header("user-agent", user_agent.clone());
    }
    if let Some(cookies) = &cmd.cookies {
        ctx = ctx.with_cookie_header(cookies);
    }
    ctx
}

pub async fn execute(cmd: UrlCommand, global: &GlobalArgs) -> Result<()> {
    let sdk = build_sdk(global)?;
    let ctx = request_from(&cmd);

    let mut link = sdk.smartlink(&ctx).await?;
    let summary = link.summary(cmd.shorten).await?;

    let set_cookies = if cmd.set_cookies {
        link.session_cookies(Utc::now())?
            .iter()
            .map(SetCookie::to_header_value)
            .collect()
    } else {
        Vec::new()
    };
    let meta = if cmd.meta { link.meta_tags().await? } else { Vec::new() };

    let output = UrlOutput {
        summary,
        set_cookies,
        meta,
    };

    if cmd.json {
        return print_json(&output);
    }

    print_output(&output);
    Ok(())
}

fn print_output(output: &UrlOutput) {
    let summary = &output.summary;
    println!("{}", format!("SmartLink {}", summary.entity).cyan().bold());
    println!("{}", "─".repeat(50));
    println!("  Environment: {}", summary.environment.to_string().green());
    println!("  Device:      {}", summary.device);
    println!("  Language:    {}", summary.lang);
    println!("  Share URL:   {}", summary.share_url);
    println!("  Target URL:  {}", summary.target_url.bold());

    if !summary.params.is_empty() {
        println!();
        println!("  {}", "Parameters".bold());
        for (key, value) in &summary.params {
            if summary.expired_params.contains(key) {
                println!("    {} = {} {}", key, value, "(expired)".yellow());
            } else {
                println!("    {} = {}", key, value);
            }
        }
    }

    if !output.set_cookies.is_empty() {
        println!();
        println!("  {}", "Set-Cookie".bold());
        for cookie in &output.set_cookies {
            println!("    {}", cookie.dimmed());
        }
    }

    if !output.meta.is_empty() {
        println!();
        println!("  {}", "Meta tags".bold());
        for tag in &output.meta {
            println!("    {} {}", format!("{}:", tag.property).cyan(), tag.content);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    #[test]
    fn test_request_from_command() {
        let cli = Cli::parse_from([
            "smartlink",
            "url",
            "?appId=5&ref=x",
            "--user-agent",
            "Mozilla/5.0 (iPhone)",
            "--cookies",
            "smartlink_lang=%22fr_FR%22",
        ]);
        let Commands::Url(cmd) = cli.command else {
            panic!("expected url command");
        };

        let ctx = request_from(&cmd);
        assert_eq!(ctx.query("appId"), Some("5"));
        assert_eq!(ctx.query("ref"), Some("x"));
        assert_eq!(ctx.user_agent(), "Mozilla/5.0 (iPhone)");
        assert_eq!(ctx.cookie("smartlink_lang"), Some("\"fr_FR\""));
    }
}
