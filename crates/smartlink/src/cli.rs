//! CLI argument definitions using clap derive macros.

use clap::{Args, Parser, Subcommand};
use smartlink_core::{EntityRef, EntityType};
use std::path::PathBuf;

/// SmartLink CLI
///
/// Resolve SmartLinks, inspect entities and manage the configuration cache.
#[derive(Parser, Debug)]
#[command(name = "smartlink")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true, env = "SMARTLINK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Serve API responses from a JSON file of routes instead of the network
    #[arg(long, global = true)]
    pub fixtures: Option<PathBuf>,

    /// Configuration API base URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Public base URL of the SmartLink entry file
    #[arg(long, global = true)]
    pub base_url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve the share and target URL for a simulated request
    Url(UrlCommand),

    /// Fetch a configuration API route through the cache
    Fetch(FetchCommand),

    /// Inspect an app, template or version
    Entity(EntityCommand),

    /// Invalidate cached responses by entity directive or raw tags
    Invalidate(InvalidateCommand),

    /// Configuration management
    Config(ConfigCommand),

    /// Show version
    Version,
}

// ─────────────────────────────────────────────────────────────────────────────
// URL Command
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct UrlCommand {
    /// Request query string, e.g. "appId=5&ref=newsletter"
    pub query: String,

    /// User-Agent header of the simulated visitor
    #[arg(short, long)]
    pub user_agent: Option<String>,

    /// Cookie header of the simulated visitor
    #[arg(long)]
    pub cookies: Option<String>,

    /// Shorten the share URL
    #[arg(short, long)]
    pub shorten: bool,

    /// Also print the Set-Cookie headers
    #[arg(long)]
    pub set_cookies: bool,

    /// Also print the Open Graph tags
    #[arg(long)]
    pub meta: bool,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Fetch Command
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct FetchCommand {
    /// API route, e.g. apps/5/configs
    pub route: String,

    /// Language to request
    #[arg(short, long)]
    pub lang: Option<String>,

    /// Extra query parameter (key=value, repeatable)
    #[arg(short, long = "param", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,

    /// Print the cache tags the response would be stored under
    #[arg(long)]
    pub tags: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Entity Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct EntityCommand {
    /// Entity tag, e.g. app.5 or template.3
    #[arg(value_parser = parse_entity_ref)]
    pub entity: EntityRef,

    /// Language of the entity data
    #[arg(short, long)]
    pub lang: Option<String>,

    #[command(subcommand)]
    pub action: EntityAction,
}

#[derive(Subcommand, Debug)]
pub enum EntityAction {
    /// List all config records
    Configs,

    /// Show attributes of one config record
    Config {
        /// Config key
        key: String,

        /// Attributes to show (defaults to value)
        #[arg(short, long = "attr")]
        attrs: Vec<String>,
    },

    /// Show the merged infos
    Infos,

    /// Translate a key with optional printf-style arguments
    Translate {
        /// Translation key
        key: String,

        /// Arguments for %s / %d / %n$s placeholders
        args: Vec<String>,
    },

    /// List available languages
    Languages,

    /// List publication channels
    Channels,

    /// Compile the entity stylesheet
    Stylesheet {
        /// Stylesheet files compiled before the inline configs
        files: Vec<PathBuf>,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Invalidate Command
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
#[command(group(clap::ArgGroup::new("target").required(true).multiple(true).args(["entity", "tags"])))]
pub struct InvalidateCommand {
    /// Entity tag, e.g. app.5
    #[arg(value_parser = parse_entity_ref)]
    pub entity: Option<EntityRef>,

    /// all, configs, infos, translations, languages, channels, apps or templates
    #[arg(short, long, default_value = "all")]
    pub directive: String,

    /// Raw cache tag to invalidate (repeatable), e.g. appTemplate.3
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Config Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Show the config file path
    Path,

    /// Validate the effective configuration
    Check,
}

// ─────────────────────────────────────────────────────────────────────────────
// Value parsers
// ─────────────────────────────────────────────────────────────────────────────

/// Parse `app.5`, `template.3` or `version.8`
pub fn parse_entity_ref(s: &str) -> Result<EntityRef, String> {
    let (kind, id) = s
        .split_once(['.', ':'])
        .ok_or_else(|| format!("expected <type>.<id>, got '{}'", s))?;
    let entity_type = EntityType::from_tag_name(kind)
        .or_else(|| EntityType::from_collection(kind))
        .ok_or_else(|| format!("unknown entity type '{}'", kind))?;
    let id = id
        .parse()
        .map_err(|_| format!("invalid entity id '{}'", id))?;
    Ok(EntityRef::new(entity_type, id))
}

pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{}'", s))
}
