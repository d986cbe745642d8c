//! SmartLinks: the share URL of an entity and the target URL a visitor is
//! redirected to, plus the session cookies that carry parameters across
//! requests.

mod builder;
mod params;

pub use builder::{LinkSummary, MetaTag, SmartLinkBuilder};
pub use params::{is_reserved, ParamBag, RESERVED_PARAMS};
