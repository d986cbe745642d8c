//! External collaborators: user-agent classification, link shortening and
//! stylesheet compilation. Each is a trait with one default implementation.

mod classifier;
mod shortener;
mod stylesheet;

pub use classifier::{ClientInfo, HeuristicClassifier, UserAgentClassifier};
pub use shortener::{BitlyShortener, LinkShortener};
pub use stylesheet::{PlainCssCompiler, StylesheetCompiler};
