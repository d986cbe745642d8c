//! Supported locale tags.

use crate::error::{Error, Result};

/// Locale tags the configuration API serves translations for.
pub const SUPPORTED_LANGS: &[&str] = &[
    "ar_AE", "cs_CZ", "da_DK", "de_AT", "de_CH", "de_DE", "el_GR", "en_AU", "en_CA", "en_GB",
    "en_US", "es_ES", "es_MX", "fi_FI", "fr_BE", "fr_CA", "fr_CH", "fr_FR", "hu_HU", "it_CH",
    "it_IT", "ja_JP", "ko_KR", "nb_NO", "nl_BE", "nl_NL", "pl_PL", "pt_BR", "pt_PT", "ro_RO",
    "ru_RU", "sk_SK", "sv_SE", "tr_TR", "uk_UA", "zh_CN",
];

/// Language used when none is requested
pub const DEFAULT_LANG: &str = "de_DE";

/// Whether `tag` is an allow-listed locale
pub fn is_supported(tag: &str) -> bool {
    SUPPORTED_LANGS.contains(&tag)
}

/// Validate a locale tag
pub fn validate_lang(tag: &str) -> Result<()> {
    if is_supported(tag) {
        Ok(())
    } else {
        Err(Error::invalid_input(format!("unsupported language tag '{}'", tag)))
    }
}
