//! Stylesheet compilation.

use smartlink_core::StylesheetRequest;
use std::fs;

use crate::SdkResult;

/// Compiles a [`StylesheetRequest`] into CSS text
pub trait StylesheetCompiler: Send + Sync {
    fn compile(&self, request: &StylesheetRequest) -> SdkResult<String>;
}

/// Concatenating compiler for plain CSS.
///
/// Files are read in order, followed by the inline sources. `$name` and
/// `@name` references are replaced by the request's variables, then the
/// string replacements are applied.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainCssCompiler;

impl StylesheetCompiler for PlainCssCompiler {
    fn compile(&self, request: &StylesheetRequest) -> SdkResult<String> {
        let mut css = String::new();
        for file in &request.files {
            css.push_str(&fs::read_to_string(file)?);
            css.push('\n');
        }
        for source in &request.inline_sources {
            css.push_str(source);
            css.push('\n');
        }

        // Longest names first so `$primary` never clobbers `$primary_dark`
        let mut variables: Vec<(&String, &String)> = request.variables.iter().collect();
        variables.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        for (name, value) in variables {
            css = css.replace(&format!("${}", name), value);
            css = css.replace(&format!("@{}", name), value);
        }

        for (from, to) in &request.replacements {
            css = css.replace(from.as_str(), to);
        }

        Ok(css)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_compile_files_inline_and_variables() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "h1 {{ color: @primary; background: url(../img/bg.png); }}").unwrap();

        let mut request = StylesheetRequest::default().with_replacement("../img/", "/static/img/");
        request.files.push(file.path().to_path_buf());
        request.inline_sources.push("a { color: $primary_dark; }".into());
        request.variables.insert("primary".into(), "#f00".into());
        request.variables.insert("primary_dark".into(), "#800".into());

        let css = PlainCssCompiler.compile(&request).unwrap();
        assert!(css.contains("h1 { color: #f00; background: url(/static/img/bg.png); }"));
        assert!(css.contains("a { color: #800; }"));
    }

    #[test]
    fn test_compile_missing_file_fails() {
        let mut request = StylesheetRequest::default();
        request.files.push("/nonexistent/theme.css".into());
        assert!(PlainCssCompiler.compile(&request).is_err());
    }
}
