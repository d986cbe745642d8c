//! printf-style substitution for translation strings.
//!
//! Supports `%s`, `%d`, positional `%1$s` / `%2$d` and the `%%` escape.
//! Anything else is copied through unchanged.

/// Substitute `args` into `template`.
///
/// Missing arguments render as empty strings; `%d` renders non-numeric
/// arguments as `0`.
pub fn format_printf(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    let mut next_arg = 0;

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }

        let mut digits = String::new();
        while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
            digits.push(d);
            chars.next();
        }

        let position = if digits.is_empty() {
            None
        } else if chars.peek() == Some(&'$') {
            chars.next();
            digits.parse::<usize>().ok()
        } else {
            out.push('%');
            out.push_str(&digits);
            continue;
        };

        let conversion = match chars.peek().copied() {
            Some(conv @ ('s' | 'd')) => {
                chars.next();
                conv
            }
            _ => {
                out.push('%');
                if let Some(p) = position {
                    out.push_str(&format!("{}$", p));
                }
                continue;
            }
        };

        let index = match position {
            Some(p) => p.saturating_sub(1),
            None => {
                next_arg += 1;
                next_arg - 1
            }
        };
        let arg = args.get(index).copied().unwrap_or("");

        if conversion == 'd' {
            let n = arg.trim().parse::<f64>().map(|f| f.trunc() as i64).unwrap_or(0);
            out.push_str(&n.to_string());
        } else {
            out.push_str(arg);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_args() {
        assert_eq!(format_printf("Hello %s!", &["World"]), "Hello World!");
        assert_eq!(format_printf("%s of %s", &["1", "3"]), "1 of 3");
        assert_eq!(format_printf("no placeholders", &["x"]), "no placeholders");
    }

    #[test]
    fn test_positional_args() {
        assert_eq!(format_printf("%2$s, %1$s", &["first", "second"]), "second, first");
        assert_eq!(format_printf("%1$s and %1$s", &["again"]), "again and again");
    }

    #[test]
    fn test_numbers_and_escapes() {
        assert_eq!(format_printf("%d%% done", &["42.7"]), "42% done");
        assert_eq!(format_printf("%d points", &["lots"]), "0 points");
        assert_eq!(format_printf("missing: %s.", &[]), "missing: .");
        assert_eq!(format_printf("100%", &[]), "100%");
        assert_eq!(format_printf("%x %5s", &["a"]), "%x %5s");
    }
}
