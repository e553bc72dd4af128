use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern compiles"));

/// Quote an identifier for embedding in generated SQL.
///
/// Wraps the name in double quotes and doubles any embedded double quote,
/// which is how PostgreSQL reads a delimited identifier back. Used for
/// every table, column, schema and view name, including names taken from
/// CSV file names and headers.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `"schema"."name"`
pub fn qualified_name(schema: &str, name: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(name))
}

/// Normalize a column header or file stem into a table/column name.
///
/// Trims, lowercases and collapses every inner whitespace run into a single
/// underscore. No other characters are touched; quoting handles the rest.
pub fn normalize_identifier(raw: &str) -> String {
    let trimmed = raw.trim().trim_start_matches('\u{feff}').trim();
    WHITESPACE_RUN.replace_all(&trimmed.to_lowercase(), "_").into_owned()
}

/// Raw table name for a source file: its normalized file stem
pub fn table_name_for_path(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let name = normalize_identifier(stem);
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// Read back a delimited identifier produced by `quote_ident`.
    ///
    /// Returns `None` for anything PostgreSQL would not accept as a single
    /// quoted identifier.
    fn unquote_ident(quoted: &str) -> Option<String> {
        let inner = quoted.strip_prefix('"')?.strip_suffix('"')?;
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c == '"' {
                // a lone quote would have ended the identifier
                if chars.next() != Some('"') {
                    return None;
                }
            }
            out.push(c);
        }
        Some(out)
    }

    #[test]
    fn test_quote_plain_identifier() {
        assert_eq!(quote_ident("order_items"), "\"order_items\"");
        assert_eq!(qualified_name("raw", "orders"), "\"raw\".\"orders\"");
    }

    #[test]
    fn test_quote_round_trip_with_quote_and_space() {
        for name in ["sale \"price\"", "my column", "\"", "a\"\"b", "weird;name--"] {
            let quoted = quote_ident(name);
            assert_eq!(unquote_ident(&quoted).as_deref(), Some(name), "{quoted}");
        }
    }

    #[test]
    fn test_unquote_rejects_broken_identifiers() {
        assert_eq!(unquote_ident("plain"), None);
        assert_eq!(unquote_ident("\"a\"b\""), None);
        assert_eq!(unquote_ident("\"open"), None);
    }

    #[test]
    fn test_normalize_identifier() {
        assert_eq!(normalize_identifier("  Sale Price "), "sale_price");
        assert_eq!(normalize_identifier("Created\tAt"), "created_at");
        assert_eq!(normalize_identifier("a   b"), "a_b");
        assert_eq!(normalize_identifier("\u{feff}id"), "id");
        assert_eq!(normalize_identifier("Weird\"Name"), "weird\"name");
    }

    #[test]
    fn test_table_name_for_path() {
        assert_eq!(
            table_name_for_path(&PathBuf::from("/data/Order Items.csv")).as_deref(),
            Some("order_items")
        );
        assert_eq!(table_name_for_path(&PathBuf::from("/data/ .csv")), None);
    }
}
