//! PostgreSQL quoting helpers.
//!
//! Every statement the engine emits goes through these helpers so that
//! identifiers and literals are escaped the same way everywhere.

/// Quotes an identifier, doubling embedded quotes.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Returns the quoted `"schema"."name"` form.
#[must_use]
pub fn qualified(schema: &str, name: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(name))
}

/// Quotes a string literal, doubling embedded single quotes.
#[must_use]
pub fn literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Renders an optional comment as a literal or `null`.
#[must_use]
pub fn comment_literal(comment: Option<&str>) -> String {
    comment.map_or_else(|| "null".to_string(), literal)
}

/// Quotes a role name; `PUBLIC` is a keyword, not a role.
#[must_use]
pub fn quote_role(role: &str) -> String {
    if role.eq_ignore_ascii_case("public") {
        "PUBLIC".to_string()
    } else {
        quote_ident(role)
    }
}

/// Trims trailing whitespace and semicolons from a catalog definition.
#[must_use]
pub fn strip_terminator(definition: &str) -> &str {
    definition.trim_end().trim_end_matches(';').trim_end()
}

/// Splits an array type into its element type and the `[]` suffix.
#[must_use]
pub fn split_array(data_type: &str) -> (&str, &str) {
    let trimmed = data_type.trim_end();
    trimmed
        .strip_suffix("[]")
        .map_or((trimmed, ""), |element| (element, "[]"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("users"), "\"users\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_qualified() {
        assert_eq!(qualified("public", "t"), "\"public\".\"t\"");
    }

    #[test]
    fn test_literal_escapes_quotes() {
        assert_eq!(literal("it's"), "'it''s'");
        assert_eq!(comment_literal(None), "null");
    }

    #[test]
    fn test_quote_role_public() {
        assert_eq!(quote_role("public"), "PUBLIC");
        assert_eq!(quote_role("app_user"), "\"app_user\"");
    }

    #[test]
    fn test_split_array() {
        assert_eq!(split_array("\"public\".\"mood\"[]"), ("\"public\".\"mood\"", "[]"));
        assert_eq!(split_array("integer"), ("integer", ""));
    }

    #[test]
    fn test_strip_terminator() {
        assert_eq!(strip_terminator(" SELECT 1;\n"), " SELECT 1");
    }
}
