//! SQL identifier quoting utilities

/// Quote a SQL identifier, doubling any embedded double quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a schema-qualified name as `"schema"."object"`.
pub fn quote_qualified(schema: &str, object: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(object))
}

/// Reverse [`quote_ident`]. Unquoted input is returned trimmed but otherwise unchanged.
pub fn unquote(ident: &str) -> String {
    let trimmed = ident.trim();
    match trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        Some(inner) => inner.replace("\"\"", "\""),
        None => trimmed.to_string(),
    }
}
