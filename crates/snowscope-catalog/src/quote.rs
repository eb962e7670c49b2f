//! Identifier and literal rendering for generated statements

/// Render an identifier for interpolation
///
/// Names are taken exactly as the warehouse reports them. Only the canonical
/// unquoted form (`[A-Z_][A-Z0-9_$]*`) is left bare, since Snowflake folds
/// bare identifiers to upper case; anything else is double-quoted with `"`
/// doubled.
pub fn ident(name: &str) -> String {
    let mut chars = name.chars();
    let plain = matches!(chars.next(), Some(c) if c.is_ascii_uppercase() || c == '_')
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_' || c == '$');

    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// Dotted path of identifiers (`db.schema.object`)
pub fn qualified(parts: &[&str]) -> String {
    parts.iter().map(|p| ident(p)).collect::<Vec<_>>().join(".")
}

/// Single-quoted string literal with `'` and `\` escaped
pub fn literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}
