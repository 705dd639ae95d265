//! Naming conventions linking reference columns to their target tables.
//!
//! A column named `repository_id` signals a foreign-key relationship to the
//! `repositories` table. These helpers implement that convention.

/// Pluralize an entity name into its conventional table name.
pub fn pluralize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix('y') {
        if stem
            .chars()
            .last()
            .is_some_and(|c| !matches!(c, 'a' | 'e' | 'i' | 'o' | 'u'))
        {
            return format!("{}ies", stem);
        }
    }

    if word.ends_with('s')
        || word.ends_with('x')
        || word.ends_with('z')
        || word.ends_with("ch")
        || word.ends_with("sh")
    {
        return format!("{}es", word);
    }

    format!("{}s", word)
}

/// Extract the referenced entity name from a column that follows the `_id`
/// convention. Returns `None` for columns that carry no reference signal.
pub fn reference_target(column: &str) -> Option<&str> {
    match column.strip_suffix("_id") {
        Some("") | None => None,
        Some(entity) => Some(entity),
    }
}

/// Conventional table name referenced by a column, if the column name
/// carries a reference signal at all.
pub fn referenced_table(column: &str) -> Option<String> {
    reference_target(column).map(pluralize)
}
