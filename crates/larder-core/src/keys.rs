//! Canonical uniqueness keys derived from user-supplied text.

/// Order- and case-independent key for a comma-separated ingredient list.
///
/// `"Tomato, Onion"` and `"onion,tomato"` both map to `"onion,tomato"`.
pub fn canonical_ingredient_key(text: &str) -> String {
    let mut items: Vec<String> = text
        .split(',')
        .map(|item| item.trim().to_lowercase())
        .filter(|item| !item.is_empty())
        .collect();
    items.sort();
    items.join(",")
}

pub fn canonical_cuisine_key(text: &str) -> String {
    text.trim().to_lowercase()
}

pub fn canonical_recipe_key(text: &str) -> String {
    text.trim().to_lowercase()
}
