//! Names as they appear in links and output file names.

/// Normalize a display name into a link/file-name stem: lower-cased, `+`
/// spelled out, and punctuation and whitespace removed.
///
/// `"Potion of Healing (+1)"` becomes `"potionofhealingplus1"`.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .replace('+', "plus")
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '\'' | '*' | '(' | ')' | '/'))
        .collect()
}

/// A wiki-style link to the normalized `name`, shown as `display` (or the
/// name itself).
pub fn wiki_link(name: &str, display: Option<&str>) -> String {
    format!("[[{}|{}]]", normalize_name(name), display.unwrap_or(name))
}

/// Upper-case the first letter of every space-separated word and
/// lower-case the rest.
pub fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
