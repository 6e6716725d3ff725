//! Inline `{@tag ...}` macros rewritten to Markdown and wiki links.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::naming::{title_case, wiki_link};

struct Rule {
    pattern: Regex,
    rewrite: fn(&Captures) -> String,
}

impl Rule {
    fn new(pattern: &str, rewrite: fn(&Captures) -> String) -> Self {
        Rule {
            pattern: Regex::new(pattern).unwrap(),
            rewrite,
        }
    }
}

// Optional `|source` and `|source|display` qualifiers of a cross-reference.
const QUALIFIERS: &str = r"(?:\|[a-zA-Z0-9 ']*(?:\|([a-zA-Z0-9 ']+))?)?";

/// Applied in order; later rules see the output of earlier ones.
static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule::new(r"\{@condition ([a-zA-Z0-9 ]+)\}", |caps| {
            wiki_link(&caps[1], Some(&title_case(&caps[1])))
        }),
        Rule::new(r"\{@(?:dice|damage) ([0-9a-zA-Z+ ]+)\}", |caps| {
            format!("`dice: {0}` ({0})", &caps[1])
        }),
        Rule::new(&format!(r"\{{@spell ([0-9a-zA-Z ]+){}\}}", QUALIFIERS), |caps| {
            let display = match caps.get(2) {
                Some(display) => display.as_str().to_string(),
                None => caps[1].to_lowercase(),
            };
            wiki_link(&caps[1], Some(&display))
        }),
        Rule::new(
            &format!(r"\{{@(?:item|creature|quickref) ([0-9a-zA-Z ]+){}\}}", QUALIFIERS),
            |caps| {
                let display = match caps.get(2) {
                    Some(display) => display.as_str().to_string(),
                    None => title_case(&caps[1]),
                };
                wiki_link(&caps[1], Some(&display))
            },
        ),
        Rule::new(r"\{@b ([A-Za-z0-9 ]+)\}", |caps| format!("**{}**", &caps[1])),
        Rule::new(r"\{@i ([A-Za-z0-9 ]+)\}", |caps| format!("_{}_", &caps[1])),
        Rule::new(r"\{@atk (ms|rs|mw|rw|mw,rw)\}", |caps| {
            let kind = match &caps[1] {
                "ms" => "Melee Spell",
                "rs" => "Ranged Spell",
                "mw" => "Melee Weapon",
                "rw" => "Ranged Weapon",
                _ => "Melee / Ranged Weapon",
            };
            format!("_{} Attack_", kind)
        }),
        Rule::new(r"\{@action ([A-Za-z0-9 ]+)\}", |caps| wiki_link(&caps[1], None)),
        Rule::new(r"^\{@note (.+)\}$", |caps| {
            format!("> [!note] Note\n> {}", expand(&caps[1]))
        }),
        Rule::new(r"([A-Z][a-z]+) \(\{@skill ([0-9a-zA-Z ]+)\}\)", |caps| {
            let display = format!("{} ({})", title_case(&caps[1]), title_case(&caps[2]));
            wiki_link(&caps[2], Some(&display))
        }),
    ]
});

/// Rewrite every recognized macro in `text`. Anything else, including
/// unrecognized `{@...}` forms, is returned as it is.
pub fn expand(text: &str) -> String {
    if !text.contains("{@") {
        return text.to_string();
    }
    RULES.iter().fold(text.to_string(), |text, rule| {
        rule.pattern
            .replace_all(&text, |caps: &Captures| (rule.rewrite)(caps))
            .into_owned()
    })
}
