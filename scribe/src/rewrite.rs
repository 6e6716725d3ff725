use regex::{Regex, RegexBuilder};
use serde_json::Value;

use crate::error::PatternError;

/// A compiled `replaceTxt` operation.
///
/// The replacement is applied to every string value of a JSON tree, at any
/// depth. Object keys are field names and are left as they are.
#[derive(Debug, Clone)]
pub struct TextReplacement {
    pattern: Regex,
    replacement: String,
}

impl TextReplacement {
    /// Compile an upstream pattern. `flags` uses the upstream letters; the
    /// replacement is always global, so `g` is accepted and ignored.
    pub fn compile(pattern: &str, with: &str, flags: Option<&str>) -> Result<Self, PatternError> {
        let mut builder = RegexBuilder::new(pattern);
        for flag in flags.unwrap_or_default().chars() {
            match flag {
                'i' => builder.case_insensitive(true),
                'm' => builder.multi_line(true),
                's' => builder.dot_matches_new_line(true),
                'u' | 'g' => &mut builder,
                other => return Err(PatternError::UnsupportedFlag(other)),
            };
        }
        let pattern = builder.build()?;
        let replacement = translate_replacement(with, pattern.captures_len() - 1);
        Ok(TextReplacement {
            pattern,
            replacement,
        })
    }

    pub fn replace(&self, text: &str) -> String {
        self.pattern
            .replace_all(text, self.replacement.as_str())
            .into_owned()
    }

    /// Rewrite every string in `value`. Returns how many strings changed.
    pub fn apply(&self, value: &mut Value) -> usize {
        match value {
            Value::String(text) => {
                let replaced = self.replace(text);
                if replaced == *text {
                    0
                } else {
                    *text = replaced;
                    1
                }
            }
            Value::Array(values) => values.iter_mut().map(|v| self.apply(v)).sum(),
            Value::Object(fields) => fields.values_mut().map(|v| self.apply(v)).sum(),
            Value::Null | Value::Bool(_) | Value::Number(_) => 0,
        }
    }
}

/// Convert an upstream (JavaScript) replacement string to `regex` syntax:
/// `$&` is the whole match, `$<name>` is a named group and `$$` is a dollar
/// sign. `$n` and `$nn` refer to groups only when the pattern has that many
/// (`groups`); a two-digit reference falls back to one digit followed by a
/// literal digit. Any other `$`, including `$0`, is literal.
fn translate_replacement(js: &str, groups: usize) -> String {
    let mut out = String::with_capacity(js.len());
    let mut chars = js.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('$') => {
                chars.next();
                out.push_str("$$");
            }
            Some('&') => {
                chars.next();
                out.push_str("${0}");
            }
            Some(first) if first.is_ascii_digit() => {
                let mut ahead = chars.clone();
                ahead.next();
                let one = digit_value(first);
                let two = ahead
                    .peek()
                    .filter(|second| second.is_ascii_digit())
                    .map(|&second| one * 10 + digit_value(second));
                if let Some(group) = two.filter(|group| (1..=groups).contains(group)) {
                    chars.next();
                    chars.next();
                    out.push_str(&format!("${{{}}}", group));
                } else if (1..=groups).contains(&one) {
                    chars.next();
                    out.push_str(&format!("${{{}}}", one));
                } else {
                    out.push_str("$$");
                }
            }
            Some('<') => {
                let rest: String = chars.clone().skip(1).collect();
                match rest.find('>') {
                    Some(end) => {
                        let name = &rest[..end];
                        out.push_str(&format!("${{{}}}", name));
                        for _ in 0..name.chars().count() + 2 {
                            chars.next();
                        }
                    }
                    None => out.push_str("$$"),
                }
            }
            _ => out.push_str("$$"),
        }
    }
    out
}

fn digit_value(c: char) -> usize {
    c.to_digit(10).map_or(0, |d| d as usize)
}
