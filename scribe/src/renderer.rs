use codex::entry::{
    Block, BlockKind, Cell, Entry, LabeledItem, Link, List, Quote, Roll, Spellcasting, Table,
    Wrapper,
};
use tracing::{debug, trace};
use url::Url;

use crate::error::RenderError;
use crate::expander::expand;

pub const DEFAULT_LINK_BASE: &str = "https://5e.tools";

/// Wrapper tags whose content is linked elsewhere and never rendered.
const SUPPRESSED_WRAPPER_TAGS: [&str; 3] = ["property", "note", "magicvariant"];

/// Render a document tree with the default renderer.
pub fn render(entries: &[Entry]) -> Result<String, RenderError> {
    Renderer::default().render(entries)
}

pub fn render_one(entry: &Entry) -> Result<Option<String>, RenderError> {
    Renderer::default().render_one(entry)
}

/// Turns document trees into Markdown.
///
/// Every node renders to an optional string. Absent and empty renders are
/// dropped before siblings are joined, so an empty subtree leaves no blank
/// lines behind.
#[derive(Debug, Clone)]
pub struct Renderer {
    link_base: String,
}

impl Default for Renderer {
    fn default() -> Self {
        Renderer::new(DEFAULT_LINK_BASE)
    }
}

impl Renderer {
    /// A renderer resolving internal link paths against `link_base`.
    pub fn new(link_base: impl Into<String>) -> Self {
        Renderer {
            link_base: link_base.into(),
        }
    }

    /// Render top-level entries separated by blank lines.
    pub fn render(&self, entries: &[Entry]) -> Result<String, RenderError> {
        self.render_joined(entries, "\n\n")
    }

    /// Render `entries` in document order and join the non-empty results.
    pub fn render_joined(&self, entries: &[Entry], separator: &str) -> Result<String, RenderError> {
        let mut rendered = Vec::with_capacity(entries.len());
        for entry in entries {
            if let Some(text) = self.render_one(entry)? {
                rendered.push(text);
            }
        }
        Ok(rendered.join(separator))
    }

    /// Render a single node. `None` means the node contributes nothing.
    pub fn render_one(&self, entry: &Entry) -> Result<Option<String>, RenderError> {
        let rendered = match entry {
            Entry::Text(text) => expand(text),
            Entry::Block(block) => self.render_block(block)?,
            Entry::Table(table) => self.render_table(table)?,
            Entry::List(list) => self.render_list(list)?,
            Entry::Link(link) => self.render_link(link)?,
            Entry::Quote(quote) => self.render_quote(quote)?,
            Entry::Spellcasting(spellcasting) => self.render_spellcasting(spellcasting)?,
            Entry::Item(item) => self.render_item(item)?,
            Entry::Wrapper(wrapper) => {
                suppress_wrapper(wrapper);
                return Ok(None);
            }
        };
        Ok(Some(rendered).filter(|text| !text.is_empty()))
    }

    fn render_block(&self, block: &Block) -> Result<String, RenderError> {
        let name = block.name.as_deref();
        let rendered = match block.kind {
            BlockKind::Inline => {
                let body = self.render_joined(&block.entries, " ")?.replace('\n', " ");
                headed(name, body)
            }
            BlockKind::Inset => {
                let body = self.render(&block.entries)?;
                blockquote(&headed(name, body))
            }
            BlockKind::Variant => {
                let body = self.render(&block.entries)?;
                let title = match name {
                    Some(name) => format!("> [!info] **Variant:** {}", name),
                    None => "> [!info] **Variant:**".to_string(),
                };
                if body.is_empty() {
                    title
                } else {
                    format!("{}\n{}", title, blockquote(&body))
                }
            }
            BlockKind::Entries
            | BlockKind::Section
            | BlockKind::VariantSub
            | BlockKind::VariantInner => {
                let body = self.render(&block.entries)?;
                headed(name, body)
            }
        };
        Ok(rendered)
    }

    fn render_table(&self, table: &Table) -> Result<String, RenderError> {
        let columns = table
            .rows
            .iter()
            .map(Vec::len)
            .chain([table.col_labels.len()])
            .max()
            .unwrap_or(0);

        let mut lines = Vec::with_capacity(table.rows.len() + 3);
        if let Some(caption) = &table.caption {
            lines.push(format!("## {}", expand(caption)));
        }

        let labels: Vec<String> = (0..columns)
            .map(|column| {
                table
                    .col_labels
                    .get(column)
                    .map(|label| table_cell(&expand(label)))
                    .unwrap_or_default()
            })
            .collect();
        lines.push(table_row(&labels));

        let alignments: Vec<String> = (0..columns)
            .map(|column| {
                let style = table.col_styles.get(column).map(String::as_str);
                column_alignment(style.unwrap_or_default()).to_string()
            })
            .collect();
        lines.push(table_row(&alignments));

        for row in &table.rows {
            let mut cells = Vec::with_capacity(columns);
            for cell in row {
                cells.push(table_cell(&self.render_cell(cell)?));
            }
            cells.resize(columns, String::new());
            lines.push(table_row(&cells));
        }
        Ok(lines.join("\n"))
    }

    fn render_cell(&self, cell: &Cell) -> Result<String, RenderError> {
        let structured = match cell {
            Cell::Number(number) => return Ok(number.to_string()),
            Cell::Text(text) => return Ok(expand(text)),
            Cell::Structured(structured) => structured,
        };
        let nested = match &structured.entry {
            Some(entry) => self.render_one(entry)?,
            None => None,
        };
        Ok(match (structured.roll.as_ref().map(roll_range), nested) {
            (Some(roll), Some(nested)) => format!("{} ({})", roll, nested),
            (Some(roll), None) => roll,
            (None, nested) => nested.unwrap_or_default(),
        })
    }

    fn render_list(&self, list: &List) -> Result<String, RenderError> {
        let mut lines = Vec::with_capacity(list.items.len());
        for item in &list.items {
            let Some(rendered) = self.render_one(item)? else {
                continue;
            };
            for (i, line) in rendered.lines().enumerate() {
                lines.push(match i {
                    0 => format!("- {}", line),
                    _ if line.is_empty() => String::new(),
                    _ => format!("  {}", line),
                });
            }
        }
        Ok(lines.join("\n"))
    }

    fn render_link(&self, link: &Link) -> Result<String, RenderError> {
        let href = &link.href;
        if !href.is_internal() {
            return Err(RenderError::NonInternalLink {
                kind: href.kind.clone(),
            });
        }
        let mut url = Url::parse(&self.link_base)
            .and_then(|base| base.join(&href.path))
            .map_err(|cause| RenderError::InvalidLinkTarget {
                path: href.path.clone(),
                cause,
            })?;
        if let Some(hash) = href.hash.as_deref().filter(|hash| !hash.is_empty()) {
            if href.hash_pre_encoded {
                url.set_fragment(Some(hash));
            } else {
                url.set_fragment(Some(&encode_uri_component(hash)));
            }
        }
        Ok(format!("[{}]({})", link.text, url))
    }

    fn render_quote(&self, quote: &Quote) -> Result<String, RenderError> {
        let mut lines = vec!["> [!quote]".to_string()];
        let body = self.render(&quote.entries)?;
        if !body.is_empty() {
            lines.push(blockquote(&body));
        }
        if let Some(by) = &quote.by {
            lines.push(format!("> — {}", expand(by)));
        }
        Ok(lines.join("\n"))
    }

    fn render_spellcasting(&self, spellcasting: &Spellcasting) -> Result<String, RenderError> {
        let mut parts = Vec::new();

        let header = headed(
            spellcasting.name.as_deref(),
            self.render(&spellcasting.header_entries)?,
        );
        parts.push(header);

        let levels: Vec<String> = spellcasting
            .spells
            .iter()
            .filter(|(_, level)| !level.spells.is_empty())
            .map(|(&level, slots)| {
                let count = match slots.slots {
                    Some(count) => format!(" ({} slots)", count),
                    None => String::new(),
                };
                let spells: Vec<String> =
                    slots.spells.iter().map(String::as_str).map(expand).collect();
                format!("- {}{}: {}", spell_level_label(level), count, spells.join(", "))
            })
            .collect();
        parts.push(levels.join("\n"));

        parts.push(self.render(&spellcasting.footer_entries)?);
        parts.retain(|part| !part.is_empty());
        Ok(parts.join("\n\n"))
    }

    fn render_item(&self, item: &LabeledItem) -> Result<String, RenderError> {
        let mut body = match &item.entry {
            Some(entry) => self.render_one(entry)?.unwrap_or_default(),
            None => String::new(),
        };
        let rest = self.render_joined(&item.entries, " ")?;
        if !rest.is_empty() {
            if !body.is_empty() {
                body.push(' ');
            }
            body.push_str(&rest);
        }
        Ok(headed(Some(&item.name), body))
    }
}

fn suppress_wrapper(wrapper: &Wrapper) {
    let tag = wrapper.merged_entry_tag();
    let recognized = match tag {
        Some(tag) if SUPPRESSED_WRAPPER_TAGS.contains(&tag) => true,
        Some("type") => wrapper.wrapped.name() == Some("Range"),
        _ => false,
    };
    if recognized {
        trace!(tag = tag.unwrap_or_default(), "suppressed wrapper");
    } else {
        debug!(tag = ?tag, "dropping unrecognized wrapper");
    }
}

/// Prefix `body` with a bold-italic run-in heading.
fn headed(name: Option<&str>, body: String) -> String {
    match name.filter(|name| !name.is_empty()) {
        Some(name) if body.is_empty() => format!("**_{}._**", name),
        Some(name) => format!("**_{}._** {}", name, body),
        None => body,
    }
}

fn blockquote(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                ">".to_string()
            } else {
                format!("> {}", line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn table_row(cells: &[String]) -> String {
    format!("| {} |", cells.join(" | "))
}

// Pipes would end the cell early, including the ones inside wiki links.
fn table_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

fn column_alignment(style: &str) -> &'static str {
    let classes: Vec<&str> = style.split_whitespace().collect();
    if classes.contains(&"text-center") {
        ":---:"
    } else if classes.contains(&"text-right") {
        "---:"
    } else if classes.contains(&"text-left") {
        ":---"
    } else {
        "---"
    }
}

fn roll_range(roll: &Roll) -> String {
    match (&roll.exact, &roll.min, &roll.max) {
        (Some(exact), _, _) => exact.to_string(),
        (None, Some(min), Some(max)) => format!("{}-{}", min, max),
        (None, Some(bound), None) | (None, None, Some(bound)) => bound.to_string(),
        (None, None, None) => String::new(),
    }
}

/// Percent-encode a link fragment the way the site's own links are built:
/// like `urlencoding::encode`, but `!'()*` stay literal.
fn encode_uri_component(text: &str) -> String {
    const UNRESERVED: [(&str, &str); 5] =
        [("%21", "!"), ("%27", "'"), ("%28", "("), ("%29", ")"), ("%2A", "*")];
    UNRESERVED
        .iter()
        .fold(urlencoding::encode(text).into_owned(), |encoded, (escape, literal)| {
            encoded.replace(escape, literal)
        })
}

fn spell_level_label(level: u8) -> String {
    if level == 0 {
        return "Cantrips (at will)".to_string();
    }
    let suffix = match (level % 10, level % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{} level", level, suffix)
}
