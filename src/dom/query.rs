use crate::dom::document::{Document, NodeId};

/// A single compound CSS selector: optional tag, then any mix of `#id`,
/// `.class` and `[attr]` / `[attr="value"]` parts. Combinators, pseudo-classes
/// and selector lists are not supported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompoundSelector {
    pub tag: Option<String>,
    pub ids: Vec<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<(String, Option<String>)>,
}

fn is_ident_char(c: char) -> bool {
    !matches!(
        c,
        '#' | '.' | '[' | ']' | ' ' | '\t' | '\n' | '>' | '+' | '~' | ',' | ':' | '(' | ')' | '*' | '='
    )
}

impl CompoundSelector {
    pub fn parse(input: &str) -> Option<CompoundSelector> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        let chars: Vec<char> = input.chars().collect();
        let mut sel = CompoundSelector::default();
        let mut i = 0;

        let ident = |start: usize| -> (String, usize) {
            let mut end = start;
            while end < chars.len() && is_ident_char(chars[end]) {
                end += 1;
            }
            (chars[start..end].iter().collect(), end)
        };

        if chars[0] == '*' {
            i = 1;
        } else if is_ident_char(chars[0]) {
            let (tag, end) = ident(0);
            sel.tag = Some(tag.to_lowercase());
            i = end;
        }

        while i < chars.len() {
            match chars[i] {
                '#' => {
                    let (id, end) = ident(i + 1);
                    if id.is_empty() {
                        return None;
                    }
                    sel.ids.push(id);
                    i = end;
                }
                '.' => {
                    let (class, end) = ident(i + 1);
                    if class.is_empty() {
                        return None;
                    }
                    sel.classes.push(class);
                    i = end;
                }
                '[' => {
                    let close = attr_end(&chars, i + 1)?;
                    let body: String = chars[i + 1..close].iter().collect();
                    sel.attrs.push(parse_attr(&body)?);
                    i = close + 1;
                }
                _ => return None,
            }
        }

        Some(sel)
    }

    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(tag) = doc.tag(node) else {
            return false;
        };
        if let Some(want) = &self.tag {
            if want != tag {
                return false;
            }
        }
        if self.ids.iter().any(|id| doc.id(node) != id) {
            return false;
        }
        let classes = doc.classes(node);
        if self.classes.iter().any(|c| !classes.contains(&c.as_str())) {
            return false;
        }
        self.attrs.iter().all(|(name, value)| match value {
            Some(v) => doc.attr(node, name) == Some(v.as_str()),
            None => doc.has_attr(node, name),
        })
    }
}

/// Index of the `]` closing an attribute part. Brackets inside a quoted value
/// do not count.
fn attr_end(chars: &[char], start: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (offset, &c) in chars[start..].iter().enumerate() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, ']') => return Some(start + offset),
            (None, _) => {}
        }
    }
    None
}

fn parse_attr(body: &str) -> Option<(String, Option<String>)> {
    match body.split_once('=') {
        None => {
            let name = body.trim();
            (!name.is_empty()).then(|| (name.to_lowercase(), None))
        }
        Some((name, raw)) => {
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let raw = raw.trim();
            let value = if raw.len() >= 2
                && ((raw.starts_with('"') && raw.ends_with('"'))
                    || (raw.starts_with('\'') && raw.ends_with('\'')))
            {
                &raw[1..raw.len() - 1]
            } else {
                raw
            };
            Some((name.to_lowercase(), Some(value.to_string())))
        }
    }
}
