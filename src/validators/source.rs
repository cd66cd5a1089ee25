//! Line-oriented scanning of edited Rust source.

use std::sync::LazyLock;

use regex::Regex;

static PUB_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*pub\s+(?:(?:async|const|unsafe)\s+)*(struct|fn|enum|trait|mod)\s+([A-Za-z_]\w*)")
        .expect("pub item regex")
});

static FN_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:(?:async|const|unsafe)\s+)*fn\s+([A-Za-z_]\w*)")
        .expect("fn regex")
});

/// Lines handed to the validators.
#[derive(Debug, Clone, Copy)]
pub struct SourceLine<'a> {
    /// 1-based line number.
    pub number: usize,
    pub text: &'a str,
}

const CFG_TEST: &str = "#[cfg(test)]";

/// Source lines outside `#[cfg(test)]` items.
///
/// Only the annotated item is exempt (a `mod tests { .. }` block, a `use`, a
/// helper fn); scanning resumes after it.
pub fn production_lines(content: &str) -> Vec<SourceLine<'_>> {
    let mut lines = Vec::new();
    let mut skipped: Option<TestItem> = None;

    for (i, text) in content.lines().enumerate() {
        if let Some(item) = skipped.as_mut() {
            if item.consume(text) {
                skipped = None;
            }
            continue;
        }

        if let Some(rest) = text.trim_start().strip_prefix(CFG_TEST) {
            let mut item = TestItem::default();
            if !item.consume(rest) {
                skipped = Some(item);
            }
            continue;
        }

        lines.push(SourceLine {
            number: i + 1,
            text,
        });
    }
    lines
}

/// Tracks the extent of one `#[cfg(test)]` item. Braces inside string
/// literals are not special-cased.
#[derive(Debug, Default)]
struct TestItem {
    depth: i32,
    /// Open `(` / `[` count, so `[u8; 4]` does not end the item.
    nesting: i32,
    opened: bool,
}

impl TestItem {
    /// Feed the next line; true once the item has ended.
    fn consume(&mut self, text: &str) -> bool {
        let trimmed = text.trim();
        if !self.opened && (trimmed.is_empty() || trimmed.starts_with("#[") || is_comment(trimmed))
        {
            return false;
        }

        for c in trimmed.chars() {
            match c {
                '{' => {
                    self.depth += 1;
                    self.opened = true;
                }
                '}' => self.depth -= 1,
                '(' | '[' => self.nesting += 1,
                ')' | ']' => self.nesting -= 1,
                ';' if !self.opened && self.nesting <= 0 => return true,
                _ => {}
            }
        }
        self.opened && self.depth <= 0
    }
}

pub fn is_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("//")
        || trimmed.starts_with("/*")
        || trimmed.starts_with("* ")
        || trimmed.starts_with("*/")
        || trimmed == "*"
}

/// A public declaration found in source.
#[derive(Debug, Clone, PartialEq)]
pub struct PubItem {
    pub kind: String,
    pub name: String,
    pub line: usize,
    pub documented: bool,
}

/// Public declarations of the given kinds, with whether each one has a doc
/// comment directly above it (attributes in between are allowed).
pub fn public_items(lines: &[SourceLine<'_>], kinds: &[&str]) -> Vec<PubItem> {
    let mut items = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        let Some(caps) = PUB_ITEM.captures(line.text) else {
            continue;
        };
        let kind = &caps[1];
        if !kinds.contains(&kind) {
            continue;
        }
        items.push(PubItem {
            kind: kind.to_string(),
            name: caps[2].to_string(),
            line: line.number,
            documented: has_doc_above(lines, idx),
        });
    }
    items
}

fn has_doc_above(lines: &[SourceLine<'_>], idx: usize) -> bool {
    let mut i = idx;
    while i > 0 {
        i -= 1;
        // A skipped test item sits between the two lines.
        if lines[i].number + 1 != lines[i + 1].number {
            return false;
        }
        let text = lines[i].text.trim();

        if text.starts_with("///") || text.starts_with("#[doc") || text.ends_with("*/") {
            return true;
        }
        if text.starts_with("#[") {
            continue;
        }
        // Tail of a multi-line attribute: jump to its opening line.
        if text.ends_with(']') {
            match (0..i).rev().take(10).find(|&j| lines[j].text.trim().starts_with("#[")) {
                Some(open) => {
                    i = open;
                    continue;
                }
                None => return false,
            }
        }
        return false;
    }
    false
}

/// A function declaration with its declared return type.
#[derive(Debug, Clone, PartialEq)]
pub struct FnSignature {
    pub name: String,
    pub line: usize,
    /// Text after `->`, `None` for unit-returning functions.
    pub returns: Option<String>,
    /// Carries a `#[test]`-style attribute.
    pub is_test: bool,
}

/// Function declarations, reading signatures that span several lines.
pub fn fn_signatures(lines: &[SourceLine<'_>]) -> Vec<FnSignature> {
    let mut sigs = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        if is_comment(line.text) {
            continue;
        }
        let Some(caps) = FN_DECL.captures(line.text) else {
            continue;
        };

        let mut header = String::new();
        for next in lines.iter().skip(idx).take(12) {
            header.push_str(next.text);
            header.push(' ');
            if next.text.contains('{') || next.text.trim_end().ends_with(';') {
                break;
            }
        }
        let header = header
            .split(['{', ';'])
            .next()
            .unwrap_or_default()
            .to_string();

        let returns = header.split_once("->").map(|(_, ret)| {
            let ret = ret.split(" where ").next().unwrap_or(ret);
            ret.trim().to_string()
        });

        sigs.push(FnSignature {
            name: caps[1].to_string(),
            line: line.number,
            returns: returns.filter(|r| !r.is_empty()),
            is_test: has_test_attribute(lines, idx),
        });
    }
    sigs
}

fn has_test_attribute(lines: &[SourceLine<'_>], idx: usize) -> bool {
    lines[..idx]
        .iter()
        .rev()
        .map(|l| l.text.trim())
        .take_while(|t| t.starts_with("#[") || t.starts_with("///"))
        .any(|t| t.starts_with("#[") && t.contains("test"))
}

/// Consecutive `///` lines joined into doc blocks.
pub fn doc_blocks(lines: &[SourceLine<'_>]) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in lines {
        match line.text.trim_start().strip_prefix("///") {
            Some(doc) => current.push(doc.trim()),
            None => {
                if !current.is_empty() {
                    blocks.push(current.join("\n"));
                    current.clear();
                }
            }
        }
    }
    if !current.is_empty() {
        blocks.push(current.join("\n"));
    }
    blocks
}
