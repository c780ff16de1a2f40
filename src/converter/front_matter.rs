use std::sync::LazyLock;

use regex::Regex;

static BLOCK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    regex::RegexBuilder::new(r"\A---\r?\n(.*?)\r?\n---[ \t]*(?:\r?\n|\z)(.*)\z")
        .dot_matches_new_line(true)
        .build()
        .unwrap()
});

/// Renders the header prepended to every converted document.
pub(crate) fn render_header(title: &str, date: &str, tags: &[String]) -> String {
    let categories = tags.iter().map(|t| quote(t)).collect::<Vec<_>>().join(", ");
    format!(
        "---\ntitle: {}\ndate: {}\ncategories:\n - [{}]\n---",
        quote(title),
        date,
        categories
    )
}

/// Double-quoted YAML scalar.
pub(crate) fn quote(s: &str) -> String {
    let mut res = String::with_capacity(s.len() + 2);
    res.push('"');
    for c in s.chars() {
        match c {
            '"' => res.push_str("\\\""),
            '\\' => res.push_str("\\\\"),
            _ => res.push(c),
        }
    }
    res.push('"');
    res
}

pub(crate) fn unquote(s: &str) -> String {
    let s = s.trim();
    match s.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(inner) => inner.replace("\\\"", "\"").replace("\\\\", "\\"),
        None => s.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    key: Option<String>,
    value: String,
    continuation: Vec<String>,
}

/// Leading `---` block of a document, kept as ordered fields so it can be
/// edited and written back without touching anything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FrontMatter {
    entries: Vec<Entry>,
}

impl FrontMatter {
    /// Splits `content` into its front matter and the rest of the document.
    pub fn parse(content: &str) -> Option<(FrontMatter, &str)> {
        let caps = BLOCK_PATTERN.captures(content)?;
        let header = caps.get(1)?.as_str();
        let rest = caps.get(2).map_or("", |m| m.as_str());

        let mut entries: Vec<Entry> = vec![];
        for line in header.lines() {
            let indented = line.starts_with([' ', '\t', '-']);
            if let (true, Some(last)) = (indented, entries.last_mut()) {
                last.continuation.push(line.to_string());
                continue;
            }
            entries.push(match line.split_once(':') {
                Some((key, value)) if !key.trim().is_empty() => Entry {
                    key: Some(key.trim().to_string()),
                    value: value.trim().to_string(),
                    continuation: vec![],
                },
                _ => Entry {
                    key: None,
                    value: line.to_string(),
                    continuation: vec![],
                },
            });
        }

        Some((FrontMatter { entries }, rest))
    }

    /// Raw value of `key`, as written.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key.as_deref() == Some(key))
            .map(|e| e.value.as_str())
    }

    /// Replaces the raw value of `key`, appending the field if it is absent.
    pub fn set(&mut self, key: &str, value: String) {
        match self
            .entries
            .iter_mut()
            .find(|e| e.key.as_deref() == Some(key))
        {
            Some(entry) => entry.value = value,
            None => self.entries.push(Entry {
                key: Some(key.to_string()),
                value,
                continuation: vec![],
            }),
        }
    }

    pub fn title(&self) -> Option<String> {
        self.get("title").map(unquote)
    }

    pub fn set_title(&mut self, title: &str) {
        self.set("title", quote(title));
    }

    /// Front matter followed by `body`, which is written back verbatim.
    pub fn render(&self, body: &str) -> String {
        let mut res = String::from("---\n");
        for entry in &self.entries {
            let line = match (&entry.key, entry.value.is_empty()) {
                (Some(key), true) => format!("{key}:"),
                (Some(key), false) => format!("{key}: {}", entry.value),
                (None, _) => entry.value.clone(),
            };
            res.push_str(&line);
            res.push('\n');
            for line in &entry.continuation {
                res.push_str(line);
                res.push('\n');
            }
        }
        res.push_str("---\n");
        res.push_str(body);
        res
    }
}
