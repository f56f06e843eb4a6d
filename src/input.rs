//! Banner field classification.
//!
//! A frontmatter banner value can be a URL, a path into the vault, a
//! wiki-link, or free-text search keywords. [`classify`] decides which,
//! without ever failing: anything it cannot make sense of degrades to
//! [`InputKind::Keyword`] or [`InputKind::Invalid`].

use serde_json::Value;
use url::Url;

use crate::vault::Vault;

/// Image extensions accepted for direct vault paths.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "svg"];

/// What a banner value refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    /// Absolute URL, used as-is.
    Url,
    /// Existing image file in the vault.
    VaultPath,
    /// `[[target]]` or `![[target]]` wiki-link.
    ObsidianLink,
    /// Search keywords, possibly comma-separated.
    Keyword,
    /// Nothing usable.
    Invalid,
}

impl InputKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputKind::Url => "url",
            InputKind::VaultPath => "vault_path",
            InputKind::ObsidianLink => "obsidian_link",
            InputKind::Keyword => "keyword",
            InputKind::Invalid => "invalid",
        }
    }
}

/// A classified banner value. Transient: produced per resolution, never
/// cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDescriptor {
    pub kind: InputKind,
    /// Normalized value (trimmed, unquoted). Empty for `Invalid`.
    pub value: String,
}

impl InputDescriptor {
    fn new(kind: InputKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    fn invalid() -> Self {
        Self::new(InputKind::Invalid, "")
    }

    /// Link target without the `!`, brackets, alias or heading.
    pub fn link_target(&self) -> Option<&str> {
        if self.kind != InputKind::ObsidianLink {
            return None;
        }
        parse_link(&self.value)
    }

    /// Comma-separated keyword candidates, trimmed, empties dropped.
    pub fn keywords(&self) -> Vec<&str> {
        if self.kind != InputKind::Keyword {
            return Vec::new();
        }
        self.value
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .collect()
    }
}

/// Classify a raw frontmatter value.
///
/// The result depends only on `raw` and on which files exist in `vault`.
pub fn classify(raw: &Value, vault: &dyn Vault) -> InputDescriptor {
    let Some(text) = normalize(raw) else {
        return InputDescriptor::invalid();
    };
    if text.is_empty() {
        return InputDescriptor::invalid();
    }

    if parse_link(&text).is_some() {
        return InputDescriptor::new(InputKind::ObsidianLink, text);
    }

    if is_absolute_url(&text) {
        return InputDescriptor::new(InputKind::Url, text);
    }

    if let Some(file) = vault.get_file(&text)
        && IMAGE_EXTENSIONS.contains(&file.extension.as_str())
    {
        return InputDescriptor::new(InputKind::VaultPath, file.path);
    }

    InputDescriptor::new(InputKind::Keyword, text)
}

/// Reduce a raw value to a single trimmed, unquoted string.
///
/// YAML parses an unquoted `[[link]]` as a nested list, so a list whose
/// first element is itself a list is reassembled into link syntax.
pub(crate) fn normalize(raw: &Value) -> Option<String> {
    match raw {
        Value::String(s) => Some(strip_quotes(s.trim()).trim().to_string()),
        Value::Array(items) => match items.first()? {
            Value::Array(inner) => {
                let target = first_string(inner)?;
                Some(format!("[[{}]]", target.trim()))
            }
            first => normalize(first),
        },
        _ => None,
    }
}

fn first_string(items: &[Value]) -> Option<&str> {
    match items.first()? {
        Value::String(s) => Some(s.as_str()),
        Value::Array(inner) => first_string(inner),
        _ => None,
    }
}

fn strip_quotes(s: &str) -> &str {
    for quote in ['"', '\''] {
        if s.len() >= 2
            && let Some(inner) = s.strip_prefix(quote).and_then(|r| r.strip_suffix(quote))
        {
            return inner;
        }
    }
    s
}

/// Target of `[[target]]` / `![[target|alias]]`, if `s` is a wiki-link.
fn parse_link(s: &str) -> Option<&str> {
    let body = s.strip_prefix('!').unwrap_or(s);
    let inner = body.strip_prefix("[[")?.strip_suffix("]]")?;
    let target = inner.split(['|', '#']).next()?.trim();
    (!target.is_empty()).then_some(target)
}

fn is_absolute_url(s: &str) -> bool {
    Url::parse(s).is_ok_and(|u| u.has_host())
}
