//! Reference Extraction for Liquid and JavaScript Sources
//!
//! Extracts, from the text of a single file:
//! - the snippets it renders (`{% render 'name' %}`, including `render` lines
//!   inside `{% liquid %}` tags)
//! - the assets it references (`'file' | asset_url` filters and `import`
//!   statements inside `<script>` tags)
//!
//! Liquid comments are removed before any matching, so a render tag inside
//! `{% comment %}` never produces an edge.
//!
//! ## Usage
//!
//! ```rust
//! use compsync_core::parser::parse_liquid;
//!
//! let refs = parse_liquid("{% render 'price', product: product %}");
//! assert!(refs.snippets.contains("price.liquid"));
//! ```

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// Extension appended to rendered snippet names.
const LIQUID_EXTENSION: &str = ".liquid";

/// Extension assumed for import specifiers without one.
const SCRIPT_EXTENSION: &str = ".js";

static COMMENT_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\{%-?\s*comment\s*-?%\}.*?\{%-?\s*endcomment\s*-?%\}")
        .expect("Invalid comment block pattern")
});

static INLINE_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{%-?\s*#.*?-?%\}").expect("Invalid inline comment pattern"));

static RENDER_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\{%-?\s*render\s+['"]([^'"]+)['"]"#).expect("Invalid render tag pattern")
});

static LIQUID_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{%-?\s*liquid\b(.*?)-?%\}").expect("Invalid liquid tag pattern"));

static LIQUID_RENDER_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^render\s+['"]([^'"]+)['"]"#).expect("Invalid liquid render pattern")
});

static ASSET_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"['"]([^'"]+)['"]\s*\|\s*asset_url\b"#).expect("Invalid asset_url pattern")
});

static SCRIPT_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>(.*?)</script\s*>").expect("Invalid script tag pattern")
});

static STATIC_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\b(?:import|export)\s+(?:[^'";]*?\s+from\s+)?['"]([^'"]+)['"]"#)
        .expect("Invalid import pattern")
});

static DYNAMIC_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bimport\s*\(\s*['"]([^'"]+)['"]\s*\)"#).expect("Invalid dynamic import pattern")
});

static JS_BLOCK_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("Invalid block comment pattern"));

static JS_LINE_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*//.*$").expect("Invalid line comment pattern"));

/// References extracted from one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedReferences {
    /// Rendered snippet file names (`name.liquid`)
    pub snippets: BTreeSet<String>,
    /// Referenced asset file names
    pub assets: BTreeSet<String>,
}

impl ParsedReferences {
    /// Check if nothing was referenced
    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty() && self.assets.is_empty()
    }
}

/// Extract snippet and asset references from Liquid source.
pub fn parse_liquid(text: &str) -> ParsedReferences {
    let text = strip_liquid_comments(text);
    let mut refs = ParsedReferences::default();

    for caps in RENDER_TAG.captures_iter(&text) {
        refs.snippets.insert(snippet_file_name(&caps[1]));
    }

    for caps in LIQUID_TAG.captures_iter(&text) {
        collect_liquid_tag_renders(&caps[1], &mut refs.snippets);
    }

    for caps in ASSET_URL.captures_iter(&text) {
        if let Some(asset) = asset_file_name(&caps[1]) {
            refs.assets.insert(asset);
        }
    }

    for caps in SCRIPT_TAG.captures_iter(&text) {
        collect_imports(&caps[1], &mut refs.assets);
    }

    refs
}

/// Extract asset references from JavaScript source (import statements only).
pub fn parse_script(text: &str) -> BTreeSet<String> {
    let mut assets = BTreeSet::new();
    collect_imports(text, &mut assets);
    assets
}

/// Remove `{% comment %}` blocks and inline `{% # %}` comments.
pub fn strip_liquid_comments(text: &str) -> String {
    let without_blocks = COMMENT_BLOCK.replace_all(text, "");
    INLINE_COMMENT.replace_all(&without_blocks, "").into_owned()
}

/// Collect `render` statements from the body of a `{% liquid %}` tag.
///
/// Inside the tag, `#` lines and `comment`/`endcomment` pairs are comments.
fn collect_liquid_tag_renders(body: &str, snippets: &mut BTreeSet<String>) {
    let mut in_comment = false;
    for line in body.lines().map(str::trim) {
        if in_comment {
            if line.starts_with("endcomment") {
                in_comment = false;
            }
            continue;
        }
        if line.starts_with('#') {
            continue;
        }
        if line == "comment" {
            in_comment = true;
            continue;
        }
        if let Some(caps) = LIQUID_RENDER_LINE.captures(line) {
            snippets.insert(snippet_file_name(&caps[1]));
        }
    }
}

fn collect_imports(script: &str, assets: &mut BTreeSet<String>) {
    let without_blocks = JS_BLOCK_COMMENT.replace_all(script, "");
    let script = JS_LINE_COMMENT.replace_all(&without_blocks, "");

    let specifiers = STATIC_IMPORT
        .captures_iter(&script)
        .chain(DYNAMIC_IMPORT.captures_iter(&script))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()));

    for specifier in specifiers {
        if let Some(asset) = module_file_name(&specifier) {
            assets.insert(asset);
        }
    }
}

fn snippet_file_name(name: &str) -> String {
    if name.ends_with(LIQUID_EXTENSION) {
        name.to_string()
    } else {
        format!("{}{}", name, LIQUID_EXTENSION)
    }
}

/// Basename of an asset reference, without query string or fragment.
fn asset_file_name(reference: &str) -> Option<String> {
    let reference = reference.split(['?', '#']).next().unwrap_or_default();
    let name = reference.rsplit('/').next().unwrap_or_default().trim();
    if name.is_empty() || name.contains("{{") {
        None
    } else {
        Some(name.to_string())
    }
}

/// Resolve a module specifier to the asset file it loads.
fn module_file_name(specifier: &str) -> Option<String> {
    let is_remote = ["http://", "https://", "//", "data:"]
        .iter()
        .any(|prefix| specifier.starts_with(prefix));
    if is_remote {
        return None;
    }

    let name = asset_file_name(specifier)?;
    if name.contains('.') {
        Some(name)
    } else {
        Some(format!("{}{}", name, SCRIPT_EXTENSION))
    }
}
