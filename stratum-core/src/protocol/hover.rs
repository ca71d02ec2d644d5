//! Hover payload shapes and normalization.
//!
//! The wire format allows a plain string, a fenced code block, a markup
//! object, or an array of the first two. Downstream only ever needs one
//! textual payload per hover result, so the shapes are flattened into a
//! single string at correlation time.

use serde::Deserialize;

/// The `result` field of a `hoverResult` vertex.
#[derive(Debug, Clone, Deserialize)]
pub struct HoverResult {
    pub contents: HoverContents,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HoverContents {
    // Markup carries a `kind` field, so it must be tried before the
    // code-block shape which carries `language`.
    Markup { kind: String, value: String },
    Single(MarkedString),
    Many(Vec<MarkedString>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MarkedString {
    Code { language: String, value: String },
    Plain(String),
}

const SECTION_SEPARATOR: &str = "\n\n---\n\n";

/// Flatten hover contents into one string. Code blocks keep their
/// language fence; multiple sections are joined with a separator line.
pub fn normalize_hover(contents: &HoverContents) -> String {
    match contents {
        HoverContents::Markup { value, .. } => value.trim().to_string(),
        HoverContents::Single(marked) => normalize_marked(marked),
        HoverContents::Many(parts) => parts
            .iter()
            .map(normalize_marked)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(SECTION_SEPARATOR),
    }
}

fn normalize_marked(marked: &MarkedString) -> String {
    match marked {
        MarkedString::Plain(s) => s.trim().to_string(),
        MarkedString::Code { language, value } => {
            format!("```{language}\n{}\n```", value.trim())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(json: &str) -> HoverContents {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn normalizes_plain_string() {
        let c = contents(r#""some docs""#);
        assert_eq!(normalize_hover(&c), "some docs");
    }

    #[test]
    fn normalizes_markup_content() {
        let c = contents(r#"{"kind":"markdown","value":"**bold** docs\n"}"#);
        assert_eq!(normalize_hover(&c), "**bold** docs");
    }

    #[test]
    fn normalizes_code_block() {
        let c = contents(r#"{"language":"ts","value":"function f(): void"}"#);
        assert_eq!(normalize_hover(&c), "```ts\nfunction f(): void\n```");
    }

    #[test]
    fn joins_mixed_sections() {
        let c = contents(r#"[{"language":"ts","value":"function f(): void"},"docs for f"]"#);
        assert_eq!(
            normalize_hover(&c),
            "```ts\nfunction f(): void\n```\n\n---\n\ndocs for f"
        );
    }
}
