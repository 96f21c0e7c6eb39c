//! Documentation comment parsing

use crate::ast::{JsDoc, JsDocTag};
use crate::token::Comment;

/// Parse the text of a `/** ... */` comment into description lines and tags
pub fn parse_jsdoc(text: &str) -> JsDoc {
    let inner = text
        .trim()
        .trim_start_matches("/**")
        .trim_end_matches("*/");

    let mut doc = JsDoc::default();
    let mut current: Option<JsDocTag> = None;

    for raw_line in inner.lines() {
        let line = raw_line.trim();
        let line = line.strip_prefix('*').unwrap_or(line).trim();
        if line.is_empty() {
            continue;
        }

        if let Some(tag_text) = line.strip_prefix('@') {
            if let Some(tag) = current.take() {
                doc.tags.push(tag);
            }
            for (index, piece) in tag_text.split(" @").enumerate() {
                if index > 0 {
                    if let Some(tag) = current.take() {
                        doc.tags.push(tag);
                    }
                }
                let mut parts = piece.splitn(2, char::is_whitespace);
                let name = parts.next().unwrap_or_default().to_string();
                let text = parts.next().unwrap_or_default().trim().to_string();
                current = Some(JsDocTag { name, text });
            }
        } else if let Some(tag) = current.as_mut() {
            if !tag.text.is_empty() {
                tag.text.push(' ');
            }
            tag.text.push_str(line);
        } else {
            doc.description.push(line.to_string());
        }
    }

    if let Some(tag) = current {
        doc.tags.push(tag);
    }
    doc
}

/// The documentation block nearest to a declaration, if any
pub fn jsdoc_of(comments: &[Comment]) -> Option<JsDoc> {
    comments
        .iter()
        .rev()
        .find(|comment| comment.is_jsdoc())
        .map(|comment| parse_jsdoc(&comment.text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line_tag() {
        let doc = parse_jsdoc("/** @tupleReturn */");
        assert!(doc.description.is_empty());
        assert_eq!(doc.tags, vec![JsDocTag { name: "tupleReturn".into(), text: String::new() }]);
    }

    #[test]
    fn test_description_and_tags() {
        let doc = parse_jsdoc(
            "/**\n * Moves the player.\n * @customConstructor makePlayer\n * @action 3 1\n */",
        );
        assert_eq!(doc.description, vec!["Moves the player.".to_string()]);
        assert_eq!(doc.tags.len(), 2);
        assert_eq!(doc.tags[0].name, "customConstructor");
        assert_eq!(doc.tags[0].text, "makePlayer");
        assert_eq!(doc.tags[1].text, "3 1");
    }

    #[test]
    fn test_multiple_tags_on_one_line() {
        let doc = parse_jsdoc("/** @extension @phantom */");
        let names: Vec<_> = doc.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["extension", "phantom"]);
    }
}
