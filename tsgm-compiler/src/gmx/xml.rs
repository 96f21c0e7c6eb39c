//! Ordered element tree for `.gmx` markup
//!
//! GameMaker stores projects, objects and rooms as small XML documents.
//! They are kept as a plain tree of [`Element`]s so that reading a file and
//! writing it back preserves the order of every field, known or not.

use crate::error::ManifestError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::fmt::Display;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    /// Text content; an empty text is stored as `None`
    pub text: Option<String>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            ..Element::default()
        }
    }

    /// `<name>value</name>`
    pub fn leaf(name: impl Into<String>, value: impl ToString) -> Self {
        Element::new(name).with_text(value.to_string())
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.set_text(text);
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl ToString) {
        let name = name.into();
        let value = value.to_string();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.text = if text.is_empty() { None } else { Some(text) };
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find(|child| child.name == name)
    }

    pub fn children_named<'e>(&'e self, name: &'e str) -> impl Iterator<Item = &'e Element> + 'e {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Text of the first child called `name`
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(Element::text)
    }

    /// Set the text of the child called `name`, appending the child when missing
    pub fn set_child_text(&mut self, name: &str, value: impl ToString) {
        match self.child_mut(name) {
            Some(child) => child.set_text(value.to_string()),
            None => self.children.push(Element::leaf(name, value)),
        }
    }
}

fn xml_error(error: impl Display) -> ManifestError {
    ManifestError::Xml(error.to_string())
}

fn start_element(start: &BytesStart<'_>) -> Result<Element, ManifestError> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()));
    for attribute in start.attributes() {
        let attribute = attribute.map_err(xml_error)?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value().map_err(xml_error)?;
        element.attributes.push((key, value.into_owned()));
    }
    Ok(element)
}

fn append_text(element: &mut Element, text: &str) {
    if text.is_empty() {
        return;
    }
    match element.text.as_mut() {
        Some(existing) => existing.push_str(text),
        None => element.text = Some(text.to_string()),
    }
}

/// Parse a document into its root element
pub fn parse(text: &str) -> Result<Element, ManifestError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;
    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(start) => stack.push(start_element(&start)?),
            Event::Empty(start) => {
                let element = start_element(&start)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| ManifestError::Malformed("unbalanced closing tag".to_string()))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(xml_error)?;
                if let Some(element) = stack.last_mut() {
                    append_text(element, &text);
                }
            }
            Event::CData(data) => {
                let data = data.into_inner();
                if let Some(element) = stack.last_mut() {
                    append_text(element, &String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(ManifestError::Malformed(format!("unclosed element <{}>", stack[0].name)));
    }
    root.ok_or_else(|| ManifestError::Malformed("document has no root element".to_string()))
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<(), ManifestError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() && element.text.is_none() {
        return writer.write_event(Event::Empty(start)).map_err(xml_error);
    }

    writer.write_event(Event::Start(start)).map_err(xml_error)?;
    if let Some(text) = &element.text {
        writer.write_event(Event::Text(BytesText::new(text))).map_err(xml_error)?;
    }
    for child in &element.children {
        write_element(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(xml_error)
}

/// Serialise `root` with an XML declaration and two-space indentation
pub fn to_string(root: &Element) -> Result<String, ManifestError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
        .map_err(xml_error)?;
    write_element(&mut writer, root)?;
    let mut text = String::from_utf8(writer.into_inner()).map_err(xml_error)?;
    text.push('\n');
    Ok(text)
}

pub fn read_file(path: &Path) -> Result<Element, ManifestError> {
    debug!(path = %path.display(), "Reading gmx file");
    let text = std::fs::read_to_string(path).map_err(|error| ManifestError::Io {
        path: path.to_path_buf(),
        error,
    })?;
    parse(&text)
}

pub fn write_file(path: &Path, root: &Element) -> Result<(), ManifestError> {
    debug!(path = %path.display(), "Writing gmx file");
    let text = to_string(root)?;
    std::fs::write(path, text).map_err(|error| ManifestError::Io {
        path: path.to_path_buf(),
        error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<assets>
  <Configs name="configs">
    <Config>Configs\Default</Config>
  </Configs>
  <scripts name="scripts">
    <script>scripts\init.gml</script>
    <scripts name="enemies">
      <script>scripts\enemies\spawn.gml</script>
    </scripts>
  </scripts>
  <help>
    <rtf>help.rtf</rtf>
  </help>
</assets>
"#;

    #[test]
    fn test_parse_tree() {
        let root = parse(PROJECT).unwrap();
        assert_eq!(root.name, "assets");
        let scripts = root.child("scripts").unwrap();
        assert_eq!(scripts.attribute("name"), Some("scripts"));
        assert_eq!(scripts.child_text("script"), Some("scripts\\init.gml"));
        let nested = scripts.child("scripts").unwrap();
        assert_eq!(nested.attribute("name"), Some("enemies"));
        assert_eq!(root.child("help").and_then(|help| help.child_text("rtf")), Some("help.rtf"));
    }

    #[test]
    fn test_write_is_indented_with_declaration() {
        let root = Element::new("object")
            .with_child(Element::leaf("spriteName", "<undefined>"))
            .with_child(Element::new("events"));
        let text = to_string(&root).unwrap();
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<object>\n"));
        assert!(text.contains("\n  <spriteName>&lt;undefined&gt;</spriteName>\n"), "{text}");
        assert!(text.contains("\n  <events/>\n"), "{text}");
    }

    #[test]
    fn test_read_write_read_is_stable() {
        let first = parse(PROJECT).unwrap();
        let written = to_string(&first).unwrap();
        let second = parse(&written).unwrap();
        assert_eq!(first, second);
        assert_eq!(written, to_string(&second).unwrap());
    }

    #[test]
    fn test_escaped_script_text_survives() {
        let code = "if a < b && c > d\n{\n    show_message(\"hi\");\n}";
        let root = Element::new("event").with_child(Element::leaf("string", code));
        let reread = parse(&to_string(&root).unwrap()).unwrap();
        assert_eq!(reread.child_text("string"), Some(code));
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(parse("<a><b></a>"), Err(ManifestError::Xml(_))));
        assert!(parse("<a>").is_err());
        assert!(matches!(parse(""), Err(ManifestError::Malformed(_))));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("game.project.gmx");
        let root = parse(PROJECT).unwrap();
        write_file(&path, &root).unwrap();
        assert_eq!(read_file(&path).unwrap(), root);
    }

    #[test]
    fn test_set_child_text() {
        let mut room = Element::new("room").with_child(Element::new("code"));
        room.set_child_text("code", "x = 1;");
        room.set_child_text("caption", "Level");
        assert_eq!(room.child_text("code"), Some("x = 1;"));
        assert_eq!(room.children.last().map(|child| child.name.as_str()), Some("caption"));
    }
}
