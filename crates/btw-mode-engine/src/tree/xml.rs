//! Loading XML articles into a [`Tree`] and serializing decorated trees to HTML.

use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};

use super::{NodeId, NodeKind, Role, Tree};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("XML error at byte {position}: {source}")]
    Xml {
        position: usize,
        source: quick_xml::Error,
    },
    #[error("Unbalanced end tag at byte {0}")]
    Unbalanced(usize),
    #[error("Document has no root element")]
    Empty,
    #[error("Content after the root element at byte {0}")]
    TrailingContent(usize),
    #[error("Element <{0}> is never closed")]
    Unclosed(String),
}

impl Tree {
    /// Parse an XML document. Whitespace-only text between elements is dropped.
    pub fn from_xml(xml: &str) -> Result<Tree, LoadError> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(false);

        let mut tree: Option<Tree> = None;
        let mut stack: Vec<NodeId> = Vec::new();
        let mut buf = Vec::new();

        loop {
            let position = reader.buffer_position();
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    let node = open_element(&mut tree, &stack, e, position)?;
                    stack.push(node);
                }
                Ok(Event::Empty(ref e)) => {
                    open_element(&mut tree, &stack, e, position)?;
                }
                Ok(Event::End(_)) => {
                    stack.pop().ok_or(LoadError::Unbalanced(position))?;
                }
                Ok(Event::Text(ref e)) => {
                    let text = e
                        .unescape()
                        .map_err(|source| LoadError::Xml { position, source })?;
                    append_text(&mut tree, &stack, &text);
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    append_text(&mut tree, &stack, &text);
                }
                Ok(Event::Eof) => {
                    if let (Some(t), Some(&open)) = (tree.as_ref(), stack.last()) {
                        return Err(LoadError::Unclosed(
                            t.name(open).unwrap_or_default().to_string(),
                        ));
                    }
                    break;
                }
                Err(source) => {
                    return Err(LoadError::Xml {
                        position: reader.buffer_position(),
                        source,
                    });
                }
                _ => {}
            }
            buf.clear();
        }

        tree.ok_or(LoadError::Empty)
    }

    /// Serialize the data view of the subtree at `node` back to XML.
    /// Decoration is left out; wrappers contribute their data descendants.
    pub fn to_xml(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_xml(node, &mut out);
        out
    }

    fn write_xml(&self, node: NodeId, out: &mut String) {
        match self.kind(node) {
            Some(NodeKind::Text(t)) => out.push_str(&escape(t)),
            Some(NodeKind::Element(el)) => {
                out.push('<');
                out.push_str(&el.name);
                for (k, v) in &el.attrs {
                    out.push(' ');
                    out.push_str(k);
                    out.push_str("=\"");
                    out.push_str(&escape(v));
                    out.push('"');
                }
                let children = self.data_children(node);
                if children.is_empty() {
                    out.push_str("/>");
                    return;
                }
                out.push('>');
                for child in children {
                    self.write_xml(child, out);
                }
                out.push_str("</");
                out.push_str(&el.name);
                out.push('>');
            }
            None => {}
        }
    }

    /// Serialize the subtree at `node`, decoration included, as HTML
    pub fn to_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        match self.kind(node) {
            Some(NodeKind::Text(t)) => out.push_str(&html_escape::encode_text(t)),
            Some(NodeKind::Element(el)) => {
                let tag = match self.role(node) {
                    Some(Role::Data) => "div",
                    _ => el.name.as_str(),
                };
                let mut classes: Vec<&str> = Vec::new();
                if self.is_data(node) {
                    classes.push(&el.name);
                    classes.push("_real");
                }
                classes.extend(el.classes.iter().map(String::as_str));

                out.push('<');
                out.push_str(tag);
                if !classes.is_empty() {
                    out.push_str(" class=\"");
                    out.push_str(&html_escape::encode_double_quoted_attribute(
                        &classes.join(" "),
                    ));
                    out.push('"');
                }
                if let Some(id) = &el.id {
                    out.push_str(" id=\"");
                    out.push_str(&html_escape::encode_double_quoted_attribute(id));
                    out.push('"');
                }
                for (k, v) in &el.attrs {
                    out.push_str(" data-");
                    out.push_str(&k.replace(':', "---"));
                    out.push_str("=\"");
                    out.push_str(&html_escape::encode_double_quoted_attribute(v));
                    out.push('"');
                }
                out.push('>');
                for &child in self.children(node) {
                    self.write_html(child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            None => {}
        }
    }
}

fn open_element(
    tree: &mut Option<Tree>,
    stack: &[NodeId],
    e: &BytesStart<'_>,
    position: usize,
) -> Result<NodeId, LoadError> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| LoadError::Xml {
            position,
            source: err.into(),
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|source| LoadError::Xml { position, source })?
            .into_owned();
        attrs.push((key, value));
    }

    let node = match (tree.as_mut(), stack.last()) {
        (None, _) => {
            let fresh = Tree::new(&name);
            let root = fresh.root();
            *tree = Some(fresh);
            root
        }
        (Some(t), Some(&parent)) => {
            let node = t.create_element(&name);
            t.append_child(parent, node);
            node
        }
        (Some(_), None) => return Err(LoadError::TrailingContent(position)),
    };
    if let Some(t) = tree.as_mut() {
        for (k, v) in attrs {
            t.set_attr(node, &k, &v);
        }
    }
    Ok(node)
}

fn append_text(tree: &mut Option<Tree>, stack: &[NodeId], text: &str) {
    if text.trim().is_empty() {
        return;
    }
    if let (Some(t), Some(&parent)) = (tree.as_mut(), stack.last()) {
        let node = t.create_text(text);
        t.append_child(parent, node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_nested_elements_and_attributes() {
        let xml = r#"<btw:entry xmlns:btw="http://mangalamresearch.org/ns/btw-storage">
  <btw:sense xml:id="S.a"><btw:explanation>A &amp; B</btw:explanation></btw:sense>
  <btw:sense/>
</btw:entry>"#;
        let tree = Tree::from_xml(xml).unwrap();
        let root = tree.root();
        assert_eq!(tree.name(root), Some("btw:entry"));

        let senses = tree.data_children(root);
        assert_eq!(senses.len(), 2);
        assert_eq!(tree.attr(senses[0], "xml:id"), Some("S.a"));
        assert_eq!(tree.data_text(senses[0]), "A & B");
        assert!(tree.children(senses[1]).is_empty());
    }

    #[test]
    fn test_unclosed_and_empty_documents_are_rejected() {
        assert!(matches!(
            Tree::from_xml("<a><b></b>"),
            Err(LoadError::Unclosed(name)) if name == "a"
        ));
        assert!(matches!(Tree::from_xml(""), Err(LoadError::Empty)));
    }

    #[test]
    fn test_xml_output_skips_decoration() {
        let xml = r#"<btw:entry><btw:sense xml:id="S.0">a &amp; b</btw:sense><btw:none/></btw:entry>"#;
        let mut tree = Tree::from_xml(xml).unwrap();
        let root = tree.root();
        let sense = tree.data_children(root)[0];
        let head = tree.create_phantom_text("div", &["head"], "SENSE A:");
        tree.insert_at(sense, 0, head);
        let group = tree.create_wrapper("div", &["_collapsible"]);
        tree.replace(sense, group);
        tree.append_child(group, sense);

        assert_eq!(tree.to_xml(root), xml);
    }

    #[test]
    fn test_second_root_is_rejected() {
        let result = Tree::from_xml("<a/><b/>");
        assert!(matches!(result, Err(LoadError::TrailingContent(_))));
    }

    #[test]
    fn test_html_escapes_text_and_attributes() {
        let mut tree = Tree::from_xml(r#"<ref target="/bibl/1?a=&quot;x&quot;">a &lt; b</ref>"#).unwrap();
        let root = tree.root();
        let placeholder = tree.create_phantom_text("span", &["_ref_abbr"], "(...)");
        tree.insert_at(root, 0, placeholder);

        let html = tree.to_html(root);
        assert!(html.starts_with(r#"<div class="ref _real" data-target="/bibl/1?a=&quot;x&quot;">"#));
        assert!(html.contains(r#"<span class="_ref_abbr _phantom">(...)</span>"#));
        assert!(html.contains("a &lt; b"));
    }
}
