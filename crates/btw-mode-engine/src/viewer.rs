//! Read-only rendering of an article: the same decorators as editing, no
//! chrome and no insertion controls.

use log::debug;
use serde::Serialize;

use crate::decorating::dispatch::DispatchCapable;
use crate::decorating::heading::{HeadingDecorator, heading_text};
use crate::error::DecorationError;
use crate::fetch::Sources;
use crate::kind::ElementKind;
use crate::session::Session;
use crate::tree::{NodeId, Tree};

/// One line of the rendered article's outline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineEntry {
    pub depth: usize,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

pub struct Viewer {
    session: Session,
}

impl Viewer {
    pub fn new(tree: Tree, sources: Sources) -> Self {
        Self::with_headings(tree, sources, HeadingDecorator::viewer())
    }

    pub fn with_headings(tree: Tree, sources: Sources, headings: HeadingDecorator) -> Self {
        Self {
            session: Session::new(tree, sources, headings),
        }
    }

    pub fn tree(&self) -> &Tree {
        &self.session.tree
    }

    /// Decorate the whole document and wait for every fetch to land
    pub fn render(&mut self) -> Result<(), DecorationError> {
        let root = self.session.tree.root();
        self.decorate_subtree(root)?;
        self.refresh_links()?;
        self.run_pending()
    }

    pub fn to_html(&self) -> String {
        self.session.tree.to_html(self.session.tree.root())
    }

    /// Headed sections, labeled entities and rendered links in document order
    pub fn outline(&self) -> Vec<OutlineEntry> {
        let mut entries = Vec::new();
        collect_outline(&self.session.tree, self.session.tree.root(), 0, &mut entries);
        entries
    }
}

fn collect_outline(tree: &Tree, el: NodeId, depth: usize, out: &mut Vec<OutlineEntry>) {
    let child_depth = match outline_entry(tree, el, depth) {
        Some(entry) => {
            out.push(entry);
            depth + 1
        }
        None => depth,
    };
    for child in tree.data_element_children(el) {
        collect_outline(tree, child, child_depth, out);
    }
}

fn outline_entry(tree: &Tree, el: NodeId, depth: usize) -> Option<OutlineEntry> {
    let kind = ElementKind::of(tree, el);
    let rendered = |class: &str| {
        tree.first_child_by_class(el, class)
            .map(|n| tree.text_content(n))
    };
    let text = match kind {
        ElementKind::Ptr | ElementKind::Ref => {
            rendered("_linking_deco").or_else(|| rendered("_ref_abbr"))
        }
        ElementKind::Sf => rendered("_sf_widget"),
        _ => rendered("_label_error"),
    };
    let heading = heading_text(tree, el);
    let labeled = matches!(
        kind,
        ElementKind::Sense
            | ElementKind::Subsense
            | ElementKind::Example
            | ElementKind::ExampleExplained
    );
    if heading.is_none() && text.is_none() && !labeled {
        return None;
    }
    Some(OutlineEntry {
        depth,
        kind: kind.name().to_string(),
        id: tree.id(el).map(str::to_string),
        heading,
        text,
    })
}

impl DispatchCapable for Viewer {
    fn session(&self) -> &Session {
        &self.session
    }

    fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    fn to_data_node(&self, node: NodeId) -> Option<NodeId> {
        self.session.tree.is_data(node).then_some(node)
    }

    fn nodes_around_editable_contents(&self, _el: NodeId) -> (Option<NodeId>, Option<NodeId>) {
        (None, None)
    }

    fn element_decorator(&mut self, _el: NodeId) -> Result<(), DecorationError> {
        Ok(())
    }

    /// Ids generated while viewing live only in the rendered copy
    fn persist_xml_id(&mut self, el: NodeId, id: &str) {
        debug!("viewer assigned transient xml:id {id}");
        self.session.tree.set_attr(el, "xml:id", id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{BiblItem, MemorySource, SemanticFieldRecord};
    use crate::tests::SMALL_ARTICLE;
    use pretty_assertions::assert_eq;

    fn sources() -> Sources {
        Sources {
            bibliography: Box::new(
                MemorySource::new()
                    .with(
                        "/bibl/1",
                        BiblItem {
                            title: "Abhidharmakośabhāṣya".to_string(),
                            abbreviation: Some("AKBh".to_string()),
                            ..Default::default()
                        },
                    )
                    .with(
                        "/bibl/2",
                        BiblItem {
                            title: "Visuddhimagga".to_string(),
                            creators: "Buddhaghosa, Bhadantācariya".to_string(),
                            date: "1920".to_string(),
                            ..Default::default()
                        },
                    ),
            ),
            semantic_fields: Box::new(MemorySource::<SemanticFieldRecord>::new()),
        }
    }

    #[test]
    fn test_viewer_headings_never_collapse() {
        let mut viewer = Viewer::new(Tree::from_xml(SMALL_ARTICLE).unwrap(), sources());
        viewer.render().unwrap();
        let html = viewer.to_html();
        assert!(html.contains("more citations for sense a"));
        assert!(!html.contains("_collapsible"));
        assert!(!html.contains("_start_wrapper"));
    }

    #[test]
    fn test_render_waits_for_citations() {
        let mut viewer = Viewer::new(Tree::from_xml(SMALL_ARTICLE).unwrap(), sources());
        viewer.render().unwrap();
        let refs: Vec<String> = viewer
            .outline()
            .into_iter()
            .filter(|e| e.kind == "ref")
            .filter_map(|e| e.text)
            .collect();
        assert_eq!(refs, vec!["AKBh", "Buddhaghosa 1920"]);
    }

    #[test]
    fn test_outline_snapshot() {
        let mut viewer = Viewer::new(Tree::from_xml(SMALL_ARTICLE).unwrap(), sources());
        viewer.render().unwrap();
        insta::assert_yaml_snapshot!(viewer.outline());
    }
}
