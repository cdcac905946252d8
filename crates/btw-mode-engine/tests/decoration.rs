use std::collections::HashMap;

use btw_mode_engine::decorating::heading::heading_text;
use btw_mode_engine::fetch::{FetchError, ReferenceSource};
use btw_mode_engine::validation::{ValidationError, ValidatorError};
use btw_mode_engine::{
    BiblItem, ChangeRecord, DispatchCapable, EditingDecorator, MemorySource, NodeId, SchemaRules,
    SemanticFieldRecord, Sources, Tree, Validator,
};
use pretty_assertions::assert_eq;

const THREE_SENSES: &str = r##"<btw:entry>
  <btw:sense-discrimination>
    <btw:sense xml:id="S.0"><btw:explanation>X</btw:explanation></btw:sense>
    <btw:sense xml:id="S.1"><btw:explanation>Y</btw:explanation></btw:sense>
    <btw:sense xml:id="S.2"><btw:explanation>Z <ptr target="#S.2"/></btw:explanation></btw:sense>
  </btw:sense-discrimination>
</btw:entry>"##;

const CITED: &str = r##"<btw:entry>
  <btw:sense-discrimination>
    <btw:sense xml:id="S.0">
      <btw:citations>
        <btw:example xml:id="E.0"><btw:cit><ref target="/bibl/1">AKBh</ref></btw:cit></btw:example>
        <btw:example xml:id="E.1"><btw:cit><ref target="/bibl/1">AKBh</ref></btw:cit></btw:example>
        <btw:example xml:id="E.2"><btw:cit><ref target="/bibl/404">??</ref></btw:cit></btw:example>
      </btw:citations>
    </btw:sense>
    <btw:sense xml:id="S.1">
      <btw:explanation>compare <ptr target="#E.0"/> and <ptr target="#E.9"/></btw:explanation>
    </btw:sense>
  </btw:sense-discrimination>
</btw:entry>"##;

/// Counts how many batches reach the bibliography
struct CountingSource {
    inner: MemorySource<BiblItem>,
    batches: std::rc::Rc<std::cell::Cell<usize>>,
}

impl ReferenceSource for CountingSource {
    type Record = BiblItem;

    fn resolve(&mut self, references: &[String]) -> Result<HashMap<String, BiblItem>, FetchError> {
        self.batches.set(self.batches.get() + 1);
        self.inner.resolve(references)
    }
}

struct NowhereToInsert;

impl Validator for NowhereToInsert {
    fn possible_where(
        &self,
        _tree: &Tree,
        _parent: NodeId,
        _name: &str,
    ) -> Result<Vec<usize>, ValidatorError> {
        Ok(Vec::new())
    }

    fn validate(&self, _tree: &Tree, _root: NodeId) -> Result<Vec<ValidationError>, ValidatorError> {
        Ok(Vec::new())
    }

    fn instantiate(&self, tree: &mut Tree, name: &str) -> NodeId {
        tree.create_element(name)
    }
}

fn bibliography() -> MemorySource<BiblItem> {
    MemorySource::new().with(
        "/bibl/1",
        BiblItem {
            title: "Abhidharmakośabhāṣya".to_string(),
            abbreviation: Some("AKBh".to_string()),
            ..Default::default()
        },
    )
}

fn editor_with(xml: &str, sources: Sources) -> EditingDecorator {
    let tree = Tree::from_xml(xml).unwrap();
    EditingDecorator::new(tree, sources, Box::new(SchemaRules::btw()))
}

fn started(xml: &str) -> EditingDecorator {
    let mut editor = editor_with(xml, Sources::default());
    editor.start_listening().unwrap();
    editor
}

fn by_xml_id(editor: &EditingDecorator, id: &str) -> NodeId {
    editor.tree().find_by_attr("xml:id", id).unwrap()
}

fn all_named(editor: &EditingDecorator, name: &str) -> Vec<NodeId> {
    let tree = editor.tree();
    tree.data_descendants(tree.root())
        .into_iter()
        .filter(|&n| tree.name(n) == Some(name))
        .collect()
}

fn rendered(editor: &EditingDecorator, el: NodeId, class: &str) -> Option<String> {
    let tree = editor.tree();
    tree.first_child_by_class(el, class)
        .map(|n| tree.text_content(n))
}

// ============ Labels ============

#[test]
fn test_removing_a_sense_relabels_the_rest() {
    // Given three senses labeled a, b, c and a pointer to the third
    let mut editor = started(THREE_SENSES);
    let ptr = all_named(&editor, "ptr")[0];
    assert_eq!(rendered(&editor, ptr, "_linking_deco").as_deref(), Some("[c]"));

    // When the middle sense is removed
    let middle = by_xml_id(&editor, "S.1");
    editor.remove_node(middle).unwrap();

    // Then labels follow document order again
    let first = by_xml_id(&editor, "S.0");
    let last = by_xml_id(&editor, "S.2");
    let tree = editor.tree();
    assert_eq!(heading_text(tree, first).as_deref(), Some("SENSE A:"));
    assert_eq!(heading_text(tree, last).as_deref(), Some("SENSE B:"));
    assert_eq!(rendered(&editor, ptr, "_linking_deco").as_deref(), Some("[b]"));
}

#[test]
fn test_subsense_waits_for_its_sense() {
    let mut editor = editor_with(
        r#"<btw:entry><btw:sense xml:id="S.0">
             <btw:subsense xml:id="S.1"><btw:explanation>early</btw:explanation></btw:subsense>
           </btw:sense></btw:entry>"#,
        Sources::default(),
    );
    let sense = by_xml_id(&editor, "S.0");
    let subsense = by_xml_id(&editor, "S.1");

    // Decorated before its sense has a label
    editor.dispatch(subsense).unwrap();
    assert_eq!(heading_text(editor.tree(), subsense).as_deref(), Some("SUBSENSE:"));

    // Labeling the sense wakes the subsense up
    editor.dispatch(sense).unwrap();
    editor.run_pending().unwrap();
    assert_eq!(heading_text(editor.tree(), subsense).as_deref(), Some("SUBSENSE a1:"));
    let explanation = all_named(&editor, "btw:explanation")[0];
    assert_eq!(
        rendered(&editor, explanation, "_explanation_number").as_deref(),
        Some("1. ")
    );
}

#[test]
fn test_relabel_replay_reproduces_labels() {
    let mut editor = started(
        r##"<btw:entry><btw:sense-discrimination>
             <btw:sense xml:id="S.0"><btw:explanation>X <ptr target="#S.4"/></btw:explanation></btw:sense>
             <btw:sense xml:id="S.1">
               <btw:subsense xml:id="S.3"><btw:explanation>Y1</btw:explanation></btw:subsense>
               <btw:subsense xml:id="S.4"><btw:explanation>Y2</btw:explanation></btw:subsense>
             </btw:sense>
             <btw:sense xml:id="S.2"><btw:explanation>Z <ptr target="#S.0"/></btw:explanation></btw:sense>
           </btw:sense-discrimination></btw:entry>"##,
    );
    let labels = |editor: &EditingDecorator| {
        let mut seen: Vec<Option<String>> = ["btw:sense", "btw:subsense"]
            .into_iter()
            .flat_map(|name| all_named(editor, name))
            .map(|el| heading_text(editor.tree(), el))
            .collect();
        seen.extend(
            all_named(editor, "ptr")
                .into_iter()
                .map(|p| rendered(editor, p, "_linking_deco")),
        );
        seen
    };
    let before = labels(&editor);
    assert_eq!(
        before,
        vec![
            Some("SENSE A:".to_string()),
            Some("SENSE B:".to_string()),
            Some("SENSE C:".to_string()),
            Some("SUBSENSE b1:".to_string()),
            Some("SUBSENSE b2:".to_string()),
            Some("[b2]".to_string()),
            Some("[a]".to_string()),
        ]
    );

    for _ in 0..2 {
        editor.relabel_all().unwrap();
        editor.run_pending().unwrap();
        assert_eq!(labels(&editor), before);
    }
}

#[test]
fn test_twenty_seventh_sense_is_marked_not_labeled() {
    let senses: String = (0..27)
        .map(|i| format!(r#"<btw:sense xml:id="S.{i}"/>"#))
        .collect();
    let editor = started(&format!(
        "<btw:entry><btw:sense-discrimination>{senses}</btw:sense-discrimination></btw:entry>"
    ));

    let last = by_xml_id(&editor, "S.26");
    let z = by_xml_id(&editor, "S.25");
    assert_eq!(heading_text(editor.tree(), z).as_deref(), Some("SENSE Z:"));
    assert_eq!(heading_text(editor.tree(), last).as_deref(), Some("SENSE:"));
    assert_eq!(
        rendered(&editor, last, "_label_error").as_deref(),
        Some("too many senses")
    );
}

#[test]
fn test_new_sense_gets_fresh_id_and_label() {
    let mut editor = started(THREE_SENSES);
    let discrimination = all_named(&editor, "btw:sense-discrimination")[0];

    let sense = editor.insert_element(discrimination, 3, "btw:sense").unwrap();

    assert_eq!(editor.tree().attr(sense, "xml:id"), Some("S.3"));
    assert_eq!(heading_text(editor.tree(), sense).as_deref(), Some("SENSE D:"));
    assert!(editor.is_dirty());
}

// ============ Links and citations ============

#[test]
fn test_fetch_fan_out_and_positional_labels() {
    // Given two refs to the same entry and one to a missing entry
    let batches = std::rc::Rc::new(std::cell::Cell::new(0));
    let sources = Sources {
        bibliography: Box::new(CountingSource {
            inner: bibliography(),
            batches: batches.clone(),
        }),
        semantic_fields: Box::new(MemorySource::<SemanticFieldRecord>::new()),
    };
    let mut editor = editor_with(CITED, sources);

    // When the document is decorated
    editor.start_listening().unwrap();

    // Then one batch resolved everything and each ref shows its answer
    assert_eq!(batches.get(), 1);
    let refs: Vec<Option<String>> = all_named(&editor, "ref")
        .into_iter()
        .map(|r| rendered(&editor, r, "_ref_abbr"))
        .collect();
    assert_eq!(
        refs,
        vec![
            Some("AKBh".to_string()),
            Some("AKBh".to_string()),
            Some("NON-EXISTENT".to_string()),
        ]
    );

    // And the pointer to the example picked up the fetched abbreviation
    let ptrs = all_named(&editor, "ptr");
    assert_eq!(
        rendered(&editor, ptrs[0], "_linking_deco").as_deref(),
        Some("See AKBh quoted above in SENSE A.")
    );
    assert_eq!(rendered(&editor, ptrs[1], "_linking_deco").as_deref(), Some("[?]"));
}

#[test]
fn test_semantic_field_widget_opens_on_resolved_record() {
    let sources = Sources {
        bibliography: Box::new(MemorySource::<BiblItem>::new()),
        semantic_fields: Box::new(MemorySource::new().with(
            "01.04.08n",
            SemanticFieldRecord {
                heading: "Wisdom".to_string(),
                path: "01.04.08n".to_string(),
                tree: vec![ChangeRecord {
                    lemma: "prajñā".to_string(),
                    url: "/lexicography/entry/1".to_string(),
                    datetime: "2015-06-01".to_string(),
                    published: true,
                }],
                ..Default::default()
            },
        )),
    };
    let mut editor = editor_with(
        r#"<btw:entry><btw:sense xml:id="S.0"><btw:semantic-fields>
             <btw:sf>01.04.08n</btw:sf><btw:sf>99.99n</btw:sf>
           </btw:semantic-fields></btw:sense></btw:entry>"#,
        sources,
    );
    editor.start_listening().unwrap();

    let fields = all_named(&editor, "btw:sf");
    let tree = editor.tree();
    assert_eq!(rendered(&editor, fields[0], "_sf_widget").as_deref(), Some("Wisdom"));
    let popover = tree.first_child_by_class(fields[0], "_sf_popover").unwrap();
    assert_eq!(
        rendered(&editor, popover, "_sf_path").as_deref(),
        Some("01.04.08n")
    );
    let changes = tree.first_child_by_class(popover, "_sf_changes").unwrap();
    let change = tree.children(changes)[0];
    assert_eq!(tree.text_content(change), "prajñā");
    assert_eq!(tree.attr(change, "datetime"), Some("2015-06-01"));

    // An unresolved field gets the marker and nothing to open
    assert_eq!(
        rendered(&editor, fields[1], "_sf_widget").as_deref(),
        Some("unknown field")
    );
    assert!(tree.first_child_by_class(fields[1], "_sf_popover").is_none());
}

#[test]
fn test_retargeting_a_pointer() {
    let mut editor = started(THREE_SENSES);
    let ptr = all_named(&editor, "ptr")[0];

    editor.set_ref_target(ptr, "#S.0").unwrap();

    assert_eq!(rendered(&editor, ptr, "_linking_deco").as_deref(), Some("[a]"));
    let link = editor.tree().first_child_by_class(ptr, "_linking_deco").unwrap();
    assert_eq!(editor.tree().attr(link, "href"), Some("#BTW-S.0"));
}

// ============ Insertion controls ============

#[test]
fn test_no_valid_position_renders_no_control() {
    let tree = Tree::from_xml(THREE_SENSES).unwrap();
    let mut editor = EditingDecorator::new(tree, Sources::default(), Box::new(NowhereToInsert));
    editor.start_listening().unwrap();

    for sense in all_named(&editor, "btw:sense") {
        assert!(editor.affordances(sense).is_empty());
    }
}

#[test]
fn test_controls_follow_edits() {
    let mut editor = started(THREE_SENSES);
    let sense = by_xml_id(&editor, "S.0");
    let offers_citations = |editor: &EditingDecorator| {
        editor.affordances(sense).into_iter().any(|c| {
            editor
                .tree()
                .attr(c, "actions")
                .is_some_and(|a| a.split('|').any(|n| n == "btw:citations"))
        })
    };
    assert!(offers_citations(&editor));

    editor.insert_element(sense, 1, "btw:citations").unwrap();

    assert!(!offers_citations(&editor));
}
