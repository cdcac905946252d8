//! Element-kind dispatch shared by the editing decorator and the viewer.
//!
//! Hosts implement the handful of required methods (where their chrome
//! lives, how ids are persisted, what extra per-element decoration they
//! add); every decorator routine below is written once against those.

use log::{debug, error, warn};

use crate::error::DecorationError;
use crate::fetch::{BiblItem, Completion, SemanticFieldRecord};
use crate::kind::ElementKind;
use crate::references::example::citation_ref;
use crate::references::{LabelError, RefmanError, RefmanRef, internal_target};
use crate::session::Session;
use crate::tree::{NodeId, Tree};

use super::scheduler::Task;

/// Placeholder shown while a citation is being fetched
pub const PENDING_CITATION: &str = "(...)";
/// Shown when the bibliography has no entry for a reference
pub const MISSING_CITATION: &str = "NON-EXISTENT";
/// Shown when a semantic field cannot be resolved
pub const UNKNOWN_FIELD: &str = "unknown field";
/// Class of the detail box attached to a resolved semantic field
pub const SF_POPOVER: &str = "_sf_popover";
/// Link text for a pointer whose target has no label (yet)
pub const UNKNOWN_LABEL: &str = "?";

pub trait DispatchCapable {
    fn session(&self) -> &Session;

    fn session_mut(&mut self) -> &mut Session;

    /// Data element a rendered node stands for
    fn to_data_node(&self, node: NodeId) -> Option<NodeId>;

    /// Chrome opening and closing the editable contents of `el`
    fn nodes_around_editable_contents(&self, el: NodeId) -> (Option<NodeId>, Option<NodeId>);

    /// Host-specific decoration applied to every element that gets chrome
    fn element_decorator(&mut self, el: NodeId) -> Result<(), DecorationError>;

    /// Store a freshly generated `xml:id` on `el`
    fn persist_xml_id(&mut self, el: NodeId, id: &str);

    fn refresh_visible_absences(&mut self, _el: NodeId) -> Result<(), DecorationError> {
        Ok(())
    }

    /// Decorate one element according to its kind
    fn dispatch(&mut self, el: NodeId) -> Result<(), DecorationError> {
        let Some(el) = self.to_data_node(el) else {
            return Ok(());
        };
        let tree = &self.session().tree;
        if !tree.is_live(el) || !tree.is_element(el) {
            return Ok(());
        }

        let kind = ElementKind::of(tree, el);
        let mut chrome = true;
        match &kind {
            ElementKind::Overview
            | ElementKind::SenseDiscrimination
            | ElementKind::HistoricoSemanticalData
            | ElementKind::Credits => {
                let session = self.session_mut();
                session.headings.unit_heading_decorator(&mut session.tree, el)?;
            }
            ElementKind::Sense => {
                self.id_decorator(el)?;
                self.section_heading(el)?;
            }
            ElementKind::Subsense => {
                self.id_decorator(el)?;
                self.section_heading(el)?;
                let explanations =
                    children_of_kind(&self.session().tree, el, ElementKind::Explanation);
                for explanation in explanations {
                    self.explanation_decorator(explanation)?;
                }
            }
            ElementKind::Example | ElementKind::ExampleExplained => {
                self.id_decorator(el)?;
            }
            ElementKind::Explanation => {
                self.section_heading(el)?;
                self.explanation_decorator(el)?;
            }
            ElementKind::Definition
            | ElementKind::EnglishRenditions
            | ElementKind::Etymology
            | ElementKind::Citations
            | ElementKind::OtherCitations
            | ElementKind::ContrastiveSection
            | ElementKind::Antonyms
            | ElementKind::Cognates
            | ElementKind::ConceptualProximates
            | ElementKind::SemanticFields => {
                self.section_heading(el)?;
            }
            ElementKind::Ptr | ElementKind::Ref => {
                let tree = &self.session().tree;
                let internal = tree
                    .attr(el, "target")
                    .and_then(internal_target)
                    .is_some();
                if internal {
                    self.ptr_decorator(el)?;
                } else {
                    self.ref_decorator(el)?;
                }
            }
            ElementKind::Cit => self.cit_decorator(el)?,
            ElementKind::None => {
                chrome = false;
                self.none_decorator(el)?;
            }
            ElementKind::Sf => {
                chrome = false;
                self.sf_decorator(el)?;
            }
            ElementKind::Foreign => self.language_decorator(el)?,
            ElementKind::Entry
            | ElementKind::Lemma
            | ElementKind::EnglishRendition
            | ElementKind::Antonym
            | ElementKind::Cognate
            | ElementKind::ConceptualProximate
            | ElementKind::Term
            | ElementKind::Tr
            | ElementKind::Other(_) => {}
        }

        if chrome {
            self.element_decorator(el)?;
        }
        self.refresh_visible_absences(el)
    }

    /// Dispatch every data element under `root` (inclusive) in document order
    fn decorate_subtree(&mut self, root: NodeId) -> Result<(), DecorationError> {
        let elements = self.session().tree.data_descendants(root);
        debug!("decorating {} element(s)", elements.len());
        for el in elements {
            if self.session().tree.is_live(el) {
                self.dispatch(el)?;
            }
        }
        Ok(())
    }

    /// Section heading from the session's heading table
    fn section_heading(&mut self, el: NodeId) -> Result<(), DecorationError> {
        let Session {
            tree,
            refmans,
            headings,
            ..
        } = self.session_mut();
        headings.section_heading_decorator(tree, refmans, el, None)?;
        Ok(())
    }

    /// `xml:id` of `el`, generating and persisting one when missing
    fn ensure_xml_id(&mut self, el: NodeId) -> String {
        if let Some(id) = self.session().tree.attr(el, "xml:id") {
            return id.to_string();
        }
        let session = self.session_mut();
        let id = if ElementKind::of(&session.tree, el).is_example() {
            session.example_ids.generate()
        } else {
            session.sense_ids.generate()
        };
        debug!("generated xml:id {id}");
        self.persist_xml_id(el, &id);
        id
    }

    /// Ensure ids and allocate a label through the governing manager.
    /// A manager at its hard limit leaves the element unlabeled with an
    /// inline error marker.
    fn allocate_label_for(&mut self, el: NodeId) -> Result<Option<String>, DecorationError> {
        if ElementKind::of(&self.session().tree, el) == ElementKind::Subsense {
            let sense = self.session().tree.data_parent(el).and_then(|p| {
                self.session()
                    .tree
                    .closest(p, |t, n| ElementKind::of(t, n) == ElementKind::Sense)
            });
            if let Some(sense) = sense {
                self.ensure_xml_id(sense);
            }
        }
        let id = self.ensure_xml_id(el);

        let session = self.session_mut();
        session.tree.set_id(el, &format!("BTW-{id}"));
        session.tree.remove_children_by_class(el, "_label_error");
        let refman = session.refmans.get_refman_for_element(&session.tree, el)?;
        match session.refmans.allocate_label(&refman, &id) {
            Ok(label) => Ok(label),
            Err(err @ LabelError::HardLimit { .. }) => {
                error!("cannot label {id}: {err}");
                let marker =
                    session
                        .tree
                        .create_phantom_text("span", &["_label_error"], "too many senses");
                let at = session.tree.leading_chrome_len(el);
                session.tree.insert_at(el, at, marker);
                Ok(None)
            }
        }
    }

    /// Render id and label for senses, subsenses and examples. A sense
    /// labeled for the first time wakes subsenses that were decorated
    /// before it had a label.
    fn id_decorator(&mut self, el: NodeId) -> Result<(), DecorationError> {
        let is_sense = ElementKind::of(&self.session().tree, el) == ElementKind::Sense;
        let was_labeled = is_sense && {
            let session = self.session();
            session
                .tree
                .attr(el, "xml:id")
                .and_then(|id| session.refmans.id_to_label(&RefmanRef::Sense, id))
                .is_some()
        };

        let label = self.allocate_label_for(el)?;

        if is_sense && !was_labeled && label.is_some() {
            let session = self.session_mut();
            let waiting: Vec<NodeId> = session
                .tree
                .data_descendants(el)
                .into_iter()
                .filter(|&n| {
                    ElementKind::of(&session.tree, n) == ElementKind::Subsense
                        && session.tree.id(n).is_some()
                        && session.refmans.get_subsense_label(&session.tree, n).is_none()
                })
                .collect();
            for subsense in waiting {
                session.scheduler.schedule(Task::Redecorate(subsense));
            }
        }
        Ok(())
    }

    /// Link text for an internal pointer: `[label]` for senses and
    /// subsenses, a positional sentence for examples
    fn ptr_decorator(&mut self, el: NodeId) -> Result<(), DecorationError> {
        let session = self.session_mut();
        session.tree.remove_children_by_class(el, "_linking_deco");
        let target_attr = session.tree.attr(el, "target").unwrap_or_default().to_string();

        let text = match session.refmans.resolve_target(&session.tree, el) {
            Ok(target) => match session.refmans.get_refman_for_element(&session.tree, target) {
                Ok(RefmanRef::Example) => {
                    if let Some(reference) = citation_ref(&session.tree, target) {
                        session.events.subscribe(reference, el);
                    }
                    session
                        .refmans
                        .examples()
                        .get_positional_label(&session.tree, el, target)?
                }
                Ok(refman) => {
                    let label = session
                        .tree
                        .attr(target, "xml:id")
                        .and_then(|id| session.refmans.id_to_label(&refman, id));
                    format!("[{}]", label.as_deref().unwrap_or(UNKNOWN_LABEL))
                }
                Err(RefmanError::MissingId(_)) => format!("[{UNKNOWN_LABEL}]"),
                Err(err) => return Err(err.into()),
            },
            Err(RefmanError::UnknownTarget(target)) => {
                warn!("pointer to unknown target {target}");
                format!("[{UNKNOWN_LABEL}]")
            }
            Err(err) => return Err(err.into()),
        };

        let link = session
            .tree
            .create_phantom_text("a", &["_linking_deco"], &text);
        if let Some(id) = internal_target(&target_attr) {
            session.tree.set_attr(link, "href", &format!("#BTW-{id}"));
        }
        let at = session.tree.leading_chrome_len(el);
        session.tree.insert_at(el, at, link);
        Ok(())
    }

    /// Bibliographic reference: a placeholder now, the abbreviation once
    /// the bibliography answers
    fn ref_decorator(&mut self, el: NodeId) -> Result<(), DecorationError> {
        let session = self.session_mut();
        session.tree.remove_children_by_class(el, "_ref_abbr");
        let abbr = session
            .tree
            .create_phantom_text("span", &["_ref_abbr"], PENDING_CITATION);
        let at = session.tree.leading_chrome_len(el);
        session.tree.insert_at(el, at, abbr);

        let target = session
            .tree
            .attr(el, "target")
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        match target {
            Some(target) => session.bibliography.request(&target, el),
            None => session.tree.set_text(abbr, MISSING_CITATION),
        }
        Ok(())
    }

    /// Semantic field reference rendered as a widget naming the field
    fn sf_decorator(&mut self, el: NodeId) -> Result<(), DecorationError> {
        let (_, end) = self.nodes_around_editable_contents(el);
        let session = self.session_mut();
        session.tree.remove_children_by_class(el, "_sf_widget");
        session.tree.remove_children_by_class(el, SF_POPOVER);
        let reference = session.tree.data_text(el).trim().to_string();
        let widget = session
            .tree
            .create_phantom_text("span", &["_sf_widget"], &reference);
        session.tree.set_attr(widget, "aria-haspopup", "dialog");
        session.tree.insert_before(el, widget, end);

        if reference.is_empty() {
            session.tree.set_text(widget, UNKNOWN_FIELD);
        } else {
            session.semantic_fields.request(&reference, el);
        }
        Ok(())
    }

    /// Bullet for citations of explained examples, spacing after references
    fn cit_decorator(&mut self, el: NodeId) -> Result<(), DecorationError> {
        let (_, end) = self.nodes_around_editable_contents(el);
        let session = self.session_mut();
        let tree = &mut session.tree;
        tree.remove_children_by_class(el, "_cit_bullet");
        tree.remove_children_by_class(el, "_ref_space");

        let in_explained = tree
            .data_parent(el)
            .is_some_and(|p| ElementKind::of(tree, p) == ElementKind::ExampleExplained);
        if in_explained {
            let bullet = tree.create_phantom_text("span", &["_cit_bullet"], "▶ ");
            tree.insert_data_child(el, 0, bullet, end);
        }

        for reference in children_of_kind(tree, el, ElementKind::Ref) {
            if let Some(holder) = tree.holder_in(el, reference) {
                let space = tree.create_phantom_text("span", &["_ref_space"], " ");
                tree.insert_after(holder, space);
            }
        }
        Ok(())
    }

    /// Visible marker for an empty `btw:none`
    fn none_decorator(&mut self, el: NodeId) -> Result<(), DecorationError> {
        let (_, end) = self.nodes_around_editable_contents(el);
        let tree = &mut self.session_mut().tree;
        tree.remove_children_by_class(el, "_none_glyph");
        if tree.data_children(el).is_empty() {
            let glyph = tree.create_phantom_text("span", &["_none_glyph"], "∅");
            tree.insert_data_child(el, 0, glyph, end);
        }
        Ok(())
    }

    /// Bullet under explained examples, `{sublabel}. ` under subsenses
    fn explanation_decorator(&mut self, el: NodeId) -> Result<(), DecorationError> {
        let (_, end) = self.nodes_around_editable_contents(el);
        let session = self.session_mut();
        let tree = &mut session.tree;
        tree.remove_children_by_class(el, "_explanation_bullet");
        tree.remove_children_by_class(el, "_explanation_number");

        let Some(parent) = tree.data_parent(el) else {
            return Ok(());
        };
        let marker = match ElementKind::of(tree, parent) {
            ElementKind::ExampleExplained => {
                tree.create_phantom_text("span", &["_explanation_bullet"], "▶ ")
            }
            ElementKind::Subsense => {
                let sublabel = session.refmans.get_subsense_sublabel(tree, parent);
                let text = format!("{}. ", sublabel.as_deref().unwrap_or(UNKNOWN_LABEL));
                tree.create_phantom_text("span", &["_explanation_number"], &text)
            }
            _ => return Ok(()),
        };
        tree.insert_data_child(el, 0, marker, end);
        Ok(())
    }

    /// Language class from `xml:lang`
    fn language_decorator(&mut self, el: NodeId) -> Result<(), DecorationError> {
        let tree = &mut self.session_mut().tree;
        tree.remove_classes_with_prefix(el, "_lang_");
        if let Some(lang) = tree.attr(el, "xml:lang") {
            let class = format!("_lang_{lang}");
            tree.add_class(el, &class);
        }
        Ok(())
    }

    /// Throw every sense and subsense label away and hand them out again in
    /// document order, then refresh everything that displays them
    fn relabel_all(&mut self) -> Result<(), DecorationError> {
        let session = self.session_mut();
        session.refmans.deallocate_all();
        let root = session.tree.root();
        let labeled: Vec<NodeId> = session
            .tree
            .data_descendants(root)
            .into_iter()
            .filter(|&n| {
                matches!(
                    ElementKind::of(&session.tree, n),
                    ElementKind::Sense | ElementKind::Subsense
                )
            })
            .collect();
        debug!("relabeling {} sense(s) and subsense(s)", labeled.len());

        for &el in &labeled {
            self.allocate_label_for(el)?;
        }

        for &el in &labeled {
            let Session {
                tree,
                refmans,
                headings,
                ..
            } = self.session_mut();
            if ElementKind::of(tree, el) == ElementKind::Sense {
                headings.update_headings_for_sense(tree, refmans, el)?;
            } else {
                headings.update_headings_for_subsense(tree, refmans, el)?;
                for explanation in children_of_kind(tree, el, ElementKind::Explanation) {
                    self.explanation_decorator(explanation)?;
                }
            }
        }

        self.refresh_links()
    }

    /// Re-render every internal pointer
    fn refresh_links(&mut self) -> Result<(), DecorationError> {
        let tree = &self.session().tree;
        let pointers: Vec<NodeId> = tree
            .data_descendants(tree.root())
            .into_iter()
            .filter(|&n| {
                matches!(ElementKind::of(tree, n), ElementKind::Ptr | ElementKind::Ref)
                    && tree.attr(n, "target").and_then(internal_target).is_some()
            })
            .collect();
        for pointer in pointers {
            self.ptr_decorator(pointer)?;
        }
        Ok(())
    }

    /// Queue a redecoration of everything subscribed to `source`
    fn refresh_dependents(&mut self, source: NodeId) {
        wake_dependents(self.session_mut(), source);
    }

    /// Run queued tasks and deliver fetch completions until nothing is left
    fn run_pending(&mut self) -> Result<(), DecorationError> {
        loop {
            if let Some(task) = self.session_mut().scheduler.pop() {
                self.run_task(task)?;
                continue;
            }

            let session = self.session_mut();
            let citations = session.bibliography.flush();
            let fields = session.semantic_fields.flush();
            if citations.is_empty() && fields.is_empty() {
                return Ok(());
            }
            for completion in citations {
                complete_citation(self.session_mut(), completion);
            }
            for completion in fields {
                complete_semantic_field(self.session_mut(), completion);
            }
        }
    }

    fn run_task(&mut self, task: Task) -> Result<(), DecorationError> {
        match task {
            Task::Redecorate(node) | Task::RefreshAbsences(node)
                if !self.session().tree.is_live(node) =>
            {
                debug!("skipping {task:?} for removed node");
                Ok(())
            }
            Task::Redecorate(node) => self.dispatch(node),
            Task::RefreshAbsences(node) => self.refresh_visible_absences(node),
            Task::Relabel => self.relabel_all(),
        }
    }
}

/// Data element children of `el` with the given kind
pub fn children_of_kind(tree: &Tree, el: NodeId, kind: ElementKind) -> Vec<NodeId> {
    tree.data_element_children(el)
        .into_iter()
        .filter(|&c| ElementKind::of(tree, c) == kind)
        .collect()
}

/// Show the fetched abbreviation and wake pointers describing the example
fn complete_citation(session: &mut Session, completion: Completion<BiblItem>) {
    let el = completion.waiter;
    if !session.tree.is_live(el) {
        return;
    }
    let text = completion
        .record
        .map(|item| item.citation_text())
        .unwrap_or_else(|| MISSING_CITATION.to_string());
    if let Some(abbr) = session.tree.first_child_by_class(el, "_ref_abbr") {
        session.tree.set_text(abbr, &text);
    }
    wake_dependents(session, el);
}

fn complete_semantic_field(session: &mut Session, completion: Completion<SemanticFieldRecord>) {
    let el = completion.waiter;
    if !session.tree.is_live(el) {
        return;
    }
    let Some(widget) = session.tree.first_child_by_class(el, "_sf_widget") else {
        return;
    };
    match completion.record {
        Some(record) => {
            session.tree.set_text(widget, &record.heading);
            session.tree.set_attr(widget, "path", &record.path);
            let popover = build_sf_popover(&mut session.tree, &record);
            session.tree.insert_after(widget, popover);
        }
        None => session.tree.set_text(widget, UNKNOWN_FIELD),
    }
    wake_dependents(session, el);
}

/// Details shown when a semantic-field widget is activated
fn build_sf_popover(tree: &mut Tree, record: &SemanticFieldRecord) -> NodeId {
    let popover = tree.create_phantom("div", &[SF_POPOVER]);
    let heading = tree.create_phantom_text("div", &["_sf_heading"], &record.heading);
    tree.append_child(popover, heading);
    if !record.path.is_empty() {
        let path = tree.create_phantom_text("div", &["_sf_path"], &record.path);
        tree.append_child(popover, path);
    }
    for (name, value) in &record.fields {
        let field = tree.create_phantom_text("div", &["_sf_field"], &format!("{name}: {value}"));
        tree.append_child(popover, field);
    }
    if !record.tree.is_empty() {
        let changes = tree.create_phantom("ul", &["_sf_changes"]);
        for change in &record.tree {
            let item = tree.create_phantom("li", &["_sf_change"]);
            let link = tree.create_phantom_text("a", &[], &change.lemma);
            if !change.url.is_empty() {
                tree.set_attr(link, "href", &change.url);
            }
            tree.append_child(item, link);
            if !change.datetime.is_empty() {
                tree.set_attr(item, "datetime", &change.datetime);
            }
            if !change.published {
                tree.add_class(item, "_unpublished");
            }
            tree.append_child(changes, item);
        }
        tree.append_child(popover, changes);
    }
    popover
}

fn wake_dependents(session: &mut Session, source: NodeId) {
    for dependent in session.events.publish(source) {
        session.scheduler.schedule(Task::Redecorate(dependent));
    }
}
