//! Editing host: chrome around every element, insertion controls, and the
//! entry points an editor calls when the document changes.

use log::{debug, info};

use crate::decorating::absences::{CONTROL_CLASS, VisibleAbsences};
use crate::decorating::dispatch::DispatchCapable;
use crate::decorating::heading::{HeadingDecorator, collapse_wrapper};
use crate::decorating::scheduler::Task;
use crate::error::DecorationError;
use crate::fetch::Sources;
use crate::kind::ElementKind;
use crate::session::Session;
use crate::tree::{NodeId, Tree};
use crate::validation::Validator;

pub struct EditingDecorator {
    session: Session,
    validator: Box<dyn Validator>,
    absences: VisibleAbsences,
    dirty: bool,
}

impl EditingDecorator {
    pub fn new(tree: Tree, sources: Sources, validator: Box<dyn Validator>) -> Self {
        Self {
            session: Session::new(tree, sources, HeadingDecorator::editing()),
            validator,
            absences: VisibleAbsences::btw(),
            dirty: false,
        }
    }

    pub fn with_absences(mut self, absences: VisibleAbsences) -> Self {
        self.absences = absences;
        self
    }

    pub fn tree(&self) -> &Tree {
        &self.session.tree
    }

    pub fn headings_mut(&mut self) -> &mut HeadingDecorator {
        &mut self.session.headings
    }

    /// Whether the data view changed since loading
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Decorate the whole document once
    pub fn start_listening(&mut self) -> Result<(), DecorationError> {
        let root = self.session.tree.root();
        info!("decorating document");
        self.decorate_subtree(root)?;
        self.refresh_links()?;
        self.run_pending()
    }

    /// A subtree was added to the document
    pub fn included(&mut self, node: NodeId) -> Result<(), DecorationError> {
        self.decorate_subtree(node)?;
        if affects_labels(&self.session.tree, node) {
            self.session.scheduler.schedule(Task::Relabel);
        }
        if let Some(parent) = self.session.tree.data_parent(node) {
            self.session.scheduler.schedule(Task::Redecorate(parent));
        }
        self.run_pending()
    }

    /// Insert a minimal `name` element as data child `index` of `parent`
    pub fn insert_element(
        &mut self,
        parent: NodeId,
        index: usize,
        name: &str,
    ) -> Result<NodeId, DecorationError> {
        let child = self.validator.instantiate(&mut self.session.tree, name);
        let (_, end) = self.nodes_around_editable_contents(parent);
        self.session.tree.insert_data_child(parent, index, child, end);
        self.dirty = true;
        debug!("inserted <{name}> at {index}");
        self.included(child)?;
        Ok(child)
    }

    /// Remove a data element, together with the collapse wrapper around it
    pub fn remove_node(&mut self, node: NodeId) -> Result<(), DecorationError> {
        let tree = &self.session.tree;
        if !tree.is_live(node) || node == tree.root() {
            return Ok(());
        }
        let parent = tree.data_parent(node);
        let relabel = affects_labels(tree, node);
        let doomed = collapse_wrapper(tree, node).unwrap_or(node);

        for n in tree.descendants(doomed) {
            for dependent in self.session.events.publish(n) {
                self.session.scheduler.schedule(Task::Redecorate(dependent));
            }
            self.session.events.forget(n);
        }
        self.session.tree.remove(doomed);
        self.dirty = true;

        if relabel {
            self.session.scheduler.schedule(Task::Relabel);
        }
        if let Some(parent) = parent {
            self.session.scheduler.schedule(Task::Redecorate(parent));
        }
        self.run_pending()
    }

    /// Children of `el` were edited in place
    pub fn children_changed(&mut self, el: NodeId) -> Result<(), DecorationError> {
        let relabel = self
            .session
            .tree
            .data_element_children(el)
            .into_iter()
            .any(|c| affects_labels(&self.session.tree, c));
        if relabel {
            self.session.scheduler.schedule(Task::Relabel);
        }
        self.session.scheduler.schedule(Task::Redecorate(el));
        self.run_pending()
    }

    /// Point a `ptr` or `ref` somewhere else
    pub fn set_ref_target(&mut self, el: NodeId, target: &str) -> Result<(), DecorationError> {
        self.session.tree.set_attr(el, "target", target);
        self.session.events.unsubscribe_dependent(el);
        self.dirty = true;
        self.session.scheduler.schedule(Task::Redecorate(el));
        self.refresh_dependents(el);
        self.run_pending()
    }

    /// Run action `action` of an insertion control
    pub fn activate(&mut self, control: NodeId, action: usize) -> Result<NodeId, DecorationError> {
        let tree = &self.session.tree;
        if !tree.has_class(control, CONTROL_CLASS) {
            return Err(DecorationError::InvalidControl(control));
        }
        let parent = tree
            .data_parent(control)
            .ok_or(DecorationError::InvalidControl(control))?;
        let index: usize = tree
            .attr(control, "index")
            .and_then(|i| i.parse().ok())
            .ok_or(DecorationError::InvalidControl(control))?;
        let name = tree
            .attr(control, "actions")
            .and_then(|a| a.split('|').nth(action))
            .ok_or(DecorationError::UnknownAction {
                control,
                index: action,
            })?
            .to_string();
        self.insert_element(parent, index, &name)
    }

    /// Insertion controls currently offered by `el`
    pub fn affordances(&self, el: NodeId) -> Vec<NodeId> {
        self.session.tree.children_by_class(el, CONTROL_CLASS)
    }
}

/// Does the subtree hold anything labels or positional links depend on?
fn affects_labels(tree: &Tree, node: NodeId) -> bool {
    tree.data_descendants(node).into_iter().any(|n| {
        matches!(
            ElementKind::of(tree, n),
            ElementKind::Sense
                | ElementKind::Subsense
                | ElementKind::Example
                | ElementKind::ExampleExplained
        )
    })
}

impl DispatchCapable for EditingDecorator {
    fn session(&self) -> &Session {
        &self.session
    }

    fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    fn to_data_node(&self, node: NodeId) -> Option<NodeId> {
        let tree = &self.session.tree;
        if tree.is_data(node) {
            Some(node)
        } else {
            tree.data_parent(node)
        }
    }

    fn nodes_around_editable_contents(&self, el: NodeId) -> (Option<NodeId>, Option<NodeId>) {
        let tree = &self.session.tree;
        (
            tree.first_child_by_class(el, "_start_wrapper"),
            tree.children_by_class(el, "_end_wrapper").last().copied(),
        )
    }

    /// Start and end labels around the element's contents
    fn element_decorator(&mut self, el: NodeId) -> Result<(), DecorationError> {
        let tree = &mut self.session.tree;
        tree.remove_children_by_class(el, "_start_wrapper");
        tree.remove_children_by_class(el, "_end_wrapper");

        let name = tree.name(el).unwrap_or_default().to_string();
        let start = tree.create_phantom_text("span", &["_gui", "_start_wrapper", "_label"], &name);
        let end = tree.create_phantom_text("span", &["_gui", "_end_wrapper", "_label"], &name);
        tree.insert_at(el, 0, start);
        tree.append_child(el, end);
        Ok(())
    }

    fn persist_xml_id(&mut self, el: NodeId, id: &str) {
        self.session.tree.set_attr(el, "xml:id", id);
        self.dirty = true;
    }

    fn refresh_visible_absences(&mut self, el: NodeId) -> Result<(), DecorationError> {
        let (_, end) = self.nodes_around_editable_contents(el);
        self.absences
            .refresh(&mut self.session.tree, self.validator.as_ref(), el, end)?;
        Ok(())
    }
}
