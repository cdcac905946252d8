//! Per-document state shared by every decoration routine.

use log::{debug, error};

use crate::decorating::events::EventBus;
use crate::decorating::heading::HeadingDecorator;
use crate::decorating::scheduler::Scheduler;
use crate::fetch::{BiblItem, CachingFetcher, SemanticFieldRecord, Sources};
use crate::kind::ElementKind;
use crate::references::{IdManager, WholeDocumentManager};
use crate::tree::Tree;

/// Prefix of generated sense and subsense ids
pub const SENSE_ID_PREFIX: &str = "S.";
/// Prefix of generated example ids
pub const EXAMPLE_ID_PREFIX: &str = "E.";

/// One open document: the tree, its reference managers and the pending
/// asynchronous work. Nothing here is global; two sessions never share state.
pub struct Session {
    pub tree: Tree,
    pub refmans: WholeDocumentManager,
    pub headings: HeadingDecorator,
    pub sense_ids: IdManager,
    pub example_ids: IdManager,
    pub events: EventBus,
    pub scheduler: Scheduler,
    pub bibliography: CachingFetcher<BiblItem>,
    pub semantic_fields: CachingFetcher<SemanticFieldRecord>,
}

impl Session {
    pub fn new(tree: Tree, sources: Sources, headings: HeadingDecorator) -> Self {
        let mut session = Self {
            tree,
            refmans: WholeDocumentManager::new(),
            headings,
            sense_ids: IdManager::new(SENSE_ID_PREFIX),
            example_ids: IdManager::new(EXAMPLE_ID_PREFIX),
            events: EventBus::new(),
            scheduler: Scheduler::new(),
            bibliography: CachingFetcher::new("bibliography", sources.bibliography),
            semantic_fields: CachingFetcher::new("semantic-fields", sources.semantic_fields),
        };
        session.register_existing_ids();
        session
    }

    /// Tell the id managers about ids already in the document so generated
    /// ones never collide with them
    fn register_existing_ids(&mut self) {
        let mut registered = 0;
        for el in self.tree.data_descendants(self.tree.root()) {
            let Some(id) = self.tree.attr(el, "xml:id") else {
                continue;
            };
            let kind = ElementKind::of(&self.tree, el);
            let result = match kind {
                ElementKind::Sense | ElementKind::Subsense => self.sense_ids.seen(id, true),
                ElementKind::Example | ElementKind::ExampleExplained => {
                    self.example_ids.seen(id, true)
                }
                _ => continue,
            };
            match result {
                Ok(()) => registered += 1,
                Err(err) => error!("<{}>: {err}", kind.name()),
            }
        }
        debug!("registered {registered} existing id(s)");
    }
}
