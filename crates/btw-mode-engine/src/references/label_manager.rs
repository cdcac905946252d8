/// Highest number of sense labels a document can carry (`a` to `z`)
pub const SENSE_LABEL_LIMIT: usize = 26;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LabelError {
    #[error("too many senses: at most {limit} can be labeled")]
    HardLimit { limit: usize },
}

/// Maps persisted entity ids to rendered labels.
///
/// Labels are positional: they are handed out in call order and only
/// reflect document order when a full walk follows [`deallocate_all`].
///
/// [`deallocate_all`]: LabelManager::deallocate_all
pub trait LabelManager {
    fn name(&self) -> &str;

    /// Label for `id`, allocating one on first call. Repeated calls return the
    /// same label until [`LabelManager::deallocate_all`].
    fn allocate_label(&mut self, id: &str) -> Result<String, LabelError>;

    /// Pure lookup, never allocates
    fn id_to_label(&self, id: &str) -> Option<String>;

    /// Rendering of the label suited for headings
    fn id_to_label_for_head(&self, id: &str) -> Option<String> {
        self.id_to_label(id)
    }

    fn deallocate_all(&mut self);
}
