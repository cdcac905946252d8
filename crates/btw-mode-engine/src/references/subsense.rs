use std::collections::HashMap;

use super::label_manager::{LabelError, LabelManager};

/// Numbers the subsenses of one sense from 1, in allocation order
#[derive(Debug)]
pub struct SubsenseReferenceManager {
    parent_id: String,
    parent_label: String,
    labels: HashMap<String, usize>,
    next: usize,
}

impl SubsenseReferenceManager {
    pub fn new(parent_id: &str, parent_label: &str) -> Self {
        Self {
            parent_id: parent_id.to_string(),
            parent_label: parent_label.to_string(),
            labels: HashMap::new(),
            next: 1,
        }
    }

    pub fn parent_id(&self) -> &str {
        &self.parent_id
    }

    pub fn parent_label(&self) -> &str {
        &self.parent_label
    }

    /// The numeral alone, for headings nested under the sense heading
    pub fn id_to_sublabel(&self, id: &str) -> Option<String> {
        self.labels.get(id).map(|n| n.to_string())
    }
}

impl LabelManager for SubsenseReferenceManager {
    fn name(&self) -> &str {
        "subsense"
    }

    fn allocate_label(&mut self, id: &str) -> Result<String, LabelError> {
        if !self.labels.contains_key(id) {
            self.labels.insert(id.to_string(), self.next);
            self.next += 1;
        }
        Ok(self.id_to_label(id).unwrap_or_default())
    }

    fn id_to_label(&self, id: &str) -> Option<String> {
        self.id_to_sublabel(id)
            .map(|sub| format!("{}{}", self.parent_label, sub))
    }

    fn deallocate_all(&mut self) {
        self.labels.clear();
        self.next = 1;
    }
}
