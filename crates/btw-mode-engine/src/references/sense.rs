use std::collections::HashMap;

use super::label_manager::{LabelError, LabelManager, SENSE_LABEL_LIMIT};
use super::subsense::SubsenseReferenceManager;

/// Letters `a..z` for senses, in allocation order. Each labeled sense owns
/// the manager numbering its subsenses.
#[derive(Debug, Default)]
pub struct SenseReferenceManager {
    labels: HashMap<String, String>,
    next: usize,
    subsenses: HashMap<String, SubsenseReferenceManager>,
}

impl SenseReferenceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subsense manager of a sense; exists once the sense has been labeled
    pub fn subsense_manager(&self, sense_id: &str) -> Option<&SubsenseReferenceManager> {
        self.subsenses.get(sense_id)
    }

    pub fn subsense_manager_mut(&mut self, sense_id: &str) -> Option<&mut SubsenseReferenceManager> {
        self.subsenses.get_mut(sense_id)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl LabelManager for SenseReferenceManager {
    fn name(&self) -> &str {
        "sense"
    }

    fn allocate_label(&mut self, id: &str) -> Result<String, LabelError> {
        if let Some(label) = self.labels.get(id) {
            return Ok(label.clone());
        }
        if self.next >= SENSE_LABEL_LIMIT {
            return Err(LabelError::HardLimit {
                limit: SENSE_LABEL_LIMIT,
            });
        }
        let label = char::from(b'a' + self.next as u8).to_string();
        self.next += 1;
        self.labels.insert(id.to_string(), label.clone());
        self.subsenses
            .insert(id.to_string(), SubsenseReferenceManager::new(id, &label));
        Ok(label)
    }

    fn id_to_label(&self, id: &str) -> Option<String> {
        self.labels.get(id).cloned()
    }

    fn id_to_label_for_head(&self, id: &str) -> Option<String> {
        self.id_to_label(id).map(|l| l.to_uppercase())
    }

    fn deallocate_all(&mut self) {
        self.labels.clear();
        self.next = 0;
        self.subsenses.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letters_in_allocation_order() {
        let mut senses = SenseReferenceManager::new();
        let labels: Vec<String> = (0..26)
            .map(|i| senses.allocate_label(&format!("S.{i}")).unwrap())
            .collect();
        let expected: Vec<String> = ('a'..='z').map(|c| c.to_string()).collect();
        assert_eq!(labels, expected);
    }

    #[test]
    fn test_twenty_seventh_sense_hits_the_limit() {
        let mut senses = SenseReferenceManager::new();
        for i in 0..26 {
            senses.allocate_label(&format!("S.{i}")).unwrap();
        }
        assert_eq!(
            senses.allocate_label("S.26"),
            Err(LabelError::HardLimit { limit: 26 })
        );
        // Already-labeled ids still resolve
        assert_eq!(senses.allocate_label("S.25").unwrap(), "z");
    }

    #[test]
    fn test_allocation_is_idempotent() {
        let mut senses = SenseReferenceManager::new();
        assert_eq!(senses.allocate_label("S.7").unwrap(), "a");
        assert_eq!(senses.allocate_label("S.7").unwrap(), "a");
        assert_eq!(senses.allocate_label("S.3").unwrap(), "b");
    }

    #[test]
    fn test_lookup_does_not_allocate() {
        let mut senses = SenseReferenceManager::new();
        assert_eq!(senses.id_to_label("S.0"), None);
        assert_eq!(senses.allocate_label("S.1").unwrap(), "a");
        assert_eq!(senses.id_to_label_for_head("S.1").as_deref(), Some("A"));
    }

    #[test]
    fn test_subsense_manager_created_on_first_allocation() {
        let mut senses = SenseReferenceManager::new();
        assert!(senses.subsense_manager("S.0").is_none());
        senses.allocate_label("S.0").unwrap();
        assert_eq!(
            senses.subsense_manager("S.0").map(|m| m.parent_label()),
            Some("a")
        );
    }

    #[test]
    fn test_deallocate_all_resets_everything() {
        let mut senses = SenseReferenceManager::new();
        senses.allocate_label("S.0").unwrap();
        senses.allocate_label("S.1").unwrap();
        senses.deallocate_all();

        assert!(senses.is_empty());
        assert!(senses.subsense_manager("S.0").is_none());
        assert_eq!(senses.allocate_label("S.1").unwrap(), "a");
    }
}
