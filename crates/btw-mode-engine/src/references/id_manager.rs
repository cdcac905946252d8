use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("id {id} does not start with prefix {prefix}")]
    Format { id: String, prefix: String },
    #[error("id {0} has already been seen")]
    Duplicate(String),
}

/// Mints `prefix + n` identifiers and remembers every id it has handed out
/// or been told about. Ids are never released.
#[derive(Debug, Clone)]
pub struct IdManager {
    prefix: String,
    next: usize,
    ids: HashSet<String>,
}

impl IdManager {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            next: 0,
            ids: HashSet::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn generate(&mut self) -> String {
        loop {
            let id = format!("{}{}", self.prefix, self.next);
            self.next += 1;
            if self.ids.insert(id.clone()) {
                return id;
            }
        }
    }

    /// Register an id that came from outside (usually a loaded document)
    pub fn seen(&mut self, id: &str, fail_on_duplicate: bool) -> Result<(), IdError> {
        if !id.starts_with(&self.prefix) {
            return Err(IdError::Format {
                id: id.to_string(),
                prefix: self.prefix.clone(),
            });
        }
        if !self.ids.insert(id.to_string()) && fail_on_duplicate {
            return Err(IdError::Duplicate(id.to_string()));
        }
        Ok(())
    }
}
