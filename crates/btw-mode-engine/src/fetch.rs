//! Bibliographic and semantic-field lookups.
//!
//! Decoration never waits on a lookup. It queues a request naming the node
//! that wants the answer; the session later flushes the fetcher, which
//! resolves every reference still in flight in one batch and hands back a
//! completion per waiting node. Each reference is resolved at most once per
//! fetcher; later requests complete from the cache.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::io::{self, IoError};
use crate::tree::NodeId;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error(transparent)]
    Io(#[from] IoError),
    #[error("reference source unavailable: {0}")]
    Unavailable(String),
}

/// Where records come from. Unknown references are simply absent from the
/// returned map.
pub trait ReferenceSource {
    type Record;

    fn resolve(
        &mut self,
        references: &[String],
    ) -> Result<HashMap<String, Self::Record>, FetchError>;
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BiblItem {
    pub title: String,
    #[serde(default)]
    pub date: String,
    /// `Surname, Given; Surname, Given`
    #[serde(default)]
    pub creators: String,
    #[serde(default)]
    pub abbreviation: Option<String>,
    #[serde(default)]
    pub reference_title: Option<String>,
}

impl BiblItem {
    /// Short citation: the abbreviation, else `{first surname} {date}`
    pub fn citation_text(&self) -> String {
        if let Some(abbr) = self
            .abbreviation
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
        {
            return abbr.to_string();
        }
        let surname = self
            .creators
            .split(';')
            .next()
            .and_then(|c| c.split(',').next())
            .map(str::trim)
            .unwrap_or_default();
        let date = self.date.trim();
        match (surname.is_empty(), date.is_empty()) {
            (false, false) => format!("{surname} {date}"),
            (false, true) => surname.to_string(),
            _ => self
                .reference_title
                .clone()
                .unwrap_or_else(|| self.title.clone()),
        }
    }
}

/// One article revision touching a semantic field
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub lemma: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub datetime: String,
    #[serde(default)]
    pub published: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SemanticFieldRecord {
    pub heading: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub tree: Vec<ChangeRecord>,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

/// In-memory records, mostly for tests and embedding
#[derive(Debug, Default)]
pub struct MemorySource<R> {
    records: HashMap<String, R>,
}

impl<R> MemorySource<R> {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    pub fn with(mut self, reference: &str, record: R) -> Self {
        self.records.insert(reference.to_string(), record);
        self
    }
}

impl<R: Clone> ReferenceSource for MemorySource<R> {
    type Record = R;

    fn resolve(&mut self, references: &[String]) -> Result<HashMap<String, R>, FetchError> {
        Ok(references
            .iter()
            .filter_map(|r| self.records.get(r).map(|rec| (r.clone(), rec.clone())))
            .collect())
    }
}

/// JSON object file `{ "<reference>": record }`, read on first use
#[derive(Debug)]
pub struct JsonFileSource<R> {
    path: PathBuf,
    records: Option<HashMap<String, R>>,
}

impl<R> JsonFileSource<R> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: None,
        }
    }
}

impl<R: Clone + DeserializeOwned> ReferenceSource for JsonFileSource<R> {
    type Record = R;

    fn resolve(&mut self, references: &[String]) -> Result<HashMap<String, R>, FetchError> {
        if self.records.is_none() {
            self.records = Some(io::load_records(&self.path)?);
        }
        let records = self.records.get_or_insert_with(HashMap::new);
        Ok(references
            .iter()
            .filter_map(|r| records.get(r).map(|rec| (r.clone(), rec.clone())))
            .collect())
    }
}

enum Entry<R> {
    InFlight,
    Resolved(Option<R>),
}

/// Answer for one waiting node; `record` is `None` when the reference could
/// not be resolved
#[derive(Debug, Clone, PartialEq)]
pub struct Completion<R> {
    pub waiter: NodeId,
    pub reference: String,
    pub record: Option<R>,
}

pub struct CachingFetcher<R> {
    name: &'static str,
    source: Box<dyn ReferenceSource<Record = R>>,
    cache: HashMap<String, Entry<R>>,
    waiters: Vec<(String, NodeId)>,
    resolve_calls: usize,
}

impl<R: Clone> CachingFetcher<R> {
    pub fn new(name: &'static str, source: Box<dyn ReferenceSource<Record = R>>) -> Self {
        Self {
            name,
            source,
            cache: HashMap::new(),
            waiters: Vec::new(),
            resolve_calls: 0,
        }
    }

    pub fn request(&mut self, reference: &str, waiter: NodeId) {
        if !self
            .waiters
            .iter()
            .any(|(r, w)| r == reference && *w == waiter)
        {
            self.waiters.push((reference.to_string(), waiter));
        }
        self.cache
            .entry(reference.to_string())
            .or_insert(Entry::InFlight);
    }

    pub fn is_idle(&self) -> bool {
        self.waiters.is_empty()
    }

    /// How many batched resolves went to the source
    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls
    }

    pub fn flush(&mut self) -> Vec<Completion<R>> {
        let mut pending: Vec<String> = self
            .cache
            .iter()
            .filter(|(_, entry)| matches!(entry, Entry::InFlight))
            .map(|(reference, _)| reference.clone())
            .collect();
        pending.sort();

        if !pending.is_empty() {
            self.resolve_calls += 1;
            debug!("{}: resolving {} reference(s)", self.name, pending.len());
            match self.source.resolve(&pending) {
                Ok(mut found) => {
                    for reference in pending {
                        let record = found.remove(&reference);
                        if record.is_none() {
                            warn!("{}: no record for {reference}", self.name);
                        }
                        self.cache.insert(reference, Entry::Resolved(record));
                    }
                }
                Err(err) => {
                    warn!("{}: fetch failed: {err}", self.name);
                    for reference in pending {
                        self.cache.insert(reference, Entry::Resolved(None));
                    }
                }
            }
        }

        std::mem::take(&mut self.waiters)
            .into_iter()
            .map(|(reference, waiter)| {
                let record = match self.cache.get(&reference) {
                    Some(Entry::Resolved(record)) => record.clone(),
                    _ => None,
                };
                Completion {
                    waiter,
                    reference,
                    record,
                }
            })
            .collect()
    }
}

/// Record sources handed to a new session
pub struct Sources {
    pub bibliography: Box<dyn ReferenceSource<Record = BiblItem>>,
    pub semantic_fields: Box<dyn ReferenceSource<Record = SemanticFieldRecord>>,
}

impl Default for Sources {
    fn default() -> Self {
        Self {
            bibliography: Box::new(MemorySource::new()),
            semantic_fields: Box::new(MemorySource::new()),
        }
    }
}
