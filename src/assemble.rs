//! Collection of the computed indices for one model cycle

use crate::field::{Field, FieldList};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::warn;

/// The index fields of one run, each tagged with the job id
#[derive(Debug, Clone)]
pub struct IndexCollection {
    job: String,
    cycle: String,
    fields: FieldList,
}

impl IndexCollection {
    pub fn new(job: impl Into<String>, cycle: impl Into<String>) -> Self {
        Self {
            job: job.into(),
            cycle: cycle.into(),
            fields: FieldList::new(),
        }
    }

    pub fn job(&self) -> &str {
        &self.job
    }

    pub fn cycle(&self) -> &str {
        &self.cycle
    }

    /// Adds an index, setting its `job` provenance
    pub fn push(&mut self, mut field: Field) {
        field.properties.set("job", self.job.as_str());
        self.fields.push(field);
    }

    pub fn extend(&mut self, fields: impl IntoIterator<Item = Field>) {
        for field in fields {
            self.push(field);
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// `index_<job>_<cycle>.nc` under `dir`
    pub fn output_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("index_{}_{}.nc", self.job, self.cycle))
    }

    /// The fields sorted by identity
    ///
    /// Sorting makes the output independent of the order indices were
    /// computed in. Duplicate identities are reported, not resolved.
    pub fn finish(mut self) -> FieldList {
        self.fields.sort_by_key(Field::identity);
        let mut seen = BTreeSet::new();
        for field in &self.fields {
            let identity = field.identity();
            if !seen.insert(identity.clone()) {
                warn!("Duplicate index identity '{identity}' in output collection");
            }
        }
        self.fields
    }
}
