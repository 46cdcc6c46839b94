//! Adapted template persistence
//!
//! The learned templates of a session are written with bincode. Loading
//! replaces the current adapted store and rebuilds the pruner cutoffs of
//! the loaded classes from the pre-trained templates.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::pipeline::AdaptiveClassifier;
use crate::templates::AdaptedTemplateStore;
use crate::{ClassifyError, ClassifyResult};

/// Bumped whenever the serialized layout changes
const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct TemplatesRef<'a> {
    version: u32,
    store: &'a AdaptedTemplateStore,
}

#[derive(Deserialize)]
struct TemplatesOwned {
    version: u32,
    store: AdaptedTemplateStore,
}

impl AdaptiveClassifier {
    /// Serializes the adapted templates
    pub fn persist_templates(&self) -> ClassifyResult<Vec<u8>> {
        Ok(bincode::serialize(&self.templates_ref())?)
    }

    /// Replaces the adapted templates with previously persisted ones
    pub fn load_templates(&mut self, bytes: &[u8]) -> ClassifyResult<()> {
        let loaded: TemplatesOwned = bincode::deserialize(bytes)?;
        self.install(loaded)
    }

    /// Writes the adapted templates to `path`, replacing it atomically
    pub fn save_templates_to(&self, path: &Path) -> ClassifyResult<()> {
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;

        let temp_file = NamedTempFile::new_in(parent)?;
        let mut writer = BufWriter::new(&temp_file);
        bincode::serialize_into(&mut writer, &self.templates_ref())?;
        writer.flush()?;
        drop(writer);
        temp_file.persist(path).map_err(|e| e.error)?;
        tracing::debug!(path = %path.display(), "saved adapted templates");
        Ok(())
    }

    /// Reads adapted templates written by [`Self::save_templates_to`]
    pub fn load_templates_from(&mut self, path: &Path) -> ClassifyResult<()> {
        let reader = BufReader::new(File::open(path)?);
        let loaded: TemplatesOwned = bincode::deserialize_from(reader)?;
        self.install(loaded)?;
        tracing::debug!(path = %path.display(), "loaded adapted templates");
        Ok(())
    }

    fn templates_ref(&self) -> TemplatesRef<'_> {
        TemplatesRef {
            version: FORMAT_VERSION,
            store: &self.adapted,
        }
    }

    fn install(&mut self, loaded: TemplatesOwned) -> ClassifyResult<()> {
        if loaded.version != FORMAT_VERSION {
            return Err(ClassifyError::InvalidParameter(format!(
                "unsupported template format version {}",
                loaded.version
            )));
        }
        let store = loaded.store;
        store.validate(self.classes.len())?;
        self.baseline_cutoffs = self
            .classes
            .ids()
            .map(|id| match &self.pretrained {
                Some(pretrained) if !store.is_empty_class(id) => pretrained.cutoff(id),
                _ => 0,
            })
            .collect();
        self.adapted = store;
        Ok(())
    }
}
