use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use docdex_core::error::{Error, Result};

/// JSON-backed alias store: alias name -> concrete index name.
///
/// The swap is a whole-file write to a sibling temp path followed by a
/// rename, so a reader resolving an alias sees either the old or the new
/// target, never a partial state. This is the single atomic visibility
/// point for schema migration.
pub struct AliasStore {
    path: PathBuf,
}

impl AliasStore {
    pub fn new(path: PathBuf) -> Self {
        AliasStore { path }
    }

    pub fn load(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = fs::read_to_string(&self.path)
            .map_err(|e| Error::Transient { reason: format!("reading alias store: {}", e) })?;
        serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("alias store is corrupt: {}", e).into())
    }

    pub fn get(&self, alias: &str) -> Result<Option<String>> {
        Ok(self.load()?.get(alias).cloned())
    }

    pub fn set(&self, alias: &str, index: &str) -> Result<()> {
        let mut aliases = self.load()?;
        aliases.insert(alias.to_string(), index.to_string());
        let raw = serde_json::to_string_pretty(&aliases)
            .map_err(|e| anyhow::anyhow!("serializing alias store: {}", e))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw)
            .map_err(|e| Error::Transient { reason: format!("writing alias store: {}", e) })?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| Error::Transient { reason: format!("swapping alias store: {}", e) })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = AliasStore::new(dir.path().join("aliases.json"));
        assert!(store.get("documents").expect("get").is_none());
        store.set("documents", "documents-g000001").expect("set");
        assert_eq!(
            store.get("documents").expect("get").as_deref(),
            Some("documents-g000001")
        );
        store.set("documents", "documents-g000002").expect("swap");
        assert_eq!(
            store.get("documents").expect("get").as_deref(),
            Some("documents-g000002")
        );
    }
}
