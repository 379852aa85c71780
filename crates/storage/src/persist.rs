//! Store image persistence
//!
//! The whole chronicle store (identifiers, path origins, schemas,
//! chronologies) is written as one MessagePack image:
//!
//! ```text
//! magic "TSIM" | format version (u32 LE) | rmp payload
//! ```
//!
//! Written atomically via temp + fsync + rename. The search index is never
//! persisted; it is rebuilt from the loaded store.

use crate::identifiers::IdentifierService;
use crate::paths::PathRegistry;
use crate::store::ChronicleStore;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use termstore_core::{Chronology, DynamicSchema, Error, Nid, Result, StampPosition};
use tracing::info;
use uuid::Uuid;

/// Magic bytes for store images
const IMAGE_MAGIC: &[u8; 4] = b"TSIM";
/// Current image format
const IMAGE_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct StoreImage {
    next_nid: i32,
    bindings: Vec<(Nid, Vec<Uuid>)>,
    origins: Vec<(Nid, Vec<StampPosition>)>,
    schemas: Vec<DynamicSchema>,
    chronologies: Vec<Chronology>,
}

impl ChronicleStore {
    /// Write the store to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut chronologies: Vec<Chronology> = self
            .chronologies
            .iter()
            .map(|e| e.value().clone())
            .collect();
        chronologies.sort_by_key(|c| c.nid());
        let mut schemas: Vec<DynamicSchema> =
            self.schemas.iter().map(|e| e.value().clone()).collect();
        schemas.sort_by_key(|s| s.assemblage());

        let image = StoreImage {
            next_nid: self.identifiers.next_raw(),
            bindings: self.identifiers.bindings(),
            origins: self.paths.entries(),
            schemas,
            chronologies,
        };
        let payload = rmp_serde::to_vec(&image)?;

        let mut buf = Vec::with_capacity(8 + payload.len());
        buf.extend_from_slice(IMAGE_MAGIC);
        buf.extend_from_slice(&IMAGE_VERSION.to_le_bytes());
        buf.extend_from_slice(&payload);

        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let tmp_path = path.with_extension("tmp");
        {
            let mut file = std::fs::File::create(&tmp_path)?;
            file.write_all(&buf)?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp_path, path)?;
        info!(
            target: "termstore::store",
            path = %path.display(),
            chronologies = image.chronologies.len(),
            bytes = buf.len(),
            "Saved store image"
        );
        Ok(())
    }

    /// Read a store previously written by `save`
    pub fn load(path: &Path) -> Result<Self> {
        let buf = std::fs::read(path)?;
        if buf.len() < 8 {
            return Err(Error::SerializationError("store image too small".into()));
        }
        if &buf[0..4] != IMAGE_MAGIC {
            return Err(Error::SerializationError("bad store image magic".into()));
        }
        let mut version = [0u8; 4];
        version.copy_from_slice(&buf[4..8]);
        let version = u32::from_le_bytes(version);
        if version != IMAGE_VERSION {
            return Err(Error::SerializationError(format!(
                "unsupported store image version {}",
                version
            )));
        }
        let image: StoreImage = rmp_serde::from_slice(&buf[8..])?;

        let store = ChronicleStore::from_parts(
            IdentifierService::restore(image.bindings, image.next_nid),
            PathRegistry::restore(image.origins),
        );
        for schema in image.schemas {
            store.schemas.insert(schema.assemblage(), schema);
        }
        let count = image.chronologies.len();
        for chronology in image.chronologies {
            store.index_chronology(&chronology);
            store.chronologies.insert(chronology.nid(), chronology);
        }
        info!(target: "termstore::store", path = %path.display(), chronologies = count, "Loaded store image");
        Ok(store)
    }
}
