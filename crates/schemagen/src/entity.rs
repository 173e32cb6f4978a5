//! Entity descriptions.
//!
//! Schema introspection is out of scope; entities arrive as a YAML or JSON
//! document listing, for every entity, the template fragments to associate
//! with it and the context each fragment renders against:
//!
//! ```yaml
//! - name: users
//!   fragments:
//!     - kind: type
//!       context: { name: users, table: users, fields: [] }
//!     - kind: index
//!       context: { name: users_by_email, table: users, type_name: Users, unique: true, fields: [] }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use schemagen_render::{RenderError, TemplateKind};

use crate::registry::EntityRegistry;

#[derive(Debug, thiserror::Error)]
pub enum EntityError {
    #[error("could not read entities from {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid entity document {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
    #[error("entity \"{entity}\": `{kind}` is rendered by the generator and cannot be associated")]
    GenericKind { entity: String, kind: TemplateKind },
    #[error("entity \"{entity}\": {source}")]
    Associate {
        entity: String,
        #[source]
        source: RenderError,
    },
}

/// One sub-template to associate with an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub kind: TemplateKind,
    #[serde(default)]
    pub context: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDescription {
    pub name: String,
    #[serde(default)]
    pub fragments: Vec<Fragment>,
}

/// Reads entity descriptions from `path`.
///
/// Files ending in `.json` are parsed as JSON, everything else as YAML.
pub fn load_entities(path: &Path) -> Result<Vec<EntityDescription>, EntityError> {
    let content = fs::read_to_string(path).map_err(|source| EntityError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let parsed = if is_json {
        serde_json::from_str(&content).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(&content).map_err(|e| e.to_string())
    };

    parsed.map_err(|message| EntityError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

/// Associates every fragment of `entities` with its entity, in order.
///
/// Entities are created in document order, so this is also the order
/// outputs are emitted in. Stops at the first failure.
pub fn register_entities(
    registry: &mut EntityRegistry,
    entities: &[EntityDescription],
) -> Result<(), EntityError> {
    for entity in entities {
        let record = registry.get_or_create(&entity.name);
        for fragment in &entity.fragments {
            if fragment.kind.is_generic() {
                return Err(EntityError::GenericKind {
                    entity: entity.name.clone(),
                    kind: fragment.kind,
                });
            }
            record
                .associate(fragment.kind, &fragment.context)
                .map_err(|source| EntityError::Associate {
                    entity: entity.name.clone(),
                    source,
                })?;
        }
        debug!(entity = %entity.name, fragments = entity.fragments.len(), "registered entity");
    }
    Ok(())
}
