//! JSON export.
//!
//! [`export_entities_json`] writes the resolved records as a
//! `full_name → record` object. [`export_objects_json`] writes the objects
//! selected for rendering with their members and display decisions.

use crate::entity::Entity;
use crate::error::{DocError, Result};
use crate::objects::{ApiObject, ObjectStore};
use serde_json::{json, Map, Value};

/// Export module records keyed by module name.
pub fn export_entities_json(modules: &[Entity]) -> Result<String> {
    let mut map = Map::new();
    for module in modules {
        let value = serde_json::to_value(module).map_err(|e| {
            DocError::serialization(format!("Failed to encode {}", module.full_name), Some(e))
        })?;
        map.insert(module.full_name.clone(), value);
    }
    serde_json::to_string_pretty(&Value::Object(map))
        .map_err(|e| DocError::serialization("Failed to encode records", Some(e)))
}

/// Export the rendered selection of an object store.
pub fn export_objects_json(store: &ObjectStore) -> Result<String> {
    let pages: Vec<Value> = store
        .objects_to_render()
        .map(|object| object_to_json(store, object))
        .collect();

    let result = json!({
        "pages": pages,
        "object_count": store.len(),
    });
    serde_json::to_string_pretty(&result)
        .map_err(|e| DocError::serialization("Failed to encode objects", Some(e)))
}

fn object_to_json(store: &ObjectStore, object: &ApiObject) -> Value {
    let members: Vec<Value> = object
        .children
        .iter()
        .filter_map(|&id| store.get(id))
        .filter(|child| child.display().unwrap_or(false))
        .map(|child| object_to_json(store, child))
        .collect();

    let mut value = json!({
        "id": object.id(),
        "type": object.kind().as_str(),
        "name": object.name(),
        "summary": object.summary(),
        "docstring": object.docstring,
        "members": members,
    });

    if let Some(map) = value.as_object_mut() {
        let entity = &object.entity;
        if object.kind().is_callable() {
            map.insert("args".into(), json!(object.signature(true)));
            map.insert("return_annotation".into(), json!(entity.return_annotation));
        }
        if !entity.bases.is_empty() {
            map.insert("bases".into(), json!(entity.bases));
        }
        if let Some(annotations) = store.annotations(object.id()) {
            map.insert("annotations".into(), json!(annotations));
        }
        if let Some(original) = &entity.original_path {
            map.insert("original_path".into(), json!(original));
        }
    }
    value
}
