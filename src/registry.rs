//! Entity type registry.
//!
//! Maps strongly-typed domain entities to physical collection and
//! document-type names, projection profiles, and facet fields, and resolves
//! document-type tags back to registered decoders for polymorphic result
//! materialization. Built once at startup and immutable thereafter, so it is
//! safe for unsynchronized concurrent reads.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{AcorusError, Result};
use crate::query::Projection;

/// Marker for domain types that can be read back from the engine.
pub trait Entity: DeserializeOwned + Send + Sync + 'static {}

impl<T> Entity for T where T: DeserializeOwned + Send + Sync + 'static {}

pub(crate) type DecodeFn =
    fn(&Value) -> std::result::Result<Box<dyn Any + Send + Sync>, serde_json::Error>;

fn decode_erased<T: Entity>(
    value: &Value,
) -> std::result::Result<Box<dyn Any + Send + Sync>, serde_json::Error> {
    serde_json::from_value::<T>(value.clone()).map(|v| Box::new(v) as Box<dyn Any + Send + Sync>)
}

/// Physical mapping for one registered entity type.
#[derive(Debug, Clone)]
pub struct EntityMapping {
    collection: String,
    doc_type: String,
    profiles: HashMap<String, Projection>,
    facet_fields: Vec<String>,
    boost_field: Option<String>,
}

impl EntityMapping {
    /// Map an entity type to a collection and a document-type name.
    pub fn new(collection: impl Into<String>, doc_type: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            doc_type: doc_type.into(),
            profiles: HashMap::new(),
            facet_fields: Vec::new(),
            boost_field: None,
        }
    }

    /// Declare a named projection profile. Profile names are unique per
    /// entity type; a repeated name replaces the earlier profile.
    pub fn with_profile(mut self, name: impl Into<String>, projection: Projection) -> Self {
        self.profiles.insert(name.into(), projection);
        self
    }

    /// Declare the fields faceted searches aggregate on.
    pub fn with_facets<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.facet_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Declare the numeric field that scales relevance scores for this
    /// entity type (missing values count as 1).
    pub fn with_boost_field(mut self, field: impl Into<String>) -> Self {
        self.boost_field = Some(field.into());
        self
    }

    /// Collection this entity type is stored in.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Document-type tag stored with each document of this entity type.
    pub fn doc_type(&self) -> &str {
        &self.doc_type
    }

    /// Look up a projection profile by name.
    pub fn profile(&self, name: &str) -> Option<&Projection> {
        self.profiles.get(name)
    }

    /// Fields faceted searches aggregate on.
    pub fn facet_fields(&self) -> &[String] {
        &self.facet_fields
    }

    /// The relevance boost field, when declared.
    pub fn boost_field(&self) -> Option<&str> {
        self.boost_field.as_deref()
    }
}

#[derive(Debug)]
pub(crate) struct RegisteredType {
    pub(crate) mapping: EntityMapping,
    pub(crate) entity_name: &'static str,
    type_id: TypeId,
    pub(crate) decode: DecodeFn,
}

/// Read-only mapping between entity types and their physical storage.
///
/// Build one at startup with [`TypeRegistry::builder`] and share it behind
/// an `Arc`; it is never mutated afterwards.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: Vec<RegisteredType>,
    by_type: HashMap<TypeId, usize>,
    by_doc_type: HashMap<String, usize>,
}

impl TypeRegistry {
    /// Start building a registry.
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder::default()
    }

    /// Resolve the mapping registered for an entity type.
    pub fn resolve<T: Entity>(&self) -> Result<&EntityMapping> {
        self.entry::<T>().map(|entry| &entry.mapping)
    }

    /// Resolve the mapping registered for a document-type name.
    ///
    /// For well-formed engine responses this never fails; a failure during
    /// materialization signals mapping or version skew between the adapter
    /// configuration and the index content.
    pub fn resolve_doc_type(&self, doc_type: &str) -> Result<&EntityMapping> {
        self.entry_for_doc_type(doc_type)
            .map(|entry| &entry.mapping)
            .ok_or_else(|| AcorusError::unknown_type(doc_type))
    }

    pub(crate) fn entry<T: Entity>(&self) -> Result<&RegisteredType> {
        self.by_type
            .get(&TypeId::of::<T>())
            .map(|&index| &self.types[index])
            .ok_or_else(|| AcorusError::unknown_type(type_name::<T>()))
    }

    pub(crate) fn entry_for_doc_type(&self, doc_type: &str) -> Option<&RegisteredType> {
        self.by_doc_type
            .get(doc_type)
            .map(|&index| &self.types[index])
    }

    /// All registered mappings, in registration order.
    pub fn mappings(&self) -> impl Iterator<Item = &EntityMapping> {
        self.types.iter().map(|entry| &entry.mapping)
    }

    /// Number of registered entity types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// True when no entity type has been registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Builder for [`TypeRegistry`].
#[derive(Debug, Default)]
pub struct TypeRegistryBuilder {
    types: Vec<RegisteredType>,
}

impl TypeRegistryBuilder {
    /// Register an entity type with its physical mapping.
    ///
    /// Re-registering the same entity type or document-type name replaces
    /// the earlier registration.
    pub fn register<T: Entity>(mut self, mapping: EntityMapping) -> Self {
        let type_id = TypeId::of::<T>();
        self.types.retain(|entry| {
            entry.type_id != type_id && entry.mapping.doc_type != mapping.doc_type
        });
        self.types.push(RegisteredType {
            mapping,
            entity_name: type_name::<T>(),
            type_id,
            decode: decode_erased::<T>,
        });
        self
    }

    /// Finish building the immutable registry.
    pub fn build(self) -> TypeRegistry {
        let mut by_type = HashMap::with_capacity(self.types.len());
        let mut by_doc_type = HashMap::with_capacity(self.types.len());
        for (index, entry) in self.types.iter().enumerate() {
            by_type.insert(entry.type_id, index);
            by_doc_type.insert(entry.mapping.doc_type.clone(), index);
        }
        TypeRegistry {
            types: self.types,
            by_type,
            by_doc_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Widget {
        #[allow(dead_code)]
        id: String,
    }

    #[derive(Debug, Deserialize)]
    struct Unregistered {}

    fn registry() -> TypeRegistry {
        TypeRegistry::builder()
            .register::<Widget>(EntityMapping::new("widgets", "widget"))
            .build()
    }

    #[test]
    fn test_resolve_round_trip_is_identity() {
        let registry = registry();
        let mapping = registry.resolve::<Widget>().unwrap();
        let reverse = registry.resolve_doc_type(mapping.doc_type()).unwrap();
        assert_eq!(reverse.collection(), mapping.collection());
        assert_eq!(reverse.doc_type(), mapping.doc_type());
    }

    #[test]
    fn test_unregistered_type_fails() {
        let registry = registry();
        assert!(matches!(
            registry.resolve::<Unregistered>(),
            Err(AcorusError::UnknownType(_))
        ));
        assert!(matches!(
            registry.resolve_doc_type("relic"),
            Err(AcorusError::UnknownType(_))
        ));
    }

    #[test]
    fn test_re_registration_replaces() {
        let registry = TypeRegistry::builder()
            .register::<Widget>(EntityMapping::new("widgets", "widget"))
            .register::<Widget>(EntityMapping::new("widgets-v2", "widget"))
            .build();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.resolve::<Widget>().unwrap().collection(), "widgets-v2");
    }
}
