//! Type and type-id lookup for registered serializers.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::{
    error::{Result, SerializationError},
    serializer::{SerializerBinding, TypeKey},
};

/// Maps Rust types and type-ids to their [`SerializerBinding`].
///
/// Filled while the service is being configured, read-only afterwards,
/// so lookups need no locking.
#[derive(Default, Debug)]
pub struct SerializerRegistry {
    bindings: Vec<SerializerBinding>,
    by_type: HashMap<TypeKey, usize>,
    by_type_id: HashMap<i32, usize>,
}

impl SerializerRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a binding.
    ///
    /// # Errors
    /// - [`SerializationError::InvalidTypeId`] if the type-id is not positive.
    /// - [`SerializationError::DuplicateTypeId`] if another type owns the type-id.
    /// - [`SerializationError::DuplicateType`] if the type is already bound.
    pub fn register(&mut self, binding: SerializerBinding) -> Result<()> {
        let key = binding.key();
        let type_id = binding.type_id();

        if type_id <= 0 {
            return Err(SerializationError::InvalidTypeId {
                type_id,
                type_name: key.name(),
            });
        }

        if let Some(&index) = self.by_type_id.get(&type_id) {
            let existing = self.bindings[index].key();
            if existing != key {
                return Err(SerializationError::DuplicateTypeId {
                    type_id,
                    existing: existing.name(),
                    attempted: key.name(),
                });
            }
        }

        if let Some(&index) = self.by_type.get(&key) {
            return Err(SerializationError::DuplicateType {
                type_name: key.name(),
                existing_id: self.bindings[index].type_id(),
            });
        }

        debug!(
            type_id,
            type_name = key.name(),
            shape = binding.serializer.shape(),
            "Registered serializer"
        );

        let index = self.bindings.len();
        self.bindings.push(binding);
        self.by_type.insert(key, index);
        self.by_type_id.insert(type_id, index);

        Ok(())
    }

    /// Finds the binding for exactly this type.
    ///
    /// # Errors
    /// [`SerializationError::UnregisteredType`] if nothing is bound.
    pub fn lookup_by_type(&self, key: TypeKey) -> Result<&SerializerBinding> {
        self.by_type
            .get(&key)
            .map(|&index| &self.bindings[index])
            .ok_or(SerializationError::UnregisteredType {
                type_name: key.name(),
            })
    }

    /// Finds the binding that owns `type_id`.
    ///
    /// # Errors
    /// [`SerializationError::UnknownTypeId`] if nothing is bound.
    pub fn lookup_by_type_id(&self, type_id: i32) -> Result<&SerializerBinding> {
        self.by_type_id
            .get(&type_id)
            .map(|&index| &self.bindings[index])
            .ok_or(SerializationError::UnknownTypeId { type_id })
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bindings in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &SerializerBinding> {
        self.bindings.iter()
    }

    /// Runs every serializer's release hook, in registration order.
    ///
    /// The caller guarantees this happens once.
    pub(crate) fn destroy_all(&self) {
        for binding in &self.bindings {
            trace!(type_id = binding.type_id(), "Destroying serializer");
            binding.serializer.destroy();
        }
    }
}
