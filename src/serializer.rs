//! # Serializer plugins
//! A serializer converts one concrete type to bytes and back. There are
//! two shapes:
//! - [`ByteArraySerializer`]: returns a fresh `Vec<u8>` per call and reads
//!   from a plain slice. This is the safer shape: it never touches pooled
//!   storage.
//! - [`StreamSerializer`]: writes into an [`ObjectDataOutput`] backed by a
//!   pooled buffer and reads from an [`ObjectDataInput`]. The borrow ends
//!   when the call returns, so the buffer cannot be kept around.
//!
//! Both are wrapped in the [`Serializer`] enum before registration.
//!
//! A serializer must not call back into the service that runs it. Every
//! call holds the service's lifecycle lock for reading, and a nested call
//! deadlocks once a `destroy` is queued behind the outer one.
//! Whatever bytes a serializer produces are carried verbatim; the
//! service never looks inside them.

use std::{
    any::{Any, TypeId, type_name},
    fmt,
    hash::{Hash, Hasher},
};

use anyhow::{Result, format_err};

use crate::io::{ObjectDataInput, ObjectDataOutput};

/// Whole-value serializer: `T -> Vec<u8>` and `&[u8] -> T`.
///
/// Must not re-enter the owning service (see the module docs).
pub trait ByteArraySerializer<T>: Send + Sync {
    /// Positive type-id written into every [`Data`](crate::data::Data) this serializer produces.
    fn type_id(&self) -> i32;

    /// Encodes `value`.
    ///
    /// # Errors
    /// Any codec failure; the service reports it as a
    /// [`SerializationFailure`](crate::error::SerializationError::SerializationFailure).
    fn write(&self, value: &T) -> Result<Vec<u8>>;

    /// Decodes a payload.
    ///
    /// # Errors
    /// Any codec failure.
    fn read(&self, bytes: &[u8]) -> Result<T>;

    /// Release hook, called exactly once when the owning service is destroyed.
    fn destroy(&self) {}
}

/// Streaming serializer working against borrowed I/O handles.
///
/// `write` must have written everything it intends to before returning.
/// Must not re-enter the owning service (see the module docs).
pub trait StreamSerializer<T>: Send + Sync {
    /// Positive type-id written into every [`Data`](crate::data::Data) this serializer produces.
    fn type_id(&self) -> i32;

    /// Encodes `value` into `out`.
    ///
    /// # Errors
    /// Any codec failure.
    fn write(&self, out: &mut ObjectDataOutput<'_>, value: &T) -> Result<()>;

    /// Decodes a value from `input`.
    ///
    /// # Errors
    /// Any codec failure, including running out of payload.
    fn read(&self, input: &mut ObjectDataInput<'_>) -> Result<T>;

    /// Release hook, called exactly once when the owning service is destroyed.
    fn destroy(&self) {}
}

/// A serializer for `T` in either shape.
pub enum Serializer<T> {
    /// See [`ByteArraySerializer`].
    ByteArray(Box<dyn ByteArraySerializer<T>>),
    /// See [`StreamSerializer`].
    Stream(Box<dyn StreamSerializer<T>>),
}

impl<T> Serializer<T> {
    /// Wraps a whole-value serializer.
    pub fn byte_array(serializer: impl ByteArraySerializer<T> + 'static) -> Self {
        Serializer::ByteArray(Box::new(serializer))
    }

    /// Wraps a streaming serializer.
    pub fn stream(serializer: impl StreamSerializer<T> + 'static) -> Self {
        Serializer::Stream(Box::new(serializer))
    }

    /// Type-id the wrapped serializer reports.
    pub fn type_id(&self) -> i32 {
        match self {
            // Spelled out: `Any::type_id` would win method lookup on the box.
            Serializer::ByteArray(s) => ByteArraySerializer::type_id(&**s),
            Serializer::Stream(s) => StreamSerializer::type_id(&**s),
        }
    }
}

/// Stable key for a Rust type, resolved once at registration.
///
/// Matching is exact: a key only equals the key of the very same type.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key for `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Key for the runtime type behind `value`.
    ///
    /// The concrete type name is not recoverable here, so errors name it
    /// `dyn Any`.
    #[must_use]
    pub fn of_val(value: &dyn Any) -> Self {
        Self {
            id: value.type_id(),
            name: "dyn core::any::Any",
        }
    }

    /// Human readable type name, for errors and logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

pub(crate) trait AnyByteArraySerializer: Send + Sync {
    fn write(&self, value: &dyn Any) -> Result<Vec<u8>>;
    fn read(&self, bytes: &[u8]) -> Result<Box<dyn Any + Send>>;
    fn destroy(&self);
}

pub(crate) trait AnyStreamSerializer: Send + Sync {
    fn write(&self, out: &mut ObjectDataOutput<'_>, value: &dyn Any) -> Result<()>;
    fn read(&self, input: &mut ObjectDataInput<'_>) -> Result<Box<dyn Any + Send>>;
    fn destroy(&self);
}

fn downcast<T: 'static>(value: &dyn Any) -> Result<&T> {
    value
        .downcast_ref::<T>()
        .ok_or_else(|| format_err!("serializer for {} got another type", type_name::<T>()))
}

impl<T: Send + 'static> AnyByteArraySerializer for Box<dyn ByteArraySerializer<T>> {
    fn write(&self, value: &dyn Any) -> Result<Vec<u8>> {
        (**self).write(downcast::<T>(value)?)
    }

    fn read(&self, bytes: &[u8]) -> Result<Box<dyn Any + Send>> {
        Ok(Box::new((**self).read(bytes)?))
    }

    fn destroy(&self) {
        (**self).destroy();
    }
}

impl<T: Send + 'static> AnyStreamSerializer for Box<dyn StreamSerializer<T>> {
    fn write(&self, out: &mut ObjectDataOutput<'_>, value: &dyn Any) -> Result<()> {
        (**self).write(out, downcast::<T>(value)?)
    }

    fn read(&self, input: &mut ObjectDataInput<'_>) -> Result<Box<dyn Any + Send>> {
        Ok(Box::new((**self).read(input)?))
    }

    fn destroy(&self) {
        (**self).destroy();
    }
}

/// Type-erased serializer, tagged by shape.
pub(crate) enum ErasedSerializer {
    ByteArray(Box<dyn AnyByteArraySerializer>),
    Stream(Box<dyn AnyStreamSerializer>),
}

impl ErasedSerializer {
    pub(crate) fn destroy(&self) {
        match self {
            ErasedSerializer::ByteArray(s) => s.destroy(),
            ErasedSerializer::Stream(s) => s.destroy(),
        }
    }

    pub(crate) const fn shape(&self) -> &'static str {
        match self {
            ErasedSerializer::ByteArray(_) => "byte-array",
            ErasedSerializer::Stream(_) => "stream",
        }
    }
}

impl<T: Send + 'static> From<Serializer<T>> for ErasedSerializer {
    fn from(serializer: Serializer<T>) -> Self {
        match serializer {
            Serializer::ByteArray(s) => ErasedSerializer::ByteArray(Box::new(s)),
            Serializer::Stream(s) => ErasedSerializer::Stream(Box::new(s)),
        }
    }
}

/// A type bound to its serializer and type-id.
///
/// Built at configuration time and never changed afterwards.
pub struct SerializerBinding {
    key: TypeKey,
    type_id: i32,
    pub(crate) serializer: ErasedSerializer,
}

impl SerializerBinding {
    /// Binds `T` to `serializer` under the serializer's own type-id.
    pub fn new<T: Send + 'static>(serializer: Serializer<T>) -> Self {
        let type_id = serializer.type_id();
        Self::with_type_id(serializer, type_id)
    }

    /// Binds `T` to `serializer` under an explicit type-id.
    pub fn with_type_id<T: Send + 'static>(serializer: Serializer<T>, type_id: i32) -> Self {
        Self {
            key: TypeKey::of::<T>(),
            type_id,
            serializer: serializer.into(),
        }
    }

    /// The bound type.
    #[must_use]
    pub const fn key(&self) -> TypeKey {
        self.key
    }

    /// The bound type-id.
    #[must_use]
    pub const fn type_id(&self) -> i32 {
        self.type_id
    }

    /// `true` for [`Serializer::Stream`] bindings.
    #[must_use]
    pub const fn is_streaming(&self) -> bool {
        matches!(self.serializer, ErasedSerializer::Stream(_))
    }
}

impl fmt::Debug for SerializerBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializerBinding")
            .field("type", &self.key)
            .field("type_id", &self.type_id)
            .field("shape", &self.serializer.shape())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    impl ByteArraySerializer<String> for Upper {
        fn type_id(&self) -> i32 {
            3
        }

        fn write(&self, value: &String) -> Result<Vec<u8>> {
            Ok(value.to_uppercase().into_bytes())
        }

        fn read(&self, bytes: &[u8]) -> Result<String> {
            Ok(String::from_utf8(bytes.to_vec())?)
        }
    }

    #[test]
    fn keys_match_exact_types_only() {
        assert_eq!(TypeKey::of::<String>(), TypeKey::of::<String>());
        assert_ne!(TypeKey::of::<String>(), TypeKey::of::<&'static str>());
        assert_eq!(TypeKey::of::<u8>().name(), "u8");
    }

    #[test]
    fn runtime_key_sees_through_dyn_any() {
        let boxed: Box<dyn Any + Send> = Box::new(5u16);

        assert_eq!(TypeKey::of_val(&*boxed), TypeKey::of::<u16>());
        assert_ne!(TypeKey::of_val(&boxed), TypeKey::of::<u16>());
    }

    #[test]
    fn binding_takes_serializer_type_id() {
        let binding = SerializerBinding::new(Serializer::<String>::byte_array(Upper));

        assert_eq!(binding.type_id(), 3);
        assert_eq!(binding.key(), TypeKey::of::<String>());
        assert!(!binding.is_streaming());

        let overridden =
            SerializerBinding::with_type_id(Serializer::<String>::byte_array(Upper), 40);
        assert_eq!(overridden.type_id(), 40);
    }

    #[test]
    fn erased_serializer_rejects_foreign_values() {
        let erased = ErasedSerializer::from(Serializer::<String>::byte_array(Upper));
        let ErasedSerializer::ByteArray(erased) = erased else {
            panic!("expected byte-array shape");
        };

        assert_eq!(erased.write(&"abc".to_string()).unwrap(), b"ABC");
        assert!(erased.write(&42u32).is_err());

        let back = erased.read(b"xyz").unwrap();
        assert_eq!(back.downcast_ref::<String>().unwrap(), "xyz");
    }
}
