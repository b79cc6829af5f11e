//! The serialization service: `to_data` / `to_object` over registered serializers.
//!
//! # Setup
//! ```
//! use datacast::{
//!     codecs::{BinaryCodec, CodecSerializer},
//!     config::SerializationConfig,
//!     serializer::Serializer,
//!     service::SerializationServiceBuilder,
//! };
//!
//! let config = SerializationConfig::new().add_serializer(Serializer::byte_array(
//!     CodecSerializer::<Vec<String>, _>::new(BinaryCodec {}, 1),
//! ));
//! let service = SerializationServiceBuilder::new()
//!     .with_config(config)
//!     .build()
//!     .unwrap();
//!
//! let value = vec!["a".to_string()];
//! let data = service.to_data(&value).unwrap();
//! assert_eq!(service.to_object::<Vec<String>>(&data).unwrap(), value);
//! ```

use std::{
    any::{Any, type_name},
    sync::{PoisonError, RwLock, RwLockReadGuard},
};

#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};

use crate::{
    config::{ByteOrder, SerializationConfig},
    data::{Data, DataCodec},
    error::{Direction, Result, SerializationError},
    io::ObjectDataInput,
    pool::{BufferPool, PoolStats},
    registry::SerializerRegistry,
    serializer::{ErasedSerializer, TypeKey},
};

/// Lifecycle of a [`SerializationService`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceState {
    /// Bindings are being validated; no calls accepted yet.
    Configured,
    /// Serializing and deserializing.
    Operational,
    /// Destroyed. Terminal.
    Closed,
}

/// Validates a [`SerializationConfig`] and builds the service from it.
#[derive(Debug, Default)]
pub struct SerializationServiceBuilder {
    config: SerializationConfig,
}

impl SerializationServiceBuilder {
    /// Builder with an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: SerializationConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers every binding, in order, and starts the service.
    ///
    /// # Errors
    /// The first configuration error met:
    /// [`DuplicateTypeId`](SerializationError::DuplicateTypeId),
    /// [`DuplicateType`](SerializationError::DuplicateType) or
    /// [`InvalidTypeId`](SerializationError::InvalidTypeId).
    pub fn build(self) -> Result<SerializationService> {
        let SerializationConfig {
            byte_order,
            buffer_pool,
            bindings,
        } = self.config;

        let mut registry = SerializerRegistry::new();
        for binding in bindings {
            registry.register(binding)?;
        }

        let service = SerializationService {
            registry,
            pool: BufferPool::new(buffer_pool),
            codec: DataCodec::new(byte_order),
            state: RwLock::new(ServiceState::Configured),
        };
        service.start();

        Ok(service)
    }
}

/// Converts values to [`Data`] and back through registered serializers.
///
/// Shareable across threads. Lookups are lock free; the only shared
/// mutable resource is the buffer pool, whose checkouts are exclusive.
#[derive(Debug)]
pub struct SerializationService {
    registry: SerializerRegistry,
    pool: BufferPool,
    codec: DataCodec,
    state: RwLock<ServiceState>,
}

impl SerializationService {
    /// Shorthand for [`SerializationServiceBuilder::new`].
    #[must_use]
    pub fn builder() -> SerializationServiceBuilder {
        SerializationServiceBuilder::new()
    }

    fn start(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if *state == ServiceState::Configured {
            *state = ServiceState::Operational;
            debug!(
                serializers = self.registry.len(),
                byte_order = ?self.codec.byte_order(),
                "Serialization service started"
            );
        }
    }

    // Held for the whole call so destroy() waits for in-flight work.
    // Not reentrant: a nested call queues behind a waiting destroy().
    fn enter(&self) -> Result<RwLockReadGuard<'_, ServiceState>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        if *state == ServiceState::Operational {
            Ok(state)
        } else {
            Err(SerializationError::ServiceClosed)
        }
    }

    /// Serializes `value` with the serializer bound to `T`.
    ///
    /// A value that is already [`Data`] is returned as is. A
    /// `Box<dyn Any + Send>`, as returned by
    /// [`to_object_any`](Self::to_object_any), is serialized by the type it
    /// holds.
    ///
    /// # Errors
    /// - [`SerializationError::ServiceClosed`] after [`destroy`](Self::destroy).
    /// - [`SerializationError::UnregisteredType`] if nothing is bound to `T`.
    /// - [`SerializationError::SerializationFailure`] if the serializer fails.
    pub fn to_data<T: Any>(&self, value: &T) -> Result<Data> {
        let value = value as &dyn Any;
        if let Some(boxed) = value.downcast_ref::<Box<dyn Any + Send>>() {
            return self.to_data_any(&**boxed);
        }

        self.serialize(value, TypeKey::of::<T>())
    }

    /// Serializes `value` with the serializer bound to its runtime type.
    ///
    /// # Errors
    /// Same as [`to_data`](Self::to_data).
    pub fn to_data_any(&self, value: &dyn Any) -> Result<Data> {
        self.serialize(value, TypeKey::of_val(value))
    }

    fn serialize(&self, value: &dyn Any, key: TypeKey) -> Result<Data> {
        let _state = self.enter()?;

        if let Some(data) = value.downcast_ref::<Data>() {
            return Ok(data.clone());
        }

        let binding = self.registry.lookup_by_type(key)?;
        let type_id = binding.type_id();
        let fail = |e| SerializationError::failure(type_id, Direction::Write, e);

        let data = match &binding.serializer {
            ErasedSerializer::ByteArray(serializer) => {
                let payload = serializer.write(value).map_err(fail)?;
                self.codec.encode(type_id, &payload)
            }
            ErasedSerializer::Stream(serializer) => {
                let mut buffer = self.pool.acquire_output();
                self.codec.write_header(&mut buffer, type_id);
                serializer
                    .write(&mut buffer.output(self.codec.byte_order()), value)
                    .map_err(fail)?;

                let data = Data::from(buffer.as_slice());
                self.pool.release(buffer);
                data
            }
        };

        trace!(type_id, size = data.total_size(), "Serialized {}", binding.key().name());

        Ok(data)
    }

    /// Deserializes `data` and downcasts the result to `T`.
    ///
    /// # Errors
    /// Everything [`to_object_any`](Self::to_object_any) reports, plus
    /// [`SerializationError::TypeMismatch`] if the type-id is bound to a
    /// type other than `T`.
    pub fn to_object<T: Any>(&self, data: &Data) -> Result<T> {
        let (type_id, object) = self.decode(data)?;

        object.downcast::<T>().map(|boxed| *boxed).map_err(|_| {
            SerializationError::TypeMismatch {
                type_id,
                expected: type_name::<T>(),
                actual: self
                    .registry
                    .lookup_by_type_id(type_id)
                    .map_or("<unknown>", |binding| binding.key().name()),
            }
        })
    }

    /// Deserializes `data` with whichever serializer owns its type-id.
    ///
    /// # Errors
    /// - [`SerializationError::ServiceClosed`] after [`destroy`](Self::destroy).
    /// - [`SerializationError::MalformedData`] if `data` is shorter than the header.
    /// - [`SerializationError::UnknownTypeId`] if the type-id is not registered.
    /// - [`SerializationError::SerializationFailure`] if the serializer fails.
    pub fn to_object_any(&self, data: &Data) -> Result<Box<dyn Any + Send>> {
        self.decode(data).map(|(_, object)| object)
    }

    fn decode(&self, data: &Data) -> Result<(i32, Box<dyn Any + Send>)> {
        let _state = self.enter()?;

        let (type_id, payload) = self.codec.decode(data)?;
        let binding = self.registry.lookup_by_type_id(type_id)?;
        let fail = |e| SerializationError::failure(type_id, Direction::Read, e);

        let object = match &binding.serializer {
            ErasedSerializer::ByteArray(serializer) => serializer.read(payload).map_err(fail)?,
            ErasedSerializer::Stream(serializer) => {
                let mut input = ObjectDataInput::new(payload, self.codec.byte_order());
                serializer.read(&mut input).map_err(fail)?
            }
        };

        trace!(type_id, size = data.total_size(), "Deserialized {}", binding.key().name());

        Ok((type_id, object))
    }

    /// Runs every serializer's release hook once and closes the service.
    ///
    /// Waits for in-flight calls; calls arriving afterwards fail with
    /// [`SerializationError::ServiceClosed`]. Calling it again does nothing.
    pub fn destroy(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if *state == ServiceState::Closed {
            debug!("Serialization service already closed");
            return;
        }

        self.registry.destroy_all();
        *state = ServiceState::Closed;
        info!(serializers = self.registry.len(), "Serialization service closed");
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ServiceState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Byte order of the [`Data`] header.
    #[must_use]
    pub fn byte_order(&self) -> ByteOrder {
        self.codec.byte_order()
    }

    /// The codec framing this service's [`Data`].
    #[must_use]
    pub fn data_codec(&self) -> DataCodec {
        self.codec
    }

    /// The registered bindings.
    #[must_use]
    pub fn registry(&self) -> &SerializerRegistry {
        &self.registry
    }

    /// Buffer pool counters.
    #[must_use]
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }
}

impl Drop for SerializationService {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if *state != ServiceState::Closed {
            self.registry.destroy_all();
            *state = ServiceState::Closed;
            debug!("Serialization service dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;
    use crate::{
        io::ObjectDataOutput,
        serializer::{ByteArraySerializer, Serializer, StreamSerializer},
    };

    #[derive(Debug, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    struct PointSerializer {
        destroyed: Arc<AtomicUsize>,
    }

    impl StreamSerializer<Point> for PointSerializer {
        fn type_id(&self) -> i32 {
            4
        }

        fn write(&self, out: &mut ObjectDataOutput<'_>, value: &Point) -> anyhow::Result<()> {
            out.write_i32(value.x);
            out.write_i32(value.y);
            Ok(())
        }

        fn read(&self, input: &mut ObjectDataInput<'_>) -> anyhow::Result<Point> {
            Ok(Point {
                x: input.read_i32()?,
                y: input.read_i32()?,
            })
        }

        fn destroy(&self) {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Failing;

    impl ByteArraySerializer<u8> for Failing {
        fn type_id(&self) -> i32 {
            5
        }

        fn write(&self, _value: &u8) -> anyhow::Result<Vec<u8>> {
            anyhow::bail!("refusing to write")
        }

        fn read(&self, _bytes: &[u8]) -> anyhow::Result<u8> {
            anyhow::bail!("refusing to read")
        }
    }

    fn service(order: ByteOrder) -> (SerializationService, Arc<AtomicUsize>) {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let config = SerializationConfig::new()
            .with_byte_order(order)
            .add_serializer(Serializer::<Point>::stream(PointSerializer {
                destroyed: destroyed.clone(),
            }))
            .add_serializer(Serializer::<u8>::byte_array(Failing));

        let service = SerializationService::builder()
            .with_config(config)
            .build()
            .unwrap();
        (service, destroyed)
    }

    #[test]
    fn stream_payload_follows_byte_order() {
        let (service, _) = service(ByteOrder::LittleEndian);
        let data = service.to_data(&Point { x: 1, y: 2 }).unwrap();

        assert_eq!(data.as_bytes(), [4, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0]);
        assert_eq!(service.to_object::<Point>(&data).unwrap(), Point { x: 1, y: 2 });
    }

    #[test]
    fn failures_carry_type_id_and_direction() {
        let (service, _) = service(ByteOrder::BigEndian);

        let err = service.to_data(&7u8).unwrap_err();
        assert!(matches!(
            err,
            SerializationError::SerializationFailure {
                type_id: 5,
                direction: Direction::Write,
                ..
            }
        ));

        let data = service.data_codec().encode(5, &[1]);
        let err = service.to_object::<u8>(&data).unwrap_err();
        assert!(matches!(
            err,
            SerializationError::SerializationFailure {
                type_id: 5,
                direction: Direction::Read,
                ..
            }
        ));
    }

    #[test]
    fn failed_write_returns_buffer_to_pool() {
        struct Broken;

        impl StreamSerializer<String> for Broken {
            fn type_id(&self) -> i32 {
                9
            }

            fn write(&self, out: &mut ObjectDataOutput<'_>, _value: &String) -> anyhow::Result<()> {
                out.write_bytes(b"partial");
                anyhow::bail!("gave up halfway")
            }

            fn read(&self, _input: &mut ObjectDataInput<'_>) -> anyhow::Result<String> {
                Ok(String::new())
            }
        }

        let service = SerializationService::builder()
            .with_config(
                SerializationConfig::new().add_serializer(Serializer::<String>::stream(Broken)),
            )
            .build()
            .unwrap();

        assert!(service.to_data(&"x".to_string()).is_err());
        assert_eq!(service.pool_stats().idle, 1);
    }

    #[test]
    fn truncated_stream_payload_is_a_read_failure() {
        let (service, _) = service(ByteOrder::BigEndian);
        let data = service.data_codec().encode(4, &[0, 0, 0, 1]);

        assert!(matches!(
            service.to_object::<Point>(&data),
            Err(SerializationError::SerializationFailure {
                direction: Direction::Read,
                ..
            })
        ));
    }

    #[test]
    fn wrong_target_type_is_a_mismatch() {
        let (service, _) = service(ByteOrder::BigEndian);
        let data = service.to_data(&Point { x: 0, y: 0 }).unwrap();

        let err = service.to_object::<String>(&data).unwrap_err();
        assert!(matches!(
            err,
            SerializationError::TypeMismatch {
                type_id: 4,
                expected: "alloc::string::String",
                ..
            }
        ));
    }

    #[test]
    fn data_passes_through() {
        let (service, _) = service(ByteOrder::BigEndian);
        let data = Data::from_bytes(vec![1, 2, 3]);

        assert_eq!(service.to_data(&data).unwrap(), data);
    }

    #[test]
    fn lifecycle_ends_closed_and_destroys_once() {
        let (service, destroyed) = service(ByteOrder::BigEndian);
        assert_eq!(service.state(), ServiceState::Operational);

        service.destroy();
        service.destroy();
        assert_eq!(service.state(), ServiceState::Closed);
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);

        drop(service);
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_destroys_serializers() {
        let (service, destroyed) = service(ByteOrder::BigEndian);
        drop(service);

        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    }
}
