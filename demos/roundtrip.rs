use datacast::{
    SerializationService,
    codecs::{BinaryCodec, CodecSerializer},
    config::SerializationConfig,
    serializer::Serializer,
};
use serde::{Deserialize, Serialize};

use anyhow::Result;
#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};

const PROFILE_TYPE_ID: i32 = 10;

/// What an older deployment writes.
#[derive(Serialize, Deserialize, Debug)]
struct ProfileV1 {
    foo: Option<String>,
    name: Option<String>,
}

/// What a newer deployment reads: `name` is gone, `title` is new.
#[derive(Serialize, Deserialize, Debug)]
struct ProfileV2 {
    foo: Option<String>,
    title: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let old = SerializationService::builder()
        .with_config(SerializationConfig::new().add_serializer(Serializer::byte_array(
            CodecSerializer::<ProfileV1, _>::new(BinaryCodec {}, PROFILE_TYPE_ID),
        )))
        .build()?;

    let new = SerializationService::builder()
        .with_config(SerializationConfig::new().add_serializer(Serializer::byte_array(
            CodecSerializer::<ProfileV2, _>::new(BinaryCodec {}, PROFILE_TYPE_ID),
        )))
        .build()?;

    let written = ProfileV1 {
        foo: Some("f".to_string()),
        name: Some("name".to_string()),
    };
    let data = old.to_data(&written)?;
    info!(size = data.total_size(), "Old service wrote {:?}", written);

    let read: ProfileV2 = new.to_object(&data)?;
    info!("New service read {:?}", read);

    old.destroy();
    new.destroy();

    Ok(())
}
