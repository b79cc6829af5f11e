use criterion::{Criterion, criterion_group, criterion_main};
use datacast::{
    SerializationService,
    codecs::{BinaryCodec, CodecSerializer, CodecStreamSerializer, NaiveCodec},
    config::SerializationConfig,
    serializer::Serializer,
};
use serde::{Deserialize, Serialize};
use std::hint::black_box;

#[derive(Serialize, Deserialize, Clone, Debug)]
struct Order {
    id: u64,
    customer: String,
    lines: Vec<Line>,
    note: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
struct Line {
    sku: String,
    quantity: u32,
    price_cents: u64,
}

fn order() -> Order {
    Order {
        id: 42,
        customer: "customer-0001".to_string(),
        lines: (0..16)
            .map(|i| Line {
                sku: format!("sku-{i:04}"),
                quantity: i,
                price_cents: u64::from(i) * 199,
            })
            .collect(),
        note: Some("leave at the door".to_string()),
    }
}

fn service(serializer: Serializer<Order>) -> SerializationService {
    SerializationService::builder()
        .with_config(SerializationConfig::new().add_serializer(serializer))
        .build()
        .unwrap()
}

fn criterion_benchmark(c: &mut Criterion) {
    let value = order();

    let services = [
        (
            "msgpack byte-array",
            service(Serializer::byte_array(CodecSerializer::<Order, _>::new(BinaryCodec {}, 1))),
        ),
        (
            "msgpack stream",
            service(Serializer::stream(CodecStreamSerializer::<Order, _>::new(BinaryCodec {}, 1))),
        ),
        (
            "json byte-array",
            service(Serializer::byte_array(CodecSerializer::<Order, _>::new(NaiveCodec {}, 1))),
        ),
        (
            "json stream",
            service(Serializer::stream(CodecStreamSerializer::<Order, _>::new(NaiveCodec {}, 1))),
        ),
    ];

    for (name, service) in &services {
        c.bench_function(&format!("{name} to_data"), |b| {
            b.iter(|| black_box(service.to_data(&value)))
        });

        let data = service.to_data(&value).unwrap();
        c.bench_function(&format!("{name} to_object"), |b| {
            b.iter(|| black_box(service.to_object::<Order>(&data)))
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
