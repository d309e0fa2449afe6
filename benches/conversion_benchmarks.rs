//! Performance benchmarks for the value engine and wrapper protocols.
//!
//! Measures the hot paths scripts hit on every access:
//! - Scalar conversion in both directions
//! - Struct and container conversion (element count as throughput)
//! - Attribute reads and writes through object wrappers
//! - Wrapper type generation for a module
//!
//! ```bash
//! cargo bench --bench conversion_benchmarks
//! ```

use criterion::{BatchSize, Criterion, Throughput, criterion_group, criterion_main};
use scriptbridge::{Bridge, BridgeConfig, ErrorMode, ScriptValue};
use scriptbridge_core::{ClassEntry, NativeValue, PropertyDescriptor, PropertyKind, StructEntry, TypeHash};
use std::hint::black_box;

struct Fixture {
    bridge: Bridge,
    player: TypeHash,
    point: TypeHash,
}

fn fixture() -> Fixture {
    let mut bridge = Bridge::new(BridgeConfig::default().with_notifications(false));
    let point = bridge
        .reflection_mut()
        .register_struct(
            StructEntry::new("Point", "Bench")
                .with_property(PropertyDescriptor::editable("X", PropertyKind::F32))
                .with_property(PropertyDescriptor::editable("Y", PropertyKind::F32))
                .with_property(PropertyDescriptor::editable("Z", PropertyKind::F32)),
        )
        .unwrap();
    let player = bridge
        .reflection_mut()
        .register_class(
            ClassEntry::new("Player", "Bench")
                .with_property(PropertyDescriptor::editable("Health", PropertyKind::I32))
                .with_property(PropertyDescriptor::editable("Location", PropertyKind::Struct { struct_type: point }))
                .with_property(PropertyDescriptor::editable("Scores", PropertyKind::array(PropertyKind::I32))),
        )
        .unwrap();
    Fixture { bridge, player, point }
}

fn scalar_benchmarks(c: &mut Criterion) {
    let mut fx = fixture();
    let mut group = c.benchmark_group("convert/scalar");

    group.bench_function("nativize_i32", |b| {
        b.iter(|| {
            fx.bridge
                .nativize(black_box(&ScriptValue::Int(42)), &PropertyKind::I32, ErrorMode::Set)
                .unwrap()
        })
    });
    group.bench_function("scriptize_f64", |b| {
        b.iter(|| {
            fx.bridge
                .scriptize(black_box(&NativeValue::F64(1.5)), &PropertyKind::F64, ErrorMode::Set)
                .unwrap()
        })
    });
    group.bench_function("nativize_str", |b| {
        let value = ScriptValue::from("a moderately long player name");
        b.iter(|| fx.bridge.nativize(black_box(&value), &PropertyKind::Str, ErrorMode::Set).unwrap())
    });

    group.finish();
}

fn compound_benchmarks(c: &mut Criterion) {
    let mut fx = fixture();
    let mut group = c.benchmark_group("convert/compound");

    let point = PropertyKind::Struct { struct_type: fx.point };
    let tuple = ScriptValue::Tuple(vec![1.0.into(), 2.0.into(), 3.0.into()]);
    group.bench_function("nativize_struct_tuple", |b| {
        b.iter(|| fx.bridge.nativize(black_box(&tuple), &point, ErrorMode::Set).unwrap())
    });

    for size in [16usize, 256, 4096] {
        let list = ScriptValue::List((0..size as i64).map(ScriptValue::Int).collect());
        let kind = PropertyKind::array(PropertyKind::I32);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("nativize_array_{size}"), |b| {
            b.iter(|| fx.bridge.nativize(black_box(&list), &kind, ErrorMode::Set).unwrap())
        });
    }

    group.finish();
}

fn wrapper_benchmarks(c: &mut Criterion) {
    let mut fx = fixture();
    let player = fx.bridge.new_object(fx.player).unwrap();
    let mut group = c.benchmark_group("wrapper/attributes");

    group.bench_function("get_int", |b| b.iter(|| fx.bridge.get_attr(black_box(&player), "health").unwrap()));
    group.bench_function("set_int", |b| {
        let value = ScriptValue::Int(75);
        b.iter(|| fx.bridge.set_attr(black_box(&player), "health", &value).unwrap())
    });
    group.bench_function("get_struct_field", |b| {
        b.iter(|| {
            let location = fx.bridge.get_attr(black_box(&player), "location").unwrap();
            fx.bridge.get_attr(&location, "x").unwrap()
        })
    });
    group.bench_function("array_append", |b| {
        let scores = fx.bridge.get_attr(&player, "scores").unwrap();
        b.iter(|| {
            fx.bridge.clear(&scores).unwrap();
            for n in 0..32 {
                fx.bridge.append(&scores, &ScriptValue::Int(n)).unwrap();
            }
        })
    });

    group.finish();
}

fn generation_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("types/generation");

    group.bench_function("load_module", |b| {
        b.iter_batched(fixture, |mut fx| fx.bridge.load_module("Bench"), BatchSize::SmallInput)
    });

    group.finish();
}

criterion_group!(
    benches,
    scalar_benchmarks,
    compound_benchmarks,
    wrapper_benchmarks,
    generation_benchmarks
);
criterion_main!(benches);
