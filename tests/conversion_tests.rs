//! Value engine tests: scalar rules, references, structs and error reporting.


use proptest::prelude::*;
use scriptbridge::{Bridge, BridgeConfig, ErrorMode, ScriptErrorKind, ScriptValue};
use scriptbridge_core::{NativeValue, NumericKind, PropertyKind, StructValue, Text};
use test_harness::TestHarness;

fn roundtrip(bridge: &mut Bridge, value: &ScriptValue, kind: &PropertyKind) -> ScriptValue {
    let native = bridge.nativize(value, kind, ErrorMode::Set).unwrap();
    bridge.scriptize(&native, kind, ErrorMode::Set).unwrap()
}

// ============================================================================
// Scalar properties
// ============================================================================

proptest! {
    #[test]
    fn int32_roundtrips(v in any::<i32>()) {
        let mut bridge = Bridge::new(BridgeConfig::default());
        let value = ScriptValue::Int(i64::from(v));
        prop_assert_eq!(roundtrip(&mut bridge, &value, &PropertyKind::I32), value);
    }

    #[test]
    fn uint64_keeps_its_bits(v in any::<u64>()) {
        let mut bridge = Bridge::new(BridgeConfig::default());
        let script = bridge.scriptize(&NativeValue::U64(v), &PropertyKind::U64, ErrorMode::Set).unwrap();
        prop_assert_eq!(&script, &ScriptValue::Int(v as i64));
        let native = bridge.nativize(&script, &PropertyKind::U64, ErrorMode::Set).unwrap();
        prop_assert_eq!(native, NativeValue::U64(v));
    }

    #[test]
    fn byte_wraps_like_a_cast(v in any::<i64>()) {
        let mut bridge = Bridge::new(BridgeConfig::default());
        let native = bridge.nativize(&ScriptValue::Int(v), &PropertyKind::U8, ErrorMode::Set).unwrap();
        prop_assert_eq!(native, NativeValue::U8(v as u8));
    }

    #[test]
    fn floats_truncate_into_ints(f in -1.0e6f64..1.0e6) {
        let mut bridge = Bridge::new(BridgeConfig::default());
        let native = bridge.nativize(&ScriptValue::Float(f), &PropertyKind::I32, ErrorMode::Set).unwrap();
        prop_assert_eq!(native, NativeValue::I32(f.trunc() as i32));
    }

    #[test]
    fn doubles_roundtrip(f in proptest::num::f64::NORMAL) {
        let mut bridge = Bridge::new(BridgeConfig::default());
        let value = ScriptValue::Float(f);
        prop_assert_eq!(roundtrip(&mut bridge, &value, &PropertyKind::F64), value);
    }

    #[test]
    fn small_ints_roundtrip(a in any::<i8>(), b in any::<i16>(), c in any::<u16>(), d in any::<u32>()) {
        let mut bridge = Bridge::new(BridgeConfig::default());
        let cases = [
            (i64::from(a), PropertyKind::I8, NativeValue::I8(a)),
            (i64::from(b), PropertyKind::I16, NativeValue::I16(b)),
            (i64::from(c), PropertyKind::U16, NativeValue::U16(c)),
            (i64::from(d), PropertyKind::U32, NativeValue::U32(d)),
        ];
        for (v, kind, expected) in cases {
            let value = ScriptValue::Int(v);
            let native = bridge.nativize(&value, &kind, ErrorMode::Set).unwrap();
            prop_assert_eq!(&native, &expected);
            prop_assert_eq!(bridge.scriptize(&native, &kind, ErrorMode::Set).unwrap(), value);
        }
    }

    #[test]
    fn int64_roundtrips(v in any::<i64>()) {
        let mut bridge = Bridge::new(BridgeConfig::default());
        let value = ScriptValue::Int(v);
        prop_assert_eq!(roundtrip(&mut bridge, &value, &PropertyKind::I64), value);
    }

    #[test]
    fn floats_roundtrip_at_single_precision(f in proptest::num::f32::NORMAL) {
        let mut bridge = Bridge::new(BridgeConfig::default());
        let value = ScriptValue::Float(f64::from(f));
        let native = bridge.nativize(&value, &PropertyKind::F32, ErrorMode::Set).unwrap();
        prop_assert_eq!(&native, &NativeValue::F32(f));
        prop_assert_eq!(bridge.scriptize(&native, &PropertyKind::F32, ErrorMode::Set).unwrap(), value);
    }

    #[test]
    fn names_keep_their_spelling(s in "[A-Za-z_][A-Za-z0-9_]{0,15}") {
        let mut bridge = Bridge::new(BridgeConfig::default());
        let native = bridge.nativize(&ScriptValue::Str(s.clone()), &PropertyKind::Name, ErrorMode::Set).unwrap();
        let wrapped = bridge.scriptize(&native, &PropertyKind::Name, ErrorMode::Set).unwrap();
        let back = bridge.nativize(&wrapped, &PropertyKind::Str, ErrorMode::Set).unwrap();
        prop_assert_eq!(back, NativeValue::Str(s));
    }

    #[test]
    fn invariant_texts_roundtrip(s in ".*") {
        let mut bridge = Bridge::new(BridgeConfig::default());
        let native = bridge.nativize(&ScriptValue::Str(s.clone()), &PropertyKind::Text, ErrorMode::Set).unwrap();
        prop_assert_eq!(&native, &NativeValue::Text(Text::invariant(s.clone())));
        let wrapped = bridge.scriptize(&native, &PropertyKind::Text, ErrorMode::Set).unwrap();
        prop_assert_eq!(bridge.nativize(&wrapped, &PropertyKind::Text, ErrorMode::Set).unwrap(), native);
        prop_assert_eq!(bridge.nativize(&wrapped, &PropertyKind::Str, ErrorMode::Set).unwrap(), NativeValue::Str(s));
    }

    #[test]
    fn strings_roundtrip(s in ".*") {
        let mut bridge = Bridge::new(BridgeConfig::default());
        let value = ScriptValue::Str(s);
        prop_assert_eq!(roundtrip(&mut bridge, &value, &PropertyKind::Str), value);
    }
}

#[test]
fn test_bool_rules() {
    let mut bridge = Bridge::new(BridgeConfig::default());
    let kind = PropertyKind::Bool;
    assert_eq!(bridge.nativize(&ScriptValue::None, &kind, ErrorMode::Set), Ok(NativeValue::Bool(false)));
    assert_eq!(bridge.nativize(&ScriptValue::Int(3), &kind, ErrorMode::Set), Ok(NativeValue::Bool(true)));
    assert!(bridge.nativize(&ScriptValue::Float(1.0), &kind, ErrorMode::Silent).is_err());
    assert_eq!(bridge.scriptize(&NativeValue::Bool(true), &kind, ErrorMode::Set), Ok(ScriptValue::Bool(true)));
}

#[test]
fn test_text_and_names_scriptize_as_wrappers() {
    let mut bridge = Bridge::new(BridgeConfig::default());
    let text = bridge
        .scriptize(&NativeValue::Text(Text::localized("Start")), &PropertyKind::Text, ErrorMode::Set)
        .unwrap();
    assert_eq!(text.as_wrapper().and_then(|w| w.text_value()), Some(Text::localized("Start")));
    assert_eq!(text.to_string(), "'Start'");

    let name = bridge.nativize(&ScriptValue::from("Hero"), &PropertyKind::Name, ErrorMode::Set).unwrap();
    let back = bridge.scriptize(&name, &PropertyKind::Name, ErrorMode::Set).unwrap();
    let as_string = bridge.nativize(&back, &PropertyKind::Str, ErrorMode::Set).unwrap();
    assert_eq!(as_string, NativeValue::Str("Hero".to_string()));
}

// ============================================================================
// Enums, references and structs
// ============================================================================

#[test]
fn test_enum_labels_and_values() {
    let mut harness = TestHarness::new();
    let kind = PropertyKind::Enum {
        enum_type: harness.kind,
        underlying: NumericKind::U8,
    };
    let bridge = &mut harness.bridge;
    assert_eq!(bridge.nativize(&"Bike".into(), &kind, ErrorMode::Set), Ok(NativeValue::U8(1)));
    assert_eq!(bridge.nativize(&ScriptValue::Int(0), &kind, ErrorMode::Set), Ok(NativeValue::U8(0)));

    let err = bridge.nativize(&"Boat".into(), &kind, ErrorMode::Set).unwrap_err();
    assert_eq!(err.to_string(), "Nativize: Cannot nativize 'str' as 'VehicleKind'");
}

#[test]
fn test_object_references_respect_hierarchy() {
    let mut harness = TestHarness::new();
    let truck = harness.bridge.new_object(harness.truck).unwrap();
    let vehicle = harness.new_vehicle();
    let bridge = &mut harness.bridge;

    let as_vehicle = PropertyKind::Object { class: harness.vehicle };
    let as_truck = PropertyKind::Object { class: harness.truck };
    let handle = truck.as_wrapper().and_then(|w| w.object_handle()).unwrap();

    assert_eq!(bridge.nativize(&truck, &as_vehicle, ErrorMode::Set), Ok(NativeValue::Object(Some(handle))));
    assert!(bridge.nativize(&vehicle, &as_truck, ErrorMode::Silent).is_err());
    assert!(bridge.nativize(&ScriptValue::Int(1), &as_vehicle, ErrorMode::Silent).is_err());

    let back = bridge
        .scriptize(&NativeValue::Object(Some(handle)), &as_vehicle, ErrorMode::Set)
        .unwrap();
    assert_eq!(back, truck);

    bridge.destroy_object(handle);
    assert_eq!(
        bridge.scriptize(&NativeValue::Object(Some(handle)), &as_vehicle, ErrorMode::Set),
        Ok(ScriptValue::None)
    );
}

#[test]
fn test_class_references_take_wrapper_types() {
    let mut harness = TestHarness::new();
    let truck_type = harness.bridge.wrapper_type(harness.truck).unwrap();
    let vector_type = harness.bridge.wrapper_type(harness.vector).unwrap();
    let kind = PropertyKind::Class { meta_class: harness.vehicle };
    let bridge = &mut harness.bridge;

    let native = bridge.nativize(&ScriptValue::Type(truck_type), &kind, ErrorMode::Set).unwrap();
    assert_eq!(native, NativeValue::Class(Some(harness.truck)));
    assert_eq!(bridge.scriptize(&native, &kind, ErrorMode::Set), Ok(ScriptValue::Type(truck_type)));

    let err = bridge.nativize(&ScriptValue::Type(vector_type), &kind, ErrorMode::Set).unwrap_err();
    assert_eq!(err.to_string(), "Nativize: Cannot nativize 'type' as 'class<Vehicle>'");
}

#[test]
fn test_struct_values_copy_out() {
    let mut harness = TestHarness::new();
    let kind = PropertyKind::Struct { struct_type: harness.vector };
    let bridge = &mut harness.bridge;

    let native = bridge
        .nativize(&ScriptValue::Dict(vec![("x".into(), 1.5.into())]), &kind, ErrorMode::Set)
        .unwrap();
    assert_eq!(
        native,
        NativeValue::Struct(StructValue {
            struct_type: harness.vector,
            fields: vec![NativeValue::F32(1.5), NativeValue::F32(0.0)],
        })
    );

    let copy = bridge.scriptize(&native, &kind, ErrorMode::Set).unwrap();
    bridge.set_attr(&copy, "y", &ScriptValue::Float(4.0)).unwrap();
    assert_eq!(bridge.get_attr(&copy, "y"), Ok(ScriptValue::Float(4.0)));
    let edited = bridge.nativize(&copy, &kind, ErrorMode::Set).unwrap();
    assert_ne!(edited, native);
    assert!(harness.events.borrow().is_empty());
}

// ============================================================================
// Error reporting
// ============================================================================

#[test]
fn test_failures_chain_in_the_runtime() {
    let mut harness = TestHarness::new();
    let kind = PropertyKind::Struct { struct_type: harness.vector };
    let bridge = &mut harness.bridge;

    let err = bridge
        .nativize(&ScriptValue::List(vec![1.into(), "up".into()]), &kind, ErrorMode::Set)
        .unwrap_err();
    assert_eq!(err.script_kind(), ScriptErrorKind::TypeError);

    let pending = bridge.runtime().error().unwrap().clone();
    assert_eq!(pending.kind, ScriptErrorKind::TypeError);
    assert_eq!(pending.message, "Nativize: Failed to convert field 'Y' (FloatProperty)");
    assert_eq!(pending.root().message, "Nativize: Cannot nativize 'str' as 'FloatProperty'");

    bridge.runtime_mut().clear_error();
    assert!(bridge.nativize(&"up".into(), &PropertyKind::F32, ErrorMode::Silent).is_err());
    assert!(!bridge.runtime().has_error());
}

#[test]
fn test_sequences_need_matching_containers() {
    let mut bridge = Bridge::new(BridgeConfig::default());
    let kind = PropertyKind::array(PropertyKind::I32);
    assert_eq!(
        bridge.nativize(&ScriptValue::Tuple(vec![1.into(), 2.5.into()]), &kind, ErrorMode::Set),
        Ok(NativeValue::Array(vec![NativeValue::I32(1), NativeValue::I32(2)]))
    );
    assert!(bridge.nativize(&ScriptValue::from("12"), &kind, ErrorMode::Silent).is_err());
    assert!(bridge.nativize(&ScriptValue::List(Vec::new()), &PropertyKind::map(PropertyKind::Str, PropertyKind::I32), ErrorMode::Silent).is_err());
}
