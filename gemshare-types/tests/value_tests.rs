use gemshare_types::{HostValue, NodeId, UNKNOWN_READING, ValueType};

#[test]
fn numeric_types() {
    for t in [
        ValueType::I8,
        ValueType::I32,
        ValueType::U64,
        ValueType::F32,
        ValueType::F64,
        ValueType::Decimal,
    ] {
        assert!(t.is_numeric(), "{t:?}");
    }
    for t in [ValueType::Bool, ValueType::Text, ValueType::Reference, ValueType::Other] {
        assert!(!t.is_numeric(), "{t:?}");
    }
}

#[test]
fn integer_types_exclude_floats() {
    assert!(ValueType::I32.is_integer());
    assert!(ValueType::U8.is_integer());
    assert!(!ValueType::F32.is_integer());
    assert!(!ValueType::Decimal.is_integer());
}

#[test]
fn every_numeric_representation_coerces_to_f64() {
    assert_eq!(HostValue::from(42i32).as_f64(), Some(42.0));
    assert_eq!(HostValue::from(7u64).as_f64(), Some(7.0));
    assert_eq!(HostValue::from(2.5f32).as_f64(), Some(2.5));
    assert_eq!(HostValue::Int(-3).as_f64(), Some(-3.0));
}

#[test]
fn non_numeric_reads_as_sentinel() {
    assert_eq!(HostValue::Text("100".into()).reading(), UNKNOWN_READING);
    assert_eq!(HostValue::Bool(true).reading(), UNKNOWN_READING);
    assert_eq!(HostValue::Null.reading(), UNKNOWN_READING);
    assert_eq!(HostValue::Reference(NodeId::new()).reading(), UNKNOWN_READING);
    assert_eq!(HostValue::Float(f64::NAN).reading(), UNKNOWN_READING);
}

#[test]
fn as_i64_rejects_floats_and_overflow() {
    assert_eq!(HostValue::Int(1).as_i64(), Some(1));
    assert_eq!(HostValue::UInt(u64::MAX).as_i64(), None);
    assert_eq!(HostValue::Float(1.0).as_i64(), None);
}
