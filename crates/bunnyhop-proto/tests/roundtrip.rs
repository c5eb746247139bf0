//! Round-trip properties for the wire codec: encode then decode should
//! always hand back the original value, for any value the grammar allows.

use bunnyhop_proto::{BasicProperties, Decimal, FieldTable, Frame, Reader, Value, Writer};
use proptest::prelude::*;

fn arb_table_key() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9_.]{0,20}"
}

fn arb_scalar_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Boolean),
        any::<i8>().prop_map(Value::ShortShortInt),
        any::<u8>().prop_map(Value::ShortShortUint),
        any::<i16>().prop_map(Value::ShortInt),
        any::<u16>().prop_map(Value::ShortUint),
        any::<i32>().prop_map(Value::LongInt),
        any::<u32>().prop_map(Value::LongUint),
        any::<i64>().prop_map(Value::LongLongInt),
        any::<f32>().prop_filter("finite", |f| f.is_finite()).prop_map(Value::Float),
        any::<f64>().prop_filter("finite", |f| f.is_finite()).prop_map(Value::Double),
        "[ -~]{0,64}".prop_map(Value::LongString),
        (0u64..8_640_000_000_000).prop_map(Value::Timestamp),
        Just(Value::Void),
        prop::collection::vec(any::<u8>(), 0..32).prop_map(Value::Binary),
    ]
}

fn arb_field_table() -> impl Strategy<Value = FieldTable> {
    prop::collection::vec((arb_table_key(), arb_scalar_value()), 0..8)
        .prop_map(|entries| entries.into_iter().collect())
}

proptest! {
    #[test]
    fn frame_round_trips(channel in any::<u16>(), payload in prop::collection::vec(any::<u8>(), 0..256)) {
        let frame = Frame::method(channel, payload.into());
        let encoded = frame.encode();
        let decoded = Frame::decode(&encoded).expect("decode");
        prop_assert_eq!(decoded, frame);
    }

    #[test]
    fn field_table_round_trips(table in arb_field_table()) {
        let mut writer = Writer::growable();
        writer.table(&table);
        let bytes = writer.into_bytes();
        let mut reader = Reader::new(&bytes);
        let decoded = reader.table("table").expect("decode");
        prop_assert_eq!(decoded, table);
    }

    #[test]
    fn decimal_round_trips_through_reader_writer(scale in any::<u8>(), unscaled in any::<u32>()) {
        let decimal = Decimal { scale, unscaled };
        let mut writer = Writer::growable();
        writer.decimal(&decimal);
        let bytes = writer.into_bytes();
        let mut reader = Reader::new(&bytes);
        let decoded = reader.decimal("decimal").expect("decode");
        prop_assert_eq!(decoded, decimal);
    }

    #[test]
    fn timestamp_round_trips_within_range(seconds in 0u64..8_640_000_000_000) {
        let mut writer = Writer::growable();
        writer.timestamp(seconds);
        let bytes = writer.into_bytes();
        let mut reader = Reader::new(&bytes);
        let decoded = reader.timestamp("ts").expect("decode");
        prop_assert_eq!(decoded, seconds);
    }

    #[test]
    fn timestamp_beyond_range_is_rejected(excess in 1u64..1_000_000) {
        let seconds = 8_640_000_000_000 + excess;
        let mut writer = Writer::growable();
        writer.timestamp(seconds);
        let bytes = writer.into_bytes();
        let mut reader = Reader::new(&bytes);
        prop_assert!(reader.timestamp("ts").is_err());
    }

    #[test]
    fn basic_properties_round_trip(
        content_type in proptest::option::of("[ -~]{0,32}"),
        delivery_mode in proptest::option::of(1u8..=2),
        priority in proptest::option::of(0u8..=9),
        timestamp in proptest::option::of(0u64..8_640_000_000_000),
    ) {
        let props = BasicProperties {
            content_type,
            delivery_mode,
            priority,
            timestamp,
            ..BasicProperties::default()
        };
        let mut writer = Writer::growable();
        props.encode(&mut writer).expect("encode");
        let bytes = writer.into_bytes();
        let mut reader = Reader::new(&bytes);
        let decoded = BasicProperties::decode(&mut reader, "properties").expect("decode");
        prop_assert_eq!(decoded, props);
    }
}
