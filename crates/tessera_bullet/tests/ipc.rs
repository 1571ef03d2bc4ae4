use tessera_bullet::array::Array;
use tessera_bullet::batch::{Batch, BatchBuilder};
use tessera_bullet::builder::{
    ArrayBuilder, BooleanBuilder, Float64Builder, ListBuilder, StringBuilder, StructBuilder,
    Time64Builder, TimestampBuilder, UInt8Builder,
};
use tessera_bullet::datatype::{DataType, TimeUnit};
use tessera_bullet::field::{Field, Schema, SchemaBuilder};
use tessera_bullet::ipc::writer::StreamWriter;
use tessera_bullet::ipc::{
    read_file, read_stream, write_file, write_stream, IpcConfig, WriterInfo,
};
use tessera_bullet::scalar::ScalarValue;
use tessera_bullet::testutil::assert_batches_eq;
use tessera_error::ErrorKind;

fn init_logging() {
    logutil::configure_global_logger(tracing::Level::DEBUG, logutil::LogFormat::HumanReadable);
}

/// Bool and string columns, five rows with a null in each.
fn bool_string_batch() -> Batch {
    let mut bools = BooleanBuilder::new();
    for v in [Some(true), Some(false), None, Some(false), Some(true)] {
        bools.append_option(v);
    }

    let mut strings = StringBuilder::new_utf8();
    for v in [Some("a"), None, Some("ccc"), Some(""), Some("eeeee")] {
        match v {
            Some(s) => strings.append_str(s).unwrap(),
            None => strings.append_null(),
        }
    }

    BatchBuilder::new()
        .add_column("one", bools.finish().unwrap())
        .add_column("two", strings.finish().unwrap())
        .finish()
        .unwrap()
}

fn nested_batch() -> Batch {
    let mut floats = Float64Builder::new();
    floats.append_value(1.5);
    floats.append_null();
    floats.append_value(-0.25);

    let mut lists = ListBuilder::try_new(DataType::Utf8).unwrap();
    lists
        .append(&[ScalarValue::from("x"), ScalarValue::Null])
        .unwrap();
    lists.append(&[]).unwrap();
    lists.append_null();

    let point_fields = vec![
        Field::new("x", DataType::Int32, true),
        Field::new("label", DataType::Utf8, true),
    ];
    let mut points = StructBuilder::try_new(point_fields.clone()).unwrap();
    points
        .append(&[ScalarValue::Int32(1), ScalarValue::from("origin")])
        .unwrap();
    points.append_null();
    points
        .append(&[ScalarValue::Int32(7), ScalarValue::Null])
        .unwrap();

    let mut timestamps = TimestampBuilder::new(TimeUnit::Millisecond, Some("UTC".to_string()));
    timestamps.append_raw(1_700_000_000_000);
    timestamps.append_raw(0);
    timestamps.append_null();

    let schema = SchemaBuilder::new()
        .add_field("floats", DataType::Float64, true)
        .add_field("lists", DataType::new_list(DataType::Utf8), true)
        .add_field("points", DataType::new_struct(point_fields), true)
        .add_field("ts", timestamps.datatype().clone(), true)
        .add_metadata("source", "integration")
        .finish();

    Batch::try_new(
        schema,
        vec![
            floats.finish().unwrap(),
            lists.finish().unwrap(),
            points.finish().unwrap(),
            timestamps.finish().unwrap(),
        ],
    )
    .unwrap()
}

fn two_batch_info() -> WriterInfo {
    let first = bool_string_batch();
    let second = BatchBuilder::new()
        .with_schema(first.schema().clone())
        .add_column("one", Array::from_iter([true]))
        .add_column("two", {
            let mut b = StringBuilder::new_utf8();
            b.append_str("second").unwrap();
            b.finish().unwrap()
        })
        .finish()
        .unwrap();

    WriterInfo::record_batches(first.schema().clone(), vec![first, second])
}

#[test]
fn stream_roundtrip_bool_string() {
    init_logging();

    let batch = bool_string_batch();
    let info = WriterInfo::record_batches(batch.schema().clone(), vec![batch.clone()]);
    let data = write_stream(&info, &IpcConfig::default()).unwrap();

    let result = read_stream(&data, &IpcConfig::default()).unwrap();
    assert_eq!(1, result.batches.len());

    let got = &result.batches[0];
    assert_eq!(5, got.num_rows());
    assert_eq!(2, got.num_columns());
    assert_eq!("one", got.schema().fields[0].name);
    assert_eq!("two", got.schema().fields[1].name);
    assert_eq!(DataType::Boolean, got.schema().fields[0].datatype);
    assert_eq!(DataType::Utf8, got.schema().fields[1].datatype);

    let bools = got.column(0).unwrap();
    let formatted: Vec<_> = (0..5).map(|idx| bools.format_value(idx).unwrap()).collect();
    assert_eq!(vec!["true", "false", "", "false", "true"], formatted);

    assert_batches_eq(&batch, got);
}

#[test]
fn stream_roundtrip_nested_and_temporal() {
    init_logging();

    let batch = nested_batch();
    let info = WriterInfo::record_batches(batch.schema().clone(), vec![batch.clone()]);
    let data = write_stream(&info, &IpcConfig::default()).unwrap();

    let result = read_stream(&data, &IpcConfig::default()).unwrap();
    assert_eq!(batch.schema(), &result.schema);
    assert_eq!("integration", result.schema.metadata["source"]);
    assert_eq!(vec![batch], result.batches);
}

#[test]
fn file_roundtrip_with_random_access() {
    init_logging();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("batches.arrow");

    let info = two_batch_info();
    write_file(&path, &info, &IpcConfig::default()).unwrap();

    let result = read_file(&path, &IpcConfig::default()).unwrap();
    assert_eq!(info.schema, result.schema);
    assert_eq!(info.batches, result.batches);

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(b"ARROW1", &bytes[..6]);
    assert_eq!(b"ARROW1", &bytes[bytes.len() - 6..]);
}

#[test]
fn file_and_stream_agree() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested.arrow");

    let batch = nested_batch();
    let info = WriterInfo::record_batches(batch.schema().clone(), vec![batch]);

    write_file(&path, &info, &IpcConfig::default()).unwrap();
    let from_file = read_file(&path, &IpcConfig::default()).unwrap();

    let data = write_stream(&info, &IpcConfig::default()).unwrap();
    let from_stream = read_stream(&data, &IpcConfig::default()).unwrap();

    assert_eq!(from_file, from_stream);
}

#[test]
fn uint8_values() {
    let mut builder = UInt8Builder::new();
    for v in [10, 22, 33, 44] {
        builder.append_value(v);
    }
    let batch = BatchBuilder::new()
        .add_column("small", builder.finish().unwrap())
        .finish()
        .unwrap();
    assert!(!batch.schema().fields[0].nullable);

    let info = WriterInfo::record_batches(batch.schema().clone(), vec![batch]);
    let data = write_stream(&info, &IpcConfig::default()).unwrap();
    let result = read_stream(&data, &IpcConfig::default()).unwrap();

    let col = result.batches[0].column(0).unwrap();
    let vals: Vec<_> = (0..4).map(|idx| col.scalar(idx).unwrap()).collect();
    assert_eq!(
        vec![
            ScalarValue::UInt8(10),
            ScalarValue::UInt8(22),
            ScalarValue::UInt8(33),
            ScalarValue::UInt8(44)
        ],
        vals
    );
}

#[test]
fn time_values_written_under_other_unit() {
    let mut builder = Time64Builder::try_new(TimeUnit::Nanosecond).unwrap();
    builder.append_raw(12345678);
    builder.append_raw(1);
    builder.append_null();
    builder.append_raw(98765432);

    let schema = Schema::new([Field::new(
        "t",
        DataType::Time64(TimeUnit::Microsecond),
        true,
    )]);
    let batch = Batch::try_new(schema.clone(), vec![builder.finish().unwrap()]).unwrap();

    let info = WriterInfo::record_batches(schema, vec![batch]);
    let data = write_stream(&info, &IpcConfig::default()).unwrap();
    let result = read_stream(&data, &IpcConfig::default()).unwrap();

    // Values are carried as-is, the stream schema decides the unit.
    let col = result.batches[0].column(0).unwrap();
    assert_eq!(&DataType::Time64(TimeUnit::Microsecond), col.datatype());
    assert_eq!(1, col.null_count());
    assert_eq!(Some(true), col.is_null(2));
    assert_eq!(ScalarValue::Time64(12345678), col.scalar(0).unwrap());
    assert_eq!(ScalarValue::Time64(1), col.scalar(1).unwrap());
    assert_eq!(ScalarValue::Time64(98765432), col.scalar(3).unwrap());
}

#[test]
fn schema_only() {
    let schema = Schema::new([Field::new("a", DataType::Int64, true)]);
    let info = WriterInfo::schema_only(schema.clone());

    let data = write_stream(&info, &IpcConfig::default()).unwrap();
    let result = read_stream(&data, &IpcConfig::default()).unwrap();
    assert_eq!(schema, result.schema);
    assert!(result.batches.is_empty());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schema.arrow");
    write_file(&path, &info, &IpcConfig::default()).unwrap();
    let result = read_file(&path, &IpcConfig::default()).unwrap();
    assert_eq!(schema, result.schema);
    assert!(result.batches.is_empty());
}

#[test]
fn stream_messages_padded() {
    let info = two_batch_info();
    let data = write_stream(&info, &IpcConfig::default()).unwrap();
    assert_eq!(0, data.len() % 8);

    // Every message starts with the continuation marker at an 8 byte boundary.
    let mut writer = StreamWriter::new(Vec::new(), &IpcConfig::default());
    writer.write_schema(&info.schema).unwrap();
    let mut starts = Vec::new();
    for batch in &info.batches {
        starts.push(writer.position());
        writer.write_batch(batch).unwrap();
    }
    writer.finish().unwrap();
    let out = writer.into_inner();
    assert_eq!(data, out);

    for start in [0].into_iter().chain(starts) {
        assert_eq!(0, start % 8);
        assert_eq!(&[0xff, 0xff, 0xff, 0xff], &out[start..start + 4]);
    }
}

#[test]
fn truncated_after_first_batch() {
    init_logging();

    let info = two_batch_info();
    let mut writer = StreamWriter::new(Vec::new(), &IpcConfig::default());
    writer.write_schema(&info.schema).unwrap();
    writer.write_batch(&info.batches[0]).unwrap();
    let first_end = writer.position();
    writer.write_batch(&info.batches[1]).unwrap();
    writer.finish().unwrap();
    let data = writer.into_inner();

    // Cut exactly after the first batch message.
    let err = read_stream(&data[..first_end], &IpcConfig::default()).unwrap_err();
    assert_eq!(ErrorKind::CorruptStream, err.error.kind());
    assert_eq!(Some(&info.schema), err.schema.as_ref());
    assert_eq!(1, err.batches.len());
    assert_eq!(info.batches[0], err.batches[0]);

    // Cut in the middle of the second batch message.
    let err = read_stream(&data[..first_end + 12], &IpcConfig::default()).unwrap_err();
    assert_eq!(ErrorKind::CorruptStream, err.error.kind());
    assert_eq!(1, err.batches.len());

    // Without requiring the end-of-stream marker the first cut is a clean end.
    let conf = IpcConfig {
        require_end_of_stream: false,
        ..Default::default()
    };
    let result = read_stream(&data[..first_end], &conf).unwrap();
    assert_eq!(1, result.batches.len());
}

#[test]
fn truncated_before_schema() {
    let info = two_batch_info();
    let data = write_stream(&info, &IpcConfig::default()).unwrap();

    let err = read_stream(&data[..6], &IpcConfig::default()).unwrap_err();
    assert_eq!(ErrorKind::CorruptStream, err.error.kind());
    assert!(err.schema.is_none());
    assert!(err.batches.is_empty());
}

#[test]
fn non_monotonic_offsets() {
    let mut builder = StringBuilder::new_utf8();
    builder.append_str("ab").unwrap();
    builder.append_str("cd").unwrap();
    let batch = BatchBuilder::new()
        .add_column("s", builder.finish().unwrap())
        .finish()
        .unwrap();

    let info = WriterInfo::record_batches(batch.schema().clone(), vec![batch]);
    let mut data = write_stream(&info, &IpcConfig::default()).unwrap();

    // Body is [offsets: 12 bytes + 4 pad][values: 4 bytes + 4 pad], followed
    // by the 8 byte end-of-stream marker.
    let body_start = data.len() - 8 - 24;
    assert_eq!(
        &[0, 0, 0, 0, 2, 0, 0, 0, 4, 0, 0, 0],
        &data[body_start..body_start + 12]
    );
    data[body_start + 4..body_start + 8].copy_from_slice(&5i32.to_le_bytes());

    let err = read_stream(&data, &IpcConfig::default()).unwrap_err();
    assert_eq!(ErrorKind::CorruptStream, err.error.kind());
    assert!(err.batches.is_empty());
    assert!(err.schema.is_some());
}

#[test]
fn bad_file_magic() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.arrow");

    write_file(&path, &two_batch_info(), &IpcConfig::default()).unwrap();
    let mut bytes = std::fs::read(&path).unwrap();
    let len = bytes.len();
    bytes[len - 1] = b'0';
    std::fs::write(&path, &bytes).unwrap();

    let err = read_file(&path, &IpcConfig::default()).unwrap_err();
    assert_eq!(ErrorKind::CorruptStream, err.error.kind());
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = read_file(dir.path().join("missing.arrow"), &IpcConfig::default()).unwrap_err();
    assert_eq!(ErrorKind::Io, err.error.kind());
}

#[test]
fn writer_state_errors() {
    let info = two_batch_info();

    let mut writer = StreamWriter::new(Vec::new(), &IpcConfig::default());
    let err = writer.write_batch(&info.batches[0]).unwrap_err();
    assert_eq!(ErrorKind::UnexpectedMessage, err.kind());

    writer.write_schema(&info.schema).unwrap();
    let err = writer.write_schema(&info.schema).unwrap_err();
    assert_eq!(ErrorKind::UnexpectedMessage, err.kind());

    writer.finish().unwrap();
    let err = writer.write_batch(&info.batches[0]).unwrap_err();
    assert_eq!(ErrorKind::WriterClosed, err.kind());
}
