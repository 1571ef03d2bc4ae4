//! Conversion to/from ipc schema.
use std::collections::BTreeMap;

use flatbuffers::{FlatBufferBuilder, ForwardsUOffset, Vector, WIPOffset};
use tessera_arrow_ipc::schema::{
    Binary as IpcBinary, Bool as IpcBool, DateBuilder, DateUnit, Endianness, Field as IpcField,
    FieldBuilder as IpcFieldBuilder, FloatingPointBuilder, IntBuilder, KeyValue,
    KeyValueBuilder, LargeBinary as IpcLargeBinary, LargeUtf8 as IpcLargeUtf8, List as IpcList,
    Null as IpcNull, Precision, Schema as IpcSchema, SchemaBuilder as IpcSchemaBuilder,
    Struct_ as IpcStruct, TimeBuilder, TimeUnit as IpcTimeUnit, TimestampBuilder,
    Type as IpcType, Utf8 as IpcUtf8,
};
use tessera_error::{not_implemented, Result};

use super::message::corrupt;
use crate::datatype::{DataType, TimeUnit, TimestampTypeMeta};
use crate::field::{Field, Schema};

/// Name given to the single child field of a list.
const LIST_ITEM_NAME: &str = "item";

type IpcMetadata<'a> = WIPOffset<Vector<'a, ForwardsUOffset<KeyValue<'a>>>>;

pub(crate) fn schema_to_ipc<'a>(
    fbb: &mut FlatBufferBuilder<'a>,
    schema: &Schema,
) -> Result<WIPOffset<IpcSchema<'a>>> {
    let fields = schema
        .iter()
        .map(|f| field_to_ipc(fbb, f))
        .collect::<Result<Vec<_>>>()?;
    let fields = fbb.create_vector(&fields);
    let metadata = metadata_to_ipc(fbb, &schema.metadata);

    let mut builder = IpcSchemaBuilder::new(fbb);
    builder.add_endianness(Endianness::Little);
    builder.add_fields(fields);
    if let Some(metadata) = metadata {
        builder.add_custom_metadata(metadata);
    }

    Ok(builder.finish())
}

fn field_to_ipc<'a>(
    fbb: &mut FlatBufferBuilder<'a>,
    field: &Field,
) -> Result<WIPOffset<IpcField<'a>>> {
    // Child tables must be finished before this field's table is started.
    let children = match &field.datatype {
        DataType::List(meta) => {
            let item = Field::new(LIST_ITEM_NAME, meta.datatype.as_ref().clone(), true);
            vec![field_to_ipc(fbb, &item)?]
        }
        DataType::Struct(meta) => meta
            .fields
            .iter()
            .map(|f| field_to_ipc(fbb, f))
            .collect::<Result<Vec<_>>>()?,
        _ => Vec::new(),
    };
    let children = fbb.create_vector(&children);

    let name = fbb.create_string(&field.name);
    let metadata = metadata_to_ipc(fbb, &field.metadata);

    let (type_type, type_) = match &field.datatype {
        DataType::Null => (IpcType::Null, IpcNull::create(fbb).as_union_value()),
        DataType::Boolean => (IpcType::Bool, IpcBool::create(fbb).as_union_value()),
        DataType::Int8 => int_to_ipc(fbb, 8, true),
        DataType::Int16 => int_to_ipc(fbb, 16, true),
        DataType::Int32 => int_to_ipc(fbb, 32, true),
        DataType::Int64 => int_to_ipc(fbb, 64, true),
        DataType::UInt8 => int_to_ipc(fbb, 8, false),
        DataType::UInt16 => int_to_ipc(fbb, 16, false),
        DataType::UInt32 => int_to_ipc(fbb, 32, false),
        DataType::UInt64 => int_to_ipc(fbb, 64, false),
        DataType::Float32 => float_to_ipc(fbb, Precision::SINGLE),
        DataType::Float64 => float_to_ipc(fbb, Precision::DOUBLE),
        DataType::Utf8 => (IpcType::Utf8, IpcUtf8::create(fbb).as_union_value()),
        DataType::LargeUtf8 => (
            IpcType::LargeUtf8,
            IpcLargeUtf8::create(fbb).as_union_value(),
        ),
        DataType::Binary => (IpcType::Binary, IpcBinary::create(fbb).as_union_value()),
        DataType::LargeBinary => (
            IpcType::LargeBinary,
            IpcLargeBinary::create(fbb).as_union_value(),
        ),
        DataType::Date32 => date_to_ipc(fbb, DateUnit::DAY),
        DataType::Date64 => date_to_ipc(fbb, DateUnit::MILLISECOND),
        DataType::Time32(unit) => time_to_ipc(fbb, *unit, 32),
        DataType::Time64(unit) => time_to_ipc(fbb, *unit, 64),
        DataType::Timestamp(meta) => {
            let timezone = meta.timezone.as_ref().map(|tz| fbb.create_string(tz));
            let mut builder = TimestampBuilder::new(fbb);
            builder.add_unit(time_unit_to_ipc(meta.unit));
            if let Some(timezone) = timezone {
                builder.add_timezone(timezone);
            }
            (IpcType::Timestamp, builder.finish().as_union_value())
        }
        DataType::List(_) => (IpcType::List, IpcList::create(fbb).as_union_value()),
        DataType::Struct(_) => (IpcType::Struct_, IpcStruct::create(fbb).as_union_value()),
    };

    let mut builder = IpcFieldBuilder::new(fbb);
    builder.add_name(name);
    builder.add_nullable(field.nullable);
    builder.add_type_type(type_type);
    builder.add_type_(type_);
    builder.add_children(children);
    if let Some(metadata) = metadata {
        builder.add_custom_metadata(metadata);
    }

    Ok(builder.finish())
}

fn int_to_ipc(
    fbb: &mut FlatBufferBuilder<'_>,
    bit_width: i32,
    is_signed: bool,
) -> (IpcType, WIPOffset<flatbuffers::UnionWIPOffset>) {
    let mut builder = IntBuilder::new(fbb);
    builder.add_bitWidth(bit_width);
    builder.add_is_signed(is_signed);
    (IpcType::Int, builder.finish().as_union_value())
}

fn float_to_ipc(
    fbb: &mut FlatBufferBuilder<'_>,
    precision: Precision,
) -> (IpcType, WIPOffset<flatbuffers::UnionWIPOffset>) {
    let mut builder = FloatingPointBuilder::new(fbb);
    builder.add_precision(precision);
    (IpcType::FloatingPoint, builder.finish().as_union_value())
}

fn date_to_ipc(
    fbb: &mut FlatBufferBuilder<'_>,
    unit: DateUnit,
) -> (IpcType, WIPOffset<flatbuffers::UnionWIPOffset>) {
    let mut builder = DateBuilder::new(fbb);
    builder.add_unit(unit);
    (IpcType::Date, builder.finish().as_union_value())
}

fn time_to_ipc(
    fbb: &mut FlatBufferBuilder<'_>,
    unit: TimeUnit,
    bit_width: i32,
) -> (IpcType, WIPOffset<flatbuffers::UnionWIPOffset>) {
    let mut builder = TimeBuilder::new(fbb);
    builder.add_unit(time_unit_to_ipc(unit));
    builder.add_bitWidth(bit_width);
    (IpcType::Time, builder.finish().as_union_value())
}

fn time_unit_to_ipc(unit: TimeUnit) -> IpcTimeUnit {
    match unit {
        TimeUnit::Second => IpcTimeUnit::SECOND,
        TimeUnit::Millisecond => IpcTimeUnit::MILLISECOND,
        TimeUnit::Microsecond => IpcTimeUnit::MICROSECOND,
        TimeUnit::Nanosecond => IpcTimeUnit::NANOSECOND,
    }
}

fn metadata_to_ipc<'a>(
    fbb: &mut FlatBufferBuilder<'a>,
    metadata: &BTreeMap<String, String>,
) -> Option<IpcMetadata<'a>> {
    if metadata.is_empty() {
        return None;
    }

    let pairs: Vec<_> = metadata
        .iter()
        .map(|(k, v)| {
            let key = fbb.create_string(k);
            let value = fbb.create_string(v);
            let mut builder = KeyValueBuilder::new(fbb);
            builder.add_key(key);
            builder.add_value(value);
            builder.finish()
        })
        .collect();

    Some(fbb.create_vector(&pairs))
}

pub(crate) fn ipc_to_schema(schema: IpcSchema) -> Result<Schema> {
    if schema.endianness() != Endianness::Little {
        not_implemented!("ipc endianness {:?}", schema.endianness());
    }

    let fields = match schema.fields() {
        Some(fields) => fields
            .iter()
            .map(ipc_to_field)
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };

    Ok(Schema {
        fields,
        metadata: ipc_to_metadata(schema.custom_metadata())?,
    })
}

fn ipc_to_field(field: IpcField) -> Result<Field> {
    if field.dictionary().is_some() {
        not_implemented!("ipc dictionary encoded fields");
    }

    let name = field.name().unwrap_or_default();
    let missing_type = || corrupt("Field type table missing for its type tag");

    let datatype = match field.type_type() {
        IpcType::Null => DataType::Null,
        IpcType::Bool => DataType::Boolean,
        IpcType::Int => {
            let int_type = field.type_as_int().ok_or_else(missing_type)?;
            match (int_type.is_signed(), int_type.bitWidth()) {
                (true, 8) => DataType::Int8,
                (true, 16) => DataType::Int16,
                (true, 32) => DataType::Int32,
                (true, 64) => DataType::Int64,
                (false, 8) => DataType::UInt8,
                (false, 16) => DataType::UInt16,
                (false, 32) => DataType::UInt32,
                (false, 64) => DataType::UInt64,
                (_, other) => not_implemented!("ipc int bit width {other}"),
            }
        }
        IpcType::FloatingPoint => {
            let float_type = field.type_as_floating_point().ok_or_else(missing_type)?;
            match float_type.precision() {
                Precision::SINGLE => DataType::Float32,
                Precision::DOUBLE => DataType::Float64,
                other => not_implemented!("ipc float precision {other:?}"),
            }
        }
        IpcType::Utf8 => DataType::Utf8,
        IpcType::LargeUtf8 => DataType::LargeUtf8,
        IpcType::Binary => DataType::Binary,
        IpcType::LargeBinary => DataType::LargeBinary,
        IpcType::Date => {
            let date_type = field.type_as_date().ok_or_else(missing_type)?;
            match date_type.unit() {
                DateUnit::DAY => DataType::Date32,
                DateUnit::MILLISECOND => DataType::Date64,
                other => return Err(corrupt(&format!("Invalid date unit {other:?}"))),
            }
        }
        IpcType::Time => {
            let time_type = field.type_as_time().ok_or_else(missing_type)?;
            let unit = ipc_to_time_unit(time_type.unit())?;
            match (unit, time_type.bitWidth()) {
                (TimeUnit::Second | TimeUnit::Millisecond, 32) => DataType::Time32(unit),
                (TimeUnit::Microsecond | TimeUnit::Nanosecond, 64) => DataType::Time64(unit),
                (unit, width) => {
                    return Err(corrupt(&format!(
                        "Invalid time type, unit {unit} with bit width {width}"
                    )))
                }
            }
        }
        IpcType::Timestamp => {
            let ts_type = field.type_as_timestamp().ok_or_else(missing_type)?;
            DataType::Timestamp(TimestampTypeMeta {
                unit: ipc_to_time_unit(ts_type.unit())?,
                timezone: ts_type.timezone().map(|tz| tz.to_string()),
            })
        }
        IpcType::List => {
            let children = field.children();
            let child = match children {
                Some(children) if children.len() == 1 => children.get(0),
                _ => {
                    return Err(corrupt(&format!(
                        "List field '{name}' must have exactly one child"
                    )))
                }
            };
            DataType::new_list(ipc_to_field(child)?.datatype)
        }
        IpcType::Struct_ => {
            let fields = match field.children() {
                Some(children) => children
                    .iter()
                    .map(ipc_to_field)
                    .collect::<Result<Vec<_>>>()?,
                None => Vec::new(),
            };
            DataType::new_struct(fields)
        }
        other => not_implemented!("ipc type {other:?}"),
    };

    Ok(Field {
        name: name.to_string(),
        datatype,
        nullable: field.nullable(),
        metadata: ipc_to_metadata(field.custom_metadata())?,
    })
}

fn ipc_to_time_unit(unit: IpcTimeUnit) -> Result<TimeUnit> {
    Ok(match unit {
        IpcTimeUnit::SECOND => TimeUnit::Second,
        IpcTimeUnit::MILLISECOND => TimeUnit::Millisecond,
        IpcTimeUnit::MICROSECOND => TimeUnit::Microsecond,
        IpcTimeUnit::NANOSECOND => TimeUnit::Nanosecond,
        other => return Err(corrupt(&format!("Invalid time unit {other:?}"))),
    })
}

fn ipc_to_metadata(
    metadata: Option<Vector<'_, ForwardsUOffset<KeyValue<'_>>>>,
) -> Result<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    if let Some(metadata) = metadata {
        for kv in metadata.iter() {
            let key = kv
                .key()
                .ok_or_else(|| corrupt("Custom metadata entry missing key"))?;
            out.insert(
                key.to_string(),
                kv.value().unwrap_or_default().to_string(),
            );
        }
    }
    Ok(out)
}
