//! Tables from Arrow's `Message.fbs`.

use flatbuffers::{ForwardsUOffset, Table, VOffsetT, Vector, Verifiable, Verifier, WIPOffset};

use crate::schema::{Buffer, KeyValue, MetadataVersion, Schema};

flatbuffer_enum! {
    /// Discriminant of the `MessageHeader` union on `Message`.
    MessageHeader: u8 {
        NONE = 0,
        Schema = 1,
        DictionaryBatch = 2,
        RecordBatch = 3,
        Tensor = 4,
        SparseTensor = 5,
    }
}

flatbuffer_enum! {
    CompressionType: i8 {
        LZ4_FRAME = 0,
        ZSTD = 1,
    }
}

flatbuffer_enum! {
    BodyCompressionMethod: i8 {
        BUFFER = 0,
    }
}

/// Length and null count of one array in a record batch, in pre-order.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq)]
pub struct FieldNode(pub [u8; 16]);

flatbuffer_struct!(FieldNode, 16);

impl FieldNode {
    pub fn new(length: i64, null_count: i64) -> Self {
        let mut s = Self([0; 16]);
        s.set_length(length);
        s.set_null_count(null_count);
        s
    }

    struct_field_accessors! {
        length, set_length: i64 @ 0;
        null_count, set_null_count: i64 @ 8;
    }
}

impl core::fmt::Debug for FieldNode {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("FieldNode")
            .field("length", &self.length())
            .field("null_count", &self.null_count())
            .finish()
    }
}

flatbuffer_table!(BodyCompression);

impl<'a> BodyCompression<'a> {
    pub const VT_CODEC: VOffsetT = 4;
    pub const VT_METHOD: VOffsetT = 6;

    #[inline]
    pub fn codec(&self) -> CompressionType {
        unsafe {
            self._tab
                .get::<CompressionType>(BodyCompression::VT_CODEC, Some(CompressionType::LZ4_FRAME))
        }
        .unwrap_or(CompressionType::LZ4_FRAME)
    }
}

impl Verifiable for BodyCompression<'_> {
    #[inline]
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), flatbuffers::InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<CompressionType>("codec", Self::VT_CODEC, false)?
            .visit_field::<BodyCompressionMethod>("method", Self::VT_METHOD, false)?
            .finish();
        Ok(())
    }
}

flatbuffer_table!(
    /// Header of a record batch message. The body follows the header on the
    /// wire.
    RecordBatch
);
flatbuffer_table_builder!(RecordBatchBuilder, RecordBatch);

impl<'a> RecordBatch<'a> {
    pub const VT_LENGTH: VOffsetT = 4;
    pub const VT_NODES: VOffsetT = 6;
    pub const VT_BUFFERS: VOffsetT = 8;
    pub const VT_COMPRESSION: VOffsetT = 10;

    #[inline]
    pub fn length(&self) -> i64 {
        unsafe { self._tab.get::<i64>(RecordBatch::VT_LENGTH, Some(0)) }.unwrap_or(0)
    }

    #[inline]
    pub fn nodes(&self) -> Option<Vector<'a, FieldNode>> {
        unsafe {
            self._tab
                .get::<ForwardsUOffset<Vector<'a, FieldNode>>>(RecordBatch::VT_NODES, None)
        }
    }

    #[inline]
    pub fn buffers(&self) -> Option<Vector<'a, Buffer>> {
        unsafe {
            self._tab
                .get::<ForwardsUOffset<Vector<'a, Buffer>>>(RecordBatch::VT_BUFFERS, None)
        }
    }

    #[inline]
    pub fn compression(&self) -> Option<BodyCompression<'a>> {
        unsafe {
            self._tab
                .get::<ForwardsUOffset<BodyCompression>>(RecordBatch::VT_COMPRESSION, None)
        }
    }
}

impl<'a: 'b, 'b> RecordBatchBuilder<'a, 'b> {
    #[inline]
    pub fn add_length(&mut self, length: i64) {
        self.fbb_.push_slot::<i64>(RecordBatch::VT_LENGTH, length, 0);
    }

    #[inline]
    pub fn add_nodes(&mut self, nodes: WIPOffset<Vector<'b, FieldNode>>) {
        self.fbb_.push_slot_always::<WIPOffset<_>>(RecordBatch::VT_NODES, nodes);
    }

    #[inline]
    pub fn add_buffers(&mut self, buffers: WIPOffset<Vector<'b, Buffer>>) {
        self.fbb_.push_slot_always::<WIPOffset<_>>(RecordBatch::VT_BUFFERS, buffers);
    }
}

impl Verifiable for RecordBatch<'_> {
    #[inline]
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), flatbuffers::InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<i64>("length", Self::VT_LENGTH, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, FieldNode>>>("nodes", Self::VT_NODES, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, Buffer>>>("buffers", Self::VT_BUFFERS, false)?
            .visit_field::<ForwardsUOffset<BodyCompression>>(
                "compression",
                Self::VT_COMPRESSION,
                false,
            )?
            .finish();
        Ok(())
    }
}

flatbuffer_table!(
    /// Envelope for every encapsulated IPC message.
    Message
);
flatbuffer_table_builder!(MessageBuilder, Message);

impl<'a> Message<'a> {
    pub const VT_VERSION: VOffsetT = 4;
    pub const VT_HEADER_TYPE: VOffsetT = 6;
    pub const VT_HEADER: VOffsetT = 8;
    pub const VT_BODYLENGTH: VOffsetT = 10;
    pub const VT_CUSTOM_METADATA: VOffsetT = 12;

    #[inline]
    pub fn version(&self) -> MetadataVersion {
        unsafe {
            self._tab
                .get::<MetadataVersion>(Message::VT_VERSION, Some(MetadataVersion::V1))
        }
        .unwrap_or(MetadataVersion::V1)
    }

    #[inline]
    pub fn header_type(&self) -> MessageHeader {
        unsafe {
            self._tab
                .get::<MessageHeader>(Message::VT_HEADER_TYPE, Some(MessageHeader::NONE))
        }
        .unwrap_or(MessageHeader::NONE)
    }

    #[inline]
    pub fn header(&self) -> Option<Table<'a>> {
        unsafe {
            self._tab
                .get::<ForwardsUOffset<Table<'a>>>(Message::VT_HEADER, None)
        }
    }

    #[inline]
    pub fn bodyLength(&self) -> i64 {
        unsafe { self._tab.get::<i64>(Message::VT_BODYLENGTH, Some(0)) }.unwrap_or(0)
    }

    #[inline]
    pub fn custom_metadata(&self) -> Option<Vector<'a, ForwardsUOffset<KeyValue<'a>>>> {
        unsafe {
            self._tab
                .get::<ForwardsUOffset<Vector<'a, ForwardsUOffset<KeyValue>>>>(
                    Message::VT_CUSTOM_METADATA,
                    None,
                )
        }
    }

    #[inline]
    pub fn header_as_schema(&self) -> Option<Schema<'a>> {
        if self.header_type() == MessageHeader::Schema {
            self.header().map(|t| unsafe { Schema::init_from_table(t) })
        } else {
            None
        }
    }

    #[inline]
    pub fn header_as_record_batch(&self) -> Option<RecordBatch<'a>> {
        if self.header_type() == MessageHeader::RecordBatch {
            self.header()
                .map(|t| unsafe { RecordBatch::init_from_table(t) })
        } else {
            None
        }
    }
}

impl<'a: 'b, 'b> MessageBuilder<'a, 'b> {
    #[inline]
    pub fn add_version(&mut self, version: MetadataVersion) {
        self.fbb_.push_slot::<MetadataVersion>(Message::VT_VERSION, version, MetadataVersion::V1);
    }

    #[inline]
    pub fn add_header_type(&mut self, header_type: MessageHeader) {
        self.fbb_
            .push_slot::<MessageHeader>(Message::VT_HEADER_TYPE, header_type, MessageHeader::NONE);
    }

    #[inline]
    pub fn add_header(&mut self, header: WIPOffset<flatbuffers::UnionWIPOffset>) {
        self.fbb_.push_slot_always::<WIPOffset<_>>(Message::VT_HEADER, header);
    }

    #[inline]
    pub fn add_bodyLength(&mut self, body_length: i64) {
        self.fbb_.push_slot::<i64>(Message::VT_BODYLENGTH, body_length, 0);
    }
}

impl Verifiable for Message<'_> {
    #[inline]
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), flatbuffers::InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<MetadataVersion>("version", Self::VT_VERSION, false)?
            .visit_union::<MessageHeader, _>(
                "header_type",
                Self::VT_HEADER_TYPE,
                "header",
                Self::VT_HEADER,
                false,
                |key, v, pos| match key {
                    MessageHeader::Schema => v.verify_union_variant::<ForwardsUOffset<Schema>>(
                        "MessageHeader::Schema",
                        pos,
                    ),
                    MessageHeader::RecordBatch => v
                        .verify_union_variant::<ForwardsUOffset<RecordBatch>>(
                            "MessageHeader::RecordBatch",
                            pos,
                        ),
                    _ => Ok(()),
                },
            )?
            .visit_field::<i64>("bodyLength", Self::VT_BODYLENGTH, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<KeyValue>>>>(
                "custom_metadata",
                Self::VT_CUSTOM_METADATA,
                false,
            )?
            .finish();
        Ok(())
    }
}

/// Verify and return the root `Message` of a header buffer.
#[inline]
pub fn root_as_message(buf: &[u8]) -> Result<Message, flatbuffers::InvalidFlatbuffer> {
    flatbuffers::root::<Message>(buf)
}

#[cfg(test)]
mod tests {
    use flatbuffers::FlatBufferBuilder;

    use super::*;
    use crate::schema::{FieldBuilder, SchemaBuilder, Type, Utf8};

    #[test]
    fn schema_message_roundtrip() {
        let mut fbb = FlatBufferBuilder::new();

        let utf8 = Utf8::create(&mut fbb);
        let name = fbb.create_string("a");
        let mut field = FieldBuilder::new(&mut fbb);
        field.add_name(name);
        field.add_nullable(true);
        field.add_type_type(Type::Utf8);
        field.add_type_(utf8.as_union_value());
        let field = field.finish();

        let fields = fbb.create_vector(&[field]);
        let mut schema = SchemaBuilder::new(&mut fbb);
        schema.add_fields(fields);
        let schema = schema.finish();

        let mut message = MessageBuilder::new(&mut fbb);
        message.add_version(MetadataVersion::V5);
        message.add_header_type(MessageHeader::Schema);
        message.add_header(schema.as_union_value());
        let message = message.finish();
        fbb.finish(message, None);

        let message = root_as_message(fbb.finished_data()).unwrap();
        assert_eq!(MetadataVersion::V5, message.version());
        assert!(message.header_as_record_batch().is_none());

        let schema = message.header_as_schema().unwrap();
        let fields = schema.fields().unwrap();
        assert_eq!(1, fields.len());
        assert_eq!(Some("a"), fields.get(0).name());
        assert!(fields.get(0).nullable());
        assert_eq!(Type::Utf8, fields.get(0).type_type());
    }

    #[test]
    fn record_batch_nodes_and_buffers() {
        let mut fbb = FlatBufferBuilder::new();

        let nodes = fbb.create_vector(&[FieldNode::new(4, 1)]);
        let buffers = fbb.create_vector(&[Buffer::new(0, 1), Buffer::new(8, 16)]);
        let mut batch = RecordBatchBuilder::new(&mut fbb);
        batch.add_length(4);
        batch.add_nodes(nodes);
        batch.add_buffers(buffers);
        let batch = batch.finish();

        let mut message = MessageBuilder::new(&mut fbb);
        message.add_version(MetadataVersion::V5);
        message.add_header_type(MessageHeader::RecordBatch);
        message.add_header(batch.as_union_value());
        message.add_bodyLength(24);
        let message = message.finish();
        fbb.finish(message, None);

        let message = root_as_message(fbb.finished_data()).unwrap();
        assert_eq!(24, message.bodyLength());
        let batch = message.header_as_record_batch().unwrap();
        assert_eq!(4, batch.length());
        assert!(batch.compression().is_none());

        let node = batch.nodes().unwrap().get(0);
        assert_eq!(4, node.length());
        assert_eq!(1, node.null_count());

        let buffers = batch.buffers().unwrap();
        assert_eq!(2, buffers.len());
        assert_eq!(8, buffers.get(1).offset());
        assert_eq!(16, buffers.get(1).length());
    }

    #[test]
    fn garbage_fails_verification() {
        assert!(root_as_message(&[0xFF, 0xFF, 0xFF, 0x7F, 1, 2]).is_err());
        assert!(root_as_message(&[]).is_err());
    }
}
