//! Tables from Arrow's `File.fbs`.

use flatbuffers::{ForwardsUOffset, VOffsetT, Vector, Verifiable, Verifier, WIPOffset};

use crate::schema::{KeyValue, MetadataVersion, Schema};

/// Location of one encapsulated message within a file.
///
/// `offset` points at the message's continuation marker, `metaDataLength`
/// covers the prefix and padded header, `bodyLength` the padded body.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq)]
pub struct Block(pub [u8; 24]);

flatbuffer_struct!(Block, 24);

impl Block {
    pub fn new(offset: i64, meta_data_length: i32, body_length: i64) -> Self {
        let mut s = Self([0; 24]);
        s.set_offset(offset);
        s.set_metaDataLength(meta_data_length);
        s.set_bodyLength(body_length);
        s
    }

    struct_field_accessors! {
        offset, set_offset: i64 @ 0;
        metaDataLength, set_metaDataLength: i32 @ 8;
        bodyLength, set_bodyLength: i64 @ 16;
    }
}

impl core::fmt::Debug for Block {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("Block")
            .field("offset", &self.offset())
            .field("metaDataLength", &self.metaDataLength())
            .field("bodyLength", &self.bodyLength())
            .finish()
    }
}

flatbuffer_table!(
    /// Trailer of an IPC file.
    Footer
);
flatbuffer_table_builder!(FooterBuilder, Footer);

impl<'a> Footer<'a> {
    pub const VT_VERSION: VOffsetT = 4;
    pub const VT_SCHEMA: VOffsetT = 6;
    pub const VT_DICTIONARIES: VOffsetT = 8;
    pub const VT_RECORDBATCHES: VOffsetT = 10;
    pub const VT_CUSTOM_METADATA: VOffsetT = 12;

    #[inline]
    pub fn version(&self) -> MetadataVersion {
        unsafe {
            self._tab
                .get::<MetadataVersion>(Footer::VT_VERSION, Some(MetadataVersion::V1))
        }
        .unwrap_or(MetadataVersion::V1)
    }

    #[inline]
    pub fn schema(&self) -> Option<Schema<'a>> {
        unsafe { self._tab.get::<ForwardsUOffset<Schema>>(Footer::VT_SCHEMA, None) }
    }

    #[inline]
    pub fn dictionaries(&self) -> Option<Vector<'a, Block>> {
        unsafe {
            self._tab
                .get::<ForwardsUOffset<Vector<'a, Block>>>(Footer::VT_DICTIONARIES, None)
        }
    }

    #[inline]
    pub fn recordBatches(&self) -> Option<Vector<'a, Block>> {
        unsafe {
            self._tab
                .get::<ForwardsUOffset<Vector<'a, Block>>>(Footer::VT_RECORDBATCHES, None)
        }
    }
}

impl<'a: 'b, 'b> FooterBuilder<'a, 'b> {
    #[inline]
    pub fn add_version(&mut self, version: MetadataVersion) {
        self.fbb_.push_slot::<MetadataVersion>(Footer::VT_VERSION, version, MetadataVersion::V1);
    }

    #[inline]
    pub fn add_schema(&mut self, schema: WIPOffset<Schema<'b>>) {
        self.fbb_.push_slot_always::<WIPOffset<_>>(Footer::VT_SCHEMA, schema);
    }

    #[inline]
    pub fn add_recordBatches(&mut self, record_batches: WIPOffset<Vector<'b, Block>>) {
        self.fbb_.push_slot_always::<WIPOffset<_>>(Footer::VT_RECORDBATCHES, record_batches);
    }
}

impl Verifiable for Footer<'_> {
    #[inline]
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), flatbuffers::InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<MetadataVersion>("version", Self::VT_VERSION, false)?
            .visit_field::<ForwardsUOffset<Schema>>("schema", Self::VT_SCHEMA, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, Block>>>(
                "dictionaries",
                Self::VT_DICTIONARIES,
                false,
            )?
            .visit_field::<ForwardsUOffset<Vector<'_, Block>>>(
                "recordBatches",
                Self::VT_RECORDBATCHES,
                false,
            )?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<KeyValue>>>>(
                "custom_metadata",
                Self::VT_CUSTOM_METADATA,
                false,
            )?
            .finish();
        Ok(())
    }
}

/// Verify and return the root `Footer` of a footer buffer.
#[inline]
pub fn root_as_footer(buf: &[u8]) -> Result<Footer, flatbuffers::InvalidFlatbuffer> {
    flatbuffers::root::<Footer>(buf)
}

#[cfg(test)]
mod tests {
    use flatbuffers::FlatBufferBuilder;

    use super::*;
    use crate::schema::SchemaBuilder;

    #[test]
    fn block_layout() {
        let block = Block::new(8, 120, 64);
        assert_eq!(8, block.offset());
        assert_eq!(120, block.metaDataLength());
        assert_eq!(64, block.bodyLength());
        // Padding between metaDataLength and bodyLength.
        assert_eq!(&[0, 0, 0, 0], &block.0[12..16]);
    }

    #[test]
    fn footer_roundtrip() {
        let mut fbb = FlatBufferBuilder::new();
        let schema = SchemaBuilder::new(&mut fbb).finish();
        let blocks = fbb.create_vector(&[Block::new(8, 120, 64), Block::new(192, 136, 32)]);

        let mut footer = FooterBuilder::new(&mut fbb);
        footer.add_version(MetadataVersion::V5);
        footer.add_schema(schema);
        footer.add_recordBatches(blocks);
        let footer = footer.finish();
        fbb.finish(footer, None);

        let footer = root_as_footer(fbb.finished_data()).unwrap();
        assert_eq!(MetadataVersion::V5, footer.version());
        assert!(footer.schema().is_some());
        assert!(footer.dictionaries().is_none());

        let blocks = footer.recordBatches().unwrap();
        assert_eq!(2, blocks.len());
        assert_eq!(192, blocks.get(1).offset());
        assert_eq!(32, blocks.get(1).bodyLength());
    }
}
