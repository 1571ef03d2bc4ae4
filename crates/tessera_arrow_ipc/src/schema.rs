//! Tables from Arrow's `Schema.fbs`.

use flatbuffers::{ForwardsUOffset, Table, VOffsetT, Vector, Verifiable, Verifier, WIPOffset};

flatbuffer_enum! {
    MetadataVersion: i16 {
        V1 = 0,
        V2 = 1,
        V3 = 2,
        V4 = 3,
        V5 = 4,
    }
}

flatbuffer_enum! {
    Endianness: i16 {
        Little = 0,
        Big = 1,
    }
}

flatbuffer_enum! {
    Precision: i16 {
        HALF = 0,
        SINGLE = 1,
        DOUBLE = 2,
    }
}

flatbuffer_enum! {
    DateUnit: i16 {
        DAY = 0,
        MILLISECOND = 1,
    }
}

flatbuffer_enum! {
    TimeUnit: i16 {
        SECOND = 0,
        MILLISECOND = 1,
        MICROSECOND = 2,
        NANOSECOND = 3,
    }
}

flatbuffer_enum! {
    /// Discriminant of the `Type` union on `Field`.
    Type: u8 {
        NONE = 0,
        Null = 1,
        Int = 2,
        FloatingPoint = 3,
        Binary = 4,
        Utf8 = 5,
        Bool = 6,
        Decimal = 7,
        Date = 8,
        Time = 9,
        Timestamp = 10,
        Interval = 11,
        List = 12,
        Struct_ = 13,
        Union = 14,
        FixedSizeBinary = 15,
        FixedSizeList = 16,
        Map = 17,
        Duration = 18,
        LargeBinary = 19,
        LargeUtf8 = 20,
        LargeList = 21,
        RunEndEncoded = 22,
        BinaryView = 23,
        Utf8View = 24,
        ListView = 25,
        LargeListView = 26,
    }
}

empty_flatbuffer_table!(Null, NullBuilder);
empty_flatbuffer_table!(Binary, BinaryBuilder);
empty_flatbuffer_table!(LargeBinary, LargeBinaryBuilder);
empty_flatbuffer_table!(Utf8, Utf8Builder);
empty_flatbuffer_table!(LargeUtf8, LargeUtf8Builder);
empty_flatbuffer_table!(Bool, BoolBuilder);
empty_flatbuffer_table!(List, ListBuilder);
empty_flatbuffer_table!(Struct_, Struct_Builder);

flatbuffer_table!(Int);
flatbuffer_table_builder!(IntBuilder, Int);

impl<'a> Int<'a> {
    pub const VT_BITWIDTH: VOffsetT = 4;
    pub const VT_IS_SIGNED: VOffsetT = 6;

    #[inline]
    pub fn bitWidth(&self) -> i32 {
        unsafe { self._tab.get::<i32>(Int::VT_BITWIDTH, Some(0)) }.unwrap_or(0)
    }

    #[inline]
    pub fn is_signed(&self) -> bool {
        unsafe { self._tab.get::<bool>(Int::VT_IS_SIGNED, Some(false)) }.unwrap_or(false)
    }
}

impl<'a: 'b, 'b> IntBuilder<'a, 'b> {
    #[inline]
    pub fn add_bitWidth(&mut self, bit_width: i32) {
        self.fbb_.push_slot::<i32>(Int::VT_BITWIDTH, bit_width, 0);
    }

    #[inline]
    pub fn add_is_signed(&mut self, is_signed: bool) {
        self.fbb_.push_slot::<bool>(Int::VT_IS_SIGNED, is_signed, false);
    }
}

impl Verifiable for Int<'_> {
    #[inline]
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), flatbuffers::InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<i32>("bitWidth", Self::VT_BITWIDTH, false)?
            .visit_field::<bool>("is_signed", Self::VT_IS_SIGNED, false)?
            .finish();
        Ok(())
    }
}

flatbuffer_table!(FloatingPoint);
flatbuffer_table_builder!(FloatingPointBuilder, FloatingPoint);

impl<'a> FloatingPoint<'a> {
    pub const VT_PRECISION: VOffsetT = 4;

    #[inline]
    pub fn precision(&self) -> Precision {
        unsafe {
            self._tab
                .get::<Precision>(FloatingPoint::VT_PRECISION, Some(Precision::HALF))
        }
        .unwrap_or(Precision::HALF)
    }
}

impl<'a: 'b, 'b> FloatingPointBuilder<'a, 'b> {
    #[inline]
    pub fn add_precision(&mut self, precision: Precision) {
        self.fbb_.push_slot::<Precision>(FloatingPoint::VT_PRECISION, precision, Precision::HALF);
    }
}

impl Verifiable for FloatingPoint<'_> {
    #[inline]
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), flatbuffers::InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<Precision>("precision", Self::VT_PRECISION, false)?
            .finish();
        Ok(())
    }
}

flatbuffer_table!(Date);
flatbuffer_table_builder!(DateBuilder, Date);

impl<'a> Date<'a> {
    pub const VT_UNIT: VOffsetT = 4;

    #[inline]
    pub fn unit(&self) -> DateUnit {
        unsafe {
            self._tab
                .get::<DateUnit>(Date::VT_UNIT, Some(DateUnit::MILLISECOND))
        }
        .unwrap_or(DateUnit::MILLISECOND)
    }
}

impl<'a: 'b, 'b> DateBuilder<'a, 'b> {
    #[inline]
    pub fn add_unit(&mut self, unit: DateUnit) {
        self.fbb_.push_slot::<DateUnit>(Date::VT_UNIT, unit, DateUnit::MILLISECOND);
    }
}

impl Verifiable for Date<'_> {
    #[inline]
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), flatbuffers::InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<DateUnit>("unit", Self::VT_UNIT, false)?
            .finish();
        Ok(())
    }
}

flatbuffer_table!(Time);
flatbuffer_table_builder!(TimeBuilder, Time);

impl<'a> Time<'a> {
    pub const VT_UNIT: VOffsetT = 4;
    pub const VT_BITWIDTH: VOffsetT = 6;

    #[inline]
    pub fn unit(&self) -> TimeUnit {
        unsafe {
            self._tab
                .get::<TimeUnit>(Time::VT_UNIT, Some(TimeUnit::MILLISECOND))
        }
        .unwrap_or(TimeUnit::MILLISECOND)
    }

    #[inline]
    pub fn bitWidth(&self) -> i32 {
        unsafe { self._tab.get::<i32>(Time::VT_BITWIDTH, Some(32)) }.unwrap_or(32)
    }
}

impl<'a: 'b, 'b> TimeBuilder<'a, 'b> {
    #[inline]
    pub fn add_unit(&mut self, unit: TimeUnit) {
        self.fbb_.push_slot::<TimeUnit>(Time::VT_UNIT, unit, TimeUnit::MILLISECOND);
    }

    #[inline]
    pub fn add_bitWidth(&mut self, bit_width: i32) {
        self.fbb_.push_slot::<i32>(Time::VT_BITWIDTH, bit_width, 32);
    }
}

impl Verifiable for Time<'_> {
    #[inline]
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), flatbuffers::InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<TimeUnit>("unit", Self::VT_UNIT, false)?
            .visit_field::<i32>("bitWidth", Self::VT_BITWIDTH, false)?
            .finish();
        Ok(())
    }
}

flatbuffer_table!(Timestamp);
flatbuffer_table_builder!(TimestampBuilder, Timestamp);

impl<'a> Timestamp<'a> {
    pub const VT_UNIT: VOffsetT = 4;
    pub const VT_TIMEZONE: VOffsetT = 6;

    #[inline]
    pub fn unit(&self) -> TimeUnit {
        unsafe {
            self._tab
                .get::<TimeUnit>(Timestamp::VT_UNIT, Some(TimeUnit::SECOND))
        }
        .unwrap_or(TimeUnit::SECOND)
    }

    #[inline]
    pub fn timezone(&self) -> Option<&'a str> {
        unsafe {
            self._tab
                .get::<ForwardsUOffset<&str>>(Timestamp::VT_TIMEZONE, None)
        }
    }
}

impl<'a: 'b, 'b> TimestampBuilder<'a, 'b> {
    #[inline]
    pub fn add_unit(&mut self, unit: TimeUnit) {
        self.fbb_.push_slot::<TimeUnit>(Timestamp::VT_UNIT, unit, TimeUnit::SECOND);
    }

    #[inline]
    pub fn add_timezone(&mut self, timezone: WIPOffset<&'b str>) {
        self.fbb_.push_slot_always::<WIPOffset<_>>(Timestamp::VT_TIMEZONE, timezone);
    }
}

impl Verifiable for Timestamp<'_> {
    #[inline]
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), flatbuffers::InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<TimeUnit>("unit", Self::VT_UNIT, false)?
            .visit_field::<ForwardsUOffset<&str>>("timezone", Self::VT_TIMEZONE, false)?
            .finish();
        Ok(())
    }
}

flatbuffer_table!(
    /// Custom metadata entry.
    KeyValue
);
flatbuffer_table_builder!(KeyValueBuilder, KeyValue);

impl<'a> KeyValue<'a> {
    pub const VT_KEY: VOffsetT = 4;
    pub const VT_VALUE: VOffsetT = 6;

    #[inline]
    pub fn key(&self) -> Option<&'a str> {
        unsafe { self._tab.get::<ForwardsUOffset<&str>>(KeyValue::VT_KEY, None) }
    }

    #[inline]
    pub fn value(&self) -> Option<&'a str> {
        unsafe { self._tab.get::<ForwardsUOffset<&str>>(KeyValue::VT_VALUE, None) }
    }
}

impl<'a: 'b, 'b> KeyValueBuilder<'a, 'b> {
    #[inline]
    pub fn add_key(&mut self, key: WIPOffset<&'b str>) {
        self.fbb_.push_slot_always::<WIPOffset<_>>(KeyValue::VT_KEY, key);
    }

    #[inline]
    pub fn add_value(&mut self, value: WIPOffset<&'b str>) {
        self.fbb_.push_slot_always::<WIPOffset<_>>(KeyValue::VT_VALUE, value);
    }
}

impl Verifiable for KeyValue<'_> {
    #[inline]
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), flatbuffers::InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<&str>>("key", Self::VT_KEY, false)?
            .visit_field::<ForwardsUOffset<&str>>("value", Self::VT_VALUE, false)?
            .finish();
        Ok(())
    }
}

flatbuffer_table!(
    /// Dictionary encoding of a field. Only read far enough to detect its
    /// presence.
    DictionaryEncoding
);

impl<'a> DictionaryEncoding<'a> {
    pub const VT_ID: VOffsetT = 4;
    pub const VT_INDEXTYPE: VOffsetT = 6;
    pub const VT_ISORDERED: VOffsetT = 8;
    pub const VT_DICTIONARYKIND: VOffsetT = 10;

    #[inline]
    pub fn id(&self) -> i64 {
        unsafe { self._tab.get::<i64>(DictionaryEncoding::VT_ID, Some(0)) }.unwrap_or(0)
    }
}

impl Verifiable for DictionaryEncoding<'_> {
    #[inline]
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), flatbuffers::InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<i64>("id", Self::VT_ID, false)?
            .visit_field::<ForwardsUOffset<Int>>("indexType", Self::VT_INDEXTYPE, false)?
            .visit_field::<bool>("isOrdered", Self::VT_ISORDERED, false)?
            .visit_field::<i16>("dictionaryKind", Self::VT_DICTIONARYKIND, false)?
            .finish();
        Ok(())
    }
}

flatbuffer_table!(
    /// A named, typed column description. Nested types carry their children
    /// in `children`.
    Field
);
flatbuffer_table_builder!(FieldBuilder, Field);

impl<'a> Field<'a> {
    pub const VT_NAME: VOffsetT = 4;
    pub const VT_NULLABLE: VOffsetT = 6;
    pub const VT_TYPE_TYPE: VOffsetT = 8;
    pub const VT_TYPE_: VOffsetT = 10;
    pub const VT_DICTIONARY: VOffsetT = 12;
    pub const VT_CHILDREN: VOffsetT = 14;
    pub const VT_CUSTOM_METADATA: VOffsetT = 16;

    #[inline]
    pub fn name(&self) -> Option<&'a str> {
        unsafe { self._tab.get::<ForwardsUOffset<&str>>(Field::VT_NAME, None) }
    }

    #[inline]
    pub fn nullable(&self) -> bool {
        unsafe { self._tab.get::<bool>(Field::VT_NULLABLE, Some(false)) }.unwrap_or(false)
    }

    #[inline]
    pub fn type_type(&self) -> Type {
        unsafe { self._tab.get::<Type>(Field::VT_TYPE_TYPE, Some(Type::NONE)) }
            .unwrap_or(Type::NONE)
    }

    #[inline]
    pub fn type_(&self) -> Option<Table<'a>> {
        unsafe {
            self._tab
                .get::<ForwardsUOffset<Table<'a>>>(Field::VT_TYPE_, None)
        }
    }

    #[inline]
    pub fn dictionary(&self) -> Option<DictionaryEncoding<'a>> {
        unsafe {
            self._tab
                .get::<ForwardsUOffset<DictionaryEncoding>>(Field::VT_DICTIONARY, None)
        }
    }

    #[inline]
    pub fn children(&self) -> Option<Vector<'a, ForwardsUOffset<Field<'a>>>> {
        unsafe {
            self._tab
                .get::<ForwardsUOffset<Vector<'a, ForwardsUOffset<Field>>>>(
                    Field::VT_CHILDREN,
                    None,
                )
        }
    }

    #[inline]
    pub fn custom_metadata(&self) -> Option<Vector<'a, ForwardsUOffset<KeyValue<'a>>>> {
        unsafe {
            self._tab
                .get::<ForwardsUOffset<Vector<'a, ForwardsUOffset<KeyValue>>>>(
                    Field::VT_CUSTOM_METADATA,
                    None,
                )
        }
    }

    #[inline]
    pub fn type_as_int(&self) -> Option<Int<'a>> {
        if self.type_type() == Type::Int {
            self.type_().map(|t| unsafe { Int::init_from_table(t) })
        } else {
            None
        }
    }

    #[inline]
    pub fn type_as_floating_point(&self) -> Option<FloatingPoint<'a>> {
        if self.type_type() == Type::FloatingPoint {
            self.type_()
                .map(|t| unsafe { FloatingPoint::init_from_table(t) })
        } else {
            None
        }
    }

    #[inline]
    pub fn type_as_date(&self) -> Option<Date<'a>> {
        if self.type_type() == Type::Date {
            self.type_().map(|t| unsafe { Date::init_from_table(t) })
        } else {
            None
        }
    }

    #[inline]
    pub fn type_as_time(&self) -> Option<Time<'a>> {
        if self.type_type() == Type::Time {
            self.type_().map(|t| unsafe { Time::init_from_table(t) })
        } else {
            None
        }
    }

    #[inline]
    pub fn type_as_timestamp(&self) -> Option<Timestamp<'a>> {
        if self.type_type() == Type::Timestamp {
            self.type_().map(|t| unsafe { Timestamp::init_from_table(t) })
        } else {
            None
        }
    }
}

impl<'a: 'b, 'b> FieldBuilder<'a, 'b> {
    #[inline]
    pub fn add_name(&mut self, name: WIPOffset<&'b str>) {
        self.fbb_.push_slot_always::<WIPOffset<_>>(Field::VT_NAME, name);
    }

    #[inline]
    pub fn add_nullable(&mut self, nullable: bool) {
        self.fbb_.push_slot::<bool>(Field::VT_NULLABLE, nullable, false);
    }

    #[inline]
    pub fn add_type_type(&mut self, type_type: Type) {
        self.fbb_.push_slot::<Type>(Field::VT_TYPE_TYPE, type_type, Type::NONE);
    }

    #[inline]
    pub fn add_type_(&mut self, type_: WIPOffset<flatbuffers::UnionWIPOffset>) {
        self.fbb_.push_slot_always::<WIPOffset<_>>(Field::VT_TYPE_, type_);
    }

    #[inline]
    pub fn add_children(&mut self, children: WIPOffset<Vector<'b, ForwardsUOffset<Field<'b>>>>) {
        self.fbb_.push_slot_always::<WIPOffset<_>>(Field::VT_CHILDREN, children);
    }

    #[inline]
    pub fn add_custom_metadata(
        &mut self,
        custom_metadata: WIPOffset<Vector<'b, ForwardsUOffset<KeyValue<'b>>>>,
    ) {
        self.fbb_.push_slot_always::<WIPOffset<_>>(Field::VT_CUSTOM_METADATA, custom_metadata);
    }
}

impl Verifiable for Field<'_> {
    #[inline]
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), flatbuffers::InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<&str>>("name", Self::VT_NAME, false)?
            .visit_field::<bool>("nullable", Self::VT_NULLABLE, false)?
            .visit_union::<Type, _>(
                "type_type",
                Self::VT_TYPE_TYPE,
                "type_",
                Self::VT_TYPE_,
                false,
                |key, v, pos| match key {
                    Type::Null => {
                        v.verify_union_variant::<ForwardsUOffset<Null>>("Type::Null", pos)
                    }
                    Type::Int => v.verify_union_variant::<ForwardsUOffset<Int>>("Type::Int", pos),
                    Type::FloatingPoint => v.verify_union_variant::<ForwardsUOffset<FloatingPoint>>(
                        "Type::FloatingPoint",
                        pos,
                    ),
                    Type::Binary => {
                        v.verify_union_variant::<ForwardsUOffset<Binary>>("Type::Binary", pos)
                    }
                    Type::Utf8 => {
                        v.verify_union_variant::<ForwardsUOffset<Utf8>>("Type::Utf8", pos)
                    }
                    Type::Bool => {
                        v.verify_union_variant::<ForwardsUOffset<Bool>>("Type::Bool", pos)
                    }
                    Type::Date => {
                        v.verify_union_variant::<ForwardsUOffset<Date>>("Type::Date", pos)
                    }
                    Type::Time => {
                        v.verify_union_variant::<ForwardsUOffset<Time>>("Type::Time", pos)
                    }
                    Type::Timestamp => {
                        v.verify_union_variant::<ForwardsUOffset<Timestamp>>("Type::Timestamp", pos)
                    }
                    Type::List => {
                        v.verify_union_variant::<ForwardsUOffset<List>>("Type::List", pos)
                    }
                    Type::Struct_ => {
                        v.verify_union_variant::<ForwardsUOffset<Struct_>>("Type::Struct_", pos)
                    }
                    Type::LargeBinary => v.verify_union_variant::<ForwardsUOffset<LargeBinary>>(
                        "Type::LargeBinary",
                        pos,
                    ),
                    Type::LargeUtf8 => {
                        v.verify_union_variant::<ForwardsUOffset<LargeUtf8>>("Type::LargeUtf8", pos)
                    }
                    _ => Ok(()),
                },
            )?
            .visit_field::<ForwardsUOffset<DictionaryEncoding>>(
                "dictionary",
                Self::VT_DICTIONARY,
                false,
            )?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<Field>>>>(
                "children",
                Self::VT_CHILDREN,
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

flatbuffer_table!(Schema);
flatbuffer_table_builder!(SchemaBuilder, Schema);

impl<'a> Schema<'a> {
    pub const VT_ENDIANNESS: VOffsetT = 4;
    pub const VT_FIELDS: VOffsetT = 6;
    pub const VT_CUSTOM_METADATA: VOffsetT = 8;
    pub const VT_FEATURES: VOffsetT = 10;

    #[inline]
    pub fn endianness(&self) -> Endianness {
        unsafe {
            self._tab
                .get::<Endianness>(Schema::VT_ENDIANNESS, Some(Endianness::Little))
        }
        .unwrap_or(Endianness::Little)
    }

    #[inline]
    pub fn fields(&self) -> Option<Vector<'a, ForwardsUOffset<Field<'a>>>> {
        unsafe {
            self._tab
                .get::<ForwardsUOffset<Vector<'a, ForwardsUOffset<Field>>>>(Schema::VT_FIELDS, None)
        }
    }

    #[inline]
    pub fn custom_metadata(&self) -> Option<Vector<'a, ForwardsUOffset<KeyValue<'a>>>> {
        unsafe {
            self._tab
                .get::<ForwardsUOffset<Vector<'a, ForwardsUOffset<KeyValue>>>>(
                    Schema::VT_CUSTOM_METADATA,
                    None,
                )
        }
    }
}

impl<'a: 'b, 'b> SchemaBuilder<'a, 'b> {
    #[inline]
    pub fn add_endianness(&mut self, endianness: Endianness) {
        self.fbb_.push_slot::<Endianness>(Schema::VT_ENDIANNESS, endianness, Endianness::Little);
    }

    #[inline]
    pub fn add_fields(&mut self, fields: WIPOffset<Vector<'b, ForwardsUOffset<Field<'b>>>>) {
        self.fbb_.push_slot_always::<WIPOffset<_>>(Schema::VT_FIELDS, fields);
    }

    #[inline]
    pub fn add_custom_metadata(
        &mut self,
        custom_metadata: WIPOffset<Vector<'b, ForwardsUOffset<KeyValue<'b>>>>,
    ) {
        self.fbb_.push_slot_always::<WIPOffset<_>>(Schema::VT_CUSTOM_METADATA, custom_metadata);
    }
}

impl Verifiable for Schema<'_> {
    #[inline]
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), flatbuffers::InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<Endianness>("endianness", Self::VT_ENDIANNESS, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<Field>>>>(
                "fields",
                Self::VT_FIELDS,
                false,
            )?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<KeyValue>>>>(
                "custom_metadata",
                Self::VT_CUSTOM_METADATA,
                false,
            )?
            .visit_field::<ForwardsUOffset<Vector<'_, i64>>>("features", Self::VT_FEATURES, false)?
            .finish();
        Ok(())
    }
}

/// A body buffer location: offset relative to the message body start and
/// unpadded length, both in bytes.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq)]
pub struct Buffer(pub [u8; 16]);

flatbuffer_struct!(Buffer, 16);

impl Buffer {
    pub fn new(offset: i64, length: i64) -> Self {
        let mut s = Self([0; 16]);
        s.set_offset(offset);
        s.set_length(length);
        s
    }

    struct_field_accessors! {
        offset, set_offset: i64 @ 0;
        length, set_length: i64 @ 8;
    }
}

impl core::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("Buffer")
            .field("offset", &self.offset())
            .field("length", &self.length())
            .finish()
    }
}
