/// Define an open enum backed by a scalar, as flatc does.
///
/// Unknown discriminants are representable and print as `<UNKNOWN n>`.
macro_rules! flatbuffer_enum {
    (
        $(#[$meta:meta])*
        $name:ident: $repr:ty {
            $($variant:ident = $value:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[repr(transparent)]
        pub struct $name(pub $repr);

        #[allow(non_upper_case_globals)]
        impl $name {
            $(pub const $variant: Self = Self($value);)+

            pub const ENUM_VALUES: &'static [Self] = &[$(Self::$variant),+];

            pub fn variant_name(self) -> Option<&'static str> {
                match self {
                    $(Self::$variant => Some(stringify!($variant)),)+
                    _ => None,
                }
            }
        }

        impl core::fmt::Debug for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
                match self.variant_name() {
                    Some(name) => f.write_str(name),
                    None => write!(f, "<UNKNOWN {:?}>", self.0),
                }
            }
        }

        impl<'a> flatbuffers::Follow<'a> for $name {
            type Inner = Self;
            #[inline]
            unsafe fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
                Self(flatbuffers::read_scalar_at::<$repr>(buf, loc))
            }
        }

        impl flatbuffers::Push for $name {
            type Output = $name;
            #[inline]
            unsafe fn push(&self, dst: &mut [u8], _written_len: usize) {
                flatbuffers::emplace_scalar::<$repr>(dst, self.0);
            }
        }

        impl flatbuffers::EndianScalar for $name {
            type Scalar = $repr;
            #[inline]
            fn to_little_endian(self) -> $repr {
                self.0.to_le()
            }
            #[inline]
            fn from_little_endian(v: $repr) -> Self {
                Self(<$repr>::from_le(v))
            }
        }

        impl flatbuffers::Verifiable for $name {
            #[inline]
            fn run_verifier(
                v: &mut flatbuffers::Verifier,
                pos: usize,
            ) -> Result<(), flatbuffers::InvalidFlatbuffer> {
                use flatbuffers::Verifiable;
                <$repr>::run_verifier(v, pos)
            }
        }

        impl flatbuffers::SimpleToVerifyInSlice for $name {}
    };
}

/// Table wrapper plus `Follow`.
macro_rules! flatbuffer_table {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, PartialEq, Debug)]
        pub struct $name<'a> {
            pub _tab: flatbuffers::Table<'a>,
        }

        impl<'a> flatbuffers::Follow<'a> for $name<'a> {
            type Inner = $name<'a>;
            #[inline]
            unsafe fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
                Self {
                    _tab: flatbuffers::Table::new(buf, loc),
                }
            }
        }

        impl<'a> $name<'a> {
            /// # Safety
            ///
            /// The table must have been verified as this type.
            #[inline]
            pub unsafe fn init_from_table(table: flatbuffers::Table<'a>) -> Self {
                $name { _tab: table }
            }
        }
    };
}

/// Builder struct with `new` and `finish` for a table.
macro_rules! flatbuffer_table_builder {
    ($builder:ident, $table:ident) => {
        pub struct $builder<'a: 'b, 'b> {
            fbb_: &'b mut flatbuffers::FlatBufferBuilder<'a>,
            start_: flatbuffers::WIPOffset<flatbuffers::TableUnfinishedWIPOffset>,
        }

        impl<'a: 'b, 'b> $builder<'a, 'b> {
            #[inline]
            pub fn new(fbb: &'b mut flatbuffers::FlatBufferBuilder<'a>) -> $builder<'a, 'b> {
                let start = fbb.start_table();
                $builder {
                    fbb_: fbb,
                    start_: start,
                }
            }

            #[inline]
            pub fn finish(self) -> flatbuffers::WIPOffset<$table<'a>> {
                let o = self.fbb_.end_table(self.start_);
                flatbuffers::WIPOffset::new(o.value())
            }
        }
    };
}

/// A table with no fields (type markers such as `Utf8` or `Bool`).
macro_rules! empty_flatbuffer_table {
    ($(#[$meta:meta])* $name:ident, $builder:ident) => {
        flatbuffer_table!($(#[$meta])* $name);
        flatbuffer_table_builder!($builder, $name);

        impl<'a> $name<'a> {
            #[inline]
            pub fn create<'bldr>(
                fbb: &mut flatbuffers::FlatBufferBuilder<'bldr>,
            ) -> flatbuffers::WIPOffset<$name<'bldr>> {
                $builder::new(fbb).finish()
            }
        }

        impl flatbuffers::Verifiable for $name<'_> {
            #[inline]
            fn run_verifier(
                v: &mut flatbuffers::Verifier,
                pos: usize,
            ) -> Result<(), flatbuffers::InvalidFlatbuffer> {
                v.visit_table(pos)?.finish();
                Ok(())
            }
        }
    };
}

/// Little-endian accessors over the raw bytes of a fixed-size struct.
macro_rules! struct_field_accessors {
    ($($getter:ident, $setter:ident: $ty:ident @ $offset:expr;)+) => {
        $(
            pub fn $getter(&self) -> $ty {
                let mut raw = [0; core::mem::size_of::<$ty>()];
                raw.copy_from_slice(&self.0[$offset..$offset + core::mem::size_of::<$ty>()]);
                <$ty>::from_le_bytes(raw)
            }

            pub fn $setter(&mut self, x: $ty) {
                self.0[$offset..$offset + core::mem::size_of::<$ty>()]
                    .copy_from_slice(&x.to_le_bytes());
            }
        )+
    };
}

/// `Follow`, `Push` and `Verifiable` for a fixed-size struct stored as bytes.
macro_rules! flatbuffer_struct {
    ($name:ident, $size:expr) => {
        impl Default for $name {
            fn default() -> Self {
                Self([0; $size])
            }
        }

        impl flatbuffers::SimpleToVerifyInSlice for $name {}

        impl<'a> flatbuffers::Follow<'a> for $name {
            type Inner = &'a $name;
            #[inline]
            unsafe fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
                <&'a $name as flatbuffers::Follow<'a>>::follow(buf, loc)
            }
        }

        impl<'a> flatbuffers::Follow<'a> for &'a $name {
            type Inner = &'a $name;
            #[inline]
            unsafe fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
                flatbuffers::follow_cast_ref::<$name>(buf, loc)
            }
        }

        impl flatbuffers::Push for $name {
            type Output = $name;
            #[inline]
            unsafe fn push(&self, dst: &mut [u8], _written_len: usize) {
                let src = ::core::slice::from_raw_parts(
                    self as *const $name as *const u8,
                    <Self as flatbuffers::Push>::size(),
                );
                dst.copy_from_slice(src);
            }
            #[inline]
            fn alignment() -> flatbuffers::PushAlignment {
                flatbuffers::PushAlignment::new(8)
            }
        }

        impl flatbuffers::Verifiable for $name {
            #[inline]
            fn run_verifier(
                v: &mut flatbuffers::Verifier,
                pos: usize,
            ) -> Result<(), flatbuffers::InvalidFlatbuffer> {
                v.in_buffer::<Self>(pos)
            }
        }
    };
}
