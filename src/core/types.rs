// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Scalar type model, TypeID namespaces, and radix handling.
//!
//! Every type reference in a module is either a base scalar or a TypeID
//! pointing into one of the registry namespaces (declares, items,
//! aggregates, enums). Scalar properties (natural size, default tag,
//! signedness) live here as closed tables.

use std::fmt;

/// Base scalar types of the definition language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Byte,
    Word,
    Long,
    Quad,
    Octa,
    SFloat,
    TFloat,
    XFloat,
    FFloat,
    DFloat,
    GFloat,
    HFloat,
    SFloatComplex,
    TFloatComplex,
    XFloatComplex,
    FFloatComplex,
    DFloatComplex,
    GFloatComplex,
    Decimal,
    Bitfield,
    BitfieldByte,
    BitfieldWord,
    BitfieldLong,
    BitfieldQuad,
    BitfieldOcta,
    Char,
    CharVary,
    CharStar,
    Addr,
    AddrLong,
    AddrQuad,
    AddrHw,
    Ptr,
    PtrLong,
    PtrQuad,
    PtrHw,
    Any,
    Void,
    Boolean,
    Structure,
    Union,
    Enum,
    Entry,
    Constant,
}

impl ScalarType {
    /// Natural size in bytes. Pointer-family and enum sizes track the
    /// target word size selected on the command line.
    pub fn natural_size(self, word_size: i64) -> i64 {
        use ScalarType::*;
        match self {
            Byte | Char | CharVary | CharStar | Boolean | Decimal => 1,
            Word => 2,
            Long => 4,
            Quad => 8,
            Octa => 16,
            SFloat | FFloat => 4,
            TFloat | DFloat | GFloat => 8,
            XFloat | HFloat => 16,
            SFloatComplex | FFloatComplex => 8,
            TFloatComplex | DFloatComplex | GFloatComplex => 16,
            XFloatComplex => 32,
            Bitfield | BitfieldByte => 1,
            BitfieldWord => 2,
            BitfieldLong => 4,
            BitfieldQuad => 8,
            BitfieldOcta => 16,
            AddrLong | PtrLong => 4,
            AddrQuad | PtrQuad => 8,
            Addr | AddrHw | Ptr | PtrHw => word_size,
            Enum => 4,
            Any | Void | Structure | Union | Entry | Constant => 0,
        }
    }

    /// Default tag letter inserted between prefix and id when no explicit
    /// tag was supplied.
    pub fn default_tag(self) -> &'static str {
        use ScalarType::*;
        match self {
            Byte => "B",
            Word => "W",
            Long => "L",
            Quad => "Q",
            Octa => "O",
            SFloat => "S",
            TFloat => "T",
            XFloat => "X",
            FFloat => "F",
            DFloat => "D",
            GFloat => "G",
            HFloat => "H",
            SFloatComplex => "SC",
            TFloatComplex => "TC",
            XFloatComplex => "XC",
            FFloatComplex => "FC",
            DFloatComplex => "DC",
            GFloatComplex => "GC",
            Decimal => "P",
            Bitfield | BitfieldByte | BitfieldWord | BitfieldLong | BitfieldQuad
            | BitfieldOcta => "V",
            Char => "C",
            CharVary => "CV",
            CharStar => "CS",
            Addr | AddrLong | AddrQuad | AddrHw => "A",
            Ptr | PtrLong | PtrQuad | PtrHw => "PS",
            Boolean => "B",
            Structure | Union => "R",
            Enum => "N",
            Constant => "K",
            Any | Void | Entry => "",
        }
    }

    /// Integer scalars default to signed; bitfields, pointers and the
    /// character family default to unsigned.
    pub fn default_unsigned(self) -> bool {
        use ScalarType::*;
        matches!(
            self,
            Bitfield
                | BitfieldByte
                | BitfieldWord
                | BitfieldLong
                | BitfieldQuad
                | BitfieldOcta
                | Char
                | CharVary
                | CharStar
                | Addr
                | AddrLong
                | AddrQuad
                | AddrHw
                | Ptr
                | PtrLong
                | PtrQuad
                | PtrHw
                | Boolean
        )
    }

    pub fn is_integer(self) -> bool {
        use ScalarType::*;
        matches!(self, Byte | Word | Long | Quad | Octa)
    }

    pub fn is_bitfield(self) -> bool {
        use ScalarType::*;
        matches!(
            self,
            Bitfield | BitfieldByte | BitfieldWord | BitfieldLong | BitfieldQuad | BitfieldOcta
        )
    }

    /// Address and pointer families can carry a subtype naming their
    /// target type.
    pub fn is_address(self) -> bool {
        use ScalarType::*;
        matches!(
            self,
            Addr | AddrLong | AddrQuad | AddrHw | Ptr | PtrLong | PtrQuad | PtrHw
        )
    }

    /// The host-sized bitfield variant for an integer host width.
    pub fn bitfield_for_host(host: ScalarType) -> Option<ScalarType> {
        use ScalarType::*;
        match host {
            Byte => Some(BitfieldByte),
            Word => Some(BitfieldWord),
            Long => Some(BitfieldLong),
            Quad => Some(BitfieldQuad),
            Octa => Some(BitfieldOcta),
            _ => None,
        }
    }

    /// The smallest host-sized bitfield variant able to hold `bits`.
    /// Saturates at the octaword host.
    pub fn bitfield_for_bits(bits: i64) -> ScalarType {
        use ScalarType::*;
        if bits <= 8 {
            BitfieldByte
        } else if bits <= 16 {
            BitfieldWord
        } else if bits <= 32 {
            BitfieldLong
        } else if bits <= 64 {
            BitfieldQuad
        } else {
            BitfieldOcta
        }
    }
}

/// First id of the declare namespace. Scalar types conceptually occupy
/// the reserved range below it.
pub const DECLARE_MIN: u32 = 64;
pub const DECLARE_MAX: u32 = 16_383;
pub const ITEM_MIN: u32 = 16_384;
pub const ITEM_MAX: u32 = 32_767;
pub const AGGREGATE_MIN: u32 = 32_768;
pub const AGGREGATE_MAX: u32 = 49_151;
pub const ENUM_MIN: u32 = 49_152;
pub const ENUM_MAX: u32 = 65_535;

/// A user-type id, monotonically issued per namespace, never reused
/// within a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub u32);

/// Which registry namespace a TypeID belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Declare,
    Item,
    Aggregate,
    Enum,
}

impl TypeId {
    pub fn namespace(self) -> Option<Namespace> {
        match self.0 {
            DECLARE_MIN..=DECLARE_MAX => Some(Namespace::Declare),
            ITEM_MIN..=ITEM_MAX => Some(Namespace::Item),
            AGGREGATE_MIN..=AGGREGATE_MAX => Some(Namespace::Aggregate),
            ENUM_MIN..=ENUM_MAX => Some(Namespace::Enum),
            _ => None,
        }
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A type reference: either a base scalar or a user type by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeRef {
    Scalar(ScalarType),
    User(TypeId),
}

impl TypeRef {
    pub fn as_scalar(self) -> Option<ScalarType> {
        match self {
            TypeRef::Scalar(s) => Some(s),
            TypeRef::User(_) => None,
        }
    }

    pub fn is_bitfield(self) -> bool {
        matches!(self, TypeRef::Scalar(s) if s.is_bitfield())
    }

    pub fn is_address(self) -> bool {
        matches!(self, TypeRef::Scalar(s) if s.is_address())
    }
}

/// Display radix for numeric constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Radix {
    #[default]
    Dec,
    Oct,
    Hex,
    Bin,
}

/// True when `id` contains no uppercase letters; lowercase ids pull the
/// derived tag down to lowercase as well.
pub fn all_lower(id: &str) -> bool {
    !id.chars().any(|c| c.is_ascii_uppercase())
}
