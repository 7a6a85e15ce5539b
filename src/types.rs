//! Integer type lattice.
//!
//! Every expression node carries a [`Type`]. Binary nodes take the
//! [`promote`]d type of their operands; the code generator picks register
//! width and load/store instructions from it.

use std::{fmt::Display, ops::BitOr};

/// Base integer type, ordered by rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[allow(missing_docs)]
pub enum BaseType {
    Char,
    Short,
    Int,
    Long,
    LongLong,
}

impl BaseType {
    /// Size of the type in bytes.
    pub fn size(self) -> i32 {
        match self {
            BaseType::Char => 1,
            BaseType::Short => 2,
            BaseType::Int => 4,
            BaseType::Long | BaseType::LongLong => 8,
        }
    }
}

/// cv-qualifier bit set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Qualifiers(u8);

impl Qualifiers {
    /// No qualifier.
    pub const NONE: Self = Self(0);
    /// `const`
    pub const CONST: Self = Self(1 << 0);
    /// `volatile`
    pub const VOLATILE: Self = Self(1 << 1);
    /// `restrict`
    pub const RESTRICT: Self = Self(1 << 2);

    /// Check if all qualifiers in `other` are set.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Qualifiers {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// Storage class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StorageClass {
    /// No storage class written.
    #[default]
    None,
    /// `auto`
    Auto,
    /// `static`
    Static,
    /// `extern`
    Extern,
    /// `register`
    Register,
}

/// Value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Type {
    /// Base integer type.
    pub base: BaseType,
    /// Signedness.
    pub signed: bool,
    /// cv-qualifiers, dropped by promotion.
    pub qualifiers: Qualifiers,
    /// Storage class, dropped by promotion.
    pub storage: StorageClass,
}

/// Register width used to hold a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegWidth {
    /// 32-bit `w` register.
    Word,
    /// 64-bit `x` register.
    DoubleWord,
}

/// Width suffix of load and store instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreSuffix {
    /// `b`, one byte.
    Byte,
    /// `h`, two bytes.
    Halfword,
    /// Natural register width.
    None,
}

impl Type {
    /// Unqualified type.
    pub const fn new(base: BaseType, signed: bool) -> Self {
        Self {
            base,
            signed,
            qualifiers: Qualifiers::NONE,
            storage: StorageClass::None,
        }
    }

    /// `int`
    pub const fn int() -> Self {
        Self::new(BaseType::Int, true)
    }

    /// `unsigned int`
    pub const fn uint() -> Self {
        Self::new(BaseType::Int, false)
    }

    /// `long`
    pub const fn long() -> Self {
        Self::new(BaseType::Long, true)
    }

    /// `char`
    pub const fn char() -> Self {
        Self::new(BaseType::Char, true)
    }

    /// The same type without qualifiers and storage class.
    pub fn unqualified(self) -> Self {
        Self::new(self.base, self.signed)
    }

    /// Register width for values of this type.
    pub fn register_width(self) -> RegWidth {
        match self.base {
            BaseType::Long | BaseType::LongLong => RegWidth::DoubleWord,
            _ => RegWidth::Word,
        }
    }

    /// Load/store suffix for values of this type.
    pub fn store_suffix(self) -> StoreSuffix {
        match self.base {
            BaseType::Char => StoreSuffix::Byte,
            BaseType::Short => StoreSuffix::Halfword,
            _ => StoreSuffix::None,
        }
    }

    /// Bytes reserved in the stack frame for a local of this type.
    pub fn slot_size(self) -> i32 {
        match self.register_width() {
            RegWidth::Word => 4,
            RegWidth::DoubleWord => 8,
        }
    }
}

/// Result type of a binary operation.
///
/// The higher rank wins with its signedness. Between equal ranks the
/// unsigned operand wins, whichever side it is on.
pub fn promote(a: Type, b: Type) -> Type {
    let winner = match a.base.cmp(&b.base) {
        std::cmp::Ordering::Greater => a,
        std::cmp::Ordering::Less => b,
        std::cmp::Ordering::Equal => {
            if !a.signed {
                a
            } else {
                b
            }
        }
    };
    winner.unqualified()
}

impl Display for BaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BaseType::Char => write!(f, "char"),
            BaseType::Short => write!(f, "short"),
            BaseType::Int => write!(f, "int"),
            BaseType::Long => write!(f, "long"),
            BaseType::LongLong => write!(f, "long long"),
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.storage {
            StorageClass::None => {}
            StorageClass::Auto => write!(f, "auto ")?,
            StorageClass::Static => write!(f, "static ")?,
            StorageClass::Extern => write!(f, "extern ")?,
            StorageClass::Register => write!(f, "register ")?,
        }
        if self.qualifiers.contains(Qualifiers::CONST) {
            write!(f, "const ")?;
        }
        if self.qualifiers.contains(Qualifiers::VOLATILE) {
            write!(f, "volatile ")?;
        }
        if self.qualifiers.contains(Qualifiers::RESTRICT) {
            write!(f, "restrict ")?;
        }
        if !self.signed {
            write!(f, "unsigned ")?;
        }
        write!(f, "{}", self.base)
    }
}
