use std::fmt;
use bitflags::bitflags;
use crate::dex::error::DexError;
use crate::dex::opcodes;

/// Highest opcode value a [`Dop`] may carry.
pub const MAX_OPCODE: u16 = 0xff;

/// Fixed-size Dalvik instruction formats.
///
/// The name encodes the size in code units, the register count and the
/// operand kind, e.g. `22c` is two units, two registers and a constant pool index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InsnFormat {
    Format10x,
    Format12x,
    Format11n,
    Format11x,
    Format10t,
    Format20t,
    Format22x,
    Format21t,
    Format21s,
    Format21h,
    Format21c,
    Format23x,
    Format22b,
    Format22t,
    Format22s,
    Format22c,
    Format30t,
    Format32x,
    Format31i,
    Format31t,
    Format31c,
    Format35c,
    Format3rc,
    Format45cc,
    Format4rcc,
    Format51l,
}

impl InsnFormat {
    /// Size of an instruction in this format, in 16-bit code units.
    pub const fn code_units(&self) -> u32 {
        match self {
            InsnFormat::Format10x
            | InsnFormat::Format12x
            | InsnFormat::Format11n
            | InsnFormat::Format11x
            | InsnFormat::Format10t => 1,

            InsnFormat::Format20t
            | InsnFormat::Format22x
            | InsnFormat::Format21t
            | InsnFormat::Format21s
            | InsnFormat::Format21h
            | InsnFormat::Format21c
            | InsnFormat::Format23x
            | InsnFormat::Format22b
            | InsnFormat::Format22t
            | InsnFormat::Format22s
            | InsnFormat::Format22c => 2,

            InsnFormat::Format30t
            | InsnFormat::Format32x
            | InsnFormat::Format31i
            | InsnFormat::Format31t
            | InsnFormat::Format31c
            | InsnFormat::Format35c
            | InsnFormat::Format3rc => 3,

            InsnFormat::Format45cc | InsnFormat::Format4rcc => 4,

            InsnFormat::Format51l => 5,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            InsnFormat::Format10x => "10x",
            InsnFormat::Format12x => "12x",
            InsnFormat::Format11n => "11n",
            InsnFormat::Format11x => "11x",
            InsnFormat::Format10t => "10t",
            InsnFormat::Format20t => "20t",
            InsnFormat::Format22x => "22x",
            InsnFormat::Format21t => "21t",
            InsnFormat::Format21s => "21s",
            InsnFormat::Format21h => "21h",
            InsnFormat::Format21c => "21c",
            InsnFormat::Format23x => "23x",
            InsnFormat::Format22b => "22b",
            InsnFormat::Format22t => "22t",
            InsnFormat::Format22s => "22s",
            InsnFormat::Format22c => "22c",
            InsnFormat::Format30t => "30t",
            InsnFormat::Format32x => "32x",
            InsnFormat::Format31i => "31i",
            InsnFormat::Format31t => "31t",
            InsnFormat::Format31c => "31c",
            InsnFormat::Format35c => "35c",
            InsnFormat::Format3rc => "3rc",
            InsnFormat::Format45cc => "45cc",
            InsnFormat::Format4rcc => "4rcc",
            InsnFormat::Format51l => "51l",
        }
    }
}

impl fmt::Display for InsnFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DopFlags: u32 {
        /// Writes a result into its first register.
        const HAS_RESULT = 0x1;
        /// One of the `if-*` tests.
        const CONDITIONAL_BRANCH = 0x2;
    }
}

/// A Dalvik opcode together with the format it is encoded in.
///
/// Opcodes that do the same thing in different encodings (`move`,
/// `move/from16`, `move/16`) share a `family` and are linked through `next`,
/// from the smallest encoding to the widest.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Dop {
    opcode: u16,
    family: u16,
    next: Option<u16>,
    format: InsnFormat,
    flags: DopFlags,
    name: &'static str,
}

impl Dop {
    /// Creates a descriptor.
    ///
    /// # Panics
    ///
    /// Panics when an opcode value is above [`MAX_OPCODE`], when `next`
    /// points back at `opcode`, or when `name` is empty. In a `static`
    /// table these are compile errors.
    pub const fn new(
        opcode: u16,
        family: u16,
        next: Option<u16>,
        format: InsnFormat,
        flags: DopFlags,
        name: &'static str,
    ) -> Self {
        assert!(opcode <= MAX_OPCODE, "invalid opcode");
        assert!(family <= MAX_OPCODE, "invalid family");
        if let Some(n) = next {
            assert!(n <= MAX_OPCODE, "invalid next opcode");
            assert!(n != opcode, "opcode chained to itself");
        }
        assert!(!name.is_empty(), "missing name");
        Dop {
            opcode,
            family,
            next,
            format,
            flags,
            name,
        }
    }

    pub fn opcode(&self) -> u16 {
        self.opcode
    }

    pub fn family(&self) -> u16 {
        self.family
    }

    /// Opcode of the next wider encoding to try, if there is one.
    pub fn next_opcode(&self) -> Option<u16> {
        self.next
    }

    pub fn format(&self) -> InsnFormat {
        self.format
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn flags(&self) -> DopFlags {
        self.flags
    }

    pub fn has_result(&self) -> bool {
        self.flags.contains(DopFlags::HAS_RESULT)
    }

    pub fn is_conditional_branch(&self) -> bool {
        self.flags.contains(DopFlags::CONDITIONAL_BRANCH)
    }

    pub fn next_dop(&self) -> Option<&'static Dop> {
        self.next.and_then(opcodes::find)
    }

    /// The canonical member of this opcode's family.
    pub fn family_dop(&self) -> Result<&'static Dop, DexError> {
        opcodes::get(self.family)
    }

    /// The test with the opposite sense, e.g. `if-ge` for `if-lt`.
    pub fn opposite_test(&self) -> Result<&'static Dop, DexError> {
        opcodes::opposite_test(self.opcode)
    }
}

impl fmt::Display for Dop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
