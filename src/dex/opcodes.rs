use std::collections::HashMap;
use once_cell::sync::Lazy;
use crate::dex::error::DexError;
use crate::dex::opcode_format::{Dop, DopFlags, InsnFormat::*};

const NONE: DopFlags = DopFlags::empty();
const RESULT: DopFlags = DopFlags::HAS_RESULT;
const BRANCH: DopFlags = DopFlags::CONDITIONAL_BRANCH;

/// Every opcode this crate knows how to describe, ordered by opcode value.
///
/// Columns: opcode, family, next wider encoding, format, flags, name.
pub static DOPS: [Dop; 224] = [
    Dop::new(0x00, 0x00, None, Format10x, NONE, "nop"),
    Dop::new(0x01, 0x01, Some(0x02), Format12x, RESULT, "move"),
    Dop::new(0x02, 0x01, Some(0x03), Format22x, RESULT, "move/from16"),
    Dop::new(0x03, 0x01, None, Format32x, RESULT, "move/16"),
    Dop::new(0x04, 0x04, Some(0x05), Format12x, RESULT, "move-wide"),
    Dop::new(0x05, 0x04, Some(0x06), Format22x, RESULT, "move-wide/from16"),
    Dop::new(0x06, 0x04, None, Format32x, RESULT, "move-wide/16"),
    Dop::new(0x07, 0x07, Some(0x08), Format12x, RESULT, "move-object"),
    Dop::new(0x08, 0x07, Some(0x09), Format22x, RESULT, "move-object/from16"),
    Dop::new(0x09, 0x07, None, Format32x, RESULT, "move-object/16"),
    Dop::new(0x0a, 0x0a, None, Format11x, RESULT, "move-result"),
    Dop::new(0x0b, 0x0b, None, Format11x, RESULT, "move-result-wide"),
    Dop::new(0x0c, 0x0c, None, Format11x, RESULT, "move-result-object"),
    Dop::new(0x0d, 0x0d, None, Format11x, RESULT, "move-exception"),
    Dop::new(0x0e, 0x0e, None, Format10x, NONE, "return-void"),
    Dop::new(0x0f, 0x0f, None, Format11x, NONE, "return"),
    Dop::new(0x10, 0x10, None, Format11x, NONE, "return-wide"),
    Dop::new(0x11, 0x11, None, Format11x, NONE, "return-object"),
    Dop::new(0x12, 0x14, Some(0x13), Format11n, RESULT, "const/4"),
    Dop::new(0x13, 0x14, Some(0x15), Format21s, RESULT, "const/16"),
    Dop::new(0x14, 0x14, None, Format31i, RESULT, "const"),
    Dop::new(0x15, 0x14, Some(0x14), Format21h, RESULT, "const/high16"),
    Dop::new(0x16, 0x18, Some(0x19), Format21s, RESULT, "const-wide/16"),
    Dop::new(0x17, 0x18, Some(0x18), Format31i, RESULT, "const-wide/32"),
    Dop::new(0x18, 0x18, None, Format51l, RESULT, "const-wide"),
    Dop::new(0x19, 0x18, Some(0x17), Format21h, RESULT, "const-wide/high16"),
    Dop::new(0x1a, 0x1a, Some(0x1b), Format21c, RESULT, "const-string"),
    Dop::new(0x1b, 0x1a, None, Format31c, RESULT, "const-string/jumbo"),
    Dop::new(0x1c, 0x1c, None, Format21c, RESULT, "const-class"),
    Dop::new(0x1d, 0x1d, None, Format11x, NONE, "monitor-enter"),
    Dop::new(0x1e, 0x1e, None, Format11x, NONE, "monitor-exit"),
    Dop::new(0x1f, 0x1f, None, Format21c, RESULT, "check-cast"),
    Dop::new(0x20, 0x20, None, Format22c, RESULT, "instance-of"),
    Dop::new(0x21, 0x21, None, Format12x, RESULT, "array-length"),
    Dop::new(0x22, 0x22, None, Format21c, RESULT, "new-instance"),
    Dop::new(0x23, 0x23, None, Format22c, RESULT, "new-array"),
    Dop::new(0x24, 0x24, Some(0x25), Format35c, NONE, "filled-new-array"),
    Dop::new(0x25, 0x24, None, Format3rc, NONE, "filled-new-array/range"),
    Dop::new(0x26, 0x26, None, Format31t, NONE, "fill-array-data"),
    Dop::new(0x27, 0x27, None, Format11x, NONE, "throw"),
    Dop::new(0x28, 0x28, Some(0x29), Format10t, NONE, "goto"),
    Dop::new(0x29, 0x28, Some(0x2a), Format20t, NONE, "goto/16"),
    Dop::new(0x2a, 0x28, None, Format30t, NONE, "goto/32"),
    Dop::new(0x2b, 0x2b, None, Format31t, NONE, "packed-switch"),
    Dop::new(0x2c, 0x2c, None, Format31t, NONE, "sparse-switch"),
    Dop::new(0x2d, 0x2d, None, Format23x, RESULT, "cmpl-float"),
    Dop::new(0x2e, 0x2e, None, Format23x, RESULT, "cmpg-float"),
    Dop::new(0x2f, 0x2f, None, Format23x, RESULT, "cmpl-double"),
    Dop::new(0x30, 0x30, None, Format23x, RESULT, "cmpg-double"),
    Dop::new(0x31, 0x31, None, Format23x, RESULT, "cmp-long"),
    Dop::new(0x32, 0x32, None, Format22t, BRANCH, "if-eq"),
    Dop::new(0x33, 0x33, None, Format22t, BRANCH, "if-ne"),
    Dop::new(0x34, 0x34, None, Format22t, BRANCH, "if-lt"),
    Dop::new(0x35, 0x35, None, Format22t, BRANCH, "if-ge"),
    Dop::new(0x36, 0x36, None, Format22t, BRANCH, "if-gt"),
    Dop::new(0x37, 0x37, None, Format22t, BRANCH, "if-le"),
    Dop::new(0x38, 0x38, None, Format21t, BRANCH, "if-eqz"),
    Dop::new(0x39, 0x39, None, Format21t, BRANCH, "if-nez"),
    Dop::new(0x3a, 0x3a, None, Format21t, BRANCH, "if-ltz"),
    Dop::new(0x3b, 0x3b, None, Format21t, BRANCH, "if-gez"),
    Dop::new(0x3c, 0x3c, None, Format21t, BRANCH, "if-gtz"),
    Dop::new(0x3d, 0x3d, None, Format21t, BRANCH, "if-lez"),
    Dop::new(0x44, 0x44, None, Format23x, RESULT, "aget"),
    Dop::new(0x45, 0x45, None, Format23x, RESULT, "aget-wide"),
    Dop::new(0x46, 0x46, None, Format23x, RESULT, "aget-object"),
    Dop::new(0x47, 0x47, None, Format23x, RESULT, "aget-boolean"),
    Dop::new(0x48, 0x48, None, Format23x, RESULT, "aget-byte"),
    Dop::new(0x49, 0x49, None, Format23x, RESULT, "aget-char"),
    Dop::new(0x4a, 0x4a, None, Format23x, RESULT, "aget-short"),
    Dop::new(0x4b, 0x4b, None, Format23x, NONE, "aput"),
    Dop::new(0x4c, 0x4c, None, Format23x, NONE, "aput-wide"),
    Dop::new(0x4d, 0x4d, None, Format23x, NONE, "aput-object"),
    Dop::new(0x4e, 0x4e, None, Format23x, NONE, "aput-boolean"),
    Dop::new(0x4f, 0x4f, None, Format23x, NONE, "aput-byte"),
    Dop::new(0x50, 0x50, None, Format23x, NONE, "aput-char"),
    Dop::new(0x51, 0x51, None, Format23x, NONE, "aput-short"),
    Dop::new(0x52, 0x52, None, Format22c, RESULT, "iget"),
    Dop::new(0x53, 0x53, None, Format22c, RESULT, "iget-wide"),
    Dop::new(0x54, 0x54, None, Format22c, RESULT, "iget-object"),
    Dop::new(0x55, 0x55, None, Format22c, RESULT, "iget-boolean"),
    Dop::new(0x56, 0x56, None, Format22c, RESULT, "iget-byte"),
    Dop::new(0x57, 0x57, None, Format22c, RESULT, "iget-char"),
    Dop::new(0x58, 0x58, None, Format22c, RESULT, "iget-short"),
    Dop::new(0x59, 0x59, None, Format22c, NONE, "iput"),
    Dop::new(0x5a, 0x5a, None, Format22c, NONE, "iput-wide"),
    Dop::new(0x5b, 0x5b, None, Format22c, NONE, "iput-object"),
    Dop::new(0x5c, 0x5c, None, Format22c, NONE, "iput-boolean"),
    Dop::new(0x5d, 0x5d, None, Format22c, NONE, "iput-byte"),
    Dop::new(0x5e, 0x5e, None, Format22c, NONE, "iput-char"),
    Dop::new(0x5f, 0x5f, None, Format22c, NONE, "iput-short"),
    Dop::new(0x60, 0x60, None, Format21c, RESULT, "sget"),
    Dop::new(0x61, 0x61, None, Format21c, RESULT, "sget-wide"),
    Dop::new(0x62, 0x62, None, Format21c, RESULT, "sget-object"),
    Dop::new(0x63, 0x63, None, Format21c, RESULT, "sget-boolean"),
    Dop::new(0x64, 0x64, None, Format21c, RESULT, "sget-byte"),
    Dop::new(0x65, 0x65, None, Format21c, RESULT, "sget-char"),
    Dop::new(0x66, 0x66, None, Format21c, RESULT, "sget-short"),
    Dop::new(0x67, 0x67, None, Format21c, NONE, "sput"),
    Dop::new(0x68, 0x68, None, Format21c, NONE, "sput-wide"),
    Dop::new(0x69, 0x69, None, Format21c, NONE, "sput-object"),
    Dop::new(0x6a, 0x6a, None, Format21c, NONE, "sput-boolean"),
    Dop::new(0x6b, 0x6b, None, Format21c, NONE, "sput-byte"),
    Dop::new(0x6c, 0x6c, None, Format21c, NONE, "sput-char"),
    Dop::new(0x6d, 0x6d, None, Format21c, NONE, "sput-short"),
    Dop::new(0x6e, 0x6e, Some(0x74), Format35c, NONE, "invoke-virtual"),
    Dop::new(0x6f, 0x6f, Some(0x75), Format35c, NONE, "invoke-super"),
    Dop::new(0x70, 0x70, Some(0x76), Format35c, NONE, "invoke-direct"),
    Dop::new(0x71, 0x71, Some(0x77), Format35c, NONE, "invoke-static"),
    Dop::new(0x72, 0x72, Some(0x78), Format35c, NONE, "invoke-interface"),
    Dop::new(0x74, 0x6e, None, Format3rc, NONE, "invoke-virtual/range"),
    Dop::new(0x75, 0x6f, None, Format3rc, NONE, "invoke-super/range"),
    Dop::new(0x76, 0x70, None, Format3rc, NONE, "invoke-direct/range"),
    Dop::new(0x77, 0x71, None, Format3rc, NONE, "invoke-static/range"),
    Dop::new(0x78, 0x72, None, Format3rc, NONE, "invoke-interface/range"),
    Dop::new(0x7b, 0x7b, None, Format12x, RESULT, "neg-int"),
    Dop::new(0x7c, 0x7c, None, Format12x, RESULT, "not-int"),
    Dop::new(0x7d, 0x7d, None, Format12x, RESULT, "neg-long"),
    Dop::new(0x7e, 0x7e, None, Format12x, RESULT, "not-long"),
    Dop::new(0x7f, 0x7f, None, Format12x, RESULT, "neg-float"),
    Dop::new(0x80, 0x80, None, Format12x, RESULT, "neg-double"),
    Dop::new(0x81, 0x81, None, Format12x, RESULT, "int-to-long"),
    Dop::new(0x82, 0x82, None, Format12x, RESULT, "int-to-float"),
    Dop::new(0x83, 0x83, None, Format12x, RESULT, "int-to-double"),
    Dop::new(0x84, 0x84, None, Format12x, RESULT, "long-to-int"),
    Dop::new(0x85, 0x85, None, Format12x, RESULT, "long-to-float"),
    Dop::new(0x86, 0x86, None, Format12x, RESULT, "long-to-double"),
    Dop::new(0x87, 0x87, None, Format12x, RESULT, "float-to-int"),
    Dop::new(0x88, 0x88, None, Format12x, RESULT, "float-to-long"),
    Dop::new(0x89, 0x89, None, Format12x, RESULT, "float-to-double"),
    Dop::new(0x8a, 0x8a, None, Format12x, RESULT, "double-to-int"),
    Dop::new(0x8b, 0x8b, None, Format12x, RESULT, "double-to-long"),
    Dop::new(0x8c, 0x8c, None, Format12x, RESULT, "double-to-float"),
    Dop::new(0x8d, 0x8d, None, Format12x, RESULT, "int-to-byte"),
    Dop::new(0x8e, 0x8e, None, Format12x, RESULT, "int-to-char"),
    Dop::new(0x8f, 0x8f, None, Format12x, RESULT, "int-to-short"),
    Dop::new(0x90, 0x90, None, Format23x, RESULT, "add-int"),
    Dop::new(0x91, 0x91, None, Format23x, RESULT, "sub-int"),
    Dop::new(0x92, 0x92, None, Format23x, RESULT, "mul-int"),
    Dop::new(0x93, 0x93, None, Format23x, RESULT, "div-int"),
    Dop::new(0x94, 0x94, None, Format23x, RESULT, "rem-int"),
    Dop::new(0x95, 0x95, None, Format23x, RESULT, "and-int"),
    Dop::new(0x96, 0x96, None, Format23x, RESULT, "or-int"),
    Dop::new(0x97, 0x97, None, Format23x, RESULT, "xor-int"),
    Dop::new(0x98, 0x98, None, Format23x, RESULT, "shl-int"),
    Dop::new(0x99, 0x99, None, Format23x, RESULT, "shr-int"),
    Dop::new(0x9a, 0x9a, None, Format23x, RESULT, "ushr-int"),
    Dop::new(0x9b, 0x9b, None, Format23x, RESULT, "add-long"),
    Dop::new(0x9c, 0x9c, None, Format23x, RESULT, "sub-long"),
    Dop::new(0x9d, 0x9d, None, Format23x, RESULT, "mul-long"),
    Dop::new(0x9e, 0x9e, None, Format23x, RESULT, "div-long"),
    Dop::new(0x9f, 0x9f, None, Format23x, RESULT, "rem-long"),
    Dop::new(0xa0, 0xa0, None, Format23x, RESULT, "and-long"),
    Dop::new(0xa1, 0xa1, None, Format23x, RESULT, "or-long"),
    Dop::new(0xa2, 0xa2, None, Format23x, RESULT, "xor-long"),
    Dop::new(0xa3, 0xa3, None, Format23x, RESULT, "shl-long"),
    Dop::new(0xa4, 0xa4, None, Format23x, RESULT, "shr-long"),
    Dop::new(0xa5, 0xa5, None, Format23x, RESULT, "ushr-long"),
    Dop::new(0xa6, 0xa6, None, Format23x, RESULT, "add-float"),
    Dop::new(0xa7, 0xa7, None, Format23x, RESULT, "sub-float"),
    Dop::new(0xa8, 0xa8, None, Format23x, RESULT, "mul-float"),
    Dop::new(0xa9, 0xa9, None, Format23x, RESULT, "div-float"),
    Dop::new(0xaa, 0xaa, None, Format23x, RESULT, "rem-float"),
    Dop::new(0xab, 0xab, None, Format23x, RESULT, "add-double"),
    Dop::new(0xac, 0xac, None, Format23x, RESULT, "sub-double"),
    Dop::new(0xad, 0xad, None, Format23x, RESULT, "mul-double"),
    Dop::new(0xae, 0xae, None, Format23x, RESULT, "div-double"),
    Dop::new(0xaf, 0xaf, None, Format23x, RESULT, "rem-double"),
    Dop::new(0xb0, 0x90, Some(0x90), Format12x, RESULT, "add-int/2addr"),
    Dop::new(0xb1, 0x91, Some(0x91), Format12x, RESULT, "sub-int/2addr"),
    Dop::new(0xb2, 0x92, Some(0x92), Format12x, RESULT, "mul-int/2addr"),
    Dop::new(0xb3, 0x93, Some(0x93), Format12x, RESULT, "div-int/2addr"),
    Dop::new(0xb4, 0x94, Some(0x94), Format12x, RESULT, "rem-int/2addr"),
    Dop::new(0xb5, 0x95, Some(0x95), Format12x, RESULT, "and-int/2addr"),
    Dop::new(0xb6, 0x96, Some(0x96), Format12x, RESULT, "or-int/2addr"),
    Dop::new(0xb7, 0x97, Some(0x97), Format12x, RESULT, "xor-int/2addr"),
    Dop::new(0xb8, 0x98, Some(0x98), Format12x, RESULT, "shl-int/2addr"),
    Dop::new(0xb9, 0x99, Some(0x99), Format12x, RESULT, "shr-int/2addr"),
    Dop::new(0xba, 0x9a, Some(0x9a), Format12x, RESULT, "ushr-int/2addr"),
    Dop::new(0xbb, 0x9b, Some(0x9b), Format12x, RESULT, "add-long/2addr"),
    Dop::new(0xbc, 0x9c, Some(0x9c), Format12x, RESULT, "sub-long/2addr"),
    Dop::new(0xbd, 0x9d, Some(0x9d), Format12x, RESULT, "mul-long/2addr"),
    Dop::new(0xbe, 0x9e, Some(0x9e), Format12x, RESULT, "div-long/2addr"),
    Dop::new(0xbf, 0x9f, Some(0x9f), Format12x, RESULT, "rem-long/2addr"),
    Dop::new(0xc0, 0xa0, Some(0xa0), Format12x, RESULT, "and-long/2addr"),
    Dop::new(0xc1, 0xa1, Some(0xa1), Format12x, RESULT, "or-long/2addr"),
    Dop::new(0xc2, 0xa2, Some(0xa2), Format12x, RESULT, "xor-long/2addr"),
    Dop::new(0xc3, 0xa3, Some(0xa3), Format12x, RESULT, "shl-long/2addr"),
    Dop::new(0xc4, 0xa4, Some(0xa4), Format12x, RESULT, "shr-long/2addr"),
    Dop::new(0xc5, 0xa5, Some(0xa5), Format12x, RESULT, "ushr-long/2addr"),
    Dop::new(0xc6, 0xa6, Some(0xa6), Format12x, RESULT, "add-float/2addr"),
    Dop::new(0xc7, 0xa7, Some(0xa7), Format12x, RESULT, "sub-float/2addr"),
    Dop::new(0xc8, 0xa8, Some(0xa8), Format12x, RESULT, "mul-float/2addr"),
    Dop::new(0xc9, 0xa9, Some(0xa9), Format12x, RESULT, "div-float/2addr"),
    Dop::new(0xca, 0xaa, Some(0xaa), Format12x, RESULT, "rem-float/2addr"),
    Dop::new(0xcb, 0xab, Some(0xab), Format12x, RESULT, "add-double/2addr"),
    Dop::new(0xcc, 0xac, Some(0xac), Format12x, RESULT, "sub-double/2addr"),
    Dop::new(0xcd, 0xad, Some(0xad), Format12x, RESULT, "mul-double/2addr"),
    Dop::new(0xce, 0xae, Some(0xae), Format12x, RESULT, "div-double/2addr"),
    Dop::new(0xcf, 0xaf, Some(0xaf), Format12x, RESULT, "rem-double/2addr"),
    Dop::new(0xd0, 0x90, None, Format22s, RESULT, "add-int/lit16"),
    Dop::new(0xd1, 0xd1, None, Format22s, RESULT, "rsub-int"),
    Dop::new(0xd2, 0x92, None, Format22s, RESULT, "mul-int/lit16"),
    Dop::new(0xd3, 0x93, None, Format22s, RESULT, "div-int/lit16"),
    Dop::new(0xd4, 0x94, None, Format22s, RESULT, "rem-int/lit16"),
    Dop::new(0xd5, 0x95, None, Format22s, RESULT, "and-int/lit16"),
    Dop::new(0xd6, 0x96, None, Format22s, RESULT, "or-int/lit16"),
    Dop::new(0xd7, 0x97, None, Format22s, RESULT, "xor-int/lit16"),
    Dop::new(0xd8, 0x90, Some(0xd0), Format22b, RESULT, "add-int/lit8"),
    Dop::new(0xd9, 0xd1, Some(0xd1), Format22b, RESULT, "rsub-int/lit8"),
    Dop::new(0xda, 0x92, Some(0xd2), Format22b, RESULT, "mul-int/lit8"),
    Dop::new(0xdb, 0x93, Some(0xd3), Format22b, RESULT, "div-int/lit8"),
    Dop::new(0xdc, 0x94, Some(0xd4), Format22b, RESULT, "rem-int/lit8"),
    Dop::new(0xdd, 0x95, Some(0xd5), Format22b, RESULT, "and-int/lit8"),
    Dop::new(0xde, 0x96, Some(0xd6), Format22b, RESULT, "or-int/lit8"),
    Dop::new(0xdf, 0x97, Some(0xd7), Format22b, RESULT, "xor-int/lit8"),
    Dop::new(0xe0, 0x98, None, Format22b, RESULT, "shl-int/lit8"),
    Dop::new(0xe1, 0x99, None, Format22b, RESULT, "shr-int/lit8"),
    Dop::new(0xe2, 0x9a, None, Format22b, RESULT, "ushr-int/lit8"),
    Dop::new(0xfa, 0xfa, Some(0xfb), Format45cc, NONE, "invoke-polymorphic"),
    Dop::new(0xfb, 0xfa, None, Format4rcc, NONE, "invoke-polymorphic/range"),
    Dop::new(0xfc, 0xfc, Some(0xfd), Format35c, NONE, "invoke-custom"),
    Dop::new(0xfd, 0xfc, None, Format3rc, NONE, "invoke-custom/range"),
    Dop::new(0xfe, 0xfe, None, Format21c, RESULT, "const-method-handle"),
    Dop::new(0xff, 0xff, None, Format21c, RESULT, "const-method-type"),
];

// Conditional branches paired with their negation; every pair appears once.
const OPPOSITE_TESTS: [(u16, u16); 6] = [
    (0x32, 0x33), // if-eq / if-ne
    (0x34, 0x35), // if-lt / if-ge
    (0x36, 0x37), // if-gt / if-le
    (0x38, 0x39), // if-eqz / if-nez
    (0x3a, 0x3b), // if-ltz / if-gez
    (0x3c, 0x3d), // if-gtz / if-lez
];

static BY_OPCODE: Lazy<HashMap<u16, &'static Dop>> = Lazy::new(|| {
    DOPS.iter().map(|d| (d.opcode(), d)).collect()
});

static OPPOSITES: Lazy<HashMap<u16, u16>> = Lazy::new(|| {
    OPPOSITE_TESTS
        .iter()
        .flat_map(|&(a, b)| [(a, b), (b, a)])
        .collect()
});

/// Looks up the descriptor for `opcode`, if it is a known one.
pub fn find(opcode: u16) -> Option<&'static Dop> {
    BY_OPCODE.get(&opcode).copied()
}

pub fn get(opcode: u16) -> Result<&'static Dop, DexError> {
    match find(opcode) {
        Some(dop) => Ok(dop),
        None => fail!(IllegalArgument, "unknown opcode 0x{:02x}", opcode),
    }
}

/// Looks up a descriptor by its mnemonic, e.g. `"move/from16"`.
pub fn by_name(name: &str) -> Option<&'static Dop> {
    DOPS.iter().find(|d| d.name() == name)
}

/// Returns the branch that tests the opposite condition of `opcode`.
pub fn opposite_test(opcode: u16) -> Result<&'static Dop, DexError> {
    match OPPOSITES.get(&opcode) {
        Some(&other) => get(other),
        None => fail!(IllegalArgument, "opcode 0x{:02x} is not a conditional branch", opcode),
    }
}

/// Walks a next-chain starting at `first`, smallest encoding first.
pub fn chain(first: &'static Dop) -> impl Iterator<Item = &'static Dop> {
    std::iter::successors(Some(first), |d| d.next_dop())
}
