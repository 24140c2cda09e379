//! Address-assigned Dalvik instruction lists, including the local variable markers

use std::fmt;
use std::sync::Arc;
use crate::dex::error::DexError;
use crate::dex::opcode_format::Dop;
use crate::types::{RegisterSpec, RegisterSpecSet};

#[derive(Debug, Clone)]
pub enum InsnKind {
    /// An ordinary instruction; it only contributes its size.
    Plain {
        dop: &'static Dop,
        registers: Vec<u16>,
    },
    /// The complete set of register bindings from this address on.
    LocalSnapshot(Arc<RegisterSpecSet>),
    /// A single binding that begins at this address.
    LocalStart(RegisterSpec),
}

impl InsnKind {
    pub fn plain(dop: &'static Dop, registers: &[u16]) -> Self {
        InsnKind::Plain {
            dop,
            registers: registers.to_vec(),
        }
    }

    pub fn snapshot(set: RegisterSpecSet) -> Self {
        InsnKind::LocalSnapshot(Arc::new(set))
    }

    /// Markers occupy no code space.
    pub fn code_units(&self) -> u32 {
        match self {
            InsnKind::Plain { dop, .. } => dop.format().code_units(),
            InsnKind::LocalSnapshot(_) | InsnKind::LocalStart(_) => 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DalvInsn {
    address: u32,
    kind: InsnKind,
}

impl DalvInsn {
    pub fn new(address: u32, kind: InsnKind) -> Self {
        DalvInsn { address, kind }
    }

    pub fn address(&self) -> u32 {
        self.address
    }

    pub fn kind(&self) -> &InsnKind {
        &self.kind
    }

    /// Address just past this instruction, or `None` if that overflows.
    pub fn next_address(&self) -> Option<u32> {
        self.address.checked_add(self.kind.code_units())
    }
}

impl fmt::Display for DalvInsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}: ", self.address)?;
        match &self.kind {
            InsnKind::Plain { dop, registers } => {
                write!(f, "{}", dop)?;
                let mut sep = " ";
                for r in registers {
                    write!(f, "{}v{}", sep, r)?;
                    sep = ", ";
                }
                Ok(())
            }
            InsnKind::LocalSnapshot(_) => write!(f, "local-snapshot"),
            InsnKind::LocalStart(spec) => {
                write!(f, "local-start v{} {}:{}", spec.reg, spec.name().unwrap_or("?"), spec.ty)
            }
        }
    }
}

/// The final instruction list of one method.
#[derive(Debug, Clone, Default)]
pub struct DalvInsnList {
    insns: Vec<DalvInsn>,
    code_size: u32,
}

impl DalvInsnList {
    /// Lays `kinds` out back to back starting at address 0.
    pub fn assemble(kinds: Vec<InsnKind>) -> Result<Self, DexError> {
        let mut address = 0u32;
        let mut insns = Vec::with_capacity(kinds.len());
        for kind in kinds {
            let insn = DalvInsn::new(address, kind);
            let Some(next) = insn.next_address() else {
                fail!(IllegalArgument, "code size overflows after {:08x}", address);
            };
            insns.push(insn);
            address = next;
        }
        Ok(DalvInsnList {
            insns,
            code_size: address,
        })
    }

    /// Wraps instructions whose addresses were assigned elsewhere.
    pub fn with_addresses(insns: Vec<DalvInsn>, code_size: u32) -> Result<Self, DexError> {
        let mut last = 0u32;
        for insn in &insns {
            if insn.address() < last {
                fail!(IllegalArgument, "instruction at {:04x} precedes {:04x}", insn.address(), last);
            }
            let Some(next) = insn.next_address() else {
                fail!(IllegalArgument, "instruction at {:08x} overflows the address space", insn.address());
            };
            if next > code_size {
                fail!(IllegalArgument, "instruction at {:04x} runs past code size {:04x}", insn.address(), code_size);
            }
            last = insn.address();
        }
        Ok(DalvInsnList { insns, code_size })
    }

    /// Total size of the method's code, in code units.
    pub fn code_size(&self) -> u32 {
        self.code_size
    }

    pub fn len(&self) -> usize {
        self.insns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insns.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DalvInsn> {
        self.insns.iter()
    }
}

impl<'a> IntoIterator for &'a DalvInsnList {
    type Item = &'a DalvInsn;
    type IntoIter = std::slice::Iter<'a, DalvInsn>;

    fn into_iter(self) -> Self::IntoIter {
        self.insns.iter()
    }
}
