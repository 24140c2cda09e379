//! # dexlocals
//!
//! Builds the local variable tables that go into the debug info of Dalvik
//! (DEX) methods.
//!
//! A method's final instruction list carries two kinds of local markers:
//! snapshots of every register's binding, and starts of single bindings.
//! [`LocalList::make`] turns those markers into the minimal set of
//! `{register, start, end, name, type}` entries.
//!
//! # Examples
//!
//! ```
//!  use dexlocals::dex::instructions::{DalvInsnList, InsnKind};
//!  use dexlocals::dex::opcodes;
//!  use dexlocals::types::{RegisterSpec, RegisterSpecSet};
//!  use dexlocals::LocalList;
//!
//!  let x = RegisterSpec::local(1, "I", "x").unwrap();
//!  let nop = opcodes::get(0x00).unwrap();
//!  let insns = DalvInsnList::assemble(vec![
//!      InsnKind::snapshot(RegisterSpecSet::from_specs(2, [x]).unwrap()),
//!      InsnKind::plain(nop, &[]),
//!      InsnKind::plain(nop, &[]),
//!  ])
//!  .unwrap();
//!  let locals = LocalList::make(&insns).unwrap();
//!  assert_eq!(locals.len(), 1);
//!  assert_eq!(locals.get(0).unwrap().end(), 2);
//! ```

#[macro_use]
pub mod dex;
mod tests;
pub mod types;

pub use crate::dex::error::{DexError, DexErrorKind};
pub use crate::dex::local_list::{Entry, LocalIndex, LocalList, LocalListBuilder};
