//! Local variable events of a `debug_info_item`.
//!
//! A [`LocalList`] says where each local lives; the DEX debug state machine
//! wants the same information as start/end/restart events in address order.

use std::collections::HashMap;
use crate::dex::error::DexError;
use crate::dex::local_list::{Entry, LocalList};
use crate::dex::{write_u1, write_uleb128, write_uleb128p1, NO_INDEX};

pub const DBG_END_SEQUENCE: u8 = 0x00;
pub const DBG_ADVANCE_PC: u8 = 0x01;
pub const DBG_START_LOCAL: u8 = 0x03;
pub const DBG_START_LOCAL_EXTENDED: u8 = 0x04;
pub const DBG_END_LOCAL: u8 = 0x05;
pub const DBG_RESTART_LOCAL: u8 = 0x06;

/// Resolves names and descriptors into the indices of the DEX file being written.
pub trait DebugIndexResolver {
    fn string_index(&self, value: &str) -> Result<u32, DexError>;
    fn type_index(&self, descriptor: &str) -> Result<u32, DexError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalEventOptions {
    /// Reintroduce a local that returns to its register with `DBG_RESTART_LOCAL`.
    pub restart_locals: bool,
}

impl Default for LocalEventOptions {
    fn default() -> Self {
        LocalEventOptions { restart_locals: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalEventKind<'a> {
    Start(&'a Entry),
    /// A start for a local that carries a generic signature.
    StartExtended(&'a Entry),
    End(u16),
    Restart(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalEvent<'a> {
    pub address: u32,
    pub kind: LocalEventKind<'a>,
}

/// Orders the starts and ends of `list` the way the debug state machine consumes them.
///
/// Locals still live at `code_size` get no end event. At a shared address
/// ends come before starts.
pub fn local_events<'a>(list: &'a LocalList, code_size: u32, options: &LocalEventOptions) -> Vec<LocalEvent<'a>> {
    let mut raw: Vec<(u32, bool, &Entry)> = Vec::with_capacity(list.len() * 2);
    for entry in list {
        raw.push((entry.start(), true, entry));
        if entry.end() < code_size {
            raw.push((entry.end(), false, entry));
        }
    }
    raw.sort_by_key(|&(address, is_start, _)| (address, is_start));

    let mut last_ended: HashMap<u16, &Entry> = HashMap::new();
    let mut events = Vec::with_capacity(raw.len());
    for (address, is_start, entry) in raw {
        let reg = entry.register();
        let kind = if !is_start {
            last_ended.insert(reg, entry);
            LocalEventKind::End(reg)
        } else if options.restart_locals
            && last_ended.get(&reg).is_some_and(|prev| same_variable(prev, entry))
        {
            LocalEventKind::Restart(reg)
        } else if entry.signature().is_some() {
            LocalEventKind::StartExtended(entry)
        } else {
            LocalEventKind::Start(entry)
        };
        events.push(LocalEvent { address, kind });
    }
    events
}

fn same_variable(a: &Entry, b: &Entry) -> bool {
    a.spec().local == b.spec().local && a.display_type() == b.display_type()
}

/// Encodes `events` as debug opcodes, terminated by `DBG_END_SEQUENCE`.
pub fn encode_local_events(
    events: &[LocalEvent<'_>],
    resolver: &impl DebugIndexResolver,
) -> Result<Vec<u8>, DexError> {
    let mut ops = Vec::new();
    let mut pc = 0u32;
    for event in events {
        advance_pc(&mut ops, &mut pc, event.address)?;
        match event.kind {
            LocalEventKind::Start(entry) => {
                write_u1(&mut ops, DBG_START_LOCAL);
                write_local_header(&mut ops, entry, resolver)?;
            }
            LocalEventKind::StartExtended(entry) => {
                write_u1(&mut ops, DBG_START_LOCAL_EXTENDED);
                write_local_header(&mut ops, entry, resolver)?;
                let sig_idx = optional_string(resolver, entry.signature(), entry)?;
                write_uleb128p1(&mut ops, sig_idx);
            }
            LocalEventKind::End(reg) => {
                write_u1(&mut ops, DBG_END_LOCAL);
                write_uleb128(&mut ops, reg as u32);
            }
            LocalEventKind::Restart(reg) => {
                write_u1(&mut ops, DBG_RESTART_LOCAL);
                write_uleb128(&mut ops, reg as u32);
            }
        }
    }
    write_u1(&mut ops, DBG_END_SEQUENCE);
    Ok(ops)
}

fn advance_pc(ops: &mut Vec<u8>, pc: &mut u32, target: u32) -> Result<(), DexError> {
    if target < *pc {
        fail!(IllegalState, "local event at {:04x} after {:04x}", target, *pc);
    }
    if target > *pc {
        write_u1(ops, DBG_ADVANCE_PC);
        write_uleb128(ops, target - *pc);
        *pc = target;
    }
    Ok(())
}

fn write_local_header(
    ops: &mut Vec<u8>,
    entry: &Entry,
    resolver: &impl DebugIndexResolver,
) -> Result<(), DexError> {
    let name_idx = optional_string(resolver, entry.name(), entry)?;
    let type_idx = resolver
        .type_index(entry.display_type().descriptor())
        .map_err(|e| DexError::with_context(e, format!("type of local {}", entry)))?;
    write_uleb128(ops, entry.register() as u32);
    write_uleb128p1(ops, name_idx);
    write_uleb128p1(ops, type_idx);
    Ok(())
}

fn optional_string(
    resolver: &impl DebugIndexResolver,
    value: Option<&str>,
    entry: &Entry,
) -> Result<u32, DexError> {
    match value {
        Some(v) => resolver
            .string_index(v)
            .map_err(|e| DexError::with_context(e, format!("local {}", entry))),
        None => Ok(NO_INDEX),
    }
}
