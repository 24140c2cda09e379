//! Local variable tables: which variable lives in which register, and where.
//!
//! [`LocalList::make`] walks a method's final instruction list once and
//! turns its local markers into [`Entry`] values, one per contiguous span
//! during which a single binding occupies a register.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use log::{debug, error, trace};
use once_cell::sync::Lazy;
use rangemap::RangeMap;
use serde::{Deserialize, Deserializer, Serialize};
use crate::dex::error::DexError;
use crate::dex::instructions::{DalvInsnList, InsnKind};
use crate::types::{RegisterSpec, RegisterSpecSet, Type};

/// One binding of a local variable to a register over `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "EntryRecord", into = "EntryRecord")]
pub struct Entry {
    start: u32,
    end: u32,
    spec: RegisterSpec,
    display_type: Type,
}

impl Entry {
    pub fn new(start: u32, end: u32, spec: RegisterSpec) -> Result<Entry, DexError> {
        if end <= start {
            fail!(IllegalArgument, "end <= start ({:04x} <= {:04x})", end, start);
        }
        check_local(&spec)?;
        let display_type = spec.ty.debug_visible();
        Ok(Entry {
            start,
            end,
            spec,
            display_type,
        })
    }

    /// A copy of this entry ending at `new_end` instead.
    pub fn with_end(&self, new_end: u32) -> Result<Entry, DexError> {
        Entry::new(self.start, new_end, self.spec.clone())
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    /// Exclusive.
    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn address_range(&self) -> Range<u32> {
        self.start..self.end
    }

    pub fn register(&self) -> u16 {
        self.spec.reg
    }

    pub fn name(&self) -> Option<&str> {
        self.spec.name()
    }

    pub fn signature(&self) -> Option<&str> {
        self.spec.signature()
    }

    /// The type recorded in the register spec, which may be `<null>`.
    pub fn spec_type(&self) -> &Type {
        &self.spec.ty
    }

    /// The type to write to a debug table; never `<null>`.
    pub fn display_type(&self) -> &Type {
        &self.display_type
    }

    pub fn spec(&self) -> &RegisterSpec {
        &self.spec
    }

    /// Whether this entry describes exactly the binding `spec`.
    pub fn matches(&self, spec: &RegisterSpec) -> bool {
        self.spec == *spec
    }

    pub fn matches_entry(&self, other: &Entry) -> bool {
        self.matches(&other.spec)
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}..{:04x} v{} {}:{}",
            self.start,
            self.end,
            self.register(),
            self.name().unwrap_or("?"),
            self.display_type
        )?;
        if let Some(sig) = self.signature() {
            write!(f, " \"{}\"", sig)?;
        }
        Ok(())
    }
}

/// Serialized form of an [`Entry`]. Loading goes back through [`Entry::new`],
/// so the display type is recomputed rather than stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryRecord {
    pub start: u32,
    pub end: u32,
    pub spec: RegisterSpec,
}

impl From<Entry> for EntryRecord {
    fn from(e: Entry) -> Self {
        EntryRecord {
            start: e.start,
            end: e.end,
            spec: e.spec,
        }
    }
}

impl TryFrom<EntryRecord> for Entry {
    type Error = DexError;

    fn try_from(r: EntryRecord) -> Result<Self, Self::Error> {
        Entry::new(r.start, r.end, r.spec)
    }
}

fn check_local(spec: &RegisterSpec) -> Result<(), DexError> {
    if spec.local.is_none() {
        fail!(NullReference, "spec.local == null");
    }
    Ok(())
}

static EMPTY: Lazy<Arc<LocalList>> = Lazy::new(|| Arc::new(LocalList { entries: Vec::new() }));

/// A finished, read-only local variable table.
///
/// Tables are only loaded through [`LocalList::deserialize_shared`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalList {
    entries: Vec<Entry>,
}

#[derive(Deserialize)]
struct LocalListRecord {
    entries: Vec<Entry>,
}

impl LocalList {
    /// The shared table of a method without locals.
    pub fn empty() -> Arc<LocalList> {
        Arc::clone(&EMPTY)
    }

    /// Builds the table for `insns`.
    pub fn make(insns: &DalvInsnList) -> Result<Arc<LocalList>, DexError> {
        let mut builder = LocalListBuilder::new(insns.code_size());
        for insn in insns {
            match insn.kind() {
                InsnKind::LocalSnapshot(set) => builder.snapshot(insn.address(), set)?,
                InsnKind::LocalStart(spec) => builder.start_local(insn.address(), spec)?,
                InsnKind::Plain { .. } => {}
            }
        }
        builder.finish()
    }

    /// Wraps already finished entries, rejecting any two that overlap in one register.
    pub fn from_entries(entries: Vec<Entry>) -> Result<Arc<LocalList>, DexError> {
        if entries.is_empty() {
            return Ok(LocalList::empty());
        }
        let list = LocalList { entries };
        list.index()?;
        Ok(Arc::new(list))
    }

    /// Loads a serialized table through [`from_entries`](Self::from_entries).
    ///
    /// Fits `#[serde(deserialize_with = "LocalList::deserialize_shared")]`
    /// on an `Arc<LocalList>` field.
    pub fn deserialize_shared<'de, D>(deserializer: D) -> Result<Arc<LocalList>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let record = LocalListRecord::deserialize(deserializer)?;
        LocalList::from_entries(record.entries).map_err(serde::de::Error::custom)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, n: usize) -> Option<&Entry> {
        self.entries.get(n)
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    /// Indexes the entries by register for address lookups.
    ///
    /// Fails if two entries for one register overlap.
    pub fn index(&self) -> Result<LocalIndex<'_>, DexError> {
        let mut by_register: BTreeMap<u16, RangeMap<u32, usize>> = BTreeMap::new();
        for (i, entry) in self.entries.iter().enumerate() {
            let ranges = by_register.entry(entry.register()).or_default();
            if ranges.overlaps(&entry.address_range()) {
                fail!(IllegalState, "entry {} overlaps another local in v{}", entry, entry.register());
            }
            ranges.insert(entry.address_range(), i);
        }
        Ok(LocalIndex {
            list: self,
            by_register,
        })
    }
}

impl<'a> IntoIterator for &'a LocalList {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl fmt::Display for LocalList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            writeln!(f, "  [{}] {}", i, entry)?;
        }
        Ok(())
    }
}

/// Per-register address lookup over a [`LocalList`].
#[derive(Debug)]
pub struct LocalIndex<'a> {
    list: &'a LocalList,
    by_register: BTreeMap<u16, RangeMap<u32, usize>>,
}

impl<'a> LocalIndex<'a> {
    /// The entry occupying `reg` at `address`, if any.
    pub fn local_at(&self, reg: u16, address: u32) -> Option<&'a Entry> {
        let i = *self.by_register.get(&reg)?.get(&address)?;
        self.list.get(i)
    }

    /// Every entry live at `address`, in register order.
    pub fn live_at(&self, address: u32) -> impl Iterator<Item = &'a Entry> + '_ {
        self.by_register
            .values()
            .filter_map(move |ranges| ranges.get(&address))
            .filter_map(move |&i| self.list.get(i))
    }
}

// A scope still being built; `end` stays open until the binding goes away.
#[derive(Debug)]
struct PendingScope {
    start: u32,
    end: Option<u32>,
    spec: RegisterSpec,
}

/// Incremental builder behind [`LocalList::make`].
///
/// Feed it markers in address order, then call [`finish`](Self::finish).
#[derive(Debug)]
pub struct LocalListBuilder {
    code_size: u32,
    state: Option<Arc<RegisterSpecSet>>,
    state_max: usize,
    scopes: Vec<PendingScope>,
}

impl LocalListBuilder {
    pub fn new(code_size: u32) -> Self {
        LocalListBuilder {
            code_size,
            state: None,
            state_max: 0,
            scopes: Vec::new(),
        }
    }

    /// Applies a full snapshot of register bindings at `address`.
    pub fn snapshot(&mut self, address: u32, new_state: &Arc<RegisterSpecSet>) -> Result<(), DexError> {
        let old_state = match &self.state {
            Some(state) => Some(Arc::clone(state)),
            None => {
                self.state_max = new_state.max_size();
                None
            }
        };

        for reg in 0..self.state_max {
            let old_spec = old_state.as_deref().and_then(|s| s.get(reg));
            let new_spec = new_state.get(reg);
            match (old_spec, new_spec) {
                (Some(old), None) => self.end_scope(address, old)?,
                (None, Some(new)) => self.start_scope(address, new)?,
                (Some(old), Some(new)) if old != new => {
                    self.end_scope(address, old)?;
                    self.start_scope(address, new)?;
                }
                _ => {}
            }
        }

        self.state = Some(Arc::clone(new_state));
        Ok(())
    }

    /// Applies a single new binding at `address`.
    pub fn start_local(&mut self, address: u32, spec: &RegisterSpec) -> Result<(), DexError> {
        let Some(state) = &self.state else {
            fail!(IllegalState, "local start {} at {:04x} before any snapshot", spec, address);
        };

        let old = state.find_matching(spec).cloned();
        match old {
            Some(old) if old == *spec => return Ok(()),
            Some(old) => {
                self.end_scope(address, &old)?;
                self.start_scope(address, spec)?;
            }
            None => self.start_scope(address, spec)?,
        }

        if let Some(state) = self.state.as_mut() {
            Arc::make_mut(state).put(spec.clone())?;
        }
        Ok(())
    }

    /// Produces the finished table; scopes still open run to the end of the code.
    pub fn finish(self) -> Result<Arc<LocalList>, DexError> {
        let code_size = self.code_size;
        let mut entries = Vec::with_capacity(self.scopes.len());
        for scope in self.scopes {
            let end = scope.end.unwrap_or(code_size);
            if end == scope.start {
                continue;
            }
            entries.push(Entry::new(scope.start, end, scope.spec)?);
        }

        debug!("built local list of {} entries over {} code units", entries.len(), code_size);
        if entries.is_empty() {
            return Ok(LocalList::empty());
        }
        Ok(Arc::new(LocalList { entries }))
    }

    fn start_scope(&mut self, address: u32, spec: &RegisterSpec) -> Result<(), DexError> {
        check_local(spec)?;
        trace!("start {} at {:04x}", spec, address);
        self.scopes.push(PendingScope {
            start: address,
            end: None,
            spec: spec.clone(),
        });
        Ok(())
    }

    fn end_scope(&mut self, address: u32, spec: &RegisterSpec) -> Result<(), DexError> {
        let found = self
            .scopes
            .iter()
            .rposition(|s| s.end.is_none() && s.spec == *spec);
        let Some(i) = found else {
            error!("unmatched local end {} at {:04x}", spec, address);
            fail!(Internal, "unmatched local end {} at {:04x}", spec, address);
        };

        trace!("end {} at {:04x}", spec, address);
        if self.scopes[i].start == address {
            self.scopes.remove(i);
        } else {
            self.scopes[i].end = Some(address);
        }
        Ok(())
    }
}
