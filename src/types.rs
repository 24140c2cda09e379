/* Register and variable value types shared by the local table builder. */
/* Type descriptors are kept in the dex native (also JNI) format e.g. Ljava/lang/Object; */

use crate::dex::error::DexError;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while1};
use nom::character::complete::{char, one_of};
use nom::combinator::{all_consuming, map, value, verify};
use nom::sequence::{delimited, preceded};
use nom::IResult;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Descriptor of the type of a value statically known to be `null`.
pub const KNOWN_NULL_DESCRIPTOR: &str = "<null>";
/// Descriptor of `java.lang.Object`.
pub const OBJECT_DESCRIPTOR: &str = "Ljava/lang/Object;";

/// Coarse shape of a [`Type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Primitive(char),
    Void,
    Object,
    Array,
    KnownNull,
}

/// An interned Dalvik type descriptor
///
/// # Examples
///
/// ```
///  use dexlocals::types::Type;
///
///  let t = Type::intern("[Ljava/lang/String;").unwrap();
///  assert_eq!(t.descriptor(), "[Ljava/lang/String;");
///  assert!(t.is_reference());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Type {
    descriptor: Arc<str>,
    kind: TypeKind,
}

static INTERNED: Lazy<Mutex<HashMap<String, Type>>> = Lazy::new(|| Mutex::new(HashMap::new()));

static KNOWN_NULL: Lazy<Type> = Lazy::new(|| Type::register(KNOWN_NULL_DESCRIPTOR, TypeKind::KnownNull));
static OBJECT: Lazy<Type> = Lazy::new(|| Type::register(OBJECT_DESCRIPTOR, TypeKind::Object));

fn parse_descriptor(input: &str) -> IResult<&str, TypeKind> {
    alt((
        value(TypeKind::KnownNull, tag(KNOWN_NULL_DESCRIPTOR)),
        map(one_of("ZBCSIJFD"), TypeKind::Primitive),
        value(TypeKind::Void, char('V')),
        value(
            TypeKind::Object,
            delimited(char('L'), take_while1(|c: char| c != ';' && c != '<'), char(';')),
        ),
        value(
            TypeKind::Array,
            preceded(
                char('['),
                verify(parse_descriptor, |k: &TypeKind| {
                    !matches!(k, TypeKind::Void | TypeKind::KnownNull)
                }),
            ),
        ),
    ))(input)
}

impl Type {
    /// Returns the canonical instance for `descriptor`, parsing it on first use.
    pub fn intern(descriptor: &str) -> Result<Type, DexError> {
        let mut table = INTERNED.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(t) = table.get(descriptor) {
            return Ok(t.clone());
        }
        let kind = match all_consuming(parse_descriptor)(descriptor) {
            Ok((_, kind)) => kind,
            Err(_) => fail!(Malformed, "bad type descriptor {:?}", descriptor),
        };
        let t = Type {
            descriptor: Arc::from(descriptor),
            kind,
        };
        table.insert(descriptor.to_string(), t.clone());
        Ok(t)
    }

    fn register(descriptor: &'static str, kind: TypeKind) -> Type {
        let mut table = INTERNED.lock().unwrap_or_else(PoisonError::into_inner);
        table
            .entry(descriptor.to_string())
            .or_insert_with(|| Type {
                descriptor: Arc::from(descriptor),
                kind,
            })
            .clone()
    }

    /// The type of a register known to hold `null`; it has no external form.
    pub fn known_null() -> Type {
        KNOWN_NULL.clone()
    }

    pub fn object() -> Type {
        OBJECT.clone()
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn is_known_null(&self) -> bool {
        self.kind == TypeKind::KnownNull
    }

    pub fn is_reference(&self) -> bool {
        matches!(self.kind, TypeKind::Object | TypeKind::Array | TypeKind::KnownNull)
    }

    /// Long and double values occupy two registers.
    pub fn is_category2(&self) -> bool {
        matches!(self.kind, TypeKind::Primitive('J') | TypeKind::Primitive('D'))
    }

    /// The type as it may appear in a debug table.
    ///
    /// `<null>` cannot be named in a DEX file, so it is widened to `Object`.
    pub fn debug_visible(&self) -> Type {
        if self.is_known_null() {
            Type::object()
        } else {
            self.clone()
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.descriptor)
    }
}

impl From<Type> for String {
    fn from(t: Type) -> String {
        t.descriptor.to_string()
    }
}

impl TryFrom<String> for Type {
    type Error = DexError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Type::intern(&s)
    }
}

/// Identity of a declared local variable: its name and generic signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalItem {
    pub name: Option<String>,
    pub signature: Option<String>,
}

impl LocalItem {
    pub fn new(name: Option<&str>, signature: Option<&str>) -> Self {
        LocalItem {
            name: name.map(str::to_string),
            signature: signature.map(str::to_string),
        }
    }

    pub fn named(name: &str) -> Self {
        LocalItem::new(Some(name), None)
    }
}

impl fmt::Display for LocalItem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name.as_deref().unwrap_or("?"))?;
        if let Some(sig) = &self.signature {
            write!(f, " \"{}\"", sig)?;
        }
        Ok(())
    }
}

/// A register together with the type and variable it currently holds.
///
/// Two specs are the same binding only when register, type and local all match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegisterSpec {
    pub reg: u16,
    pub ty: Type,
    pub local: Option<LocalItem>,
}

impl RegisterSpec {
    pub fn new(reg: u16, ty: Type, local: Option<LocalItem>) -> Self {
        RegisterSpec { reg, ty, local }
    }

    /// Convenience for a named local with an interned descriptor.
    pub fn local(reg: u16, descriptor: &str, name: &str) -> Result<Self, DexError> {
        Ok(RegisterSpec::new(reg, Type::intern(descriptor)?, Some(LocalItem::named(name))))
    }

    pub fn name(&self) -> Option<&str> {
        self.local.as_ref().and_then(|l| l.name.as_deref())
    }

    pub fn signature(&self) -> Option<&str> {
        self.local.as_ref().and_then(|l| l.signature.as_deref())
    }
}

impl fmt::Display for RegisterSpec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "v{}:{}", self.reg, self.ty)?;
        if let Some(local) = &self.local {
            write!(f, " {}", local)?;
        }
        Ok(())
    }
}

/// Sparse mapping from register number to the binding held there.
///
/// Sets handed around in snapshots are shared behind an `Arc`; a holder that
/// needs to change one goes through `Arc::make_mut`, which copies a shared set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Option<RegisterSpec>>", into = "Vec<Option<RegisterSpec>>")]
pub struct RegisterSpecSet {
    specs: Vec<Option<RegisterSpec>>,
    size: usize,
}

impl RegisterSpecSet {
    /// An empty set able to hold registers `0..max_size`.
    pub fn new(max_size: usize) -> Self {
        RegisterSpecSet {
            specs: vec![None; max_size],
            size: 0,
        }
    }

    pub fn from_specs<I>(max_size: usize, specs: I) -> Result<Self, DexError>
    where
        I: IntoIterator<Item = RegisterSpec>,
    {
        let mut set = RegisterSpecSet::new(max_size);
        for spec in specs {
            set.put(spec)?;
        }
        Ok(set)
    }

    pub fn max_size(&self) -> usize {
        self.specs.len()
    }

    /// Number of bound registers.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn get(&self, reg: usize) -> Option<&RegisterSpec> {
        self.specs.get(reg).and_then(Option::as_ref)
    }

    /// The binding currently held in `spec`'s register, if any.
    pub fn find_matching(&self, spec: &RegisterSpec) -> Option<&RegisterSpec> {
        self.get(spec.reg as usize)
    }

    /// Binds `spec.reg` to `spec`, replacing whatever was there.
    pub fn put(&mut self, spec: RegisterSpec) -> Result<(), DexError> {
        let reg = spec.reg as usize;
        let max = self.specs.len();
        let Some(slot) = self.specs.get_mut(reg) else {
            fail!(IllegalArgument, "register v{} out of range for set of {}", reg, max);
        };
        if slot.is_none() {
            self.size += 1;
        }
        *slot = Some(spec);
        Ok(())
    }

    pub fn remove(&mut self, reg: usize) -> Option<RegisterSpec> {
        let old = self.specs.get_mut(reg).and_then(Option::take);
        if old.is_some() {
            self.size -= 1;
        }
        old
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisterSpec> {
        self.specs.iter().flatten()
    }
}

impl From<RegisterSpecSet> for Vec<Option<RegisterSpec>> {
    fn from(set: RegisterSpecSet) -> Self {
        set.specs
    }
}

impl TryFrom<Vec<Option<RegisterSpec>>> for RegisterSpecSet {
    type Error = DexError;

    fn try_from(specs: Vec<Option<RegisterSpec>>) -> Result<Self, Self::Error> {
        for (reg, spec) in specs.iter().enumerate() {
            if let Some(spec) = spec {
                if spec.reg as usize != reg {
                    fail!(IllegalArgument, "spec {} stored in slot v{}", spec, reg);
                }
            }
        }
        let size = specs.iter().flatten().count();
        Ok(RegisterSpecSet { specs, size })
    }
}
