use std::fmt;

#[macro_export]
macro_rules! err {
    ($kind:ident, $msg:literal) => {
        $crate::dex::error::DexError::new($crate::dex::error::DexErrorKind::$kind, $msg)
    };
    ($kind:ident, $fmtstr:literal, $($args:tt)*) => {
        $crate::dex::error::DexError::new($crate::dex::error::DexErrorKind::$kind, &format!($fmtstr, $($args)*))
    };
}

#[macro_export]
macro_rules! fail {
    ($kind:ident, $msg:literal) => {
        return Err($crate::err!($kind, $msg))
    };
    ($kind:ident, $fmtstr:literal, $($args:tt)*) => {
        return Err($crate::err!($kind, $fmtstr, $($args)*))
    };
}

/// Broad category of a [`DexError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DexErrorKind {
    /// A caller passed a value outside the operation's contract.
    IllegalArgument,
    /// A register spec carried no local variable metadata.
    NullReference,
    /// An operation was attempted in a state that does not allow it.
    IllegalState,
    /// The marker stream contradicted itself; the producer has a bug.
    Internal,
    /// Text that should have been a descriptor could not be parsed.
    Malformed,
}

impl fmt::Display for DexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DexErrorKind::IllegalArgument => "illegal argument",
            DexErrorKind::NullReference => "null reference",
            DexErrorKind::IllegalState => "illegal state",
            DexErrorKind::Internal => "internal error",
            DexErrorKind::Malformed => "malformed input",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DexError {
    kind: DexErrorKind,
    msg: String,
    contexts: Vec<String>,
}

impl DexError {
    pub fn new(kind: DexErrorKind, msg: &str) -> Self {
        DexError {
            kind,
            msg: msg.to_string(),
            contexts: Vec::new(),
        }
    }

    pub fn with_context(base: DexError, context: String) -> Self {
        let mut contexts = base.contexts;
        contexts.push(context);
        DexError { kind: base.kind, msg: base.msg, contexts }
    }

    pub fn kind(&self) -> DexErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.msg
    }
}

impl fmt::Display for DexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.msg)?;
        let mut connector = " for ";
        for context in &self.contexts {
            write!(f, "{}{}", connector, context)?;
            connector = " of ";
        }
        Ok(())
    }
}

impl std::error::Error for DexError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_chains_contexts() {
        let base = err!(IllegalArgument, "end <= start");
        let e = DexError::with_context(base, "entry v1".to_string());
        let e = DexError::with_context(e, "method foo".to_string());
        assert_eq!(e.kind(), DexErrorKind::IllegalArgument);
        assert_eq!(e.to_string(), "illegal argument: end <= start for entry v1 of method foo");
    }

    #[test]
    fn formatted_messages() {
        let e = err!(Internal, "unmatched local end at {:04x}", 0x12);
        assert_eq!(e.message(), "unmatched local end at 0012");
    }
}
