//! Diagnostics collected while flattening wire objects
//!
//! Type mismatches are recovered locally: the field is left unset, the
//! problem is logged and recorded here for the host to surface as a warning.

use std::fmt;

use crate::coerce::TypeMismatch;

/// A recovered per-field problem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Config path of the field (e.g., "srcaddr[1].name")
    pub path: String,
    pub mismatch: TypeMismatch,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.mismatch)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn type_mismatch(&mut self, path: impl Into<String>, mismatch: TypeMismatch) {
        let diagnostic = Diagnostic {
            path: path.into(),
            mismatch,
        };
        log::warn!("ignoring field {}", diagnostic);
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }
}

/// Join a parent path and a child field name
pub(crate) fn child_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}
