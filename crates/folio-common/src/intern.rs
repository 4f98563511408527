//! Interned string pool.
//!
//! Tag names, attribute names, namespace URIs, and CSS custom identifiers
//! are compared constantly during tree construction and selector matching.
//! Interning turns every one of those comparisons into a pointer check.
//!
//! The pool is process-wide and grow-only: a string, once interned, lives for
//! the remainder of the process. Creation is idempotent - interning the same
//! text twice returns the same handle.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

/// Global set of interned strings. Entries are leaked `Box<str>` allocations,
/// which is what makes the `&'static str` handles stable.
static POOL: Mutex<Option<HashSet<&'static str>>> = Mutex::new(None);

/// A handle into the interned string pool.
///
/// Two `Atom`s are equal if and only if they point at the same pool entry,
/// so equality is a pointer comparison. Ordering falls back to the string
/// contents so atoms can key ordered maps deterministically.
#[derive(Clone, Copy)]
pub struct Atom(&'static str);

impl Atom {
    /// Intern `text` and return its handle.
    ///
    /// Idempotent: `Atom::from_str(t) == Atom::from_str(t)` by pointer
    /// identity for every `t`.
    ///
    /// # Panics
    ///
    /// Panics if the pool mutex is poisoned.
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut guard = POOL.lock().unwrap();
        let pool = guard.get_or_insert_with(HashSet::new);
        if let Some(existing) = pool.get(text) {
            return Self(existing);
        }
        let leaked: &'static str = Box::leak(text.to_owned().into_boxed_str());
        let _ = pool.insert(leaked);
        Self(leaked)
    }

    /// The interned text.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.0
    }

    /// True for the interned empty string.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0.is_empty()
    }

    /// ASCII case-insensitive comparison against arbitrary text.
    /// Used for HTML attribute value matching where the document language
    /// defines the attribute as case-insensitive.
    #[must_use]
    pub fn eq_ignore_ascii_case(self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl Default for Atom {
    fn default() -> Self {
        Self::new("")
    }
}

impl PartialEq for Atom {
    fn eq(&self, other: &Self) -> bool {
        // Interning guarantees equal contents share one pool entry.
        std::ptr::eq(self.0.as_ptr(), other.0.as_ptr())
    }
}

impl Eq for Atom {}

impl PartialEq<str> for Atom {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Atom {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Hash for Atom {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Hashing the address is consistent with pointer equality and avoids
        // re-hashing the string bytes on every map probe.
        (self.0.as_ptr() as usize).hash(state);
    }
}

impl PartialOrd for Atom {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Atom {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(other.0)
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Atom({:?})", self.0)
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl From<&str> for Atom {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_idempotent() {
        let a = Atom::new("division");
        let b = Atom::new("division");
        assert_eq!(a, b);
        assert!(std::ptr::eq(a.as_str().as_ptr(), b.as_str().as_ptr()));
    }

    #[test]
    fn distinct_text_yields_distinct_atoms() {
        let a = Atom::new("tr");
        let b = Atom::new("td");
        assert_ne!(a, b);
    }

    #[test]
    fn ordering_follows_contents() {
        let a = Atom::new("aardvark-test");
        let b = Atom::new("zebra-test");
        assert!(a < b);
    }

    #[test]
    fn atoms_compare_against_plain_strings() {
        let a = Atom::new("colspan");
        assert_eq!(a, "colspan");
        assert!(a.eq_ignore_ascii_case("COLSPAN"));
    }

    #[test]
    fn empty_atom_is_default() {
        assert!(Atom::default().is_empty());
        assert_eq!(Atom::default(), Atom::new(""));
    }
}
