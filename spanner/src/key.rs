use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use crate::statement::ToValue;
use crate::value::Value;

/// A Key can be either a primary key or a secondary index key.
///
/// Key parts are compared in order. A key with fewer parts than the table's
/// primary key addresses every row whose key starts with those parts when it
/// is used as a range bound.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key {
    pub(crate) values: Vec<Value>,
}

impl Key {
    /// new creates a single-part Key
    /// # Examples
    /// ```
    ///    use spanner_lite::key::Key;
    ///    let key1 = Key::new(&"a");
    ///    let key2 = Key::new(&1);
    /// ```
    pub fn new(value: &dyn ToValue) -> Key {
        Key::composite(&[value])
    }

    /// composite creates a Key from several parts
    /// # Examples
    /// ```
    ///    use spanner_lite::key::Key;
    ///    let multi_key = Key::composite(&[&2, &2]);
    /// ```
    pub fn composite(values: &[&dyn ToValue]) -> Key {
        Key {
            values: values.iter().map(|x| x.to_value()).collect(),
        }
    }

    pub(crate) fn from_values(values: Vec<Value>) -> Key {
        Key { values }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Compares only the leading parts present in `bound`.
    fn cmp_prefix(&self, bound: &Key) -> Ordering {
        for (a, b) in self.values.iter().zip(bound.values.iter()) {
            match a.cmp(b) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        Ordering::Equal
    }

    pub(crate) fn starts_with(&self, prefix: &Key) -> bool {
        prefix.len() <= self.len() && self.cmp_prefix(prefix) == Ordering::Equal
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, ")")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RangeKind {
    /// ClosedOpen is closed on the left and open on the right: the Start
    /// key is included, the End key is excluded.
    ClosedOpen,

    /// ClosedClosed is closed on the left and the right: both keys are included.
    ClosedClosed,

    /// OpenClosed is open on the left and closed on the right: the Start
    /// key is excluded, the End key is included.
    OpenClosed,

    /// OpenOpen is open on the left and the right: neither key is included.
    OpenOpen,
}

/// A KeyRange represents a range of rows in a table or index.
///
/// A range has a Start key and an End key. Keys may be prefixes of the table's
/// primary key, in which case the bound applies to every row sharing the prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyRange {
    pub(crate) start: Key,
    pub(crate) end: Key,
    pub kind: RangeKind,
}

impl KeyRange {
    pub fn new(start: Key, end: Key, kind: RangeKind) -> KeyRange {
        KeyRange { start, end, kind }
    }

    pub fn contains(&self, key: &Key) -> bool {
        let start = key.cmp_prefix(&self.start);
        let end = key.cmp_prefix(&self.end);
        let after_start = match self.kind {
            RangeKind::ClosedOpen | RangeKind::ClosedClosed => start != Ordering::Less,
            RangeKind::OpenClosed | RangeKind::OpenOpen => start == Ordering::Greater,
        };
        let before_end = match self.kind {
            RangeKind::ClosedClosed | RangeKind::OpenClosed => end != Ordering::Greater,
            RangeKind::ClosedOpen | RangeKind::OpenOpen => end == Ordering::Less,
        };
        after_start && before_end
    }
}

/// A KeySet defines a collection of Cloud Spanner keys and/or key ranges.
///
/// All the keys are expected to be in the same table. The keys need not be
/// sorted in any particular way.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct KeySet {
    pub(crate) keys: Vec<Key>,
    pub(crate) ranges: Vec<KeyRange>,
    pub(crate) all: bool,
}

/// all_keys returns a KeySet that represents all Keys of a table or a index.
pub fn all_keys() -> KeySet {
    KeySet {
        keys: vec![],
        ranges: vec![],
        all: true,
    }
}

impl KeySet {
    pub fn is_all(&self) -> bool {
        self.all
    }

    /// Point keys, if the set consists of nothing else.
    pub(crate) fn point_keys(&self) -> Option<&[Key]> {
        if self.all || !self.ranges.is_empty() {
            None
        } else {
            Some(&self.keys)
        }
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.all || self.keys.iter().any(|k| k == key) || self.ranges.iter().any(|r| r.contains(key))
    }
}

impl From<KeyRange> for KeySet {
    fn from(key_range: KeyRange) -> Self {
        KeySet {
            keys: vec![],
            ranges: vec![key_range],
            all: false,
        }
    }
}

impl From<Key> for KeySet {
    fn from(key: Key) -> Self {
        KeySet {
            keys: vec![key],
            ranges: vec![],
            all: false,
        }
    }
}

impl From<Vec<Key>> for KeySet {
    fn from(keys: Vec<Key>) -> Self {
        KeySet {
            keys,
            ranges: vec![],
            all: false,
        }
    }
}
