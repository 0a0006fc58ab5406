//! Logical addressing across the two containers.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Which of the two tracked containers a record lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    /// Leaf container: referenced by the dependent one, references nothing
    /// outside itself, receives every appended record.
    Leaf,
    /// Dependent container: reaches the leaf through one dependency slot.
    Dependent,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Leaf, Side::Dependent];

    #[inline]
    pub(crate) const fn slot(self) -> usize {
        match self {
            Side::Leaf => 0,
            Side::Dependent => 1,
        }
    }

    /// Address of `position` in this container.
    #[inline]
    pub const fn at(self, position: usize) -> LogicalIndex {
        match self {
            Side::Leaf => LogicalIndex::Leaf(position),
            Side::Dependent => LogicalIndex::Dependent(position),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Leaf => "leaf",
            Side::Dependent => "dependent",
        })
    }
}

/// Address of one record in either container.
///
/// The signed form (`!position` for leaf records, `position` for dependent
/// ones) is what manifests and the command line use; everything inside the
/// crate works with the tagged form. Ordering follows the signed form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LogicalIndex {
    Leaf(usize),
    Dependent(usize),
}

impl LogicalIndex {
    #[inline]
    pub const fn side(self) -> Side {
        match self {
            LogicalIndex::Leaf(_) => Side::Leaf,
            LogicalIndex::Dependent(_) => Side::Dependent,
        }
    }

    /// Position in the container's record table.
    #[inline]
    pub const fn position(self) -> usize {
        match self {
            LogicalIndex::Leaf(p) | LogicalIndex::Dependent(p) => p,
        }
    }

    #[inline]
    pub const fn is_leaf(self) -> bool {
        matches!(self, LogicalIndex::Leaf(_))
    }

    /// Signed encoding.
    pub const fn to_signed(self) -> i64 {
        match self {
            LogicalIndex::Leaf(p) => !(p as i64),
            LogicalIndex::Dependent(p) => p as i64,
        }
    }

    /// Decode the signed encoding.
    pub const fn from_signed(value: i64) -> Self {
        if value < 0 {
            LogicalIndex::Leaf(!value as usize)
        } else {
            LogicalIndex::Dependent(value as usize)
        }
    }
}

impl Ord for LogicalIndex {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_signed().cmp(&other.to_signed())
    }
}

impl PartialOrd for LogicalIndex {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for LogicalIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_signed())
    }
}

impl FromStr for LogicalIndex {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Self::from_signed)
    }
}

impl From<LogicalIndex> for i64 {
    fn from(index: LogicalIndex) -> Self {
        index.to_signed()
    }
}
