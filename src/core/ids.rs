//! Stable integer handles into the connectivity memory.
//!
//! Every "belongs to" relation in the model (cell to column, synapse to segment, segment to cell)
//! is stored as one of these indices instead of a reference, so the memory can be mutated in place
//! without aliasing.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! index_type {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub usize);

        impl $name {
            /// Returns the raw index.
            #[inline]
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl From<usize> for $name {
            #[inline]
            fn from(index: usize) -> Self {
                Self(index)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }
    };
}

index_type!(
    /// Index of a column, in `0..num_columns`.
    ColumnId,
    "column"
);
index_type!(
    /// Global cell index: `column * cells_per_column + slot`.
    CellId,
    "cell"
);
index_type!(
    /// Flat index of a distal segment. Indices of destroyed segments are recycled.
    SegmentId,
    "segment"
);
index_type!(
    /// Creation ordinal of a synapse, unique for the lifetime of the memory.
    SynapseId,
    "synapse"
);

impl CellId {
    /// Column that owns this cell.
    #[inline]
    pub fn column(self, cells_per_column: usize) -> ColumnId {
        ColumnId(self.0 / cells_per_column)
    }
}
