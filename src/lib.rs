//! Hierarchical Temporal Memory with the Cortical Learning Algorithm.
//!
//! A [`Connections`] memory holds columns, cells, segments and synapses. The [`SpatialPooler`]
//! turns binary input vectors into sparse sets of active columns, and the [`TemporalMemory`]
//! learns sequences of those column sets and predicts which cells become active next.
//!
//! ```no_run
//! use htm_cla::{Connections, HtmConfig, SpatialPooler, TemporalMemory};
//!
//! # fn main() -> htm_cla::Result<()> {
//! let config = HtmConfig::new(vec![64], vec![128]);
//! let mut conn = Connections::new(config.clone())?;
//! let mut sp = SpatialPooler::new(&config);
//! let mut tm = TemporalMemory::new(&config);
//! sp.init(&mut conn)?;
//! tm.init(&mut conn)?;
//!
//! let input = vec![false; 64];
//! let columns = sp.compute_active(&mut conn, &input, true)?;
//! if !columns.is_empty() {
//!     let cycle = tm.compute(&mut conn, &columns, true)?;
//!     println!("{} predictive cells", cycle.predictive_cells.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod core;

pub use crate::core::config::HtmConfig;
pub use crate::core::connections::{Connections, HtmStatistics, SegmentActivity};
pub use crate::core::error::{HtmError, Result};
pub use crate::core::homeostasis::{HomeostaticPlasticityController, StabilityEvent};
pub use crate::core::ids::{CellId, ColumnId, SegmentId, SynapseId};
pub use crate::core::spatial_pooler::{Execution, SpatialPooler};
pub use crate::core::temporal_memory::{ComputeCycle, TemporalMemory};
