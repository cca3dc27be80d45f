pub mod column;
pub mod config;
pub mod connections;
pub mod error;
pub mod homeostasis;
pub mod ids;
pub mod segment;
pub mod sparse_matrix;
pub mod spatial_pooler;
pub mod synapses;
pub mod temporal_memory;
pub mod topology;
