pub mod collect;
pub mod error;
pub mod geo_core;
pub mod metadata;
