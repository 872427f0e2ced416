pub mod batch;
pub mod collector;
pub mod sample_points;
