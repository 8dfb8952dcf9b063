pub mod config;
pub mod deglue;
pub mod error;
pub mod geometry;
pub mod invariants;
pub mod model;
pub mod pdf;
pub mod pipeline;
pub mod refine;
pub mod source;
pub mod spread;
pub mod text;
