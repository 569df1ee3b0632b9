pub mod constants;
pub mod field_model;
pub mod qualification;
