pub mod coordinator;
pub mod overlay_model;
pub mod policy;
pub mod port_key;
pub mod position;
pub mod vault;
