pub mod scenario;
pub mod sim_document;
pub mod sim_dom;
pub mod sim_host;
pub mod world;
