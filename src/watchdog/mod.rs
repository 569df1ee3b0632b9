pub mod breaker;
pub mod dom;
#[allow(clippy::module_inception)]
pub mod watchdog;
