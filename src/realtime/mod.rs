pub mod registry;
pub mod thread;
