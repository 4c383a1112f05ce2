pub mod config;
pub mod console;
pub mod error;
pub mod hotplug;
pub mod logging;
pub mod models;
pub mod recovery;
pub mod session;
pub mod tools;
