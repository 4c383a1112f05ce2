pub mod adb;
pub mod classify;
pub mod executor;
pub mod fastboot;
pub mod locator;
pub mod parse;
pub mod probe;
pub mod runner;

#[cfg(test)]
pub(crate) mod test_utils;
