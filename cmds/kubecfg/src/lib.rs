pub mod cluster;
pub mod commands;
pub mod config;
pub mod engine;
pub mod expand;
pub mod k8s;
pub mod object;
pub mod order;
pub mod secrets;
pub mod telemetry;
#[cfg(test)]
pub mod test_utils;
