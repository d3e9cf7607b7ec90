pub mod ai;
mod app_config;
pub mod parser;

pub use ai::*;
pub use app_config::*;

#[cfg(test)]
mod tests;
