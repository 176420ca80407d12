pub mod anthropic;
pub mod base;
pub mod configs;
pub mod factory;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod openai;
pub mod utils;
