pub mod agent;
pub mod decision;
pub mod errors;
pub mod matcher;
pub mod models;
pub mod prompt_template;
pub mod providers;
pub mod quiz;
pub mod store;
pub mod systems;
