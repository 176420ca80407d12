//! These models represent the objects passed around by the agent and the quiz protocols
//!
//! Provider wire formats (openai chat completions, anthropic messages) are converted
//! to and from these structs at the provider boundary, so nothing outside
//! `providers` sees a vendor shape.
pub mod conversation;
pub mod knowledge_check;
pub mod memory;
pub mod message;
pub mod note;
pub mod quiz;
pub mod role;
pub mod tool;
