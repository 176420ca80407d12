mod clock;
mod knowledge;
mod memory;
mod notes;
mod registry;
mod system;

pub use clock::ClockSystem;
pub use knowledge::KnowledgeCheckSystem;
pub use memory::MemorySystem;
pub use notes::NotesSystem;
pub use registry::ToolRegistry;
pub use system::{parse_arguments, System};
