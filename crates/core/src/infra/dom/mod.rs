mod memory;

pub use memory::{MemoryDocument, WidgetBehavior};
