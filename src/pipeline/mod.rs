// src/pipeline/mod.rs
// The event-driven core: Processor, Analyzer Workers, Aggregator,
// Broadcaster, and the Supervisor that wires them together.

pub mod aggregator;
pub mod broadcaster;
pub mod processor;
pub mod supervisor;
pub mod workers;

pub use aggregator::Aggregator;
pub use broadcaster::{Broadcaster, Subscriber};
pub use processor::ConversationProcessor;
pub use supervisor::PipelineSupervisor;
