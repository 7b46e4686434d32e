//! Driven adapters: document store, generator HTTP source, realtime push.

pub mod generator;
pub mod memory;
pub mod realtime;

pub use generator::{DEFAULT_GENERATOR_TIMEOUT, GeneratorHttpSource};
pub use memory::MemoryStore;
pub use realtime::{ConnectionHandle, ConnectionRegistry};
