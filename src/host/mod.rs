// Host bindings
// In-memory implementation of every collaborator, used by tests and the replay tool.

pub mod memory;
