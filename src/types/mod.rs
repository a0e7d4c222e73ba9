// Shared type definitions
// Each submodule defines types used across the core and by its collaborators.

pub mod errors;
pub mod event;
pub mod lifecycle;
pub mod settings;
pub mod status;
pub mod tab;
