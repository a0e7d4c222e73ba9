// Stateless services and collaborator contracts
// Services provide pure logic (classification, URL codec, whitelist, debounce) and the traits of external collaborators.

pub mod collaborators;
pub mod debounce;
pub mod status_classifier;
pub mod suspended_url;
pub mod whitelist;
