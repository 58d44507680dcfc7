//! Local storage: archive layout and settings

pub mod layout;
pub mod settings;
