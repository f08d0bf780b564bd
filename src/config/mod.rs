//! Configuration: where vault files live and how passwords are hashed.

pub mod settings;

pub use settings::Settings;
