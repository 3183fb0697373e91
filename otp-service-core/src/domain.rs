pub mod benchmark;
pub mod tenant_settings;

pub use benchmark::*;
pub use tenant_settings::*;
