pub mod mongo_benchmark;
pub mod redis_benchmark;
pub mod tenant_settings;

pub use mongo_benchmark::*;
pub use redis_benchmark::*;
pub use tenant_settings::*;
