pub mod mongo;
pub mod postgres;
pub mod redis;
pub mod repositories;

pub use repositories::*;
