pub mod config;
pub mod domain;
pub mod error;
pub mod otp;
pub mod traits;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use traits::*;
