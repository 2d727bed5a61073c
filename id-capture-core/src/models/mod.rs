pub mod config;
pub mod device;
pub mod error;
pub mod frame;
pub mod notice;
pub mod state;
