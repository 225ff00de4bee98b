pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod live;
pub mod models;
pub mod otp;
pub mod rate_limit;

mod main_lib;

pub use main_lib::{build_state, build_state_with, init_tracing, AppState};
