//! Server module

pub mod http;

pub use http::{dispatch, run, AppState};
