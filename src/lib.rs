#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod config;
pub mod controller;
pub mod format;
pub mod logging;
pub mod persist;
pub mod photo;
pub mod post;
pub mod storage;
pub mod ui;
pub mod view;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::{run, RunOptions};
