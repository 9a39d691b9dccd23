//! skiff: a terminal feed reader.
//!
//! The binary in `main.rs` is a thin shell around this library: it loads the
//! subscription file and the feed cache, builds [`app::Services`] and hands
//! a [`ui::DisplayEngine`] to [`ui::run`].

pub mod app;
pub mod config;
pub mod content;
pub mod editor;
pub mod feed;
pub mod storage;
pub mod terminal;
pub mod ui;
pub mod util;
