//! `ferod create` targets

pub mod app;
pub mod command;
pub mod listener;
