// src/cli/handlers/mod.rs

pub mod build;
pub mod clean;
pub mod commons;
pub mod pick;
pub mod render;
pub mod reset;
pub mod select;
pub mod show;
pub mod status;
