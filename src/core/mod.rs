// src/core/mod.rs

pub mod changeset;
pub mod graph;
pub mod history;
pub mod hooks;
pub mod paths;
pub mod schema;
pub mod selection;
pub mod session;
pub mod settings;
pub mod template;
