//! # System Interaction Layer
//!
//! The boundary between the option engine and the operating system.
//!
//! ## Modules
//!
//! - **`executor`**: spawns the rendered `build`/`clean` command lines as child
//!   processes and waits for them, with graceful cancellation and an optional
//!   deadline. It is the production [`TaskRunner`](crate::core::session::TaskRunner).

pub mod executor;
