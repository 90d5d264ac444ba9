//! Trickle is a terminal chat client paired with a small relay server that
//! re-emits complete model responses as a paced byte stream.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns conversation state, persisted configuration, and the
//!   stream consumer that turns relay bytes into transcript updates.
//! - [`server`] implements the relay endpoint: one blocking completion call
//!   against the inference backend, then timed chunk emission.
//! - [`ui`] renders the terminal interface and runs the interactive event
//!   loop that drives user input and display updates.
//! - [`api`] defines the wire payloads shared by the relay and its clients.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`], which dispatches into [`ui`] for interactive
//! sessions and [`server`] for `trickle serve`.

pub mod api;
pub mod cli;
pub mod core;
pub mod server;
pub mod ui;
pub mod utils;
