//! Command Handlers module
//!
//! Command handlers that orchestrate business operations.
//! Each handler opens units of work on the store and owns the rules for
//! one family of commands.

mod account_handler;
mod commands;
mod transfer_handler;


pub use account_handler::AccountHandler;
pub use commands::*;
pub use transfer_handler::TransferHandler;
