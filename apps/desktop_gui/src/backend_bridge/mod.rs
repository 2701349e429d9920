//! Backend bridge: command queue from the UI thread and the async worker
//! that serves it.

pub mod commands;
pub mod runtime;
