//! Bot module - Core bot functionality.

pub mod dispatcher;
mod runtime;

pub use dispatcher::AppState;
pub use runtime::run;
