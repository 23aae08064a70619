pub mod checkpoint;
pub mod config;
pub mod context;
pub mod error;
pub mod gate;
pub mod io;
pub mod machine;
pub mod paths;
pub mod project;
pub mod state;
pub mod types;

pub use error::{ForemanError, Result};
