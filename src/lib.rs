pub mod analysis;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod pose;
pub mod protocol;
pub mod rules;

pub use analysis::{PostureResponse, PostureService};
pub use error::{PostureError, Result};
