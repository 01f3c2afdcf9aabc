mod types;

pub use types::{ControllerConfig, HttpConfig};
