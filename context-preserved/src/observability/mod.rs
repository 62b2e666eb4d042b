//! Observability utilities.

mod logging;

pub use logging::{init_logging, parse_filter, LogFormat, LoggingConfig, MdcFormat};
