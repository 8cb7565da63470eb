pub mod assert;
pub mod config;
pub mod environment;
pub mod error;
pub mod executor;
pub mod host;
pub mod lint;
pub mod locator;
pub mod pipeline;

pub use config::{Config, Overrides};
pub use error::{CheckError, Failure, FailureKind};
pub use locator::{Diagnose, Located, Location, Locator};
pub use pipeline::{DocumentReport, check, check_document, extract};
