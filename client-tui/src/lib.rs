pub mod config;
pub mod parser;
pub mod session;
pub mod timer;
pub mod ui;

pub use config::{ClientConfig, ConfigError};
pub use parser::{coordinate_parser, InputLine};
pub use session::LocalSession;
pub use timer::ChessTimer;
