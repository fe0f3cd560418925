//! Keyboard move input
//!
//! Sits between a board session and a text parser that is loaded later. The
//! session pushes every new position through [`KeyboardMove::update`]; the
//! parser, once attached with [`attach_parser`], receives those positions and
//! drives the controller's actions (select, drop, promote, confirm, jump) from
//! what the user types.
//!
//! # Example
//!
//! ```ignore
//! let ctrl = KeyboardMove::new(session.clone(), session.clone(), step, move || redraw());
//! ctrl.update(next_step); // buffered until a parser attaches
//! attach_parser(&ctrl, input, async { Ok(my_parser_factory) }).await?;
//! ```

mod controller;
mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod parser;
mod session;
mod step;

pub use controller::{KeyboardMove, KeyboardMoveHandler};
pub use error::LoadError;
pub use parser::{attach_parser, ParserOpts};
pub use session::{BoardSession, Promotion};
pub use step::Step;

pub use chess::Dests;
