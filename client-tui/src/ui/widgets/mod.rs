pub mod board;
pub mod keyboard_move;

pub use board::{piece_to_unicode, BoardWidget};
pub use keyboard_move::KeyboardMoveWidget;
