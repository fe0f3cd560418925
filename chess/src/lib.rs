pub mod crazyhouse;
pub mod fen;
pub mod game;
pub mod placement;
pub mod position;
pub mod types;
pub mod uci;

pub use chess_common::converters::*;
pub use crazyhouse::{split_pocket_fen, DropError, Pockets};
pub use fen::FenError;
pub use game::{Game, GameError, HistoryEntry};
pub use placement::Placement;
pub use position::Position;
pub use types::{Dests, PlyAction};
pub use uci::{convert_uci_castling_to_cozy, format_uci_drop, format_uci_move};
