use chess::Dests;

/// Immutable snapshot of one position, as handed to the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub ply: u32,
    pub fen: String,
    /// Legal destinations, absent when the position is not playable (for
    /// example while browsing earlier plies).
    pub dests: Option<Dests>,
}

impl Step {
    pub fn new(ply: u32, fen: impl Into<String>, dests: Option<Dests>) -> Self {
        Self {
            ply,
            fen: fen.into(),
            dests,
        }
    }
}
