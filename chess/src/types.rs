//! Project-owned piece, color, status, and result types.
//! cozy-chess types stay an implementation detail of the rules engine.

/// Piece type, independent of color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

/// Side color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceColor {
    White,
    Black,
}

/// Where a game currently stands. Everything except `Active` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameStatus {
    Active,
    Checkmate,
    Stalemate,
    Draw,
    InsufficientMaterial,
    ThreefoldRepetition,
    FiftyMoveRule,
}

/// Final score of a game, rendered in result-tag notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameResult {
    WhiteWins,
    BlackWins,
    Draw,
    Ongoing,
}

impl PieceKind {
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'p' => Some(Self::Pawn),
            'n' => Some(Self::Knight),
            'b' => Some(Self::Bishop),
            'r' => Some(Self::Rook),
            'q' => Some(Self::Queen),
            'k' => Some(Self::King),
            _ => None,
        }
    }

    /// Full lowercase name, e.g. "knight". Inverse of [`PieceKind::from_name`].
    pub fn name(self) -> &'static str {
        match self {
            Self::Pawn => "pawn",
            Self::Knight => "knight",
            Self::Bishop => "bishop",
            Self::Rook => "rook",
            Self::Queen => "queen",
            Self::King => "king",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pawn" => Some(Self::Pawn),
            "knight" => Some(Self::Knight),
            "bishop" => Some(Self::Bishop),
            "rook" => Some(Self::Rook),
            "queen" => Some(Self::Queen),
            "king" => Some(Self::King),
            _ => None,
        }
    }

    pub fn to_char_upper(self) -> char {
        match self {
            Self::Pawn => 'P',
            Self::Knight => 'N',
            Self::Bishop => 'B',
            Self::Rook => 'R',
            Self::Queen => 'Q',
            Self::King => 'K',
        }
    }

    pub fn to_char_lower(self) -> char {
        self.to_char_upper().to_ascii_lowercase()
    }
}

impl PieceColor {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "white" | "w" => Some(Self::White),
            "black" | "b" => Some(Self::Black),
            _ => None,
        }
    }

    pub fn opponent(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }
}

impl GameStatus {
    /// True for every status that ends the game.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }

    /// Derive the game result given the side to move when the status was
    /// reached. On checkmate the side to move is the side that got mated.
    pub fn result_for_turn(self, turn: PieceColor) -> GameResult {
        match self {
            Self::Active => GameResult::Ongoing,
            Self::Checkmate => match turn {
                PieceColor::White => GameResult::BlackWins,
                PieceColor::Black => GameResult::WhiteWins,
            },
            Self::Stalemate
            | Self::Draw
            | Self::InsufficientMaterial
            | Self::ThreefoldRepetition
            | Self::FiftyMoveRule => GameResult::Draw,
        }
    }
}

impl GameResult {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WhiteWins => "1-0",
            Self::BlackWins => "0-1",
            Self::Draw => "1/2-1/2",
            Self::Ongoing => "*",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s {
            "1-0" => Some(Self::WhiteWins),
            "0-1" => Some(Self::BlackWins),
            "1/2-1/2" => Some(Self::Draw),
            "*" => Some(Self::Ongoing),
            _ => None,
        }
    }

    pub fn is_decided(self) -> bool {
        !matches!(self, Self::Ongoing)
    }
}

impl From<cozy_chess::Piece> for PieceKind {
    fn from(p: cozy_chess::Piece) -> Self {
        match p {
            cozy_chess::Piece::Pawn => Self::Pawn,
            cozy_chess::Piece::Knight => Self::Knight,
            cozy_chess::Piece::Bishop => Self::Bishop,
            cozy_chess::Piece::Rook => Self::Rook,
            cozy_chess::Piece::Queen => Self::Queen,
            cozy_chess::Piece::King => Self::King,
        }
    }
}

impl From<PieceKind> for cozy_chess::Piece {
    fn from(p: PieceKind) -> Self {
        match p {
            PieceKind::Pawn => Self::Pawn,
            PieceKind::Knight => Self::Knight,
            PieceKind::Bishop => Self::Bishop,
            PieceKind::Rook => Self::Rook,
            PieceKind::Queen => Self::Queen,
            PieceKind::King => Self::King,
        }
    }
}

impl From<cozy_chess::Color> for PieceColor {
    fn from(c: cozy_chess::Color) -> Self {
        match c {
            cozy_chess::Color::White => Self::White,
            cozy_chess::Color::Black => Self::Black,
        }
    }
}

impl From<PieceColor> for cozy_chess::Color {
    fn from(c: PieceColor) -> Self {
        match c {
            PieceColor::White => Self::White,
            PieceColor::Black => Self::Black,
        }
    }
}

impl std::fmt::Display for PieceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::fmt::Display for PieceColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::fmt::Display for GameResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_piece_kind_name_roundtrip() {
        for kind in [
            PieceKind::Pawn,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Rook,
            PieceKind::Queen,
            PieceKind::King,
        ] {
            assert_eq!(PieceKind::from_name(kind.name()), Some(kind));
            assert_eq!(PieceKind::from_char(kind.to_char_lower()), Some(kind));
        }
    }

    #[test]
    fn test_result_for_turn_checkmate() {
        // The side to move is the side that got mated.
        assert_eq!(
            GameStatus::Checkmate.result_for_turn(PieceColor::Black),
            GameResult::WhiteWins
        );
        assert_eq!(
            GameStatus::Checkmate.result_for_turn(PieceColor::White),
            GameResult::BlackWins
        );
    }

    #[test]
    fn test_terminal_statuses_decide_result() {
        let statuses = [
            GameStatus::Checkmate,
            GameStatus::Stalemate,
            GameStatus::Draw,
            GameStatus::InsufficientMaterial,
            GameStatus::ThreefoldRepetition,
            GameStatus::FiftyMoveRule,
        ];
        for status in statuses {
            assert!(status.is_terminal());
            assert!(status.result_for_turn(PieceColor::White).is_decided());
        }
        assert!(!GameStatus::Active.is_terminal());
        assert_eq!(
            GameStatus::Active.result_for_turn(PieceColor::White),
            GameResult::Ongoing
        );
    }
}
