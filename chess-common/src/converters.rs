//! Conversions between cozy-chess types and their wire/display forms.
//!
//! Squares are formatted as lowercase coordinates ("e4"), pieces as
//! single letters (case carries color where relevant), colors as
//! "white"/"black".

use cozy_chess::{Color, File, Move, Piece, Rank, Square};

/// Format a square as a lowercase coordinate string, e.g. "e4".
pub fn format_square(square: Square) -> String {
    format!("{}{}", file_to_char(square.file()), rank_to_char(square.rank()))
}

/// Parse a coordinate string like "e4" into a square.
pub fn parse_square(s: &str) -> Option<Square> {
    let mut chars = s.chars();
    let file = parse_file(chars.next()?)?;
    let rank = parse_rank(chars.next()?)?;
    if chars.next().is_some() {
        return None;
    }
    Some(Square::new(file, rank))
}

/// Parse a file letter ('a'..='h', case-insensitive).
pub fn parse_file(c: char) -> Option<File> {
    match c.to_ascii_lowercase() {
        'a' => Some(File::A),
        'b' => Some(File::B),
        'c' => Some(File::C),
        'd' => Some(File::D),
        'e' => Some(File::E),
        'f' => Some(File::F),
        'g' => Some(File::G),
        'h' => Some(File::H),
        _ => None,
    }
}

/// Parse a rank digit ('1'..='8').
pub fn parse_rank(c: char) -> Option<Rank> {
    match c {
        '1' => Some(Rank::First),
        '2' => Some(Rank::Second),
        '3' => Some(Rank::Third),
        '4' => Some(Rank::Fourth),
        '5' => Some(Rank::Fifth),
        '6' => Some(Rank::Sixth),
        '7' => Some(Rank::Seventh),
        '8' => Some(Rank::Eighth),
        _ => None,
    }
}

/// Parse a piece letter (case-insensitive).
pub fn parse_piece(c: char) -> Option<Piece> {
    match c.to_ascii_lowercase() {
        'p' => Some(Piece::Pawn),
        'n' => Some(Piece::Knight),
        'b' => Some(Piece::Bishop),
        'r' => Some(Piece::Rook),
        'q' => Some(Piece::Queen),
        'k' => Some(Piece::King),
        _ => None,
    }
}

pub fn format_piece_upper(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'P',
        Piece::Knight => 'N',
        Piece::Bishop => 'B',
        Piece::Rook => 'R',
        Piece::Queen => 'Q',
        Piece::King => 'K',
    }
}

pub fn format_piece_lower(piece: Piece) -> char {
    format_piece_upper(piece).to_ascii_lowercase()
}

pub fn format_color(color: Color) -> String {
    match color {
        Color::White => "white".to_string(),
        Color::Black => "black".to_string(),
    }
}

/// Parse a color from its wire forms: "white"/"black" or "w"/"b".
pub fn parse_color(s: &str) -> Option<Color> {
    match s.to_ascii_lowercase().as_str() {
        "white" | "w" => Some(Color::White),
        "black" | "b" => Some(Color::Black),
        _ => None,
    }
}

/// Format a move in coordinate notation, e.g. "e2e4" or "e7e8q".
pub fn format_move(mv: Move) -> String {
    let mut s = format!("{}{}", format_square(mv.from), format_square(mv.to));
    if let Some(promo) = mv.promotion {
        s.push(format_piece_lower(promo));
    }
    s
}

/// Parse coordinate notation ("e2e4", "e7e8q") into a move.
pub fn parse_move(s: &str) -> Option<Move> {
    if s.len() != 4 && s.len() != 5 {
        return None;
    }
    let from = parse_square(s.get(0..2)?)?;
    let to = parse_square(s.get(2..4)?)?;
    let promotion = match s.get(4..5) {
        Some(p) => Some(parse_piece(p.chars().next()?)?),
        None => None,
    };
    Some(Move {
        from,
        to,
        promotion,
    })
}

fn file_to_char(file: File) -> char {
    match file {
        File::A => 'a',
        File::B => 'b',
        File::C => 'c',
        File::D => 'd',
        File::E => 'e',
        File::F => 'f',
        File::G => 'g',
        File::H => 'h',
    }
}

fn rank_to_char(rank: Rank) -> char {
    match rank {
        Rank::First => '1',
        Rank::Second => '2',
        Rank::Third => '3',
        Rank::Fourth => '4',
        Rank::Fifth => '5',
        Rank::Sixth => '6',
        Rank::Seventh => '7',
        Rank::Eighth => '8',
    }
}
