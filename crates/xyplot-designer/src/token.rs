//! Plotter command tokens and their wire encoding.
//!
//! A compiled drawing is a flat list of tokens. Each token is written to
//! the device as one independent write:
//!
//! | token | bytes |
//! |---|---|
//! | `SessionStart` | `n` |
//! | `SessionEnd` | `u` |
//! | `ShapeStart` | `p` |
//! | `ShapeEnd` | `q` |
//! | `ShapeKind` | `C`, `P`, `B` or `E` |
//! | `Number(v)` | decimal digits of `v` followed by `;` |

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Smallest value the firmware accepts in a number token
pub const NUMBER_MIN: i64 = 0;

/// Largest value the firmware accepts in a number token
pub const NUMBER_MAX: i64 = 99_999;

/// Terminator appended to every number on the wire
pub const NUMBER_TERMINATOR: char = ';';

/// Record layout selector that follows a `ShapeStart`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Circle,
    Polygon,
    Bezier,
    Ellipse,
}

impl ShapeKind {
    /// Wire character for this kind
    pub fn as_char(self) -> char {
        match self {
            ShapeKind::Circle => 'C',
            ShapeKind::Polygon => 'P',
            ShapeKind::Bezier => 'B',
            ShapeKind::Ellipse => 'E',
        }
    }

    /// Whether `count` numbers form a valid record of this kind
    pub fn accepts_arity(self, count: usize) -> bool {
        match self {
            ShapeKind::Circle => count == 3,
            ShapeKind::Ellipse => count == 4 || count == 7,
            ShapeKind::Polygon => count >= 6 && count % 2 == 0,
            ShapeKind::Bezier => count == 8,
        }
    }
}

/// The atomic unit of the plotter command stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Token {
    SessionStart,
    SessionEnd,
    ShapeStart,
    ShapeEnd,
    Kind(ShapeKind),
    Number(i64),
}

impl Token {
    /// Whether this number fits the firmware's accepted range
    ///
    /// Structural tokens are always in range.
    pub fn in_wire_range(&self) -> bool {
        match self {
            Token::Number(value) => (NUMBER_MIN..=NUMBER_MAX).contains(value),
            _ => true,
        }
    }

    /// Bytes sent to the device for this token
    pub fn to_wire(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::SessionStart => write!(f, "n"),
            Token::SessionEnd => write!(f, "u"),
            Token::ShapeStart => write!(f, "p"),
            Token::ShapeEnd => write!(f, "q"),
            Token::Kind(kind) => write!(f, "{}", kind.as_char()),
            Token::Number(value) => write!(f, "{}{}", value, NUMBER_TERMINATOR),
        }
    }
}

/// Tokens for a single shape record, `ShapeStart` through `ShapeEnd`
pub type ShapeRecord = SmallVec<[Token; 12]>;

/// The ordered token sequence compiled from one document
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompiledProgram {
    tokens: Vec<Token>,
}

impl CompiledProgram {
    pub(crate) fn from_tokens(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    /// Number of tokens, including the session markers
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Number of shape records in the program
    pub fn shape_count(&self) -> usize {
        self.tokens
            .iter()
            .filter(|t| matches!(t, Token::ShapeStart))
            .count()
    }

    /// Numbers that fall outside `NUMBER_MIN..=NUMBER_MAX`, with their index
    pub fn out_of_range(&self) -> impl Iterator<Item = (usize, i64)> + '_ {
        self.tokens
            .iter()
            .enumerate()
            .filter_map(|(i, t)| match t {
                Token::Number(v) if !t.in_wire_range() => Some((i, *v)),
                _ => None,
            })
    }

    /// The whole program as it would appear on the wire, concatenated
    pub fn wire_string(&self) -> String {
        self.tokens.iter().map(Token::to_string).collect()
    }
}

impl<'a> IntoIterator for &'a CompiledProgram {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}
