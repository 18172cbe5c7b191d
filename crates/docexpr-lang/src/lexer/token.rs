use std::fmt::{self, Display, Formatter};

use smol_str::SmolStr;

use crate::range::Range;

#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Hash)]
pub struct Token {
    pub range: Range,
    pub kind: TokenKind,
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Hash)]
pub enum TokenKind {
    Arrow,
    Asterisk,
    At,
    Colon,
    Comma,
    Dollar,
    Double(SmolStr),
    Eof,
    Equal,
    Gt,
    Gte,
    Int(SmolStr),
    LBrace,
    LBracket,
    LParen,
    Lt,
    Lte,
    Minus,
    NeEq,
    Percent,
    Period,
    Plus,
    RBrace,
    RBracket,
    RParen,
    SemiColon,
    Slash,
    StringLiteral(String),
    Whitespace(usize),
    Word(SmolStr),
}

/// Word operators recognized between terms.
const WORD_OPERATORS: [&str; 5] = ["LIKE", "BETWEEN", "IN", "AND", "OR"];

impl Token {
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    #[inline]
    pub fn is_whitespace(&self) -> bool {
        matches!(self.kind, TokenKind::Whitespace(_))
    }

    /// Case-insensitive keyword test.
    pub fn is_word(&self, word: &str) -> bool {
        matches!(&self.kind, TokenKind::Word(w) if w.eq_ignore_ascii_case(word))
    }

    /// Returns the canonical operator name when this token can join two terms.
    pub fn operator(&self) -> Option<SmolStr> {
        match &self.kind {
            TokenKind::Percent => Some("%".into()),
            TokenKind::Slash => Some("/".into()),
            TokenKind::Asterisk => Some("*".into()),
            TokenKind::Plus => Some("+".into()),
            TokenKind::Minus => Some("-".into()),
            TokenKind::Gt => Some(">".into()),
            TokenKind::Gte => Some(">=".into()),
            TokenKind::Lt => Some("<".into()),
            TokenKind::Lte => Some("<=".into()),
            TokenKind::NeEq => Some("!=".into()),
            TokenKind::Equal => Some("=".into()),
            TokenKind::Word(w) => WORD_OPERATORS
                .iter()
                .find(|op| w.eq_ignore_ascii_case(op))
                .map(|op| SmolStr::new_static(op)),
            _ => None,
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}", self.kind)
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match &self {
            TokenKind::Arrow => write!(f, "=>"),
            TokenKind::Asterisk => write!(f, "*"),
            TokenKind::At => write!(f, "@"),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Dollar => write!(f, "$"),
            TokenKind::Double(n) | TokenKind::Int(n) => write!(f, "{}", n),
            TokenKind::Eof => write!(f, ""),
            TokenKind::Equal => write!(f, "="),
            TokenKind::Gt => write!(f, ">"),
            TokenKind::Gte => write!(f, ">="),
            TokenKind::LBrace => write!(f, "{{"),
            TokenKind::LBracket => write!(f, "["),
            TokenKind::LParen => write!(f, "("),
            TokenKind::Lt => write!(f, "<"),
            TokenKind::Lte => write!(f, "<="),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::NeEq => write!(f, "!="),
            TokenKind::Percent => write!(f, "%"),
            TokenKind::Period => write!(f, "."),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::RBrace => write!(f, "}}"),
            TokenKind::RBracket => write!(f, "]"),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::SemiColon => write!(f, ";"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::StringLiteral(s) => write!(f, "{}", s),
            TokenKind::Whitespace(n) => write!(f, "{}", " ".repeat(*n)),
            TokenKind::Word(w) => write!(f, "{}", w),
        }
    }
}

impl TokenKind {
    /// Human readable kind name used in "expected ..." messages.
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::Double(_) => "double",
            TokenKind::Int(_) => "int",
            TokenKind::StringLiteral(_) => "string",
            TokenKind::Word(_) => "word",
            TokenKind::Whitespace(_) => "whitespace",
            TokenKind::Eof => "EOF",
            TokenKind::Arrow => "`=>`",
            TokenKind::Asterisk => "`*`",
            TokenKind::At => "`@`",
            TokenKind::Colon => "`:`",
            TokenKind::Comma => "`,`",
            TokenKind::Dollar => "`$`",
            TokenKind::Equal => "`=`",
            TokenKind::Gt => "`>`",
            TokenKind::Gte => "`>=`",
            TokenKind::LBrace => "`{`",
            TokenKind::LBracket => "`[`",
            TokenKind::LParen => "`(`",
            TokenKind::Lt => "`<`",
            TokenKind::Lte => "`<=`",
            TokenKind::Minus => "`-`",
            TokenKind::NeEq => "`!=`",
            TokenKind::Percent => "`%`",
            TokenKind::Period => "`.`",
            TokenKind::Plus => "`+`",
            TokenKind::RBrace => "`}`",
            TokenKind::RBracket => "`]`",
            TokenKind::RParen => "`)`",
            TokenKind::SemiColon => "`;`",
            TokenKind::Slash => "`/`",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn token(kind: TokenKind) -> Token {
        Token {
            range: Range::default(),
            kind,
        }
    }

    #[rstest]
    #[case(TokenKind::Plus, Some("+"))]
    #[case(TokenKind::Word("like".into()), Some("LIKE"))]
    #[case(TokenKind::Word("Between".into()), Some("BETWEEN"))]
    #[case(TokenKind::Word("name".into()), None)]
    #[case(TokenKind::Comma, None)]
    fn test_operator(#[case] kind: TokenKind, #[case] expected: Option<&str>) {
        assert_eq!(token(kind).operator().as_deref(), expected);
    }

    #[test]
    fn test_is_word_ignores_case() {
        assert!(token(TokenKind::Word("AnY".into())).is_word("any"));
        assert!(!token(TokenKind::Int("1".into())).is_word("1"));
    }
}
