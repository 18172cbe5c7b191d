pub mod error;
pub mod token;

use error::LexerError;
use nom::Parser;
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{escaped_transform, tag, take_while_m_n},
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace1, none_of, one_of},
    combinator::{map, map_opt, map_res, opt, recognize, value},
    multi::many0,
    sequence::{delimited, pair, preceded},
};
use nom_locate::position;
use smol_str::SmolStr;
use token::{Token, TokenKind};

use crate::range::{Position, Range, Span};

macro_rules! define_token_parser {
    ($name:ident, $tag:expr, $kind:expr) => {
        fn $name(input: Span) -> IResult<Span, Token> {
            map(tag($tag), |span: Span| Token {
                range: span.into(),
                kind: $kind,
            })
            .parse(input)
        }
    };
}

#[derive(Debug, Clone, Default)]
pub struct Options {
    pub include_spaces: bool,
}

pub struct Lexer {
    options: Options,
}

impl Lexer {
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    pub fn tokenize(&self, input: &str) -> Result<Vec<Token>, LexerError> {
        match many0(token).parse(Span::new(input)) {
            Ok((rest, tokens)) => {
                if let Some(ch) = rest.fragment().chars().next() {
                    let start: Position = rest.into();
                    let end = Position::new(start.line, start.column + 1, start.offset + ch.len_utf8());

                    return Err(if ch == '"' || ch == '\'' {
                        LexerError::UnterminatedString(Token {
                            range: Range { start, end },
                            kind: TokenKind::StringLiteral(rest.fragment().to_string()),
                        })
                    } else {
                        LexerError::UnexpectedToken(Token {
                            range: Range { start, end },
                            kind: TokenKind::Word(SmolStr::new(ch.to_string())),
                        })
                    });
                }

                let eof: Range = rest.into();
                let tokens = tokens
                    .into_iter()
                    .filter(|token| self.options.include_spaces || !token.is_whitespace());

                Ok(tokens
                    .chain(std::iter::once(Token {
                        range: eof,
                        kind: TokenKind::Eof,
                    }))
                    .collect())
            }
            Err(_) => Err(LexerError::UnexpectedEOFDetected),
        }
    }
}

/// True when `s` can be written without quotes as a key or field name.
pub fn is_word(s: &str) -> bool {
    let mut chars = s.strip_prefix('$').unwrap_or(s).chars();

    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn unicode(input: Span) -> IResult<Span, char> {
    map_opt(
        map_res(
            preceded(
                char('u'),
                alt((
                    delimited(
                        char('{'),
                        take_while_m_n(1, 6, |c: char| c.is_ascii_hexdigit()),
                        char('}'),
                    ),
                    take_while_m_n(4, 4, |c: char| c.is_ascii_hexdigit()),
                )),
            ),
            |span: Span| u32::from_str_radix(span.fragment(), 16),
        ),
        char::from_u32,
    )
    .parse(input)
}

fn escape(input: Span) -> IResult<Span, char> {
    alt((
        value('\\', char('\\')),
        value('"', char('"')),
        value('\'', char('\'')),
        value('/', char('/')),
        value('\u{8}', char('b')),
        value('\u{c}', char('f')),
        value('\n', char('n')),
        value('\r', char('r')),
        value('\t', char('t')),
        unicode,
    ))
    .parse(input)
}

fn whitespace(input: Span) -> IResult<Span, Token> {
    map(multispace1, |span: Span| {
        let num = span.fragment().chars().count();
        Token {
            range: span.into(),
            kind: TokenKind::Whitespace(num),
        }
    })
    .parse(input)
}

define_token_parser!(arrow, "=>", TokenKind::Arrow);
define_token_parser!(ne_eq, "!=", TokenKind::NeEq);
define_token_parser!(gte, ">=", TokenKind::Gte);
define_token_parser!(lte, "<=", TokenKind::Lte);
define_token_parser!(gt, ">", TokenKind::Gt);
define_token_parser!(lt, "<", TokenKind::Lt);
define_token_parser!(equal, "=", TokenKind::Equal);
define_token_parser!(l_brace, "{", TokenKind::LBrace);
define_token_parser!(r_brace, "}", TokenKind::RBrace);
define_token_parser!(l_paren, "(", TokenKind::LParen);
define_token_parser!(r_paren, ")", TokenKind::RParen);
define_token_parser!(l_bracket, "[", TokenKind::LBracket);
define_token_parser!(r_bracket, "]", TokenKind::RBracket);
define_token_parser!(comma, ",", TokenKind::Comma);
define_token_parser!(colon, ":", TokenKind::Colon);
define_token_parser!(semi_colon, ";", TokenKind::SemiColon);
define_token_parser!(period, ".", TokenKind::Period);
define_token_parser!(at, "@", TokenKind::At);
define_token_parser!(dollar, "$", TokenKind::Dollar);
define_token_parser!(asterisk, "*", TokenKind::Asterisk);
define_token_parser!(plus, "+", TokenKind::Plus);
define_token_parser!(minus, "-", TokenKind::Minus);
define_token_parser!(slash, "/", TokenKind::Slash);
define_token_parser!(percent, "%", TokenKind::Percent);

fn operators(input: Span) -> IResult<Span, Token> {
    alt((
        arrow, ne_eq, gte, lte, gt, lt, equal, asterisk, plus, minus, slash, percent,
    ))
    .parse(input)
}

fn punctuations(input: Span) -> IResult<Span, Token> {
    alt((
        l_brace, r_brace, l_paren, r_paren, l_bracket, r_bracket, comma, colon, semi_colon, period, at,
        dollar,
    ))
    .parse(input)
}

fn number_literal(input: Span) -> IResult<Span, Token> {
    map(
        recognize((
            digit1,
            opt(pair(char('.'), digit1)),
            opt((one_of("eE"), opt(one_of("+-")), digit1)),
        )),
        |span: Span| {
            let text = SmolStr::new(span.fragment());
            let kind = if text.contains(['.', 'e', 'E']) {
                TokenKind::Double(text)
            } else {
                TokenKind::Int(text)
            };

            Token {
                range: span.into(),
                kind,
            }
        },
    )
    .parse(input)
}

fn quoted<'a>(quote: char, forbidden: &'static str) -> impl Parser<Span<'a>, Output = String, Error = nom::error::Error<Span<'a>>> {
    map(
        delimited(
            char(quote),
            opt(escaped_transform(none_of(forbidden), '\\', escape)),
            char(quote),
        ),
        Option::unwrap_or_default,
    )
}

fn string_literal(input: Span) -> IResult<Span, Token> {
    let (span, start) = position(input)?;
    let (span, s) = alt((quoted('"', "\"\\"), quoted('\'', "'\\"))).parse(span)?;
    let (span, end) = position(span)?;

    Ok((
        span,
        Token {
            range: Range {
                start: start.into(),
                end: end.into(),
            },
            kind: TokenKind::StringLiteral(s),
        },
    ))
}

fn word(input: Span) -> IResult<Span, Token> {
    map(
        recognize((
            opt(char('$')),
            alt((alpha1, tag("_"))),
            many0(alt((alphanumeric1, tag("_")))),
        )),
        |span: Span| Token {
            range: span.into(),
            kind: TokenKind::Word(SmolStr::new(span.fragment())),
        },
    )
    .parse(input)
}

fn token(input: Span) -> IResult<Span, Token> {
    alt((whitespace, string_literal, number_literal, word, operators, punctuations)).parse(input)
}

/// Look-ahead cursor over the tokens of one expression.
///
/// Whitespace tokens are kept so that callers can ask for adjacency
/// (`-5` versus `- 5`, `$.a` versus `$ .a`).
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
    current: usize,
    next: usize,
    started: bool,
}

impl TokenStream {
    pub fn new(code: &str) -> Result<Self, LexerError> {
        Lexer::new(Options { include_spaces: true })
            .tokenize(code)
            .map(Self::from_tokens)
    }

    pub fn from_tokens(mut tokens: Vec<Token>) -> Self {
        if !tokens.last().is_some_and(Token::is_eof) {
            let range = tokens
                .last()
                .map(|token| Range {
                    start: token.range.end,
                    end: token.range.end,
                })
                .unwrap_or_default();
            tokens.push(Token {
                range,
                kind: TokenKind::Eof,
            });
        }

        Self {
            tokens,
            current: 0,
            next: 0,
            started: false,
        }
    }

    /// The most recently consumed token.
    #[inline]
    pub fn current(&self) -> &Token {
        &self.tokens[self.current]
    }

    /// True once the end of input has been consumed.
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.started && self.current().is_eof()
    }

    fn index_of_next(&self, skip_whitespace: bool) -> usize {
        let last = self.tokens.len() - 1;
        let mut index = self.next.min(last);

        while skip_whitespace && index < last && self.tokens[index].is_whitespace() {
            index += 1;
        }

        index
    }

    pub fn peek(&self, skip_whitespace: bool) -> &Token {
        &self.tokens[self.index_of_next(skip_whitespace)]
    }

    pub fn next(&mut self, skip_whitespace: bool) -> &Token {
        let index = self.index_of_next(skip_whitespace);
        self.current = index;
        self.next = (index + 1).min(self.tokens.len() - 1);
        self.started = true;

        &self.tokens[index]
    }

    /// True if only whitespace remains.
    pub fn is_exhausted(&self) -> bool {
        self.peek(true).is_eof()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn kinds(code: &str) -> Vec<TokenKind> {
        Lexer::new(Options::default())
            .tokenize(code)
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[rstest]
    #[case::path("$.a.b[0]", vec![
        TokenKind::Dollar,
        TokenKind::Period,
        TokenKind::Word("a".into()),
        TokenKind::Period,
        TokenKind::Word("b".into()),
        TokenKind::LBracket,
        TokenKind::Int("0".into()),
        TokenKind::RBracket,
        TokenKind::Eof,
    ])]
    #[case::operators("1 >= 2.5 != =>", vec![
        TokenKind::Int("1".into()),
        TokenKind::Gte,
        TokenKind::Double("2.5".into()),
        TokenKind::NeEq,
        TokenKind::Arrow,
        TokenKind::Eof,
    ])]
    #[case::sigil_word("{$date: 'x'}", vec![
        TokenKind::LBrace,
        TokenKind::Word("$date".into()),
        TokenKind::Colon,
        TokenKind::StringLiteral("x".to_string()),
        TokenKind::RBrace,
        TokenKind::Eof,
    ])]
    #[case::escapes(r#""a\"bA\n""#, vec![
        TokenKind::StringLiteral("a\"bA\n".to_string()),
        TokenKind::Eof,
    ])]
    #[case::empty_strings(r#""" ''"#, vec![
        TokenKind::StringLiteral(String::new()),
        TokenKind::StringLiteral(String::new()),
        TokenKind::Eof,
    ])]
    #[case::exponent("1e3", vec![TokenKind::Double("1e3".into()), TokenKind::Eof])]
    #[case::negative("-5", vec![TokenKind::Minus, TokenKind::Int("5".into()), TokenKind::Eof])]
    fn test_tokenize(#[case] code: &str, #[case] expected: Vec<TokenKind>) {
        assert_eq!(kinds(code), expected);
    }

    #[test]
    fn test_tokenize_includes_spaces() {
        let tokens = Lexer::new(Options { include_spaces: true }).tokenize("a  b").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Whitespace(2));
    }

    #[test]
    fn test_token_ranges() {
        let tokens = Lexer::new(Options::default()).tokenize("ab + 'c'").unwrap();
        assert_eq!(tokens[0].range.start, Position::new(1, 1, 0));
        assert_eq!(tokens[0].range.end, Position::new(1, 3, 2));
        assert_eq!(tokens[2].range.start, Position::new(1, 6, 5));
        assert_eq!(tokens[2].range.end, Position::new(1, 9, 8));
    }

    #[rstest]
    #[case::unterminated("'abc", true)]
    #[case::unknown_char("a # b", false)]
    fn test_tokenize_error(#[case] code: &str, #[case] unterminated: bool) {
        let err = Lexer::new(Options::default()).tokenize(code).unwrap_err();
        assert_eq!(matches!(err, LexerError::UnterminatedString(_)), unterminated);
        assert!(err.token().is_some());
    }

    #[rstest]
    #[case("name", true)]
    #[case("_id", true)]
    #[case("$date", true)]
    #[case("first-name", false)]
    #[case("1abc", false)]
    #[case("", false)]
    fn test_is_word(#[case] input: &str, #[case] expected: bool) {
        assert_eq!(is_word(input), expected);
    }

    #[test]
    fn test_token_stream_lookahead() {
        let mut stream = TokenStream::new("- 5").unwrap();
        assert_eq!(stream.next(true).kind, TokenKind::Minus);
        assert!(stream.peek(false).is_whitespace());
        assert_eq!(stream.peek(true).kind, TokenKind::Int("5".into()));
        assert_eq!(stream.next(true).kind, TokenKind::Int("5".into()));
        assert!(stream.is_exhausted());
        assert!(stream.next(true).is_eof());
        assert!(stream.next(true).is_eof());
        assert!(stream.is_eof());
    }
}
