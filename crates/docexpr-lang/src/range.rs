use nom_locate::LocatedSpan;

pub type Span<'a> = LocatedSpan<&'a str>;

/// 1-based line/column plus the 0-based byte offset into the expression text.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy, Hash)]
pub struct Position {
    pub line: u32,
    pub column: usize,
    pub offset: usize,
}

impl Default for Position {
    fn default() -> Self {
        Position {
            line: 1,
            column: 1,
            offset: 0,
        }
    }
}

impl Position {
    pub fn new(line: u32, column: usize, offset: usize) -> Self {
        Position { line, column, offset }
    }
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy, Default, Hash)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn contains(&self, position: &Position) -> bool {
        self.start.offset <= position.offset && position.offset <= self.end.offset
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end.offset.saturating_sub(self.start.offset)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'a> From<Span<'a>> for Range {
    fn from(span: Span<'a>) -> Self {
        let fragment = span.fragment();

        Range {
            start: span.into(),
            end: Position {
                line: span.location_line(),
                column: span.get_utf8_column() + fragment.chars().count(),
                offset: span.location_offset() + fragment.len(),
            },
        }
    }
}

impl<'a> From<Span<'a>> for Position {
    fn from(span: Span<'a>) -> Self {
        Position {
            line: span.location_line(),
            column: span.get_utf8_column(),
            offset: span.location_offset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_from_span() {
        let span = Span::new("abc");
        let range: Range = span.into();
        assert_eq!(range.start, Position::new(1, 1, 0));
        assert_eq!(range.end, Position::new(1, 4, 3));
        assert_eq!(range.len(), 3);
        assert!(range.contains(&Position::new(1, 2, 1)));
    }
}
