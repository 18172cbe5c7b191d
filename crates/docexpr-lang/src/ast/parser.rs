use std::sync::Arc;

use smol_str::SmolStr;

use super::{
    DocumentScope,
    error::ParseError,
    fields::Fields,
    node::{ExprType, Node, NodeKind, PathRoot, PathStep},
    operator::{self, Operator, OperatorDef},
};
use crate::{
    eval::builtin::{self, ARRAY, Builtin, ITEMS, ParamKind},
    lexer::{
        TokenStream, is_word,
        token::{Token, TokenKind},
    },
    value::Value,
};

const BUILTIN_FUNCTIONS: [&str; 3] = ["MAP", "FILTER", "SORT"];

/// Flags a composite node inherits from its children.
#[derive(Debug, Clone)]
struct Inherited {
    is_immutable: bool,
    use_source: bool,
    fields: Fields,
}

impl Inherited {
    fn from_nodes<'n>(nodes: impl IntoIterator<Item = &'n Node>) -> Self {
        nodes.into_iter().fold(
            Self {
                is_immutable: true,
                use_source: false,
                fields: Fields::new(),
            },
            |acc, node| Self {
                is_immutable: acc.is_immutable && node.is_immutable,
                use_source: acc.use_source || node.use_source,
                fields: acc.fields.union(&node.fields),
            },
        )
    }

    fn into_node(self, ty: ExprType, is_scalar: bool, source: String, kind: NodeKind) -> Node {
        Node {
            ty,
            is_scalar,
            is_immutable: self.is_immutable,
            use_source: self.use_source,
            fields: self.fields,
            source,
            kind,
        }
    }
}

/// Recursive-descent parser over a [`TokenStream`].
///
/// Both entry points stop at the first token that cannot continue the
/// expression and leave it unconsumed.
pub struct Parser<'a> {
    tokens: &'a mut TokenStream,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a mut TokenStream) -> Self {
        Self { tokens }
    }

    /// Parses terms joined by binary operators.
    pub fn parse_full(&mut self, scope: DocumentScope) -> Result<Node, ParseError> {
        let first = self.parse_single(scope)?;
        let mut values = vec![first];
        let mut operators: Vec<&'static OperatorDef> = Vec::new();

        while !self.tokens.is_eof() {
            let Some(op) = self.read_operator()? else {
                break;
            };

            let mut term = self.parse_single(scope)?;

            if op.is_between() {
                let and = self.tokens.next(true).clone();
                if !and.is_word("AND") {
                    return Err(ParseError::UnexpectedTokenExpected {
                        token: and,
                        expected: "AND".into(),
                    });
                }

                let end = self.parse_single(scope)?;
                term = Self::between_bounds(term, end)?;
            }

            values.push(term);
            operators.push(op);
        }

        Self::reduce(values, operators)
    }

    /// Parses one term without consuming a following operator.
    pub fn parse_single(&mut self, scope: DocumentScope) -> Result<Node, ParseError> {
        let token = self.tokens.next(true).clone();

        match &token.kind {
            TokenKind::Minus if matches!(self.tokens.peek(false).kind, TokenKind::Double(_) | TokenKind::Int(_)) => {
                let number = self.tokens.next(false).clone();
                Self::parse_number(&number, true)
            }
            TokenKind::Double(_) | TokenKind::Int(_) => Self::parse_number(&token, false),
            TokenKind::Word(word) if word.eq_ignore_ascii_case("true") || word.eq_ignore_ascii_case("false") => {
                let value = word.eq_ignore_ascii_case("true");
                Ok(Node::constant(
                    ExprType::Boolean,
                    Value::Boolean(value),
                    value.to_string(),
                ))
            }
            TokenKind::Word(word) if word.eq_ignore_ascii_case("null") => {
                Ok(Node::constant(ExprType::Null, Value::Null, "null"))
            }
            TokenKind::StringLiteral(s) => Ok(Node::constant(
                ExprType::String,
                Value::String(SmolStr::new(s)),
                quote(s),
            )),
            TokenKind::Asterisk => self.parse_source(),
            TokenKind::LBrace => self.parse_document(scope),
            TokenKind::LBracket => self.parse_array(scope),
            TokenKind::At if matches!(self.tokens.peek(false).kind, TokenKind::Word(_) | TokenKind::Int(_)) => {
                self.parse_parameter()
            }
            TokenKind::LParen => self.parse_parens(scope),
            TokenKind::Word(word)
                if BUILTIN_FUNCTIONS.iter().any(|name| word.eq_ignore_ascii_case(name))
                    && self.tokens.peek(true).kind == TokenKind::LParen =>
            {
                self.parse_function(&token, scope)
            }
            TokenKind::Word(_) if self.tokens.peek(true).kind == TokenKind::LParen => self.parse_call(&token, scope),
            TokenKind::Dollar | TokenKind::At | TokenKind::Word(_) => self.parse_path(&token, scope),
            _ => Err(unexpected(token)),
        }
    }

    fn read_operator(&mut self) -> Result<Option<&'static OperatorDef>, ParseError> {
        let ahead = self.tokens.peek(true).clone();

        if let Some(name) = ahead.operator() {
            self.tokens.next(true);
            return operator::lookup(&name)
                .map(Some)
                .ok_or(ParseError::UnexpectedToken(ahead));
        }

        if ahead.is_word("ANY") || ahead.is_word("ALL") {
            self.tokens.next(true);
            let token = self.tokens.next(true).clone();
            let name = token.operator().ok_or_else(|| ParseError::UnexpectedTokenExpected {
                token: token.clone(),
                expected: "operator".into(),
            })?;
            let key = format!("{} {}", ahead.kind.to_string().to_ascii_uppercase(), name);

            return operator::lookup(&key)
                .map(Some)
                .ok_or(ParseError::UnexpectedToken(token));
        }

        Ok(None)
    }

    /// Combines operators level by level, tightest first; within a level the
    /// left-most operator goes first.
    fn reduce(mut values: Vec<Node>, mut operators: Vec<&'static OperatorDef>) -> Result<Node, ParseError> {
        for level in 0..=operator::MAX_LEVEL {
            while let Some(index) = operators.iter().position(|op| op.level == level) {
                let op = operators.remove(index);
                let left = values.remove(index);
                let right = values.remove(index);
                values.insert(index, Self::combine(op, left, right)?);
            }
        }

        debug_assert_eq!(values.len(), 1);
        values
            .pop()
            .ok_or_else(|| ParseError::NotScalar { expr: String::new() })
    }

    fn combine(op: &'static OperatorDef, left: Node, right: Node) -> Result<Node, ParseError> {
        let left = match op.operator {
            Operator::Binary(_, Some(_)) if left.is_scalar => to_enumerable(left),
            Operator::Binary(_, None) | Operator::Logic(_) if !left.is_scalar => {
                return Err(ParseError::LeftNotScalar { expr: left.source });
            }
            _ => left,
        };

        if !right.is_scalar {
            return Err(ParseError::RightNotScalar { expr: right.source });
        }

        let source = format!("{}{}{}", left.source, op.source, right.source);
        let inherited = Inherited::from_nodes([&left, &right]);
        let (left, right) = (Arc::new(left), Arc::new(right));
        let kind = match op.operator {
            Operator::Binary(op, quantifier) => NodeKind::Binary {
                op,
                quantifier,
                left,
                right,
            },
            Operator::Logic(op) => NodeKind::Logic { op, left, right },
        };

        Ok(inherited.into_node(op.expr_type(), true, source, kind))
    }

    fn between_bounds(start: Node, end: Node) -> Result<Node, ParseError> {
        if let Some(bound) = [&start, &end].into_iter().find(|node| !node.is_scalar) {
            return Err(ParseError::NotScalar {
                expr: bound.source.clone(),
            });
        }

        let source = format!("{} AND {}", start.source, end.source);
        Ok(Inherited::from_nodes([&start, &end]).into_node(
            ExprType::Array,
            true,
            source,
            NodeKind::Array(vec![Arc::new(start), Arc::new(end)]),
        ))
    }

    fn parse_number(token: &Token, negative: bool) -> Result<Node, ParseError> {
        let sign = if negative { "-" } else { "" };

        match &token.kind {
            TokenKind::Double(text) => format!("{}{}", sign, text)
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(|n| Node::constant(ExprType::Double, Value::Double(n), format_double(n)))
                .ok_or_else(|| ParseError::InvalidNumber(token.clone())),
            TokenKind::Int(text) => {
                let text = format!("{}{}", sign, text);
                text.parse::<i32>()
                    .map(|n| Node::constant(ExprType::Int, Value::Int32(n), n.to_string()))
                    .or_else(|_| {
                        text.parse::<i64>()
                            .map(|n| Node::constant(ExprType::Int, Value::Int64(n), n.to_string()))
                    })
                    .map_err(|_| ParseError::InvalidNumber(token.clone()))
            }
            _ => Err(unexpected(token.clone())),
        }
    }

    fn parse_source(&mut self) -> Result<Node, ParseError> {
        let source = Node {
            ty: ExprType::Source,
            is_scalar: false,
            is_immutable: false,
            use_source: true,
            fields: Fields::new(),
            source: "*".to_string(),
            kind: NodeKind::Source,
        };

        if self.tokens.peek(false).kind == TokenKind::Period {
            self.tokens.next(false);
            let selector = self.parse_single(DocumentScope::Source)?;
            return Ok(Self::map(source, selector));
        }

        Ok(source)
    }

    fn parse_document(&mut self, scope: DocumentScope) -> Result<Node, ParseError> {
        let mut entries: Vec<(SmolStr, Arc<Node>)> = Vec::new();
        let mut counter = 1;

        if self.tokens.peek(true).kind == TokenKind::RBrace {
            self.tokens.next(true);
        } else {
            loop {
                let token = self.tokens.next(true).clone();
                let key: SmolStr = match &token.kind {
                    TokenKind::StringLiteral(s) => SmolStr::new(s),
                    TokenKind::Word(w) | TokenKind::Int(w) => w.clone(),
                    _ => {
                        return Err(ParseError::UnexpectedTokenExpected {
                            token,
                            expected: "key".into(),
                        });
                    }
                };

                let separator = self.tokens.next(true).clone();
                let (value, terminator) = if separator.kind == TokenKind::Colon {
                    let value = self.parse_full(scope)?;
                    (value, self.tokens.next(true).clone())
                } else {
                    (shorthand(&key), separator)
                };

                let value = if value.is_scalar { value } else { to_array(value) };
                let mut name = key.clone();
                while entries.iter().any(|(existing, _)| existing.eq_ignore_ascii_case(&name)) {
                    name = SmolStr::new(format!("{}{}", key, counter));
                    counter += 1;
                }
                entries.push((name, Arc::new(value)));

                match terminator.kind {
                    TokenKind::Comma => continue,
                    TokenKind::RBrace => break,
                    _ => {
                        return Err(ParseError::UnexpectedTokenExpected {
                            token: terminator,
                            expected: "`,` or `}`".into(),
                        });
                    }
                }
            }
        }

        let source = format!(
            "{{{}}}",
            entries
                .iter()
                .map(|(key, value)| format!("{}:{}", render_key(key), value.source))
                .collect::<Vec<_>>()
                .join(",")
        );

        Ok(Inherited::from_nodes(entries.iter().map(|(_, value)| value.as_ref())).into_node(
            ExprType::Document,
            true,
            source,
            NodeKind::Document(entries),
        ))
    }

    fn parse_array(&mut self, scope: DocumentScope) -> Result<Node, ParseError> {
        let mut items: Vec<Arc<Node>> = Vec::new();

        if self.tokens.peek(true).kind == TokenKind::RBracket {
            self.tokens.next(true);
        } else {
            loop {
                let item = self.parse_full(scope)?;
                items.push(Arc::new(if item.is_scalar { item } else { to_array(item) }));

                let terminator = self.tokens.next(true).clone();
                match terminator.kind {
                    TokenKind::Comma => continue,
                    TokenKind::RBracket => break,
                    _ => {
                        return Err(ParseError::UnexpectedTokenExpected {
                            token: terminator,
                            expected: "`,` or `]`".into(),
                        });
                    }
                }
            }
        }

        let source = format!(
            "[{}]",
            items.iter().map(|item| item.source.as_str()).collect::<Vec<_>>().join(",")
        );

        Ok(Inherited::from_nodes(items.iter().map(AsRef::as_ref)).into_node(
            ExprType::Array,
            true,
            source,
            NodeKind::Array(items),
        ))
    }

    fn parse_parameter(&mut self) -> Result<Node, ParseError> {
        let token = self.tokens.next(false).clone();
        let name: SmolStr = match &token.kind {
            TokenKind::Word(name) | TokenKind::Int(name) => name.clone(),
            _ => return Err(unexpected(token)),
        };

        Ok(Node {
            ty: ExprType::Parameter,
            is_scalar: true,
            is_immutable: false,
            use_source: false,
            fields: Fields::new(),
            source: format!("@{}", name),
            kind: NodeKind::Parameter(name),
        })
    }

    fn parse_parens(&mut self, scope: DocumentScope) -> Result<Node, ParseError> {
        let inner = self.parse_full(scope)?;
        self.expect(TokenKind::RParen)?;

        Ok(Node {
            source: format!("({})", inner.source),
            ..inner
        })
    }

    /// `MAP`, `FILTER` and `SORT`: `NAME(source => expr[, order])`.
    fn parse_function(&mut self, name_token: &Token, scope: DocumentScope) -> Result<Node, ParseError> {
        let name = name_token.kind.to_string().to_ascii_uppercase();
        self.expect(TokenKind::LParen)?;

        let left = self.parse_single(scope)?;
        let left = if left.is_scalar { to_enumerable(left) } else { left };
        self.expect(TokenKind::Arrow)?;

        let inner_scope = if left.ty == ExprType::Source {
            DocumentScope::Source
        } else {
            DocumentScope::Current
        };
        let right = self.parse_full(inner_scope)?;

        let order = if name == "SORT" && self.tokens.peek(true).kind == TokenKind::Comma {
            self.tokens.next(true);
            let order = self.parse_full(scope)?;
            if !order.is_scalar {
                return Err(ParseError::NotScalar { expr: order.source });
            }
            Some(order)
        } else {
            None
        };
        self.expect(TokenKind::RParen)?;

        Ok(match (name.as_str(), order) {
            ("MAP", _) => Self::map(left, right),
            ("FILTER", _) => {
                let source = format!("FILTER({}=>{})", left.source, right.source);
                Inherited::from_nodes([&left, &right]).into_node(
                    ExprType::Filter,
                    false,
                    source,
                    NodeKind::Filter {
                        source: Arc::new(left),
                        predicate: Arc::new(right),
                    },
                )
            }
            (_, order) => {
                let source = match &order {
                    Some(order) => format!("SORT({}=>{},{})", left.source, right.source, order.source),
                    None => format!("SORT({}=>{})", left.source, right.source),
                };
                Inherited::from_nodes([Some(&left), Some(&right), order.as_ref()].into_iter().flatten()).into_node(
                    ExprType::Sort,
                    false,
                    source,
                    NodeKind::Sort {
                        source: Arc::new(left),
                        key: Arc::new(right),
                        order: order.map(Arc::new),
                    },
                )
            }
        })
    }

    fn map(source: Node, selector: Node) -> Node {
        let text = format!("MAP({}=>{})", source.source, selector.source);
        Inherited::from_nodes([&source, &selector]).into_node(
            ExprType::Map,
            false,
            text,
            NodeKind::Map {
                source: Arc::new(source),
                selector: Arc::new(selector),
            },
        )
    }

    fn parse_call(&mut self, name_token: &Token, scope: DocumentScope) -> Result<Node, ParseError> {
        let name = SmolStr::new(name_token.kind.to_string().to_ascii_uppercase());
        self.expect(TokenKind::LParen)?;

        let mut args = Vec::new();
        if self.tokens.peek(true).kind == TokenKind::RParen {
            self.tokens.next(true);
        } else {
            loop {
                args.push(self.parse_full(scope)?);

                let terminator = self.tokens.next(true).clone();
                match terminator.kind {
                    TokenKind::Comma => continue,
                    TokenKind::RParen => break,
                    _ => {
                        return Err(ParseError::UnexpectedTokenExpected {
                            token: terminator,
                            expected: "`,` or `)`".into(),
                        });
                    }
                }
            }
        }

        if name == "IIF" && args.len() == 3 {
            return Self::conditional(args);
        }

        let function = builtin::lookup(&name, args.len()).ok_or_else(|| ParseError::UnknownFunction {
            token: name_token.clone(),
            name: name.clone(),
            arity: args.len(),
        })?;

        Ok(Self::call(function, args))
    }

    fn call(function: &'static Builtin, args: Vec<Node>) -> Node {
        let source = format!(
            "{}({})",
            function.name,
            args.iter().map(|arg| arg.source.as_str()).collect::<Vec<_>>().join(",")
        );
        let args = args
            .into_iter()
            .zip(function.params)
            .map(|(arg, param)| match param {
                ParamKind::Scalar if !arg.is_scalar => to_array(arg),
                ParamKind::Enumerable if arg.is_scalar => to_enumerable(arg),
                _ => arg,
            })
            .map(Arc::new)
            .collect::<Vec<_>>();

        let mut inherited = Inherited::from_nodes(args.iter().map(AsRef::as_ref));
        inherited.is_immutable &= !function.volatile;

        inherited.into_node(
            ExprType::Call,
            function.is_scalar(),
            source,
            NodeKind::Call { function, args },
        )
    }

    fn conditional(args: Vec<Node>) -> Result<Node, ParseError> {
        let [test, if_true, if_false]: [Node; 3] = args
            .try_into()
            .map_err(|_| ParseError::NotScalar { expr: "IIF".to_string() })?;

        if !test.is_scalar {
            return Err(ParseError::NotScalar { expr: test.source });
        }

        let source = format!("IIF({},{},{})", test.source, if_true.source, if_false.source);
        let inherited = Inherited::from_nodes([&test, &if_true, &if_false]);
        let is_scalar = if_true.is_scalar && if_false.is_scalar;
        let (if_true, if_false) = match (if_true.is_scalar, if_false.is_scalar) {
            (true, false) => (to_enumerable(if_true), if_false),
            (false, true) => (if_true, to_enumerable(if_false)),
            _ => (if_true, if_false),
        };

        Ok(inherited.into_node(
            ExprType::Call,
            is_scalar,
            source,
            NodeKind::Conditional {
                test: Arc::new(test),
                if_true: Arc::new(if_true),
                if_false: Arc::new(if_false),
            },
        ))
    }

    fn parse_path(&mut self, token: &Token, scope: DocumentScope) -> Result<Node, ParseError> {
        let (root, field) = match &token.kind {
            TokenKind::Dollar | TokenKind::At => {
                let root = if token.kind == TokenKind::Dollar {
                    PathRoot::Root
                } else {
                    PathRoot::Current
                };
                let field = if self.tokens.peek(false).kind == TokenKind::Period {
                    self.tokens.next(false);
                    let token = self.tokens.next(true).clone();
                    self.read_field(token)?
                } else {
                    SmolStr::default()
                };
                (root, field)
            }
            TokenKind::Word(word) => (
                if scope == DocumentScope::Root {
                    PathRoot::Root
                } else {
                    PathRoot::Current
                },
                word.clone(),
            ),
            _ => return Err(unexpected(token.clone())),
        };

        let mut source = root.sigil().to_string();
        let mut fields = Fields::new();
        let mut steps = Vec::new();
        let mut inner = Vec::new();

        if !field.is_empty() {
            source.push_str(&render_member(&field));
            if root == PathRoot::Root || scope == DocumentScope::Source {
                fields.insert(field.clone());
            }
            steps.push(PathStep::Member(field));
        }

        loop {
            match self.tokens.peek(false).kind {
                TokenKind::Period => {
                    self.tokens.next(false);
                    let token = self.tokens.next(false).clone();
                    let name = self.read_field(token)?;
                    source.push_str(&render_member(&name));
                    steps.push(PathStep::Member(name));
                }
                TokenKind::LBracket => {
                    self.tokens.next(false);
                    let (step, text) = self.parse_index()?;
                    source.push_str(&format!("[{}]", text));
                    if let PathStep::IndexOf(node) | PathStep::Filter(node) = &step {
                        inner.push(Arc::clone(node));
                    }
                    steps.push(step);
                }
                _ => break,
            }

            if steps.last().is_some_and(PathStep::is_enumerable) {
                break;
            }
        }

        let is_scalar = !steps.iter().any(PathStep::is_enumerable);
        let mut inherited = Inherited::from_nodes(inner.iter().map(AsRef::as_ref));
        inherited.fields = fields.union(&inherited.fields);
        inherited.is_immutable = false;

        let path = inherited.into_node(ExprType::Path, is_scalar, source, NodeKind::Path { root, steps });

        if !is_scalar && self.tokens.peek(false).kind == TokenKind::Period {
            self.tokens.next(false);
            let selector = self.parse_single(DocumentScope::Current)?;
            return Ok(Self::map(path, selector));
        }

        Ok(path)
    }

    /// Field name after `.`: a word or `["quoted name"]`.
    fn read_field(&mut self, token: Token) -> Result<SmolStr, ParseError> {
        match &token.kind {
            TokenKind::Word(word) => Ok(word.clone()),
            TokenKind::LBracket => {
                let name = self.tokens.next(true).clone();
                let TokenKind::StringLiteral(name) = &name.kind else {
                    return Err(ParseError::UnexpectedTokenExpected {
                        token: name,
                        expected: "string".into(),
                    });
                };
                self.expect(TokenKind::RBracket)?;
                Ok(SmolStr::new(name))
            }
            _ => Err(ParseError::UnexpectedTokenExpected {
                token,
                expected: "field name".into(),
            }),
        }
    }

    /// Contents of `[...]` after a path; the opening bracket is already consumed.
    fn parse_index(&mut self) -> Result<(PathStep, String), ParseError> {
        let ahead = self.tokens.peek(true).clone();

        let step = match &ahead.kind {
            TokenKind::Int(n) => {
                self.tokens.next(true);
                let index = n.parse::<i32>().map_err(|_| ParseError::InvalidNumber(ahead.clone()))?;
                (PathStep::Index(index), index.to_string())
            }
            TokenKind::Minus => {
                self.tokens.next(true);
                let token = self.tokens.next(true).clone();
                let TokenKind::Int(n) = &token.kind else {
                    return Err(ParseError::UnexpectedTokenExpected {
                        token,
                        expected: "int".into(),
                    });
                };
                let index = format!("-{}", n)
                    .parse::<i32>()
                    .map_err(|_| ParseError::InvalidNumber(token.clone()))?;
                (PathStep::Index(index), index.to_string())
            }
            TokenKind::Asterisk => {
                self.tokens.next(true);
                (PathStep::All, "*".to_string())
            }
            _ => {
                let node = self.parse_full(DocumentScope::Current)?;
                let text = node.source.clone();
                if node.ty == ExprType::Parameter {
                    (PathStep::IndexOf(Arc::new(node)), text)
                } else {
                    (PathStep::Filter(Arc::new(node)), text)
                }
            }
        };

        self.expect(TokenKind::RBracket)?;
        Ok(step)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        let token = self.tokens.next(true).clone();

        if token.kind == kind {
            Ok(token)
        } else {
            Err(ParseError::UnexpectedTokenExpected {
                token,
                expected: kind.name().into(),
            })
        }
    }
}

#[cold]
fn unexpected(token: Token) -> ParseError {
    if token.is_eof() {
        ParseError::UnexpectedEOFDetected(token)
    } else {
        ParseError::UnexpectedToken(token)
    }
}

/// Turns a scalar into a sequence with `ITEMS` semantics. Plain paths keep
/// their path form and render a trailing `[*]`.
pub(crate) fn to_enumerable(node: Node) -> Node {
    let source = node.source.clone();
    let is_plain_path = !source.starts_with('(');

    match node.kind {
        NodeKind::Path { root, mut steps } if is_plain_path => {
            steps.push(PathStep::Items);
            Node {
                is_scalar: false,
                source: format!("{}[*]", source),
                kind: NodeKind::Path { root, steps },
                ..node
            }
        }
        _ => Node {
            ty: ExprType::Call,
            is_scalar: false,
            is_immutable: node.is_immutable,
            use_source: node.use_source,
            fields: node.fields.clone(),
            source: format!("ITEMS({})", source),
            kind: NodeKind::Call {
                function: &ITEMS,
                args: vec![Arc::new(node)],
            },
        },
    }
}

/// Materializes a sequence into one array value.
pub(crate) fn to_array(node: Node) -> Node {
    Node {
        ty: ExprType::Call,
        is_scalar: true,
        is_immutable: node.is_immutable,
        use_source: node.use_source,
        fields: node.fields.clone(),
        source: format!("ARRAY({})", node.source),
        kind: NodeKind::Call {
            function: &ARRAY,
            args: vec![Arc::new(node)],
        },
    }
}

/// `{ a }` expands to `{ a: $.a }`.
fn shorthand(key: &SmolStr) -> Node {
    Node {
        ty: ExprType::Path,
        is_scalar: true,
        is_immutable: false,
        use_source: false,
        fields: Fields::from_iter([key.clone()]),
        source: format!("${}", render_member(key)),
        kind: NodeKind::Path {
            root: PathRoot::Root,
            steps: vec![PathStep::Member(key.clone())],
        },
    }
}

fn render_member(name: &str) -> String {
    if is_word(name) {
        format!(".{}", name)
    } else {
        format!(".[{}]", quote(name))
    }
}

fn render_key(key: &str) -> String {
    if is_word(key) { key.to_string() } else { quote(key) }
}

fn quote(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// At least one and at most nine fractional digits.
fn format_double(n: f64) -> String {
    let text = format!("{:.9}", n);
    let trimmed = text.trim_end_matches('0');

    if trimmed.ends_with('.') {
        format!("{}0", trimmed)
    } else {
        trimmed.to_string()
    }
}
