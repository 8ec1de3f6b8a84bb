use crate::{
    ast::{
        BinaryOperator, Binding, Block, Expr, ExprKind, Function, Ident, Let, Module, Record,
        Stmt, TypeName, Untyped,
    },
    error::{LexError, ParseError},
    lexer::{self, extract},
    token::{Span, Spanned, Token, TokenKind},
    types,
    util::intern::Interner,
};

type Result<T, E = Spanned<ParseError>> = std::result::Result<T, E>;

pub fn parse_module(
    src: &str,
    tokens: &mut Vec<Token>,
    ident_interner: &mut Interner<str>,
) -> Result<Module<Untyped>> {
    parse(src, tokens, ident_interner, Parser::parse_module)
}

/// Parses the whole input as a single expression.
pub fn parse_expr(
    src: &str,
    tokens: &mut Vec<Token>,
    ident_interner: &mut Interner<str>,
) -> Result<Expr<Untyped>> {
    parse(src, tokens, ident_interner, |p| {
        let expr = p.parse_expr()?;
        p.consume(TokenKind::Eof)?;
        Ok(expr)
    })
}

fn parse<'src, 'tok, 'ident, T>(
    src: &'src str,
    tokens: &'tok mut Vec<Token>,
    ident_interner: &'ident mut Interner<str>,
    f: impl for<'a> FnOnce(&'a mut Parser<'src, 'tok, 'ident>) -> Result<T>,
) -> Result<T> {
    assert!(tokens.is_empty());
    types::preregister(ident_interner);

    lexer::lex(src, tokens);
    if let Some(bad) = tokens.iter().find(|t| t.kind.is_error()) {
        let error = match bad.kind {
            TokenKind::ErrorUnclosedString => LexError::UnclosedString,
            _ => LexError::UnexpectedChar,
        };
        return Err(bad.span().wrap(ParseError::Lexer(error)));
    }

    let mut p = Parser::new(src, tokens, ident_interner);
    let parsed = f(&mut p)?;
    tracing::trace!(tokens = p.tokens.len(), "parsed");
    Ok(parsed)
}

struct Parser<'src, 'tok, 'ident> {
    src: &'src str,
    tokens: &'tok [Token],
    ident_interner: &'ident mut Interner<str>,
    /// Index of the incoming token.
    cursor: usize,
    /// The most recently consumed token.
    accepted: Token,
}

impl Parser<'_, '_, '_> {
    fn parse_module(&mut self) -> Result<Module<Untyped>> {
        let mut stmts = Vec::with_capacity(8);
        loop {
            let c = self.peek();
            let stmt = match c.kind {
                TokenKind::Func => Stmt::Function(self.parse_function()?),
                TokenKind::Type => Stmt::Record(self.parse_record()?),
                TokenKind::Eof => break,
                actual => {
                    return Err(c.span().wrap(ParseError::ExpectedDeclaration { actual }));
                }
            };
            stmts.push(stmt);
        }
        Ok(Module { stmts })
    }

    fn parse_function(&mut self) -> Result<Function<Untyped>> {
        let start = self.consume(TokenKind::Func)?;
        let name = self.parse_ident()?;
        self.consume(TokenKind::LParen)?;
        let params = self.parse_list(TokenKind::RParen, TokenKind::Comma, Parser::parse_binding)?;
        self.consume(TokenKind::RParen)?;
        self.consume(TokenKind::Arrow)?;
        let return_ty = self.parse_type()?;
        let body = self.parse_block()?;
        Ok(Function {
            name,
            params,
            return_ty,
            span: start.span().to(body.span),
            body,
            sym: (),
        })
    }

    fn parse_record(&mut self) -> Result<Record<Untyped>> {
        let start = self.consume(TokenKind::Type)?;
        let name = self.parse_ident()?;
        self.consume(TokenKind::LBrace)?;
        let fields = self.parse_list(TokenKind::RBrace, TokenKind::Comma, Parser::parse_binding)?;
        let end = self.consume(TokenKind::RBrace)?;
        Ok(Record {
            name,
            fields,
            span: start.span().to(end.span()),
            sym: (),
        })
    }

    fn parse_binding(&mut self) -> Result<Binding<Untyped>> {
        let name = self.parse_ident()?;
        let ty = self.parse_type()?;
        Ok(Binding { name, ty, sym: () })
    }

    /// Parses `name` or `name<arg, ...>`. Arguments nest freely; whether the
    /// named type takes them is up to the binder.
    fn parse_type(&mut self) -> Result<TypeName> {
        let name = self.parse_ident()?;
        let mut span = name.span;
        let mut args = Vec::new();
        if self.take(TokenKind::Less) {
            args = self.parse_list(TokenKind::Greater, TokenKind::Comma, Parser::parse_type)?;
            span = span.to(self.consume(TokenKind::Greater)?.span());
        }
        Ok(TypeName { name, args, span })
    }

    fn parse_ident(&mut self) -> Result<Ident> {
        let token = self.consume(TokenKind::Identifier)?;
        Ok(Ident {
            name: self.ident_interner.intern(extract::ident(token, self.src)),
            span: token.span(),
        })
    }

    fn parse_block(&mut self) -> Result<Block<Untyped>> {
        let start = self.consume(TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while !self.is(TokenKind::RBrace) {
            stmts.push(self.parse_stmt()?);
        }
        let end = self.consume(TokenKind::RBrace)?;
        Ok(Block {
            stmts,
            span: start.span().to(end.span()),
            info: (),
        })
    }

    fn parse_stmt(&mut self) -> Result<Stmt<Untyped>> {
        let stmt = match self.peek().kind {
            TokenKind::Func => Stmt::Function(self.parse_function()?),
            TokenKind::Type => Stmt::Record(self.parse_record()?),
            TokenKind::Let => Stmt::Let(self.parse_let()?),
            _ => Stmt::Expr(self.parse_expr()?),
        };
        Ok(stmt)
    }

    /// `let name Type = body (where body)*`
    fn parse_let(&mut self) -> Result<Let<Untyped>> {
        let start = self.consume(TokenKind::Let)?;
        let name = self.parse_ident()?;
        let ty = self.parse_type()?;
        self.consume(TokenKind::Eq)?;

        let first = self.parse_expr()?;
        if first.kind.is_self_assigning() {
            return Err(first.span.wrap(ParseError::SelfAssigningFirstBody));
        }
        let mut span = start.span().to(first.span);
        let mut assignments = vec![first];
        while self.take(TokenKind::Where) {
            let chained = self.parse_expr()?;
            span = span.to(chained.span);
            assignments.push(chained);
        }

        Ok(Let {
            name,
            ty,
            assignments,
            span,
            sym: (),
        })
    }

    /// Branch and loop bodies are either a block or a single expression; the
    /// latter is wrapped into a block of one statement.
    fn parse_body(&mut self) -> Result<Block<Untyped>> {
        let expr = self.parse_expr()?;
        Ok(match expr.kind {
            ExprKind::Block(block) => block,
            _ => Block {
                span: expr.span,
                stmts: vec![Stmt::Expr(expr)],
                info: (),
            },
        })
    }

    fn parse_expr(&mut self) -> Result<Expr<Untyped>> {
        let lhs = self.parse_operand()?;
        self.parse_operator_sequence(lhs, 0)
    }

    /// Precedence climbing over a flat `operand (op operand)*` sequence.
    ///
    /// Only operators binding tighter than `min_precedence` are absorbed, so
    /// operators of equal precedence group to the left.
    fn parse_operator_sequence(
        &mut self,
        mut lhs: Expr<Untyped>,
        min_precedence: u8,
    ) -> Result<Expr<Untyped>> {
        while let Some(op) = self.peek_operator() {
            if op.precedence() <= min_precedence {
                break;
            }
            self.accept_operator(op);
            let mut operand = self.parse_operand()?;

            // A stronger operator on the right owns the operand, so the whole
            // sub-expression becomes the right-hand side.
            if let Some(next) = self.peek_operator() {
                if next.precedence() > op.precedence() {
                    operand = self.parse_operator_sequence(operand, op.precedence())?;
                }
            }

            let span = lhs.span.to(operand.span);
            lhs = Expr {
                kind: ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(operand),
                },
                span,
                info: (),
            };
        }
        Ok(lhs)
    }

    fn parse_operand(&mut self) -> Result<Expr<Untyped>> {
        let token = self.peek();
        let mut expr = match token.kind {
            TokenKind::Number => {
                self.advance();
                let Ok(value) = extract::number(token, self.src) else {
                    return Err(token.span().wrap(ParseError::InvalidNumber));
                };
                leaf(ExprKind::Number(value), token.span())
            }
            TokenKind::String => {
                self.advance();
                leaf(
                    ExprKind::String(extract::string(token, self.src)),
                    token.span(),
                )
            }
            TokenKind::True => leaf(ExprKind::Bool(true), self.advance().span()),
            TokenKind::False => leaf(ExprKind::Bool(false), self.advance().span()),
            TokenKind::Identifier => self.parse_named()?,
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.consume(TokenKind::RParen)?;
                inner
            }
            TokenKind::LBrace => {
                let block = self.parse_block()?;
                leaf_block(block)
            }
            TokenKind::If => self.parse_if()?,
            TokenKind::Foreach => self.parse_foreach()?,
            TokenKind::LBracket => self.parse_range()?,
            token_kind => {
                let error = ParseError::UnexpectedTokenInExpr { token: token_kind };
                return Err(token.span().wrap(error));
            }
        };

        // Member access: `.` immediately followed by a name. A second `.`
        // would be the concatenation operator instead.
        while self.is(TokenKind::Dot) && self.lookahead().kind == TokenKind::Identifier {
            self.advance();
            let field = self.parse_ident()?;
            let span = expr.span.to(field.span);
            expr = Expr {
                kind: ExprKind::Member {
                    base: Box::new(expr),
                    field,
                    sym: (),
                },
                span,
                info: (),
            };
        }

        Ok(expr)
    }

    /// The token after the name decides: `(` starts a call, `{` a record
    /// construction; anything else leaves a named value.
    fn parse_named(&mut self) -> Result<Expr<Untyped>> {
        let name = self.parse_ident()?;
        let (kind, span) = match self.peek().kind {
            TokenKind::LParen => {
                self.advance();
                let args = self.parse_list(TokenKind::RParen, TokenKind::Comma, Parser::parse_expr)?;
                let end = self.consume(TokenKind::RParen)?;
                let call = ExprKind::Call { name, args, sym: () };
                (call, name.span.to(end.span()))
            }
            TokenKind::LBrace => {
                self.advance();
                let args = self.parse_list(TokenKind::RBrace, TokenKind::Comma, Parser::parse_expr)?;
                let end = self.consume(TokenKind::RBrace)?;
                let construct = ExprKind::Construct {
                    ty: name,
                    args,
                    sym: (),
                };
                (construct, name.span.to(end.span()))
            }
            _ => (ExprKind::Named(name, ()), name.span),
        };
        Ok(Expr {
            kind,
            span,
            info: (),
        })
    }

    /// `if cond then body [else body]`
    fn parse_if(&mut self) -> Result<Expr<Untyped>> {
        let start = self.consume(TokenKind::If)?;
        let cond = self.parse_expr()?;
        self.consume(TokenKind::Then)?;
        let then_block = self.parse_body()?;
        let else_block = if self.take(TokenKind::Else) {
            Some(self.parse_body()?)
        } else {
            None
        };
        let end = else_block.as_ref().map_or(then_block.span, |b| b.span);
        Ok(Expr {
            kind: ExprKind::If {
                cond: Box::new(cond),
                then_block,
                else_block,
            },
            span: start.span().to(end),
            info: (),
        })
    }

    /// `foreach name Type in range do body`
    fn parse_foreach(&mut self) -> Result<Expr<Untyped>> {
        let start = self.consume(TokenKind::Foreach)?;
        let element = self.parse_ident()?;
        let element_ty = self.parse_type()?;
        self.consume(TokenKind::In)?;
        let range = self.parse_expr()?;
        self.consume(TokenKind::Do)?;
        let body = self.parse_body()?;
        Ok(Expr {
            span: start.span().to(body.span),
            kind: ExprKind::Foreach {
                element,
                element_ty,
                range: Box::new(range),
                body,
                sym: (),
            },
            info: (),
        })
    }

    /// `[from to to]` or `[from to to step step]`
    fn parse_range(&mut self) -> Result<Expr<Untyped>> {
        let start = self.consume(TokenKind::LBracket)?;
        let from = self.parse_expr()?;
        self.consume(TokenKind::To)?;
        let to = self.parse_expr()?;
        let step = if self.take(TokenKind::Step) {
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        let end = self.consume(TokenKind::RBracket)?;
        Ok(Expr {
            kind: ExprKind::Range {
                from: Box::new(from),
                to: Box::new(to),
                step,
            },
            span: start.span().to(end.span()),
            info: (),
        })
    }

    /// Recognizes the binary operator starting at the incoming token, without
    /// consuming anything. Two-character operators (`==`, `!=`, `..`) are
    /// read from the incoming and lookahead tokens, so trivia may separate
    /// their halves.
    fn peek_operator(&self) -> Option<BinaryOperator> {
        let incoming = self.peek();
        let lookahead = self.lookahead();
        let op = match (incoming.kind, lookahead.kind) {
            (TokenKind::Or, _) => BinaryOperator::Or,
            (TokenKind::And, _) => BinaryOperator::And,
            (TokenKind::Eq, TokenKind::Eq) => BinaryOperator::Eq,
            (TokenKind::Bang, TokenKind::Eq) => BinaryOperator::Ne,
            (TokenKind::Greater, _) => BinaryOperator::Greater,
            (TokenKind::Less, _) => BinaryOperator::Less,
            (TokenKind::Dot, TokenKind::Dot) => BinaryOperator::Concat,
            (TokenKind::Plus, _) => BinaryOperator::Add,
            (TokenKind::Minus, _) => BinaryOperator::Sub,
            (TokenKind::Star, _) => BinaryOperator::Mul,
            (TokenKind::Slash, _) => BinaryOperator::Div,
            (TokenKind::Percent, _) => BinaryOperator::Rem,
            _ => return None,
        };
        Some(op)
    }

    /// Consumes the tokens of an operator previously seen by
    /// [`Parser::peek_operator`].
    fn accept_operator(&mut self, op: BinaryOperator) {
        self.advance();
        if matches!(
            op,
            BinaryOperator::Eq | BinaryOperator::Ne | BinaryOperator::Concat
        ) {
            self.advance();
        }
    }

    /// Parses `item (separator item)*` until `end_delim` is found. Does **NOT**
    /// consume the end delimiter. A trailing separator is accepted.
    fn parse_list<T>(
        &mut self,
        end_delim: TokenKind,
        separator: TokenKind,
        mut parse_item: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        debug_assert_ne!(end_delim, separator);

        let mut items = Vec::new();
        while !self.is(end_delim) {
            items.push(parse_item(self)?);

            if !self.take(separator) {
                if self.is(end_delim) {
                    break;
                }
                let c = self.peek();
                return Err(c.span().wrap(ParseError::UnexpectedAny {
                    actual: c.kind,
                    expected: Box::from([separator, end_delim]),
                }));
            }
        }
        Ok(items)
    }
}

fn leaf(kind: ExprKind<Untyped>, span: Span) -> Expr<Untyped> {
    Expr {
        kind,
        span,
        info: (),
    }
}

fn leaf_block(block: Block<Untyped>) -> Expr<Untyped> {
    let span = block.span;
    leaf(ExprKind::Block(block), span)
}

/// Cursor operations. The parser sees three tokens at any time: the one it
/// accepted last, the incoming one and one of lookahead. Trivia is skipped.
impl Parser<'_, '_, '_> {
    fn new<'src, 'tok, 'ident>(
        src: &'src str,
        tokens: &'tok [Token],
        ident_interner: &'ident mut Interner<str>,
    ) -> Parser<'src, 'tok, 'ident> {
        let mut p = Parser {
            src,
            tokens,
            ident_interner,
            cursor: 0,
            accepted: Token::new(TokenKind::Eof, Span::new_of_length(0, 0)),
        };
        p.cursor = p.skip_trivia(0);
        p
    }

    /// Returns the first non-trivia index at or after `from`.
    fn skip_trivia(&self, mut from: usize) -> usize {
        while self
            .tokens
            .get(from)
            .is_some_and(|token| token.kind.is_trivia())
        {
            from += 1;
        }
        from
    }

    /// Returns the incoming token.
    #[inline]
    fn peek(&self) -> Token {
        match self.tokens.get(self.cursor) {
            Some(token) => *token,
            None => Token::eof_for(self.src),
        }
    }

    /// Returns the token after the incoming one.
    fn lookahead(&self) -> Token {
        let next = self.skip_trivia(self.cursor + 1);
        match self.tokens.get(next) {
            Some(token) => *token,
            None => Token::eof_for(self.src),
        }
    }

    /// Accepts the incoming token and returns it.
    fn advance(&mut self) -> Token {
        let c = self.peek();
        if !c.is_eof() {
            self.cursor = self.skip_trivia(self.cursor + 1);
        }
        self.accepted = c;
        c
    }

    /// Checks whether the incoming token matches the given one.
    fn is(&self, expect: TokenKind) -> bool {
        self.peek().kind == expect
    }

    /// Advances if the incoming token matches the provided one, returning
    /// true. If not, returns false and doesn't advance.
    fn take(&mut self, expect: TokenKind) -> bool {
        if self.is(expect) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Advances if the incoming token matches the provided one. If not, fails
    /// with the mismatch.
    fn consume(&mut self, expect: TokenKind) -> Result<Token> {
        let c = self.peek();
        if self.is(expect) {
            Ok(self.advance())
        } else {
            Err(c.span().wrap(ParseError::Unexpected {
                actual: c.kind,
                expected: expect,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::util::test_utils::tree_tests;

    tree_tests!(
        use parser;

        fn test_precedence_mul_binds_tighter() {
            let expr = "1 + 2 * 3";
            let tree_ok = "
                binary Add (0..9)
                  number 1 (0..1)
                  binary Mul (4..9)
                    number 2 (4..5)
                    number 3 (8..9)
            ";
        }

        fn test_precedence_left_grouping() {
            let expr = "1 - 2 * 3 + 4";
            let tree_ok = "
                binary Add (0..13)
                  binary Sub (0..9)
                    number 1 (0..1)
                    binary Mul (4..9)
                      number 2 (4..5)
                      number 3 (8..9)
                  number 4 (12..13)
            ";
        }

        fn test_precedence_equality_over_sum() {
            let expr = "1 + 2 == 3";
            let tree_ok = "
                binary Eq (0..10)
                  binary Add (0..5)
                    number 1 (0..1)
                    number 2 (4..5)
                  number 3 (9..10)
            ";
        }

        fn test_concat_looser_than_sum() {
            let expr = r#""n=" .. 1 + 2"#;
            let tree_ok = r#"
                binary Concat (0..13)
                  string "n=" (0..4)
                  binary Add (8..13)
                    number 1 (8..9)
                    number 2 (12..13)
            "#;
        }

        fn test_concat_tighter_than_comparison() {
            let expr = r#"a .. b == c or d and e"#;
            let tree_ok = "
                binary Or (0..22)
                  binary Eq (0..11)
                    binary Concat (0..6)
                      named a (0..1)
                      named b (5..6)
                    named c (10..11)
                  binary And (15..22)
                    named d (15..16)
                    named e (21..22)
            ";
        }

        fn test_parenthesized() {
            let expr = "(1 + 2) * 3";
            let tree_ok = "
                binary Mul (1..11)
                  binary Add (1..6)
                    number 1 (1..2)
                    number 2 (5..6)
                  number 3 (10..11)
            ";
        }

        fn test_not_equal_and_rem() {
            let expr = "x % 2 != 0";
            let tree_ok = "
                binary Ne (0..10)
                  binary Rem (0..5)
                    named x (0..1)
                    number 2 (4..5)
                  number 0 (9..10)
            ";
        }

        fn test_two_char_operators_allow_spacing() {
            let expr = "a = = b ! = c";
            let tree_ok = "
                binary Ne (0..13)
                  binary Eq (0..7)
                    named a (0..1)
                    named b (6..7)
                  named c (12..13)
            ";
        }

        fn test_spaced_concat() {
            let expr = r#""x" . . 1"#;
            let tree_ok = r#"
                binary Concat (0..9)
                  string "x" (0..3)
                  number 1 (8..9)
            "#;
        }

        fn test_literals() {
            let expr = r#"f(2.5, "s", true, false)"#;
            let tree_ok = r#"
                call f (0..24)
                  number 2.5 (2..5)
                  string "s" (7..10)
                  bool true (12..16)
                  bool false (18..23)
            "#;
        }

        fn test_construct_and_member() {
            let expr = r#"Point{1, "b"}.a"#;
            let tree_ok = r#"
                member a (0..15)
                  construct Point (0..13)
                    number 1 (6..7)
                    string "b" (9..12)
            "#;
        }

        fn test_member_chain() {
            let expr = "a.b.c";
            let tree_ok = "
                member c (0..5)
                  member b (0..3)
                    named a (0..1)
            ";
        }

        fn test_range_with_step() {
            let expr = "[0 to n + 1 step 2]";
            let tree_ok = "
                range (0..19)
                  number 0 (1..2)
                  binary Add (6..11)
                    named n (6..7)
                    number 1 (10..11)
                  number 2 (17..18)
            ";
        }

        fn test_if_else_with_expression_bodies() {
            let expr = "if a > b then a else b";
            let tree_ok = "
                if (0..22)
                  binary Greater (3..8)
                    named a (3..4)
                    named b (7..8)
                  block (14..15)
                    named a (14..15)
                  block (21..22)
                    named b (21..22)
            ";
        }

        fn test_if_with_block_bodies() {
            let expr = "if c then { 1 } else { 2 }";
            let tree_ok = "
                if (0..26)
                  named c (3..4)
                  block (10..15)
                    number 1 (12..13)
                  block (21..26)
                    number 2 (23..24)
            ";
        }

        fn test_block_with_let_chain() {
            let expr = "
                {
                    let x Number = 0
                        where foreach i Number in [1 to 4] do x + i
                        where if x > 100 then 999
                    x
                }
            ";
            let tree_ok = "
                block (17..213)
                  let x: Number (39..173)
                    number 0 (54..55)
                    where
                      foreach i: Number (86..123)
                        range (106..114)
                          number 1 (107..108)
                          number 4 (112..113)
                        block (118..123)
                          binary Add (118..123)
                            named x (118..119)
                            named i (122..123)
                    where
                      if (154..173)
                        binary Greater (157..164)
                          named x (157..158)
                          number 100 (161..164)
                        block (170..173)
                          number 999 (170..173)
                  named x (194..195)
            ";
        }

        fn test_module() {
            let module = "
                type Point { x Number, y Number }
                func Main() -> Seq<Number> {
                    func helper(p Point) -> Number { p.x }
                    [helper(Point{1, 2}) to 10]
                }
            ";
            let tree_ok = "
                type Point
                  field x: Number
                  field y: Number
                func Main() -> Seq<Number>
                  block (94..220)
                    func helper(p: Point) -> Number
                      block (147..154)
                        member x (149..152)
                          named p (149..150)
                    range (175..202)
                      call helper (176..195)
                        construct Point (183..194)
                          number 1 (189..190)
                          number 2 (192..193)
                      number 10 (199..201)
            ";
        }

        fn test_comments_are_skipped() {
            let module = "
                // entry point
                func Main() -> Number { 1 } // trailing
            ";
            let tree_ok = "
                func Main() -> Number
                  block (70..75)
                    number 1 (72..73)
            ";
        }

        fn test_error_first_let_body_self_assigning() {
            let expr = "{ let x Number = if c then 1 }";
            let expected_errors = &[
                "17..28: the first body of a let cannot be an if without else or a foreach",
            ];
        }

        fn test_error_let_at_module_level() {
            let module = "let x Number = 1";
            let expected_errors = &["0..3: expected a function or type declaration, but got Let"];
        }

        fn test_error_missing_arrow() {
            let module = "func f() Number { 1 }";
            let expected_errors = &["9..15: expected token Arrow, but got Identifier"];
        }

        fn test_error_unexpected_token_in_expr() {
            let expr = "1 + )";
            let expected_errors = &["4..5: unexpected token RParen in expression"];
        }

        fn test_error_single_equals_is_not_an_operator() {
            let expr = "a = b";
            let expected_errors = &["2..3: expected token Eof, but got Eq"];
        }

        fn test_error_list_separator() {
            let expr = "f(1 2)";
            let expected_errors = &["4..5: expected one of [Comma, RParen], but got Number"];
        }

        fn test_error_lexer_unexpected_char() {
            let expr = "1 $ 2";
            let expected_errors = &["2..3: unexpected character"];
        }

        fn test_error_lexer_unclosed_string() {
            let expr = "\"abc";
            let expected_errors = &["0..4: unclosed string"];
        }
    );
}
