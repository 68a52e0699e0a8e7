//! Recursive-descent parser: tokens in, a typed [`ast::Query`] out.
//!
//! Classifies the input first — empty / multiple-statement /
//! unsupported-query-type are parse-time errors, not validation errors —
//! then recurses through clauses, patterns and expressions.
//!
//! Constructs the lexical parser neither knows nor cares about (START,
//! FILTER/EXTRACT, index/constraint DDL, USING hints, PERIODIC COMMIT) are
//! still recognized here — loosely, just enough to skip balanced tokens —
//! and recorded as `ClauseData::Unsupported`/`Expression::Unsupported` so
//! the validator is the single place that rejects them.

use crate::ast::*;
use crate::diag::Error;
use crate::lexer::{tokenize, Keyword, Token, TokenKind};
use crate::span::Span;

pub struct ParseResult {
    pub query: Query,
    pub node_count: u32,
}

pub fn parse(text: &str) -> Result<ParseResult, (Error, Option<Span>)> {
    let stripped = crate::params::strip_cypher_prefix(text);
    let tokens = tokenize(stripped).map_err(|e| (Error::ParserError(e.message), Some(e.span)))?;
    let mut parser = Parser { tokens, pos: 0, ids: NodeIdGen::default() };
    parser.parse_top_level()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    ids: NodeIdGen,
}

type PResult<T> = Result<T, (Error, Option<Span>)>;

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn span(&self) -> Span {
        self.tokens[self.pos].span
    }

    fn bump(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn at_keyword(&self, kw: Keyword) -> bool {
        matches!(self.peek_kind(), TokenKind::Keyword(k) if *k == kw)
    }

    fn eat_keyword(&mut self, kw: Keyword) -> bool {
        if self.at_keyword(kw) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, kw: Keyword) -> PResult<Span> {
        if self.at_keyword(kw) {
            Ok(self.bump().span)
        } else {
            Err((Error::ParserError(format!("expected {:?}", kw)), Some(self.span())))
        }
    }

    fn at_punct(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn eat_punct(&mut self, kind: &TokenKind) -> bool {
        if self.at_punct(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, kind: TokenKind, what: &str) -> PResult<Span> {
        if self.at_punct(&kind) {
            Ok(self.bump().span)
        } else {
            Err((Error::ParserError(format!("expected {}", what)), Some(self.span())))
        }
    }

    fn expect_ident(&mut self) -> PResult<(String, Span)> {
        match self.peek_kind().clone() {
            TokenKind::Ident(name) => {
                let span = self.bump().span;
                Ok((name, span))
            }
            _ => Err((Error::ParserError("expected identifier".into()), Some(self.span()))),
        }
    }

    // ---- top level ----

    fn parse_top_level(&mut self) -> PResult<ParseResult> {
        if self.at_eof() {
            return Err((Error::EmptyQuery, None));
        }
        let mut clauses = Vec::new();
        loop {
            if self.at_eof() {
                break;
            }
            clauses.push(self.parse_clause()?);
            if self.eat_punct(&TokenKind::Semicolon) {
                if !self.at_eof() {
                    return Err((Error::MultipleStatements, Some(self.span())));
                }
                break;
            }
        }
        if clauses.is_empty() {
            return Err((Error::EmptyQuery, None));
        }
        Ok(ParseResult { query: Query::new(clauses), node_count: self.ids.next().0 })
    }

    fn parse_clause(&mut self) -> PResult<Clause> {
        let start = self.span();
        let data = match self.peek_kind().clone() {
            TokenKind::Keyword(Keyword::Optional) => {
                self.bump();
                self.expect_keyword(Keyword::Match)?;
                self.parse_match_body(true)?
            }
            TokenKind::Keyword(Keyword::Match) => {
                self.bump();
                self.parse_match_body(false)?
            }
            TokenKind::Keyword(Keyword::Create) => {
                self.bump();
                ClauseData::Create(CreateClause { patterns: self.parse_pattern_list()? })
            }
            TokenKind::Keyword(Keyword::Merge) => {
                self.bump();
                self.parse_merge_body()?
            }
            TokenKind::Keyword(Keyword::Set) => {
                self.bump();
                ClauseData::Set(self.parse_set_body()?)
            }
            TokenKind::Keyword(Keyword::Remove) => {
                self.bump();
                ClauseData::Remove(self.parse_remove_body()?)
            }
            TokenKind::Keyword(Keyword::Delete) => {
                self.bump();
                ClauseData::Delete(DeleteClause { detach: false, exprs: self.parse_expr_list()? })
            }
            TokenKind::Keyword(Keyword::Detach) => {
                self.bump();
                self.expect_keyword(Keyword::Delete)?;
                ClauseData::Delete(DeleteClause { detach: true, exprs: self.parse_expr_list()? })
            }
            TokenKind::Keyword(Keyword::With) => {
                self.bump();
                ClauseData::With(self.parse_projection_body()?)
            }
            TokenKind::Keyword(Keyword::Return) => {
                self.bump();
                ClauseData::Return(self.parse_projection_body()?)
            }
            TokenKind::Keyword(Keyword::Unwind) => {
                self.bump();
                let expr = self.parse_expr()?;
                self.expect_keyword(Keyword::As)?;
                let (alias, alias_span) = self.expect_ident()?;
                ClauseData::Unwind(UnwindClause { expr, alias, alias_span })
            }
            TokenKind::Keyword(Keyword::Foreach) => {
                self.bump();
                ClauseData::Foreach(self.parse_foreach_body()?)
            }
            TokenKind::Keyword(Keyword::Call) => {
                self.bump();
                self.parse_call_body()?
            }
            TokenKind::Keyword(Keyword::Union) => {
                self.bump();
                let all = self.eat_keyword(Keyword::All);
                ClauseData::Union(UnionClause { all })
            }
            TokenKind::Keyword(
                kw @ (Keyword::Start | Keyword::Using | Keyword::Index | Keyword::Constraint),
            ) => ClauseData::Unsupported(self.parse_unsupported_clause(kw)?),
            _ => return Err((Error::ParserError("expected a clause".into()), Some(self.span()))),
        };
        let end = self.tokens[self.pos.saturating_sub(1)].span;
        let id = self.ids.next();
        Ok(Clause { id, span: start.merge(&end), data })
    }

    /// Skips a loosely-recognized, unsupported clause up to the next clause
    /// keyword or end of input, recording only its leading keyword.
    fn parse_unsupported_clause(&mut self, kw: Keyword) -> PResult<UnsupportedClause> {
        let name = format!("{:?}", kw);
        while !self.at_eof() && !self.at_clause_start() {
            self.bump();
        }
        Ok(UnsupportedClause { name })
    }

    fn at_clause_start(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Keyword(
                Keyword::Match
                    | Keyword::Optional
                    | Keyword::Create
                    | Keyword::Merge
                    | Keyword::Set
                    | Keyword::Remove
                    | Keyword::Delete
                    | Keyword::Detach
                    | Keyword::With
                    | Keyword::Return
                    | Keyword::Unwind
                    | Keyword::Foreach
                    | Keyword::Call
                    | Keyword::Union
            ) | TokenKind::Semicolon
        )
    }

    // ---- MATCH / patterns ----

    fn parse_match_body(&mut self, optional: bool) -> PResult<ClauseData> {
        let patterns = self.parse_pattern_list()?;
        let predicate = if self.eat_keyword(Keyword::Where) { Some(self.parse_expr()?) } else { None };
        Ok(ClauseData::Match(MatchClause { optional, patterns, predicate }))
    }

    fn parse_merge_body(&mut self) -> PResult<ClauseData> {
        let pattern = self.parse_pattern_path()?;
        let mut on_create = Vec::new();
        let mut on_match = Vec::new();
        loop {
            if self.at_keyword(Keyword::Merge) {
                break;
            }
            // Cypher's ON CREATE / ON MATCH use `ON` as a soft keyword; `On`
            // is not in our keyword table, so it arrives as an identifier.
            if matches!(self.peek_kind(), TokenKind::Ident(w) if w.eq_ignore_ascii_case("on")) {
                self.bump();
                if self.eat_keyword(Keyword::Create) {
                    self.expect_keyword(Keyword::Set)?;
                    on_create.extend(self.parse_set_items()?);
                } else if self.eat_keyword(Keyword::Match) {
                    self.expect_keyword(Keyword::Set)?;
                    on_match.extend(self.parse_set_items()?);
                } else {
                    return Err((Error::ParserError("expected CREATE or MATCH after ON".into()), Some(self.span())));
                }
            } else {
                break;
            }
        }
        Ok(ClauseData::Merge(MergeClause { pattern, on_create, on_match }))
    }

    fn parse_pattern_list(&mut self) -> PResult<Vec<PatternPath>> {
        let mut out = vec![self.parse_pattern_path()?];
        while self.eat_punct(&TokenKind::Comma) {
            out.push(self.parse_pattern_path()?);
        }
        Ok(out)
    }

    fn parse_pattern_path(&mut self) -> PResult<PatternPath> {
        let start = self.span();
        let variable = if let TokenKind::Ident(name) = self.peek_kind().clone() {
            if self.tokens.get(self.pos + 1).map(|t| &t.kind) == Some(&TokenKind::Eq) {
                self.bump();
                self.bump();
                Some(name)
            } else {
                None
            }
        } else {
            None
        };
        let kind = if self.at_keyword(Keyword::ShortestPath) {
            self.bump();
            PathKind::ShortestPath
        } else if self.at_keyword(Keyword::AllShortestPaths) {
            self.bump();
            PathKind::AllShortestPaths
        } else {
            PathKind::Normal
        };
        let wrapped = !matches!(kind, PathKind::Normal);
        if wrapped {
            self.expect_punct(TokenKind::LParen, "`(`")?;
        }
        let (nodes, rels) = self.parse_pattern_chain()?;
        if wrapped {
            self.expect_punct(TokenKind::RParen, "`)`")?;
        }
        let end = self.tokens[self.pos.saturating_sub(1)].span;
        Ok(PatternPath { variable, kind, nodes, rels, span: start.merge(&end) })
    }

    fn parse_pattern_chain(&mut self) -> PResult<(Vec<NodePattern>, Vec<RelPattern>)> {
        let mut nodes = vec![self.parse_node_pattern()?];
        let mut rels = Vec::new();
        loop {
            if self.at_punct(&TokenKind::Minus) || self.at_punct(&TokenKind::ArrowLeft) {
                rels.push(self.parse_rel_pattern()?);
                nodes.push(self.parse_node_pattern()?);
            } else {
                break;
            }
        }
        Ok((nodes, rels))
    }

    fn parse_node_pattern(&mut self) -> PResult<NodePattern> {
        let start = self.expect_punct(TokenKind::LParen, "`(`")?;
        let variable = if let TokenKind::Ident(name) = self.peek_kind().clone() {
            self.bump();
            Some(name)
        } else {
            None
        };
        let labels = self.parse_label_list()?;
        let properties = if self.at_punct(&TokenKind::LBrace) { Some(self.parse_map_literal()?) } else { None };
        let end = self.expect_punct(TokenKind::RParen, "`)`")?;
        Ok(NodePattern { id: self.ids.next(), variable, labels, properties, span: start.merge(&end) })
    }

    fn parse_label_list(&mut self) -> PResult<Vec<String>> {
        let mut labels = Vec::new();
        while self.eat_punct(&TokenKind::Colon) {
            let (name, _) = self.expect_ident()?;
            labels.push(name);
        }
        Ok(labels)
    }

    fn parse_rel_pattern(&mut self) -> PResult<RelPattern> {
        let start = self.span();
        let left_arrow = self.eat_punct(&TokenKind::ArrowLeft);
        if !left_arrow {
            self.expect_punct(TokenKind::Minus, "`-`")?;
        }
        let mut variable = None;
        let mut types = Vec::new();
        let mut properties = None;
        let mut var_length = None;
        if self.eat_punct(&TokenKind::LBracket) {
            if let TokenKind::Ident(name) = self.peek_kind().clone() {
                self.bump();
                variable = Some(name);
            }
            while self.eat_punct(&TokenKind::Colon) {
                let (name, _) = self.expect_ident()?;
                types.push(name);
                if self.eat_punct(&TokenKind::Pipe) {
                    self.eat_punct(&TokenKind::Colon);
                }
            }
            if self.eat_punct(&TokenKind::Star) {
                var_length = Some(self.parse_var_length()?);
            }
            if self.at_punct(&TokenKind::LBrace) {
                properties = Some(self.parse_map_literal()?);
            }
            self.expect_punct(TokenKind::RBracket, "`]`")?;
        }
        let right_arrow = if self.eat_punct(&TokenKind::Arrow) {
            true
        } else {
            self.expect_punct(TokenKind::Minus, "`-`")?;
            false
        };
        let direction = match (left_arrow, right_arrow) {
            (true, false) => Direction::Left,
            (false, true) => Direction::Right,
            _ => Direction::Either,
        };
        let end = self.tokens[self.pos.saturating_sub(1)].span;
        Ok(RelPattern {
            id: self.ids.next(),
            variable,
            types,
            direction,
            properties,
            var_length,
            span: start.merge(&end),
        })
    }

    fn parse_var_length(&mut self) -> PResult<VarLength> {
        let min = if let TokenKind::IntLiteral(n) = self.peek_kind().clone() {
            self.bump();
            Some(n as u32)
        } else {
            None
        };
        if self.eat_punct(&TokenKind::DotDot) {
            let max = if let TokenKind::IntLiteral(n) = self.peek_kind().clone() {
                self.bump();
                Some(n as u32)
            } else {
                None
            };
            Ok(VarLength { min, max })
        } else {
            Ok(VarLength { min, max: min })
        }
    }

    fn parse_map_literal(&mut self) -> PResult<Expression> {
        let start = self.expect_punct(TokenKind::LBrace, "`{`")?;
        let mut entries = Vec::new();
        if !self.at_punct(&TokenKind::RBrace) {
            loop {
                let (key, _) = self.expect_ident()?;
                self.expect_punct(TokenKind::Colon, "`:`")?;
                let value = self.parse_expr()?;
                entries.push((key, value));
                if !self.eat_punct(&TokenKind::Comma) {
                    break;
                }
            }
        }
        let end = self.expect_punct(TokenKind::RBrace, "`}`")?;
        Ok(Expression::MapLiteral(entries, start.merge(&end)))
    }

    // ---- SET / REMOVE ----

    fn parse_set_body(&mut self) -> PResult<SetClause> {
        Ok(SetClause { items: self.parse_set_items()? })
    }

    fn parse_set_items(&mut self) -> PResult<Vec<SetItem>> {
        let mut items = vec![self.parse_set_item()?];
        while self.eat_punct(&TokenKind::Comma) {
            items.push(self.parse_set_item()?);
        }
        Ok(items)
    }

    fn parse_set_item(&mut self) -> PResult<SetItem> {
        let start = self.span();
        if let TokenKind::Ident(name) = self.peek_kind().clone() {
            if self.tokens.get(self.pos + 1).map(|t| &t.kind) == Some(&TokenKind::Colon) {
                self.bump();
                let labels = self.parse_label_list()?;
                let end = self.tokens[self.pos.saturating_sub(1)].span;
                return Ok(SetItem::Labels { identifier: name, labels, span: start.merge(&end) });
            }
        }
        let target = self.parse_expr()?;
        if self.eat_punct(&TokenKind::Plus) {
            self.expect_punct(TokenKind::Eq, "`=`")?;
            let value = self.parse_expr()?;
            Ok(SetItem::PropertyAppend { target, value })
        } else {
            self.expect_punct(TokenKind::Eq, "`=`")?;
            let value = self.parse_expr()?;
            Ok(SetItem::Property { target, value })
        }
    }

    fn parse_remove_body(&mut self) -> PResult<RemoveClause> {
        let mut items = vec![self.parse_remove_item()?];
        while self.eat_punct(&TokenKind::Comma) {
            items.push(self.parse_remove_item()?);
        }
        Ok(RemoveClause { items })
    }

    fn parse_remove_item(&mut self) -> PResult<RemoveItem> {
        let start = self.span();
        if let TokenKind::Ident(name) = self.peek_kind().clone() {
            if self.tokens.get(self.pos + 1).map(|t| &t.kind) == Some(&TokenKind::Colon) {
                self.bump();
                let labels = self.parse_label_list()?;
                let end = self.tokens[self.pos.saturating_sub(1)].span;
                return Ok(RemoveItem::Labels { identifier: name, labels, span: start.merge(&end) });
            }
        }
        Ok(RemoveItem::Property(self.parse_expr()?))
    }

    // ---- WITH / RETURN ----

    fn parse_projection_body(&mut self) -> PResult<ProjectionClause> {
        let distinct = self.eat_keyword(Keyword::Distinct);
        let items = if self.eat_punct(&TokenKind::Star) {
            ProjectionItems::Star
        } else {
            let mut out = vec![self.parse_projection_item()?];
            while self.eat_punct(&TokenKind::Comma) {
                out.push(self.parse_projection_item()?);
            }
            ProjectionItems::Explicit(out)
        };
        let predicate = if self.eat_keyword(Keyword::Where) { Some(self.parse_expr()?) } else { None };
        let order_by = if self.eat_keyword(Keyword::Order) {
            self.expect_keyword(Keyword::By)?;
            self.parse_order_items()?
        } else {
            Vec::new()
        };
        let skip = if self.eat_keyword(Keyword::Skip) { Some(self.parse_expr()?) } else { None };
        let limit = if self.eat_keyword(Keyword::Limit) { Some(self.parse_expr()?) } else { None };
        Ok(ProjectionClause { distinct, items, predicate, order_by, skip, limit })
    }

    fn parse_projection_item(&mut self) -> PResult<ProjectionItem> {
        let start = self.span();
        let expr = self.parse_expr()?;
        let alias = if self.eat_keyword(Keyword::As) { Some(self.expect_ident()?.0) } else { None };
        let end = self.tokens[self.pos.saturating_sub(1)].span;
        Ok(ProjectionItem { expr, alias, span: start.merge(&end) })
    }

    fn parse_order_items(&mut self) -> PResult<Vec<OrderItem>> {
        let mut out = vec![self.parse_order_item()?];
        while self.eat_punct(&TokenKind::Comma) {
            out.push(self.parse_order_item()?);
        }
        Ok(out)
    }

    fn parse_order_item(&mut self) -> PResult<OrderItem> {
        let expr = self.parse_expr()?;
        let direction = if self.eat_keyword(Keyword::Desc) {
            SortDirection::Desc
        } else {
            self.eat_keyword(Keyword::Asc);
            SortDirection::Asc
        };
        Ok(OrderItem { expr, direction })
    }

    // ---- UNWIND / FOREACH / CALL ----

    fn parse_foreach_body(&mut self) -> PResult<ForeachClause> {
        self.expect_punct(TokenKind::LParen, "`(`")?;
        let (variable, variable_span) = self.expect_ident()?;
        self.expect_keyword(Keyword::In)?;
        let list = self.parse_expr()?;
        self.expect_punct(TokenKind::Pipe, "`|`")?;
        let mut body = Vec::new();
        while !self.at_punct(&TokenKind::RParen) {
            body.push(self.parse_clause()?);
        }
        self.expect_punct(TokenKind::RParen, "`)`")?;
        Ok(ForeachClause { variable, variable_span, list, body })
    }

    fn parse_call_body(&mut self) -> PResult<ClauseData> {
        if self.at_punct(&TokenKind::LBrace) {
            self.bump();
            let mut clauses = Vec::new();
            while !self.at_punct(&TokenKind::RBrace) {
                clauses.push(self.parse_clause()?);
                if self.eat_punct(&TokenKind::Semicolon) {
                    continue;
                }
            }
            self.expect_punct(TokenKind::RBrace, "`}`")?;
            return Ok(ClauseData::CallSubquery(CallSubqueryClause { inner: Query::new(clauses) }));
        }
        let (first, name_span) = self.expect_ident()?;
        let mut name = first;
        while self.eat_punct(&TokenKind::Dot) {
            let (part, _) = self.expect_ident()?;
            name.push('.');
            name.push_str(&part);
        }
        self.expect_punct(TokenKind::LParen, "`(`")?;
        let mut args = Vec::new();
        if !self.at_punct(&TokenKind::RParen) {
            args.push(self.parse_expr()?);
            while self.eat_punct(&TokenKind::Comma) {
                args.push(self.parse_expr()?);
            }
        }
        self.expect_punct(TokenKind::RParen, "`)`")?;
        let yield_items = if self.eat_keyword(Keyword::Yield) {
            let mut items = vec![self.parse_yield_item()?];
            while self.eat_punct(&TokenKind::Comma) {
                items.push(self.parse_yield_item()?);
            }
            Some(items)
        } else {
            None
        };
        Ok(ClauseData::Call(CallClause { name, name_span, args, yield_items, resolved_read_only: None }))
    }

    fn parse_yield_item(&mut self) -> PResult<YieldItem> {
        let (name, span) = self.expect_ident()?;
        let alias = if self.eat_keyword(Keyword::As) { Some(self.expect_ident()?.0) } else { None };
        Ok(YieldItem { name, alias, span })
    }

    // ---- expressions (precedence climbing) ----

    fn parse_expr_list(&mut self) -> PResult<Vec<Expression>> {
        let mut out = vec![self.parse_expr()?];
        while self.eat_punct(&TokenKind::Comma) {
            out.push(self.parse_expr()?);
        }
        Ok(out)
    }

    fn parse_expr(&mut self) -> PResult<Expression> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> PResult<Expression> {
        let mut lhs = self.parse_xor()?;
        loop {
            if self.eat_keyword(Keyword::Or) {
                let rhs = self.parse_xor()?;
                let span = lhs.span().merge(&rhs.span());
                lhs = Expression::BinaryOp { op: BinOp::Or, lhs: Box::new(lhs), rhs: Box::new(rhs), span };
            } else {
                return Ok(lhs);
            }
        }
    }

    fn parse_xor(&mut self) -> PResult<Expression> {
        let mut lhs = self.parse_and()?;
        loop {
            if self.eat_keyword(Keyword::Xor) {
                let rhs = self.parse_and()?;
                let span = lhs.span().merge(&rhs.span());
                lhs = Expression::BinaryOp { op: BinOp::Xor, lhs: Box::new(lhs), rhs: Box::new(rhs), span };
            } else {
                return Ok(lhs);
            }
        }
    }

    fn parse_and(&mut self) -> PResult<Expression> {
        let mut lhs = self.parse_not()?;
        loop {
            if self.eat_keyword(Keyword::And) {
                let rhs = self.parse_not()?;
                let span = lhs.span().merge(&rhs.span());
                lhs = Expression::BinaryOp { op: BinOp::And, lhs: Box::new(lhs), rhs: Box::new(rhs), span };
            } else {
                return Ok(lhs);
            }
        }
    }

    fn parse_not(&mut self) -> PResult<Expression> {
        if self.at_keyword(Keyword::Not) {
            let start = self.bump().span;
            let operand = self.parse_not()?;
            let span = start.merge(&operand.span());
            Ok(Expression::UnaryOp { op: UnaryOpKind::Not, operand: Box::new(operand), span })
        } else {
            self.parse_comparison()
        }
    }

    fn parse_comparison(&mut self) -> PResult<Expression> {
        let lhs = self.parse_additive()?;
        let op = match self.peek_kind() {
            TokenKind::Eq => BinOp::Eq,
            TokenKind::Neq => BinOp::Neq,
            TokenKind::Lt => BinOp::Lt,
            TokenKind::Lte => BinOp::Lte,
            TokenKind::Gt => BinOp::Gt,
            TokenKind::Gte => BinOp::Gte,
            TokenKind::Keyword(Keyword::In) => BinOp::In,
            _ => {
                if self.at_keyword(Keyword::Is) {
                    self.bump();
                    let negate = self.eat_keyword(Keyword::Not);
                    self.expect_keyword(Keyword::Null)?;
                    let op = if negate { UnaryOpKind::IsNotNull } else { UnaryOpKind::IsNull };
                    let span = lhs.span();
                    return Ok(Expression::UnaryOp { op, operand: Box::new(lhs), span });
                }
                if let TokenKind::Ident(w) = self.peek_kind().clone() {
                    let op = match w.to_ascii_uppercase().as_str() {
                        "STARTS" => Some(BinOp::StartsWith),
                        "ENDS" => Some(BinOp::EndsWith),
                        "CONTAINS" => Some(BinOp::Contains),
                        _ => None,
                    };
                    if let Some(op) = op {
                        self.bump();
                        if matches!(op, BinOp::StartsWith | BinOp::EndsWith) {
                            let (w2, _) = self.expect_ident()?;
                            if !w2.eq_ignore_ascii_case("with") {
                                return Err((Error::ParserError("expected WITH".into()), Some(self.span())));
                            }
                        }
                        let rhs = self.parse_additive()?;
                        let span = lhs.span().merge(&rhs.span());
                        return Ok(Expression::BinaryOp { op, lhs: Box::new(lhs), rhs: Box::new(rhs), span });
                    }
                }
                return Ok(lhs);
            }
        };
        self.bump();
        let rhs = self.parse_additive()?;
        let span = lhs.span().merge(&rhs.span());
        Ok(Expression::BinaryOp { op, lhs: Box::new(lhs), rhs: Box::new(rhs), span })
    }

    fn parse_additive(&mut self) -> PResult<Expression> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_multiplicative()?;
            let span = lhs.span().merge(&rhs.span());
            lhs = Expression::BinaryOp { op, lhs: Box::new(lhs), rhs: Box::new(rhs), span };
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> PResult<Expression> {
        let mut lhs = self.parse_power()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_power()?;
            let span = lhs.span().merge(&rhs.span());
            lhs = Expression::BinaryOp { op, lhs: Box::new(lhs), rhs: Box::new(rhs), span };
        }
        Ok(lhs)
    }

    fn parse_power(&mut self) -> PResult<Expression> {
        let lhs = self.parse_unary()?;
        if self.eat_punct(&TokenKind::Caret) {
            let rhs = self.parse_power()?;
            let span = lhs.span().merge(&rhs.span());
            Ok(Expression::BinaryOp { op: BinOp::Pow, lhs: Box::new(lhs), rhs: Box::new(rhs), span })
        } else {
            Ok(lhs)
        }
    }

    fn parse_unary(&mut self) -> PResult<Expression> {
        if self.eat_punct(&TokenKind::Minus) {
            let operand = self.parse_unary()?;
            let span = operand.span();
            Ok(Expression::UnaryOp { op: UnaryOpKind::Neg, operand: Box::new(operand), span })
        } else {
            self.parse_postfix()
        }
    }

    fn parse_postfix(&mut self) -> PResult<Expression> {
        let mut expr = self.parse_atom()?;
        loop {
            if self.eat_punct(&TokenKind::Dot) {
                let (key, key_span) = self.expect_ident()?;
                let span = expr.span().merge(&key_span);
                expr = Expression::Property { base: Box::new(expr), key, span };
            } else if self.eat_punct(&TokenKind::LBracket) {
                if self.eat_punct(&TokenKind::DotDot) {
                    let to = if !self.at_punct(&TokenKind::RBracket) { Some(Box::new(self.parse_expr()?)) } else { None };
                    let end = self.expect_punct(TokenKind::RBracket, "`]`")?;
                    let span = expr.span().merge(&end);
                    expr = Expression::SliceSubscript { base: Box::new(expr), from: None, to, span };
                    continue;
                }
                let first = self.parse_expr()?;
                if self.eat_punct(&TokenKind::DotDot) {
                    let to = if !self.at_punct(&TokenKind::RBracket) { Some(Box::new(self.parse_expr()?)) } else { None };
                    let end = self.expect_punct(TokenKind::RBracket, "`]`")?;
                    let span = expr.span().merge(&end);
                    expr = Expression::SliceSubscript { base: Box::new(expr), from: Some(Box::new(first)), to, span };
                } else {
                    let end = self.expect_punct(TokenKind::RBracket, "`]`")?;
                    let span = expr.span().merge(&end);
                    expr = Expression::Subscript { base: Box::new(expr), index: Box::new(first), span };
                }
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_atom(&mut self) -> PResult<Expression> {
        let start = self.span();
        match self.peek_kind().clone() {
            TokenKind::IntLiteral(n) => {
                self.bump();
                Ok(Expression::IntLiteral(n, start))
            }
            TokenKind::FloatLiteral(n) => {
                self.bump();
                Ok(Expression::FloatLiteral(n, start))
            }
            TokenKind::StringLiteral(s) => {
                self.bump();
                Ok(Expression::StringLiteral(s, start))
            }
            TokenKind::Param(name) => {
                self.bump();
                Ok(Expression::Parameter { name, span: start })
            }
            TokenKind::Keyword(Keyword::True) => {
                self.bump();
                Ok(Expression::BoolLiteral(true, start))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.bump();
                Ok(Expression::BoolLiteral(false, start))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.bump();
                Ok(Expression::Null(start))
            }
            TokenKind::Keyword(Keyword::Case) => self.parse_case(),
            TokenKind::Keyword(Keyword::ShortestPath) | TokenKind::Keyword(Keyword::AllShortestPaths) => {
                let single = self.at_keyword(Keyword::ShortestPath);
                self.bump();
                self.expect_punct(TokenKind::LParen, "`(`")?;
                let (nodes, rels) = self.parse_pattern_chain()?;
                let end = self.expect_punct(TokenKind::RParen, "`)`")?;
                let span = start.merge(&end);
                let pattern = PatternPath { variable: None, kind: PathKind::Normal, nodes, rels, span };
                Ok(Expression::ShortestPathExpr { single, pattern: Box::new(pattern), span })
            }
            TokenKind::Keyword(Keyword::Filter) | TokenKind::Keyword(Keyword::Extract) => {
                self.bump();
                while !self.at_punct(&TokenKind::RParen) && !self.at_eof() {
                    self.bump();
                }
                self.eat_punct(&TokenKind::RParen);
                Ok(Expression::Unsupported { description: "FILTER/EXTRACT".into(), span: start })
            }
            TokenKind::LParen => {
                self.bump();
                let inner = self.parse_expr()?;
                let end = self.expect_punct(TokenKind::RParen, "`)`")?;
                let _ = end;
                Ok(inner)
            }
            TokenKind::LBracket => self.parse_list_literal_or_comprehension(),
            TokenKind::LBrace => self.parse_map_literal(),
            TokenKind::Ident(name) => self.parse_ident_led(name, start),
            _ => Err((Error::ParserError("expected an expression".into()), Some(start))),
        }
    }

    fn parse_ident_led(&mut self, name: String, start: Span) -> PResult<Expression> {
        if name.eq_ignore_ascii_case("reduce") && self.tokens.get(self.pos + 1).map(|t| &t.kind) == Some(&TokenKind::LParen) {
            return self.parse_reduce(start);
        }
        self.bump();
        if self.at_punct(&TokenKind::LParen) {
            self.bump();
            let mut full_name = name;
            while self.eat_punct(&TokenKind::Dot) {
                let (part, _) = self.expect_ident()?;
                full_name.push('.');
                full_name.push_str(&part);
            }
            let distinct = self.eat_keyword(Keyword::Distinct);
            let mut star = false;
            let mut args = Vec::new();
            if self.eat_punct(&TokenKind::Star) {
                star = true;
            } else if !self.at_punct(&TokenKind::RParen) {
                args.push(self.parse_expr()?);
                while self.eat_punct(&TokenKind::Comma) {
                    args.push(self.parse_expr()?);
                }
            }
            let end = self.expect_punct(TokenKind::RParen, "`)`")?;
            let span = start.merge(&end);
            return Ok(Expression::FunctionCall { id: self.ids.next(), name: full_name, distinct, args, star, span });
        }
        Ok(Expression::Identifier { id: self.ids.next(), name, span: start })
    }

    fn parse_reduce(&mut self, start: Span) -> PResult<Expression> {
        self.bump();
        self.expect_punct(TokenKind::LParen, "`(`")?;
        let (accumulator, _) = self.expect_ident()?;
        self.expect_punct(TokenKind::Eq, "`=`")?;
        let init = self.parse_expr()?;
        self.expect_punct(TokenKind::Comma, "`,`")?;
        let (variable, _) = self.expect_ident()?;
        self.expect_keyword(Keyword::In)?;
        let list = self.parse_expr()?;
        self.expect_punct(TokenKind::Pipe, "`|`")?;
        let eval = self.parse_expr()?;
        let end = self.expect_punct(TokenKind::RParen, "`)`")?;
        let span = start.merge(&end);
        Ok(Expression::Reduce {
            id: self.ids.next(),
            accumulator,
            init: Box::new(init),
            variable,
            list: Box::new(list),
            eval: Box::new(eval),
            span,
        })
    }

    fn parse_case(&mut self) -> PResult<Expression> {
        let start = self.bump().span;
        let test = if !self.at_keyword(Keyword::When) { Some(Box::new(self.parse_expr()?)) } else { None };
        let mut whens = Vec::new();
        while self.eat_keyword(Keyword::When) {
            let cond = self.parse_expr()?;
            self.expect_keyword(Keyword::Then)?;
            let result = self.parse_expr()?;
            whens.push((cond, result));
        }
        let default = if self.eat_keyword(Keyword::Else) { Some(Box::new(self.parse_expr()?)) } else { None };
        let end = self.expect_keyword(Keyword::End)?;
        let span = start.merge(&end);
        Ok(Expression::CaseExpr { test, whens, default, span })
    }

    /// `[...]`: either a plain list literal or a list/pattern comprehension
    /// (`[x IN list WHERE pred | eval]`).
    fn parse_list_literal_or_comprehension(&mut self) -> PResult<Expression> {
        let start = self.bump().span;
        if let TokenKind::Ident(name) = self.peek_kind().clone() {
            if self.tokens.get(self.pos + 1).map(|t| &t.kind) == Some(&TokenKind::Keyword(Keyword::In)) {
                self.bump();
                self.bump();
                let list = self.parse_expr()?;
                let predicate = if self.eat_keyword(Keyword::Where) { Some(Box::new(self.parse_expr()?)) } else { None };
                let eval = if self.eat_punct(&TokenKind::Pipe) { Some(Box::new(self.parse_expr()?)) } else { None };
                let end = self.expect_punct(TokenKind::RBracket, "`]`")?;
                let span = start.merge(&end);
                return Ok(Expression::ListComprehension {
                    id: self.ids.next(),
                    variable: name,
                    list: Box::new(list),
                    predicate,
                    eval,
                    span,
                });
            }
        }
        let mut items = Vec::new();
        if !self.at_punct(&TokenKind::RBracket) {
            items.push(self.parse_expr()?);
            while self.eat_punct(&TokenKind::Comma) {
                items.push(self.parse_expr()?);
            }
        }
        let end = self.expect_punct(TokenKind::RBracket, "`]`")?;
        Ok(Expression::ListLiteral(items, start.merge(&end)))
    }
}
