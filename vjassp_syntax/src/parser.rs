use crate::ast::*;
use crate::errors::{not_a_statement, unexpected_parsing, unexpected_token};
use crate::fstring::{split_fstring, FStringError};
use crate::scanner::scan;
use crate::token::{File, Pos, Token, TokenKind};
use crate::ErrorReporter;
use std::collections::VecDeque;

/// Parses one unit. Scanning happens here as well; if the scanner reported
/// anything the parse is skipped, and the first syntax error aborts the
/// rest of the unit. There is no recovery: the user fixes and re-runs.
pub fn parse(errors: &impl ErrorReporter, file: &File) -> UnitNode {
    let tokens = scan(errors, file);
    if errors.has_errors() {
        return UnitNode {
            items: Vec::default(),
            comments: Vec::default(),
        };
    }

    let parser = UnitParser::new(errors, tokens);
    parser.parse_unit()
}

struct UnitParser<'err, E> {
    errors: &'err E,
    tokens: VecDeque<Token>,
    comments: Vec<Token>,
    last_pos: Pos,
}

impl<'err, E: ErrorReporter> UnitParser<'err, E> {
    fn new(errors: &'err E, tokens: Vec<Token>) -> Self {
        let mut comments = Vec::default();
        let mut filtered_tokens = VecDeque::new();
        for tok in tokens {
            if tok.kind == TokenKind::Comment {
                comments.push(tok);
            } else {
                filtered_tokens.push_back(tok);
            }
        }

        Self {
            errors,
            tokens: filtered_tokens,
            comments,
            last_pos: Pos::from(0),
        }
    }

    fn parse_unit(mut self) -> UnitNode {
        let mut items = Vec::default();

        loop {
            let item = match self.kind() {
                TokenKind::Eof => break,
                TokenKind::Import | TokenKind::When => {
                    self.parse_import().map(ItemNode::Import)
                }
                TokenKind::Library
                | TokenKind::Scope
                | TokenKind::Content
                | TokenKind::System => self.parse_container().map(ItemNode::Container),
                _ => {
                    unexpected_token(self.errors, &self.token());
                    None
                }
            };

            let Some(item) = item else {
                break;
            };
            items.push(item);
        }

        UnitNode {
            items,
            comments: self.comments,
        }
    }

    fn parse_import(&mut self) -> Option<ImportNode> {
        let when = if self.take_if(TokenKind::When).is_some() {
            Some(self.take(TokenKind::Ident)?)
        } else {
            None
        };
        let import_tok = self.take(TokenKind::Import)?;
        let path = self.take(TokenKind::StringLit)?;
        self.take(TokenKind::Newline)?;
        Some(ImportNode {
            pos: when.as_ref().map(|tok| tok.pos).unwrap_or(import_tok.pos),
            when,
            path,
        })
    }

    fn parse_container(&mut self) -> Option<ContainerNode> {
        let head = self.tokens.pop_front()?;
        let kind = match head.kind {
            TokenKind::Library => ContainerKind::Library,
            TokenKind::Scope => ContainerKind::Scope,
            TokenKind::Content => ContainerKind::Content,
            TokenKind::System => ContainerKind::System,
            _ => unreachable!(),
        };

        let name = if kind == ContainerKind::Content {
            self.take_if(TokenKind::Ident)
        } else {
            Some(self.take(TokenKind::Ident)?)
        };

        self.open_block()?;
        let members = self.parse_members(None)?;
        self.take(TokenKind::Dedent)?;

        Some(ContainerNode {
            pos: head.pos,
            kind,
            name,
            members,
        })
    }

    fn parse_members(&mut self, modifier: Option<Modifier>) -> Option<Vec<MemberNode>> {
        let mut members = Vec::default();

        loop {
            match self.kind() {
                TokenKind::Dedent | TokenKind::Eof => break,
                TokenKind::Global | TokenKind::Api => {
                    let tok = self.tokens.pop_front().unwrap();
                    if modifier.is_some() {
                        self.errors
                            .report(tok.pos, String::from("Modifier blocks cannot be nested"));
                        return None;
                    }
                    let inner = match tok.kind {
                        TokenKind::Global => Modifier::Global,
                        _ => Modifier::Api,
                    };
                    self.open_block()?;
                    members.extend(self.parse_members(Some(inner))?);
                    self.take(TokenKind::Dedent)?;
                }
                TokenKind::Init => {
                    let tok = self.tokens.pop_front().unwrap();
                    let body = self.parse_block()?;
                    members.push(MemberNode::Init(InitNode { pos: tok.pos, body }));
                }
                TokenKind::Type | TokenKind::Alias => {
                    members.push(MemberNode::TypeDecl(self.parse_type_decl(modifier)?));
                }
                TokenKind::Native => {
                    members.push(MemberNode::Native(self.parse_native(modifier)?));
                }
                TokenKind::Uses => {
                    members.push(MemberNode::Uses(self.parse_uses()?));
                }
                TokenKind::Scope | TokenKind::Content => {
                    members.push(MemberNode::Nested(self.parse_container()?));
                }
                TokenKind::Ident => {
                    let member = match self.kind_at(1) {
                        TokenKind::OpenBrac => MemberNode::Function(self.parse_function(modifier)?),
                        TokenKind::Ident | TokenKind::Mul => {
                            MemberNode::Var(self.parse_var(modifier)?)
                        }
                        _ => {
                            unexpected_parsing(
                                self.errors,
                                self.token().pos,
                                "a declaration",
                                self.kind_at(1),
                            );
                            return None;
                        }
                    };
                    members.push(member);
                }
                _ => {
                    unexpected_token(self.errors, &self.token());
                    return None;
                }
            }
        }

        Some(members)
    }

    fn parse_type_decl(&mut self, modifier: Option<Modifier>) -> Option<TypeDeclNode> {
        let head = self.tokens.pop_front()?;
        let alias = head.kind == TokenKind::Alias;
        let name = self.take(TokenKind::Ident)?;
        self.take(TokenKind::Extends)?;
        let base = self.take(TokenKind::Ident)?;
        self.take(TokenKind::Newline)?;
        Some(TypeDeclNode {
            pos: head.pos,
            modifier,
            alias,
            name,
            base,
        })
    }

    fn parse_native(&mut self, modifier: Option<Modifier>) -> Option<NativeNode> {
        let head = self.tokens.pop_front()?;
        let name = self.take(TokenKind::Ident)?;
        let (_, params, _) = self.parse_sequence(
            TokenKind::OpenBrac,
            TokenKind::Comma,
            TokenKind::CloseBrac,
            Self::parse_parameter,
        )?;
        let return_type = if self.take_if(TokenKind::Arrow).is_some() {
            Some(self.take(TokenKind::Ident)?)
        } else {
            None
        };
        self.take(TokenKind::Newline)?;
        Some(NativeNode {
            pos: head.pos,
            modifier,
            name,
            params,
            return_type,
        })
    }

    fn parse_uses(&mut self) -> Option<UsesNode> {
        let head = self.tokens.pop_front()?;
        let optional = self.take_if(TokenKind::Optional).is_some();
        let name = self.take(TokenKind::Ident)?;
        self.take(TokenKind::Newline)?;
        Some(UsesNode {
            pos: head.pos,
            optional,
            name,
        })
    }

    fn parse_function(&mut self, modifier: Option<Modifier>) -> Option<FunctionNode> {
        let name = self.take(TokenKind::Ident)?;
        let (_, params, _) = self.parse_sequence(
            TokenKind::OpenBrac,
            TokenKind::Comma,
            TokenKind::CloseBrac,
            Self::parse_parameter,
        )?;
        let return_type = if self.take_if(TokenKind::Arrow).is_some() {
            Some(self.take(TokenKind::Ident)?)
        } else {
            None
        };
        let body = self.parse_block()?;
        Some(FunctionNode {
            pos: name.pos,
            modifier,
            name,
            params,
            return_type,
            body,
        })
    }

    fn parse_parameter(&mut self) -> Option<ParameterNode> {
        let ty = self.take(TokenKind::Ident)?;
        let name = self.take(TokenKind::Ident)?;
        Some(ParameterNode {
            pos: ty.pos,
            ty,
            name,
        })
    }

    fn parse_var(&mut self, modifier: Option<Modifier>) -> Option<VarNode> {
        let ty = self.take(TokenKind::Ident)?;
        let mut array = self.take_if(TokenKind::Mul).is_some();
        let name = self.take(TokenKind::Ident)?;

        let init = if self.take_if(TokenKind::Equal).is_some() {
            if self.kind() == TokenKind::OpenSquare && self.kind_at(1) == TokenKind::CloseSquare {
                self.tokens.pop_front();
                self.tokens.pop_front();
                array = true;
                VarInit::Array
            } else if self.kind() == TokenKind::OpenCurly && self.kind_at(1) == TokenKind::CloseCurly
            {
                self.tokens.pop_front();
                self.tokens.pop_front();
                VarInit::Hashtable
            } else {
                VarInit::Mutable(self.parse_expr()?)
            }
        } else if self.take_if(TokenKind::Tilde).is_some() {
            VarInit::Constant(self.parse_expr()?)
        } else {
            VarInit::None
        };

        if array && matches!(init, VarInit::Mutable(..) | VarInit::Constant(..)) {
            crate::errors::array_with_initializer(self.errors, name.pos);
            return None;
        }

        self.take(TokenKind::Newline)?;
        Some(VarNode {
            pos: ty.pos,
            modifier,
            ty,
            array,
            name,
            init,
        })
    }

    fn parse_statements(&mut self) -> Option<Vec<StatementNode>> {
        let mut statements = Vec::default();

        loop {
            match self.kind() {
                TokenKind::Dedent | TokenKind::Eof => break,
                _ => statements.push(self.parse_stmt()?),
            }
        }

        Some(statements)
    }

    fn parse_stmt(&mut self) -> Option<StatementNode> {
        Some(match self.kind() {
            TokenKind::If => StatementNode::If(self.parse_if_stmt()?),
            TokenKind::Until => {
                let tok = self.tokens.pop_front().unwrap();
                let condition = self.parse_expr()?;
                let body = self.parse_block()?;
                StatementNode::Until(CondLoopNode {
                    pos: tok.pos,
                    condition,
                    body,
                })
            }
            TokenKind::While => {
                let tok = self.tokens.pop_front().unwrap();
                let condition = self.parse_expr()?;
                let body = self.parse_block()?;
                StatementNode::While(CondLoopNode {
                    pos: tok.pos,
                    condition,
                    body,
                })
            }
            TokenKind::Loop => {
                let tok = self.tokens.pop_front().unwrap();
                let body = self.parse_block()?;
                StatementNode::Loop(LoopNode { pos: tok.pos, body })
            }
            TokenKind::Break => {
                let tok = self.tokens.pop_front().unwrap();
                self.take(TokenKind::Newline)?;
                StatementNode::Break(tok)
            }
            TokenKind::Return => StatementNode::Return(self.parse_return_stmt()?),
            TokenKind::Ident => match self.kind_at(1) {
                TokenKind::Ident | TokenKind::Mul => StatementNode::Local(self.parse_local_stmt()?),
                _ => self.parse_expr_stmt()?,
            },
            _ => {
                unexpected_token(self.errors, &self.token());
                return None;
            }
        })
    }

    fn parse_if_stmt(&mut self) -> Option<IfNode> {
        let tok = self.tokens.pop_front()?;
        let condition = self.parse_expr()?;
        let body = self.parse_block()?;

        let else_node = match self.kind() {
            TokenKind::Elseif => ElseNode::ElseIf(Box::new(self.parse_if_stmt()?)),
            TokenKind::Else => {
                self.tokens.pop_front();
                ElseNode::Else(self.parse_block()?)
            }
            _ => ElseNode::None,
        };

        Some(IfNode {
            pos: tok.pos,
            condition,
            body,
            else_node,
        })
    }

    fn parse_return_stmt(&mut self) -> Option<ReturnNode> {
        let tok = self.tokens.pop_front()?;
        if self.take_if(TokenKind::Newline).is_some() {
            return Some(ReturnNode {
                pos: tok.pos,
                value: None,
            });
        }

        let value = self.parse_expr()?;
        self.take(TokenKind::Newline)?;
        Some(ReturnNode {
            pos: tok.pos,
            value: Some(value),
        })
    }

    /// `TYPE [*]NAME [= EXPR]`, anywhere in a block. Hoisting to the
    /// function head happens during lowering.
    fn parse_local_stmt(&mut self) -> Option<LocalNode> {
        let ty = self.take(TokenKind::Ident)?;
        let array = self.take_if(TokenKind::Mul).is_some();
        let name = self.take(TokenKind::Ident)?;

        let value = if self.take_if(TokenKind::Equal).is_some() {
            if array {
                crate::errors::array_with_initializer(self.errors, name.pos);
                return None;
            }
            Some(self.parse_expr()?)
        } else {
            None
        };

        self.take(TokenKind::Newline)?;
        Some(LocalNode {
            pos: ty.pos,
            ty,
            array,
            name,
            value,
        })
    }

    fn parse_expr_stmt(&mut self) -> Option<StatementNode> {
        let pos = self.token().pos;
        let target = self.parse_expr()?;

        let assign_op = match self.kind() {
            TokenKind::Equal => Some(AssignOp::Set),
            TokenKind::AddAssign => Some(AssignOp::Add),
            TokenKind::SubAssign => Some(AssignOp::Sub),
            TokenKind::MulAssign => Some(AssignOp::Mul),
            TokenKind::DivAssign => Some(AssignOp::Div),
            _ => None,
        };

        if let Some(op) = assign_op {
            self.tokens.pop_front();
            let value = self.parse_expr()?;
            self.take(TokenKind::Newline)?;
            return Some(StatementNode::Assign(AssignNode {
                pos,
                target,
                op,
                value,
            }));
        }

        if self.kind() == TokenKind::Inc || self.kind() == TokenKind::Dec {
            let op_tok = self.tokens.pop_front().unwrap();
            self.take(TokenKind::Newline)?;
            return Some(StatementNode::IncDec(IncDecNode {
                pos,
                target,
                increment: op_tok.kind == TokenKind::Inc,
            }));
        }

        let ExprNode::Call(expr) = target else {
            not_a_statement(self.errors, pos);
            return None;
        };
        self.take(TokenKind::Newline)?;
        Some(StatementNode::Call(CallStatementNode { pos, expr }))
    }

    /// `: NEWLINE INDENT ... DEDENT` — exactly one indent step per block.
    fn parse_block(&mut self) -> Option<BlockNode> {
        self.open_block()?;
        let pos = self.token().pos;
        let statements = self.parse_statements()?;
        self.take(TokenKind::Dedent)?;
        Some(BlockNode { pos, statements })
    }

    fn open_block(&mut self) -> Option<()> {
        self.take(TokenKind::Colon)?;
        self.take(TokenKind::Newline)?;
        self.take(TokenKind::Indent)?;
        Some(())
    }

    fn parse_expr(&mut self) -> Option<ExprNode> {
        self.parse_binary_expr(TokenKind::Or)
    }

    fn parse_binary_expr(&mut self, op: TokenKind) -> Option<ExprNode> {
        let next_op = match op {
            TokenKind::Or => TokenKind::And,
            TokenKind::And => TokenKind::Eq,
            TokenKind::Eq => TokenKind::Lt,
            TokenKind::Lt => TokenKind::Add,
            TokenKind::Add => TokenKind::Mul,
            _ => return self.parse_unary_expr(),
        };

        let mut result = self.parse_binary_expr(next_op)?;
        while self.kind_in_level(op) {
            let op_tok = self.tokens.pop_front().unwrap();
            let b = self.parse_binary_expr(next_op)?;
            result = ExprNode::Binary(BinaryNode {
                a: Box::new(result),
                op: op_tok,
                b: Box::new(b),
            });
        }

        Some(result)
    }

    fn kind_in_level(&mut self, level: TokenKind) -> bool {
        let kind = self.kind();
        match level {
            TokenKind::Or => kind == TokenKind::Or,
            TokenKind::And => kind == TokenKind::And,
            TokenKind::Eq => matches!(kind, TokenKind::Eq | TokenKind::NEq),
            TokenKind::Lt => matches!(
                kind,
                TokenKind::Lt | TokenKind::LEq | TokenKind::Gt | TokenKind::GEq
            ),
            TokenKind::Add => matches!(kind, TokenKind::Add | TokenKind::Sub),
            TokenKind::Mul => matches!(kind, TokenKind::Mul | TokenKind::Div | TokenKind::Mod),
            _ => false,
        }
    }

    fn parse_unary_expr(&mut self) -> Option<ExprNode> {
        match self.kind() {
            TokenKind::Not | TokenKind::Bang | TokenKind::Sub | TokenKind::Add => {
                let op = self.tokens.pop_front().unwrap();
                let value = self.parse_unary_expr()?;
                Some(ExprNode::Unary(UnaryNode {
                    op,
                    value: Box::new(value),
                }))
            }
            _ => self.parse_postfix_expr(),
        }
    }

    fn parse_postfix_expr(&mut self) -> Option<ExprNode> {
        let mut result = self.parse_primary_expr()?;

        loop {
            match self.kind() {
                TokenKind::Dot => {
                    self.tokens.pop_front();
                    let selection = self.take(TokenKind::Ident)?;
                    result = ExprNode::Selector(SelectorNode {
                        target: Box::new(result),
                        selection,
                    });
                }
                TokenKind::OpenSquare => {
                    self.tokens.pop_front();
                    let index = self.parse_expr()?;
                    self.take(TokenKind::CloseSquare)?;
                    result = ExprNode::Index(IndexNode {
                        target: Box::new(result),
                        index: Box::new(index),
                    });
                }
                TokenKind::OpenBrac => {
                    let pos = result.get_pos();
                    let (_, arguments, _) = self.parse_sequence(
                        TokenKind::OpenBrac,
                        TokenKind::Comma,
                        TokenKind::CloseBrac,
                        Self::parse_expr,
                    )?;
                    result = ExprNode::Call(CallNode {
                        pos,
                        target: Box::new(result),
                        arguments,
                    });
                }
                _ => break,
            }
        }

        Some(result)
    }

    fn parse_primary_expr(&mut self) -> Option<ExprNode> {
        match self.kind() {
            TokenKind::Ident => Some(ExprNode::Ident(self.tokens.pop_front().unwrap())),
            TokenKind::IntegerLit => Some(ExprNode::IntegerLit(self.tokens.pop_front().unwrap())),
            TokenKind::RealLit => Some(ExprNode::RealLit(self.tokens.pop_front().unwrap())),
            TokenKind::StringLit => Some(ExprNode::StringLit(self.tokens.pop_front().unwrap())),
            TokenKind::FStringLit => {
                let tok = self.tokens.pop_front().unwrap();
                self.parse_fstring(tok)
            }
            TokenKind::True | TokenKind::False => {
                Some(ExprNode::Bool(self.tokens.pop_front().unwrap()))
            }
            TokenKind::Null => Some(ExprNode::Null(self.tokens.pop_front().unwrap())),
            TokenKind::Function => {
                let tok = self.tokens.pop_front().unwrap();
                let name = self.take(TokenKind::Ident)?;
                Some(ExprNode::FunctionRef(FunctionRefNode { pos: tok.pos, name }))
            }
            TokenKind::OpenBrac => {
                self.tokens.pop_front();
                let expr = self.parse_expr()?;
                self.take(TokenKind::CloseBrac)?;
                Some(expr)
            }
            _ => {
                unexpected_parsing(self.errors, self.token().pos, "an expression", self.kind());
                None
            }
        }
    }

    fn parse_fstring(&mut self, tok: Token) -> Option<ExprNode> {
        match split_fstring(&tok.value) {
            Ok(segments) => Some(ExprNode::FString(FStringNode {
                pos: tok.pos,
                segments,
            })),
            Err(errs) => {
                for err in errs {
                    let (offset, message) = match err {
                        FStringError::UnclosedBrace { offset } => {
                            (offset, "Unclosed '{' in format string")
                        }
                        FStringError::StrayBrace { offset } => {
                            (offset, "Stray '}' in format string, use '}}'")
                        }
                    };
                    // offset is relative to the body, which sits after `f"`
                    self.errors
                        .report(tok.pos.with_offset(offset + 2), String::from(message));
                }
                None
            }
        }
    }

    fn parse_sequence<T, F>(
        &mut self,
        begin_tok: TokenKind,
        delim_tok: TokenKind,
        end_tok: TokenKind,
        parse_fn: F,
    ) -> Option<(Token, Vec<T>, Token)>
    where
        F: Fn(&mut Self) -> Option<T>,
    {
        let opening = self.take(begin_tok)?;

        let mut items = Vec::<T>::new();
        while self.kind() != end_tok && self.kind() != TokenKind::Eof {
            items.push(parse_fn(self)?);
            if self.take_if(delim_tok).is_none() {
                break;
            }
        }

        let closing = self.take(end_tok)?;

        Some((opening, items, closing))
    }

    fn token(&mut self) -> Token {
        if let Some(tok) = self.tokens.front() {
            tok.clone()
        } else {
            Token {
                kind: TokenKind::Eof,
                value: String::default(),
                pos: self.last_pos,
            }
        }
    }

    fn kind(&mut self) -> TokenKind {
        self.tokens
            .front()
            .map(|tok| tok.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn kind_at(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(offset)
            .map(|tok| tok.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn take(&mut self, kind: TokenKind) -> Option<Token> {
        let token = self.tokens.pop_front()?;
        self.last_pos = token.pos;
        if token.kind == kind {
            Some(token)
        } else {
            unexpected_parsing(self.errors, token.pos, kind, token.kind);
            None
        }
    }

    fn take_if(&mut self, kind: TokenKind) -> Option<Token> {
        let matches = self
            .tokens
            .front()
            .map(|tok| tok.kind == kind)
            .unwrap_or(false);
        if matches {
            let tok = self.tokens.pop_front().unwrap();
            self.last_pos = tok.pos;
            Some(tok)
        } else {
            None
        }
    }
}
