/// Splits the body of an `f"..."` literal into literal text runs and the
/// raw expression snippets between braces. `{{` and `}}` escape to literal
/// braces. The snippets are re-emitted verbatim inside parentheses, so no
/// further parsing happens here.
pub fn split_fstring(body: &str) -> Result<Vec<FStringSegment>, Vec<FStringError>> {
    let mut builder = FStringBuilder::default();
    for c in body.chars() {
        builder.add(c);
    }
    builder.build()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FStringSegment {
    Text(String),
    Expr(String),
}

#[derive(Debug, PartialEq, Eq)]
pub enum FStringError {
    UnclosedBrace { offset: usize },
    StrayBrace { offset: usize },
}

#[derive(Default)]
enum State {
    #[default]
    Text,
    OpenBrace,
    CloseBrace,
    Expr {
        depth: usize,
    },
}

#[derive(Default)]
struct FStringBuilder {
    state: State,
    offset: usize,
    text: String,
    expr: String,
    segments: Vec<FStringSegment>,
    errors: Vec<FStringError>,
}

impl FStringBuilder {
    fn add(&mut self, c: char) {
        match self.state {
            State::Text => match c {
                '{' => self.state = State::OpenBrace,
                '}' => self.state = State::CloseBrace,
                _ => self.text.push(c),
            },
            State::OpenBrace => {
                if c == '{' {
                    self.text.push('{');
                    self.state = State::Text;
                } else {
                    self.flush_text();
                    self.state = State::Expr { depth: 1 };
                    if c == '}' {
                        self.errors.push(FStringError::UnclosedBrace {
                            offset: self.offset - 1,
                        });
                        self.state = State::Text;
                    } else {
                        self.expr.push(c);
                    }
                }
            }
            State::CloseBrace => {
                if c == '}' {
                    self.text.push('}');
                } else {
                    self.errors.push(FStringError::StrayBrace {
                        offset: self.offset - 1,
                    });
                    self.text.push(c);
                }
                self.state = State::Text;
            }
            State::Expr { depth } => match c {
                '{' => {
                    self.expr.push(c);
                    self.state = State::Expr { depth: depth + 1 };
                }
                '}' => {
                    if depth == 1 {
                        self.flush_expr();
                        self.state = State::Text;
                    } else {
                        self.expr.push(c);
                        self.state = State::Expr { depth: depth - 1 };
                    }
                }
                _ => self.expr.push(c),
            },
        }
        self.offset += 1;
    }

    fn flush_text(&mut self) {
        if !self.text.is_empty() {
            self.segments.push(FStringSegment::Text(std::mem::take(&mut self.text)));
        }
    }

    fn flush_expr(&mut self) {
        let expr = std::mem::take(&mut self.expr);
        self.segments.push(FStringSegment::Expr(expr.trim().to_string()));
    }

    fn build(mut self) -> Result<Vec<FStringSegment>, Vec<FStringError>> {
        match self.state {
            State::Text => {}
            State::OpenBrace | State::Expr { .. } => {
                self.errors.push(FStringError::UnclosedBrace {
                    offset: self.offset,
                });
            }
            State::CloseBrace => {
                self.errors.push(FStringError::StrayBrace {
                    offset: self.offset,
                });
            }
        }

        if !self.errors.is_empty() {
            return Err(self.errors);
        }

        self.flush_text();
        Ok(self.segments)
    }
}
