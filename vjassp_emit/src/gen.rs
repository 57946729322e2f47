use crate::errors::EmitError;
use vjassp_lower::{
    Container, ContainerKind, ElseBranch, Function, GlobalVar, IfStatement, Member, Param,
    Program, Requirement, Statement, Visibility, SYSTEM_LIBRARY_NAME,
};
use vjassp_syntax::ast::{AssignOp, CallNode, ExprNode};
use vjassp_syntax::{ErrorReporter, FStringSegment, TokenKind};

const INDENT: &str = "    ";

/// Renders the lowered program as target dialect text. Rendering never
/// fails on a well-formed tree; malformed nodes surface as internal
/// diagnostics and degrade the output instead of panicking.
pub fn generate(errors: &impl ErrorReporter, program: &Program) -> String {
    let mut gen = Generator {
        errors,
        out: String::default(),
        depth: 0,
    };

    for container in &program.containers {
        gen.container(container);
    }

    if program.has_systems {
        gen.system_library(&program.libraries);
    }

    gen.out
}

struct Generator<'a, E> {
    errors: &'a E,
    out: String,
    depth: usize,
}

impl<'a, E: ErrorReporter> Generator<'a, E> {
    fn line(&mut self, text: String) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(&text);
        self.out.push('\n');
    }

    fn container(&mut self, container: &Container) {
        let keyword = match container.kind {
            ContainerKind::Library => "library",
            ContainerKind::Scope => "scope",
        };

        let mut header = format!("{keyword} {}", container.name);
        if let Some(initializer) = &container.initializer {
            header.push_str(&format!(" initializer {}", initializer.name));
        }
        if !container.requires.is_empty() {
            if container.kind == ContainerKind::Scope {
                self.errors
                    .malformed_scope_requirements(container.pos, &container.name);
            } else {
                header.push_str(&format!(" requires {}", requires_list(&container.requires)));
            }
        }
        self.line(header);

        self.depth += 1;
        for member in &container.members {
            match member {
                Member::Globals(globals) => self.globals(globals),
                Member::Function(func) => self.function(func),
                Member::Struct(decl) => {
                    let extends = if decl.extends_array { " extends array" } else { "" };
                    self.line(format!(
                        "{}struct {}{extends}",
                        visibility_prefix(decl.visibility),
                        decl.name
                    ));
                    self.line(String::from("endstruct"));
                }
                Member::Native(decl) => {
                    self.line(format!(
                        "{}native {} takes {} returns {}",
                        visibility_prefix(decl.visibility),
                        decl.name,
                        params_list(&decl.params),
                        decl.return_type.as_deref().unwrap_or("nothing"),
                    ));
                }
                Member::Scope(nested) => self.container(nested),
            }
        }

        if let Some(initializer) = &container.initializer {
            self.line(format!(
                "private function {} takes nothing returns nothing",
                initializer.name
            ));
            self.depth += 1;
            for name in &initializer.calls {
                self.line(format!("call {name}()"));
            }
            self.depth -= 1;
            self.line(String::from("endfunction"));
        }
        self.depth -= 1;

        self.line(format!("end{keyword}"));
    }

    fn system_library(&mut self, libraries: &[String]) {
        if libraries.is_empty() {
            self.line(format!("library {SYSTEM_LIBRARY_NAME}"));
        } else {
            self.line(format!(
                "library {SYSTEM_LIBRARY_NAME} requires {}",
                libraries.join(", ")
            ));
        }
        self.line(String::from("endlibrary"));
    }

    fn globals(&mut self, globals: &[GlobalVar]) {
        self.line(String::from("globals"));
        self.depth += 1;
        for var in globals {
            let mut decl = String::from(visibility_prefix(var.visibility));
            if var.constant {
                decl.push_str("constant ");
            }
            decl.push_str(&var.ty);
            if var.array {
                decl.push_str(" array");
            }
            decl.push(' ');
            decl.push_str(&var.name);

            if var.hashtable {
                decl.push_str(" = InitHashtable()");
            } else if let Some(init) = &var.init {
                if var.array {
                    self.errors.malformed_array_global(var.pos, &var.name);
                } else {
                    decl.push_str(&format!(" = {}", render_expr(init, 1)));
                }
            }
            self.line(decl);
        }
        self.depth -= 1;
        self.line(String::from("endglobals"));
    }

    fn function(&mut self, func: &Function) {
        self.line(format!(
            "{}function {} takes {} returns {}",
            visibility_prefix(func.visibility),
            func.name,
            params_list(&func.params),
            func.return_type.as_deref().unwrap_or("nothing"),
        ));

        self.depth += 1;
        for local in &func.locals {
            let mut decl = String::from("local ");
            decl.push_str(&local.ty);
            if local.array {
                decl.push_str(" array");
            }
            decl.push(' ');
            decl.push_str(&local.name);
            if let Some(init) = &local.init {
                decl.push_str(&format!(" = {}", render_expr(init, 1)));
            }
            self.line(decl);
        }
        self.statements(&func.body);
        self.depth -= 1;

        self.line(String::from("endfunction"));
    }

    fn statements(&mut self, statements: &[Statement]) {
        for statement in statements {
            self.statement(statement);
        }
    }

    fn statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Assign { target, op, value } => {
                let target_text = render_expr(target, 8);
                // the rewritten operator is left-associative, so the
                // original right-hand side renders one level tighter
                let rhs = match op {
                    AssignOp::Set => render_expr(value, 1),
                    AssignOp::Add => format!("{target_text} + {}", render_expr(value, 6)),
                    AssignOp::Sub => format!("{target_text} - {}", render_expr(value, 6)),
                    AssignOp::Mul => format!("{target_text} * {}", render_expr(value, 7)),
                    AssignOp::Div => format!("{target_text} / {}", render_expr(value, 7)),
                };
                self.line(format!("set {target_text} = {rhs}"));
            }
            Statement::IncDec { target, increment } => {
                let target_text = render_expr(target, 8);
                let op = if *increment { '+' } else { '-' };
                self.line(format!("set {target_text} = {target_text} {op} 1"));
            }
            Statement::If(node) => {
                self.if_statement(node);
                self.line(String::from("endif"));
            }
            Statement::Until { condition, body } => {
                self.line(String::from("loop"));
                self.depth += 1;
                self.line(format!("exitwhen {}", render_expr(condition, 1)));
                self.statements(body);
                self.depth -= 1;
                self.line(String::from("endloop"));
            }
            Statement::While { condition, body } => {
                self.line(String::from("loop"));
                self.depth += 1;
                self.line(format!("exitwhen not ({})", render_expr(condition, 1)));
                self.statements(body);
                self.depth -= 1;
                self.line(String::from("endloop"));
            }
            Statement::Loop { body } => {
                self.line(String::from("loop"));
                self.depth += 1;
                self.statements(body);
                self.depth -= 1;
                self.line(String::from("endloop"));
            }
            Statement::Break => self.line(String::from("exitwhen true")),
            Statement::Return(value) => match value {
                Some(expr) => self.line(format!("return {}", render_expr(expr, 1))),
                None => self.line(String::from("return")),
            },
            Statement::Call(call) => {
                self.line(format!("call {}", render_call(call)));
            }
        }
    }

    fn if_statement(&mut self, node: &IfStatement) {
        self.line(format!("if {} then", render_expr(&node.condition, 1)));
        self.depth += 1;
        self.statements(&node.body);
        self.depth -= 1;
        self.else_tail(&node.else_branch);
    }

    fn else_tail(&mut self, branch: &ElseBranch) {
        match branch {
            ElseBranch::None => {}
            ElseBranch::ElseIf(nested) => {
                self.line(format!("elseif {} then", render_expr(&nested.condition, 1)));
                self.depth += 1;
                self.statements(&nested.body);
                self.depth -= 1;
                self.else_tail(&nested.else_branch);
            }
            ElseBranch::Else(body) => {
                self.line(String::from("else"));
                self.depth += 1;
                self.statements(body);
                self.depth -= 1;
            }
        }
    }
}

fn visibility_prefix(visibility: Visibility) -> &'static str {
    match visibility {
        Visibility::Private => "private ",
        Visibility::Global => "",
        Visibility::Api => "public ",
    }
}

fn requires_list(requires: &[Requirement]) -> String {
    requires
        .iter()
        .map(|req| {
            if req.optional {
                format!("optional {}", req.name)
            } else {
                req.name.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn params_list(params: &[Param]) -> String {
    if params.is_empty() {
        return String::from("nothing");
    }
    params
        .iter()
        .map(|param| format!("{} {}", param.ty, param.name))
        .collect::<Vec<_>>()
        .join(", ")
}

// Binding strength, loosest to tightest. A subexpression is parenthesized
// exactly when it binds looser than its context requires.
fn precedence(expr: &ExprNode) -> u8 {
    match expr {
        ExprNode::FunctionRef(..) => 1,
        ExprNode::Binary(node) => match node.op.kind {
            TokenKind::Or => 1,
            TokenKind::And => 2,
            TokenKind::Eq | TokenKind::NEq => 3,
            TokenKind::Lt | TokenKind::LEq | TokenKind::Gt | TokenKind::GEq => 4,
            TokenKind::Add | TokenKind::Sub => 5,
            _ => 6,
        },
        ExprNode::Unary(..) => 7,
        ExprNode::Call(..) | ExprNode::Index(..) | ExprNode::Selector(..) => 8,
        _ => 9,
    }
}

fn render_expr(expr: &ExprNode, min_prec: u8) -> String {
    let prec = precedence(expr);
    let text = match expr {
        ExprNode::Ident(tok)
        | ExprNode::IntegerLit(tok)
        | ExprNode::RealLit(tok)
        | ExprNode::StringLit(tok)
        | ExprNode::Bool(tok) => tok.value.clone(),
        ExprNode::Null(..) => String::from("null"),
        ExprNode::FString(node) => render_fstring(&node.segments),
        ExprNode::Binary(node) => {
            let op = match node.op.kind {
                TokenKind::And => String::from("and"),
                TokenKind::Or => String::from("or"),
                _ => node.op.value.clone(),
            };
            format!(
                "{} {op} {}",
                render_expr(&node.a, prec),
                render_expr(&node.b, prec + 1)
            )
        }
        ExprNode::Unary(node) => {
            let op = match node.op.kind {
                TokenKind::Not | TokenKind::Bang => String::from("not "),
                _ => node.op.value.clone(),
            };
            format!("{op}{}", render_expr(&node.value, prec))
        }
        ExprNode::Call(node) => render_call(node),
        ExprNode::Index(node) => format!(
            "{}[{}]",
            render_expr(&node.target, 8),
            render_expr(&node.index, 1)
        ),
        ExprNode::Selector(node) => {
            format!("{}.{}", render_expr(&node.target, 8), node.selection.value)
        }
        ExprNode::FunctionRef(node) => format!("function {}", node.name.value),
    };

    if prec < min_prec {
        format!("({text})")
    } else {
        text
    }
}

fn render_call(node: &CallNode) -> String {
    let args = node
        .arguments
        .iter()
        .map(|arg| render_expr(arg, 1))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{}({args})", render_expr(&node.target, 8))
}

/// `f"a{x}b"` becomes `"a" + (x) + "b"`. The expression snippets were
/// captured verbatim from the source and pass through untouched.
fn render_fstring(segments: &[FStringSegment]) -> String {
    if segments.is_empty() {
        return String::from("\"\"");
    }
    segments
        .iter()
        .map(|segment| match segment {
            FStringSegment::Text(text) => format!("\"{text}\""),
            FStringSegment::Expr(expr) => format!("({expr})"),
        })
        .collect::<Vec<_>>()
        .join(" + ")
}
