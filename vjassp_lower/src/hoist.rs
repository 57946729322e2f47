use crate::alias::AliasTable;
use crate::errors::LowerError;
use crate::{ElseBranch, IfStatement, Local, Param, Statement};
use indexmap::IndexSet;
use vjassp_syntax::ast::{AssignOp, BlockNode, ElseNode, ExprNode, IfNode, StatementNode};
use vjassp_syntax::ErrorReporter;

/// Moves every local declaration of a function body into a single prologue,
/// as the target dialect requires. A declaration that already sits in the
/// leading run of the body keeps its initializer inline; any later or
/// nested declaration is split into a bare prologue entry plus an
/// assignment at its original position. Shadowing cannot be expressed in
/// the target, so a name collision is an error.
pub(crate) fn hoist_body(
    errors: &impl ErrorReporter,
    aliases: &AliasTable,
    params: &[Param],
    block: BlockNode,
) -> (Vec<Local>, Vec<Statement>) {
    let mut hoister = Hoister {
        errors,
        aliases,
        locals: Vec::default(),
        names: params.iter().map(|param| param.name.clone()).collect(),
        in_prologue: true,
    };
    let body = hoister.lower_statements(block.statements, true);
    (hoister.locals, body)
}

struct Hoister<'a, E> {
    errors: &'a E,
    aliases: &'a AliasTable,
    locals: Vec<Local>,
    names: IndexSet<String>,
    in_prologue: bool,
}

impl<'a, E: ErrorReporter> Hoister<'a, E> {
    fn lower_statements(
        &mut self,
        statements: Vec<StatementNode>,
        top_level: bool,
    ) -> Vec<Statement> {
        let mut result = Vec::default();

        for statement in statements {
            if let StatementNode::Local(node) = statement {
                if !self.names.insert(node.name.value.clone()) {
                    self.errors.redeclared_local(node.name.pos, &node.name.value);
                    continue;
                }

                let ty = self.aliases.resolve(&node.ty.value);
                if top_level && self.in_prologue {
                    self.locals.push(Local {
                        ty,
                        array: node.array,
                        name: node.name.value,
                        init: node.value,
                    });
                } else {
                    // the declaration moves up, the value stays put
                    self.locals.push(Local {
                        ty,
                        array: node.array,
                        name: node.name.value.clone(),
                        init: None,
                    });
                    if let Some(value) = node.value {
                        result.push(Statement::Assign {
                            target: ExprNode::Ident(node.name),
                            op: AssignOp::Set,
                            value,
                        });
                    }
                }
                continue;
            }

            if top_level {
                self.in_prologue = false;
            }
            result.push(self.lower_statement(statement));
        }

        result
    }

    fn lower_statement(&mut self, statement: StatementNode) -> Statement {
        match statement {
            StatementNode::Local(..) => unreachable!("locals are handled by the caller"),
            StatementNode::Assign(node) => Statement::Assign {
                target: node.target,
                op: node.op,
                value: node.value,
            },
            StatementNode::IncDec(node) => Statement::IncDec {
                target: node.target,
                increment: node.increment,
            },
            StatementNode::If(node) => Statement::If(self.lower_if(node)),
            StatementNode::Until(node) => Statement::Until {
                condition: node.condition,
                body: self.lower_statements(node.body.statements, false),
            },
            StatementNode::While(node) => Statement::While {
                condition: node.condition,
                body: self.lower_statements(node.body.statements, false),
            },
            StatementNode::Loop(node) => Statement::Loop {
                body: self.lower_statements(node.body.statements, false),
            },
            StatementNode::Break(..) => Statement::Break,
            StatementNode::Return(node) => Statement::Return(node.value),
            StatementNode::Call(node) => Statement::Call(node.expr),
        }
    }

    fn lower_if(&mut self, node: IfNode) -> IfStatement {
        IfStatement {
            condition: node.condition,
            body: self.lower_statements(node.body.statements, false),
            else_branch: match node.else_node {
                ElseNode::None => ElseBranch::None,
                ElseNode::ElseIf(nested) => ElseBranch::ElseIf(Box::new(self.lower_if(*nested))),
                ElseNode::Else(block) => {
                    ElseBranch::Else(self.lower_statements(block.statements, false))
                }
            },
        }
    }
}
