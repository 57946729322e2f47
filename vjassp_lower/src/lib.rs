mod alias;
mod errors;
mod hoist;
mod lower;
mod name;

use vjassp_syntax::ast::{AssignOp, CallNode, ExprNode};
use vjassp_syntax::Pos;

pub use lower::{lower, INITIALIZER_NAME, SYSTEM_LIBRARY_NAME};

/// The lowered program: containers in emission order, plus the bookkeeping
/// the driver needs to close the output (the synthetic `VJPLIBS` library
/// that ties `system` containers to every plain library).
pub struct Program {
    pub containers: Vec<Container>,
    pub libraries: Vec<String>,
    pub has_systems: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerKind {
    Library,
    Scope,
}

pub struct Container {
    pub pos: Pos,
    pub kind: ContainerKind,
    pub name: String,
    pub requires: Vec<Requirement>,
    pub members: Vec<Member>,
    pub initializer: Option<Initializer>,
}

pub struct Requirement {
    pub name: String,
    pub optional: bool,
}

/// The synthetic `onInit` function. It exists iff the container had at
/// least one `init:` block, and calls the wrapped init functions in source
/// order.
pub struct Initializer {
    pub name: String,
    pub calls: Vec<String>,
}

pub enum Member {
    Globals(Vec<GlobalVar>),
    Function(Function),
    Struct(StructDecl),
    Native(NativeDecl),
    Scope(Container),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Private,
    Global,
    Api,
}

pub struct GlobalVar {
    pub pos: Pos,
    pub name: String,
    pub ty: String,
    pub visibility: Visibility,
    pub constant: bool,
    pub array: bool,
    pub hashtable: bool,
    pub init: Option<ExprNode>,
}

pub struct StructDecl {
    pub name: String,
    pub visibility: Visibility,
    pub extends_array: bool,
}

pub struct NativeDecl {
    pub name: String,
    pub visibility: Visibility,
    pub params: Vec<Param>,
    pub return_type: Option<String>,
}

pub struct Function {
    pub pos: Pos,
    pub name: String,
    pub visibility: Visibility,
    pub params: Vec<Param>,
    pub return_type: Option<String>,
    pub locals: Vec<Local>,
    pub body: Vec<Statement>,
}

pub struct Param {
    pub ty: String,
    pub name: String,
}

/// A hoisted local. `init` stays inline only for declarations that already
/// sat in the function prologue; everything else was split into a bare
/// declaration here plus an assignment at the original position.
pub struct Local {
    pub ty: String,
    pub array: bool,
    pub name: String,
    pub init: Option<ExprNode>,
}

pub enum Statement {
    Assign {
        target: ExprNode,
        op: AssignOp,
        value: ExprNode,
    },
    IncDec {
        target: ExprNode,
        increment: bool,
    },
    If(IfStatement),
    Until {
        condition: ExprNode,
        body: Vec<Statement>,
    },
    While {
        condition: ExprNode,
        body: Vec<Statement>,
    },
    Loop {
        body: Vec<Statement>,
    },
    Break,
    Return(Option<ExprNode>),
    Call(CallNode),
}

pub struct IfStatement {
    pub condition: ExprNode,
    pub body: Vec<Statement>,
    pub else_branch: ElseBranch,
}

pub enum ElseBranch {
    None,
    ElseIf(Box<IfStatement>),
    Else(Vec<Statement>),
}
