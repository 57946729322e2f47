use crate::fstring::FStringSegment;
use crate::token::{Pos, Token};

pub trait AstNode {
    fn get_pos(&self) -> Pos;
}

/// Parse tree of one source unit.
#[derive(Debug, PartialEq, Eq)]
pub struct UnitNode {
    pub items: Vec<ItemNode>,
    pub comments: Vec<Token>,
}

impl UnitNode {
    pub fn imports(&self) -> impl Iterator<Item = &ImportNode> {
        self.items.iter().filter_map(ItemNode::as_import)
    }

    pub fn containers(&self) -> impl Iterator<Item = &ContainerNode> {
        self.items.iter().filter_map(ItemNode::as_container)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ItemNode {
    Import(ImportNode),
    Container(ContainerNode),
}

impl ItemNode {
    pub fn as_import(&self) -> Option<&ImportNode> {
        if let Self::Import(node) = self {
            Some(node)
        } else {
            None
        }
    }

    pub fn as_container(&self) -> Option<&ContainerNode> {
        if let Self::Container(node) = self {
            Some(node)
        } else {
            None
        }
    }
}

impl AstNode for ItemNode {
    fn get_pos(&self) -> Pos {
        match self {
            Self::Import(node) => node.get_pos(),
            Self::Container(node) => node.get_pos(),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ImportNode {
    pub pos: Pos,
    pub when: Option<Token>,
    pub path: Token,
}

impl AstNode for ImportNode {
    fn get_pos(&self) -> Pos {
        self.pos
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Library,
    Scope,
    Content,
    System,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ContainerNode {
    pub pos: Pos,
    pub kind: ContainerKind,
    pub name: Option<Token>,
    pub members: Vec<MemberNode>,
}

impl AstNode for ContainerNode {
    fn get_pos(&self) -> Pos {
        self.pos
    }
}

/// `global:` widens enclosed declarations to no keyword, `api:` to
/// `public`. Everything else inside a container defaults to `private`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Global,
    Api,
}

#[derive(Debug, PartialEq, Eq)]
pub enum MemberNode {
    Var(VarNode),
    Function(FunctionNode),
    Init(InitNode),
    TypeDecl(TypeDeclNode),
    Native(NativeNode),
    Uses(UsesNode),
    Nested(ContainerNode),
}

impl AstNode for MemberNode {
    fn get_pos(&self) -> Pos {
        match self {
            Self::Var(node) => node.get_pos(),
            Self::Function(node) => node.get_pos(),
            Self::Init(node) => node.get_pos(),
            Self::TypeDecl(node) => node.get_pos(),
            Self::Native(node) => node.get_pos(),
            Self::Uses(node) => node.get_pos(),
            Self::Nested(node) => node.get_pos(),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct VarNode {
    pub pos: Pos,
    pub modifier: Option<Modifier>,
    pub ty: Token,
    pub array: bool,
    pub name: Token,
    pub init: VarInit,
}

/// `= EXPR` declares a mutable variable, `~ EXPR` a constant one. `= []`
/// marks an array and `= {}` a hashtable backed by the engine constructor;
/// neither is a value.
#[derive(Debug, PartialEq, Eq)]
pub enum VarInit {
    None,
    Mutable(ExprNode),
    Constant(ExprNode),
    Array,
    Hashtable,
}

impl AstNode for VarNode {
    fn get_pos(&self) -> Pos {
        self.pos
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct FunctionNode {
    pub pos: Pos,
    pub modifier: Option<Modifier>,
    pub name: Token,
    pub params: Vec<ParameterNode>,
    pub return_type: Option<Token>,
    pub body: BlockNode,
}

impl AstNode for FunctionNode {
    fn get_pos(&self) -> Pos {
        self.pos
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParameterNode {
    pub pos: Pos,
    pub ty: Token,
    pub name: Token,
}

impl AstNode for ParameterNode {
    fn get_pos(&self) -> Pos {
        self.pos
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct InitNode {
    pub pos: Pos,
    pub body: BlockNode,
}

impl AstNode for InitNode {
    fn get_pos(&self) -> Pos {
        self.pos
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct TypeDeclNode {
    pub pos: Pos,
    pub modifier: Option<Modifier>,
    pub alias: bool,
    pub name: Token,
    pub base: Token,
}

impl AstNode for TypeDeclNode {
    fn get_pos(&self) -> Pos {
        self.pos
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct NativeNode {
    pub pos: Pos,
    pub modifier: Option<Modifier>,
    pub name: Token,
    pub params: Vec<ParameterNode>,
    pub return_type: Option<Token>,
}

impl AstNode for NativeNode {
    fn get_pos(&self) -> Pos {
        self.pos
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct UsesNode {
    pub pos: Pos,
    pub optional: bool,
    pub name: Token,
}

impl AstNode for UsesNode {
    fn get_pos(&self) -> Pos {
        self.pos
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct BlockNode {
    pub pos: Pos,
    pub statements: Vec<StatementNode>,
}

impl AstNode for BlockNode {
    fn get_pos(&self) -> Pos {
        self.pos
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum StatementNode {
    Local(LocalNode),
    Assign(AssignNode),
    IncDec(IncDecNode),
    If(IfNode),
    Until(CondLoopNode),
    While(CondLoopNode),
    Loop(LoopNode),
    Break(Token),
    Return(ReturnNode),
    Call(CallStatementNode),
}

impl AstNode for StatementNode {
    fn get_pos(&self) -> Pos {
        match self {
            Self::Local(node) => node.get_pos(),
            Self::Assign(node) => node.get_pos(),
            Self::IncDec(node) => node.get_pos(),
            Self::If(node) => node.get_pos(),
            Self::Until(node) => node.get_pos(),
            Self::While(node) => node.get_pos(),
            Self::Loop(node) => node.get_pos(),
            Self::Break(token) => token.pos,
            Self::Return(node) => node.get_pos(),
            Self::Call(node) => node.get_pos(),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct LocalNode {
    pub pos: Pos,
    pub ty: Token,
    pub array: bool,
    pub name: Token,
    pub value: Option<ExprNode>,
}

impl AstNode for LocalNode {
    fn get_pos(&self) -> Pos {
        self.pos
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, PartialEq, Eq)]
pub struct AssignNode {
    pub pos: Pos,
    pub target: ExprNode,
    pub op: AssignOp,
    pub value: ExprNode,
}

impl AstNode for AssignNode {
    fn get_pos(&self) -> Pos {
        self.pos
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct IncDecNode {
    pub pos: Pos,
    pub target: ExprNode,
    pub increment: bool,
}

impl AstNode for IncDecNode {
    fn get_pos(&self) -> Pos {
        self.pos
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct IfNode {
    pub pos: Pos,
    pub condition: ExprNode,
    pub body: BlockNode,
    pub else_node: ElseNode,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ElseNode {
    None,
    ElseIf(Box<IfNode>),
    Else(BlockNode),
}

impl AstNode for IfNode {
    fn get_pos(&self) -> Pos {
        self.pos
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct CondLoopNode {
    pub pos: Pos,
    pub condition: ExprNode,
    pub body: BlockNode,
}

impl AstNode for CondLoopNode {
    fn get_pos(&self) -> Pos {
        self.pos
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct LoopNode {
    pub pos: Pos,
    pub body: BlockNode,
}

impl AstNode for LoopNode {
    fn get_pos(&self) -> Pos {
        self.pos
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ReturnNode {
    pub pos: Pos,
    pub value: Option<ExprNode>,
}

impl AstNode for ReturnNode {
    fn get_pos(&self) -> Pos {
        self.pos
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct CallStatementNode {
    pub pos: Pos,
    pub expr: CallNode,
}

impl AstNode for CallStatementNode {
    fn get_pos(&self) -> Pos {
        self.pos
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ExprNode {
    Ident(Token),
    IntegerLit(Token),
    RealLit(Token),
    StringLit(Token),
    FString(FStringNode),
    Bool(Token),
    Null(Token),
    Binary(BinaryNode),
    Unary(UnaryNode),
    Call(CallNode),
    Index(IndexNode),
    Selector(SelectorNode),
    FunctionRef(FunctionRefNode),
}

impl AstNode for ExprNode {
    fn get_pos(&self) -> Pos {
        match self {
            Self::Ident(token)
            | Self::IntegerLit(token)
            | Self::RealLit(token)
            | Self::StringLit(token)
            | Self::Bool(token)
            | Self::Null(token) => token.pos,
            Self::FString(node) => node.pos,
            Self::Binary(node) => node.a.get_pos(),
            Self::Unary(node) => node.op.pos,
            Self::Call(node) => node.get_pos(),
            Self::Index(node) => node.target.get_pos(),
            Self::Selector(node) => node.target.get_pos(),
            Self::FunctionRef(node) => node.pos,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct FStringNode {
    pub pos: Pos,
    pub segments: Vec<FStringSegment>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct BinaryNode {
    pub a: Box<ExprNode>,
    pub op: Token,
    pub b: Box<ExprNode>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct UnaryNode {
    pub op: Token,
    pub value: Box<ExprNode>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct CallNode {
    pub pos: Pos,
    pub target: Box<ExprNode>,
    pub arguments: Vec<ExprNode>,
}

impl AstNode for CallNode {
    fn get_pos(&self) -> Pos {
        self.pos
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct IndexNode {
    pub target: Box<ExprNode>,
    pub index: Box<ExprNode>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct SelectorNode {
    pub target: Box<ExprNode>,
    pub selection: Token,
}

#[derive(Debug, PartialEq, Eq)]
pub struct FunctionRefNode {
    pub pos: Pos,
    pub name: Token,
}
