//! Syntax tree of the test script dialect

use std::rc::Rc;

/// A statement with the position of its first token
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    /// What the statement does
    pub kind: StmtKind,
    /// 1-based line
    pub line: u32,
    /// 1-based column
    pub column: u32,
}

/// Statement forms
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `var a = 1, b;` (also `let` and `const`)
    Var(Vec<(String, Option<Expr>)>),
    /// Expression statement
    Expr(Expr),
    /// `return expr;`
    Return(Option<Expr>),
    /// `throw expr;`
    Throw(Expr),
    /// `if (test) then else otherwise`
    If {
        test: Expr,
        then: Box<Stmt>,
        otherwise: Option<Box<Stmt>>,
    },
    /// `{ ... }`
    Block(Vec<Stmt>),
    /// `try { } catch (e) { } finally { }`
    Try {
        body: Vec<Stmt>,
        param: Option<String>,
        handler: Option<Vec<Stmt>>,
        finalizer: Option<Vec<Stmt>>,
    },
    /// `function name(...) { ... }`
    Function(Rc<FunctionDef>),
    /// `debugger;`
    Debugger,
    /// `;`
    Empty,
}

/// A function literal or declaration
#[derive(Debug, PartialEq)]
pub struct FunctionDef {
    /// Declared name, if any
    pub name: Option<String>,
    /// Parameter names
    pub params: Vec<String>,
    /// Body statements
    pub body: Vec<Stmt>,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `!`
    Not,
    /// `-`
    Negate,
    /// `+`
    Plus,
    /// `typeof`
    Typeof,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    StrictEq,
    StrictNe,
    LooseEq,
    LooseNe,
    Lt,
    Gt,
    Le,
    Ge,
    In,
}

/// Short-circuit operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// Expression forms
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    String(String),
    Bool(bool),
    Null,
    This,
    Ident(String),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Function(Rc<FunctionDef>),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Vec<Expr>),
    New(Box<Expr>, Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Logical(LogicalOp, Box<Expr>, Box<Expr>),
    Assign(Box<Expr>, Box<Expr>),
}
