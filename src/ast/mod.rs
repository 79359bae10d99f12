pub mod sexpr;

use crate::lexer::token::Token;
use crate::span::Span;

pub type ExprId<'ast> = &'ast Expr<'ast>;
pub type StmtId<'ast> = &'ast Stmt<'ast>;

#[derive(Debug, Clone, Copy)]
pub struct Program<'ast> {
    pub statements: &'ast [StmtId<'ast>],
    pub span: Span,
}

#[derive(Debug, Clone, Copy)]
pub struct Name<'ast> {
    pub parts: &'ast [Token],
    pub span: Span,
}

#[derive(Debug, Clone, Copy)]
pub enum Type<'ast> {
    Simple(&'ast Token),
    Name(Name<'ast>),
    Nullable(&'ast Type<'ast>),
    Union(&'ast [Type<'ast>]),
    Intersection(&'ast [Type<'ast>]),
}

#[derive(Debug)]
pub enum Stmt<'ast> {
    Echo {
        exprs: &'ast [ExprId<'ast>],
        span: Span,
    },
    Return {
        expr: Option<ExprId<'ast>>,
        span: Span,
    },
    If {
        condition: ExprId<'ast>,
        then_block: &'ast [StmtId<'ast>],
        // elseif chains nest as a single `If` in the else block
        else_block: Option<&'ast [StmtId<'ast>]>,
        span: Span,
    },
    While {
        condition: ExprId<'ast>,
        body: &'ast [StmtId<'ast>],
        span: Span,
    },
    DoWhile {
        body: &'ast [StmtId<'ast>],
        condition: ExprId<'ast>,
        span: Span,
    },
    For {
        init: &'ast [ExprId<'ast>],
        condition: &'ast [ExprId<'ast>],
        step: &'ast [ExprId<'ast>],
        body: &'ast [StmtId<'ast>],
        span: Span,
    },
    Foreach {
        expr: ExprId<'ast>,
        key_var: Option<ExprId<'ast>>,
        value_var: ExprId<'ast>,
        by_ref: bool,
        body: &'ast [StmtId<'ast>],
        span: Span,
    },
    Switch {
        condition: ExprId<'ast>,
        cases: &'ast [Case<'ast>],
        span: Span,
    },
    Break {
        level: Option<ExprId<'ast>>,
        span: Span,
    },
    Continue {
        level: Option<ExprId<'ast>>,
        span: Span,
    },
    Block {
        statements: &'ast [StmtId<'ast>],
        span: Span,
    },
    Function {
        name: &'ast Token,
        by_ref: bool,
        params: &'ast [Param<'ast>],
        return_type: Option<&'ast Type<'ast>>,
        body: &'ast [StmtId<'ast>],
        span: Span,
    },
    Class {
        kind: ClassKind,
        modifiers: &'ast [Token],
        name: &'ast Token,
        backing_type: Option<&'ast Type<'ast>>,
        extends: &'ast [Name<'ast>],
        implements: &'ast [Name<'ast>],
        members: &'ast [ClassMember<'ast>],
        span: Span,
    },
    Namespace {
        name: Option<Name<'ast>>,
        // Unbraced namespaces own every statement up to the next namespace
        body: &'ast [StmtId<'ast>],
        braced: bool,
        span: Span,
    },
    Use {
        kind: UseKind,
        uses: &'ast [UseItem<'ast>],
        span: Span,
    },
    Const {
        consts: &'ast [ConstItem<'ast>],
        span: Span,
    },
    Global {
        vars: &'ast [ExprId<'ast>],
        span: Span,
    },
    Static {
        vars: &'ast [StaticVar<'ast>],
        span: Span,
    },
    Unset {
        vars: &'ast [ExprId<'ast>],
        span: Span,
    },
    Try {
        body: &'ast [StmtId<'ast>],
        catches: &'ast [Catch<'ast>],
        finally: Option<&'ast [StmtId<'ast>]>,
        span: Span,
    },
    Throw {
        expr: ExprId<'ast>,
        span: Span,
    },
    Declare {
        declares: &'ast [DeclareItem<'ast>],
        body: &'ast [StmtId<'ast>],
        span: Span,
    },
    Goto {
        label: &'ast Token,
        span: Span,
    },
    Label {
        name: &'ast Token,
        span: Span,
    },
    HaltCompiler {
        span: Span,
    },
    InlineHtml {
        value: &'ast [u8],
        span: Span,
    },
    Expression {
        expr: ExprId<'ast>,
        span: Span,
    },
    Nop {
        span: Span,
    },
    /// Source range the parser skipped while synchronizing.
    Error {
        span: Span,
    },
}

impl<'ast> Stmt<'ast> {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Echo { span, .. }
            | Stmt::Return { span, .. }
            | Stmt::If { span, .. }
            | Stmt::While { span, .. }
            | Stmt::DoWhile { span, .. }
            | Stmt::For { span, .. }
            | Stmt::Foreach { span, .. }
            | Stmt::Switch { span, .. }
            | Stmt::Break { span, .. }
            | Stmt::Continue { span, .. }
            | Stmt::Block { span, .. }
            | Stmt::Function { span, .. }
            | Stmt::Class { span, .. }
            | Stmt::Namespace { span, .. }
            | Stmt::Use { span, .. }
            | Stmt::Const { span, .. }
            | Stmt::Global { span, .. }
            | Stmt::Static { span, .. }
            | Stmt::Unset { span, .. }
            | Stmt::Try { span, .. }
            | Stmt::Throw { span, .. }
            | Stmt::Declare { span, .. }
            | Stmt::Goto { span, .. }
            | Stmt::Label { span, .. }
            | Stmt::HaltCompiler { span }
            | Stmt::InlineHtml { span, .. }
            | Stmt::Expression { span, .. }
            | Stmt::Nop { span }
            | Stmt::Error { span } => *span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Interface,
    Trait,
    Enum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseKind {
    Normal,
    Function,
    Const,
}

#[derive(Debug, Clone, Copy)]
pub struct UseItem<'ast> {
    pub name: Name<'ast>,
    pub alias: Option<&'ast Token>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy)]
pub struct ConstItem<'ast> {
    pub name: &'ast Token,
    pub value: ExprId<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy)]
pub struct StaticVar<'ast> {
    pub var: &'ast Token,
    pub default: Option<ExprId<'ast>>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy)]
pub struct DeclareItem<'ast> {
    pub key: &'ast Token,
    pub value: ExprId<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy)]
pub struct Param<'ast> {
    pub modifiers: &'ast [Token],
    pub ty: Option<&'ast Type<'ast>>,
    pub name: &'ast Token,
    pub default: Option<ExprId<'ast>>,
    pub by_ref: bool,
    pub variadic: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Copy)]
pub struct Case<'ast> {
    pub condition: Option<ExprId<'ast>>, // None for default
    pub body: &'ast [StmtId<'ast>],
    pub span: Span,
}

#[derive(Debug, Clone, Copy)]
pub struct Catch<'ast> {
    pub types: &'ast [Name<'ast>], // Multi-catch: A|B
    pub var: Option<&'ast Token>,
    pub body: &'ast [StmtId<'ast>],
    pub span: Span,
}

#[derive(Debug, Clone, Copy)]
pub enum ClassMember<'ast> {
    Property {
        modifiers: &'ast [Token],
        ty: Option<&'ast Type<'ast>>,
        name: &'ast Token,
        default: Option<ExprId<'ast>>,
        span: Span,
    },
    Method {
        modifiers: &'ast [Token],
        by_ref: bool,
        name: &'ast Token,
        params: &'ast [Param<'ast>],
        return_type: Option<&'ast Type<'ast>>,
        // None for abstract and interface methods
        body: Option<&'ast [StmtId<'ast>]>,
        span: Span,
    },
    Const {
        modifiers: &'ast [Token],
        consts: &'ast [ConstItem<'ast>],
        span: Span,
    },
    TraitUse {
        traits: &'ast [Name<'ast>],
        span: Span,
    },
    Case {
        name: &'ast Token,
        value: Option<ExprId<'ast>>,
        span: Span,
    },
    Error {
        span: Span,
    },
}

impl<'ast> ClassMember<'ast> {
    pub fn span(&self) -> Span {
        match self {
            ClassMember::Property { span, .. }
            | ClassMember::Method { span, .. }
            | ClassMember::Const { span, .. }
            | ClassMember::TraitUse { span, .. }
            | ClassMember::Case { span, .. }
            | ClassMember::Error { span } => *span,
        }
    }
}

#[derive(Debug)]
pub enum Expr<'ast> {
    Assign {
        var: ExprId<'ast>,
        expr: ExprId<'ast>,
        span: Span,
    },
    AssignRef {
        var: ExprId<'ast>,
        expr: ExprId<'ast>,
        span: Span,
    },
    AssignOp {
        var: ExprId<'ast>,
        op: AssignOp,
        expr: ExprId<'ast>,
        span: Span,
    },
    Binary {
        left: ExprId<'ast>,
        op: BinaryOp,
        right: ExprId<'ast>,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        expr: ExprId<'ast>,
        span: Span,
    },
    PreInc {
        var: ExprId<'ast>,
        span: Span,
    },
    PreDec {
        var: ExprId<'ast>,
        span: Span,
    },
    PostInc {
        var: ExprId<'ast>,
        span: Span,
    },
    PostDec {
        var: ExprId<'ast>,
        span: Span,
    },
    Ternary {
        condition: ExprId<'ast>,
        if_true: Option<ExprId<'ast>>,
        if_false: ExprId<'ast>,
        span: Span,
    },
    Cast {
        kind: CastKind,
        expr: ExprId<'ast>,
        span: Span,
    },
    Call {
        func: ExprId<'ast>,
        args: &'ast [Arg<'ast>],
        span: Span,
    },
    MethodCall {
        target: ExprId<'ast>,
        method: ExprId<'ast>,
        args: &'ast [Arg<'ast>],
        nullsafe: bool,
        span: Span,
    },
    StaticCall {
        class: ExprId<'ast>,
        method: ExprId<'ast>,
        args: &'ast [Arg<'ast>],
        span: Span,
    },
    PropertyFetch {
        target: ExprId<'ast>,
        property: ExprId<'ast>,
        nullsafe: bool,
        span: Span,
    },
    StaticPropertyFetch {
        class: ExprId<'ast>,
        property: ExprId<'ast>,
        span: Span,
    },
    ClassConstFetch {
        class: ExprId<'ast>,
        constant: ExprId<'ast>,
        span: Span,
    },
    ArrayDimFetch {
        array: ExprId<'ast>,
        dim: Option<ExprId<'ast>>, // None for $a[]
        span: Span,
    },
    New {
        class: ExprId<'ast>,
        args: &'ast [Arg<'ast>],
        span: Span,
    },
    AnonymousClass {
        args: &'ast [Arg<'ast>],
        extends: Option<Name<'ast>>,
        implements: &'ast [Name<'ast>],
        members: &'ast [ClassMember<'ast>],
        span: Span,
    },
    Clone {
        expr: ExprId<'ast>,
        span: Span,
    },
    Closure {
        is_static: bool,
        by_ref: bool,
        params: &'ast [Param<'ast>],
        uses: &'ast [ClosureUse<'ast>],
        return_type: Option<&'ast Type<'ast>>,
        body: &'ast [StmtId<'ast>],
        span: Span,
    },
    ArrowFunction {
        is_static: bool,
        by_ref: bool,
        params: &'ast [Param<'ast>],
        return_type: Option<&'ast Type<'ast>>,
        expr: ExprId<'ast>,
        span: Span,
    },
    Match {
        condition: ExprId<'ast>,
        arms: &'ast [MatchArm<'ast>],
        span: Span,
    },
    Isset {
        vars: &'ast [ExprId<'ast>],
        span: Span,
    },
    Empty {
        expr: ExprId<'ast>,
        span: Span,
    },
    Include {
        kind: IncludeKind,
        expr: ExprId<'ast>,
        span: Span,
    },
    Eval {
        expr: ExprId<'ast>,
        span: Span,
    },
    Exit {
        expr: Option<ExprId<'ast>>,
        span: Span,
    },
    Print {
        expr: ExprId<'ast>,
        span: Span,
    },
    Yield {
        key: Option<ExprId<'ast>>,
        value: Option<ExprId<'ast>>,
        span: Span,
    },
    YieldFrom {
        expr: ExprId<'ast>,
        span: Span,
    },
    Throw {
        expr: ExprId<'ast>,
        span: Span,
    },
    Silence {
        expr: ExprId<'ast>,
        span: Span,
    },
    Array {
        items: &'ast [ArrayItem<'ast>],
        span: Span,
    },
    List {
        items: &'ast [ArrayItem<'ast>],
        span: Span,
    },
    Variable {
        name: Span,
        span: Span,
    },
    /// `$$a`, `${expr}`
    IndirectVariable {
        name: ExprId<'ast>,
        span: Span,
    },
    Name {
        name: Name<'ast>,
        span: Span,
    },
    /// Member name after `->` or `::`.
    Identifier {
        name: Span,
        span: Span,
    },
    Integer {
        value: &'ast [u8],
        span: Span,
    },
    Float {
        value: &'ast [u8],
        span: Span,
    },
    String {
        value: &'ast [u8],
        span: Span,
    },
    InterpolatedString {
        parts: &'ast [ExprId<'ast>],
        span: Span,
    },
    ShellExec {
        parts: &'ast [ExprId<'ast>],
        span: Span,
    },
    MagicConst {
        kind: MagicConstKind,
        span: Span,
    },
    Error {
        span: Span,
    },
}

impl<'ast> Expr<'ast> {
    pub fn span(&self) -> Span {
        match self {
            Expr::Assign { span, .. }
            | Expr::AssignRef { span, .. }
            | Expr::AssignOp { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Unary { span, .. }
            | Expr::PreInc { span, .. }
            | Expr::PreDec { span, .. }
            | Expr::PostInc { span, .. }
            | Expr::PostDec { span, .. }
            | Expr::Ternary { span, .. }
            | Expr::Cast { span, .. }
            | Expr::Call { span, .. }
            | Expr::MethodCall { span, .. }
            | Expr::StaticCall { span, .. }
            | Expr::PropertyFetch { span, .. }
            | Expr::StaticPropertyFetch { span, .. }
            | Expr::ClassConstFetch { span, .. }
            | Expr::ArrayDimFetch { span, .. }
            | Expr::New { span, .. }
            | Expr::AnonymousClass { span, .. }
            | Expr::Clone { span, .. }
            | Expr::Closure { span, .. }
            | Expr::ArrowFunction { span, .. }
            | Expr::Match { span, .. }
            | Expr::Isset { span, .. }
            | Expr::Empty { span, .. }
            | Expr::Include { span, .. }
            | Expr::Eval { span, .. }
            | Expr::Exit { span, .. }
            | Expr::Print { span, .. }
            | Expr::Yield { span, .. }
            | Expr::YieldFrom { span, .. }
            | Expr::Throw { span, .. }
            | Expr::Silence { span, .. }
            | Expr::Array { span, .. }
            | Expr::List { span, .. }
            | Expr::Variable { span, .. }
            | Expr::IndirectVariable { span, .. }
            | Expr::Name { span, .. }
            | Expr::Identifier { span, .. }
            | Expr::Integer { span, .. }
            | Expr::Float { span, .. }
            | Expr::String { span, .. }
            | Expr::InterpolatedString { span, .. }
            | Expr::ShellExec { span, .. }
            | Expr::MagicConst { span, .. }
            | Expr::Error { span } => *span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
    Pow,
    Concat, // .
    EqEq,
    EqEqEq,
    NotEq,
    NotEqEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Spaceship,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,
    LogicalAnd,
    LogicalOr,
    LogicalXor,
    Coalesce,
    Instanceof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
    Pow,
    Concat,
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,
    Coalesce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    BitNot,
    Reference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    Int,
    Float,
    String,
    Array,
    Object,
    Bool,
    Unset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeKind {
    Include,
    IncludeOnce,
    Require,
    RequireOnce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagicConstKind {
    Line,
    File,
    Dir,
    Class,
    Trait,
    Method,
    Function,
    Namespace,
    Property,
}

#[derive(Debug, Clone, Copy)]
pub struct Arg<'ast> {
    pub name: Option<&'ast Token>,
    pub value: ExprId<'ast>,
    pub unpack: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Copy)]
pub struct ArrayItem<'ast> {
    pub key: Option<ExprId<'ast>>,
    // None for skipped list() slots
    pub value: Option<ExprId<'ast>>,
    pub by_ref: bool,
    pub unpack: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Copy)]
pub struct ClosureUse<'ast> {
    pub var: &'ast Token,
    pub by_ref: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Copy)]
pub struct MatchArm<'ast> {
    pub conditions: Option<&'ast [ExprId<'ast>]>, // None for default
    pub body: ExprId<'ast>,
    pub span: Span,
}
