use crate::decl::ParameterDirection;
use crate::location::SourceLocation;
use crate::types::TypeReference;
use std::fmt::{Display, Formatter};

/// A folded constant value.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f32),
    Double(f64),
}

/// What a resolved name refers to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Local,
    Parameter,
    Field,
    Property,
    Method,
    Type,
}

/// A pre-resolved name reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
    /// The type declaring the member. Empty for locals and parameters.
    pub declaring_type: String,
    pub name: String,
    pub kind: SymbolKind,
}

impl Symbol {
    pub fn new(declaring_type: impl Into<String>, name: impl Into<String>, kind: SymbolKind) -> Self {
        Symbol {
            declaring_type: declaring_type.into(),
            name: name.into(),
            kind,
        }
    }

    pub fn local(name: impl Into<String>) -> Self {
        Self::new("", name, SymbolKind::Local)
    }

    pub fn parameter(name: impl Into<String>) -> Self {
        Self::new("", name, SymbolKind::Parameter)
    }

    pub fn field(declaring_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(declaring_type, name, SymbolKind::Field)
    }

    pub fn property(declaring_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(declaring_type, name, SymbolKind::Property)
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.declaring_type.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}.{}", self.declaring_type, self.name)
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    LogicalAnd,
    LogicalOr,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    ShiftLeft,
    ShiftRight,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Remainder => "%",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::LogicalAnd => "&&",
            BinaryOperator::LogicalOr => "||",
            BinaryOperator::BitwiseAnd => "&",
            BinaryOperator::BitwiseOr => "|",
            BinaryOperator::BitwiseXor => "^",
            BinaryOperator::ShiftLeft => "<<",
            BinaryOperator::ShiftRight => ">>",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Equal
                | BinaryOperator::NotEqual
                | BinaryOperator::Less
                | BinaryOperator::LessEqual
                | BinaryOperator::Greater
                | BinaryOperator::GreaterEqual
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Negate,
    Plus,
    LogicalNot,
    BitwiseNot,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
}

impl UnaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOperator::Negate => "-",
            UnaryOperator::Plus => "+",
            UnaryOperator::LogicalNot => "!",
            UnaryOperator::BitwiseNot => "~",
            UnaryOperator::PreIncrement | UnaryOperator::PostIncrement => "++",
            UnaryOperator::PreDecrement | UnaryOperator::PostDecrement => "--",
        }
    }

    pub fn is_postfix(&self) -> bool {
        matches!(
            self,
            UnaryOperator::PostIncrement | UnaryOperator::PostDecrement
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AssignmentOperator {
    Assign,
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    ShiftLeft,
    ShiftRight,
}

impl AssignmentOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            AssignmentOperator::Assign => "=",
            AssignmentOperator::Add => "+=",
            AssignmentOperator::Subtract => "-=",
            AssignmentOperator::Multiply => "*=",
            AssignmentOperator::Divide => "/=",
            AssignmentOperator::Remainder => "%=",
            AssignmentOperator::BitwiseAnd => "&=",
            AssignmentOperator::BitwiseOr => "|=",
            AssignmentOperator::BitwiseXor => "^=",
            AssignmentOperator::ShiftLeft => "<<=",
            AssignmentOperator::ShiftRight => ">>=",
        }
    }
}

/// An argument passed to an invocation or constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub expression: Expression,
    pub direction: ParameterDirection,
}

impl From<Expression> for Argument {
    fn from(expression: Expression) -> Self {
        Argument {
            expression,
            direction: ParameterDirection::In,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    Literal(Literal),
    Identifier(Symbol),
    /// The instance under construction, inside a constructor body.
    This,
    MemberAccess {
        target: Box<Expression>,
        member: Symbol,
    },
    ElementAccess {
        target: Box<Expression>,
        index: Box<Expression>,
    },
    Binary {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Unary {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
    Assignment {
        op: AssignmentOperator,
        target: Box<Expression>,
        value: Box<Expression>,
    },
    /// A call to `declaring_type.method`. Static dispatch only.
    Invocation {
        declaring_type: String,
        method: String,
        arguments: Vec<Argument>,
    },
    ObjectCreation {
        arguments: Vec<Argument>,
    },
    Conditional {
        condition: Box<Expression>,
        when_true: Box<Expression>,
        when_false: Box<Expression>,
    },
    Cast {
        operand: Box<Expression>,
    },
    Parenthesized(Box<Expression>),
    /// An output variable declared inline in an argument list.
    OutVariable { name: String },
    /// An output argument whose value is thrown away.
    Discard,
}

/// A typed expression node. `ty` is the resolved type of the whole expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub ty: TypeReference,
    pub location: Option<SourceLocation>,
}

impl Expression {
    pub fn new(kind: ExpressionKind, ty: TypeReference) -> Self {
        Expression {
            kind,
            ty,
            location: None,
        }
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn literal(value: Literal) -> Self {
        let ty = match value {
            Literal::Bool(_) => TypeReference::bool(),
            Literal::Int(_) => TypeReference::int(),
            Literal::UInt(_) => TypeReference::uint(),
            Literal::Float(_) => TypeReference::float(),
            Literal::Double(_) => TypeReference::primitive(crate::types::builtin::DOUBLE),
        };
        Self::new(ExpressionKind::Literal(value), ty)
    }

    pub fn float(value: f32) -> Self {
        Self::literal(Literal::Float(value))
    }

    pub fn int(value: i64) -> Self {
        Self::literal(Literal::Int(value))
    }

    pub fn local(name: impl Into<String>, ty: TypeReference) -> Self {
        Self::new(ExpressionKind::Identifier(Symbol::local(name)), ty)
    }

    pub fn parameter(name: impl Into<String>, ty: TypeReference) -> Self {
        Self::new(ExpressionKind::Identifier(Symbol::parameter(name)), ty)
    }

    /// A reference to a field of `declaring_type`, without an explicit receiver.
    pub fn field(
        declaring_type: impl Into<String>,
        name: impl Into<String>,
        ty: TypeReference,
    ) -> Self {
        Self::new(
            ExpressionKind::Identifier(Symbol::field(declaring_type, name)),
            ty,
        )
    }

    pub fn this(ty: TypeReference) -> Self {
        Self::new(ExpressionKind::This, ty)
    }

    pub fn member(self, declaring_type: impl Into<String>, name: impl Into<String>, ty: TypeReference) -> Self {
        Self::new(
            ExpressionKind::MemberAccess {
                target: Box::new(self),
                member: Symbol::field(declaring_type, name),
            },
            ty,
        )
    }

    pub fn index(self, index: Expression, ty: TypeReference) -> Self {
        Self::new(
            ExpressionKind::ElementAccess {
                target: Box::new(self),
                index: Box::new(index),
            },
            ty,
        )
    }

    pub fn binary(op: BinaryOperator, left: Expression, right: Expression, ty: TypeReference) -> Self {
        Self::new(
            ExpressionKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            ty,
        )
    }

    pub fn unary(op: UnaryOperator, operand: Expression) -> Self {
        let ty = operand.ty.clone();
        Self::new(
            ExpressionKind::Unary {
                op,
                operand: Box::new(operand),
            },
            ty,
        )
    }

    pub fn assign(target: Expression, value: Expression) -> Self {
        Self::compound_assign(AssignmentOperator::Assign, target, value)
    }

    pub fn compound_assign(op: AssignmentOperator, target: Expression, value: Expression) -> Self {
        let ty = target.ty.clone();
        Self::new(
            ExpressionKind::Assignment {
                op,
                target: Box::new(target),
                value: Box::new(value),
            },
            ty,
        )
    }

    pub fn invoke(
        declaring_type: impl Into<String>,
        method: impl Into<String>,
        arguments: Vec<Argument>,
        ty: TypeReference,
    ) -> Self {
        Self::new(
            ExpressionKind::Invocation {
                declaring_type: declaring_type.into(),
                method: method.into(),
                arguments,
            },
            ty,
        )
    }

    pub fn construct(ty: TypeReference, arguments: Vec<Argument>) -> Self {
        Self::new(ExpressionKind::ObjectCreation { arguments }, ty)
    }

    pub fn conditional(condition: Expression, when_true: Expression, when_false: Expression) -> Self {
        let ty = when_true.ty.clone();
        Self::new(
            ExpressionKind::Conditional {
                condition: Box::new(condition),
                when_true: Box::new(when_true),
                when_false: Box::new(when_false),
            },
            ty,
        )
    }

    pub fn cast(operand: Expression, ty: TypeReference) -> Self {
        Self::new(
            ExpressionKind::Cast {
                operand: Box::new(operand),
            },
            ty,
        )
    }

    pub fn parenthesized(inner: Expression) -> Self {
        let ty = inner.ty.clone();
        Self::new(ExpressionKind::Parenthesized(Box::new(inner)), ty)
    }

    /// An `out` argument declaring a new local named `name`.
    pub fn out_variable(name: impl Into<String>, ty: TypeReference) -> Argument {
        Argument {
            expression: Self::new(ExpressionKind::OutVariable { name: name.into() }, ty),
            direction: ParameterDirection::Out,
        }
    }

    /// An `out` argument whose value is discarded.
    pub fn out_discard(ty: TypeReference) -> Argument {
        Argument {
            expression: Self::new(ExpressionKind::Discard, ty),
            direction: ParameterDirection::Out,
        }
    }

    /// Wraps this expression as an argument passed with `direction`.
    pub fn pass(self, direction: ParameterDirection) -> Argument {
        Argument {
            expression: self,
            direction,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SwitchLabel {
    Case(Literal),
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchSection {
    pub labels: Vec<SwitchLabel>,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Block(Block),
    Expression(Expression),
    VariableDeclaration {
        name: String,
        ty: TypeReference,
        initializer: Option<Expression>,
    },
    Return(Option<Expression>),
    If {
        condition: Expression,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
    },
    For {
        initializers: Vec<Statement>,
        condition: Option<Expression>,
        incrementors: Vec<Expression>,
        body: Box<Statement>,
    },
    While {
        condition: Expression,
        body: Box<Statement>,
    },
    DoWhile {
        body: Box<Statement>,
        condition: Expression,
    },
    Switch {
        expression: Expression,
        sections: Vec<SwitchSection>,
    },
    Break,
    Continue,
}

impl Statement {
    pub fn declare(name: impl Into<String>, ty: TypeReference, initializer: Option<Expression>) -> Self {
        Statement::VariableDeclaration {
            name: name.into(),
            ty,
            initializer,
        }
    }

    pub fn if_then(condition: Expression, then_branch: Statement, else_branch: Option<Statement>) -> Self {
        Statement::If {
            condition,
            then_branch: Box::new(then_branch),
            else_branch: else_branch.map(Box::new),
        }
    }
}

impl From<Expression> for Statement {
    fn from(value: Expression) -> Self {
        Statement::Expression(value)
    }
}

/// A braced statement list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub statements: Vec<Statement>,
}

impl Block {
    pub fn new(statements: Vec<Statement>) -> Self {
        Block { statements }
    }
}

impl From<Vec<Statement>> for Block {
    fn from(statements: Vec<Statement>) -> Self {
        Block { statements }
    }
}
