use crate::tree::{Block, Expression, ExpressionKind, Statement};

impl Expression {
    /// Visits this expression and every nested sub-expression in source order.
    pub fn walk<'a, F>(&'a self, f: &mut F)
    where
        F: FnMut(&'a Expression),
    {
        f(self);
        match &self.kind {
            ExpressionKind::Literal(_)
            | ExpressionKind::Identifier(_)
            | ExpressionKind::This
            | ExpressionKind::OutVariable { .. }
            | ExpressionKind::Discard => {}
            ExpressionKind::MemberAccess { target, .. } => target.walk(f),
            ExpressionKind::ElementAccess { target, index } => {
                target.walk(f);
                index.walk(f);
            }
            ExpressionKind::Binary { left, right, .. } => {
                left.walk(f);
                right.walk(f);
            }
            ExpressionKind::Unary { operand, .. } => operand.walk(f),
            ExpressionKind::Assignment { target, value, .. } => {
                target.walk(f);
                value.walk(f);
            }
            ExpressionKind::Invocation { arguments, .. }
            | ExpressionKind::ObjectCreation { arguments } => {
                for argument in arguments {
                    argument.expression.walk(f);
                }
            }
            ExpressionKind::Conditional {
                condition,
                when_true,
                when_false,
            } => {
                condition.walk(f);
                when_true.walk(f);
                when_false.walk(f);
            }
            ExpressionKind::Cast { operand } => operand.walk(f),
            ExpressionKind::Parenthesized(inner) => inner.walk(f),
        }
    }
}

impl Statement {
    /// The expressions written directly in this statement, excluding those of nested
    /// bodies. `for` initializers count as part of the statement header.
    pub fn own_expressions(&self) -> Vec<&Expression> {
        match self {
            Statement::Block(_) | Statement::Break | Statement::Continue => vec![],
            Statement::Expression(expression) => vec![expression],
            Statement::VariableDeclaration { initializer, .. } => initializer.iter().collect(),
            Statement::Return(value) => value.iter().collect(),
            Statement::If { condition, .. }
            | Statement::While { condition, .. }
            | Statement::DoWhile { condition, .. } => vec![condition],
            Statement::For {
                initializers,
                condition,
                incrementors,
                ..
            } => {
                let mut expressions: Vec<&Expression> = initializers
                    .iter()
                    .flat_map(|initializer| initializer.own_expressions())
                    .collect();
                expressions.extend(condition.iter());
                expressions.extend(incrementors.iter());
                expressions
            }
            Statement::Switch { expression, .. } => vec![expression],
        }
    }

    /// Statements nested inside this one.
    pub fn child_statements(&self) -> Vec<&Statement> {
        match self {
            Statement::Block(block) => block.statements.iter().collect(),
            Statement::If {
                then_branch,
                else_branch,
                ..
            } => {
                let mut children = vec![then_branch.as_ref()];
                children.extend(else_branch.as_deref());
                children
            }
            Statement::For { body, .. }
            | Statement::While { body, .. }
            | Statement::DoWhile { body, .. } => vec![body.as_ref()],
            Statement::Switch { sections, .. } => sections
                .iter()
                .flat_map(|section| section.statements.iter())
                .collect(),
            Statement::Expression(_)
            | Statement::VariableDeclaration { .. }
            | Statement::Return(_)
            | Statement::Break
            | Statement::Continue => vec![],
        }
    }

    /// Visits every expression in this statement and its nested statements.
    pub fn walk_expressions<'a, F>(&'a self, f: &mut F)
    where
        F: FnMut(&'a Expression),
    {
        for expression in self.own_expressions() {
            expression.walk(f);
        }
        for child in self.child_statements() {
            child.walk_expressions(f);
        }
    }
}

impl Block {
    /// Visits every expression in the block, recursively.
    pub fn walk_expressions<'a, F>(&'a self, f: &mut F)
    where
        F: FnMut(&'a Expression),
    {
        for statement in &self.statements {
            statement.walk_expressions(f);
        }
    }
}

#[cfg(test)]
mod test {
    use crate::tree::{BinaryOperator, Block, Expression, ExpressionKind, Statement};
    use crate::types::TypeReference;

    #[test]
    pub fn walk_visits_nested_invocations_in_order() {
        let call = |name: &str| {
            Expression::invoke("Demo.Shader", name, vec![], TypeReference::float())
        };
        let body = Block::new(vec![
            Statement::declare("a", TypeReference::float(), Some(call("First"))),
            Statement::if_then(
                Expression::binary(
                    BinaryOperator::Less,
                    call("Second"),
                    Expression::float(1.0),
                    TypeReference::bool(),
                ),
                Statement::Block(Block::new(vec![Statement::Expression(call("Third"))])),
                None,
            ),
        ]);

        let mut seen = vec![];
        body.walk_expressions(&mut |expression| {
            if let ExpressionKind::Invocation { method, .. } = &expression.kind {
                seen.push(method.as_str());
            }
        });
        assert_eq!(vec!["First", "Second", "Third"], seen);
    }

    #[test]
    pub fn own_expressions_exclude_bodies() {
        let statement = Statement::While {
            condition: Expression::local("running", TypeReference::bool()),
            body: Box::new(Statement::Expression(Expression::float(2.0))),
        };
        assert_eq!(1, statement.own_expressions().len());
        assert_eq!(1, statement.child_statements().len());
    }
}
