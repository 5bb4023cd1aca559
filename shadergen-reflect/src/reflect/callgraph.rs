use crate::error::{GraphErrorKind, ShaderGenError};
use shadergen_common::map::FastHashMap;
use shadergen_program::{
    ExpressionKind, MethodId, ResolvedProgram, SourceLocation, CONSTRUCTOR_NAME,
};
use tracing::trace;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum NodeState {
    Expanding,
    Complete,
}

/// A call site inside a function body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub target: MethodId,
    pub location: Option<SourceLocation>,
}

/// Resolves the in-program functions called by `caller`, in source order, without duplicates.
///
/// Calls to types the program does not declare, and to methods declared without a
/// body, are intrinsics and are not part of the graph.
pub fn call_sites(
    program: &ResolvedProgram,
    caller: &MethodId,
) -> Result<Vec<CallSite>, ShaderGenError> {
    let method = program
        .get_method(caller)
        .ok_or_else(|| GraphErrorKind::UnresolvedCall(caller.clone()))?;
    let Some(body) = &method.body else {
        return Err(ShaderGenError::from(GraphErrorKind::MissingBody(caller.clone()))
            .at(method.location.as_ref()));
    };

    let mut candidates = Vec::new();
    body.walk_expressions(&mut |expression| match &expression.kind {
        ExpressionKind::Invocation {
            declaring_type,
            method,
            ..
        } => candidates.push(CallSite {
            target: MethodId::new(declaring_type.clone(), method.clone()),
            location: expression.location.clone(),
        }),
        ExpressionKind::ObjectCreation { .. } if expression.ty.is_struct() => {
            candidates.push(CallSite {
                target: MethodId::new(expression.ty.name.clone(), CONSTRUCTOR_NAME),
                location: expression.location.clone(),
            })
        }
        _ => {}
    });

    let mut sites: Vec<CallSite> = Vec::new();
    for site in candidates {
        let Some(declaring_type) = program.get_type(&site.target.declaring_type) else {
            continue;
        };
        match declaring_type.method(&site.target.name) {
            Some(callee) if callee.body.is_none() => continue,
            Some(_) => {}
            // Default construction of a structure without a user constructor.
            None if site.target.is_constructor() => continue,
            None => {
                return Err(ShaderGenError::from(GraphErrorKind::UnresolvedCall(
                    site.target.clone(),
                ))
                .at(site.location.as_ref()))
            }
        }
        if !sites.iter().any(|existing| existing.target == site.target) {
            sites.push(site);
        }
    }
    Ok(sites)
}

/// Depth-first ordering of the functions reachable from an entry point.
///
/// Every function appears after all of its callees, and the entry point is last.
pub struct CallGraph<'a> {
    program: &'a ResolvedProgram,
    states: FastHashMap<MethodId, NodeState>,
    order: Vec<MethodId>,
}

impl<'a> CallGraph<'a> {
    pub fn new(program: &'a ResolvedProgram) -> Self {
        CallGraph {
            program,
            states: FastHashMap::default(),
            order: Vec::new(),
        }
    }

    /// Orders the functions reachable from `entry`, callees first.
    pub fn ordered_functions(
        program: &'a ResolvedProgram,
        entry: &MethodId,
    ) -> Result<Vec<MethodId>, ShaderGenError> {
        let mut graph = CallGraph::new(program);
        graph.visit(entry)?;
        trace!(entry = %entry, functions = graph.order.len(), "ordered call graph");
        Ok(graph.order)
    }

    fn visit(&mut self, node: &MethodId) -> Result<(), ShaderGenError> {
        self.states.insert(node.clone(), NodeState::Expanding);

        for site in call_sites(self.program, node)? {
            if &site.target == node {
                return Err(ShaderGenError::from(GraphErrorKind::Recursion(node.clone()))
                    .at(site.location.as_ref()));
            }
            match self.states.get(&site.target) {
                Some(NodeState::Complete) => continue,
                Some(NodeState::Expanding) => {
                    return Err(ShaderGenError::from(GraphErrorKind::Cycle {
                        caller: node.clone(),
                        callee: site.target,
                    })
                    .at(site.location.as_ref()))
                }
                None => self.visit(&site.target)?,
            }
        }

        self.states.insert(node.clone(), NodeState::Complete);
        self.order.push(node.clone());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use shadergen_program::{
        Block, Expression, MethodDeclaration, Statement, TypeDeclaration, TypeReference,
    };

    const SHADER: &str = "Demo.Shader";

    fn call(method: &str) -> Statement {
        Expression::invoke(SHADER, method, vec![], TypeReference::void()).into()
    }

    fn function(name: &str, calls: &[&str]) -> MethodDeclaration {
        MethodDeclaration::new(name, TypeReference::void())
            .with_body(Block::new(calls.iter().map(|c| call(c)).collect()))
    }

    fn program(functions: Vec<MethodDeclaration>) -> ResolvedProgram {
        let mut shader = TypeDeclaration::class(SHADER);
        for function in functions {
            shader = shader.with_method(function);
        }
        ResolvedProgram::new().with_type(shader).unwrap()
    }

    fn id(name: &str) -> MethodId {
        MethodId::new(SHADER, name)
    }

    #[test]
    pub fn callees_precede_callers() {
        let program = program(vec![
            function("Main", &["A", "B"]),
            function("A", &["C"]),
            function("B", &["C", "A"]),
            function("C", &[]),
        ]);

        let order = CallGraph::ordered_functions(&program, &id("Main")).unwrap();
        assert_eq!(vec![id("C"), id("A"), id("B"), id("Main")], order);
    }

    #[test]
    pub fn intrinsics_are_not_graph_nodes() {
        let program = program(vec![MethodDeclaration::new("Main", TypeReference::void())
            .with_body(Block::new(vec![Expression::invoke(
                "Vector4",
                "Dot",
                vec![],
                TypeReference::float(),
            )
            .into()]))]);

        let order = CallGraph::ordered_functions(&program, &id("Main")).unwrap();
        assert_eq!(vec![id("Main")], order);
    }

    #[test]
    pub fn rejects_direct_recursion() {
        let program = program(vec![function("Main", &["Main"])]);
        let err = CallGraph::ordered_functions(&program, &id("Main")).unwrap_err();
        assert_eq!(
            ShaderGenError::Graph(GraphErrorKind::Recursion(id("Main"))),
            err
        );
    }

    #[test]
    pub fn rejects_cycles() {
        let program = program(vec![
            function("Main", &["A"]),
            function("A", &["B"]),
            function("B", &["A"]),
        ]);
        let err = CallGraph::ordered_functions(&program, &id("Main")).unwrap_err();
        assert_eq!(
            ShaderGenError::Graph(GraphErrorKind::Cycle {
                caller: id("B"),
                callee: id("A"),
            }),
            err
        );
        assert_eq!(
            "call graph error: cyclical call graph involving `Demo.Shader.B` and `Demo.Shader.A`",
            err.to_string()
        );
    }

    #[test]
    pub fn rejects_long_cycles() {
        let program = program(vec![
            function("Main", &["A"]),
            function("A", &["B"]),
            function("B", &["C"]),
            function("C", &["D"]),
            function("D", &["A"]),
        ]);
        let err = CallGraph::ordered_functions(&program, &id("Main")).unwrap_err();
        assert_eq!(
            ShaderGenError::Graph(GraphErrorKind::Cycle {
                caller: id("D"),
                callee: id("A"),
            }),
            err
        );
    }

    #[test]
    pub fn rejects_cycles_through_the_entry_point() {
        let program = program(vec![function("Main", &["A"]), function("A", &["Main"])]);
        let err = CallGraph::ordered_functions(&program, &id("Main")).unwrap_err();
        assert_eq!(
            ShaderGenError::Graph(GraphErrorKind::Cycle {
                caller: id("A"),
                callee: id("Main"),
            }),
            err
        );
    }

    #[test]
    pub fn rejects_unresolved_calls() {
        let program = program(vec![function("Main", &["Missing"])]);
        let err = CallGraph::ordered_functions(&program, &id("Main")).unwrap_err();
        assert_eq!(
            ShaderGenError::Graph(GraphErrorKind::UnresolvedCall(id("Missing"))),
            err
        );
    }

    #[test]
    pub fn user_constructors_are_callees() {
        let vertex = TypeReference::structure("Demo.Vertex");
        let program = ResolvedProgram::new()
            .with_type(
                TypeDeclaration::structure("Demo.Vertex").with_method(
                    MethodDeclaration::constructor(vertex.clone()).with_body(Block::default()),
                ),
            )
            .unwrap()
            .with_type(
                TypeDeclaration::class(SHADER).with_method(
                    MethodDeclaration::new("Main", TypeReference::void()).with_body(Block::new(
                        vec![Expression::construct(vertex, vec![]).into()],
                    )),
                ),
            )
            .unwrap();

        let order = CallGraph::ordered_functions(&program, &id("Main")).unwrap();
        assert_eq!(vec![MethodId::new("Demo.Vertex", "ctor"), id("Main")], order);
    }
}
