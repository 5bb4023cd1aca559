use crate::back::swizzle::recognize_swizzle;
use crate::back::{EmittedFunction, InvocationArgument, ShaderBackend};
use crate::error::{GraphErrorKind, LayoutErrorKind, ShaderGenError, StageErrorKind};
use crate::reflect::model::ShaderFunction;
use crate::reflect::resources::{ResourceDefinition, ResourceKind};
use crate::reflect::semantics::{
    intrinsic_stages, is_builtins_type, BuiltinVariable, FunctionUsage,
};
use shadergen_common::ShaderStage;
use shadergen_program::{
    resource, short_name, Argument, AssignmentOperator, Expression, ExpressionKind,
    MethodDeclaration, MethodId, ParameterDeclaration, ResolvedProgram, Statement, SwitchLabel,
    Symbol, SymbolKind, TypeKind, TypeReference, CONSTRUCTOR_NAME,
};
use std::collections::VecDeque;
use tracing::trace;

const INDENT: &str = "    ";

/// Translates function bodies into backend source text for one stage.
///
/// Stage legality of builtins and intrinsics is checked while walking, and the
/// builtins, features and resources each function touches are recorded.
pub struct FunctionEmitter<'a> {
    backend: &'a dyn ShaderBackend,
    program: &'a ResolvedProgram,
    resources: &'a [ResourceDefinition],
    stage: ShaderStage,

    output: String,
    indent: usize,
    usage: FunctionUsage,
    resources_used: Vec<String>,
    in_constructor: bool,
    discards: Vec<VecDeque<String>>,
    next_discard: u32,
}

impl<'a> FunctionEmitter<'a> {
    pub fn new(
        backend: &'a dyn ShaderBackend,
        program: &'a ResolvedProgram,
        resources: &'a [ResourceDefinition],
        stage: ShaderStage,
    ) -> Self {
        FunctionEmitter {
            backend,
            program,
            resources,
            stage,
            output: String::new(),
            indent: 0,
            usage: FunctionUsage::empty(),
            resources_used: Vec::new(),
            in_constructor: false,
            discards: Vec::new(),
            next_discard: 0,
        }
    }

    /// Emits the full definition of a function.
    pub fn emit(&mut self, id: &MethodId) -> Result<EmittedFunction, ShaderGenError> {
        let method = self
            .program
            .get_method(id)
            .ok_or_else(|| GraphErrorKind::UnresolvedCall(id.clone()))?;
        let body = method.body.as_ref().ok_or_else(|| {
            ShaderGenError::from(GraphErrorKind::MissingBody(id.clone()))
                .at(method.location.as_ref())
        })?;

        self.output.clear();
        self.indent = 0;
        self.usage = FunctionUsage::empty();
        self.resources_used.clear();
        self.discards.clear();
        self.next_discard = 0;
        self.in_constructor = method.is_constructor;

        let signature = self
            .signature(id, method)
            .map_err(|e| e.at(method.location.as_ref()))?;
        self.line(&signature);

        let (prologue, epilogue) = if method.is_constructor {
            let ty = self.backend.map_type(&method.return_type)?;
            let target = self.backend.constructor_target();
            (
                Some(format!("{ty} {target};")),
                Some(format!("return {target};")),
            )
        } else {
            (None, None)
        };
        self.emit_scope(&body.statements, prologue, epilogue)?;

        let mut function = ShaderFunction::from_declaration(&id.declaring_type, method);
        function.mark_usage(self.usage);
        trace!(function = %id, stage = %self.stage, usage = ?self.usage, "emitted function");

        Ok(EmittedFunction {
            function,
            text: std::mem::take(&mut self.output),
            resources_used: std::mem::take(&mut self.resources_used),
        })
    }

    fn signature(&self, id: &MethodId, method: &MethodDeclaration) -> Result<String, ShaderGenError> {
        let return_type = self.backend.map_type(&method.return_type)?;
        let parameters = method
            .parameters
            .iter()
            .map(|parameter| self.parameter(parameter))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(format!(
            "{return_type} {}({})",
            self.backend.format_function_name(id),
            parameters.join(", ")
        ))
    }

    fn parameter(&self, parameter: &ParameterDeclaration) -> Result<String, ShaderGenError> {
        let keyword = self.backend.parameter_direction_keyword(parameter.direction);
        let ty = self.backend.map_type(&parameter.ty)?;
        let name = self.backend.correct_identifier(&parameter.name);
        if keyword.is_empty() {
            Ok(format!("{ty} {name}"))
        } else {
            Ok(format!("{keyword} {ty} {name}"))
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.output.push_str(INDENT);
        }
        self.output.push_str(text);
        self.output.push('\n');
    }

    /// Emits a braced scope. Inline output variables and discarded outputs of the
    /// scope's own statements are declared at the top of the scope.
    fn emit_scope(
        &mut self,
        statements: &[Statement],
        prologue: Option<String>,
        epilogue: Option<String>,
    ) -> Result<(), ShaderGenError> {
        self.line("{");
        self.indent += 1;
        if let Some(prologue) = prologue {
            self.line(&prologue);
        }

        let mut outs: Vec<(&str, &TypeReference)> = Vec::new();
        let mut discarded: Vec<&TypeReference> = Vec::new();
        for statement in statements {
            for expression in statement.own_expressions() {
                expression.walk(&mut |e| match &e.kind {
                    ExpressionKind::OutVariable { name } => outs.push((name.as_str(), &e.ty)),
                    ExpressionKind::Discard => discarded.push(&e.ty),
                    _ => {}
                });
            }
        }

        let mut declared: Vec<&str> = Vec::new();
        for (name, ty) in outs {
            if declared.contains(&name) {
                continue;
            }
            declared.push(name);
            let declaration = self.declaration(name, ty)?;
            self.line(&format!("{declaration};"));
        }

        let mut queue = VecDeque::with_capacity(discarded.len());
        for ty in discarded {
            let name = format!("_discard{}", self.next_discard);
            self.next_discard += 1;
            let declaration = self.declaration(&name, ty)?;
            self.line(&format!("{declaration};"));
            queue.push_back(name);
        }
        self.discards.push(queue);

        for statement in statements {
            self.emit_statement(statement)?;
        }

        self.discards.pop();
        if let Some(epilogue) = epilogue {
            self.line(&epilogue);
        }
        self.indent -= 1;
        self.line("}");
        Ok(())
    }

    fn emit_embedded(&mut self, statement: &Statement) -> Result<(), ShaderGenError> {
        match statement {
            Statement::Block(block) => self.emit_scope(&block.statements, None, None),
            statement => self.emit_scope(std::slice::from_ref(statement), None, None),
        }
    }

    fn declaration(&self, name: &str, ty: &TypeReference) -> Result<String, ShaderGenError> {
        Ok(format!(
            "{} {}",
            self.backend.map_type(ty)?,
            self.backend.correct_identifier(name)
        ))
    }

    fn emit_statement(&mut self, statement: &Statement) -> Result<(), ShaderGenError> {
        match statement {
            Statement::Block(block) => self.emit_scope(&block.statements, None, None)?,
            Statement::Expression(expression) => {
                let text = self.emit_expression(expression)?;
                self.line(&format!("{text};"));
            }
            Statement::VariableDeclaration { .. } => {
                let text = self.inline_statement(statement)?;
                self.line(&format!("{text};"));
            }
            Statement::Return(None) => self.line("return;"),
            Statement::Return(Some(value)) => {
                let value = self.emit_expression(value)?;
                self.line(&format!("return {value};"));
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition = self.emit_expression(condition)?;
                self.line(&format!("if ({condition})"));
                self.emit_embedded(then_branch)?;
                if let Some(else_branch) = else_branch {
                    self.line("else");
                    self.emit_embedded(else_branch)?;
                }
            }
            Statement::For {
                initializers,
                condition,
                incrementors,
                body,
            } => {
                let initializers = initializers
                    .iter()
                    .map(|initializer| self.inline_statement(initializer))
                    .collect::<Result<Vec<_>, _>>()?;
                let condition = match condition {
                    Some(condition) => self.emit_expression(condition)?,
                    None => String::new(),
                };
                let incrementors = incrementors
                    .iter()
                    .map(|incrementor| self.emit_expression(incrementor))
                    .collect::<Result<Vec<_>, _>>()?;
                self.line(&format!(
                    "for ({}; {}; {})",
                    initializers.join(", "),
                    condition,
                    incrementors.join(", ")
                ));
                self.emit_embedded(body)?;
            }
            Statement::While { condition, body } => {
                let condition = self.emit_expression(condition)?;
                self.line(&format!("while ({condition})"));
                self.emit_embedded(body)?;
            }
            Statement::DoWhile { body, condition } => {
                self.line("do");
                self.emit_embedded(body)?;
                let condition = self.emit_expression(condition)?;
                self.line(&format!("while ({condition});"));
            }
            Statement::Switch {
                expression,
                sections,
            } => {
                let expression = self.emit_expression(expression)?;
                self.line(&format!("switch ({expression})"));
                self.line("{");
                for section in sections {
                    for label in &section.labels {
                        match label {
                            SwitchLabel::Case(value) => {
                                let value = self.backend.format_literal(value);
                                self.line(&format!("case {value}:"));
                            }
                            SwitchLabel::Default => self.line("default:"),
                        }
                    }
                    self.indent += 1;
                    self.emit_scope(&section.statements, None, None)?;
                    self.indent -= 1;
                }
                self.line("}");
            }
            Statement::Break => self.line("break;"),
            Statement::Continue => self.line("continue;"),
        }
        Ok(())
    }

    /// A declaration or expression without its terminator, as used in `for` headers.
    fn inline_statement(&mut self, statement: &Statement) -> Result<String, ShaderGenError> {
        match statement {
            Statement::VariableDeclaration {
                name,
                ty,
                initializer,
            } => {
                let declaration = self.declaration(name, ty)?;
                match initializer {
                    Some(initializer) => {
                        let value = self.emit_expression(initializer)?;
                        Ok(format!("{declaration} = {value}"))
                    }
                    None => Ok(declaration),
                }
            }
            Statement::Expression(expression) => self.emit_expression(expression),
            _ => Ok(String::new()),
        }
    }

    pub fn emit_expression(&mut self, expression: &Expression) -> Result<String, ShaderGenError> {
        self.emit_expression_kind(expression)
            .map_err(|e| e.at(expression.location.as_ref()))
    }

    fn emit_expression_kind(&mut self, expression: &Expression) -> Result<String, ShaderGenError> {
        Ok(match &expression.kind {
            ExpressionKind::Literal(value) => self.backend.format_literal(value),
            ExpressionKind::Identifier(symbol) => self.emit_symbol(symbol)?,
            ExpressionKind::This => self.backend.constructor_target().to_string(),
            ExpressionKind::MemberAccess { target, member } => {
                self.emit_member_access(target, member)?
            }
            ExpressionKind::ElementAccess { target, index } => {
                let image = self.emit_expression(target)?;
                let index = self.argument_of(index)?;
                if is_storage_image(&target.ty) {
                    self.backend
                        .format_image_load(&image, &index, &expression.ty)
                } else {
                    format!("{image}[{}]", index.text)
                }
            }
            ExpressionKind::Binary { op, left, right } => {
                let left = self.argument_of(left)?;
                let right = self.argument_of(right)?;
                self.backend.format_binary_expression(&left, *op, &right)
            }
            ExpressionKind::Unary { op, operand } => {
                let operand = self.emit_expression(operand)?;
                if op.is_postfix() {
                    format!("{operand}{}", op.symbol())
                } else {
                    format!("{}{operand}", op.symbol())
                }
            }
            ExpressionKind::Assignment { op, target, value } => {
                self.emit_assignment(*op, target, value)?
            }
            ExpressionKind::Invocation {
                declaring_type,
                method,
                arguments,
            } => self.emit_invocation(declaring_type, method, arguments)?,
            ExpressionKind::ObjectCreation { arguments } => {
                self.emit_construction(&expression.ty, arguments)?
            }
            ExpressionKind::Conditional {
                condition,
                when_true,
                when_false,
            } => {
                let condition = self.emit_expression(condition)?;
                let when_true = self.emit_expression(when_true)?;
                let when_false = self.emit_expression(when_false)?;
                format!("({condition} ? {when_true} : {when_false})")
            }
            ExpressionKind::Cast { operand } => {
                let operand = self.emit_expression(operand)?;
                self.backend.format_cast(&expression.ty, &operand)?
            }
            ExpressionKind::Parenthesized(inner) => format!("({})", self.emit_expression(inner)?),
            ExpressionKind::OutVariable { name } => self.backend.correct_identifier(name),
            ExpressionKind::Discard => self.next_discarded_output(),
        })
    }

    fn argument_of(&mut self, expression: &Expression) -> Result<InvocationArgument, ShaderGenError> {
        Ok(InvocationArgument::new(
            self.emit_expression(expression)?,
            expression.ty.clone(),
        ))
    }

    fn arguments_of(&mut self, arguments: &[Argument]) -> Result<Vec<InvocationArgument>, ShaderGenError> {
        arguments
            .iter()
            .map(|argument| self.argument_of(&argument.expression))
            .collect()
    }

    fn next_discarded_output(&mut self) -> String {
        if let Some(name) = self.discards.last_mut().and_then(VecDeque::pop_front) {
            return name;
        }
        let name = format!("_discard{}", self.next_discard);
        self.next_discard += 1;
        name
    }

    fn emit_symbol(&mut self, symbol: &Symbol) -> Result<String, ShaderGenError> {
        match symbol.kind {
            SymbolKind::Local | SymbolKind::Parameter | SymbolKind::Method => {
                Ok(self.backend.correct_identifier(&symbol.name))
            }
            SymbolKind::Type => Ok(self
                .backend
                .correct_identifier(short_name(&symbol.name))),
            SymbolKind::Field | SymbolKind::Property => {
                if is_builtins_type(&symbol.declaring_type) {
                    return self.emit_builtin_variable(&symbol.name);
                }
                if let Some(constant) = self
                    .program
                    .get_type(&symbol.declaring_type)
                    .and_then(|ty| ty.field(&symbol.name))
                    .and_then(|field| field.constant.as_ref())
                {
                    return Ok(self.backend.format_literal(constant));
                }
                if let Some(resource) = self.resource(symbol) {
                    self.use_resource(resource);
                } else if self.program.get_type(&symbol.declaring_type).is_none() {
                    if let Some(member) = self
                        .backend
                        .format_static_member(&symbol.declaring_type, &symbol.name)
                    {
                        return Ok(member);
                    }
                }
                Ok(self.backend.correct_identifier(&symbol.name))
            }
        }
    }

    fn emit_member_access(
        &mut self,
        target: &Expression,
        member: &Symbol,
    ) -> Result<String, ShaderGenError> {
        let is_member = matches!(member.kind, SymbolKind::Field | SymbolKind::Property);
        if is_member && is_builtins_type(&member.declaring_type) {
            return self.emit_builtin_variable(&member.name);
        }
        match &target.kind {
            ExpressionKind::Identifier(Symbol {
                kind: SymbolKind::Type,
                ..
            }) => return self.emit_symbol(member),
            ExpressionKind::This if !self.in_constructor => return self.emit_symbol(member),
            _ => {}
        }

        let target = self.emit_expression(target)?;
        if self.backend.is_indexer_access(member) {
            Ok(format!("{target}{}", self.backend.map_identifier(member)))
        } else {
            Ok(format!("{target}.{}", self.backend.map_identifier(member)))
        }
    }

    fn emit_builtin_variable(&mut self, name: &str) -> Result<String, ShaderGenError> {
        let builtin = BuiltinVariable::from_name(name).ok_or_else(|| GraphErrorKind::UnknownIntrinsic {
            declaring_type: shadergen_program::builtin::SHADER_BUILTINS.to_string(),
            method: name.to_string(),
            target: self.backend.name().to_string(),
        })?;
        if !builtin.stages().allows(self.stage) {
            return Err(StageErrorKind::BuiltinOutsideStage {
                builtin: builtin.name().to_string(),
                stage: self.stage,
                allowed: builtin.stages(),
            }
            .into());
        }
        self.usage |= builtin.usage();
        Ok(self.backend.format_builtin_variable(builtin))
    }

    fn emit_assignment(
        &mut self,
        op: AssignmentOperator,
        target: &Expression,
        value: &Expression,
    ) -> Result<String, ShaderGenError> {
        if let ExpressionKind::ElementAccess {
            target: image,
            index,
        } = &target.kind
        {
            if op == AssignmentOperator::Assign && is_storage_image(&image.ty) {
                let image = self.emit_expression(image)?;
                let index = self.argument_of(index)?;
                let value = self.argument_of(value)?;
                return Ok(self.backend.format_image_store(&image, &index, &value));
            }
        }

        let target = self.emit_expression(target)?;
        let value = self.emit_expression(value)?;
        Ok(format!("{target} {} {value}", op.symbol()))
    }

    fn user_function(&self, declaring_type: &str, method: &str) -> Option<MethodId> {
        self.program
            .get_type(declaring_type)
            .and_then(|ty| ty.method(method))
            .filter(|method| method.body.is_some())
            .map(|method| MethodId::new(declaring_type, method.name.clone()))
    }

    fn emit_invocation(
        &mut self,
        declaring_type: &str,
        method: &str,
        arguments: &[Argument],
    ) -> Result<String, ShaderGenError> {
        if let Some(id) = self.user_function(declaring_type, method) {
            let arguments = self.arguments_of(arguments)?;
            return Ok(format!(
                "{}({})",
                self.backend.format_function_name(&id),
                join(&arguments)
            ));
        }

        if let (Some(swizzle), [argument]) = (recognize_swizzle(method, arguments.len()), arguments) {
            let operand = self.emit_expression(&argument.expression)?;
            return Ok(match argument.expression.kind {
                ExpressionKind::Binary { .. }
                | ExpressionKind::Unary { .. }
                | ExpressionKind::Assignment { .. } => format!("({operand}).{swizzle}"),
                _ => format!("{operand}.{swizzle}"),
            });
        }

        if is_builtins_type(declaring_type) {
            let allowed = intrinsic_stages(method);
            if !allowed.allows(self.stage) {
                return Err(StageErrorKind::BuiltinOutsideStage {
                    builtin: format!("{}.{method}", short_name(declaring_type)),
                    stage: self.stage,
                    allowed,
                }
                .into());
            }
            if method == "InterlockedAdd" {
                self.usage |= FunctionUsage::INTERLOCKED_ADD;
            }
        }

        let arguments = self.arguments_of(arguments)?;
        self.backend.format_invocation(declaring_type, method, &arguments)
    }

    fn emit_construction(
        &mut self,
        ty: &TypeReference,
        arguments: &[Argument],
    ) -> Result<String, ShaderGenError> {
        if ty.is_struct() {
            if let Some(id) = self.user_function(&ty.name, CONSTRUCTOR_NAME) {
                let arguments = self.arguments_of(arguments)?;
                return Ok(format!(
                    "{}({})",
                    self.backend.format_function_name(&id),
                    join(&arguments)
                ));
            }
        }
        if arguments.is_empty() {
            return self.default_value(ty);
        }
        let arguments = self.arguments_of(arguments)?;
        self.backend.format_construction(ty, &arguments)
    }

    /// The zero value of a type, expanding structures member by member.
    pub fn default_value(&self, ty: &TypeReference) -> Result<String, ShaderGenError> {
        match &ty.kind {
            TypeKind::Struct => {
                let declaration = self
                    .program
                    .get_type(&ty.name)
                    .ok_or_else(|| LayoutErrorKind::UnknownType(ty.name.clone()))?;
                let mut members = Vec::new();
                for field in declaration.instance_fields() {
                    match (field.ty.element_type(), field.attributes.array_size) {
                        (Some(element), Some(count)) => {
                            let value = self.default_value(element)?;
                            let values = vec![value; count as usize];
                            members.push(format!(
                                "{}[{count}]({})",
                                self.backend.map_type(element)?,
                                values.join(", ")
                            ));
                        }
                        (Some(_), None) => {
                            return Err(LayoutErrorKind::MissingArraySize {
                                structure: ty.name.clone(),
                                field: field.name.clone(),
                            }
                            .into())
                        }
                        (None, _) => members.push(self.default_value(&field.ty)?),
                    }
                }
                Ok(format!("{}({})", self.backend.map_type(ty)?, members.join(", ")))
            }
            TypeKind::Enum { underlying } => self.backend.format_default_value(underlying),
            _ => self.backend.format_default_value(ty),
        }
    }

    fn resource(&self, symbol: &Symbol) -> Option<&'a ResourceDefinition> {
        self.resources
            .iter()
            .find(|resource| resource.owner == symbol.declaring_type && resource.name == symbol.name)
    }

    fn use_resource(&mut self, resource: &ResourceDefinition) {
        self.usage |= match resource.kind {
            ResourceKind::StructuredBuffer
            | ResourceKind::RWStructuredBuffer
            | ResourceKind::AtomicBuffer => FunctionUsage::STRUCTURED_BUFFER,
            ResourceKind::RWTexture2D => FunctionUsage::RW_TEXTURE_2D,
            ResourceKind::Texture2DMS => FunctionUsage::TEXTURE_2D_MS,
            _ => FunctionUsage::empty(),
        };
        if !self.resources_used.contains(&resource.name) {
            self.resources_used.push(resource.name.clone());
        }
    }
}

fn is_storage_image(ty: &TypeReference) -> bool {
    short_name(&ty.name) == resource::RW_TEXTURE_2D
}

fn join(arguments: &[InvocationArgument]) -> String {
    arguments
        .iter()
        .map(|argument| argument.text.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
