//! Tree-walking evaluation of statements and expressions

use std::rc::Rc;

use tether_sdk::{ScriptResult, ScriptValue};

use crate::ast::{BinaryOp, Expr, LogicalOp, Stmt, StmtKind, UnaryOp};
use crate::builtins::number_to_string;
use crate::engine::TestEngine;
use crate::heap::{ObjectKind, Scope};

/// How a statement list finished
pub(crate) enum Completion {
    /// Ran to the end; carries the last expression value
    Normal(Option<ScriptValue>),
    /// Hit `return`
    Return(ScriptValue),
}

impl TestEngine {
    // ========================================================================
    // Statements
    // ========================================================================

    pub(crate) fn exec_block(&self, statements: &[Stmt], scope: &Rc<Scope>, this: &ScriptValue) -> ScriptResult<Completion> {
        self.hoist(statements, scope);
        let mut last = None;
        for statement in statements {
            match self.exec(statement, scope, this)? {
                Completion::Normal(Some(value)) => last = Some(value),
                Completion::Normal(None) => {}
                done @ Completion::Return(_) => return Ok(done),
            }
        }
        Ok(Completion::Normal(last))
    }

    /// Bind function declarations before the block runs
    fn hoist(&self, statements: &[Stmt], scope: &Rc<Scope>) {
        for statement in statements {
            if let StmtKind::Function(def) = &statement.kind {
                if let Some(name) = &def.name {
                    let closure = self.make_closure(Rc::clone(def), Rc::clone(scope), self.source_id());
                    scope.define(name, ScriptValue::Object(closure));
                }
            }
        }
    }

    fn exec(&self, statement: &Stmt, scope: &Rc<Scope>, this: &ScriptValue) -> ScriptResult<Completion> {
        let explicit_break = matches!(statement.kind, StmtKind::Debugger);
        self.enter_statement(statement.line, statement.column, explicit_break);

        match &statement.kind {
            StmtKind::Var(declarations) => {
                for (name, init) in declarations {
                    match init {
                        Some(init) => {
                            let value = self.eval(init, scope, this)?;
                            scope.define(name, value);
                        }
                        None => {
                            if scope.lookup(name).is_none() {
                                scope.define(name, ScriptValue::Undefined);
                            }
                        }
                    }
                }
                Ok(Completion::Normal(None))
            }
            StmtKind::Expr(expr) => Ok(Completion::Normal(Some(self.eval(expr, scope, this)?))),
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr, scope, this)?,
                    None => ScriptValue::Undefined,
                };
                Ok(Completion::Return(value))
            }
            StmtKind::Throw(expr) => {
                let value = self.eval(expr, scope, this)?;
                self.report_exception(&value);
                Err(value)
            }
            StmtKind::If {
                test,
                then,
                otherwise,
            } => {
                let test = self.eval(test, scope, this)?;
                if truthy(&test) {
                    self.exec(then, scope, this)
                } else if let Some(otherwise) = otherwise {
                    self.exec(otherwise, scope, this)
                } else {
                    Ok(Completion::Normal(None))
                }
            }
            StmtKind::Block(statements) => self.exec_block(statements, scope, this),
            StmtKind::Try {
                body,
                param,
                handler,
                finalizer,
            } => {
                let mut result = self.exec_block(body, scope, this);
                if let (Err(exception), Some(handler)) = (&result, handler) {
                    let catch_scope = Scope::child(scope);
                    if let Some(param) = param {
                        catch_scope.define(param, exception.clone());
                    }
                    result = self.exec_block(handler, &catch_scope, this);
                }
                if let Some(finalizer) = finalizer {
                    if let Completion::Return(value) = self.exec_block(finalizer, scope, this)? {
                        return Ok(Completion::Return(value));
                    }
                }
                result
            }
            StmtKind::Function(_) | StmtKind::Debugger | StmtKind::Empty => Ok(Completion::Normal(None)),
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    pub(crate) fn eval(&self, expr: &Expr, scope: &Rc<Scope>, this: &ScriptValue) -> ScriptResult<ScriptValue> {
        match expr {
            Expr::Number(n) => Ok(ScriptValue::Number(*n)),
            Expr::String(s) => Ok(ScriptValue::String(s.clone())),
            Expr::Bool(b) => Ok(ScriptValue::Bool(*b)),
            Expr::Null => Ok(ScriptValue::Null),
            Expr::This => Ok(this.clone()),
            Expr::Ident(name) => scope
                .lookup(name)
                .ok_or_else(|| self.throw_error("ReferenceError", format!("{} is not defined", name))),
            Expr::Array(items) => {
                let items = items
                    .iter()
                    .map(|item| self.eval(item, scope, this))
                    .collect::<ScriptResult<Vec<_>>>()?;
                Ok(ScriptValue::Object(
                    self.alloc(ObjectKind::Array(items), self.realm.array_prototype),
                ))
            }
            Expr::Object(entries) => {
                let object = self.alloc(ObjectKind::Plain, self.realm.object_prototype);
                for (key, value) in entries {
                    let value = self.eval(value, scope, this)?;
                    self.put_member(object, key, value, None)?;
                }
                Ok(ScriptValue::Object(object))
            }
            Expr::Function(def) => Ok(ScriptValue::Object(self.make_closure(
                Rc::clone(def),
                Rc::clone(scope),
                self.source_id(),
            ))),
            Expr::Member(base, name) => {
                let base = self.eval(base, scope, this)?;
                self.get_value(&base, name)
            }
            Expr::Index(base, index) => {
                let base = self.eval(base, scope, this)?;
                let key = self.eval(index, scope, this)?;
                self.get_value(&base, &self.property_key(&key))
            }
            Expr::Call(callee, args) => self.eval_call(callee, args, scope, this),
            Expr::New(callee, args) => {
                let function = self.eval(callee, scope, this)?;
                let args = self.eval_args(args, scope, this)?;
                self.construct(&function, &args)
            }
            Expr::Unary(op, operand) => self.eval_unary(*op, operand, scope, this),
            Expr::Binary(op, left, right) => {
                let left = self.eval(left, scope, this)?;
                let right = self.eval(right, scope, this)?;
                self.binary(*op, &left, &right)
            }
            Expr::Logical(op, left, right) => {
                let left = self.eval(left, scope, this)?;
                match (op, truthy(&left)) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(left),
                    _ => self.eval(right, scope, this),
                }
            }
            Expr::Assign(target, value) => self.eval_assign(target, value, scope, this),
        }
    }

    fn eval_args(&self, args: &[Expr], scope: &Rc<Scope>, this: &ScriptValue) -> ScriptResult<Vec<ScriptValue>> {
        args.iter().map(|arg| self.eval(arg, scope, this)).collect()
    }

    fn eval_call(&self, callee: &Expr, args: &[Expr], scope: &Rc<Scope>, this: &ScriptValue) -> ScriptResult<ScriptValue> {
        let (function, receiver) = match callee {
            Expr::Member(base, name) => {
                let base = self.eval(base, scope, this)?;
                (self.get_value(&base, name)?, base)
            }
            Expr::Index(base, index) => {
                let base = self.eval(base, scope, this)?;
                let key = self.eval(index, scope, this)?;
                (self.get_value(&base, &self.property_key(&key))?, base)
            }
            other => (self.eval(other, scope, this)?, ScriptValue::Undefined),
        };
        let args = self.eval_args(args, scope, this)?;

        match function {
            ScriptValue::Object(handle) if self.is_callable(handle) => self.call(handle, &receiver, &args),
            _ => Err(self.throw_error(
                "TypeError",
                format!("{} is not a function", describe(callee)),
            )),
        }
    }

    fn eval_unary(&self, op: UnaryOp, operand: &Expr, scope: &Rc<Scope>, this: &ScriptValue) -> ScriptResult<ScriptValue> {
        if let (UnaryOp::Typeof, Expr::Ident(name)) = (op, operand) {
            if scope.lookup(name).is_none() {
                return Ok(ScriptValue::String("undefined".to_string()));
            }
        }
        let value = self.eval(operand, scope, this)?;
        Ok(match op {
            UnaryOp::Not => ScriptValue::Bool(!truthy(&value)),
            UnaryOp::Negate => ScriptValue::Number(-self.to_number(&value)),
            UnaryOp::Plus => ScriptValue::Number(self.to_number(&value)),
            UnaryOp::Typeof => ScriptValue::String(self.type_of(&value).to_string()),
        })
    }

    fn eval_assign(&self, target: &Expr, value: &Expr, scope: &Rc<Scope>, this: &ScriptValue) -> ScriptResult<ScriptValue> {
        match target {
            Expr::Ident(name) => {
                let value = self.eval(value, scope, this)?;
                if !scope.assign(name, value.clone()) {
                    self.globals.define(name, value.clone());
                }
                Ok(value)
            }
            Expr::Member(base, name) => {
                let base = self.eval(base, scope, this)?;
                let value = self.eval(value, scope, this)?;
                self.put_value(&base, name, value.clone())?;
                Ok(value)
            }
            Expr::Index(base, index) => {
                let base = self.eval(base, scope, this)?;
                let key = self.eval(index, scope, this)?;
                let value = self.eval(value, scope, this)?;
                self.put_value(&base, &self.property_key(&key), value.clone())?;
                Ok(value)
            }
            _ => Err(self.throw_error("SyntaxError", "Invalid left-hand side in assignment")),
        }
    }

    fn binary(&self, op: BinaryOp, left: &ScriptValue, right: &ScriptValue) -> ScriptResult<ScriptValue> {
        let number = |f: fn(f64, f64) -> f64| ScriptValue::Number(f(self.to_number(left), self.to_number(right)));
        Ok(match op {
            BinaryOp::Add => {
                let left = self.to_primitive(left);
                let right = self.to_primitive(right);
                if matches!(left, ScriptValue::String(_)) || matches!(right, ScriptValue::String(_)) {
                    ScriptValue::String(self.display(&left) + &self.display(&right))
                } else {
                    ScriptValue::Number(self.to_number(&left) + self.to_number(&right))
                }
            }
            BinaryOp::Sub => number(|a, b| a - b),
            BinaryOp::Mul => number(|a, b| a * b),
            BinaryOp::Div => number(|a, b| a / b),
            BinaryOp::Rem => number(|a, b| a % b),
            BinaryOp::StrictEq => ScriptValue::Bool(left == right),
            BinaryOp::StrictNe => ScriptValue::Bool(left != right),
            BinaryOp::LooseEq => ScriptValue::Bool(self.loose_equals(left, right)),
            BinaryOp::LooseNe => ScriptValue::Bool(!self.loose_equals(left, right)),
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
                ScriptValue::Bool(self.compare(op, left, right))
            }
            BinaryOp::In => match right {
                ScriptValue::Object(object) => ScriptValue::Bool(self.has_member(*object, &self.property_key(left))),
                _ => {
                    return Err(self.throw_error(
                        "TypeError",
                        format!("Cannot use 'in' operator to search for '{}'", self.display(left)),
                    ))
                }
            },
        })
    }

    fn compare(&self, op: BinaryOp, left: &ScriptValue, right: &ScriptValue) -> bool {
        let left = self.to_primitive(left);
        let right = self.to_primitive(right);
        if let (ScriptValue::String(a), ScriptValue::String(b)) = (&left, &right) {
            return match op {
                BinaryOp::Lt => a < b,
                BinaryOp::Gt => a > b,
                BinaryOp::Le => a <= b,
                _ => a >= b,
            };
        }
        let (a, b) = (self.to_number(&left), self.to_number(&right));
        match op {
            BinaryOp::Lt => a < b,
            BinaryOp::Gt => a > b,
            BinaryOp::Le => a <= b,
            _ => a >= b,
        }
    }

    fn loose_equals(&self, left: &ScriptValue, right: &ScriptValue) -> bool {
        match (left, right) {
            (a, b) if a.is_nullish() || b.is_nullish() => a.is_nullish() && b.is_nullish(),
            (ScriptValue::Object(a), ScriptValue::Object(b)) => a == b,
            (ScriptValue::Object(_), _) => self.loose_equals(&self.to_primitive(left), right),
            (_, ScriptValue::Object(_)) => self.loose_equals(left, &self.to_primitive(right)),
            (ScriptValue::String(a), ScriptValue::String(b)) => a == b,
            _ => self.to_number(left) == self.to_number(right),
        }
    }

    // ========================================================================
    // Conversions
    // ========================================================================

    fn to_primitive(&self, value: &ScriptValue) -> ScriptValue {
        match value {
            ScriptValue::Object(_) => ScriptValue::String(self.display(value)),
            other => other.clone(),
        }
    }

    pub(crate) fn property_key(&self, key: &ScriptValue) -> String {
        match key {
            ScriptValue::Number(n) => number_to_string(*n),
            ScriptValue::String(s) => s.clone(),
            other => self.display(other),
        }
    }

    pub(crate) fn type_of(&self, value: &ScriptValue) -> &'static str {
        match value {
            ScriptValue::Null => "object",
            ScriptValue::Object(handle) if self.is_callable(*handle) => "function",
            other => other.type_name(),
        }
    }
}

/// `Boolean(value)`
pub(crate) fn truthy(value: &ScriptValue) -> bool {
    match value {
        ScriptValue::Undefined | ScriptValue::Null => false,
        ScriptValue::Bool(b) => *b,
        ScriptValue::Number(n) => *n != 0.0 && !n.is_nan(),
        ScriptValue::String(s) => !s.is_empty(),
        ScriptValue::Object(_) => true,
    }
}

/// Source-like rendering of a callee, for error messages
fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.clone(),
        Expr::Member(base, name) => format!("{}.{}", describe(base), name),
        Expr::This => "this".to_string(),
        Expr::Call(callee, _) => format!("{}(...)", describe(callee)),
        _ => "expression".to_string(),
    }
}
