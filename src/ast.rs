//! The VCL AST: the typed representation a parsed (or, here,
//! programmatically constructed) VCL program takes before it reaches
//! the compiler.
//!
//! Building VCL source text into this shape is explicitly out of
//! scope (the lexer/parser is an external collaborator) — callers
//! construct programs directly via the builder-style constructors
//! below, the same way `dsl-core`'s `AstNode` is built up by hand in
//! its own test suite.

use crate::value::Value;

/// Container for an entire VCL program: subroutines plus the four
/// named declaration kinds. All declarations are unique by name
/// within their kind.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub subroutines: Vec<Subroutine>,
    pub acls: Vec<AclDecl>,
    pub backends: Vec<BackendDecl>,
    pub directors: Vec<DirectorDecl>,
    pub tables: Vec<TableDecl>,
    pub penaltyboxes: Vec<String>,
    pub ratecounters: Vec<String>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subroutine(mut self, sub: Subroutine) -> Self {
        self.subroutines.push(sub);
        self
    }

    pub fn with_acl(mut self, acl: AclDecl) -> Self {
        self.acls.push(acl);
        self
    }

    pub fn with_backend(mut self, backend: BackendDecl) -> Self {
        self.backends.push(backend);
        self
    }

    pub fn with_director(mut self, director: DirectorDecl) -> Self {
        self.directors.push(director);
        self
    }

    pub fn with_table(mut self, table: TableDecl) -> Self {
        self.tables.push(table);
        self
    }

    pub fn subroutine(&self, name: &str) -> Option<&Subroutine> {
        self.subroutines.iter().find(|s| s.name == name)
    }
}

/// A formal parameter of a user-defined subroutine.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub type_name: String,
}

impl Param {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// A named VCL procedure: one of the well-known phases, or a
/// user-defined routine.
#[derive(Debug, Clone)]
pub struct Subroutine {
    pub name: String,
    pub body: Vec<Statement>,
    pub params: Vec<Param>,
    pub return_type: Option<String>,
    /// Raw source text, consulted only for label discovery (see
    /// `crate::compiler::resolve_labels`); the compiler otherwise
    /// never parses text.
    pub source_text: Option<String>,
}

impl Subroutine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: Vec::new(),
            params: Vec::new(),
            return_type: None,
            source_text: None,
        }
    }

    pub fn with_body(mut self, body: Vec<Statement>) -> Self {
        self.body = body;
        self
    }

    pub fn with_statement(mut self, statement: Statement) -> Self {
        self.body.push(statement);
        self
    }

    pub fn with_params(mut self, params: Vec<Param>) -> Self {
        self.params = params;
        self
    }

    pub fn with_return_type(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = Some(return_type.into());
        self
    }

    pub fn with_source_text(mut self, text: impl Into<String>) -> Self {
        self.source_text = Some(text.into());
        self
    }
}

/// A `switch` case: either a literal test expression or the `default`
/// arm (test = `None`).
#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub test: Option<Expression>,
    pub body: Vec<Statement>,
    pub fallthrough: bool,
}

impl SwitchCase {
    pub fn case(test: Expression, body: Vec<Statement>) -> Self {
        Self {
            test: Some(test),
            body,
            fallthrough: false,
        }
    }

    pub fn default(body: Vec<Statement>) -> Self {
        Self {
            test: None,
            body,
            fallthrough: false,
        }
    }

    pub fn with_fallthrough(mut self) -> Self {
        self.fallthrough = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompoundOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

#[derive(Debug, Clone)]
pub enum Statement {
    If {
        test: Expression,
        consequent: Vec<Statement>,
        alternate: Vec<Statement>,
    },
    Set {
        target: String,
        operator: CompoundOp,
        value: Expression,
    },
    Unset {
        target: String,
    },
    /// Alias of `Unset`, kept distinct per §3.3 (`remove`).
    Remove {
        target: String,
    },
    Add {
        target: String,
        value: Expression,
    },
    Declare {
        name: String,
        type_name: String,
        initial: Option<Expression>,
    },
    Return {
        action: String,
    },
    Error {
        status: Expression,
        message: Option<Expression>,
    },
    Log {
        message: Expression,
    },
    Synthetic {
        content: Expression,
    },
    SyntheticBase64 {
        encoded: Expression,
    },
    HashData {
        value: Expression,
    },
    Goto {
        label: String,
    },
    Label {
        name: String,
        inner: Option<Box<Statement>>,
    },
    Restart,
    Call {
        name: String,
        args: Vec<Expression>,
    },
    Switch {
        subject: Expression,
        cases: Vec<SwitchCase>,
    },
    Esi,
}

impl Statement {
    pub fn if_stmt(test: Expression, consequent: Vec<Statement>, alternate: Vec<Statement>) -> Self {
        Statement::If {
            test,
            consequent,
            alternate,
        }
    }

    pub fn set(target: impl Into<String>, value: Expression) -> Self {
        Statement::Set {
            target: target.into(),
            operator: CompoundOp::Assign,
            value,
        }
    }

    pub fn set_compound(target: impl Into<String>, operator: CompoundOp, value: Expression) -> Self {
        Statement::Set {
            target: target.into(),
            operator,
            value,
        }
    }

    pub fn unset(target: impl Into<String>) -> Self {
        Statement::Unset {
            target: target.into(),
        }
    }

    pub fn add(target: impl Into<String>, value: Expression) -> Self {
        Statement::Add {
            target: target.into(),
            value,
        }
    }

    pub fn declare(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Statement::Declare {
            name: name.into(),
            type_name: type_name.into(),
            initial: None,
        }
    }

    pub fn declare_with(name: impl Into<String>, type_name: impl Into<String>, initial: Expression) -> Self {
        Statement::Declare {
            name: name.into(),
            type_name: type_name.into(),
            initial: Some(initial),
        }
    }

    pub fn return_action(action: impl Into<String>) -> Self {
        Statement::Return {
            action: action.into(),
        }
    }

    pub fn error(status: Expression, message: Option<Expression>) -> Self {
        Statement::Error { status, message }
    }

    pub fn log(message: Expression) -> Self {
        Statement::Log { message }
    }

    pub fn synthetic(content: Expression) -> Self {
        Statement::Synthetic { content }
    }

    pub fn synthetic_base64(encoded: Expression) -> Self {
        Statement::SyntheticBase64 { encoded }
    }

    pub fn hash_data(value: Expression) -> Self {
        Statement::HashData { value }
    }

    pub fn goto(label: impl Into<String>) -> Self {
        Statement::Goto {
            label: label.into(),
        }
    }

    pub fn label(name: impl Into<String>, inner: Option<Statement>) -> Self {
        Statement::Label {
            name: name.into(),
            inner: inner.map(Box::new),
        }
    }

    pub fn restart() -> Self {
        Statement::Restart
    }

    pub fn call(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Statement::Call {
            name: name.into(),
            args,
        }
    }

    pub fn switch(subject: Expression, cases: Vec<SwitchCase>) -> Self {
        Statement::Switch { subject, cases }
    }

    pub fn esi() -> Self {
        Statement::Esi
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Concat,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    Match,
    NotMatch,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
}

#[derive(Debug, Clone)]
pub enum Expression {
    StringLiteral(String),
    NumberLiteral(f64),
    /// Whether this numeric literal was written without a decimal
    /// point, preserved so the evaluator can round-trip it as an
    /// `Integer` rather than a `Float`.
    IntegerLiteral(i64),
    BoolLiteral(bool),
    RegexLiteral { pattern: String, flags: String },
    Identifier(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Ternary {
        test: Box<Expression>,
        consequent: Box<Expression>,
        alternate: Box<Expression>,
    },
    FunctionCall {
        name: String,
        args: Vec<Expression>,
    },
    MemberAccess {
        object: Box<Expression>,
        property: String,
    },
}

impl Expression {
    pub fn string(s: impl Into<String>) -> Self {
        Expression::StringLiteral(s.into())
    }

    pub fn integer(i: i64) -> Self {
        Expression::IntegerLiteral(i)
    }

    pub fn number(n: f64) -> Self {
        Expression::NumberLiteral(n)
    }

    pub fn boolean(b: bool) -> Self {
        Expression::BoolLiteral(b)
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        Expression::RegexLiteral {
            pattern: pattern.into(),
            flags: String::new(),
        }
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Expression::Identifier(name.into())
    }

    pub fn unary(op: UnaryOp, operand: Expression) -> Self {
        Expression::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn not(operand: Expression) -> Self {
        Self::unary(UnaryOp::Not, operand)
    }

    pub fn neg(operand: Expression) -> Self {
        Self::unary(UnaryOp::Neg, operand)
    }

    pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Self {
        Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn ternary(test: Expression, consequent: Expression, alternate: Expression) -> Self {
        Expression::Ternary {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        }
    }

    pub fn call(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::FunctionCall {
            name: name.into(),
            args,
        }
    }

    pub fn member(object: Expression, property: impl Into<String>) -> Self {
        Expression::MemberAccess {
            object: Box::new(object),
            property: property.into(),
        }
    }
}

// ---------------------------------------------------------------------
// Backend, Director, ACL, Table declarations
// ---------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Probe {
    pub path: String,
    pub expected_status: u16,
    pub interval_secs: u32,
    pub timeout_secs: u32,
    pub window: u32,
    pub threshold: u32,
    pub initial: u32,
}

#[derive(Debug, Clone)]
pub struct BackendDecl {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub ssl: bool,
    pub connect_timeout_secs: u32,
    pub between_bytes_timeout_secs: u32,
    pub max_connections: u32,
    pub probe: Option<Probe>,
    pub is_healthy: bool,
}

impl BackendDecl {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            ssl: false,
            connect_timeout_secs: 1,
            between_bytes_timeout_secs: 10,
            max_connections: 200,
            probe: None,
            is_healthy: true,
        }
    }

    pub fn with_ssl(mut self, ssl: bool) -> Self {
        self.ssl = ssl;
        self
    }

    pub fn with_probe(mut self, probe: Probe) -> Self {
        self.probe = Some(probe);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectorType {
    Random,
    Hash,
    Client,
    Fallback,
    Chash,
}

#[derive(Debug, Clone)]
pub struct DirectorMember {
    pub backend: String,
    pub weight: u32,
}

#[derive(Debug, Clone)]
pub struct DirectorDecl {
    pub name: String,
    pub kind: DirectorType,
    pub members: Vec<DirectorMember>,
    pub quorum: u32,
    pub retries: u32,
}

impl DirectorDecl {
    pub fn new(name: impl Into<String>, kind: DirectorType) -> Self {
        Self {
            name: name.into(),
            kind,
            members: Vec::new(),
            quorum: 0,
            retries: 1,
        }
    }

    pub fn with_member(mut self, backend: impl Into<String>, weight: u32) -> Self {
        self.members.push(DirectorMember {
            backend: backend.into(),
            weight,
        });
        self
    }
}

#[derive(Debug, Clone)]
pub struct AclEntry {
    pub ip: String,
    pub prefix_len: Option<u8>,
}

#[derive(Debug, Clone)]
pub struct AclDecl {
    pub name: String,
    pub entries: Vec<AclEntry>,
}

impl AclDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    pub fn with_entry(mut self, ip: impl Into<String>, prefix_len: Option<u8>) -> Self {
        self.entries.push(AclEntry {
            ip: ip.into(),
            prefix_len,
        });
        self
    }
}

#[derive(Debug, Clone)]
pub struct TableDecl {
    pub name: String,
    pub entries: Vec<(String, Value)>,
}

impl TableDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    pub fn with_entry(mut self, key: impl Into<String>, value: Value) -> Self {
        self.entries.push((key.into(), value));
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_builder_round_trip() {
        let program = Program::new()
            .with_acl(AclDecl::new("t").with_entry("192.168.0.0", Some(24)))
            .with_subroutine(
                Subroutine::new("vcl_recv").with_statement(Statement::return_action("lookup")),
            );

        assert_eq!(program.acls.len(), 1);
        assert!(program.subroutine("vcl_recv").is_some());
        assert!(program.subroutine("vcl_fetch").is_none());
    }

    #[test]
    fn table_lookup() {
        let table = TableDecl::new("countries")
            .with_entry("US", Value::string("United States"))
            .with_entry("FR", Value::string("France"));

        assert_eq!(
            table.get("US"),
            Some(&Value::String("United States".to_string()))
        );
        assert!(table.get("DE").is_none());
    }
}
