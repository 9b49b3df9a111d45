//! Verilog IR.

use itertools::Itertools;

use crate::utils::indent;

const INDENT: usize = 4;

/// Module.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Module {
    /// Module name.
    pub name: String,

    /// Port declarations.
    pub port_decls: Vec<PortDeclaration>,

    /// Module items.
    pub module_items: Vec<ModuleItem>,
}

impl ToString for Module {
    fn to_string(&self) -> String {
        format!(
            "`timescale 1ns / 1ps\n\nmodule {} (\n{}\n);\n\n{}\n\nendmodule\n",
            self.name,
            indent(self.port_decls.iter().map(|port_decl| port_decl.to_string()).join(",\n"), INDENT),
            indent(gen_verilog_module(&self.module_items), INDENT)
        )
    }
}

impl Module {
    /// Creates new module without ports and items.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into(), port_decls: Vec::new(), module_items: Vec::new() }
    }

    /// Returns the port declaration with the given name.
    pub fn port(&self, name: &str) -> Option<&PortDeclaration> {
        self.port_decls.iter().find(|port_decl| port_decl.ident() == name)
    }

    /// Names of the modules instantiated by this module, in order of first instantiation.
    pub fn instantiated_modules(&self) -> Vec<&str> {
        fn scan<'a>(items: &'a [ModuleItem], names: &mut Vec<&'a str>) {
            for item in items {
                match item {
                    ModuleItem::ModuleInstantiation(inst) => names.push(&inst.module_name),
                    ModuleItem::Commented(_, items) => scan(items, names),
                    _ => {}
                }
            }
        }

        let mut names = Vec::new();
        scan(&self.module_items, &mut names);
        names.into_iter().unique().collect()
    }
}

/// Module item.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ModuleItem {
    /// Declarations.
    Declarations(Vec<Declaration>),

    /// Continuous assignments.
    ContinuousAssigns(Vec<ContinuousAssign>),

    /// Module instantiation.
    ModuleInstantiation(ModuleInstantiation),

    /// Always construct.
    AlwaysConstruct(String, Vec<Statement>),

    /// Items preceded by a line comment.
    Commented(String, Vec<ModuleItem>),
}

impl ToString for ModuleItem {
    fn to_string(&self) -> String {
        match self {
            ModuleItem::Declarations(decls) => decls.iter().map(|decl| decl.to_string()).join("\n"),
            ModuleItem::ContinuousAssigns(conts) => gen_verilog_conts(conts),
            ModuleItem::ModuleInstantiation(module_inst) => module_inst.to_string(),
            ModuleItem::AlwaysConstruct(event, stmts) => {
                format!(
                    "{} begin\n{}\nend",
                    event,
                    indent(stmts.iter().map(|stmt| stmt.to_string()).join("\n"), INDENT)
                )
            }
            ModuleItem::Commented(comment, items) => {
                format!("// {}\n{}", comment, gen_verilog_module(items))
            }
        }
    }
}

impl ModuleItem {
    /// Clocked process on the rising edge of `clk`.
    pub fn always_ff(stmts: Vec<Statement>) -> Self { ModuleItem::AlwaysConstruct("always @(posedge clk)".to_string(), stmts) }
}

/// Generates Verilog code for module items.
pub fn gen_verilog_module(module: &[ModuleItem]) -> String {
    module.iter().map(|item| item.to_string()).join("\n\n")
}

/// Port declaration.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum PortDeclaration {
    /// Input declaration.
    Input(usize, String),

    /// Output declaration.
    Output(usize, String),
}

impl ToString for PortDeclaration {
    fn to_string(&self) -> String {
        match self {
            Self::Input(width, ident) => {
                if *width > 1 {
                    format!("input wire [{}-1:0] {}", width, ident)
                } else {
                    format!("input wire {}", ident)
                }
            }
            Self::Output(width, ident) => {
                if *width > 1 {
                    format!("output wire [{}-1:0] {}", width, ident)
                } else {
                    format!("output wire {}", ident)
                }
            }
        }
    }
}

impl PortDeclaration {
    /// Creates new input port declaration.
    pub fn input<S: Into<String>>(width: usize, ident: S) -> Self { Self::Input(width, ident.into()) }

    /// Creates new output port declaration.
    pub fn output<S: Into<String>>(width: usize, ident: S) -> Self { Self::Output(width, ident.into()) }

    /// Port name.
    pub fn ident(&self) -> &str {
        match self {
            Self::Input(_, ident) | Self::Output(_, ident) => ident,
        }
    }

    /// Port width in bits.
    pub fn width(&self) -> usize {
        match self {
            Self::Input(width, _) | Self::Output(width, _) => *width,
        }
    }

    /// Returns `true` for input ports.
    pub fn is_input(&self) -> bool { matches!(self, Self::Input(..)) }
}

/// Declaration.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Declaration {
    /// Net declaration.
    Net(usize, String),

    /// Reg declaration.
    Reg(usize, String),
}

impl Declaration {
    /// Net declaration.
    #[inline]
    pub fn net<S: Into<String>>(width: usize, ident: S) -> Self { Declaration::Net(width, ident.into()) }

    /// Reg declaration.
    #[inline]
    pub fn reg<S: Into<String>>(width: usize, ident: S) -> Self { Declaration::Reg(width, ident.into()) }
}

impl ToString for Declaration {
    /// Generates verilog code.
    fn to_string(&self) -> String {
        let (kind, width, ident) = match self {
            Self::Net(width, ident) => ("wire", width, ident),
            Self::Reg(width, ident) => ("reg", width, ident),
        };
        if *width > 1 {
            format!("{} [{}-1:0] {};", kind, width, ident)
        } else {
            format!("{} {};", kind, ident)
        }
    }
}

/// Continuous assign.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ContinuousAssign(pub Expression, pub Expression);

/// Generates verilog code for continuous assigns.
pub fn gen_verilog_conts(conts: &[ContinuousAssign]) -> String {
    conts.iter().map(|cont| cont.to_string()).join("\n")
}

impl ToString for ContinuousAssign {
    fn to_string(&self) -> String { format!("assign {} = {};", self.0.to_string(), self.1.to_string()) }
}

impl ContinuousAssign {
    /// Creates new continuous assign.
    pub fn new(lvalue: Expression, expr: Expression) -> Self { Self(lvalue, expr) }
}

/// Module instantiation.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ModuleInstantiation {
    /// Module name.
    pub module_name: String,

    /// Inst name.
    pub inst_name: String,

    /// Port connections. `None` leaves the port unconnected.
    pub port_connections: Vec<(String, Option<Expression>)>,
}

impl ToString for ModuleInstantiation {
    fn to_string(&self) -> String {
        format!(
            "{} {} (\n{}\n);",
            self.module_name,
            self.inst_name,
            self.port_connections
                .iter()
                .map(|(port_name, expr)| {
                    format!("{}.{}({})", " ".repeat(INDENT), port_name, expr.as_ref().map_or(String::new(), |e| e.to_string()))
                })
                .join(",\n")
        )
    }
}

impl ModuleInstantiation {
    /// Creates new module instantiation.
    pub fn new<M: Into<String>, I: Into<String>>(module_name: M, inst_name: I) -> Self {
        Self { module_name: module_name.into(), inst_name: inst_name.into(), port_connections: Vec::new() }
    }

    /// Connects `port` to `expr`.
    #[must_use]
    pub fn connect<S: Into<String>>(mut self, port: S, expr: Expression) -> Self {
        self.port_connections.push((port.into(), Some(expr)));
        self
    }

    /// Leaves `port` unconnected.
    #[must_use]
    pub fn open<S: Into<String>>(mut self, port: S) -> Self {
        self.port_connections.push((port.into(), None));
        self
    }
}

/// Statement.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Statement {
    /// Conditional statement.
    Conditional(Expression, Vec<Statement>, Vec<Statement>),

    /// Nonblocking assignment.
    NonblockingAssignment(Expression, Expression),
}

impl Statement {
    /// Nonblocking assignment.
    #[inline]
    pub fn nonblocking_assignment(lvalue: Expression, expr: Expression) -> Self {
        debug_assert!(
            matches!(lvalue, Expression::Primary(Primary::HierarchicalIdentifier(_, _))),
            "lvalue should be hierarchical identifier"
        );
        Statement::NonblockingAssignment(lvalue, expr)
    }

    /// `if (cond) begin .. end else begin .. end`.
    #[inline]
    pub fn conditional(cond: Expression, then_stmt: Vec<Statement>, else_stmt: Vec<Statement>) -> Self {
        Statement::Conditional(cond, then_stmt, else_stmt)
    }
}

impl ToString for Statement {
    fn to_string(&self) -> String {
        match self {
            Self::Conditional(cond, then_stmt, else_stmt) if else_stmt.is_empty() => {
                format!(
                    "if ({}) begin\n{}\nend",
                    cond.to_string(),
                    indent(then_stmt.iter().map(|stmt| stmt.to_string()).join("\n"), INDENT),
                )
            }
            Self::Conditional(cond, then_stmt, else_stmt) => {
                format!(
                    "if ({}) begin\n{}\nend else begin\n{}\nend",
                    cond.to_string(),
                    indent(then_stmt.iter().map(|stmt| stmt.to_string()).join("\n"), INDENT),
                    indent(else_stmt.iter().map(|stmt| stmt.to_string()).join("\n"), INDENT),
                )
            }
            Self::NonblockingAssignment(lvalue, expr) => {
                format!("{} <= {};", lvalue.to_string(), expr.to_string())
            }
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Negation
    Negation,
}

impl ToString for UnaryOp {
    fn to_string(&self) -> String {
        match self {
            UnaryOp::Negation => "~",
        }
        .to_string()
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// Multiplication
    Mul,

    /// Or (bitwise)
    Or,

    /// And (bitwise)
    And,
}

impl ToString for BinaryOp {
    fn to_string(&self) -> String {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Or => "|",
            BinaryOp::And => "&",
        }
        .to_string()
    }
}

/// Expression.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum Expression {
    /// Primary.
    Primary(Primary),

    /// Unary expression.
    Unary(UnaryOp, Primary),

    /// Binary expression.
    Binary(Box<Expression>, BinaryOp, Box<Expression>),

    /// Conditional expression.
    Conditional(Box<Expression>, Box<Expression>, Box<Expression>),
}

/// Range.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum Range {
    /// Index: `[index]`
    Index(Box<Expression>),

    /// Range: `[base +: offset]`
    Range(Box<Expression>, Box<Expression>),
}

/// Primary.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum Primary {
    /// Number.
    Number(String),

    /// Hierarchical identifier.
    HierarchicalIdentifier(String, Option<Range>),

    /// Concatenation.
    Concatenation(Concatenation),

    /// Mintypmax expression.
    MintypmaxExpression(Box<Expression>),
}

/// Concatenation.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Concatenation {
    /// Expressions, most significant first.
    pub exprs: Vec<Expression>,
}

impl ToString for Expression {
    fn to_string(&self) -> String {
        match self {
            Self::Primary(prim) => prim.to_string(),
            Self::Unary(op, prim) => format!("{}{}", op.to_string(), prim.to_string()),
            Self::Binary(lhs, op, rhs) => format!("{} {} {}", lhs.to_string(), op.to_string(), rhs.to_string()),
            Self::Conditional(cond, then_expr, else_expr) => {
                format!("{} ? {} : {}", cond.to_string(), then_expr.to_string(), else_expr.to_string())
            }
        }
    }
}

impl From<String> for Expression {
    fn from(ident: String) -> Self { Expression::ident(ident) }
}

impl From<&str> for Expression {
    fn from(ident: &str) -> Self { Expression::ident(ident) }
}

impl Expression {
    /// Number.
    pub fn number(num: String) -> Self { Self::Primary(Primary::Number(num)) }

    /// Single-bit literal.
    pub fn bit(value: bool) -> Self { Self::number(if value { "1'b1" } else { "1'b0" }.to_string()) }

    /// Identifier.
    pub fn ident<S: Into<String>>(ident: S) -> Self { Self::Primary(Primary::HierarchicalIdentifier(ident.into(), None)) }

    /// Selects `width` bits starting at `lo` from the identifier `ident` of total width `total`.
    ///
    /// Degenerates to the bare identifier when the whole signal is selected, so scalar nets are
    /// never bit-selected.
    pub fn select<S: Into<String>>(ident: S, total: usize, lo: usize, width: usize) -> Self {
        let ident = Self::ident(ident);
        if lo == 0 && width == total {
            ident
        } else if width == 1 {
            ident.with_range(Range::new_index(Self::number(lo.to_string())))
        } else {
            ident.with_range(Range::new_range(Self::number(lo.to_string()), Self::number(width.to_string())))
        }
    }

    /// Attaches a range to an identifier. Other expressions are returned unchanged.
    #[must_use]
    pub fn with_range(self, range: Range) -> Self {
        if let Expression::Primary(Primary::HierarchicalIdentifier(ident, None)) = self {
            Expression::Primary(Primary::HierarchicalIdentifier(ident, Some(range)))
        } else {
            self
        }
    }

    /// Concatenation of `exprs`, most significant first.
    pub fn concat(exprs: Vec<Expression>) -> Self { Self::Primary(Primary::Concatenation(Concatenation { exprs })) }

    /// Mintypmax expression.
    pub fn mintypmax_expr(expr: Expression) -> Self { Self::Primary(Primary::MintypmaxExpression(Box::new(expr))) }

    /// Unary operation.
    pub fn unary(op: UnaryOp, expr: Self) -> Self {
        Self::Unary(op, if let Self::Primary(prim) = expr { prim } else { Primary::MintypmaxExpression(Box::new(expr)) })
    }

    /// Binary operation.
    pub fn binary(op: BinaryOp, mut lhs: Expression, mut rhs: Expression) -> Self {
        // Operands of binary operation should be primary or unary.
        if !lhs.is_operand() && !matches!(&lhs, Self::Binary(_, lop, _) if *lop == op) {
            lhs = Expression::mintypmax_expr(lhs);
        }

        if !rhs.is_operand() {
            rhs = Expression::mintypmax_expr(rhs);
        }

        Self::Binary(Box::new(lhs), op, Box::new(rhs))
    }

    /// Conditional expression.
    pub fn conditional(cond: Expression, then_expr: Expression, else_expr: Expression) -> Self {
        Self::Conditional(Box::new(cond), Box::new(then_expr), Box::new(else_expr))
    }

    /// Bitwise negation.
    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn not(self) -> Self { Self::unary(UnaryOp::Negation, self) }

    /// Bitwise and.
    #[must_use]
    pub fn and(self, rhs: Expression) -> Self { Self::binary(BinaryOp::And, self, rhs) }

    /// Bitwise or.
    #[must_use]
    pub fn or(self, rhs: Expression) -> Self { Self::binary(BinaryOp::Or, self, rhs) }

    /// Multiplication.
    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn mul(self, rhs: Expression) -> Self { Self::binary(BinaryOp::Mul, self, rhs) }

    /// Conjunction of all given single-bit expressions, `1'b1` if there are none.
    pub fn and_all<I: IntoIterator<Item = Expression>>(exprs: I) -> Self {
        exprs.into_iter().reduce(Self::and).unwrap_or_else(|| Self::bit(true))
    }

    /// Disjunction of all given single-bit expressions, `1'b0` if there are none.
    pub fn or_all<I: IntoIterator<Item = Expression>>(exprs: I) -> Self {
        exprs.into_iter().reduce(Self::or).unwrap_or_else(|| Self::bit(false))
    }

    fn is_operand(&self) -> bool { matches!(self, Self::Primary(_) | Self::Unary(..)) }
}

impl ToString for Range {
    fn to_string(&self) -> String {
        match self {
            Self::Index(index) => index.to_string(),
            Self::Range(base, offset) => {
                format!("{} +: {}", base.to_string(), offset.to_string())
            }
        }
    }
}

impl Range {
    /// Creates new index.
    pub fn new_index(index: Expression) -> Self { Self::Index(Box::new(index)) }

    /// Creates new range.
    pub fn new_range(base: Expression, offset: Expression) -> Self { Self::Range(Box::new(base), Box::new(offset)) }
}

impl ToString for Primary {
    fn to_string(&self) -> String {
        match self {
            Self::Number(num) => num.clone(),
            Self::HierarchicalIdentifier(ident, Some(range)) => {
                format!("{}[{}]", ident.clone(), range.to_string())
            }
            Self::HierarchicalIdentifier(ident, None) => ident.clone(),
            Self::Concatenation(concat) => concat.to_string(),
            Self::MintypmaxExpression(expr) => format!("({})", expr.to_string()),
        }
    }
}

impl ToString for Concatenation {
    fn to_string(&self) -> String { format!("{{{}}}", self.exprs.iter().map(|expr| expr.to_string()).join(", ")) }
}
