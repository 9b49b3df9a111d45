//! Cycle-level evaluation of generated modules, for tests.
//!
//! Supports the subset of the IR the generators emit: nets and regs up to 128 bits, continuous
//! assigns, `always @(posedge clk)` blocks with conditionals and nonblocking assignments.
//! [`flatten`] inlines the submodules of an artifact so that a whole unit can be evaluated at once.
//!
//! # Panics
//!
//! Evaluation panics on constructs outside that subset and on identifiers without a declaration.

use std::collections::HashMap;

use super::*;
use crate::artifact::Artifact;

/// Evaluator of a single module. Submodule instances are ignored; use [`flatten`] first.
#[derive(Debug)]
pub struct Evaluator {
    module: Module,
    widths: HashMap<String, usize>,
    values: HashMap<String, u128>,
}

fn mask(width: usize) -> u128 {
    if width >= 128 {
        u128::MAX
    } else {
        (1u128 << width) - 1
    }
}

impl Evaluator {
    /// Creates an evaluator with every signal at zero.
    pub fn new(module: &Module) -> Self {
        let mut widths = HashMap::new();
        for port in &module.port_decls {
            let _ = widths.insert(port.ident().to_string(), port.width());
        }
        fn scan(items: &[ModuleItem], widths: &mut HashMap<String, usize>) {
            for item in items {
                match item {
                    ModuleItem::Declarations(decls) => {
                        for decl in decls {
                            let (Declaration::Net(width, ident) | Declaration::Reg(width, ident)) = decl;
                            let _ = widths.insert(ident.clone(), *width);
                        }
                    }
                    ModuleItem::Commented(_, items) => scan(items, widths),
                    _ => {}
                }
            }
        }
        scan(&module.module_items, &mut widths);
        Self { module: module.clone(), widths, values: HashMap::new() }
    }

    /// Drives `name`, truncated to its width.
    pub fn set(&mut self, name: &str, value: u128) {
        let width = self.widths[name];
        let _ = self.values.insert(name.to_string(), value & mask(width));
    }

    /// Current value of `name`.
    pub fn get(&self, name: &str) -> u128 { self.values.get(name).copied().unwrap_or(0) }

    /// Propagates continuous assigns until nothing changes.
    pub fn settle(&mut self) {
        let assigns = collect_assigns(&self.module.module_items);
        for _ in 0..=assigns.len() {
            let before = self.values.clone();
            for ContinuousAssign(lvalue, expr) in &assigns {
                let (value, _) = self.eval(expr);
                self.write(lvalue, value);
            }
            if before == self.values {
                return;
            }
        }
        panic!("continuous assigns of `{}` do not settle", self.module.name);
    }

    /// Rising clock edge followed by settling.
    pub fn tick(&mut self) {
        self.settle();
        let mut pending = Vec::new();
        for stmts in collect_processes(&self.module.module_items) {
            for stmt in stmts {
                self.exec(stmt, &mut pending);
            }
        }
        for (lvalue, value) in pending {
            self.write(&lvalue, value);
        }
        self.settle();
    }

    fn exec(&self, stmt: &Statement, pending: &mut Vec<(Expression, u128)>) {
        match stmt {
            Statement::Conditional(cond, then_stmt, else_stmt) => {
                let branch = if self.eval(cond).0 != 0 { then_stmt } else { else_stmt };
                for stmt in branch {
                    self.exec(stmt, pending);
                }
            }
            Statement::NonblockingAssignment(lvalue, expr) => {
                let (value, _) = self.eval(expr);
                pending.push((lvalue.clone(), value));
            }
        }
    }

    fn write(&mut self, lvalue: &Expression, value: u128) {
        let (ident, range) = match lvalue {
            Expression::Primary(Primary::HierarchicalIdentifier(ident, range)) => (ident, range),
            Expression::Primary(Primary::Concatenation(concat)) => {
                // Least significant part last.
                let mut rest = value;
                for part in concat.exprs.iter().rev() {
                    let (_, width) = self.eval(part);
                    self.write(part, rest & mask(width));
                    rest = if width >= 128 { 0 } else { rest >> width };
                }
                return;
            }
            _ => panic!("unsupported lvalue {}", lvalue.to_string()),
        };
        let width = self.widths[ident.as_str()];
        let (lo, len) = match range {
            None => (0, width),
            Some(range) => self.range(range),
        };
        let old = self.get(ident);
        let field = mask(len) << lo;
        let new = (old & !field) | ((value << lo) & field);
        let _ = self.values.insert(ident.clone(), new & mask(width));
    }

    fn range(&self, range: &Range) -> (usize, usize) {
        match range {
            Range::Index(index) => (self.eval(index).0 as usize, 1),
            Range::Range(base, offset) => (self.eval(base).0 as usize, self.eval(offset).0 as usize),
        }
    }

    fn eval(&self, expr: &Expression) -> (u128, usize) {
        match expr {
            Expression::Primary(prim) => self.eval_primary(prim),
            Expression::Unary(op, prim) => {
                let (value, width) = self.eval_primary(prim);
                match op {
                    UnaryOp::Negation => (!value & mask(width), width),
                }
            }
            Expression::Binary(lhs, op, rhs) => {
                let (lhs, lw) = self.eval(lhs);
                let (rhs, rw) = self.eval(rhs);
                let width = lw.max(rw);
                let value = match op {
                    BinaryOp::And => lhs & rhs,
                    BinaryOp::Or => lhs | rhs,
                    BinaryOp::Mul => lhs.wrapping_mul(rhs),
                };
                (value & mask(width), width)
            }
            Expression::Conditional(cond, then_expr, else_expr) => {
                let (then_value, tw) = self.eval(then_expr);
                let (else_value, ew) = self.eval(else_expr);
                (if self.eval(cond).0 != 0 { then_value } else { else_value }, tw.max(ew))
            }
        }
    }

    fn eval_primary(&self, prim: &Primary) -> (u128, usize) {
        match prim {
            Primary::Number(num) => {
                let (width, rest) = num.split_once('\'').unwrap_or(("32", num));
                let width = width.parse::<usize>().unwrap();
                let value = match rest.split_at(1) {
                    ("b", digits) => u128::from_str_radix(digits, 2).unwrap(),
                    ("d", digits) => digits.parse::<u128>().unwrap(),
                    _ => num.parse::<u128>().unwrap(),
                };
                (value & mask(width), width)
            }
            Primary::HierarchicalIdentifier(ident, None) => (self.get(ident), self.widths[ident.as_str()]),
            Primary::HierarchicalIdentifier(ident, Some(range)) => {
                let (lo, len) = self.range(range);
                ((self.get(ident) >> lo) & mask(len), len)
            }
            Primary::Concatenation(concat) => concat.exprs.iter().fold((0, 0), |(acc, acc_width), expr| {
                let (value, width) = self.eval(expr);
                ((acc << width) | value, acc_width + width)
            }),
            Primary::MintypmaxExpression(expr) => self.eval(expr),
        }
    }
}

fn collect_assigns(items: &[ModuleItem]) -> Vec<ContinuousAssign> {
    items
        .iter()
        .flat_map(|item| match item {
            ModuleItem::ContinuousAssigns(conts) => conts.clone(),
            ModuleItem::Commented(_, items) => collect_assigns(items),
            _ => Vec::new(),
        })
        .collect()
}

fn collect_processes(items: &[ModuleItem]) -> Vec<&Vec<Statement>> {
    items
        .iter()
        .flat_map(|item| match item {
            ModuleItem::AlwaysConstruct(_, stmts) => vec![stmts],
            ModuleItem::Commented(_, items) => collect_processes(items),
            _ => Vec::new(),
        })
        .collect()
}

/// Top module of `artifact` with every instance of a module defined in `artifact` inlined,
/// recursively. Signals of an inlined instance `inst` are renamed to `inst__<signal>`; its ports
/// become nets driven from, or driving, the connected expressions. Instances of external modules
/// are kept as they are.
pub fn flatten(artifact: &Artifact) -> Module {
    let top = artifact.top().expect("artifact without top module");
    flatten_module(artifact, top.module())
}

fn flatten_module(artifact: &Artifact, module: &Module) -> Module {
    Module {
        name: module.name.clone(),
        port_decls: module.port_decls.clone(),
        module_items: inline_items(artifact, &module.module_items),
    }
}

fn inline_items(artifact: &Artifact, items: &[ModuleItem]) -> Vec<ModuleItem> {
    let mut inlined = Vec::new();
    for item in items {
        match item {
            ModuleItem::ModuleInstantiation(inst) => match artifact.get(&inst.module_name) {
                Some(block) => inlined.extend(inline_instance(artifact, block.module(), inst)),
                None => inlined.push(item.clone()),
            },
            ModuleItem::Commented(comment, items) => {
                inlined.push(ModuleItem::Commented(comment.clone(), inline_items(artifact, items)))
            }
            _ => inlined.push(item.clone()),
        }
    }
    inlined
}

fn inline_instance(artifact: &Artifact, module: &Module, inst: &ModuleInstantiation) -> Vec<ModuleItem> {
    let sub = flatten_module(artifact, module);
    let prefix = format!("{}__", inst.inst_name);

    let ports = sub.port_decls.iter().map(|port| Declaration::net(port.width(), format!("{}{}", prefix, port.ident())));
    let mut items = vec![ModuleItem::Declarations(ports.collect())];
    items.extend(sub.module_items.iter().map(|item| rename_item(item, &prefix)));

    let mut conns = Vec::new();
    for (port, expr) in &inst.port_connections {
        let (decl, expr) = match (sub.port(port), expr) {
            (Some(decl), Some(expr)) => (decl, expr.clone()),
            (None, _) => panic!("`{}` has no port `{}`", module.name, port),
            (Some(_), None) => continue,
        };
        let inner = Expression::ident(format!("{}{}", prefix, port));
        conns.push(if decl.is_input() { ContinuousAssign::new(inner, expr) } else { ContinuousAssign::new(expr, inner) });
    }
    items.push(ModuleItem::ContinuousAssigns(conns));
    items
}

fn rename_item(item: &ModuleItem, prefix: &str) -> ModuleItem {
    let name = |ident: &String| format!("{}{}", prefix, ident);
    match item {
        ModuleItem::Declarations(decls) => ModuleItem::Declarations(
            decls
                .iter()
                .map(|decl| match decl {
                    Declaration::Net(width, ident) => Declaration::Net(*width, name(ident)),
                    Declaration::Reg(width, ident) => Declaration::Reg(*width, name(ident)),
                })
                .collect(),
        ),
        ModuleItem::ContinuousAssigns(conts) => ModuleItem::ContinuousAssigns(
            conts
                .iter()
                .map(|ContinuousAssign(lvalue, expr)| {
                    ContinuousAssign::new(rename_expr(lvalue, prefix), rename_expr(expr, prefix))
                })
                .collect(),
        ),
        ModuleItem::ModuleInstantiation(inst) => ModuleItem::ModuleInstantiation(ModuleInstantiation {
            module_name: inst.module_name.clone(),
            inst_name: name(&inst.inst_name),
            port_connections: inst
                .port_connections
                .iter()
                .map(|(port, expr)| (port.clone(), expr.as_ref().map(|expr| rename_expr(expr, prefix))))
                .collect(),
        }),
        ModuleItem::AlwaysConstruct(event, stmts) => {
            ModuleItem::AlwaysConstruct(event.clone(), stmts.iter().map(|stmt| rename_stmt(stmt, prefix)).collect())
        }
        ModuleItem::Commented(comment, items) => {
            ModuleItem::Commented(comment.clone(), items.iter().map(|item| rename_item(item, prefix)).collect())
        }
    }
}

fn rename_stmt(stmt: &Statement, prefix: &str) -> Statement {
    match stmt {
        Statement::Conditional(cond, then_stmt, else_stmt) => Statement::Conditional(
            rename_expr(cond, prefix),
            then_stmt.iter().map(|stmt| rename_stmt(stmt, prefix)).collect(),
            else_stmt.iter().map(|stmt| rename_stmt(stmt, prefix)).collect(),
        ),
        Statement::NonblockingAssignment(lvalue, expr) => {
            Statement::NonblockingAssignment(rename_expr(lvalue, prefix), rename_expr(expr, prefix))
        }
    }
}

fn rename_expr(expr: &Expression, prefix: &str) -> Expression {
    match expr {
        Expression::Primary(prim) => Expression::Primary(rename_primary(prim, prefix)),
        Expression::Unary(op, prim) => Expression::Unary(*op, rename_primary(prim, prefix)),
        Expression::Binary(lhs, op, rhs) => {
            Expression::Binary(Box::new(rename_expr(lhs, prefix)), *op, Box::new(rename_expr(rhs, prefix)))
        }
        Expression::Conditional(cond, then_expr, else_expr) => Expression::Conditional(
            Box::new(rename_expr(cond, prefix)),
            Box::new(rename_expr(then_expr, prefix)),
            Box::new(rename_expr(else_expr, prefix)),
        ),
    }
}

fn rename_primary(prim: &Primary, prefix: &str) -> Primary {
    match prim {
        Primary::Number(_) => prim.clone(),
        Primary::HierarchicalIdentifier(ident, range) => Primary::HierarchicalIdentifier(
            format!("{}{}", prefix, ident),
            range.as_ref().map(|range| match range {
                Range::Index(index) => Range::Index(Box::new(rename_expr(index, prefix))),
                Range::Range(base, offset) => {
                    Range::Range(Box::new(rename_expr(base, prefix)), Box::new(rename_expr(offset, prefix)))
                }
            }),
        ),
        Primary::Concatenation(concat) => Primary::Concatenation(Concatenation {
            exprs: concat.exprs.iter().map(|expr| rename_expr(expr, prefix)).collect(),
        }),
        Primary::MintypmaxExpression(expr) => Primary::MintypmaxExpression(Box::new(rename_expr(expr, prefix))),
    }
}
