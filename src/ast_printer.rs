use chrono::{SecondsFormat, TimeDelta};

use crate::ast::{Expr, Literal, UnaryOp};
use crate::value::Value;

/// Renders an expression back to source form, for diagnostics such as
/// "'point.x' is not callable".
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr) -> String {
        match expr {
            // ── literals ────────────────────────────────────────────────
            Expr::Literal(lit) => match lit {
                Literal::Int(n) => itoa::Buffer::new().format(*n).to_owned(),

                Literal::Str(s) => format!("\"{}\"", s.escape_default()),

                Literal::Bool(b) => b.to_string(),

                Literal::Nil => "nil".into(),

                Literal::Time(t) => {
                    format!("@\"{}\"", t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
                }

                Literal::Duration(nanos) => {
                    Value::Duration(TimeDelta::nanoseconds(*nanos)).to_string()
                }
            },

            // ── grouping ────────────────────────────────────────────────
            Expr::Grouping(inner) => format!("({})", Self::print(inner)),

            // ── operators ───────────────────────────────────────────────
            Expr::Unary { op, right, .. } => {
                let symbol: &str = match op {
                    UnaryOp::Negate => "-",
                    UnaryOp::Not => "!",
                };
                format!("{}{}", symbol, Self::print(right))
            }

            Expr::Binary {
                left, op, right, ..
            } => format!(
                "{} {} {}",
                Self::print(left),
                op.symbol(),
                Self::print(right)
            ),

            Expr::Assign { target, value, .. } => {
                format!("{} = {}", Self::print(target), Self::print(value))
            }

            Expr::Step { target, delta, .. } => format!(
                "{}{}",
                Self::print(target),
                if *delta > 0 { "++" } else { "--" }
            ),

            // ── names and access ────────────────────────────────────────
            Expr::Variable { name, .. } => name.to_string(),

            Expr::Member { object, labels, .. } => {
                let mut s: String = Self::print(object);
                for label in labels {
                    s.push('.');
                    s.push_str(label);
                }
                s
            }

            Expr::Index { object, index, .. } => {
                format!("{}[{}]", Self::print(object), Self::print(index))
            }

            // ── aggregates ──────────────────────────────────────────────
            Expr::Array { elements, .. } => format!("[{}]", Self::list(elements)),

            Expr::Instantiate {
                type_name, fields, ..
            } => {
                let inits: Vec<String> = fields
                    .iter()
                    .map(|(name, value)| format!("{}: {}", name, Self::print(value)))
                    .collect();
                format!("{}{{{}}}", type_name, inits.join(", "))
            }

            // ── functions ───────────────────────────────────────────────
            Expr::Function(decl) => format!("func({}) {{ … }}", decl.params.join(", ")),

            Expr::Call {
                callee, arguments, ..
            } => format!("{}({})", Self::print(callee), Self::list(arguments)),
        }
    }

    fn list(exprs: &[Expr]) -> String {
        exprs
            .iter()
            .map(Self::print)
            .collect::<Vec<String>>()
            .join(", ")
    }
}
