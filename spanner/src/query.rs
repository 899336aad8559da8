//! Single-table `SELECT` support.
//!
//! ```text
//! SELECT {* | c [, ...]} FROM t
//!     [WHERE cond [AND cond ...]]
//!     [ORDER BY c [ASC|DESC] [, ...]]
//!     [LIMIT {n | @param}]
//! cond := c {= | != | <> | < | <= | > | >=} {literal | @param}
//!       | c IS [NOT] NULL
//! ```
//!
//! Rows are produced in primary key order unless ORDER BY says otherwise.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use snippets_gax::status::Status;

use crate::ddl::TableDef;
use crate::lexer::{Parser, Token};
use crate::row::Field;
use crate::value::{ColumnType, Value};

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Projection {
    All,
    Columns(Vec<String>),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    IsNull,
    IsNotNull,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Operand {
    Literal(Value),
    Param(String),
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Condition {
    column: String,
    op: CompareOp,
    operand: Option<Operand>,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Query {
    pub(crate) table: String,
    projection: Projection,
    conditions: Vec<Condition>,
    order_by: Vec<(String, bool)>,
    limit: Option<Operand>,
}

pub(crate) fn parse(sql: &str) -> Result<Query, Status> {
    parse_query(sql).map_err(|e| Status::invalid_argument(format!("Syntax error: {} : {}", e, sql.trim())))
}

fn parse_query(sql: &str) -> Result<Query, String> {
    let mut p = Parser::new(sql)?;
    p.expect_keyword("SELECT")?;
    let projection = if p.consume(&Token::Star) {
        Projection::All
    } else {
        let mut columns = vec![p.expect_identifier()?];
        while p.consume(&Token::Comma) {
            columns.push(p.expect_identifier()?);
        }
        Projection::Columns(columns)
    };
    p.expect_keyword("FROM")?;
    let table = p.expect_identifier()?;

    let mut conditions = vec![];
    if p.consume_keyword("WHERE") {
        loop {
            conditions.push(parse_condition(&mut p)?);
            if !p.consume_keyword("AND") {
                break;
            }
        }
    }

    let mut order_by = vec![];
    if p.consume_keyword("ORDER") {
        p.expect_keyword("BY")?;
        loop {
            let column = p.expect_identifier()?;
            let descending = if p.consume_keyword("DESC") {
                true
            } else {
                p.consume_keyword("ASC");
                false
            };
            order_by.push((column, descending));
            if !p.consume(&Token::Comma) {
                break;
            }
        }
    }

    let limit = if p.consume_keyword("LIMIT") {
        Some(parse_operand(&mut p)?)
    } else {
        None
    };
    p.expect_end()?;

    Ok(Query {
        table,
        projection,
        conditions,
        order_by,
        limit,
    })
}

fn parse_condition(p: &mut Parser) -> Result<Condition, String> {
    let column = p.expect_identifier()?;
    if p.consume_keyword("IS") {
        let op = if p.consume_keyword("NOT") {
            CompareOp::IsNotNull
        } else {
            CompareOp::IsNull
        };
        p.expect_keyword("NULL")?;
        return Ok(Condition {
            column,
            op,
            operand: None,
        });
    }
    let op = match p.next_token() {
        Some(Token::Eq) => CompareOp::Eq,
        Some(Token::NotEq) => CompareOp::NotEq,
        Some(Token::Lt) => CompareOp::Lt,
        Some(Token::LtEq) => CompareOp::LtEq,
        Some(Token::Gt) => CompareOp::Gt,
        Some(Token::GtEq) => CompareOp::GtEq,
        Some(other) => return Err(format!("expected comparison operator but found {}", other)),
        None => return Err("expected comparison operator".to_string()),
    };
    Ok(Condition {
        column,
        op,
        operand: Some(parse_operand(p)?),
    })
}

fn parse_operand(p: &mut Parser) -> Result<Operand, String> {
    match p.next_token() {
        Some(Token::Param(name)) => Ok(Operand::Param(name)),
        Some(Token::Integer(v)) => Ok(Operand::Literal(Value::Int64(v))),
        Some(Token::Float(v)) => Ok(Operand::Literal(Value::Float64(v))),
        Some(Token::StringLiteral(v)) => Ok(Operand::Literal(Value::String(v))),
        Some(t) if t.is_keyword("TRUE") => Ok(Operand::Literal(Value::Bool(true))),
        Some(t) if t.is_keyword("FALSE") => Ok(Operand::Literal(Value::Bool(false))),
        Some(t) if t.is_keyword("NULL") => Ok(Operand::Literal(Value::Null)),
        Some(other) => Err(format!("expected literal or parameter but found {}", other)),
        None => Err("expected literal or parameter".to_string()),
    }
}

fn bind(operand: &Operand, params: &BTreeMap<String, Value>) -> Result<Value, Status> {
    match operand {
        Operand::Literal(v) => Ok(v.clone()),
        Operand::Param(name) => params
            .get(name)
            .cloned()
            .ok_or_else(|| Status::invalid_argument(format!("No parameter found for binding: {}", name))),
    }
}

/// Coerces a bound value to the column's type so comparisons stay within one type.
fn coerce(value: Value, column: &str, column_type: &ColumnType) -> Result<Value, Status> {
    let value = match (value, column_type) {
        (Value::Int64(v), ColumnType::Float64) => Value::Float64(v as f64),
        (v, _) => v,
    };
    let compatible = match (&value, column_type) {
        (Value::Null, _) => true,
        (Value::String(_), ColumnType::String(_)) | (Value::Bytes(_), ColumnType::Bytes(_)) => true,
        (v, t) => v.conforms_to(t),
    };
    if compatible {
        Ok(value)
    } else {
        Err(Status::invalid_argument(format!(
            "No matching signature for comparison of {} with {:?}",
            column, value
        )))
    }
}

struct BoundCondition<'a> {
    column: &'a str,
    op: CompareOp,
    value: Value,
}

impl BoundCondition<'_> {
    fn matches(&self, row: &BTreeMap<String, Value>) -> bool {
        let actual = row.get(self.column).unwrap_or(&Value::Null);
        match self.op {
            CompareOp::IsNull => actual.is_null(),
            CompareOp::IsNotNull => !actual.is_null(),
            // comparisons involving NULL are never true
            _ if actual.is_null() || self.value.is_null() => false,
            CompareOp::Eq => actual == &self.value,
            CompareOp::NotEq => actual != &self.value,
            CompareOp::Lt => actual < &self.value,
            CompareOp::LtEq => actual <= &self.value,
            CompareOp::Gt => actual > &self.value,
            CompareOp::GtEq => actual >= &self.value,
        }
    }
}

impl Query {
    /// Evaluates the query over `rows`, which must be given in primary key order.
    pub(crate) fn execute<'a>(
        &self,
        def: &TableDef,
        params: &BTreeMap<String, Value>,
        rows: impl Iterator<Item = &'a BTreeMap<String, Value>>,
    ) -> Result<(Vec<Field>, Vec<Vec<Value>>), Status> {
        let column_type = |name: &str| {
            def.column(name)
                .map(|c| c.column_type)
                .ok_or_else(|| Status::invalid_argument(format!("Unrecognized name: {}", name)))
        };

        let names: Vec<String> = match &self.projection {
            Projection::All => def.columns.iter().map(|c| c.name.clone()).collect(),
            Projection::Columns(columns) => columns.clone(),
        };
        let mut fields = Vec::with_capacity(names.len());
        for name in names {
            let column_type = column_type(&name)?;
            fields.push(Field { name, column_type });
        }

        let mut conditions = Vec::with_capacity(self.conditions.len());
        for c in &self.conditions {
            let ty = column_type(&c.column)?;
            let value = match &c.operand {
                Some(operand) => coerce(bind(operand, params)?, &c.column, &ty)?,
                None => Value::Null,
            };
            conditions.push(BoundCondition {
                column: &c.column,
                op: c.op,
                value,
            });
        }
        for (column, _) in &self.order_by {
            column_type(column)?;
        }
        let limit = match &self.limit {
            Some(operand) => match bind(operand, params)? {
                Value::Int64(n) if n >= 0 => Some(n as usize),
                other => return Err(Status::invalid_argument(format!("Invalid LIMIT: {:?}", other))),
            },
            None => None,
        };

        let mut matched: Vec<&BTreeMap<String, Value>> =
            rows.filter(|row| conditions.iter().all(|c| c.matches(row))).collect();
        if !self.order_by.is_empty() {
            matched.sort_by(|a, b| {
                for (column, descending) in &self.order_by {
                    let left = a.get(column).unwrap_or(&Value::Null);
                    let right = b.get(column).unwrap_or(&Value::Null);
                    let ordering = if *descending { right.cmp(left) } else { left.cmp(right) };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }
        if let Some(limit) = limit {
            matched.truncate(limit);
        }

        let values = matched
            .into_iter()
            .map(|row| {
                fields
                    .iter()
                    .map(|f| row.get(&f.name).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Ok((fields, values))
    }
}
