use bson::Bson;
use serde_json::Value;

use crate::errors::DbError;

use super::project::Projection;
use super::types::{CmpOp, Expr, Filter, MAX_IN_SET, UpdateDoc};

// JSON-facing parsers for the scripting layer, which speaks the usual
// `{field: {"$lt": 21}}` shape. Unknown operators are rejected here, at
// parse time, never mid-scan.

/// # Errors
/// `Json` when the string is not JSON, `InvalidFilter` for a malformed tree.
pub fn parse_filter_json(json: &str) -> Result<Filter, DbError> {
    let v: Value = serde_json::from_str(json)?;
    parse_filter(&v)
}

/// # Errors
/// `InvalidFilter` for non-object filters or unknown operators.
pub fn parse_filter(value: &Value) -> Result<Filter, DbError> {
    let Value::Object(map) = value else {
        return Err(DbError::InvalidFilter(format!("filter must be an object, got {value}")));
    };
    if map.is_empty() {
        return Ok(Filter::True);
    }
    let mut clauses = Vec::new();
    for (key, cond) in map {
        if key.starts_with('$') {
            clauses.push(parse_top_operator(key, cond)?);
        } else {
            clauses.push(parse_field_condition(key, cond)?);
        }
    }
    Ok(single_or_and(clauses))
}

fn single_or_and(mut clauses: Vec<Filter>) -> Filter {
    if clauses.len() == 1 { clauses.remove(0) } else { Filter::And(clauses) }
}

fn parse_top_operator(op: &str, value: &Value) -> Result<Filter, DbError> {
    match op {
        "$and" | "$or" => {
            let Value::Array(arr) = value else {
                return Err(DbError::InvalidFilter(format!("{op} requires an array")));
            };
            let subs = arr.iter().map(parse_filter).collect::<Result<Vec<_>, _>>()?;
            Ok(if op == "$and" { Filter::And(subs) } else { Filter::Or(subs) })
        }
        "$not" => Ok(Filter::Not(Box::new(parse_filter(value)?))),
        "$expr" => Ok(Filter::Expr(parse_expr(value)?)),
        other => Err(DbError::InvalidFilter(format!("unknown operator: {other}"))),
    }
}

fn parse_field_condition(field: &str, cond: &Value) -> Result<Filter, DbError> {
    match cond {
        Value::Object(ops) if ops.keys().any(|k| k.starts_with('$')) => {
            let mut clauses = Vec::new();
            for (op, operand) in ops {
                clauses.push(parse_field_operator(field, op, operand)?);
            }
            Ok(single_or_and(clauses))
        }
        _ => Ok(Filter::Cmp { path: field.to_string(), op: CmpOp::Eq, value: filter_bson(cond)? }),
    }
}

fn parse_field_operator(field: &str, op: &str, operand: &Value) -> Result<Filter, DbError> {
    let path = field.to_string();
    if let Some(cmp) = cmp_op(op) {
        return Ok(Filter::Cmp { path, op: cmp, value: filter_bson(operand)? });
    }
    match op {
        "$exists" => {
            let Value::Bool(exists) = operand else {
                return Err(DbError::InvalidFilter("$exists requires a boolean".to_string()));
            };
            Ok(Filter::Exists { path, exists: *exists })
        }
        "$in" | "$nin" => {
            let Value::Array(arr) = operand else {
                return Err(DbError::InvalidFilter(format!("{op} requires an array")));
            };
            let values = arr
                .iter()
                .take(MAX_IN_SET)
                .map(filter_bson)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(if op == "$in" {
                Filter::In { path, values }
            } else {
                Filter::Nin { path, values }
            })
        }
        #[cfg(feature = "regex")]
        "$regex" => {
            let Value::String(pattern) = operand else {
                return Err(DbError::InvalidFilter("$regex requires a string".to_string()));
            };
            Ok(Filter::Regex { path, pattern: pattern.clone(), case_insensitive: false })
        }
        other => Err(DbError::InvalidFilter(format!("unknown operator: {other}"))),
    }
}

fn parse_expr(value: &Value) -> Result<Expr, DbError> {
    match value {
        Value::String(s) if s.starts_with('$') => Ok(Expr::Field(s[1..].to_string())),
        Value::Object(map) => {
            if map.len() != 1 {
                return Err(DbError::InvalidFilter(
                    "$expr operator object must have exactly one key".to_string(),
                ));
            }
            let Some((op, operand)) = map.iter().next() else {
                return Err(DbError::InvalidFilter("empty $expr operator".to_string()));
            };
            let parts = |v: &Value| -> Result<Vec<Expr>, DbError> {
                let Value::Array(arr) = v else {
                    return Err(DbError::InvalidFilter(format!("{op} requires an array")));
                };
                arr.iter().map(parse_expr).collect()
            };
            if let Some(cmp) = cmp_op(op) {
                let mut ps = parts(operand)?;
                if ps.len() != 2 {
                    return Err(DbError::InvalidFilter(format!("{op} requires two operands")));
                }
                let rhs = ps.remove(1);
                let lhs = ps.remove(0);
                return Ok(Expr::cmp(cmp, lhs, rhs));
            }
            match op.as_str() {
                "$add" => Ok(Expr::Add(parts(operand)?)),
                "$multiply" => Ok(Expr::Multiply(parts(operand)?)),
                "$subtract" => {
                    let mut ps = parts(operand)?;
                    if ps.len() != 2 {
                        return Err(DbError::InvalidFilter(
                            "$subtract requires two operands".to_string(),
                        ));
                    }
                    let rhs = ps.remove(1);
                    Ok(Expr::Subtract(Box::new(ps.remove(0)), Box::new(rhs)))
                }
                other => Err(DbError::InvalidFilter(format!("unknown $expr operator: {other}"))),
            }
        }
        literal => Ok(Expr::Literal(filter_bson(literal)?)),
    }
}

fn cmp_op(op: &str) -> Option<CmpOp> {
    match op {
        "$eq" => Some(CmpOp::Eq),
        "$ne" => Some(CmpOp::Ne),
        "$gt" => Some(CmpOp::Gt),
        "$gte" => Some(CmpOp::Gte),
        "$lt" => Some(CmpOp::Lt),
        "$lte" => Some(CmpOp::Lte),
        _ => None,
    }
}

/// # Errors
/// `Json` when the string is not JSON, `InvalidUpdate` for a malformed spec.
pub fn parse_update_json(json: &str) -> Result<UpdateDoc, DbError> {
    let v: Value = serde_json::from_str(json)?;
    parse_update(&v)
}

/// Exactly one operator kind per update call.
///
/// # Errors
/// `InvalidUpdate` on zero or multiple operators, or unknown ones.
pub fn parse_update(value: &Value) -> Result<UpdateDoc, DbError> {
    let Value::Object(map) = value else {
        return Err(DbError::InvalidUpdate(format!("update must be an object, got {value}")));
    };
    if map.len() != 1 {
        return Err(DbError::InvalidUpdate(
            "exactly one update operator per call".to_string(),
        ));
    }
    let Some((op, operand)) = map.iter().next() else {
        return Err(DbError::InvalidUpdate("update specification is empty".to_string()));
    };
    let Value::Object(pairs) = operand else {
        return Err(DbError::InvalidUpdate(format!("{op} requires an object")));
    };
    match op.as_str() {
        "$set" => {
            let mut out = Vec::with_capacity(pairs.len());
            for (k, v) in pairs {
                let b = bson::serialize_to_bson(v).map_err(|e| DbError::InvalidUpdate(e.to_string()))?;
                out.push((k.clone(), b));
            }
            Ok(UpdateDoc::Set(out))
        }
        "$inc" => {
            let mut out = Vec::with_capacity(pairs.len());
            for (k, v) in pairs {
                let Some(by) = v.as_f64() else {
                    return Err(DbError::InvalidUpdate("$inc requires numeric values".to_string()));
                };
                out.push((k.clone(), by));
            }
            Ok(UpdateDoc::Inc(out))
        }
        "$unset" => Ok(UpdateDoc::Unset(pairs.keys().cloned().collect())),
        other => Err(DbError::InvalidUpdate(format!("unknown update operator: {other}"))),
    }
}

/// # Errors
/// `Json` when the string is not JSON, `InvalidProjection` for bad intents.
pub fn parse_projection_json(json: &str) -> Result<Projection, DbError> {
    let v: Value = serde_json::from_str(json)?;
    parse_projection(&v)
}

/// Parses `{field: 1|0}` intents. Mixing is caught later, by
/// [`Projection::plan`], so parse order does not matter here.
///
/// # Errors
/// `InvalidProjection` for non-object specs or non-flag values.
pub fn parse_projection(value: &Value) -> Result<Projection, DbError> {
    let Value::Object(map) = value else {
        return Err(DbError::InvalidProjection(format!(
            "projection must be an object, got {value}"
        )));
    };
    let mut fields = Vec::with_capacity(map.len());
    for (k, v) in map {
        let included = match v {
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::Bool(b) => *b,
            other => {
                return Err(DbError::InvalidProjection(format!(
                    "projection value for {k} must be 0/1 or a boolean, got {other}"
                )));
            }
        };
        fields.push((k.clone(), included));
    }
    Ok(Projection { fields })
}

fn filter_bson(v: &Value) -> Result<Bson, DbError> {
    bson::serialize_to_bson(v).map_err(|e| DbError::InvalidFilter(e.to_string()))
}
