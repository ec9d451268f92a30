use bson::{Bson, Document as BsonDocument};
use std::cmp::Ordering;

use crate::errors::DbError;

use super::types::{CmpOp, Expr, Filter, MAX_IN_SET, MAX_PATH_DEPTH, MAX_SORT_FIELDS, SortSpec};

/// Evaluates `filter` against one record body.
///
/// Pure and side-effect-free: re-evaluation never mutates the record. A
/// structurally bad node (e.g. arithmetic over a non-numeric value) surfaces
/// `InvalidFilter`; scans isolate that error to the offending record.
///
/// # Errors
/// Returns `InvalidFilter` when an `Expr` node cannot be evaluated.
pub fn eval_filter(doc: &BsonDocument, filter: &Filter) -> Result<bool, DbError> {
    Ok(match filter {
        Filter::True => true,
        Filter::And(fs) => {
            for f in fs {
                if !eval_filter(doc, f)? {
                    return Ok(false);
                }
            }
            true
        }
        Filter::Or(fs) => {
            for f in fs {
                if eval_filter(doc, f)? {
                    return Ok(true);
                }
            }
            false
        }
        Filter::Not(f) => !eval_filter(doc, f)?,
        Filter::Exists { path, exists } => get_path(doc, path).is_some() == *exists,
        Filter::In { path, values } => get_path(doc, path).is_some_and(|v| is_in_set(v, values)),
        Filter::Nin { path, values } => !get_path(doc, path).is_some_and(|v| is_in_set(v, values)),
        Filter::Cmp { path, op, value } => match get_path(doc, path) {
            Some(v) => cmp_values(v, *op, value),
            // An absent field equals null and nothing else; it never
            // satisfies an ordered comparison.
            None => *op == CmpOp::Eq && matches!(value, Bson::Null),
        },
        Filter::Expr(expr) => match eval_expr(doc, expr)? {
            Some(Bson::Boolean(b)) => b,
            Some(other) => {
                return Err(DbError::InvalidFilter(format!(
                    "$expr must evaluate to a boolean, got {other}"
                )));
            }
            None => false,
        },
        #[cfg(feature = "regex")]
        Filter::Regex { path, pattern, case_insensitive } => {
            if let Some(Bson::String(s)) = get_path(doc, path) {
                let mut re = regex::RegexBuilder::new(pattern);
                re.case_insensitive(*case_insensitive);
                if let Ok(r) = re.build() { r.is_match(s) } else { false }
            } else {
                false
            }
        }
    })
}

/// Evaluates an `$expr` sub-expression bottom-up. `None` means a field
/// reference did not resolve; comparisons over `None` are a quiet no-match.
pub(crate) fn eval_expr(doc: &BsonDocument, expr: &Expr) -> Result<Option<Bson>, DbError> {
    match expr {
        Expr::Field(path) => Ok(get_path(doc, path).cloned()),
        Expr::Literal(v) => Ok(Some(v.clone())),
        Expr::Add(parts) => fold_numeric(doc, parts, "$add", 0.0, |acc, x| acc + x),
        Expr::Multiply(parts) => fold_numeric(doc, parts, "$multiply", 1.0, |acc, x| acc * x),
        Expr::Subtract(lhs, rhs) => {
            let (Some(l), Some(r)) = (eval_expr(doc, lhs)?, eval_expr(doc, rhs)?) else {
                return Ok(None);
            };
            Ok(Some(Bson::Double(numeric_operand(&l, "$subtract")? - numeric_operand(&r, "$subtract")?)))
        }
        Expr::Cmp { op, lhs, rhs } => {
            let (Some(l), Some(r)) = (eval_expr(doc, lhs)?, eval_expr(doc, rhs)?) else {
                return Ok(Some(Bson::Boolean(false)));
            };
            Ok(Some(Bson::Boolean(cmp_values(&l, *op, &r))))
        }
    }
}

fn fold_numeric(
    doc: &BsonDocument,
    parts: &[Expr],
    name: &str,
    init: f64,
    f: impl Fn(f64, f64) -> f64,
) -> Result<Option<Bson>, DbError> {
    let mut acc = init;
    for part in parts {
        let Some(v) = eval_expr(doc, part)? else {
            return Ok(None);
        };
        acc = f(acc, numeric_operand(&v, name)?);
    }
    Ok(Some(Bson::Double(acc)))
}

fn numeric_operand(v: &Bson, name: &str) -> Result<f64, DbError> {
    if is_num(v) {
        Ok(as_f64_num(v))
    } else {
        Err(DbError::InvalidFilter(format!("{name} expects numeric operands, got {v}")))
    }
}

/// One comparison over two present values. Ordered operators return false
/// when the values are not comparable (distinct type classes).
pub(crate) fn cmp_values(v: &Bson, op: CmpOp, operand: &Bson) -> bool {
    match op {
        CmpOp::Eq => bson_eq(v, operand),
        CmpOp::Ne => !bson_eq(v, operand),
        CmpOp::Gt => partial_compare(v, operand).is_some_and(Ordering::is_gt),
        CmpOp::Gte => partial_compare(v, operand).is_some_and(Ordering::is_ge),
        CmpOp::Lt => partial_compare(v, operand).is_some_and(Ordering::is_lt),
        CmpOp::Lte => partial_compare(v, operand).is_some_and(Ordering::is_le),
    }
}

/// Type-aware equality: numeric values compare numerically across integer
/// widths and doubles; everything else compares structurally.
pub(crate) fn bson_eq(a: &Bson, b: &Bson) -> bool {
    if is_num(a) && is_num(b) {
        return as_f64_num(a).total_cmp(&as_f64_num(b)) == Ordering::Equal;
    }
    a == b
}

/// Ordering between two values of the same type class; `None` when the
/// values are incomparable.
pub(crate) fn partial_compare(a: &Bson, b: &Bson) -> Option<Ordering> {
    if is_num(a) && is_num(b) {
        return Some(as_f64_num(a).total_cmp(&as_f64_num(b)));
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn is_in_set(v: &Bson, set: &[Bson]) -> bool {
    set.iter().take(MAX_IN_SET).any(|x| bson_eq(x, v))
}

pub(crate) fn is_num(x: &Bson) -> bool {
    matches!(x, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_))
}

pub(crate) fn as_f64_num(x: &Bson) -> f64 {
    match x {
        Bson::Int32(i) => f64::from(*i),
        Bson::Int64(i) => *i as f64,
        Bson::Double(f) => *f,
        Bson::Decimal128(d) => d.to_string().parse::<f64>().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

/// Resolves a dotted path against a record body.
pub(crate) fn get_path<'a>(doc: &'a BsonDocument, path: &str) -> Option<&'a Bson> {
    if path.is_empty() || path.len() > 1024 {
        return None;
    }
    let mut cur = doc;
    let mut parts = path.split('.').peekable();
    let mut depth = 0usize;
    while let Some(part) = parts.next() {
        depth += 1;
        if depth > MAX_PATH_DEPTH {
            return None;
        }
        let v = cur.get(part)?;
        if parts.peek().is_none() {
            return Some(v);
        }
        match v {
            Bson::Document(d) => cur = d,
            _ => return None,
        }
    }
    None
}

/// Multi-key comparator for sorting. A record missing a sort field orders as
/// the type-minimum: it sorts first ascending, last descending. Ties fall
/// through to subsequent keys; overall stability comes from the stable sort
/// this feeds.
pub fn compare_docs(a: &BsonDocument, b: &BsonDocument, sort: &[SortSpec]) -> Ordering {
    for s in sort.iter().take(MAX_SORT_FIELDS) {
        let va = get_path(a, &s.field);
        let vb = get_path(b, &s.field);
        let ord = match (va, vb) {
            (Some(x), Some(y)) => compare_bson(x, y),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return if matches!(s.order, super::types::Order::Asc) { ord } else { ord.reverse() };
        }
    }
    Ordering::Equal
}

/// Total order over heterogeneous values, used only for sorting. Values of
/// different type classes order by type rank.
pub(crate) fn compare_bson(a: &Bson, b: &Bson) -> Ordering {
    if let Some(ord) = partial_compare(a, b) {
        return ord;
    }
    type_rank(a).cmp(&type_rank(b))
}

fn type_rank(v: &Bson) -> u8 {
    match v {
        Bson::Null => 0,
        Bson::Boolean(_) => 1,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 2,
        Bson::String(_) => 3,
        Bson::Array(_) => 4,
        Bson::Document(_) => 5,
        Bson::DateTime(_) => 6,
        _ => 7,
    }
}
