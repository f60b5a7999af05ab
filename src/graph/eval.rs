//! Derived-fact evaluation.
//!
//! Pure recursive evaluation against the graph's current (staged) view. No
//! memoization: every read reflects the latest writes.

use super::FactGraph;
use crate::error::GraphError;
use crate::fact::value::{Dollar, ValueKind};
use crate::fact::{Case, Expr, FactResult, FactValue};
use crate::path::{AbstractPath, ConcretePath};
use std::cmp::Ordering;
use tracing::warn;

type Evaluated = Result<FactResult<FactValue>, GraphError>;

pub(crate) fn evaluate(graph: &FactGraph, expr: &Expr<AbstractPath>, owner: &ConcretePath) -> Evaluated {
    let eval = |e: &Expr<AbstractPath>| evaluate(graph, e, owner);
    match expr {
        Expr::Boolean(b) => Ok(FactResult::Complete(FactValue::Boolean(*b))),
        Expr::Int(i) => Ok(FactResult::Complete(FactValue::Int(*i))),
        Expr::Dollar(d) => Ok(FactResult::Complete(FactValue::Dollar(*d))),
        Expr::String(s) => Ok(FactResult::Complete(FactValue::String(s.clone()))),

        Expr::Dependency(path) => match bind(path, owner) {
            Some(concrete) => graph.get(&concrete),
            None => Ok(FactResult::Incomplete),
        },

        Expr::Add(xs) => fold_numbers(all_of(xs, &eval)?, owner, "Add", Number::add),
        Expr::Multiply(xs) => fold_numbers(all_of(xs, &eval)?, owner, "Multiply", Number::mul),
        Expr::Maximum(xs) => fold_numbers(all_of(xs, &eval)?, owner, "Maximum", |a, b| {
            let larger = if b.compare(a)? == Ordering::Greater { b } else { a };
            larger.widen(a, b)
        }),
        Expr::Minimum(xs) => fold_numbers(all_of(xs, &eval)?, owner, "Minimum", |a, b| {
            let smaller = if b.compare(a)? == Ordering::Less { b } else { a };
            smaller.widen(a, b)
        }),
        Expr::Subtract {
            minuend,
            subtrahends,
        } => {
            let minuend = eval(minuend)?;
            let subtracted = fold_numbers(all_of(subtrahends, &eval)?, owner, "Subtract", Number::add)?;
            minuend.zip(subtracted).try_and_then(|(a, b)| {
                match (Number::from_value(&a), Number::from_value(&b)) {
                    (Some(a), Some(b)) => match a.sub(b) {
                        Some(n) => Ok(FactResult::Complete(n.into_value())),
                        None => Err(overflow(owner, "Subtract")),
                    },
                    _ => Ok(mismatch(owner, "Subtract")),
                }
            })
        }

        Expr::Equal(a, b) => compare(eval(a)?, eval(b)?, |x, y| Some(x.loosely_equals(y))),
        Expr::NotEqual(a, b) => compare(eval(a)?, eval(b)?, |x, y| Some(!x.loosely_equals(y))),
        Expr::GreaterThan(a, b) => compare(eval(a)?, eval(b)?, |x, y| {
            x.compare(y).map(|o| o == Ordering::Greater)
        }),
        Expr::GreaterThanOrEqual(a, b) => compare(eval(a)?, eval(b)?, |x, y| {
            x.compare(y).map(|o| o != Ordering::Less)
        }),
        Expr::LessThan(a, b) => compare(eval(a)?, eval(b)?, |x, y| {
            x.compare(y).map(|o| o == Ordering::Less)
        }),
        Expr::LessThanOrEqual(a, b) => compare(eval(a)?, eval(b)?, |x, y| {
            x.compare(y).map(|o| o != Ordering::Greater)
        }),

        Expr::Not(x) => Ok(eval(x)?.and_then(|v| match v.as_bool() {
            Some(b) => FactResult::Complete(FactValue::Boolean(!b)),
            None => mismatch(owner, "Not"),
        })),
        Expr::All(xs) => short_circuit(xs, &eval, false, owner),
        Expr::Any(xs) => short_circuit(xs, &eval, true, owner),
        Expr::Switch(cases) => switch(cases, &eval, owner),
        Expr::IsComplete(x) => Ok(FactResult::Complete(FactValue::Boolean(eval(x)?.complete()))),

        Expr::CollectionSize(path) => match bind(path, owner) {
            Some(collection) => Ok(FactResult::Complete(FactValue::Int(
                graph.collection_items(&collection)?.len() as i64,
            ))),
            None => Ok(FactResult::Incomplete),
        },
        Expr::CollectionSum(path) => {
            let values = match per_item(graph, path, owner)? {
                Some(results) => results,
                None => return Ok(FactResult::Incomplete),
            };
            let zero = match graph.dictionary().value_kind(path) {
                Some(ValueKind::Int) => Number::Int(0),
                _ => Number::Cents(0),
            };
            values.try_and_then(|values| {
                let mut total = zero;
                for value in &values {
                    let n = match Number::from_value(value) {
                        Some(n) => n,
                        None => return Ok(mismatch(owner, "CollectionSum")),
                    };
                    total = total.add(n).ok_or_else(|| overflow(owner, "CollectionSum"))?;
                }
                Ok(FactResult::Complete(total.into_value()))
            })
        }
        Expr::Count(path) => {
            let values = match per_item(graph, path, owner)? {
                Some(results) => results,
                None => return Ok(FactResult::Incomplete),
            };
            Ok(values.map(|values| {
                let count = values
                    .iter()
                    .filter(|v| v.as_bool() == Some(true))
                    .count();
                FactValue::Int(count as i64)
            }))
        }
    }
}

/// Bind a dependency to the owner's item scope
fn bind(path: &AbstractPath, owner: &ConcretePath) -> Option<ConcretePath> {
    match path.bind(owner).into_concrete() {
        Ok(concrete) => Some(concrete),
        Err(_) => {
            warn!(path = %path, owner = %owner, "Dependency has no collection item in scope");
            None
        }
    }
}

/// Evaluate a per-item fact for every item of its collection
fn per_item(
    graph: &FactGraph,
    path: &AbstractPath,
    owner: &ConcretePath,
) -> Result<Option<FactResult<Vec<FactValue>>>, GraphError> {
    let bound = path.bind(owner);
    let collection = match bound.wildcard_prefix().map(|p| p.into_concrete()) {
        Some(Ok(collection)) => collection,
        _ => {
            warn!(path = %path, owner = %owner, "Per-item fact has no single free wildcard");
            return Ok(None);
        }
    };
    let mut results = Vec::new();
    for id in graph.collection_items(&collection)? {
        let item_path = bound.resolve_first(&id)?.into_concrete()?;
        results.push(graph.get(&item_path)?);
    }
    Ok(Some(results.into_iter().collect()))
}

fn all_of(
    xs: &[Expr<AbstractPath>],
    eval: &impl Fn(&Expr<AbstractPath>) -> Evaluated,
) -> Result<FactResult<Vec<FactValue>>, GraphError> {
    let mut results = Vec::with_capacity(xs.len());
    for x in xs {
        results.push(eval(x)?);
    }
    Ok(results.into_iter().collect())
}

/// `All` stops at a complete false; `Any` at a complete true
fn short_circuit(
    xs: &[Expr<AbstractPath>],
    eval: &impl Fn(&Expr<AbstractPath>) -> Evaluated,
    decisive: bool,
    owner: &ConcretePath,
) -> Evaluated {
    let mut rest = Vec::with_capacity(xs.len());
    for x in xs {
        let result = eval(x)?;
        if let FactResult::Complete(value) = &result {
            if value.as_bool() == Some(decisive) {
                return Ok(FactResult::Complete(FactValue::Boolean(decisive)));
            }
        }
        rest.push(result);
    }
    let collected: FactResult<Vec<FactValue>> = rest.into_iter().collect();
    Ok(collected.and_then(|values| {
        let mut outcome = !decisive;
        for value in &values {
            match value.as_bool() {
                Some(b) if b == decisive => outcome = decisive,
                Some(_) => {}
                None => return mismatch(owner, if decisive { "Any" } else { "All" }),
            }
        }
        FactResult::Complete(FactValue::Boolean(outcome))
    }))
}

fn switch(
    cases: &[Case<AbstractPath>],
    eval: &impl Fn(&Expr<AbstractPath>) -> Evaluated,
    owner: &ConcretePath,
) -> Evaluated {
    let mut tentative = false;
    for case in cases {
        let when = eval(&case.when)?;
        let tentative_case = !when.complete();
        match when.value().and_then(FactValue::as_bool) {
            Some(true) => {
                let then = eval(&case.then)?;
                return Ok(if tentative || tentative_case {
                    then.demote()
                } else {
                    then
                });
            }
            Some(false) => tentative |= tentative_case,
            None if when.has_value() => return Ok(mismatch(owner, "Switch")),
            None => return Ok(FactResult::Incomplete),
        }
    }
    Ok(FactResult::Incomplete)
}

fn compare(
    a: FactResult<FactValue>,
    b: FactResult<FactValue>,
    test: impl FnOnce(&FactValue, &FactValue) -> Option<bool>,
) -> Evaluated {
    Ok(a.zip(b).and_then(|(x, y)| match test(&x, &y) {
        Some(result) => FactResult::Complete(FactValue::Boolean(result)),
        None => FactResult::Incomplete,
    }))
}

/// Fold numeric operands left to right; overflow is an error, not incompleteness
fn fold_numbers(
    values: FactResult<Vec<FactValue>>,
    owner: &ConcretePath,
    operation: &str,
    op: impl Fn(Number, Number) -> Option<Number>,
) -> Evaluated {
    values.try_and_then(|values| {
        let mut numbers = values.iter().map(Number::from_value);
        let mut acc = match numbers.next() {
            Some(Some(first)) => first,
            _ => return Ok(mismatch(owner, operation)),
        };
        for n in numbers {
            let n = match n {
                Some(n) => n,
                None => return Ok(mismatch(owner, operation)),
            };
            acc = op(acc, n).ok_or_else(|| overflow(owner, operation))?;
        }
        Ok(FactResult::Complete(acc.into_value()))
    })
}

/// Unreachable for dictionaries that passed kind inference
fn mismatch(owner: &ConcretePath, operation: &str) -> FactResult<FactValue> {
    warn!(owner = %owner, operation, "Operand kind mismatch");
    FactResult::Incomplete
}

fn overflow(owner: &ConcretePath, operation: &str) -> GraphError {
    warn!(owner = %owner, operation, "Arithmetic overflow");
    GraphError::Arithmetic {
        path: owner.to_string(),
        operation: operation.to_string(),
    }
}

/// Ints stay ints until a dollar amount joins them
#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Cents(i64),
}

impl Number {
    fn from_value(value: &FactValue) -> Option<Number> {
        match value {
            FactValue::Int(i) => Some(Number::Int(*i)),
            FactValue::Dollar(d) => Some(Number::Cents(d.cents())),
            _ => None,
        }
    }

    fn cents(self) -> Option<i64> {
        match self {
            Number::Int(i) => i.checked_mul(100),
            Number::Cents(c) => Some(c),
        }
    }

    fn compare(self, other: Number) -> Option<Ordering> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
            _ => Some(self.cents()?.cmp(&other.cents()?)),
        }
    }

    /// Keep the chosen operand, as cents when either side was cents
    fn widen(self, a: Number, b: Number) -> Option<Number> {
        match (a, b) {
            (Number::Int(_), Number::Int(_)) => Some(self),
            _ => self.cents().map(Number::Cents),
        }
    }

    fn add(self, other: Number) -> Option<Number> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a.checked_add(b).map(Number::Int),
            _ => self.cents()?.checked_add(other.cents()?).map(Number::Cents),
        }
    }

    fn sub(self, other: Number) -> Option<Number> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a.checked_sub(b).map(Number::Int),
            _ => self.cents()?.checked_sub(other.cents()?).map(Number::Cents),
        }
    }

    fn mul(self, other: Number) -> Option<Number> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a.checked_mul(b).map(Number::Int),
            (Number::Int(i), Number::Cents(c)) | (Number::Cents(c), Number::Int(i)) => {
                c.checked_mul(i).map(Number::Cents)
            }
            (Number::Cents(a), Number::Cents(b)) => {
                // cents * cents carries two extra decimal places; round half away from zero
                let product = i128::from(a) * i128::from(b);
                let rounded = (product + product.signum() * 50) / 100;
                i64::try_from(rounded).ok().map(Number::Cents)
            }
        }
    }

    fn into_value(self) -> FactValue {
        match self {
            Number::Int(i) => FactValue::Int(i),
            Number::Cents(c) => FactValue::Dollar(Dollar::from_cents(c)),
        }
    }
}
