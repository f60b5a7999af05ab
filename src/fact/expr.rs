//! Derived-fact expressions.
//!
//! Expressions are declared with string references (`Expr<String>`, where
//! `../wages` is relative to the owning fact) and compiled by the dictionary
//! into `Expr<AbstractPath>`.

use crate::fact::value::{Dollar, ValueKind};
use serde::{Deserialize, Serialize};

/// A derived-fact expression over fact paths of type `P`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr<P> {
    Boolean(bool),
    Int(i64),
    Dollar(Dollar),
    String(String),

    /// Value of another fact, bound to the owner's collection item
    Dependency(P),

    Add(Vec<Expr<P>>),
    Subtract {
        minuend: Box<Expr<P>>,
        subtrahends: Vec<Expr<P>>,
    },
    Multiply(Vec<Expr<P>>),
    Maximum(Vec<Expr<P>>),
    Minimum(Vec<Expr<P>>),

    Equal(Box<Expr<P>>, Box<Expr<P>>),
    NotEqual(Box<Expr<P>>, Box<Expr<P>>),
    GreaterThan(Box<Expr<P>>, Box<Expr<P>>),
    GreaterThanOrEqual(Box<Expr<P>>, Box<Expr<P>>),
    LessThan(Box<Expr<P>>, Box<Expr<P>>),
    LessThanOrEqual(Box<Expr<P>>, Box<Expr<P>>),

    Not(Box<Expr<P>>),
    All(Vec<Expr<P>>),
    Any(Vec<Expr<P>>),
    Switch(Vec<Case<P>>),
    IsComplete(Box<Expr<P>>),

    /// Number of items in a collection
    CollectionSize(P),
    /// Sum of a per-item numeric fact (`/formW2s/*/wages`) over all items
    CollectionSum(P),
    /// Number of items whose per-item boolean fact is true
    Count(P),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case<P> {
    pub when: Expr<P>,
    pub then: Expr<P>,
}

/// How an expression uses a referenced path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    /// Read as a value in the owner's item scope
    Value,
    /// Must name a collection fact in the owner's item scope
    Collection,
    /// Per-item fact with exactly one wildcard left free after binding
    PerItem,
}

pub type ExprDecl = Expr<String>;

impl<P> Expr<P> {
    pub fn dependency(path: impl Into<P>) -> Self {
        Expr::Dependency(path.into())
    }

    /// Every path referenced, with how it is used
    pub fn references(&self) -> Vec<(&P, Reference)> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<(&'a P, Reference)>) {
        match self {
            Expr::Boolean(_) | Expr::Int(_) | Expr::Dollar(_) | Expr::String(_) => {}
            Expr::Dependency(p) => out.push((p, Reference::Value)),
            Expr::CollectionSize(p) => out.push((p, Reference::Collection)),
            Expr::CollectionSum(p) | Expr::Count(p) => out.push((p, Reference::PerItem)),
            Expr::Add(xs)
            | Expr::Multiply(xs)
            | Expr::Maximum(xs)
            | Expr::Minimum(xs)
            | Expr::All(xs)
            | Expr::Any(xs) => xs.iter().for_each(|x| x.collect_references(out)),
            Expr::Subtract {
                minuend,
                subtrahends,
            } => {
                minuend.collect_references(out);
                subtrahends.iter().for_each(|x| x.collect_references(out));
            }
            Expr::Equal(a, b)
            | Expr::NotEqual(a, b)
            | Expr::GreaterThan(a, b)
            | Expr::GreaterThanOrEqual(a, b)
            | Expr::LessThan(a, b)
            | Expr::LessThanOrEqual(a, b) => {
                a.collect_references(out);
                b.collect_references(out);
            }
            Expr::Not(x) | Expr::IsComplete(x) => x.collect_references(out),
            Expr::Switch(cases) => cases.iter().for_each(|c| {
                c.when.collect_references(out);
                c.then.collect_references(out);
            }),
        }
    }

    /// Rewrite every referenced path
    pub fn try_map_paths<Q, E>(self, f: &mut impl FnMut(P) -> Result<Q, E>) -> Result<Expr<Q>, E> {
        let map_vec = |xs: Vec<Expr<P>>, f: &mut dyn FnMut(Expr<P>) -> Result<Expr<Q>, E>| {
            xs.into_iter().map(f).collect::<Result<Vec<_>, E>>()
        };
        Ok(match self {
            Expr::Boolean(b) => Expr::Boolean(b),
            Expr::Int(i) => Expr::Int(i),
            Expr::Dollar(d) => Expr::Dollar(d),
            Expr::String(s) => Expr::String(s),
            Expr::Dependency(p) => Expr::Dependency(f(p)?),
            Expr::CollectionSize(p) => Expr::CollectionSize(f(p)?),
            Expr::CollectionSum(p) => Expr::CollectionSum(f(p)?),
            Expr::Count(p) => Expr::Count(f(p)?),
            Expr::Add(xs) => Expr::Add(map_vec(xs, &mut |x| x.try_map_paths(f))?),
            Expr::Multiply(xs) => Expr::Multiply(map_vec(xs, &mut |x| x.try_map_paths(f))?),
            Expr::Maximum(xs) => Expr::Maximum(map_vec(xs, &mut |x| x.try_map_paths(f))?),
            Expr::Minimum(xs) => Expr::Minimum(map_vec(xs, &mut |x| x.try_map_paths(f))?),
            Expr::All(xs) => Expr::All(map_vec(xs, &mut |x| x.try_map_paths(f))?),
            Expr::Any(xs) => Expr::Any(map_vec(xs, &mut |x| x.try_map_paths(f))?),
            Expr::Subtract {
                minuend,
                subtrahends,
            } => Expr::Subtract {
                minuend: Box::new(minuend.try_map_paths(f)?),
                subtrahends: map_vec(subtrahends, &mut |x| x.try_map_paths(f))?,
            },
            Expr::Equal(a, b) => Expr::Equal(Box::new(a.try_map_paths(f)?), Box::new(b.try_map_paths(f)?)),
            Expr::NotEqual(a, b) => {
                Expr::NotEqual(Box::new(a.try_map_paths(f)?), Box::new(b.try_map_paths(f)?))
            }
            Expr::GreaterThan(a, b) => {
                Expr::GreaterThan(Box::new(a.try_map_paths(f)?), Box::new(b.try_map_paths(f)?))
            }
            Expr::GreaterThanOrEqual(a, b) => Expr::GreaterThanOrEqual(
                Box::new(a.try_map_paths(f)?),
                Box::new(b.try_map_paths(f)?),
            ),
            Expr::LessThan(a, b) => {
                Expr::LessThan(Box::new(a.try_map_paths(f)?), Box::new(b.try_map_paths(f)?))
            }
            Expr::LessThanOrEqual(a, b) => Expr::LessThanOrEqual(
                Box::new(a.try_map_paths(f)?),
                Box::new(b.try_map_paths(f)?),
            ),
            Expr::Not(x) => Expr::Not(Box::new(x.try_map_paths(f)?)),
            Expr::IsComplete(x) => Expr::IsComplete(Box::new(x.try_map_paths(f)?)),
            Expr::Switch(cases) => Expr::Switch(
                cases
                    .into_iter()
                    .map(|c| {
                        Ok(Case {
                            when: c.when.try_map_paths(f)?,
                            then: c.then.try_map_paths(f)?,
                        })
                    })
                    .collect::<Result<Vec<_>, E>>()?,
            ),
        })
    }

    /// Infer the value kind this expression produces.
    ///
    /// `kind_of` supplies the kind of each referenced path. Returns a
    /// description of the first type error.
    pub fn infer_kind(&self, kind_of: &impl Fn(&P) -> Option<ValueKind>) -> Result<ValueKind, String> {
        let lookup = |p: &P| kind_of(p).ok_or_else(|| "reference has no known type".to_string());
        match self {
            Expr::Boolean(_) => Ok(ValueKind::Boolean),
            Expr::Int(_) => Ok(ValueKind::Int),
            Expr::Dollar(_) => Ok(ValueKind::Dollar),
            Expr::String(_) => Ok(ValueKind::String),
            Expr::Dependency(p) => lookup(p),
            Expr::CollectionSize(_) => Ok(ValueKind::Int),
            Expr::Count(p) => match lookup(p)? {
                ValueKind::Boolean => Ok(ValueKind::Int),
                other => Err(format!("Count needs a boolean fact, found {}", other)),
            },
            Expr::CollectionSum(p) => {
                let kind = lookup(p)?;
                if kind.is_numeric() {
                    Ok(kind)
                } else {
                    Err(format!("CollectionSum needs a numeric fact, found {}", kind))
                }
            }
            Expr::Add(xs) | Expr::Multiply(xs) | Expr::Maximum(xs) | Expr::Minimum(xs) => {
                numeric_kind(xs.iter(), kind_of)
            }
            Expr::Subtract {
                minuend,
                subtrahends,
            } => numeric_kind(std::iter::once(&**minuend).chain(subtrahends.iter()), kind_of),
            Expr::Equal(a, b) | Expr::NotEqual(a, b) => {
                let (ka, kb) = (a.infer_kind(kind_of)?, b.infer_kind(kind_of)?);
                let comparable = ka == kb
                    || (ka.is_numeric() && kb.is_numeric())
                    || matches!(
                        (ka, kb),
                        (ValueKind::Enum, ValueKind::String) | (ValueKind::String, ValueKind::Enum)
                    );
                if comparable {
                    Ok(ValueKind::Boolean)
                } else {
                    Err(format!("cannot compare {} with {}", ka, kb))
                }
            }
            Expr::GreaterThan(a, b)
            | Expr::GreaterThanOrEqual(a, b)
            | Expr::LessThan(a, b)
            | Expr::LessThanOrEqual(a, b) => {
                let (ka, kb) = (a.infer_kind(kind_of)?, b.infer_kind(kind_of)?);
                let ordered = (ka.is_numeric() && kb.is_numeric())
                    || (ka == ValueKind::Day && kb == ValueKind::Day);
                if ordered {
                    Ok(ValueKind::Boolean)
                } else {
                    Err(format!("cannot order {} against {}", ka, kb))
                }
            }
            Expr::Not(x) => expect_boolean(x, kind_of),
            Expr::All(xs) | Expr::Any(xs) => {
                for x in xs {
                    expect_boolean(x, kind_of)?;
                }
                Ok(ValueKind::Boolean)
            }
            Expr::IsComplete(x) => {
                x.infer_kind(kind_of)?;
                Ok(ValueKind::Boolean)
            }
            Expr::Switch(cases) => {
                let mut result = None;
                for case in cases {
                    expect_boolean(&case.when, kind_of)?;
                    let kind = case.then.infer_kind(kind_of)?;
                    match result {
                        None => result = Some(kind),
                        Some(k) if k == kind => {}
                        Some(k) if k.is_numeric() && kind.is_numeric() => {
                            result = Some(ValueKind::Dollar)
                        }
                        Some(k) => return Err(format!("Switch mixes {} and {}", k, kind)),
                    }
                }
                result.ok_or_else(|| "Switch has no cases".to_string())
            }
        }
    }
}

fn expect_boolean<P>(
    expr: &Expr<P>,
    kind_of: &impl Fn(&P) -> Option<ValueKind>,
) -> Result<ValueKind, String> {
    match expr.infer_kind(kind_of)? {
        ValueKind::Boolean => Ok(ValueKind::Boolean),
        other => Err(format!("expected a boolean operand, found {}", other)),
    }
}

/// Int when every operand is Int, Dollar when any operand is Dollar
fn numeric_kind<'a, P: 'a>(
    operands: impl Iterator<Item = &'a Expr<P>>,
    kind_of: &impl Fn(&P) -> Option<ValueKind>,
) -> Result<ValueKind, String> {
    let mut kind = None;
    for operand in operands {
        let k = operand.infer_kind(kind_of)?;
        if !k.is_numeric() {
            return Err(format!("expected a numeric operand, found {}", k));
        }
        kind = Some(match kind {
            Some(ValueKind::Dollar) => ValueKind::Dollar,
            _ => k,
        });
    }
    kind.ok_or_else(|| "arithmetic needs at least one operand".to_string())
}
