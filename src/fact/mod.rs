//! Facts: values, types, results, expressions and the dictionary

pub mod dictionary;
pub mod expr;
pub mod limits;
pub mod result;
pub mod types;
pub mod value;

pub use dictionary::{
    DefinitionDeclaration, DerivedDeclaration, DictionaryBuilder, DictionaryDeclaration,
    FactDeclaration, FactDefinition, FactDictionary, FactKind, WritableDeclaration,
};
pub use expr::{Case, Expr, ExprDecl};
pub use limits::{BoundDeclaration, Limit, LimitDeclaration, LimitViolation};
pub use result::FactResult;
pub use types::FactType;
pub use value::{
    Address, Collection, CollectionItem, Day, Dollar, Ein, EmailAddress, EnumValue, FactValue,
    IpPin, MultiEnumValue, PhoneNumber, Pin, Tin, ValueKind,
};
