//! Writable fact types and their raw-input parsers

use crate::error::ParseError;
use crate::fact::value::*;
use crate::path::ItemId;
use serde::{Deserialize, Serialize};

/// Type of a writable fact.
///
/// Declared in dictionaries as `"Dollar"` or, for parameterized types,
/// `{"Enum": {"optionsPath": "/filingStatusOptions", "options": [...]}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FactType {
    Boolean,
    String,
    Int,
    Dollar,
    Day,
    #[serde(rename_all = "camelCase")]
    Enum {
        options_path: String,
        options: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    MultiEnum {
        options_path: String,
        options: Vec<String>,
    },
    Tin,
    Ein,
    Pin,
    IpPin,
    Address,
    PhoneNumber,
    EmailAddress,
    Collection,
    /// Reference to an item of the named collection
    CollectionItem { collection: String },
}

impl FactType {
    pub fn kind(&self) -> ValueKind {
        match self {
            FactType::Boolean => ValueKind::Boolean,
            FactType::String => ValueKind::String,
            FactType::Int => ValueKind::Int,
            FactType::Dollar => ValueKind::Dollar,
            FactType::Day => ValueKind::Day,
            FactType::Enum { .. } => ValueKind::Enum,
            FactType::MultiEnum { .. } => ValueKind::MultiEnum,
            FactType::Tin => ValueKind::Tin,
            FactType::Ein => ValueKind::Ein,
            FactType::Pin => ValueKind::Pin,
            FactType::IpPin => ValueKind::IpPin,
            FactType::Address => ValueKind::Address,
            FactType::PhoneNumber => ValueKind::PhoneNumber,
            FactType::EmailAddress => ValueKind::EmailAddress,
            FactType::Collection => ValueKind::Collection,
            FactType::CollectionItem { .. } => ValueKind::CollectionItem,
        }
    }

    /// Parse user-entered text into a value of this type
    pub fn parse_raw(&self, raw: &str) -> Result<FactValue, ParseError> {
        let trimmed = raw.trim();
        let value = match self {
            FactType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "yes" => FactValue::Boolean(true),
                "false" | "no" => FactValue::Boolean(false),
                _ => {
                    return Err(ParseError::Malformed {
                        kind: "boolean",
                        input: raw.to_string(),
                    })
                }
            },
            FactType::String => FactValue::String(raw.to_string()),
            FactType::Int => {
                FactValue::Int(trimmed.parse().map_err(|_| ParseError::Malformed {
                    kind: "integer",
                    input: raw.to_string(),
                })?)
            }
            FactType::Dollar => FactValue::Dollar(trimmed.parse()?),
            FactType::Day => FactValue::Day(trimmed.parse()?),
            FactType::Enum { options_path, .. } => FactValue::Enum(EnumValue {
                value: trimmed.to_string(),
                options_path: options_path.clone(),
            }),
            FactType::MultiEnum { options_path, .. } => FactValue::MultiEnum(MultiEnumValue {
                values: trimmed
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect(),
                options_path: options_path.clone(),
            }),
            FactType::Tin => FactValue::Tin(trimmed.parse()?),
            FactType::Ein => FactValue::Ein(trimmed.parse()?),
            FactType::Pin => FactValue::Pin(trimmed.parse()?),
            FactType::IpPin => FactValue::IpPin(trimmed.parse()?),
            FactType::Address => {
                FactValue::Address(serde_json::from_str(trimmed).map_err(|_| {
                    ParseError::Malformed {
                        kind: "address",
                        input: raw.to_string(),
                    }
                })?)
            }
            FactType::PhoneNumber => FactValue::PhoneNumber(trimmed.parse()?),
            FactType::EmailAddress => FactValue::EmailAddress(trimmed.parse()?),
            FactType::Collection => FactValue::Collection(Collection {
                items: trimmed
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(|id| {
                        ItemId::new(id).map_err(|_| ParseError::Malformed {
                            kind: "collection item id",
                            input: id.to_string(),
                        })
                    })
                    .collect::<Result<_, _>>()?,
            }),
            FactType::CollectionItem { .. } => FactValue::CollectionItem(CollectionItem {
                id: ItemId::new(trimmed.trim_start_matches('#')).map_err(|_| {
                    ParseError::Malformed {
                        kind: "collection item id",
                        input: raw.to_string(),
                    }
                })?,
            }),
        };
        self.check(&value)?;
        Ok(value)
    }

    /// Check that an already-typed value belongs to this type
    pub fn check(&self, value: &FactValue) -> Result<(), ParseError> {
        if value.kind() != self.kind() {
            return Err(ParseError::TypeMismatch {
                expected: self.kind().to_string(),
                actual: value.kind().to_string(),
            });
        }
        match (self, value) {
            (FactType::Enum { options_path, options }, FactValue::Enum(e)) => {
                check_option(&e.value, options_path, options)
            }
            (FactType::MultiEnum { options_path, options }, FactValue::MultiEnum(m)) => {
                for v in &m.values {
                    check_option(v, options_path, options)?;
                }
                Ok(())
            }
            (FactType::Collection, FactValue::Collection(c)) => c.check_unique(),
            (FactType::Pin, FactValue::Pin(p)) => p.pin.parse::<Pin>().map(|_| ()),
            (FactType::IpPin, FactValue::IpPin(p)) => p.pin.parse::<IpPin>().map(|_| ()),
            (FactType::Tin, FactValue::Tin(t)) => t.to_string().parse::<Tin>().map(|_| ()),
            (FactType::Ein, FactValue::Ein(e)) => e.to_string().parse::<Ein>().map(|_| ()),
            _ => Ok(()),
        }
    }
}

fn check_option(value: &str, options_path: &str, options: &[String]) -> Result<(), ParseError> {
    if options.iter().any(|o| o == value) {
        Ok(())
    } else {
        Err(ParseError::UnknownOption {
            value: value.to_string(),
            options_path: options_path.to_string(),
        })
    }
}
