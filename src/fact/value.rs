//! Fact values and their persisted wrapper shape.
//!
//! Every value serializes as `{ "$type": "<wrapper tag>", "item": <payload> }`,
//! the shape stored returns already use.

use crate::error::ParseError;
use crate::path::ItemId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A typed fact value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "$type", content = "item")]
pub enum FactValue {
    #[serde(rename = "gov.irs.factgraph.persisters.BooleanWrapper")]
    Boolean(bool),
    #[serde(rename = "gov.irs.factgraph.persisters.StringWrapper")]
    String(String),
    #[serde(rename = "gov.irs.factgraph.persisters.IntWrapper")]
    Int(i64),
    #[serde(rename = "gov.irs.factgraph.persisters.DollarWrapper")]
    Dollar(Dollar),
    #[serde(rename = "gov.irs.factgraph.persisters.DayWrapper")]
    Day(Day),
    #[serde(rename = "gov.irs.factgraph.persisters.EnumWrapper")]
    Enum(EnumValue),
    #[serde(rename = "gov.irs.factgraph.persisters.MultiEnumWrapper")]
    MultiEnum(MultiEnumValue),
    #[serde(rename = "gov.irs.factgraph.persisters.TinWrapper")]
    Tin(Tin),
    #[serde(rename = "gov.irs.factgraph.persisters.EinWrapper")]
    Ein(Ein),
    #[serde(rename = "gov.irs.factgraph.persisters.PinWrapper")]
    Pin(Pin),
    #[serde(rename = "gov.irs.factgraph.persisters.IpPinWrapper")]
    IpPin(IpPin),
    #[serde(rename = "gov.irs.factgraph.persisters.AddressWrapper")]
    Address(Address),
    #[serde(rename = "gov.irs.factgraph.persisters.E164Wrapper")]
    PhoneNumber(PhoneNumber),
    #[serde(rename = "gov.irs.factgraph.persisters.EmailAddressWrapper")]
    EmailAddress(EmailAddress),
    #[serde(rename = "gov.irs.factgraph.persisters.CollectionWrapper")]
    Collection(Collection),
    #[serde(rename = "gov.irs.factgraph.persisters.CollectionItemWrapper")]
    CollectionItem(CollectionItem),
}

/// The kind of a value, without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Boolean,
    String,
    Int,
    Dollar,
    Day,
    Enum,
    MultiEnum,
    Tin,
    Ein,
    Pin,
    IpPin,
    Address,
    PhoneNumber,
    EmailAddress,
    Collection,
    CollectionItem,
}

impl ValueKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, ValueKind::Int | ValueKind::Dollar)
    }

    pub fn is_ordered(self) -> bool {
        matches!(self, ValueKind::Int | ValueKind::Dollar | ValueKind::Day)
    }

    pub fn is_textual(self) -> bool {
        matches!(self, ValueKind::String | ValueKind::EmailAddress)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl FactValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            FactValue::Boolean(_) => ValueKind::Boolean,
            FactValue::String(_) => ValueKind::String,
            FactValue::Int(_) => ValueKind::Int,
            FactValue::Dollar(_) => ValueKind::Dollar,
            FactValue::Day(_) => ValueKind::Day,
            FactValue::Enum(_) => ValueKind::Enum,
            FactValue::MultiEnum(_) => ValueKind::MultiEnum,
            FactValue::Tin(_) => ValueKind::Tin,
            FactValue::Ein(_) => ValueKind::Ein,
            FactValue::Pin(_) => ValueKind::Pin,
            FactValue::IpPin(_) => ValueKind::IpPin,
            FactValue::Address(_) => ValueKind::Address,
            FactValue::PhoneNumber(_) => ValueKind::PhoneNumber,
            FactValue::EmailAddress(_) => ValueKind::EmailAddress,
            FactValue::Collection(_) => ValueKind::Collection,
            FactValue::CollectionItem(_) => ValueKind::CollectionItem,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FactValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            FactValue::Collection(c) => Some(c),
            _ => None,
        }
    }

    /// Numeric value in cents; ints count as whole dollars
    pub fn as_cents(&self) -> Option<i64> {
        match self {
            FactValue::Int(i) => i.checked_mul(100),
            FactValue::Dollar(d) => Some(d.cents()),
            _ => None,
        }
    }

    /// Character length of textual values
    pub fn text_len(&self) -> Option<usize> {
        match self {
            FactValue::String(s) => Some(s.chars().count()),
            FactValue::EmailAddress(e) => Some(e.email.chars().count()),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            FactValue::String(s) => Some(s),
            FactValue::EmailAddress(e) => Some(&e.email),
            _ => None,
        }
    }

    /// Ordering between comparable values (numbers with numbers, days with days)
    pub fn compare(&self, other: &FactValue) -> Option<Ordering> {
        match (self, other) {
            (FactValue::Int(a), FactValue::Int(b)) => Some(a.cmp(b)),
            (FactValue::Day(a), FactValue::Day(b)) => Some(a.date.cmp(&b.date)),
            _ => Some(self.as_cents()?.cmp(&other.as_cents()?)),
        }
    }

    /// Equality that treats an enum value and its option name as equal
    pub fn loosely_equals(&self, other: &FactValue) -> bool {
        match (self, other) {
            (FactValue::Enum(e), FactValue::String(s)) | (FactValue::String(s), FactValue::Enum(e)) => {
                &e.value == s
            }
            (FactValue::Enum(a), FactValue::Enum(b)) => a.value == b.value,
            _ if self.kind().is_numeric() && other.kind().is_numeric() => {
                self.as_cents() == other.as_cents()
            }
            _ => self == other,
        }
    }
}

impl fmt::Display for FactValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactValue::Boolean(b) => write!(f, "{}", b),
            FactValue::String(s) => f.write_str(s),
            FactValue::Int(i) => write!(f, "{}", i),
            FactValue::Dollar(d) => write!(f, "{}", d),
            FactValue::Day(d) => write!(f, "{}", d.date),
            FactValue::Enum(e) => f.write_str(&e.value),
            FactValue::MultiEnum(m) => f.write_str(&m.values.join(", ")),
            FactValue::Tin(t) => write!(f, "{}", t),
            FactValue::Ein(e) => write!(f, "{}", e),
            FactValue::Pin(p) => f.write_str(&p.pin),
            FactValue::IpPin(p) => f.write_str(&p.pin),
            FactValue::Address(a) => write!(f, "{}", a),
            FactValue::PhoneNumber(p) => write!(f, "{}", p),
            FactValue::EmailAddress(e) => f.write_str(&e.email),
            FactValue::Collection(c) => {
                let ids: Vec<&str> = c.items.iter().map(ItemId::as_str).collect();
                write!(f, "[{}]", ids.join(", "))
            }
            FactValue::CollectionItem(i) => write!(f, "#{}", i.id),
        }
    }
}

/// Currency amount held as whole cents; persisted as a decimal string
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Dollar(i64);

impl Dollar {
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn cents(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Dollar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl FromStr for Dollar {
    type Err = ParseError;

    /// Accepts `1234`, `1234.5`, `-12.34`, `$1,234.56`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ParseError::Malformed {
            kind: "dollar amount",
            input: s.to_string(),
        };
        let cleaned: String = s
            .trim()
            .chars()
            .filter(|c| *c != ',' && *c != '$')
            .collect();
        let (negative, digits) = match cleaned.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, cleaned.as_str()),
        };
        let (whole, fraction) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(malformed());
        }
        if fraction.len() > 2
            || !whole.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(malformed());
        }
        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| malformed())?
        };
        let fraction: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| malformed())? * 10,
            _ => fraction.parse().map_err(|_| malformed())?,
        };
        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(fraction))
            .ok_or_else(malformed)?;
        Ok(Dollar(if negative { -cents } else { cents }))
    }
}

impl TryFrom<String> for Dollar {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Dollar> for String {
    fn from(d: Dollar) -> Self {
        d.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Day {
    pub date: NaiveDate,
}

impl FromStr for Day {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(|date| Day { date })
            .map_err(|_| ParseError::Malformed {
                kind: "date",
                input: s.to_string(),
            })
    }
}

/// Single-select enumeration; the option list lives at `options_path`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EnumRepr", into = "EnumRepr")]
pub struct EnumValue {
    pub value: String,
    pub options_path: String,
}

#[derive(Serialize, Deserialize)]
struct EnumRepr {
    value: Vec<String>,
    #[serde(rename = "enumOptionsPath")]
    enum_options_path: String,
}

impl TryFrom<EnumRepr> for EnumValue {
    type Error = ParseError;

    fn try_from(repr: EnumRepr) -> Result<Self, Self::Error> {
        let mut values = repr.value.into_iter();
        match (values.next(), values.next()) {
            (Some(value), None) => Ok(EnumValue {
                value,
                options_path: repr.enum_options_path,
            }),
            _ => Err(ParseError::Malformed {
                kind: "enum value",
                input: repr.enum_options_path,
            }),
        }
    }
}

impl From<EnumValue> for EnumRepr {
    fn from(e: EnumValue) -> Self {
        EnumRepr {
            value: vec![e.value],
            enum_options_path: e.options_path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiEnumValue {
    #[serde(rename = "value")]
    pub values: Vec<String>,
    #[serde(rename = "enumOptionsPath")]
    pub options_path: String,
}

fn split_digits(s: &str, kind: &'static str, groups: &[usize]) -> Result<Vec<String>, ParseError> {
    let digits: String = s
        .trim()
        .chars()
        .filter(|c| *c != '-' && *c != ' ')
        .collect();
    let expected: usize = groups.iter().sum();
    if digits.len() != expected || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ParseError::Malformed {
            kind,
            input: s.to_string(),
        });
    }
    let mut out = Vec::with_capacity(groups.len());
    let mut start = 0;
    for len in groups {
        out.push(digits[start..start + len].to_string());
        start += len;
    }
    Ok(out)
}

/// Taxpayer identification number (SSN/ITIN/ATIN)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tin {
    pub area: String,
    pub group: String,
    pub serial: String,
}

impl FromStr for Tin {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = split_digits(s, "TIN", &[3, 2, 4])?.into_iter();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(area), Some(group), Some(serial)) => Ok(Tin { area, group, serial }),
            _ => Err(ParseError::Malformed {
                kind: "TIN",
                input: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Tin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.area, self.group, self.serial)
    }
}

/// Employer identification number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ein {
    pub prefix: String,
    pub serial: String,
}

impl FromStr for Ein {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = split_digits(s, "EIN", &[2, 7])?.into_iter();
        match (parts.next(), parts.next()) {
            (Some(prefix), Some(serial)) => Ok(Ein { prefix, serial }),
            _ => Err(ParseError::Malformed {
                kind: "EIN",
                input: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Ein {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.prefix, self.serial)
    }
}

/// Self-select signature PIN, five digits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pin {
    pub pin: String,
}

impl FromStr for Pin {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let pin = split_digits(s, "PIN", &[5])?.concat();
        Ok(Pin { pin })
    }
}

/// Identity protection PIN, six digits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpPin {
    pub pin: String,
}

impl FromStr for IpPin {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let pin = split_digits(s, "IP PIN", &[6])?.concat();
        Ok(IpPin { pin })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street_address: String,
    pub city: String,
    pub postal_code: String,
    /// Spelled as stored returns spell it
    #[serde(rename = "stateOrProvence")]
    pub state_or_province: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub country: String,
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {} {}",
            self.street_address, self.city, self.state_or_province, self.postal_code
        )?;
        if !self.country.is_empty() {
            write!(f, ", {}", self.country)?;
        }
        Ok(())
    }
}

/// E.164 phone number; only US numbers are stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum PhoneNumber {
    #[serde(rename = "gov.irs.factgraph.types.UsPhoneNumber", rename_all = "camelCase")]
    Us {
        area_code: String,
        office_code: String,
        line_number: String,
    },
}

impl FromStr for PhoneNumber {
    type Err = ParseError;

    /// Accepts `+14445550100`, `444-555-0100`, `(444) 555-0100`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
        let national = match digits.len() {
            10 => digits.as_str(),
            11 if digits.starts_with('1') => &digits[1..],
            _ => {
                return Err(ParseError::Malformed {
                    kind: "phone number",
                    input: s.to_string(),
                })
            }
        };
        Ok(PhoneNumber::Us {
            area_code: national[..3].to_string(),
            office_code: national[3..6].to_string(),
            line_number: national[6..].to_string(),
        })
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhoneNumber::Us {
                area_code,
                office_code,
                line_number,
            } => write!(f, "+1{}{}{}", area_code, office_code, line_number),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    pub email: String,
}

impl FromStr for EmailAddress {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let email = s.trim();
        let valid = match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.contains('@')
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
                    && !email.chars().any(char::is_whitespace)
            }
            None => false,
        };
        if !valid {
            return Err(ParseError::Malformed {
                kind: "email address",
                input: s.to_string(),
            });
        }
        Ok(EmailAddress {
            email: email.to_string(),
        })
    }
}

/// Ordered set of item ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub items: Vec<ItemId>,
}

impl Collection {
    pub fn contains(&self, id: &ItemId) -> bool {
        self.items.contains(id)
    }

    /// Fails on the first repeated id
    pub fn check_unique(&self) -> Result<(), ParseError> {
        for (i, id) in self.items.iter().enumerate() {
            if self.items[..i].contains(id) {
                return Err(ParseError::DuplicateItem(id.to_string()));
            }
        }
        Ok(())
    }
}

/// Reference to an item of some collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionItem {
    pub id: ItemId,
}
