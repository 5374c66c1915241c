//! Flat key-value input records.
//!
//! One record holds the input row of one person for one decision point.
//! Fields are either numeric or text; choice models and the scheduler read
//! numeric fields with per-field defaults, so a missing key is never fatal —
//! only a present-but-non-numeric value read as a number is an error.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;

use crate::{DataError, DataResult};

// ── Value ─────────────────────────────────────────────────────────────────────

/// One record field: a number or a free-form string.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Number(Decimal),
    Text(String),
}

impl Value {
    /// Read this value as a number.  Text that parses as a decimal counts.
    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Value::Number(d) => Some(*d),
            Value::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Number(_) => None,
        }
    }
}

// ── Record ────────────────────────────────────────────────────────────────────

/// A flat field → value map, the unit of per-person, per-decision input.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    fields: FxHashMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Numeric read: `Ok(None)` if the field is absent, an error naming the
    /// field if it is present but not coercible.
    pub fn number(&self, field: &str) -> DataResult<Option<Decimal>> {
        match self.fields.get(field) {
            None => Ok(None),
            Some(v) => match v.as_number() {
                Some(d) => Ok(Some(d)),
                None => Err(DataError::Coercion {
                    field: field.to_string(),
                    value: format!("{v:?}"),
                }),
            },
        }
    }

    /// Like [`number`][Self::number] but converted to `f64`.
    pub fn float(&self, field: &str) -> DataResult<Option<f64>> {
        Ok(self.number(field)?.and_then(|d| d.to_f64()))
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_text)
    }

    pub fn set_number(&mut self, field: &str, value: Decimal) {
        self.fields.insert(field.to_string(), Value::Number(value));
    }

    /// Store an `f64`-derived value.  Non-finite values are ignored.
    pub fn set_float(&mut self, field: &str, value: f64) {
        if let Some(d) = Decimal::from_f64(value) {
            self.set_number(field, d);
        }
    }

    /// Store a 0/1 indicator.
    pub fn set_flag(&mut self, field: &str, value: bool) {
        self.set_number(field, Decimal::from(value as u8));
    }

    pub fn set_text(&mut self, field: &str, value: &str) {
        self.fields
            .insert(field.to_string(), Value::Text(value.to_string()));
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (S, Value)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        }
    }
}
