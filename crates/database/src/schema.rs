//! Field schema for store configuration documents.
//!
//! Declares every recognized field, its type, whether it must be supplied when
//! a store is first created, and the default applied at creation when it is
//! not. Defaults are never applied to an existing document.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::{DatabaseError, Result};

/// Wire name of the tenant identifier. Positional only, never merged.
pub const SHOP_ID_FIELD: &str = "shopId";

/// System-managed fields that clients may echo back but never set.
pub const SYSTEM_FIELDS: [&str; 2] = ["createdAt", "updatedAt"];

/// Value type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
}

impl FieldKind {
    fn describe(&self) -> &'static str {
        match self {
            FieldKind::Text => "a string",
            FieldKind::Number => "a number",
        }
    }
}

/// A typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Text(String),
    Number(f64),
}

impl ConfigValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            ConfigValue::Text(_) => FieldKind::Text,
            ConfigValue::Number(_) => FieldKind::Number,
        }
    }

    fn is_blank(&self) -> bool {
        matches!(self, ConfigValue::Text(s) if s.trim().is_empty())
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Text(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::Text(value)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Number(value)
    }
}

/// Mutable fields of a store configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigField {
    Name,
    MobileNumber,
    Title,
    GoalAmount,
    InitialMessage,
    ProgressMessage,
    GoalAchievedMessage,
    CurrencySymbol,
    SymbolPosition,
    BgColor,
    TextColor,
    SpecialTextColor,
    FontFamily,
    FontSize,
}

impl ConfigField {
    /// Every field, in column order.
    pub const ALL: [ConfigField; 14] = [
        ConfigField::Name,
        ConfigField::MobileNumber,
        ConfigField::Title,
        ConfigField::GoalAmount,
        ConfigField::InitialMessage,
        ConfigField::ProgressMessage,
        ConfigField::GoalAchievedMessage,
        ConfigField::CurrencySymbol,
        ConfigField::SymbolPosition,
        ConfigField::BgColor,
        ConfigField::TextColor,
        ConfigField::SpecialTextColor,
        ConfigField::FontFamily,
        ConfigField::FontSize,
    ];

    /// Name used in JSON payloads and responses.
    pub fn wire_name(&self) -> &'static str {
        match self {
            ConfigField::MobileNumber => "mobileNumber",
            other => other.column_name(),
        }
    }

    /// Get the database column name for this field.
    pub fn column_name(&self) -> &'static str {
        match self {
            ConfigField::Name => "name",
            ConfigField::MobileNumber => "mobile_number",
            ConfigField::Title => "title",
            ConfigField::GoalAmount => "goal_amount",
            ConfigField::InitialMessage => "initial_message",
            ConfigField::ProgressMessage => "progress_message",
            ConfigField::GoalAchievedMessage => "goal_achieved_message",
            ConfigField::CurrencySymbol => "currency_symbol",
            ConfigField::SymbolPosition => "symbol_position",
            ConfigField::BgColor => "bg_color",
            ConfigField::TextColor => "text_color",
            ConfigField::SpecialTextColor => "special_text_color",
            ConfigField::FontFamily => "font_family",
            ConfigField::FontSize => "font_size",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            ConfigField::GoalAmount | ConfigField::FontSize => FieldKind::Number,
            _ => FieldKind::Text,
        }
    }

    /// Whether the field must be present in the payload that creates a store.
    pub fn required_on_create(&self) -> bool {
        matches!(self, ConfigField::Name | ConfigField::MobileNumber)
    }

    /// Value applied at creation when the creating payload omits the field.
    pub fn default_value(&self) -> Option<ConfigValue> {
        let value: ConfigValue = match self {
            ConfigField::Name | ConfigField::MobileNumber => return None,
            ConfigField::Title => "Free Shipping Bar".into(),
            ConfigField::GoalAmount => ConfigValue::Number(100.0),
            ConfigField::InitialMessage => "Free shipping for orders over {goal_amount}!".into(),
            ConfigField::ProgressMessage => "You're {goal_amount} away from free shipping!".into(),
            ConfigField::GoalAchievedMessage => "Enjoy!! You've got free shipping!".into(),
            ConfigField::CurrencySymbol => "$".into(),
            ConfigField::SymbolPosition => "before".into(),
            ConfigField::BgColor => "#f5f5f5".into(),
            ConfigField::TextColor => "#333333".into(),
            ConfigField::SpecialTextColor => "#008060".into(),
            ConfigField::FontFamily => "sans-serif".into(),
            ConfigField::FontSize => ConfigValue::Number(14.0),
        };
        Some(value)
    }

    /// Look a field up by its JSON name.
    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.wire_name() == name)
    }
}

/// A validated partial update: recognized fields mapped to typed values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigPatch {
    values: BTreeMap<ConfigField, ConfigValue>,
}

impl ConfigPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a loosely-typed JSON object.
    ///
    /// `shopId` and the system timestamps are skipped. Unknown fields and
    /// values of the wrong type are rejected, never coerced or dropped.
    pub fn from_json(payload: &Map<String, Value>) -> Result<Self> {
        let mut patch = Self::new();

        for (key, value) in payload {
            if key == SHOP_ID_FIELD || SYSTEM_FIELDS.contains(&key.as_str()) {
                continue;
            }

            let field = ConfigField::from_wire_name(key)
                .ok_or_else(|| DatabaseError::schema(key, "unrecognized field"))?;

            let typed = match (field.kind(), value) {
                (FieldKind::Text, Value::String(s)) => ConfigValue::Text(s.clone()),
                (FieldKind::Number, Value::Number(n)) => n
                    .as_f64()
                    .filter(|n| n.is_finite())
                    .map(ConfigValue::Number)
                    .ok_or_else(|| DatabaseError::schema(key, "number is out of range"))?,
                (kind, other) => {
                    return Err(DatabaseError::schema(
                        key,
                        format!("expected {}, got {}", kind.describe(), json_type(other)),
                    ))
                }
            };

            patch.values.insert(field, typed);
        }

        Ok(patch)
    }

    /// Set a field, checking the value against the field's declared type.
    pub fn set(&mut self, field: ConfigField, value: impl Into<ConfigValue>) -> Result<()> {
        let value = value.into();
        if value.kind() != field.kind() {
            return Err(DatabaseError::schema(
                field.wire_name(),
                format!("expected {}", field.kind().describe()),
            ));
        }
        self.values.insert(field, value);
        Ok(())
    }

    /// Builder-style [`ConfigPatch::set`].
    pub fn with(mut self, field: ConfigField, value: impl Into<ConfigValue>) -> Result<Self> {
        self.set(field, value)?;
        Ok(self)
    }

    pub fn get(&self, field: ConfigField) -> Option<&ConfigValue> {
        self.values.get(&field)
    }

    pub fn contains(&self, field: ConfigField) -> bool {
        self.values.contains_key(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConfigField, &ConfigValue)> {
        self.values.iter().map(|(field, value)| (*field, value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fields required to create a store that this patch does not supply.
    /// A blank string does not count as supplied.
    pub fn missing_required(&self) -> Vec<ConfigField> {
        ConfigField::ALL
            .into_iter()
            .filter(|field| field.required_on_create())
            .filter(|field| self.get(*field).map_or(true, ConfigValue::is_blank))
            .collect()
    }
}

/// Defaults for every defaulted field the patch does not supply.
pub fn defaults_for(patch: &ConfigPatch) -> BTreeMap<ConfigField, ConfigValue> {
    ConfigField::ALL
        .into_iter()
        .filter(|field| !patch.contains(*field))
        .filter_map(|field| field.default_value().map(|value| (field, value)))
        .collect()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
