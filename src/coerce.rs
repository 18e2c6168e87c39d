//! Cell normalisation: numeric coercion with a zero fallback and header cleanup.
//!
//! Workbook cells arrive as free text typed by people (`Rp 1.500.000`, `-`,
//! blank). Numeric columns are coerced with [`CoercionRules`]; anything that is
//! still not a non-negative number after stripping degrades to zero instead of
//! failing the load.

use std::{str::FromStr, sync::OnceLock};

use log::debug;
use regex::{Regex, RegexBuilder};
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoercionRules {
    /// Literal tokens removed before parsing, matched case-insensitively.
    pub strip_tokens: Vec<String>,
    pub thousands_separators: Vec<char>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimal_separator: Option<char>,
    /// Cell contents that stand for "no value" and read as zero.
    pub placeholders: Vec<String>,
    #[serde(skip)]
    pub(crate) pattern: OnceLock<Option<Regex>>,
}

impl Default for CoercionRules {
    fn default() -> Self {
        Self {
            strip_tokens: vec!["Rp".to_string(), "IDR".to_string(), "$".to_string()],
            thousands_separators: vec!['.', ','],
            decimal_separator: None,
            placeholders: vec!["-".to_string()],
            pattern: OnceLock::new(),
        }
    }
}

impl CoercionRules {
    fn strip_pattern(&self) -> Option<&Regex> {
        self.pattern
            .get_or_init(|| {
                let alternatives = self
                    .strip_tokens
                    .iter()
                    .map(|token| token.trim())
                    .filter(|token| !token.is_empty())
                    .map(regex::escape)
                    .collect::<Vec<_>>();
                if alternatives.is_empty() {
                    return None;
                }
                RegexBuilder::new(&alternatives.join("|"))
                    .case_insensitive(true)
                    .build()
                    .ok()
            })
            .as_ref()
    }

    fn is_placeholder(&self, trimmed: &str) -> bool {
        trimmed.is_empty()
            || trimmed.chars().all(|c| c == '-')
            || self.placeholders.iter().any(|p| p.trim() == trimmed)
    }

    /// Coerces a raw cell into a non-negative decimal, falling back to zero.
    pub fn coerce_numeric(&self, raw: &str) -> Decimal {
        let trimmed = raw.trim();
        if self.is_placeholder(trimmed) {
            return Decimal::ZERO;
        }
        let stripped = match self.strip_pattern() {
            Some(pattern) => pattern.replace_all(trimmed, ""),
            None => trimmed.into(),
        };
        let mut body = String::with_capacity(stripped.len());
        for ch in stripped.chars() {
            if ch.is_whitespace() || self.thousands_separators.contains(&ch) {
                continue;
            }
            if Some(ch) == self.decimal_separator {
                body.push('.');
            } else {
                body.push(ch);
            }
        }
        match Decimal::from_str(&body) {
            Ok(value) if value.is_sign_negative() && !value.is_zero() => {
                debug!("Negative value '{raw}' coerced to 0");
                Decimal::ZERO
            }
            Ok(value) => value,
            Err(_) => {
                debug!("Non-numeric value '{raw}' coerced to 0");
                Decimal::ZERO
            }
        }
    }

    /// Integer coercion; fractional parts are truncated.
    pub fn coerce_integer(&self, raw: &str) -> i64 {
        self.coerce_numeric(raw).trunc().to_i64().unwrap_or_else(|| {
            debug!("Value '{raw}' does not fit an integer column, coerced to 0");
            0
        })
    }

    /// Renders a decimal so that [`CoercionRules::coerce_numeric`] reads it back unchanged.
    pub fn format_decimal(&self, value: Decimal) -> String {
        let plain = value.normalize().to_string();
        match self.decimal_separator {
            Some(sep) if sep != '.' => plain.replace('.', &sep.to_string()),
            _ if plain.contains('.') && self.thousands_separators.contains(&'.') => {
                // A '.' would be read as grouping; round to a whole number.
                value
                    .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                    .normalize()
                    .to_string()
            }
            _ => plain,
        }
    }
}

/// [`CoercionRules::coerce_numeric`] with the default rules.
pub fn coerce_numeric(raw: &str) -> Decimal {
    static DEFAULT_RULES: OnceLock<CoercionRules> = OnceLock::new();
    DEFAULT_RULES
        .get_or_init(CoercionRules::default)
        .coerce_numeric(raw)
}

/// Trims a header cell. Missing headers pass through as `None`.
pub fn normalize_header(name: Option<&str>) -> Option<String> {
    name.map(|value| value.trim().to_string())
}

/// Canonical lookup key for a column name: `Transaction Total` -> `transaction_total`.
pub fn column_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    let mut pending_separator = false;
    for ch in name.trim().chars() {
        if ch.is_alphanumeric() {
            if pending_separator && !key.is_empty() {
                key.push('_');
            }
            pending_separator = false;
            key.extend(ch.to_lowercase());
        } else {
            pending_separator = true;
        }
    }
    key
}
