//! Coerción de texto de formulario a tipos de la base de datos
//!
//! Ninguna función falla: un texto vacío o inválido se convierte en `None`.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

lazy_static! {
    /// Miles agrupados con punto o coma: 55.000.000 / 55,000,000
    static ref GROUPED_THOUSANDS: Regex = Regex::new(r"^-?\d{1,3}([.,]\d{3})+$").unwrap();
    static ref NON_NUMERIC: Regex = Regex::new(r"[^0-9.,\-]").unwrap();
}

/// Texto recortado o `None` si queda vacío
pub fn trimmed_or_none(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Entero con la semántica de `parseInt`: signo opcional y dígitos iniciales.
/// Los negativos se descartan porque año y kilometraje no pueden serlo.
pub fn parse_non_negative_int(value: &str) -> Option<i32> {
    let trimmed = value.trim();
    let (negative, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }

    let parsed = digits.parse::<i32>().ok()?;
    if negative && parsed != 0 {
        return None;
    }
    Some(parsed)
}

/// Precio: se eliminan símbolos de moneda y espacios, se colapsan los miles
/// agrupados y se acepta una coma decimal.
pub fn parse_price(value: &str) -> Option<Decimal> {
    let cleaned = NON_NUMERIC.replace_all(value.trim(), "").to_string();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = if GROUPED_THOUSANDS.is_match(&cleaned) {
        cleaned.replace(['.', ','], "")
    } else if cleaned.contains(',') && !cleaned.contains('.') {
        cleaned.replace(',', ".")
    } else {
        cleaned.replace(',', "")
    };

    let price = Decimal::from_str(&normalized).ok()?;
    if price.is_sign_negative() && !price.is_zero() {
        return None;
    }
    Some(price)
}

/// Fecha `YYYY-MM-DD` (formato de un input date)
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    // Acepta también timestamps completos recortando a la parte de fecha
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}
