//! Input collection from the form boundary

use crate::catalog::{Catalog, FieldKind};
use kdrisk_core::{Error, RawInput, Result};
use std::collections::HashMap;

/// Source of raw text entered for each form field
pub trait FormSource {
    /// Text entered for a field, `None` if the field was not submitted
    fn field_text(&self, name: &str) -> Option<&str>;
}

impl FormSource for HashMap<String, String> {
    fn field_text(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl<'a> FormSource for [(&'a str, &'a str)] {
    fn field_text(&self, name: &str) -> Option<&str> {
        self.iter().find(|(k, _)| *k == name).map(|(_, v)| *v)
    }
}

/// Read one value per catalog field.
///
/// Blank or absent fields are recorded as unset rather than zero, so the
/// validator can tell an omission from an honest zero measurement.
pub fn collect<F: FormSource + ?Sized>(catalog: &Catalog, form: &F) -> Result<RawInput> {
    let mut input = RawInput::new();

    for spec in catalog.fields {
        let text = form.field_text(spec.name).map(str::trim).unwrap_or("");
        if text.is_empty() {
            input.unset(spec.name);
            continue;
        }

        let value = match spec.kind {
            FieldKind::Sex => parse_sex(spec.name, text)?,
            FieldKind::Numeric { .. } => parse_numeric(spec.name, text)?,
        };
        input.set(spec.name, value);
    }

    Ok(input)
}

fn parse_sex(field: &str, text: &str) -> Result<f64> {
    match text.to_ascii_lowercase().as_str() {
        "0" | "f" | "female" => Ok(0.0),
        "1" | "m" | "male" => Ok(1.0),
        _ => Err(Error::invalid_value(
            field,
            format!("'{}' is not one of Female, Male", text),
        )),
    }
}

fn parse_numeric(field: &str, text: &str) -> Result<f64> {
    let value: f64 = text
        .parse()
        .map_err(|_| Error::invalid_value(field, format!("'{}' is not a number", text)))?;

    if !value.is_finite() {
        return Err(Error::invalid_value(field, "value must be finite"));
    }

    Ok(value)
}
