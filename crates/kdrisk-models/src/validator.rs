//! Completeness and value checks run before any model call

use crate::catalog::{Catalog, FieldKind};
use kdrisk_core::{Error, RawInput, Result};

/// Check that every required field is set and every set value is usable.
///
/// Missing fields are reported together, in catalog order, before any value
/// check runs. The input is handed back unchanged on success.
pub fn validate(input: RawInput, catalog: &Catalog) -> Result<RawInput> {
    let missing: Vec<String> = catalog
        .fields
        .iter()
        .filter(|spec| spec.required && !input.is_set(spec.name))
        .map(|spec| spec.name.to_string())
        .collect();

    if !missing.is_empty() {
        return Err(Error::MissingFields(missing));
    }

    for spec in catalog.fields {
        let Some(value) = input.get(spec.name) else {
            continue;
        };

        if !value.is_finite() {
            return Err(Error::invalid_value(spec.name, "value must be finite"));
        }

        if spec.kind == FieldKind::Sex && value != 0.0 && value != 1.0 {
            return Err(Error::invalid_value(
                spec.name,
                format!("{} is not a sex code (0 = Female, 1 = Male)", value),
            ));
        }
    }

    Ok(input)
}
