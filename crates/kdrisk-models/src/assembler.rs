//! Feature vector assembly
//!
//! The single place where the model's column order is applied. Inputs are
//! collected in form order, which need not match the order the model was
//! fit on; a silently misordered vector still yields a plausible-looking
//! probability, so every lookup here goes through the catalog by name.

use crate::catalog::Catalog;
use kdrisk_core::{Error, FeatureVector, RawInput, Result};

/// Reorder validated input into the catalog's column order.
///
/// Unset optional fields become `NaN`, the missing marker the tree models
/// route through their default branch.
pub fn assemble(input: &RawInput, catalog: &Catalog) -> Result<FeatureVector> {
    if let Some(unknown) = input.names().find(|name| !catalog.contains(name)) {
        return Err(Error::UnknownFeature(unknown.to_string()));
    }

    let mut values = Vec::with_capacity(catalog.len());
    for spec in catalog.fields {
        match input.get(spec.name) {
            Some(value) => values.push(value),
            None if !spec.required => values.push(f64::NAN),
            None => {}
        }
    }

    if values.len() != catalog.len() {
        return Err(Error::OrderMismatch {
            expected: catalog.len(),
            actual: values.len(),
        });
    }

    Ok(FeatureVector::new(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CAA_V1, IVIG_V1};

    #[test]
    fn test_reorders_form_order_into_column_order() {
        // Form order: labs, then echo, then clinical
        let input = RawInput::new()
            .with("CRP_before", 9.0)
            .with("P_before", 8.0)
            .with("TB_before", 10.0)
            .with("ALT_before", 6.0)
            .with("HCT_before", 7.0)
            .with("CO2_before", 11.0)
            .with("K_before", 12.0)
            .with("Glu_before", 13.0)
            .with("ALP_before", 14.0)
            .with("initial_echo_RCA_Z", 2.0)
            .with("initial_echo_LMCA_Z", 1.0)
            .with("initial_echo_LAD_Z", 0.0)
            .with("initial_echo_LCx_Z", 3.0)
            .with("fever_duration", 4.0)
            .with("Sex", 5.0);

        let vector = assemble(&input, &CAA_V1).unwrap();
        let expected: Vec<f64> = (0..15).map(f64::from).collect();
        assert_eq!(vector.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_unknown_feature_rejected() {
        let input = CAA_V1
            .names()
            .fold(RawInput::new(), |i, n| i.with(n, 1.0))
            .with("MPV_before", 9.0);

        match assemble(&input, &CAA_V1) {
            Err(Error::UnknownFeature(name)) => assert_eq!(name, "MPV_before"),
            other => panic!("expected UnknownFeature, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_required_value_is_order_mismatch() {
        let mut input = IVIG_V1.names().fold(RawInput::new(), |i, n| i.with(n, 1.0));
        input.unset("MPV_before");

        match assemble(&input, &IVIG_V1) {
            Err(Error::OrderMismatch { expected, actual }) => {
                assert_eq!(expected, 14);
                assert_eq!(actual, 13);
            }
            other => panic!("expected OrderMismatch, got {:?}", other),
        }
    }
}
