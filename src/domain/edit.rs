use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::droop::{DroopField, DroopParameters};

/// The rule a submitted value broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    NotANumber,
    NotFinite,
    Negative,
    NotPositive,
    ReadOnly,
    UnknownField,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Constraint::NotANumber => "must be a number",
            Constraint::NotFinite => "must be a finite number",
            Constraint::Negative => "must be ≥ 0",
            Constraint::NotPositive => "must be > 0",
            Constraint::ReadOnly => "is read-only",
            Constraint::UnknownField => "is not a droop parameter",
        };
        f.write_str(text)
    }
}

/// One rejected field of an operator edit.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("{field} {constraint}")]
pub struct FieldError {
    /// Key as submitted by the operator
    pub field: String,
    pub constraint: Constraint,
}

impl FieldError {
    fn new(field: impl Into<String>, constraint: Constraint) -> Self {
        Self {
            field: field.into(),
            constraint,
        }
    }
}

/// An operator edit that was rejected as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error(
    "invalid droop parameters: {}",
    .errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
)]
pub struct EditError {
    pub errors: Vec<FieldError>,
}

impl EditError {
    /// The error reported for `field`, if any.
    pub fn field(&self, field: &str) -> Option<&FieldError> {
        self.errors.iter().find(|e| e.field == field)
    }
}

/// Operator-supplied changes to a droop record.
///
/// `p_opt` is deliberately absent: it is owned by the optimizer, and a JSON
/// body that carries it is refused by `deny_unknown_fields`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DroopEdit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v_nom: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_supply: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v_supply: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_consume: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v_consume: Option<f64>,
}

impl DroopEdit {
    pub fn is_empty(&self) -> bool {
        self.entries().all(|(_, value)| value.is_none())
    }

    /// Build an edit from raw form text.
    ///
    /// Blank values leave the field untouched. Text that does not parse as a
    /// number is an error, never a zero.
    pub fn from_form<I, K, V>(pairs: I) -> Result<Self, EditError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut edit = DroopEdit::default();
        let mut errors = Vec::new();

        for (key, raw) in pairs {
            let key = key.as_ref();
            let field = match key.parse::<DroopField>() {
                Ok(field) if field.is_editable() => field,
                Ok(_) => {
                    errors.push(FieldError::new(key, Constraint::ReadOnly));
                    continue;
                }
                Err(_) => {
                    errors.push(FieldError::new(key, Constraint::UnknownField));
                    continue;
                }
            };

            let raw = raw.as_ref().trim();
            if raw.is_empty() {
                continue;
            }
            match raw.parse::<f64>() {
                Ok(value) => edit.set(field, value),
                Err(_) => errors.push(FieldError::new(key, Constraint::NotANumber)),
            }
        }

        if errors.is_empty() {
            Ok(edit)
        } else {
            Err(EditError { errors })
        }
    }

    /// Check every supplied value against its field's constraint.
    pub fn validate(&self) -> Result<(), EditError> {
        let errors: Vec<FieldError> = self
            .entries()
            .filter_map(|(field, value)| {
                let value = value?;
                check(field, value).map(|constraint| FieldError::new(field.as_ref(), constraint))
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(EditError { errors })
        }
    }

    fn entries(&self) -> impl Iterator<Item = (DroopField, Option<f64>)> {
        [
            (DroopField::VNom, self.v_nom),
            (DroopField::PSupply, self.p_supply),
            (DroopField::VSupply, self.v_supply),
            (DroopField::PConsume, self.p_consume),
            (DroopField::VConsume, self.v_consume),
        ]
        .into_iter()
    }

    fn set(&mut self, field: DroopField, value: f64) {
        match field {
            DroopField::VNom => self.v_nom = Some(value),
            DroopField::PSupply => self.p_supply = Some(value),
            DroopField::VSupply => self.v_supply = Some(value),
            DroopField::PConsume => self.p_consume = Some(value),
            DroopField::VConsume => self.v_consume = Some(value),
            DroopField::POpt => {}
        }
    }
}

fn check(field: DroopField, value: f64) -> Option<Constraint> {
    if !value.is_finite() {
        return Some(Constraint::NotFinite);
    }
    match field {
        DroopField::VNom if value <= 0.0 => Some(Constraint::NotPositive),
        DroopField::VNom | DroopField::POpt => None,
        _ if value < 0.0 => Some(Constraint::Negative),
        _ => None,
    }
}

/// Check a complete droop record: `v_nom > 0`, the other extremes `>= 0`,
/// every value finite.
pub fn validate_parameters(params: &DroopParameters) -> Result<(), EditError> {
    let values = [
        (DroopField::VNom, params.v_nom),
        (DroopField::PSupply, params.p_supply),
        (DroopField::VSupply, params.v_supply),
        (DroopField::PConsume, params.p_consume),
        (DroopField::VConsume, params.v_consume),
        (DroopField::POpt, params.p_opt),
    ];
    let errors: Vec<FieldError> = values
        .into_iter()
        .filter_map(|(field, value)| {
            check(field, value).map(|constraint| FieldError::new(field.as_ref(), constraint))
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(EditError { errors })
    }
}

/// Merge an operator edit into `current`.
///
/// The edit is checked first, then the merged record, so a rejected edit
/// leaves no trace and an invalid stored value cannot survive an edit.
/// `p_opt` always comes from `current`.
pub fn apply_edit(current: &DroopParameters, edit: &DroopEdit) -> Result<DroopParameters, EditError> {
    edit.validate()?;

    let merged = DroopParameters {
        v_nom: edit.v_nom.unwrap_or(current.v_nom),
        p_supply: edit.p_supply.unwrap_or(current.p_supply),
        v_supply: edit.v_supply.unwrap_or(current.v_supply),
        p_consume: edit.p_consume.unwrap_or(current.p_consume),
        v_consume: edit.v_consume.unwrap_or(current.v_consume),
        p_opt: current.p_opt,
    };
    validate_parameters(&merged)?;
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn current() -> DroopParameters {
        DroopParameters {
            v_nom: 700.0,
            p_supply: 10000.0,
            v_supply: 600.0,
            p_consume: 5000.0,
            v_consume: 300.0,
            p_opt: 1234.0,
        }
    }

    #[test]
    fn test_edit_replaces_only_supplied_fields() {
        let edit = DroopEdit {
            v_nom: Some(650.0),
            p_consume: Some(0.0),
            ..Default::default()
        };
        let updated = apply_edit(&current(), &edit).unwrap();
        assert_eq!(updated.v_nom, 650.0);
        assert_eq!(updated.p_consume, 0.0);
        assert_eq!(updated.p_supply, 10000.0);
        assert_eq!(updated.p_opt, 1234.0);
    }

    #[test]
    fn test_empty_edit_is_identity() {
        let edit = DroopEdit::default();
        assert!(edit.is_empty());
        assert_eq!(apply_edit(&current(), &edit).unwrap(), current());
    }

    #[rstest]
    #[case(DroopEdit { p_supply: Some(-5.0), ..Default::default() }, "p_supply", Constraint::Negative)]
    #[case(DroopEdit { v_supply: Some(-0.1), ..Default::default() }, "v_supply", Constraint::Negative)]
    #[case(DroopEdit { p_consume: Some(f64::INFINITY), ..Default::default() }, "p_consume", Constraint::NotFinite)]
    #[case(DroopEdit { v_consume: Some(f64::NAN), ..Default::default() }, "v_consume", Constraint::NotFinite)]
    #[case(DroopEdit { v_nom: Some(0.0), ..Default::default() }, "v_nom", Constraint::NotPositive)]
    #[case(DroopEdit { v_nom: Some(-700.0), ..Default::default() }, "v_nom", Constraint::NotPositive)]
    fn test_invalid_values_are_rejected(
        #[case] edit: DroopEdit,
        #[case] field: &str,
        #[case] constraint: Constraint,
    ) {
        let err = apply_edit(&current(), &edit).unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].field, field);
        assert_eq!(err.errors[0].constraint, constraint);
    }

    #[test]
    fn test_every_offending_field_is_reported() {
        let edit = DroopEdit {
            v_nom: Some(0.0),
            p_supply: Some(-1.0),
            v_supply: Some(50.0),
            ..Default::default()
        };
        let err = edit.validate().unwrap_err();
        assert_eq!(err.errors.len(), 2);
        assert!(err.field("v_nom").is_some());
        assert!(err.field("p_supply").is_some());
        assert!(err.field("v_supply").is_none());
        assert_eq!(
            err.to_string(),
            "invalid droop parameters: v_nom must be > 0; p_supply must be ≥ 0"
        );
    }

    #[test]
    fn test_json_body_with_p_opt_is_refused() {
        let body = r#"{"v_nom": 650, "p_opt": 99}"#;
        assert!(serde_json::from_str::<DroopEdit>(body).is_err());

        let body = r#"{"v_nom": 650}"#;
        let edit: DroopEdit = serde_json::from_str(body).unwrap();
        assert_eq!(edit.v_nom, Some(650.0));
        assert_eq!(edit.p_supply, None);
    }

    #[test]
    fn test_form_parses_numbers_and_skips_blanks() {
        let edit = DroopEdit::from_form([("v_nom", " 650 "), ("p_supply", ""), ("v_consume", "0")]).unwrap();
        assert_eq!(edit.v_nom, Some(650.0));
        assert_eq!(edit.p_supply, None);
        assert_eq!(edit.v_consume, Some(0.0));
    }

    #[test]
    fn test_form_rejects_text_instead_of_coercing() {
        let err = DroopEdit::from_form([("v_nom", "abc"), ("p_opt", "5"), ("maxVoltage", "400")]).unwrap_err();
        assert_eq!(err.field("v_nom").unwrap().constraint, Constraint::NotANumber);
        assert_eq!(err.field("p_opt").unwrap().constraint, Constraint::ReadOnly);
        assert_eq!(
            err.field("maxVoltage").unwrap().constraint,
            Constraint::UnknownField
        );
    }

    #[test]
    fn test_form_values_still_need_validation() {
        let edit = DroopEdit::from_form([("p_supply", "-5")]).unwrap();
        let err = apply_edit(&current(), &edit).unwrap_err();
        assert_eq!(err.errors[0].to_string(), "p_supply must be ≥ 0");
    }

    #[test]
    fn test_invalid_current_record_fails_even_an_empty_edit() {
        let stored = DroopParameters {
            v_nom: 0.0,
            p_supply: -5.0,
            ..current()
        };
        let err = apply_edit(&stored, &DroopEdit::default()).unwrap_err();
        assert_eq!(err.field("v_nom").unwrap().constraint, Constraint::NotPositive);
        assert_eq!(err.field("p_supply").unwrap().constraint, Constraint::Negative);
    }

    #[test]
    fn test_edit_can_repair_invalid_current_record() {
        let stored = DroopParameters {
            p_supply: -5.0,
            ..current()
        };
        let edit = DroopEdit {
            p_supply: Some(8000.0),
            ..Default::default()
        };
        let repaired = apply_edit(&stored, &edit).unwrap();
        assert_eq!(repaired.p_supply, 8000.0);
        assert!(validate_parameters(&repaired).is_ok());
    }

    #[test]
    fn test_validate_parameters_accepts_negative_p_opt_but_not_nan() {
        let params = DroopParameters {
            p_opt: -20000.0,
            ..current()
        };
        assert!(validate_parameters(&params).is_ok());

        let params = DroopParameters {
            p_opt: f64::NAN,
            ..current()
        };
        let err = validate_parameters(&params).unwrap_err();
        assert_eq!(err.field("p_opt").unwrap().constraint, Constraint::NotFinite);
    }
}
