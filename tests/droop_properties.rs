//! Properties of the droop model that callers rely on.

use microgrid_droop::domain::{
    apply_edit, axis_bounds, derive_points, is_power_in_range, merge_device_defaults,
    power_at_voltage, DroopEdit, DroopParameters, Point, StoredDroopParameters,
};
use proptest::prelude::*;
use rstest::rstest;

fn valid_parameters() -> impl Strategy<Value = DroopParameters> {
    (
        1.0f64..2000.0,
        0.0f64..200_000.0,
        0.0f64..1000.0,
        0.0f64..200_000.0,
        0.0f64..1000.0,
        -200_000.0f64..200_000.0,
    )
        .prop_map(|(v_nom, p_supply, v_supply, p_consume, v_consume, p_opt)| DroopParameters {
            v_nom,
            p_supply,
            v_supply,
            p_consume,
            v_consume,
            p_opt,
        })
}

fn valid_edit() -> impl Strategy<Value = DroopEdit> {
    (
        proptest::option::of(1.0f64..2000.0),
        proptest::option::of(0.0f64..200_000.0),
        proptest::option::of(0.0f64..1000.0),
        proptest::option::of(0.0f64..200_000.0),
        proptest::option::of(0.0f64..1000.0),
    )
        .prop_map(|(v_nom, p_supply, v_supply, p_consume, v_consume)| DroopEdit {
            v_nom,
            p_supply,
            v_supply,
            p_consume,
            v_consume,
        })
}

#[test]
fn symmetric_curve_points() {
    let params = DroopParameters {
        v_nom: 700.0,
        p_supply: 40000.0,
        v_supply: 35.0,
        p_consume: 40000.0,
        v_consume: 35.0,
        p_opt: 0.0,
    };
    assert_eq!(
        derive_points(&params),
        [
            Point::new(-40000.0, 735.0),
            Point::new(0.0, 700.0),
            Point::new(40000.0, 665.0),
        ]
    );
}

#[test]
fn negative_supply_is_rejected_and_current_untouched() {
    let current = DroopParameters {
        v_nom: 700.0,
        p_supply: 40000.0,
        v_supply: 35.0,
        p_consume: 40000.0,
        v_consume: 35.0,
        p_opt: 0.0,
    };
    let snapshot = current;
    let edit = DroopEdit {
        p_supply: Some(-5.0),
        ..Default::default()
    };

    let err = apply_edit(&current, &edit).unwrap_err();
    let field = err.field("p_supply").expect("p_supply reported");
    assert_eq!(field.constraint.to_string(), "must be ≥ 0");
    assert!(err.to_string().contains("p_supply must be ≥ 0"));
    assert_eq!(current, snapshot);
}

#[test]
fn p_opt_survives_operator_edit() {
    let current = DroopParameters {
        v_nom: 700.0,
        p_supply: 40000.0,
        v_supply: 35.0,
        p_consume: 40000.0,
        v_consume: 35.0,
        p_opt: 1234.0,
    };
    let edit = DroopEdit {
        v_nom: Some(650.0),
        ..Default::default()
    };
    let updated = apply_edit(&current, &edit).unwrap();
    assert_eq!(updated.v_nom, 650.0);
    assert_eq!(updated.p_opt, 1234.0);
}

#[test]
fn explicit_zero_is_not_defaulted() {
    let stored = StoredDroopParameters {
        p_supply: Some(0.0),
        v_nom: Some(700.0),
        ..Default::default()
    };
    let defaults = DroopParameters {
        v_nom: 700.0,
        p_supply: 40000.0,
        v_supply: 35.0,
        p_consume: 40000.0,
        v_consume: 35.0,
        p_opt: 0.0,
    };
    let merged = merge_device_defaults(&stored, &defaults);
    assert_eq!(merged.p_supply, 0.0);
    assert_eq!(merged.v_supply, 35.0);
}

#[rstest]
#[case("v_nom", "abc")]
#[case("p_supply", "12kW")]
#[case("v_consume", "--")]
fn form_text_is_never_coerced(#[case] field: &str, #[case] raw: &str) {
    let err = DroopEdit::from_form([(field, raw)]).unwrap_err();
    assert_eq!(err.field(field).unwrap().constraint.to_string(), "must be a number");
}

proptest! {
    #[test]
    fn middle_point_sits_at_nominal_voltage(params in valid_parameters()) {
        let points = derive_points(&params);
        prop_assert_eq!(points.len(), 3);
        prop_assert_eq!(points[1].y, params.v_nom);
        prop_assert_eq!(points[1].x, params.p_opt);
        prop_assert!(points[0].x <= 0.0);
        prop_assert!(points[2].x >= 0.0);
    }

    #[test]
    fn empty_edit_keeps_curve(params in valid_parameters()) {
        let edited = apply_edit(&params, &DroopEdit::default()).unwrap();
        prop_assert_eq!(derive_points(&edited), derive_points(&params));
    }

    #[test]
    fn valid_edits_never_touch_p_opt(params in valid_parameters(), edit in valid_edit()) {
        let edited = apply_edit(&params, &edit).unwrap();
        prop_assert_eq!(edited.p_opt, params.p_opt);
    }

    #[test]
    fn bounds_contain_curve_extremes(params in valid_parameters()) {
        let bounds = axis_bounds(&params);
        let [upper, _, lower] = derive_points(&params);
        prop_assert!(bounds.x_min <= upper.x && lower.x <= bounds.x_max);
        prop_assert!(bounds.y_min <= lower.y && upper.y <= bounds.y_max);
    }

    #[test]
    fn curve_voltages_map_back_to_curve_powers(params in valid_parameters()) {
        let [upper, middle, lower] = derive_points(&params);
        prop_assert_eq!(power_at_voltage(&params, middle.y).unwrap(), params.p_opt);
        if params.v_consume > 0.0 {
            let p = power_at_voltage(&params, upper.y).unwrap();
            prop_assert!((p - upper.x).abs() <= 1e-6 * upper.x.abs().max(params.p_opt.abs()).max(1.0));
        }
        if params.v_supply > 0.0 {
            let p = power_at_voltage(&params, lower.y).unwrap();
            prop_assert!((p - lower.x).abs() <= 1e-6 * lower.x.abs().max(params.p_opt.abs()).max(1.0));
        }
        prop_assert!(is_power_in_range(&params, upper.x));
        prop_assert!(is_power_in_range(&params, lower.x));
    }
}
