//! Property-based tests for tracejit using proptest.
//!
//! These tests generate random inputs and check that compiled functions
//! agree with eager evaluation and that the cache keys on exactly what the
//! abstraction level exposes.

use proptest::prelude::*;
use tracejit::{
    jit, with_jit_disabled, AbstractionLevel, Array, JitBuilder, Result, Shape, Value,
};

// =============================================================================
// GENERATORS
// =============================================================================

/// Generate a small shape (1-3 dimensions, each dimension 1-5 elements).
fn arb_small_shape() -> impl Strategy<Value = Shape> {
    prop::collection::vec(1usize..=5, 1..=3).prop_map(Shape::new)
}

/// Generate an array with given shape and random values.
fn arb_array_with_shape(shape: Shape) -> impl Strategy<Value = Array> {
    let size = shape.size();
    prop::collection::vec(-10.0f32..10.0, size)
        .prop_map(move |data| Array::from_vec(data, shape.clone()))
}

/// Generate a random array.
fn arb_array() -> impl Strategy<Value = Array> {
    arb_small_shape().prop_flat_map(arb_array_with_shape)
}

/// Generate two arrays of the same shape.
fn arb_array_pair() -> impl Strategy<Value = (Array, Array)> {
    arb_small_shape().prop_flat_map(|shape| {
        (arb_array_with_shape(shape.clone()), arb_array_with_shape(shape))
    })
}

fn mixed(args: &[Value]) -> Result<Vec<Value>> {
    let (x, y) = (&args[0], &args[1]);
    let z = x.mul(y)?.add(x)?.tanh()?;
    let clipped = Value::select(&z.gt(&Value::scalar(0.5))?, &Value::scalar(0.5), &z)?;
    Ok(vec![clipped.clone(), clipped.abs()?.sum_all()?])
}

fn relu_or_double(args: &[Value]) -> Result<Vec<Value>> {
    let x = &args[0];
    if x.gt(&Value::scalar(0.0))?.to_bool()? {
        Ok(vec![x.clone()])
    } else {
        Ok(vec![x.mul(&Value::scalar(2.0))?])
    }
}

// =============================================================================
// COMPILED VS EAGER
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_compiled_matches_eager((x, y) in arb_array_pair()) {
        let f = jit("mixed", 2, mixed);
        let compiled = f.call(&[x.clone(), y.clone()]).unwrap();
        let eager = with_jit_disabled(|| f.call(&[x, y])).unwrap();

        prop_assert_eq!(compiled.len(), eager.len());
        for (c, e) in compiled.iter().zip(&eager) {
            prop_assert_eq!(c.shape(), e.shape());
            prop_assert_eq!(c.dtype(), e.dtype());
            prop_assert_eq!(c.to_vec(), e.to_vec());
        }
    }

    #[test]
    fn prop_cache_hit_matches_fresh_trace((x, y) in arb_array_pair()) {
        let warm = jit("mixed", 2, mixed);
        // Trace with zeros, then run the cached artifact on the real inputs
        let zeros = Array::zeros(x.shape().clone(), x.dtype());
        warm.call(&[zeros.clone(), zeros]).unwrap();
        let cached = warm.call(&[x.clone(), y.clone()]).unwrap();
        prop_assert_eq!(warm.stats().traces, 1);

        let fresh = jit("mixed", 2, mixed).call(&[x, y]).unwrap();
        prop_assert_eq!(cached[0].to_vec(), fresh[0].to_vec());
        prop_assert_eq!(cached[1].to_vec(), fresh[1].to_vec());
    }
}

// =============================================================================
// CACHE KEYS
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_value_changes_never_retrace(
        shape in arb_small_shape(),
        seeds in prop::collection::vec(-10.0f32..10.0, 1..8),
    ) {
        let f = jit("scale", 1, |args: &[Value]| Ok(vec![args[0].mul(&Value::scalar(3.0))?]));
        for seed in &seeds {
            let x = Array::full(*seed, shape.clone(), tracejit::DType::Float32);
            let out = f.call(&[x]).unwrap();
            prop_assert!(out[0].to_vec().iter().all(|&v| v == seed * 3.0));
        }
        prop_assert_eq!(f.stats().traces, 1);
        prop_assert_eq!(f.stats().hits, seeds.len() - 1);
    }

    #[test]
    fn prop_unshaped_traces_once_for_any_shapes(xs in prop::collection::vec(arb_array(), 1..6)) {
        let f = JitBuilder::new("neg", 1)
            .abstraction(AbstractionLevel::Unshaped)
            .build(|args: &[Value]| Ok(vec![args[0].neg()?]))
            .unwrap();
        for x in &xs {
            let out = f.call(&[x.clone()]).unwrap();
            let expected: Vec<f32> = x.to_vec().iter().map(|v| -v).collect();
            prop_assert_eq!(out[0].to_vec(), expected);
        }
        prop_assert_eq!(f.stats().traces, 1);
    }

    #[test]
    fn prop_static_and_concrete_agree_with_branch(x in -10.0f32..10.0) {
        let expected = if x > 0.0 { x } else { 2.0 * x };

        let by_static = JitBuilder::new("f", 1).static_argnums([0]).build(relu_or_double).unwrap();
        prop_assert_eq!(by_static.call(&[Array::scalar(x)]).unwrap()[0].item(), Some(expected));

        let by_value = JitBuilder::new("f", 1)
            .abstraction(AbstractionLevel::Concrete)
            .build(relu_or_double)
            .unwrap();
        prop_assert_eq!(by_value.call(&[Array::scalar(x)]).unwrap()[0].item(), Some(expected));

        let shaped = jit("f", 1, relu_or_double);
        let err = shaped.call(&[Array::scalar(x)]).unwrap_err();
        prop_assert!(err.is_abstract_value());
    }
}
