//! Float semantics properties.
//!
//! NaN results are checked against the payload rules directly, using random
//! payloads. Non-NaN results are cross-checked against wasmtime executing the
//! same instructions, since those are fully determined by the instruction set.

use keystone_primitives::floats::{
    float_ceil, float_floor, float_max, float_min, float_nearest, float_trunc,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use wasmtime::{Engine, Instance, Module, Store, TypedFunc};

const F32_QUIET: u32 = 1 << 22;
const F64_QUIET: u64 = 1 << 51;

fn random_nan32(rng: &mut StdRng) -> u32 {
    let sign_and_payload = rng.gen::<u32>() & 0x807f_ffff;
    let bits = 0x7f80_0000 | sign_and_payload;
    if bits & 0x007f_ffff == 0 {
        bits | 1
    } else {
        bits
    }
}

fn random_nan64(rng: &mut StdRng) -> u64 {
    let sign_and_payload = rng.gen::<u64>() & 0x800f_ffff_ffff_ffff;
    let bits = 0x7ff0_0000_0000_0000 | sign_and_payload;
    if bits & 0x000f_ffff_ffff_ffff == 0 {
        bits | 1
    } else {
        bits
    }
}

fn random_finite32(rng: &mut StdRng) -> f32 {
    rng.gen_range(-1.0e6f32..1.0e6f32)
}

// ── NaN propagation ──

#[test]
fn test_min_max_quiet_the_nan_operand() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..1_000 {
        let nan_bits = random_nan32(&mut rng);
        let nan = f32::from_bits(nan_bits);
        let x = random_finite32(&mut rng);
        let expected = nan_bits | F32_QUIET;

        assert_eq!(float_min(nan, x).to_bits(), expected);
        assert_eq!(float_min(x, nan).to_bits(), expected);
        assert_eq!(float_max(nan, x).to_bits(), expected);
        assert_eq!(float_max(x, nan).to_bits(), expected);
    }
}

#[test]
fn test_min_with_nan_payload_operand() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..1_000 {
        let left = random_nan64(&mut rng);
        let right = random_nan64(&mut rng);
        let result = float_min(f64::from_bits(left), f64::from_bits(right));
        assert_eq!(result.to_bits(), left | F64_QUIET);
        let result = float_min(2.0f64, f64::from_bits(right));
        assert_eq!(result.to_bits(), right | F64_QUIET);
    }
}

#[test]
fn test_rounding_nan_keeps_sign_bit() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..1_000 {
        let bits = random_nan64(&mut rng);
        let nan = f64::from_bits(bits);
        for rounded in [
            float_ceil(nan),
            float_floor(nan),
            float_trunc(nan),
            float_nearest(nan),
        ] {
            assert!(rounded.is_nan());
            assert_eq!(rounded.is_sign_negative(), nan.is_sign_negative());
            assert_eq!(rounded.to_bits(), bits | F64_QUIET);
        }
    }
}

// ── Cross-check against wasmtime ──

const WAT: &str = r#"
    (module
        (func (export "f32.min") (param f32 f32) (result f32)
            local.get 0 local.get 1 f32.min)
        (func (export "f32.max") (param f32 f32) (result f32)
            local.get 0 local.get 1 f32.max)
        (func (export "f64.min") (param f64 f64) (result f64)
            local.get 0 local.get 1 f64.min)
        (func (export "f64.max") (param f64 f64) (result f64)
            local.get 0 local.get 1 f64.max)
        (func (export "f32.nearest") (param f32) (result f32)
            local.get 0 f32.nearest)
        (func (export "f64.nearest") (param f64) (result f64)
            local.get 0 f64.nearest)
        (func (export "f64.ceil") (param f64) (result f64)
            local.get 0 f64.ceil)
        (func (export "f64.floor") (param f64) (result f64)
            local.get 0 f64.floor)
        (func (export "f64.trunc") (param f64) (result f64)
            local.get 0 f64.trunc)
    )
"#;

struct Reference {
    store: Store<()>,
    f32_min: TypedFunc<(f32, f32), f32>,
    f32_max: TypedFunc<(f32, f32), f32>,
    f64_min: TypedFunc<(f64, f64), f64>,
    f64_max: TypedFunc<(f64, f64), f64>,
    f32_nearest: TypedFunc<f32, f32>,
    f64_nearest: TypedFunc<f64, f64>,
    f64_ceil: TypedFunc<f64, f64>,
    f64_floor: TypedFunc<f64, f64>,
    f64_trunc: TypedFunc<f64, f64>,
}

fn reference() -> anyhow::Result<Reference> {
    let engine = Engine::default();
    let module = Module::new(&engine, WAT)?;
    let mut store = Store::new(&engine, ());
    let instance = Instance::new(&mut store, &module, &[])?;
    Ok(Reference {
        f32_min: instance.get_typed_func(&mut store, "f32.min")?,
        f32_max: instance.get_typed_func(&mut store, "f32.max")?,
        f64_min: instance.get_typed_func(&mut store, "f64.min")?,
        f64_max: instance.get_typed_func(&mut store, "f64.max")?,
        f32_nearest: instance.get_typed_func(&mut store, "f32.nearest")?,
        f64_nearest: instance.get_typed_func(&mut store, "f64.nearest")?,
        f64_ceil: instance.get_typed_func(&mut store, "f64.ceil")?,
        f64_floor: instance.get_typed_func(&mut store, "f64.floor")?,
        f64_trunc: instance.get_typed_func(&mut store, "f64.trunc")?,
        store,
    })
}

#[test]
fn test_signed_zeros_match_wasmtime() -> anyhow::Result<()> {
    let mut r = reference()?;
    for (a, b) in [(0.0f32, -0.0f32), (-0.0, 0.0), (0.0, 0.0), (-0.0, -0.0)] {
        let expected = r.f32_min.call(&mut r.store, (a, b))?;
        assert_eq!(float_min(a, b).to_bits(), expected.to_bits());
        let expected = r.f32_max.call(&mut r.store, (a, b))?;
        assert_eq!(float_max(a, b).to_bits(), expected.to_bits());
    }
    for (a, b) in [(0.0f64, -0.0f64), (-0.0, 0.0)] {
        let expected = r.f64_min.call(&mut r.store, (a, b))?;
        assert_eq!(float_min(a, b).to_bits(), expected.to_bits());
        let expected = r.f64_max.call(&mut r.store, (a, b))?;
        assert_eq!(float_max(a, b).to_bits(), expected.to_bits());
    }
    Ok(())
}

#[test]
fn test_finite_min_max_match_wasmtime() -> anyhow::Result<()> {
    let mut r = reference()?;
    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..500 {
        let a = random_finite32(&mut rng);
        let b = random_finite32(&mut rng);
        assert_eq!(
            float_min(a, b).to_bits(),
            r.f32_min.call(&mut r.store, (a, b))?.to_bits()
        );
        assert_eq!(
            float_max(a, b).to_bits(),
            r.f32_max.call(&mut r.store, (a, b))?.to_bits()
        );
    }
    Ok(())
}

#[test]
fn test_rounding_matches_wasmtime() -> anyhow::Result<()> {
    let mut r = reference()?;
    let samples = [
        -2.5f64, -1.5, -0.5, -0.0, 0.0, 0.5, 1.5, 2.5, 3.5, 1.0e15 + 0.5, -7.75, 123.456,
        f64::INFINITY, f64::NEG_INFINITY,
    ];
    for x in samples {
        assert_eq!(
            float_nearest(x).to_bits(),
            r.f64_nearest.call(&mut r.store, x)?.to_bits(),
            "nearest({})",
            x
        );
        assert_eq!(float_ceil(x).to_bits(), r.f64_ceil.call(&mut r.store, x)?.to_bits());
        assert_eq!(float_floor(x).to_bits(), r.f64_floor.call(&mut r.store, x)?.to_bits());
        assert_eq!(float_trunc(x).to_bits(), r.f64_trunc.call(&mut r.store, x)?.to_bits());
    }
    for x in [0.5f32, 1.5, 2.5, -3.5, 8_388_607.5] {
        assert_eq!(
            float_nearest(x).to_bits(),
            r.f32_nearest.call(&mut r.store, x)?.to_bits()
        );
    }
    Ok(())
}
