// ─────────────────────────────────────────────────────────────────────
// SCPN Spectral Core — Host Reference Validation
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Validates the native transform arithmetic against a brute-force DFT.
//!
//! The host pipeline below performs exactly the dispatch sequence the GPU
//! engine records (same stage plans, same twiddle tables, same packing
//! arithmetic), so these tests pin down the mixed-radix and Hermitian
//! index math without requiring an adapter.

use num_complex::{Complex32, Complex64};
use proptest::prelude::*;
use spectral_fft::dimension::{find_legal_dimension, is_legal_dimension};
use spectral_fft::packing::{
    fold_half_spectra, half_depth, pack_real_rows, split_packed_spectra, unpack_real_rows,
};
use spectral_fft::radix::StagePlan;
use spectral_fft::transform_capacity;

fn apply_axis(
    grid: &mut [Complex32],
    plan: &StagePlan,
    lines: usize,
    base_of: impl Fn(usize) -> usize,
    stride: usize,
) {
    let mut line = vec![Complex32::new(0.0, 0.0); plan.len];
    for index in 0..lines {
        let base = base_of(index);
        for (slot, k) in line.iter_mut().zip(0..plan.len) {
            *slot = grid[base + k * stride];
        }
        plan.apply(&mut line);
        for (slot, k) in line.iter().zip(0..plan.len) {
            grid[base + k * stride] = *slot;
        }
    }
}

/// Complex 3D transform mirroring the engine's x, y, z pass order.
fn host_c2c(grid: &mut [Complex32], x: usize, y: usize, z: usize, forward: bool) {
    let plan_x = StagePlan::new(x, forward).expect("legal xsize");
    let plan_y = StagePlan::new(y, forward).expect("legal ysize");
    let plan_z = StagePlan::new(z, forward).expect("legal zsize");
    apply_axis(grid, &plan_x, y * z, |i| i, y * z);
    apply_axis(grid, &plan_y, x * z, |i| (i / z) * y * z + i % z, z);
    apply_axis(grid, &plan_z, x * y, |i| i * z, 1);
}

/// Real-to-complex forward, mirroring pack -> z -> split -> x -> y.
fn host_r2c_forward(reals: &[f32], x: usize, y: usize, z: usize) -> Vec<Complex32> {
    let pairs = x * y / 2;
    let zh = half_depth(z);
    let mut packed = pack_real_rows(reals, pairs, z);
    let plan_z = StagePlan::new(z, true).expect("legal zsize");
    apply_axis(&mut packed, &plan_z, pairs, |i| i * z, 1);
    let mut half = split_packed_spectra(&packed, pairs, z);
    let plan_x = StagePlan::new(x, true).expect("legal xsize");
    let plan_y = StagePlan::new(y, true).expect("legal ysize");
    apply_axis(&mut half, &plan_x, y * zh, |i| i, y * zh);
    apply_axis(&mut half, &plan_y, x * zh, |i| (i / zh) * y * zh + i % zh, zh);
    half
}

/// Real-to-complex inverse, mirroring y -> x -> fold -> z -> unpack.
fn host_r2c_inverse(half: &[Complex32], x: usize, y: usize, z: usize) -> Vec<f32> {
    let pairs = x * y / 2;
    let zh = half_depth(z);
    let mut half = half.to_vec();
    let plan_y = StagePlan::new(y, false).expect("legal ysize");
    let plan_x = StagePlan::new(x, false).expect("legal xsize");
    apply_axis(&mut half, &plan_y, x * zh, |i| (i / zh) * y * zh + i % zh, zh);
    apply_axis(&mut half, &plan_x, y * zh, |i| i, y * zh);
    let mut packed = fold_half_spectra(&half, pairs, z);
    let plan_z = StagePlan::new(z, false).expect("legal zsize");
    apply_axis(&mut packed, &plan_z, pairs, |i| i * z, 1);
    unpack_real_rows(&packed, pairs, z)
}

/// Brute-force 3D DFT in f64, one naive pass per axis.
fn brute_dft3(grid: &[Complex32], x: usize, y: usize, z: usize, forward: bool) -> Vec<Complex64> {
    fn axis_pass(
        data: &mut [Complex64],
        sign: f64,
        len: usize,
        lines: usize,
        base_of: &dyn Fn(usize) -> usize,
        stride: usize,
    ) {
        for index in 0..lines {
            let base = base_of(index);
            let line: Vec<Complex64> = (0..len).map(|k| data[base + k * stride]).collect();
            for k in 0..len {
                let mut acc = Complex64::new(0.0, 0.0);
                for (n, value) in line.iter().enumerate() {
                    let angle =
                        sign * 2.0 * std::f64::consts::PI * ((n * k) % len) as f64 / len as f64;
                    acc += value * Complex64::new(angle.cos(), angle.sin());
                }
                data[base + k * stride] = acc;
            }
        }
    }

    let sign = if forward { -1.0 } else { 1.0 };
    let mut data: Vec<Complex64> = grid
        .iter()
        .map(|c| Complex64::new(c.re as f64, c.im as f64))
        .collect();
    axis_pass(&mut data, sign, x, y * z, &|i| i, y * z);
    axis_pass(&mut data, sign, y, x * z, &|i| (i / z) * y * z + i % z, z);
    axis_pass(&mut data, sign, z, x * y, &|i| i * z, 1);
    data
}

fn complex_grid(x: usize, y: usize, z: usize) -> Vec<Complex32> {
    (0..x * y * z)
        .map(|i| {
            let t = i as f32;
            Complex32::new((0.37 * t).sin() + 0.2, (0.51 * t).cos() - 0.1)
        })
        .collect()
}

fn real_grid(x: usize, y: usize, z: usize) -> Vec<f32> {
    (0..x * y * z)
        .map(|i| ((0.43 * i as f32).sin() + 0.3) * (1.0 + (i % 7) as f32 * 0.25))
        .collect()
}

fn assert_close(got: &[Complex32], want: &[Complex64], tolerance: f64, what: &str) {
    assert_eq!(got.len(), want.len());
    for (index, (g, w)) in got.iter().zip(want.iter()).enumerate() {
        let err = ((g.re as f64 - w.re).powi(2) + (g.im as f64 - w.im).powi(2)).sqrt();
        assert!(err < tolerance, "{what} index {index}: {g} vs {w}");
    }
}

#[test]
fn test_complex_transform_matches_brute_dft() {
    for (x, y, z) in [(4, 6, 5), (8, 3, 7), (2, 2, 9)] {
        let grid = complex_grid(x, y, z);
        for forward in [true, false] {
            let mut got = grid.clone();
            host_c2c(&mut got, x, y, z, forward);
            let want = brute_dft3(&grid, x, y, z, forward);
            assert_close(&got, &want, 1e-2, "complex transform");
        }
    }
}

#[test]
fn test_complex_roundtrip_scales_by_volume() {
    let (x, y, z) = (6, 5, 4);
    let grid = complex_grid(x, y, z);
    let mut data = grid.clone();
    host_c2c(&mut data, x, y, z, true);
    host_c2c(&mut data, x, y, z, false);
    let volume = (x * y * z) as f32;
    for (got, want) in data.iter().zip(grid.iter()) {
        assert!((got - want * volume).norm() < 1e-2 * volume);
    }
}

#[test]
fn test_real_forward_matches_zero_padded_complex_transform() {
    // The stored half must agree element-for-element with the matching
    // half of a complex transform of the same data, both even and odd z.
    for (x, y, z) in [(4, 6, 8), (4, 4, 7), (2, 6, 5)] {
        let reals = real_grid(x, y, z);
        let half = host_r2c_forward(&reals, x, y, z);
        let zh = half_depth(z);

        let padded: Vec<Complex32> = reals.iter().map(|&r| Complex32::new(r, 0.0)).collect();
        let full = brute_dft3(&padded, x, y, z, true);
        let want: Vec<Complex64> = (0..x * y)
            .flat_map(|row| (0..zh).map(move |k| (row, k)))
            .map(|(row, k)| full[row * z + k])
            .collect();
        assert_close(&half, &want, 2e-2, "real-to-complex half");
    }
}

#[test]
fn test_real_roundtrip_scales_by_volume() {
    for (x, y, z) in [(4, 6, 8), (4, 4, 7)] {
        let reals = real_grid(x, y, z);
        let half = host_r2c_forward(&reals, x, y, z);
        let back = host_r2c_inverse(&half, x, y, z);
        let volume = (x * y * z) as f32;
        for (index, (got, want)) in back.iter().zip(reals.iter()).enumerate() {
            assert!(
                (got - want * volume).abs() < 1e-2 * volume,
                "shape ({x}, {y}, {z}) index {index}: {got} vs {}",
                want * volume
            );
        }
    }
}

#[test]
fn test_real_transform_of_zero_grid_is_zero() {
    let (x, y, z) = (4, 4, 6);
    let half = host_r2c_forward(&vec![0.0; x * y * z], x, y, z);
    for value in &half {
        assert_eq!(*value, Complex32::new(0.0, 0.0));
    }
}

#[test]
fn test_real_transform_of_constant_grid_is_pure_dc() {
    let (x, y, z) = (4, 6, 8);
    let half = host_r2c_forward(&vec![1.0; x * y * z], x, y, z);
    let volume = (x * y * z) as f32;
    for (index, value) in half.iter().enumerate() {
        let expected = if index == 0 { volume } else { 0.0 };
        assert!(
            (value - Complex32::new(expected, 0.0)).norm() < 1e-2,
            "bin {index}: {value}"
        );
    }
}

#[test]
fn test_capacity_covers_every_real_mode_intermediate() {
    // Packed rows, half grid, and tightly packed reals must all fit the
    // advertised capacity, for even and odd z.
    for (x, y, z) in [(4, 6, 8), (4, 6, 7), (2, 2, 1)] {
        let capacity = transform_capacity(x, y, z, true);
        assert!(x * y / 2 * z <= capacity);
        assert!(x * y * half_depth(z) <= capacity);
        assert!(x * y * z <= 2 * capacity, "reals are two per complex slot");
    }
}

proptest! {
    /// The scan returns the smallest legal size at or above the minimum.
    #[test]
    fn prop_find_legal_dimension_is_minimal(minimum in 0usize..2000) {
        let found = find_legal_dimension(minimum);
        prop_assert!(is_legal_dimension(found));
        prop_assert!(found >= minimum.max(1));
        for candidate in minimum.max(1)..found {
            prop_assert!(!is_legal_dimension(candidate));
        }
    }

    /// Split followed by fold restores any transformed pair of real rows.
    #[test]
    fn prop_split_fold_roundtrip(zsize in 2usize..40, seed in 0u32..50) {
        prop_assume!(is_legal_dimension(zsize));
        let reals: Vec<f32> = (0..2 * zsize)
            .map(|i| ((seed + i as u32) as f32 * 0.713).sin())
            .collect();
        let mut packed = pack_real_rows(&reals, 1, zsize);
        StagePlan::new(zsize, true).expect("legal zsize").apply(&mut packed);
        let half = split_packed_spectra(&packed, 1, zsize);
        let folded = fold_half_spectra(&half, 1, zsize);
        for (got, want) in folded.iter().zip(packed.iter()) {
            prop_assert!((got - want).norm() < 1e-3);
        }
    }
}
