// ─────────────────────────────────────────────────────────────────────
// SCPN Spectral Core — Real/Complex Packing
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Hermitian packing for real-to-complex transforms.
//!
//! Two adjacent real z-rows a, b are packed into one complex row
//! p = a + i·b, transformed once, and separated again using the
//! conjugate symmetry of real-input spectra:
//!
//!   A(k) = (P(k) + conj(P(N-k))) / 2
//!   B(k) = -i/2 * (P(k) - conj(P(N-k)))            (indices mod N)
//!
//! which halves the number of z transforms. Only the non-redundant half
//! k = 0..⌊N/2⌋ is kept per row; the inverse direction folds the halves
//! back into full rows via A(N-k) = conj(A(k)) before the inverse
//! transform and de-interleaves the result into two real rows.
//!
//! The DC bin and, for even N, the Nyquist bin satisfy k = N-k (mod N),
//! so both formulas above collapse to the purely real values Re P and
//! Im P with no special casing and no double-counting.
//!
//! The functions here are the host-side mirrors of the generated packing
//! kernels; `codegen` emits WGSL with the same arithmetic, and the
//! reference tests hold this module against a brute-force DFT.

use num_complex::Complex32;

/// Length of the stored non-redundant half of a real-input spectrum.
pub fn half_depth(zsize: usize) -> usize {
    zsize / 2 + 1
}

/// Pack `2*row_pairs` real z-rows into `row_pairs` complex rows.
pub fn pack_real_rows(real: &[f32], row_pairs: usize, zsize: usize) -> Vec<Complex32> {
    assert!(real.len() >= 2 * row_pairs * zsize);
    let mut packed = Vec::with_capacity(row_pairs * zsize);
    for m in 0..row_pairs {
        let row_a = 2 * m * zsize;
        let row_b = row_a + zsize;
        for k in 0..zsize {
            packed.push(Complex32::new(real[row_a + k], real[row_b + k]));
        }
    }
    packed
}

/// Separate `row_pairs` transformed packed rows into `2*row_pairs` rows of
/// `half_depth(zsize)` spectrum bins each.
pub fn split_packed_spectra(packed: &[Complex32], row_pairs: usize, zsize: usize) -> Vec<Complex32> {
    assert_eq!(packed.len(), row_pairs * zsize);
    let zh = half_depth(zsize);
    let mut half = vec![Complex32::new(0.0, 0.0); 2 * row_pairs * zh];
    for m in 0..row_pairs {
        let row = &packed[m * zsize..(m + 1) * zsize];
        let out_a = 2 * m * zh;
        let out_b = out_a + zh;
        for k in 0..zh {
            let p = row[k];
            let q = row[(zsize - k) % zsize].conj();
            let sum = p + q;
            let diff = p - q;
            half[out_a + k] = Complex32::new(0.5 * sum.re, 0.5 * sum.im);
            // -i/2 * diff
            half[out_b + k] = Complex32::new(0.5 * diff.im, -0.5 * diff.re);
        }
    }
    half
}

/// Rebuild `row_pairs` full-length packed rows from stored halves, the
/// exact inverse of `split_packed_spectra` for spectra of real data.
pub fn fold_half_spectra(half: &[Complex32], row_pairs: usize, zsize: usize) -> Vec<Complex32> {
    let zh = half_depth(zsize);
    assert_eq!(half.len(), 2 * row_pairs * zh);
    let mut packed = vec![Complex32::new(0.0, 0.0); row_pairs * zsize];
    for m in 0..row_pairs {
        let in_a = 2 * m * zh;
        let in_b = in_a + zh;
        let out = m * zsize;
        for k in 0..zsize {
            let (a, b) = if k < zh {
                (half[in_a + k], half[in_b + k])
            } else {
                (half[in_a + zsize - k].conj(), half[in_b + zsize - k].conj())
            };
            // a + i*b
            packed[out + k] = Complex32::new(a.re - b.im, a.im + b.re);
        }
    }
    packed
}

/// De-interleave `row_pairs` inverse-transformed packed rows into
/// `2*row_pairs` real z-rows.
pub fn unpack_real_rows(packed: &[Complex32], row_pairs: usize, zsize: usize) -> Vec<f32> {
    assert_eq!(packed.len(), row_pairs * zsize);
    let mut real = vec![0.0f32; 2 * row_pairs * zsize];
    for m in 0..row_pairs {
        let row_a = 2 * m * zsize;
        let row_b = row_a + zsize;
        for k in 0..zsize {
            let p = packed[m * zsize + k];
            real[row_a + k] = p.re;
            real[row_b + k] = p.im;
        }
    }
    real
}
