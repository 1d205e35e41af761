// ─────────────────────────────────────────────────────────────────────
// SCPN Spectral Core — Mixed-Radix Stage Plan
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Stockham mixed-radix decomposition of a 1D transform.
//!
//! A transform of legal length N is factored into prime-radix stages.
//! Each stage with radix R and span S (the product of all earlier
//! radices) maps butterfly j as
//!
//!   gather:  v[q] = src[j + q*(N/R)] * exp(sign*2πi * (j mod S)*q / (S*R))
//!   combine: R-point DFT of v
//!   scatter: dst[(j/S)*S*R + (j mod S) + q*S]
//!
//! with src/dst ping-ponging between two buffers. Data enters and leaves
//! in natural order; no bit-reversal pass exists because the radices are
//! non-uniform. The same stage list and twiddle tables drive both the
//! generated WGSL kernels and the host reference path used by the tests.

use std::f64::consts::PI;

use num_complex::Complex32;
use spectral_types::error::{SpectralError, SpectralResult};

use crate::dimension::factor_radices;

/// One butterfly stage of a 1D transform program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadixStage {
    /// Prime radix of this stage.
    pub radix: usize,
    /// Product of the radices of all earlier stages.
    pub span: usize,
    /// Offset of this stage's table inside the plan's twiddle buffer.
    pub twiddle_offset: usize,
}

/// Complete stage sequence and twiddle tables for one (length, direction).
#[derive(Debug, Clone)]
pub struct StagePlan {
    pub len: usize,
    pub forward: bool,
    pub stages: Vec<RadixStage>,
    /// Compact per-stage tables: span*(radix-1) entries per stage, q = 0
    /// omitted. Exactly len-1 entries in total, for either direction.
    pub twiddles: Vec<Complex32>,
}

impl StagePlan {
    pub fn new(len: usize, forward: bool) -> SpectralResult<Self> {
        let radices = factor_radices(len).ok_or_else(|| {
            SpectralError::Configuration(format!(
                "transform length {len} has prime factors outside {{2, 3, 5, 7}}"
            ))
        })?;

        let sign = direction_sign(forward);
        let mut stages = Vec::with_capacity(radices.len());
        let mut twiddles = Vec::with_capacity(len.saturating_sub(1));
        let mut span = 1usize;
        for radix in radices {
            stages.push(RadixStage {
                radix,
                span,
                twiddle_offset: twiddles.len(),
            });
            let period = (span * radix) as f64;
            for t in 0..span {
                for q in 1..radix {
                    let angle = sign * 2.0 * PI * (t * q) as f64 / period;
                    twiddles.push(Complex32::new(angle.cos() as f32, angle.sin() as f32));
                }
            }
            span *= radix;
        }
        debug_assert_eq!(span, len);

        Ok(Self {
            len,
            forward,
            stages,
            twiddles,
        })
    }

    /// Apply the plan to one line on the host.
    ///
    /// This is the reference implementation of the exact arithmetic the
    /// generated kernels perform; the integration tests hold it against a
    /// brute-force DFT.
    pub fn apply(&self, line: &mut [Complex32]) {
        assert_eq!(line.len(), self.len);
        let n = self.len;
        let mut src = line.to_vec();
        let mut dst = vec![Complex32::new(0.0, 0.0); n];

        for stage in &self.stages {
            let radix = stage.radix;
            let span = stage.span;
            let butterflies = n / radix;
            let roots = unit_roots(radix, self.forward);
            for j in 0..butterflies {
                let t = j % span;
                let mut v = [Complex32::new(0.0, 0.0); 7];
                v[0] = src[j];
                for q in 1..radix {
                    let w = self.twiddles[stage.twiddle_offset + t * (radix - 1) + (q - 1)];
                    v[q] = src[j + q * butterflies] * w;
                }
                let base = (j / span) * span * radix + t;
                for q in 0..radix {
                    let mut acc = v[0];
                    for p in 1..radix {
                        acc += v[p] * roots[(q * p) % radix];
                    }
                    dst[base + q * span] = acc;
                }
            }
            std::mem::swap(&mut src, &mut dst);
        }
        line.copy_from_slice(&src);
    }
}

pub(crate) fn direction_sign(forward: bool) -> f64 {
    if forward {
        -1.0
    } else {
        1.0
    }
}

/// The R roots of unity exp(sign*2πi*k/R), k in 0..R. The generated WGSL
/// bakes these exact f32 values so device and host agree bit-for-bit.
pub(crate) fn unit_roots(radix: usize, forward: bool) -> Vec<Complex32> {
    let sign = direction_sign(forward);
    (0..radix)
        .map(|k| {
            let angle = sign * 2.0 * PI * k as f64 / radix as f64;
            Complex32::new(angle.cos() as f32, angle.sin() as f32)
        })
        .collect()
}
