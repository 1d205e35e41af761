// ─────────────────────────────────────────────────────────────────────
// SCPN Spectral Core — Transform Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use serde::{Deserialize, Serialize};

use crate::error::{SpectralError, SpectralResult};

/// Which FFT backend services a transform of this shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Pick the native engine when the shape allows it, the vendor
    /// delegate otherwise.
    #[default]
    Auto,
    /// Force the native mixed-radix engine.
    Native,
    /// Force the vendor-library delegate.
    Vendor,
}

/// Reciprocal-space transform configuration.
/// Maps 1:1 to the `fft` section of the engine JSON config files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Grid sizes along x, y, z.
    pub grid_resolution: [usize; 3],
    /// Real-to-complex transform instead of complex-to-complex.
    #[serde(default)]
    pub real_to_complex: bool,
    #[serde(default)]
    pub backend: BackendKind,
}

impl TransformConfig {
    pub fn new(xsize: usize, ysize: usize, zsize: usize, real_to_complex: bool) -> Self {
        Self {
            grid_resolution: [xsize, ysize, zsize],
            real_to_complex,
            backend: BackendKind::Auto,
        }
    }

    /// Parse a config from JSON text.
    pub fn from_json(text: &str) -> SpectralResult<Self> {
        let config: TransformConfig = serde_json::from_str(text)?;
        config.validated()
    }

    pub fn validated(self) -> SpectralResult<Self> {
        for (axis, &n) in ["xsize", "ysize", "zsize"]
            .iter()
            .zip(self.grid_resolution.iter())
        {
            if n == 0 {
                return Err(SpectralError::Configuration(format!(
                    "transform {axis} must be > 0"
                )));
            }
        }
        Ok(self)
    }

    pub fn xsize(&self) -> usize {
        self.grid_resolution[0]
    }

    pub fn ysize(&self) -> usize {
        self.grid_resolution[1]
    }

    pub fn zsize(&self) -> usize {
        self.grid_resolution[2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_full() {
        let config = TransformConfig::from_json(
            r#"{"grid_resolution": [64, 60, 54], "real_to_complex": true, "backend": "native"}"#,
        )
        .expect("valid config JSON");
        assert_eq!(config.grid_resolution, [64, 60, 54]);
        assert!(config.real_to_complex);
        assert_eq!(config.backend, BackendKind::Native);
    }

    #[test]
    fn test_from_json_defaults() {
        let config = TransformConfig::from_json(r#"{"grid_resolution": [32, 32, 32]}"#)
            .expect("valid config JSON");
        assert!(!config.real_to_complex);
        assert_eq!(config.backend, BackendKind::Auto);
    }

    #[test]
    fn test_rejects_zero_dimension() {
        assert!(TransformConfig::from_json(r#"{"grid_resolution": [32, 0, 32]}"#).is_err());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let config = TransformConfig::new(100, 100, 105, true);
        let text = serde_json::to_string(&config).expect("serializable config");
        let back = TransformConfig::from_json(&text).expect("roundtrip parse");
        assert_eq!(back.grid_resolution, config.grid_resolution);
        assert_eq!(back.real_to_complex, config.real_to_complex);
    }
}
