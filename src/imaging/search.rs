//! Target-size search: find a quality whose encoded size fits a byte budget.
//!
//! A damped proportional step, not a bisection. Each probe encodes at the
//! current quality; if the result is too large the quality is scaled by
//! `target / size` times a damping factor (0.8 far from the target, 0.9
//! close to it) and clamped to the floor. The run ends when a probe fits,
//! when the floor has been probed, or when `max_attempts` probes have been
//! made, whichever comes first. Codec output is only monotonic in
//! expectation, so the attempt cap is the real termination guarantee.
//!
//! ```text
//! Init → Probe ─┬─ size <= target ─────────────→ Done (achieved)
//!               ├─ quality at floor ───────────→ Done (best effort)
//!               └─ step quality, attempts += 1 ─┬─ attempts >= max → Done
//!                                               └─ Probe
//! ```
//!
//! Probes run strictly one after another: each step depends on the size the
//! previous probe produced.

use super::backend::{BackendError, ImageBackend};
use super::calculations::damped_quality_step;
use super::params::{OutputFormat, Quality, SearchLimits};
use super::raster::RasterImage;
use log::debug;
use serde::Serialize;

/// One encode attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Probe {
    pub quality: f32,
    pub size: u64,
}

/// Mutable state of a single search run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetSizeSearchState {
    pub quality: Quality,
    pub attempts: u32,
    pub achieved: bool,
    pub last_size: Option<u64>,
}

impl TargetSizeSearchState {
    pub fn new(initial: Quality) -> Self {
        Self {
            quality: initial,
            attempts: 0,
            achieved: false,
            last_size: None,
        }
    }
}

/// Terminal state of a search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Bytes from the last probe.
    pub bytes: Vec<u8>,
    /// Quality the returned bytes were encoded at.
    pub quality: Quality,
    /// Whether `bytes.len() <= target`.
    pub achieved: bool,
    /// Every probe in order.
    pub probes: Vec<Probe>,
}

impl SearchOutcome {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Run the search for `target` bytes starting at `initial` quality.
///
/// Encoder errors abort the run; there is no partial result.
pub fn search_target_size(
    backend: &impl ImageBackend,
    image: &RasterImage,
    format: OutputFormat,
    initial: Quality,
    target: u64,
    limits: &SearchLimits,
) -> Result<SearchOutcome, BackendError> {
    let floor = limits.min_quality;
    let mut state = TargetSizeSearchState::new(Quality::new(initial.factor().max(floor.factor())));
    let mut probes = Vec::new();

    loop {
        let probed = state.quality;
        let bytes = backend.encode(image, format, probed)?;
        let size = bytes.len() as u64;
        state.last_size = Some(size);
        probes.push(Probe {
            quality: probed.factor(),
            size,
        });
        debug!(
            "target-size probe {}: quality {:.3} → {} bytes (target {})",
            probes.len(),
            probed.factor(),
            size,
            target
        );

        let done = |achieved: bool, probes: Vec<Probe>| SearchOutcome {
            bytes,
            quality: probed,
            achieved,
            probes,
        };

        if size <= target {
            state.achieved = true;
            return Ok(done(true, probes));
        }
        if probed.factor() <= floor.factor() {
            return Ok(done(false, probes));
        }

        state.quality = Quality::new(damped_quality_step(
            probed.factor(),
            size,
            target,
            floor.factor(),
        ));
        state.attempts += 1;
        if state.attempts >= limits.max_attempts {
            return Ok(done(false, probes));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockBackend;

    fn image_100() -> RasterImage {
        // Mock size model: 30_000 * quality bytes for lossy formats
        RasterImage::filled(100, 100, [255, 0, 0, 255])
    }

    #[test]
    fn first_probe_fits_stops_immediately() {
        let backend = MockBackend::new();
        let outcome = search_target_size(
            &backend,
            &image_100(),
            OutputFormat::Jpeg,
            Quality::from_percent(80),
            50_000,
            &SearchLimits::default(),
        )
        .unwrap();
        assert!(outcome.achieved);
        assert_eq!(outcome.probes.len(), 1);
        assert_eq!(outcome.size(), 24_000);
        assert_eq!(outcome.quality, Quality::from_percent(80));
    }

    #[test]
    fn converges_when_target_is_achievable() {
        let backend = MockBackend::new();
        let outcome = search_target_size(
            &backend,
            &image_100(),
            OutputFormat::Jpeg,
            Quality::from_percent(80),
            12_000,
            &SearchLimits::default(),
        )
        .unwrap();
        // 24000 → q = 0.8 * 0.5 * 0.9 = 0.36 → 10800
        assert!(outcome.achieved);
        assert!(outcome.size() <= 12_000);
        assert_eq!(outcome.probes.len(), 2);
        assert_eq!(backend.encode_count(), 2);
    }

    #[test]
    fn target_at_floor_size_is_achieved() {
        let backend = MockBackend::new();
        // Floor quality 0.1 yields 3000 bytes
        let outcome = search_target_size(
            &backend,
            &image_100(),
            OutputFormat::Jpeg,
            Quality::from_percent(80),
            3_000,
            &SearchLimits::default(),
        )
        .unwrap();
        assert!(outcome.achieved);
        assert!(outcome.size() <= 3_000);
        assert!(outcome.probes.len() <= 10);
    }

    #[test]
    fn unachievable_target_terminates_at_floor() {
        let backend = MockBackend::new();
        let outcome = search_target_size(
            &backend,
            &image_100(),
            OutputFormat::Jpeg,
            Quality::from_percent(80),
            1,
            &SearchLimits::default(),
        )
        .unwrap();
        assert!(!outcome.achieved);
        assert!(outcome.probes.len() <= 10);
        assert_eq!(outcome.quality, Quality::new(0.1));
        assert_eq!(outcome.size(), 3_000);
    }

    #[test]
    fn attempt_cap_bounds_probes() {
        let backend = MockBackend::new();
        let limits = SearchLimits::new(1, Quality::new(0.1));
        let outcome = search_target_size(
            &backend,
            &image_100(),
            OutputFormat::Jpeg,
            Quality::from_percent(100),
            1,
            &limits,
        )
        .unwrap();
        assert!(!outcome.achieved);
        assert_eq!(outcome.probes.len(), 1);
        assert_eq!(backend.encode_count(), 1);
        // The returned bytes belong to the probed quality, not the next step
        assert_eq!(outcome.quality, Quality::from_percent(100));
    }

    #[test]
    fn zero_attempt_limit_still_probes_once() {
        let limits = SearchLimits::new(0, Quality::new(0.1));
        assert_eq!(limits.max_attempts, 1);
    }

    #[test]
    fn lossless_format_stops_at_floor() {
        // PNG ignores quality, so the size never shrinks; the floor ends it.
        let backend = MockBackend::new();
        let outcome = search_target_size(
            &backend,
            &image_100(),
            OutputFormat::Png,
            Quality::from_percent(80),
            100,
            &SearchLimits::default(),
        )
        .unwrap();
        assert!(!outcome.achieved);
        assert!(outcome.probes.len() <= 10);
        assert!(outcome.probes.iter().all(|p| p.size == 30_000));
    }

    #[test]
    fn initial_quality_below_floor_is_raised() {
        let backend = MockBackend::new();
        let outcome = search_target_size(
            &backend,
            &image_100(),
            OutputFormat::Jpeg,
            Quality::from_percent(5),
            1,
            &SearchLimits::default(),
        )
        .unwrap();
        assert_eq!(outcome.probes.len(), 1);
        assert_eq!(outcome.probes[0].quality, 0.1);
    }

    #[test]
    fn probe_qualities_never_increase() {
        let backend = MockBackend::new();
        let outcome = search_target_size(
            &backend,
            &image_100(),
            OutputFormat::Jpeg,
            Quality::from_percent(100),
            4_000,
            &SearchLimits::default(),
        )
        .unwrap();
        assert!(
            outcome
                .probes
                .windows(2)
                .all(|w| w[1].quality <= w[0].quality)
        );
    }

    #[test]
    fn encoder_errors_abort() {
        let backend = MockBackend::failing();
        let result = search_target_size(
            &backend,
            &image_100(),
            OutputFormat::Jpeg,
            Quality::default(),
            1_000,
            &SearchLimits::default(),
        );
        assert!(matches!(result, Err(BackendError::EncodeFailed(_))));
    }
}
