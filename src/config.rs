//! Session configuration of a counting engine.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, ZoneError};
use crate::tracker::TrackerConfig;
use crate::zone::{ConfirmPolicy, MembershipSignal, OccupancyConfig};

/// Everything a [`ZoneCounter`](crate::ZoneCounter) needs besides the
/// zone itself. Missing fields take their defaults.
///
/// ```json
/// {
///   "margin_px": 5.0,
///   "cross_margin_px": 8.0,
///   "tracker": { "max_distance": 60.0, "max_miss": 40 },
///   "rider_iou_threshold": 0.25,
///   "zone_padding_px": 12,
///   "frame_size": [1280, 720]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    #[serde(flatten)]
    pub occupancy: OccupancyConfig,
    pub tracker: TrackerConfig,
    /// Persons overlapping a bicycle or motorcycle at or above this IoU
    /// are riders and are not counted.
    pub rider_iou_threshold: f32,
    /// Grow the zone outward by this many pixels before counting.
    pub zone_padding_px: u32,
    /// Frame width and height; required when `zone_padding_px > 0`.
    pub frame_size: Option<[u32; 2]>,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            occupancy: OccupancyConfig::default(),
            tracker: TrackerConfig::default(),
            rider_iou_threshold: 0.25,
            zone_padding_px: 0,
            frame_size: None,
        }
    }
}

impl CounterConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Reject values that would make counting meaningless.
    pub fn validate(&self) -> Result<()> {
        let occ = &self.occupancy;
        if !(occ.margin_px.is_finite() && occ.margin_px >= 0.0) {
            return Err(ZoneError::config(format!(
                "margin_px must be a non-negative number, got {}",
                occ.margin_px
            )));
        }
        if !(occ.cross_margin_px.is_finite() && occ.cross_margin_px >= 0.0) {
            return Err(ZoneError::config(format!(
                "cross_margin_px must be a non-negative number, got {}",
                occ.cross_margin_px
            )));
        }

        match occ.membership {
            MembershipSignal::ReferencePoint => {}
            MembershipSignal::BoxRatio {
                enter_ratio,
                exit_ratio,
                grid,
            } => {
                let unit = 0.0..=1.0;
                if !unit.contains(&enter_ratio) || !unit.contains(&exit_ratio) {
                    return Err(ZoneError::config(format!(
                        "box ratio thresholds must lie in [0, 1], got enter {} exit {}",
                        enter_ratio, exit_ratio
                    )));
                }
                if exit_ratio > enter_ratio {
                    return Err(ZoneError::config(format!(
                        "exit_ratio {} exceeds enter_ratio {}",
                        exit_ratio, enter_ratio
                    )));
                }
                if grid == 0 {
                    return Err(ZoneError::config("box ratio grid must be at least 1"));
                }
            }
        }

        if let ConfirmPolicy::Streak { frames: 0 } = occ.confirm {
            return Err(ZoneError::config("streak confirmation needs at least 1 frame"));
        }

        let max_distance = self.tracker.max_distance;
        if !(max_distance.is_finite() && max_distance > 0.0) {
            return Err(ZoneError::config(format!(
                "tracker.max_distance must be positive, got {}",
                max_distance
            )));
        }

        let iou = self.rider_iou_threshold;
        if !(iou > 0.0 && iou <= 1.0) {
            return Err(ZoneError::config(format!(
                "rider_iou_threshold must lie in (0, 1], got {}",
                iou
            )));
        }

        if self.zone_padding_px > 0 {
            match self.frame_size {
                Some([w, h]) if w > 0 && h > 0 => {}
                _ => {
                    return Err(ZoneError::config(
                        "zone_padding_px needs a non-empty frame_size",
                    ));
                }
            }
        }
        Ok(())
    }
}
