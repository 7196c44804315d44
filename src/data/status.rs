//! Distance classification.
//!
//! Two mappings live here. [`classify`] is the coarse three-level status used
//! by the summary card and the readings table. [`MarkerTier`] is the finer
//! four-band coloring used for chart markers; it adds an "observe" band and
//! deliberately does not line up with the status boundaries.

use super::color::{self, Rgb};
use super::limits::{
    MARKER_ALERT_FROM, MARKER_OBSERVE_FROM, MARKER_OBSERVE_TO, MARKER_WARNING_FROM,
    STATUS_ALERT_ABOVE, STATUS_WARNING_FROM,
};

/// Severity of the latest reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    /// No measurement has been received yet.
    Unknown,
    Safe,
    Warning,
    Alert,
}

/// Display attributes attached to a [`Status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPalette {
    /// Card background.
    pub primary: Rgb,
    /// Foreground text on the card.
    pub text: Rgb,
    /// Badge/pill background.
    pub badge: Rgb,
}

impl Status {
    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Status::Unknown => "Unknown",
            Status::Safe => "Safe",
            Status::Warning => "Warning",
            Status::Alert => "Alert",
        }
    }

    /// Lowercase level name, as used in exports.
    pub fn level(&self) -> &'static str {
        match self {
            Status::Unknown => "unknown",
            Status::Safe => "safe",
            Status::Warning => "warning",
            Status::Alert => "alert",
        }
    }

    pub fn palette(&self) -> StatusPalette {
        match self {
            Status::Unknown => StatusPalette {
                primary: Rgb::from_hex(0x1f2937),
                text: Rgb::from_hex(0x9ca3af),
                badge: Rgb::from_hex(0x374151),
            },
            Status::Safe => StatusPalette {
                primary: Rgb::from_hex(0x16a34a),
                text: Rgb::from_hex(0xdcfce7),
                badge: Rgb::from_hex(0x14532d),
            },
            Status::Warning => StatusPalette {
                primary: Rgb::from_hex(0xeab308),
                text: Rgb::from_hex(0xfef9c3),
                badge: Rgb::from_hex(0x713f12),
            },
            Status::Alert => StatusPalette {
                primary: Rgb::from_hex(0xdc2626),
                text: Rgb::from_hex(0xfee2e2),
                badge: Rgb::from_hex(0x7f1d1d),
            },
        }
    }
}

/// Classify a distance into a [`Status`].
///
/// `None` means no measurement exists yet.
pub fn classify(distance: Option<f64>) -> Status {
    let Some(d) = distance else {
        return Status::Unknown;
    };

    if d > STATUS_ALERT_ABOVE {
        Status::Alert
    } else if d >= STATUS_WARNING_FROM {
        Status::Warning
    } else {
        Status::Safe
    }
}

/// Color band of a chart marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerTier {
    Safe,
    Warning,
    Observe,
    Alert,
}

impl MarkerTier {
    /// Pick the band for a distance.
    ///
    /// The observe band is closed on both ends (`26..=29`); values between 29
    /// and 30 fall back to the warning band.
    pub fn for_distance(d: f64) -> Self {
        if d >= MARKER_ALERT_FROM {
            MarkerTier::Alert
        } else if (MARKER_OBSERVE_FROM..=MARKER_OBSERVE_TO).contains(&d) {
            MarkerTier::Observe
        } else if d >= MARKER_WARNING_FROM {
            MarkerTier::Warning
        } else {
            MarkerTier::Safe
        }
    }

    pub fn color(&self) -> Rgb {
        match self {
            MarkerTier::Safe => color::GREEN,
            MarkerTier::Warning => color::YELLOW,
            MarkerTier::Observe => color::BLUE,
            MarkerTier::Alert => color::RED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(classify(Some(16.0)), Status::Warning);
        assert_eq!(classify(Some(15.999)), Status::Safe);
        assert_eq!(classify(Some(25.0)), Status::Warning);
        assert_eq!(classify(Some(25.001)), Status::Alert);
        assert_eq!(classify(None), Status::Unknown);
    }

    #[test]
    fn test_classify_extremes() {
        assert_eq!(classify(Some(0.0)), Status::Safe);
        assert_eq!(classify(Some(1.0e9)), Status::Alert);
        assert_eq!(classify(Some(f64::INFINITY)), Status::Alert);
        // Every comparison with NaN is false.
        assert_eq!(classify(Some(f64::NAN)), Status::Safe);
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(Status::Unknown.label(), "Unknown");
        assert_eq!(Status::Safe.label(), "Safe");
        assert_eq!(Status::Warning.label(), "Warning");
        assert_eq!(Status::Alert.label(), "Alert");
        assert_eq!(Status::Alert.level(), "alert");
    }

    #[test]
    fn test_palettes_are_distinct() {
        let all = [Status::Unknown, Status::Safe, Status::Warning, Status::Alert];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a.palette().primary, b.palette().primary);
            }
        }
    }

    #[test]
    fn test_marker_boundaries() {
        assert_eq!(MarkerTier::for_distance(29.999), MarkerTier::Warning);
        assert_eq!(MarkerTier::for_distance(30.0), MarkerTier::Alert);
        assert_eq!(MarkerTier::for_distance(25.999), MarkerTier::Warning);
        assert_eq!(MarkerTier::for_distance(26.0), MarkerTier::Observe);
        assert_eq!(MarkerTier::for_distance(29.0), MarkerTier::Observe);
        assert_eq!(MarkerTier::for_distance(16.0), MarkerTier::Warning);
        assert_eq!(MarkerTier::for_distance(15.999), MarkerTier::Safe);
        assert_eq!(MarkerTier::for_distance(0.0), MarkerTier::Safe);
    }

    #[test]
    fn test_marker_colors() {
        assert_eq!(MarkerTier::for_distance(40.0).color(), color::RED);
        assert_eq!(MarkerTier::for_distance(27.0).color(), color::BLUE);
        assert_eq!(MarkerTier::for_distance(20.0).color(), color::YELLOW);
        assert_eq!(MarkerTier::for_distance(10.0).color(), color::GREEN);
    }

    #[test]
    fn test_marker_and_status_disagree_at_26() {
        // 26 is already an alert for the status card but only "observe" on the chart.
        assert_eq!(classify(Some(26.0)), Status::Alert);
        assert_eq!(MarkerTier::for_distance(26.0), MarkerTier::Observe);
    }
}
