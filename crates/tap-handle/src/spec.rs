use serde::{Deserialize, Serialize};
use tracing::info;

/// Dimensions of a tap wrench handle, in millimetres.
///
/// Missing fields take their defaults when deserialized, so a partial JSON
/// object is a valid spec.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TapHandleSpec {
    pub shaft_od: f64,
    pub shaft_length: f64,
    /// Length of the hexagonal drive at the top of the shaft.
    pub shaft_hex_length: f64,
    pub tap_diameter: f64,
    /// Depth of the square socket the tap shank sits in.
    pub tap_square_length: f64,
    /// Depth of the round relief bore at the socket mouth.
    pub tap_round_length: f64,
    pub handle_base_diameter: f64,
    pub handle_t_width: f64,
    /// Length of the main bar, along X.
    pub handle_t_length: f64,
    /// Length of the cross bar, along Y.
    pub handle_t_length_2: f64,
    pub handle_t_height: f64,
}

impl Default for TapHandleSpec {
    fn default() -> Self {
        Self {
            shaft_od: 12.5,
            shaft_length: 140.0,
            shaft_hex_length: 10.0,
            tap_diameter: 3.0,
            tap_square_length: 10.0,
            tap_round_length: 2.0,
            handle_base_diameter: 30.0,
            handle_t_width: 15.0,
            handle_t_length: 120.0,
            handle_t_length_2: 60.0,
            handle_t_height: 10.0,
        }
    }
}

impl TapHandleSpec {
    /// Default dimensions. Logs the derived socket size.
    pub fn new() -> Self {
        Self::default().logged()
    }

    /// Default dimensions for a tap of the given shank diameter.
    pub fn with_tap_diameter(tap_diameter: f64) -> Self {
        Self {
            tap_diameter,
            ..Self::default()
        }
        .logged()
    }

    fn logged(self) -> Self {
        info!(
            tap_diameter = self.tap_diameter,
            "tap square side length: {:.2} mm",
            self.tap_square_side_length()
        );
        self
    }

    /// Side of the square socket: the square inscribed in the tap's circle.
    pub fn tap_square_side_length(&self) -> f64 {
        self.tap_diameter / std::f64::consts::SQRT_2
    }

    /// Every field with its name, in declaration order.
    pub fn fields(&self) -> [(&'static str, f64); 11] {
        [
            ("shaft_od", self.shaft_od),
            ("shaft_length", self.shaft_length),
            ("shaft_hex_length", self.shaft_hex_length),
            ("tap_diameter", self.tap_diameter),
            ("tap_square_length", self.tap_square_length),
            ("tap_round_length", self.tap_round_length),
            ("handle_base_diameter", self.handle_base_diameter),
            ("handle_t_width", self.handle_t_width),
            ("handle_t_length", self.handle_t_length),
            ("handle_t_length_2", self.handle_t_length_2),
            ("handle_t_height", self.handle_t_height),
        ]
    }

    /// Check the dimensions describe a buildable handle.
    pub fn validate(&self) -> Result<(), SpecError> {
        if let Some((field, value)) = self
            .fields()
            .into_iter()
            .find(|(_, v)| !(v.is_finite() && *v > 0.0))
        {
            return Err(SpecError::NonPositive { field, value });
        }
        if self.shaft_hex_length >= self.shaft_length {
            return Err(SpecError::HexLongerThanShaft {
                hex: self.shaft_hex_length,
                shaft: self.shaft_length,
            });
        }
        let side = self.tap_square_side_length();
        if side >= self.shaft_od {
            return Err(SpecError::SocketWiderThanShaft {
                side,
                shaft_od: self.shaft_od,
            });
        }
        if self.shaft_od >= self.handle_base_diameter {
            return Err(SpecError::ShaftWiderThanBase {
                shaft_od: self.shaft_od,
                base: self.handle_base_diameter,
            });
        }
        let depth = self.tap_square_length.max(self.tap_round_length);
        if depth >= self.shaft_length {
            return Err(SpecError::SocketDeeperThanShaft {
                depth,
                shaft: self.shaft_length,
            });
        }
        Ok(())
    }
}

/// Dimensions that cannot produce a valid handle.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpecError {
    #[error("{field} must be a positive finite length, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("hex drive length {hex} must be shorter than the shaft ({shaft})")]
    HexLongerThanShaft { hex: f64, shaft: f64 },

    #[error("square socket side {side:.3} must be narrower than the shaft diameter {shaft_od}")]
    SocketWiderThanShaft { side: f64, shaft_od: f64 },

    #[error("shaft diameter {shaft_od} must be smaller than the handle base diameter {base}")]
    ShaftWiderThanBase { shaft_od: f64, base: f64 },

    #[error("socket depth {depth} must be shorter than the shaft ({shaft})")]
    SocketDeeperThanShaft { depth: f64, shaft: f64 },
}
