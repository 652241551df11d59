//! One-line action reports written to the output stream.

use std::fmt;

use crate::capture::Point;
use crate::template::PatternRole;

/// `<unix>\t<ROLE>: at <x>x<y> (score: <confidence>)`
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ActionReport {
    pub timestamp: u64,
    pub role: PatternRole,
    /// Match location in screen coordinates, before any jitter or centering.
    pub location: Point,
    pub confidence: f64,
}

impl fmt::Display for ActionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}: at {}x{} (score: {:.3})",
            self.timestamp,
            self.role.label(),
            self.location.x,
            self.location.y,
            self.confidence
        )
    }
}

#[cfg(test)]
mod tests {
    use super::ActionReport;
    use crate::capture::Point;
    use crate::template::PatternRole;

    #[test]
    fn formats_tab_separated_line() {
        let report = ActionReport {
            timestamp: 1_310_000_000,
            role: PatternRole::City,
            location: Point::new(412, 96),
            confidence: 3.14159,
        };
        assert_eq!(
            report.to_string(),
            "1310000000\tCITY: at 412x96 (score: 3.142)"
        );
    }
}
