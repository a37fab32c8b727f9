use std::fmt;
use std::str::FromStr;

/// Requested capture quality.
///
/// `Native` keeps the source resolution; the others ask the backend to
/// deliver frames at a fixed size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CapturePreset {
    #[default]
    Native,
    Hd1280x720,
    Vga640x480,
    Custom {
        width: u32,
        height: u32,
    },
}

impl CapturePreset {
    /// Output size, or `None` for the source's own size.
    pub fn dimensions(self) -> Option<(u32, u32)> {
        match self {
            CapturePreset::Native => None,
            CapturePreset::Hd1280x720 => Some((1280, 720)),
            CapturePreset::Vga640x480 => Some((640, 480)),
            CapturePreset::Custom { width, height } => Some((width, height)),
        }
    }

    /// Size frames will have for a source of `width` x `height`.
    pub fn resolve(self, width: u32, height: u32) -> (u32, u32) {
        self.dimensions().unwrap_or((width, height))
    }

    /// A preset no backend can honour.
    pub fn is_degenerate(self) -> bool {
        matches!(self.dimensions(), Some((w, h)) if w == 0 || h == 0)
    }
}

impl fmt::Display for CapturePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.dimensions() {
            None => write!(f, "native"),
            Some((w, h)) => write!(f, "{w}x{h}"),
        }
    }
}

impl FromStr for CapturePreset {
    type Err = String;

    /// Accepts `native`, `hd`, `vga`, or an explicit `WIDTHxHEIGHT`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "native" => Ok(CapturePreset::Native),
            "hd" | "720p" | "1280x720" => Ok(CapturePreset::Hd1280x720),
            "vga" | "640x480" => Ok(CapturePreset::Vga640x480),
            other => {
                let (w, h) = other
                    .split_once('x')
                    .ok_or_else(|| format!("invalid preset '{s}': expected native, hd, vga or WxH"))?;
                let width = w.parse().map_err(|_| format!("invalid preset width '{w}'"))?;
                let height = h.parse().map_err(|_| format!("invalid preset height '{h}'"))?;
                Ok(CapturePreset::Custom { width, height })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("native", CapturePreset::Native)]
    #[case("HD", CapturePreset::Hd1280x720)]
    #[case("640x480", CapturePreset::Vga640x480)]
    #[case("320x240", CapturePreset::Custom { width: 320, height: 240 })]
    fn test_parse(#[case] input: &str, #[case] expected: CapturePreset) {
        assert_eq!(input.parse::<CapturePreset>().unwrap(), expected);
    }

    #[rstest]
    #[case("large")]
    #[case("320x")]
    #[case("x240")]
    fn test_parse_rejects_garbage(#[case] input: &str) {
        assert!(input.parse::<CapturePreset>().is_err());
    }

    #[test]
    fn test_resolve_native_keeps_source_size() {
        assert_eq!(CapturePreset::Native.resolve(1920, 1080), (1920, 1080));
        assert_eq!(CapturePreset::Vga640x480.resolve(1920, 1080), (640, 480));
    }

    #[test]
    fn test_zero_custom_is_degenerate() {
        assert!(CapturePreset::Custom { width: 0, height: 480 }.is_degenerate());
        assert!(!CapturePreset::Hd1280x720.is_degenerate());
        assert!(!CapturePreset::Native.is_degenerate());
    }

    #[test]
    fn test_display() {
        assert_eq!(CapturePreset::Native.to_string(), "native");
        assert_eq!(CapturePreset::Hd1280x720.to_string(), "1280x720");
    }
}
