use std::fmt;
use std::str::FromStr;

/// Policy for choosing the next current item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionMode {
    Random,
    Sequential,
}

impl SelectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionMode::Random => "random",
            SelectionMode::Sequential => "sequential",
        }
    }
}

impl Default for SelectionMode {
    fn default() -> Self {
        SelectionMode::Random
    }
}

impl FromStr for SelectionMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(SelectionMode::Random),
            "sequential" => Ok(SelectionMode::Sequential),
            _ => Err(()),
        }
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How long the current item stays on display before the coordinator
/// advances to the next one. `Never` disables automatic advancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayInterval {
    Never,
    Seconds10,
    Seconds30,
    Seconds60,
    Seconds120,
    Seconds300,
}

impl DisplayInterval {
    /// Interval length in seconds; `None` for `Never`.
    pub fn seconds(&self) -> Option<u64> {
        match self {
            DisplayInterval::Never => None,
            DisplayInterval::Seconds10 => Some(10),
            DisplayInterval::Seconds30 => Some(30),
            DisplayInterval::Seconds60 => Some(60),
            DisplayInterval::Seconds120 => Some(120),
            DisplayInterval::Seconds300 => Some(300),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayInterval::Never => "never",
            DisplayInterval::Seconds10 => "10",
            DisplayInterval::Seconds30 => "30",
            DisplayInterval::Seconds60 => "60",
            DisplayInterval::Seconds120 => "120",
            DisplayInterval::Seconds300 => "300",
        }
    }
}

impl Default for DisplayInterval {
    fn default() -> Self {
        DisplayInterval::Seconds60
    }
}

impl FromStr for DisplayInterval {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "never" => Ok(DisplayInterval::Never),
            "10" => Ok(DisplayInterval::Seconds10),
            "30" => Ok(DisplayInterval::Seconds30),
            "60" => Ok(DisplayInterval::Seconds60),
            "120" => Ok(DisplayInterval::Seconds120),
            "300" => Ok(DisplayInterval::Seconds300),
            _ => Err(()),
        }
    }
}

impl fmt::Display for DisplayInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a source image is fitted to the requested output size.
///
/// `Contain` keeps the whole image, `Crop` covers the canvas with one image,
/// `Combined` may tile two complementary-orientation images to reduce the
/// cropped-away area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CropMode {
    Contain,
    Crop,
    Combined,
}

impl CropMode {
    /// Whether the service should be asked for a cover-cropped rendition.
    pub fn requests_crop(&self) -> bool {
        matches!(self, CropMode::Crop | CropMode::Combined)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CropMode::Contain => "contain",
            CropMode::Crop => "crop",
            CropMode::Combined => "combined",
        }
    }
}

impl Default for CropMode {
    fn default() -> Self {
        CropMode::Contain
    }
}

impl FromStr for CropMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "contain" => Ok(CropMode::Contain),
            "crop" => Ok(CropMode::Crop),
            "combined" => Ok(CropMode::Combined),
            _ => Err(()),
        }
    }
}

impl fmt::Display for CropMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-collection configuration, consumed here as plain values. Stored and
/// edited by the embedding application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionSettings {
    pub selection_mode: SelectionMode,
    pub display_interval: DisplayInterval,
    pub crop_mode: CropMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_mode_round_trip() {
        assert_eq!("random".parse::<SelectionMode>(), Ok(SelectionMode::Random));
        assert_eq!(
            "sequential".parse::<SelectionMode>(),
            Ok(SelectionMode::Sequential)
        );
        assert_eq!("shuffle".parse::<SelectionMode>(), Err(()));
        assert_eq!(format!("{}", SelectionMode::Sequential), "sequential");
    }

    #[test]
    fn test_display_interval_seconds() {
        assert_eq!(DisplayInterval::Never.seconds(), None);
        assert_eq!(DisplayInterval::Seconds10.seconds(), Some(10));
        assert_eq!(DisplayInterval::Seconds300.seconds(), Some(300));
    }

    #[test]
    fn test_display_interval_parse() {
        for opt in ["never", "10", "30", "60", "120", "300"] {
            let parsed = opt.parse::<DisplayInterval>().unwrap();
            assert_eq!(parsed.as_str(), opt);
        }
        assert_eq!("15".parse::<DisplayInterval>(), Err(()));
    }

    #[test]
    fn test_crop_mode_requests_crop() {
        assert!(!CropMode::Contain.requests_crop());
        assert!(CropMode::Crop.requests_crop());
        assert!(CropMode::Combined.requests_crop());
    }

    #[test]
    fn test_defaults() {
        let settings = CollectionSettings::default();
        assert_eq!(settings.selection_mode, SelectionMode::Random);
        assert_eq!(settings.display_interval, DisplayInterval::Seconds60);
        assert_eq!(settings.crop_mode, CropMode::Contain);
    }
}
