/// Screen geometry and color capability of a target e-reader.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DeviceProfile {
    pub width: u32,
    pub height: u32,
    pub is_grayscale: bool,
}

/// Name of the profile used when none is requested.
pub const DEFAULT_DEVICE: &str = "clara-2e";

const KNOWN_DEVICES: &[(&str, DeviceProfile)] = &[
    ("clara-2e", DeviceProfile::new(1072, 1448, true)),
    ("forma", DeviceProfile::new(1440, 1920, true)),
    ("libra-h2o", DeviceProfile::new(1264, 1680, true)),
    ("nia", DeviceProfile::new(758, 1024, true)),
    ("libra-2", DeviceProfile::new(1264, 1680, true)),
    ("sage", DeviceProfile::new(1440, 1920, true)),
    ("elipsa-2e", DeviceProfile::new(1404, 1872, true)),
    ("clara-colour", DeviceProfile::new(1072, 1448, false)),
    ("libra-colour", DeviceProfile::new(1264, 1680, false)),
];

impl DeviceProfile {
    pub const fn new(width: u32, height: u32, is_grayscale: bool) -> Self {
        Self { width, height, is_grayscale }
    }

    /// Case-insensitive lookup in the built-in device table.
    pub fn by_name(name: &str) -> Option<Self> {
        let name = name.trim();
        KNOWN_DEVICES
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(name))
            .map(|(_, profile)| *profile)
    }
}

impl Default for DeviceProfile {
    fn default() -> Self {
        KNOWN_DEVICES[0].1
    }
}

pub fn known_devices() -> impl Iterator<Item = (&'static str, DeviceProfile)> {
    KNOWN_DEVICES.iter().copied()
}
