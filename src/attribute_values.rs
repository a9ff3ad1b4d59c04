use std::collections::HashMap;

/// Rewrites well-known integer attribute values into the symbolic names
/// developers wrote in the source manifest.
///
/// The mapper is plain immutable configuration handed to the decode entry
/// point; there is no process-wide hook. Values that do not parse as
/// decimal or `0x`-prefixed hex pass through untouched, as do attributes
/// without a registered mapping.
pub struct AttributeValueMapper {
    mappings: HashMap<&'static str, fn(u32) -> String>,
}

impl AttributeValueMapper {
    /// A mapper with no mappings; every value passes through.
    pub fn empty() -> Self {
        AttributeValueMapper {
            mappings: HashMap::new(),
        }
    }

    /// The built-in mappings for the manifest attributes that store enums
    /// or bitmasks as raw integers.
    pub fn builtin() -> Self {
        let mut mapper = AttributeValueMapper::empty();
        mapper.mappings.insert("screenOrientation", screen_orientation);
        mapper.mappings.insert("configChanges", config_changes);
        mapper.mappings.insert("windowSoftInputMode", window_soft_input_mode);
        mapper.mappings.insert("launchMode", launch_mode);
        mapper.mappings.insert("documentLaunchMode", document_launch_mode);
        mapper.mappings.insert("installLocation", install_location);
        mapper.mappings.insert("protectionLevel", protection_level);
        mapper
    }

    /// Registers or replaces a mapping.
    pub fn with_mapping(mut self, attribute_name: &'static str, mapping: fn(u32) -> String) -> Self {
        self.mappings.insert(attribute_name, mapping);
        self
    }

    /// The humanised value, or `None` when the attribute has no mapping or
    /// the value is not numeric.
    pub fn map(&self, attribute_name: &str, value: &str) -> Option<String> {
        let mapping = self.mappings.get(attribute_name)?;
        Some(mapping(parse_numeric(value)?))
    }
}

impl Default for AttributeValueMapper {
    fn default() -> Self {
        AttributeValueMapper::builtin()
    }
}

fn parse_numeric(value: &str) -> Option<u32> {
    if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        return u32::from_str_radix(hex, 16).ok();
    }
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        return value.parse().ok();
    }
    None
}

fn screen_orientation(value: u32) -> String {
    let name = match value {
        0x0000_0000 => "landscape",
        0x0000_0001 => "portrait",
        0x0000_0002 => "user",
        0x0000_0003 => "behind",
        0x0000_0004 => "sensor",
        0x0000_0005 => "nosensor",
        0x0000_0006 => "sensorLandscape",
        0x0000_0007 => "sensorPortrait",
        0x0000_0008 => "reverseLandscape",
        0x0000_0009 => "reversePortrait",
        0x0000_000a => "fullSensor",
        0x0000_000b => "userLandscape",
        0x0000_000c => "userPortrait",
        0x0000_000d => "fullUser",
        0x0000_000e => "locked",
        0xffff_ffff => "unspecified",
        other => return format!("ScreenOrientation:{other:x}"),
    };
    name.to_string()
}

// Bit masks in ascending bit order, so joined output reads low bit first
// and fontScale comes out last.
const CONFIG_CHANGES: &[(u32, &str)] = &[
    (0x0000_0001, "mcc"),
    (0x0000_0002, "mnc"),
    (0x0000_0004, "locale"),
    (0x0000_0008, "touchscreen"),
    (0x0000_0010, "keyboard"),
    (0x0000_0020, "orientation"),
    (0x0000_0040, "navigation"),
    (0x0000_0080, "keyboardHidden"),
    (0x0000_0100, "uiMode"),
    (0x0000_0200, "screenSize"),
    (0x0000_0400, "screenLayout"),
    (0x0000_0800, "smallestScreenSize"),
    (0x0000_1000, "density"),
    (0x0000_2000, "direction"),
    (0x4000_0000, "fontScale"),
];

fn config_changes(value: u32) -> String {
    let names: Vec<&str> = CONFIG_CHANGES
        .iter()
        .filter(|(mask, _)| value & mask != 0)
        .map(|(_, name)| *name)
        .collect();
    names.join("|")
}

// State values are index positions (SOFT_INPUT_STATE_*), not bit flags; an
// older encoding matched raw 3-bit values instead and is deliberately not
// supported.
fn window_soft_input_mode(value: u32) -> String {
    let adjust = value & 0x0000_00f0;
    let state = value & 0x0000_000f;
    let mut parts = Vec::with_capacity(2);
    match adjust {
        0x0000_0000 => {}
        0x0000_0010 => parts.push("adjustResize".to_string()),
        0x0000_0020 => parts.push("adjustPan".to_string()),
        0x0000_0030 => parts.push("adjustNothing".to_string()),
        other => parts.push(format!("WindowInputModeAdjust:{other:x}")),
    }
    match state {
        0x0000_0000 => {}
        0x0000_0001 => parts.push("stateUnchanged".to_string()),
        0x0000_0002 => parts.push("stateHidden".to_string()),
        0x0000_0003 => parts.push("stateAlwaysHidden".to_string()),
        0x0000_0004 => parts.push("stateVisible".to_string()),
        0x0000_0005 => parts.push("stateAlwaysVisible".to_string()),
        other => parts.push(format!("WindowInputModeState:{other:x}")),
    }
    parts.join("|")
}

fn launch_mode(value: u32) -> String {
    let name = match value {
        0x0000_0000 => "standard",
        0x0000_0001 => "singleTop",
        0x0000_0002 => "singleTask",
        0x0000_0003 => "singleInstance",
        other => return format!("LaunchMode:{other:x}"),
    };
    name.to_string()
}

fn document_launch_mode(value: u32) -> String {
    let name = match value {
        0x0000_0000 => "intoExisting",
        0x0000_0001 => "always",
        0x0000_0002 => "none",
        0x0000_0003 => "never",
        other => return format!("DocumentLaunchMode:{other:x}"),
    };
    name.to_string()
}

fn install_location(value: u32) -> String {
    let name = match value {
        0x0000_0000 => "auto",
        0x0000_0001 => "internalOnly",
        0x0000_0002 => "preferExternal",
        other => return format!("installLocation:{other:x}"),
    };
    name.to_string()
}

fn protection_level(value: u32) -> String {
    let mut value = value;
    let mut levels = Vec::with_capacity(3);
    if value & 0x10 != 0 {
        value ^= 0x10;
        levels.push("system".to_string());
    }
    if value & 0x20 != 0 {
        value ^= 0x20;
        levels.push("development".to_string());
    }
    levels.push(match value {
        0 => "normal".to_string(),
        1 => "dangerous".to_string(),
        2 => "signature".to_string(),
        3 => "signatureOrSystem".to_string(),
        other => format!("ProtectionLevel:{other:x}"),
    });
    levels.join("|")
}
