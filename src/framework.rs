use std::collections::HashMap;

use once_cell::sync::Lazy;

const SYS_STYLE_ID_START: u32 = 0x0103_0000;
const SYS_STYLE_ID_END: u32 = 0x0103_1000;

/// Framework style names keyed by resource id, loaded once from the
/// bundled dictionary. Lines are `name = decimal-id`; blank or malformed
/// lines are skipped.
static SYS_STYLES: Lazy<HashMap<u32, &'static str>> = Lazy::new(|| {
    let mut styles = HashMap::new();
    for line in include_str!("../assets/r_styles.ini").lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some((name, id)) = line.split_once('=') {
            if let Ok(id) = id.trim().parse::<u32>() {
                styles.insert(id, name.trim());
            }
        }
    }
    styles
});

/// Resolves framework style ids to `@android:style/...` references. Ids
/// inside the system style range but missing from the dictionary keep the
/// hex id so the reference stays recognisable.
pub(crate) fn resolve_android_style(res_id: u32) -> Option<String> {
    if res_id <= SYS_STYLE_ID_START || res_id >= SYS_STYLE_ID_END {
        return None;
    }
    Some(match SYS_STYLES.get(&res_id) {
        Some(name) => format!("@android:style/{name}"),
        None => format!("@android:style/0x{res_id:08x}"),
    })
}
