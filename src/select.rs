//! Frame selection.
//!
//! Pure function over the registry: no IO, no side effects. Selection can
//! legitimately come up empty, in which case the caller composes without a
//! bezel rather than failing the build.

use crate::registry::{DeviceClass, FrameDescriptor, FrameRegistry, Orientation};

/// Pick the best catalog entry for a screenshot.
///
/// An explicit `preferred` name wins, but only when its orientation matches
/// the screenshot's; a mismatched preference is silently ignored (explicit
/// intent never forces a sideways bezel). Otherwise the registry is filtered
/// to the device class and orientation, and the entry whose aspect ratio is
/// closest to the screenshot's wins, ties broken by registry order.
///
/// Desktop frames are always landscape and watch frames always portrait,
/// reflecting the fixed physical form factor of those devices.
pub fn select_frame<'r>(
    registry: &'r FrameRegistry,
    screenshot_width: u32,
    screenshot_height: u32,
    class: DeviceClass,
    preferred: Option<&str>,
) -> Option<&'r FrameDescriptor> {
    let orientation = effective_orientation(class, screenshot_width, screenshot_height);

    if let Some(name) = preferred
        && let Some(frame) = registry.by_name(name)
    {
        if frame.orientation == orientation {
            return Some(frame);
        }
        tracing::debug!(
            frame = name,
            ?orientation,
            "preferred frame ignored: orientation mismatch"
        );
    }

    let target = f64::from(screenshot_width) / f64::from(screenshot_height);
    registry
        .frames()
        .iter()
        .filter(|f| f.class == class && f.orientation == orientation)
        .min_by(|a, b| {
            let da = (a.aspect_ratio() - target).abs();
            let db = (b.aspect_ratio() - target).abs();
            // total_cmp keeps ties stable: min_by returns the earlier entry.
            da.total_cmp(&db)
        })
}

fn effective_orientation(class: DeviceClass, width: u32, height: u32) -> Orientation {
    match class {
        DeviceClass::Desktop => Orientation::Landscape,
        DeviceClass::Watch => Orientation::Portrait,
        DeviceClass::Phone | DeviceClass::Tablet => Orientation::of(width, height),
    }
}
