use crate::frame::frame_model::FrameOffset;
use crate::overlay::overlay_model::{FocusedFieldData, OverlayPosition};

/// Share of the field height left as margin around the button, by field height.
pub fn button_offset_factor(field_height: f64) -> f64 {
    if field_height >= 50.0 {
        0.47
    } else if field_height >= 35.0 {
        0.42
    } else {
        0.37
    }
}

fn offset_contribution(offset: Option<&FrameOffset>) -> (f64, f64) {
    offset.map(|o| (o.top, o.left)).unwrap_or((0.0, 0.0))
}

/// Square button sitting inside the right edge of the focused field.
pub fn button_position(field: &FocusedFieldData, offset: Option<&FrameOffset>) -> OverlayPosition {
    let (frame_top, frame_left) = offset_contribution(offset);
    let rect = field.focused_field_rects;
    let styles = field.focused_field_styles;

    let element_offset = rect.height * button_offset_factor(rect.height);
    let element_height = rect.height - element_offset;
    let top = frame_top + rect.top + element_offset / 2.0;

    let left = if styles.padding_right > styles.padding_left {
        frame_left + rect.left + rect.width - rect.height - (styles.padding_right - element_offset + 2.0)
    } else {
        frame_left + rect.left + rect.width - rect.height + element_offset / 2.0
    };

    let size = element_height.round() as i64;
    OverlayPosition {
        top: top.round() as i64,
        left: left.round() as i64,
        width: size,
        height: Some(size),
    }
}

/// List anchored under the focused field, as wide as the field.
pub fn list_position(field: &FocusedFieldData, offset: Option<&FrameOffset>) -> OverlayPosition {
    let (frame_top, frame_left) = offset_contribution(offset);
    let rect = field.focused_field_rects;

    OverlayPosition {
        top: (frame_top + rect.top + rect.height).round() as i64,
        left: (frame_left + rect.left).round() as i64,
        width: rect.width.round() as i64,
        height: None,
    }
}
