use serde::{Deserialize, Serialize};

/// Semantic color tokens resolved by the renderer's active theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThemeToken {
    Background,
    Border,

    // Ruler
    RulerBackground,
    RulerTick,
    RulerText,
    Gridline,

    // Character lanes
    LaneBackground,
    LaneBackgroundAlt,
    LaneBorder,
    LaneHeaderText,

    // Event blocks
    EventFill,
    EventMultiFill,
    EventBorder,
    EventText,
    EventSelected,
    DragPreview,
    ResizeHandle,

    TextPrimary,
    TextMuted,
}
