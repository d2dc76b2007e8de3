use serde::Serialize;
use storyline_protocol::SharedStr;

use crate::drag::DragKind;
use crate::views::lanes::EventBlock;

/// The event block under a pointer and the affordance that was grabbed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hit {
    pub event_id: SharedStr,
    pub kind: DragKind,
    pub block_index: usize,
}

/// Find the topmost block containing `(x, y)`, in lane coordinates.
///
/// The outer `handle_px` on each side of a block are resize handles. On
/// blocks narrower than three handles, each handle shrinks to a third of the
/// width so the body stays grabbable.
pub fn hit_test(blocks: &[EventBlock], x: f64, y: f64, handle_px: f64) -> Option<Hit> {
    // Later blocks are drawn on top.
    let (block_index, block) = blocks
        .iter()
        .enumerate()
        .rev()
        .find(|(_, b)| b.rect.contains(x, y))?;

    let handle = handle_px.min(block.rect.w / 3.0);
    let kind = if x < block.rect.x + handle {
        DragKind::ResizeStart
    } else if x >= block.rect.right() - handle {
        DragKind::ResizeEnd
    } else {
        DragKind::Move
    };

    Some(Hit {
        event_id: block.event_id.clone(),
        kind,
        block_index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::lanes::{LaneIndex, LaneMetrics, layout_events};
    use storyline_protocol::{Character, TimeRange, TimelineEvent};

    fn blocks() -> Vec<EventBlock> {
        let lanes = LaneIndex::from_characters(&[
            Character::new("a", "Ada", 0),
            Character::new("b", "Bo", 1),
            Character::new("c", "Cy", 2),
        ]);
        let events = vec![
            TimelineEvent::new("wide", "Wide", TimeRange::new(100.0, 300.0), &["a", "c"]),
            TimelineEvent::new("over", "Over", TimeRange::new(250.0, 400.0), &["a"]),
            TimelineEvent::new("tiny", "Tiny", TimeRange::new(500.0, 509.0), &["b"]),
        ];
        layout_events(&lanes, &events, 1.0, 0.0, &LaneMetrics::default())
    }

    #[test]
    fn classifies_edges_and_body() {
        let blocks = blocks();
        let hit = |x, y| hit_test(&blocks, x, y, 6.0).map(|h| (h.event_id.to_string(), h.kind));

        assert_eq!(hit(150.0, 10.0), Some(("wide".into(), DragKind::Move)));
        assert_eq!(hit(101.0, 10.0), Some(("wide".into(), DragKind::ResizeStart)));
        assert_eq!(hit(298.0, 170.0), Some(("wide".into(), DragKind::ResizeEnd)));
        assert_eq!(hit(150.0, 100.0), None);
        assert_eq!(hit(50.0, 10.0), None);
    }

    #[test]
    fn split_blocks_share_the_event() {
        let blocks = blocks();
        let top = hit_test(&blocks, 150.0, 10.0, 6.0);
        let bottom = hit_test(&blocks, 150.0, 170.0, 6.0);
        assert_eq!(top.as_ref().map(|h| &h.event_id), bottom.as_ref().map(|h| &h.event_id));
        assert_ne!(top.map(|h| h.block_index), bottom.map(|h| h.block_index));
    }

    #[test]
    fn topmost_block_wins() {
        let blocks = blocks();
        let hit = hit_test(&blocks, 280.0, 10.0, 6.0);
        assert_eq!(hit.map(|h| h.event_id), Some("over".into()));
    }

    #[test]
    fn narrow_blocks_keep_a_body() {
        let blocks = blocks();
        // "tiny" is widened to the 20px minimum: handles shrink to ~6.67px.
        let kind = |x| hit_test(&blocks, x, 100.0, 12.0).map(|h| h.kind);
        assert_eq!(kind(502.0), Some(DragKind::ResizeStart));
        assert_eq!(kind(510.0), Some(DragKind::Move));
        assert_eq!(kind(518.0), Some(DragKind::ResizeEnd));
    }
}
