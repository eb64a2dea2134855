//! Translating raw egui input into drag pointer events.

use egui::{Event, PointerButton, Pos2, Rect};

use super::controller::PointerEvent;
use super::types::DragSource;

/// Primary-button pointer input, taken from one frame's [`egui::Event`]s.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerInput {
    Pressed(Pos2),
    Moved(Pos2),
    Released(Pos2),

    /// The pointer left the window.
    Left,
}

/// The primary-button pointer input in `events`, in order.
pub fn pointer_inputs(events: &[Event]) -> Vec<PointerInput> {
    events
        .iter()
        .filter_map(|event| match *event {
            Event::PointerMoved(pos) => Some(PointerInput::Moved(pos)),
            Event::PointerButton {
                pos,
                button: PointerButton::Primary,
                pressed,
                ..
            } => Some(if pressed {
                PointerInput::Pressed(pos)
            } else {
                PointerInput::Released(pos)
            }),
            Event::PointerGone => Some(PointerInput::Left),
            _ => None,
        })
        .collect()
}

impl PointerInput {
    /// As a [`PointerEvent`]. A press only counts if `hit` finds a draggable item under it.
    ///
    /// Leaving the window is not a cancel: the drag may continue in another window.
    pub fn to_pointer_event(
        self,
        hit: impl FnOnce(Pos2) -> Option<(DragSource, Rect)>,
    ) -> Option<PointerEvent> {
        match self {
            Self::Pressed(pos) => hit(pos).map(|(source, element_rect)| PointerEvent::Press {
                pos,
                source,
                element_rect,
            }),
            Self::Moved(pos) => Some(PointerEvent::Move { pos }),
            Self::Released(pos) => Some(PointerEvent::Release { pos }),
            Self::Left => None,
        }
    }
}
