use egui::{Pos2, Rect, Vec2};

use super::layout::{DropSurface, DropTarget};
use super::options::DragOptions;
use super::resolver::{resolve_strip_target, resolve_tree_target};
use super::types::{DragSource, SubtreeLookup};

/// One raw pointer event, already hit-tested by the host for presses.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    /// Primary button went down on a draggable item whose bounds are `element_rect`.
    Press {
        pos: Pos2,
        source: DragSource,
        element_rect: Rect,
    },
    Move {
        pos: Pos2,
    },
    Release {
        pos: Pos2,
    },
    /// Pointer capture lost or the user aborted (e.g. Escape).
    Cancel,
}

/// Everything the controller reads from the window for one update.
#[derive(Clone, Copy)]
pub struct DragContext<'a> {
    pub surface: DropSurface<'a>,

    /// "Inside the panel" boundary. Releasing outside it is an external drop.
    ///
    /// This is usually larger than the tree's scroll container: a drag may leave the list and
    /// still be inside the panel. `None` disables external drops.
    pub panel_rect: Option<Rect>,

    /// Subtree lookup for the dragged item, so it can't be dropped inside itself.
    pub lookup: Option<&'a dyn SubtreeLookup>,
}

impl std::fmt::Debug for DragContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DragContext")
            .field("surface", &self.surface)
            .field("panel_rect", &self.panel_rect)
            .field("lookup", &self.lookup.is_some())
            .finish()
    }
}

impl<'a> DragContext<'a> {
    pub fn new(surface: DropSurface<'a>) -> Self {
        Self {
            surface,
            panel_rect: None,
            lookup: None,
        }
    }

    pub fn with_panel_rect(mut self, panel_rect: Rect) -> Self {
        self.panel_rect = Some(panel_rect);
        self
    }

    pub fn with_lookup(mut self, lookup: &'a dyn SubtreeLookup) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn is_outside_panel(&self, pos: Pos2) -> bool {
        self.panel_rect.is_some_and(|rect| !rect.contains(pos))
    }

    fn resolve(&self, pos: Pos2, source: DragSource) -> DropTarget {
        match self.surface {
            DropSurface::Tree(layout) => {
                resolve_tree_target(layout, pos, Some(source.item_id), self.lookup)
            }
            DropSurface::Strip(layout) => resolve_strip_target(layout, pos.x, Some(source.item_id)),
        }
    }
}

/// Where an active drag came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragOrigin {
    /// Pressed and dragged in this window.
    Local,
    /// Handed over mid-flight from another window.
    Remote,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActiveDrag {
    pub source: DragSource,
    pub origin: DragOrigin,

    /// Pointer position relative to the dragged element's top-left corner, for the overlay.
    pub grab_offset: Vec2,
    pub pointer: Pos2,
    pub target: DropTarget,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum DragPhase {
    #[default]
    Idle,

    /// Pressed, but not yet moved far enough to count as a drag.
    Potential {
        source: DragSource,
        press: Pos2,
        element_rect: Rect,
    },

    Active(ActiveDrag),
}

/// Lifecycle transitions reported by [`DragController`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DragEvent {
    /// The drag became active, with the target already resolved at `pointer`.
    Started {
        source: DragSource,
        origin: DragOrigin,
        grab_offset: Vec2,
        pointer: Pos2,
        target: DropTarget,
    },
    Moved {
        source: DragSource,
        pointer: Pos2,
        target: DropTarget,
    },
    /// Released inside the panel, with the last resolved target.
    Dropped {
        source: DragSource,
        origin: DragOrigin,
        pointer: Pos2,
        target: DropTarget,
    },
    /// Released outside the panel: detach into a new window.
    ExternalDrop {
        source: DragSource,
        origin: DragOrigin,
        pointer: Pos2,
    },
    /// The drag ended without a drop.
    Cancelled { source: DragSource },
}

/// Per-window pointer state machine: `Idle → Potential → Active → Idle`.
///
/// Feed it with [`Self::update`], passing the current layout and options each time.
#[derive(Clone, Debug, Default)]
pub struct DragController {
    phase: DragPhase,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &DragPhase {
        &self.phase
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.phase, DragPhase::Idle)
    }

    pub fn active(&self) -> Option<&ActiveDrag> {
        match &self.phase {
            DragPhase::Active(active) => Some(active),
            DragPhase::Idle | DragPhase::Potential { .. } => None,
        }
    }

    pub fn update(
        &mut self,
        event: PointerEvent,
        ctx: &DragContext<'_>,
        options: &DragOptions,
    ) -> Option<DragEvent> {
        let phase = std::mem::take(&mut self.phase);
        let (next, out) = match (phase, event) {
            (
                DragPhase::Idle,
                PointerEvent::Press {
                    pos,
                    source,
                    element_rect,
                },
            ) => (
                DragPhase::Potential {
                    source,
                    press: pos,
                    element_rect,
                },
                None,
            ),

            (
                DragPhase::Potential {
                    source,
                    press,
                    element_rect,
                },
                PointerEvent::Move { pos },
            ) => {
                let travel = ctx.surface.axis().travel(press, pos);
                if travel >= options.activation_distance {
                    let grab_offset = press - element_rect.min;
                    let target = ctx.resolve(pos, source);
                    let active = ActiveDrag {
                        source,
                        origin: DragOrigin::Local,
                        grab_offset,
                        pointer: pos,
                        target,
                    };
                    (
                        DragPhase::Active(active),
                        Some(DragEvent::Started {
                            source,
                            origin: DragOrigin::Local,
                            grab_offset,
                            pointer: pos,
                            target,
                        }),
                    )
                } else {
                    (
                        DragPhase::Potential {
                            source,
                            press,
                            element_rect,
                        },
                        None,
                    )
                }
            }

            (DragPhase::Active(mut active), PointerEvent::Move { pos }) => {
                active.pointer = pos;
                active.target = ctx.resolve(pos, active.source);
                let moved = DragEvent::Moved {
                    source: active.source,
                    pointer: pos,
                    target: active.target,
                };
                (DragPhase::Active(active), Some(moved))
            }

            (DragPhase::Active(active), PointerEvent::Release { pos }) => {
                let out = if ctx.is_outside_panel(pos) {
                    DragEvent::ExternalDrop {
                        source: active.source,
                        origin: active.origin,
                        pointer: pos,
                    }
                } else {
                    DragEvent::Dropped {
                        source: active.source,
                        origin: active.origin,
                        pointer: pos,
                        target: active.target,
                    }
                };
                (DragPhase::Idle, Some(out))
            }

            (DragPhase::Active(active), PointerEvent::Cancel) => (
                DragPhase::Idle,
                Some(DragEvent::Cancelled {
                    source: active.source,
                }),
            ),

            // A click: released (or cancelled) before the activation distance.
            (DragPhase::Potential { .. }, PointerEvent::Release { .. } | PointerEvent::Cancel) => {
                (DragPhase::Idle, None)
            }

            // Single pointer: a second press while busy is ignored, as is anything while idle.
            (phase, _) => (phase, None),
        };
        self.phase = next;
        out
    }

    /// Enter `Active` directly at `pointer`, for a drag handed over from another window.
    pub fn start_programmatic(
        &mut self,
        source: DragSource,
        pointer: Pos2,
        grab_offset: Vec2,
        ctx: &DragContext<'_>,
    ) -> DragEvent {
        let target = ctx.resolve(pointer, source);
        self.phase = DragPhase::Active(ActiveDrag {
            source,
            origin: DragOrigin::Remote,
            grab_offset,
            pointer,
            target,
        });
        DragEvent::Started {
            source,
            origin: DragOrigin::Remote,
            grab_offset,
            pointer,
            target,
        }
    }

    /// Drop whatever is in progress, from any phase. Reports `Cancelled` if a drag was active.
    pub fn cancel(&mut self) -> Option<DragEvent> {
        match std::mem::take(&mut self.phase) {
            DragPhase::Active(active) => Some(DragEvent::Cancelled {
                source: active.source,
            }),
            DragPhase::Idle | DragPhase::Potential { .. } => None,
        }
    }

    /// The broker announced the end of the session: reset immediately, never drop.
    pub fn session_ended(&mut self) -> Option<DragEvent> {
        self.cancel()
    }
}
