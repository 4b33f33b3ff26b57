// ============================================================================
// DRAG SESSION: one drag-and-drop gesture from pick-up to drop
// ============================================================================
//
//   Idle ──start──▶ Dragging ──begin_drop──▶ Dropping ──finish_drop──▶ Idle
//                    │  ▲ hover / leave                 (stale tokens ignored)
//                    └──┴──end──▶ Idle
//
// The session only tracks ephemeral state. The mutation itself is carried
// out by the owner (see `Project::drop_on`) from the returned `DropPlan`.

use crate::components::drop_target::{DropTarget, DropTargetTracker};
use crate::components::pool::PoolImage;
use crate::layout::{DEFAULT_RATIO, ElementId, GridItem, ImageDimensions, ItemCoords};

/// Where the dragged image was picked up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragOrigin {
    Pool,
    /// An already placed item. `item_id` guards against the tree changing
    /// underneath the gesture.
    Grid { coords: ItemCoords, item_id: ElementId },
}

/// Payload carried through a drag gesture.
#[derive(Clone, Debug, PartialEq)]
pub struct DraggedImage {
    pub src: String,
    pub dimensions: ImageDimensions,
    pub caption: String,
    pub flex: f64,
    pub file_name: Option<String>,
    pub origin: DragOrigin,
}

impl DraggedImage {
    pub fn from_pool(image: &PoolImage) -> Self {
        Self {
            src: image.src.clone(),
            dimensions: image.dimensions,
            caption: image.caption.clone(),
            flex: DEFAULT_RATIO,
            file_name: None,
            origin: DragOrigin::Pool,
        }
    }

    pub fn from_grid(item: &GridItem, coords: ItemCoords) -> Self {
        Self {
            src: item.src.clone(),
            dimensions: item.dimensions,
            caption: item.caption.clone(),
            flex: item.flex,
            file_name: item.file_name.clone(),
            origin: DragOrigin::Grid {
                coords,
                item_id: item.id,
            },
        }
    }

    pub fn is_from_pool(&self) -> bool {
        self.origin == DragOrigin::Pool
    }

    /// A new grid item built from this payload. The id is replaced again on
    /// insertion.
    pub fn to_grid_item(&self) -> GridItem {
        GridItem {
            id: ElementId::new(),
            src: self.src.clone(),
            dimensions: self.dimensions,
            caption: self.caption.clone(),
            flex: self.flex,
            file_name: self.file_name.clone(),
        }
    }
}

/// Which kind of zone received the drop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropZone {
    /// A registered zone; the hovered drop target decides the insertion.
    Target,
    /// The empty canvas / panel background: always a new row group.
    EmptyCanvas,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Dragging,
    /// A drop was accepted and waits for its reachability result.
    Dropping,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropRejected {
    /// Nothing is being dragged.
    NoDrag,
    /// Another drop is still waiting for its reachability result.
    InFlight,
    /// The drop landed on a target zone but no target is hovered.
    NoTarget,
}

/// Token for an accepted drop. Hand it back to [`DragSession::finish_drop`]
/// together with the reachability result.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingDrop {
    generation: u64,
    pub image: DraggedImage,
    pub target: DropTarget,
    pub zone: DropZone,
}

impl PendingDrop {
    /// Pool images must load before the drop is honored.
    pub fn needs_reachability_check(&self) -> bool {
        self.image.is_from_pool()
    }
}

/// What the owner should apply to the layout.
#[derive(Clone, Debug, PartialEq)]
pub struct DropPlan {
    pub image: DraggedImage,
    pub target: DropTarget,
    pub zone: DropZone,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DropResolution {
    /// The token does not belong to the drop in flight.
    Stale,
    /// The source image failed its reachability check.
    Unreachable,
    Apply(DropPlan),
}

#[derive(Debug, Default)]
pub struct DragSession {
    dragged: Option<DraggedImage>,
    targets: DropTargetTracker,
    in_flight: Option<u64>,
    generation: u64,
}

impl DragSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        if self.in_flight.is_some() {
            DragState::Dropping
        } else if self.dragged.is_some() {
            DragState::Dragging
        } else {
            DragState::Idle
        }
    }

    pub fn dragged(&self) -> Option<&DraggedImage> {
        self.dragged.as_ref()
    }

    pub fn drop_target(&self) -> Option<DropTarget> {
        self.targets.current()
    }

    pub fn targets(&self) -> &DropTargetTracker {
        &self.targets
    }

    pub fn start_from_pool(&mut self, image: &PoolImage) -> bool {
        self.start(DraggedImage::from_pool(image))
    }

    pub fn start_from_grid(&mut self, item: &GridItem, coords: ItemCoords) -> bool {
        self.start(DraggedImage::from_grid(item, coords))
    }

    fn start(&mut self, image: DraggedImage) -> bool {
        if self.in_flight.is_some() {
            log::debug!("drag start ignored: a drop is still pending");
            return false;
        }
        self.dragged = Some(image);
        self.targets.leave();
        true
    }

    /// Pointer over a registered zone. Replaces any previous target.
    pub fn hover(&mut self, target: DropTarget) {
        if self.state() == DragState::Dragging {
            self.targets.hover(target);
        }
    }

    /// Pointer left a zone. The dragged payload stays: the pointer may enter
    /// another zone before the drop.
    pub fn leave(&mut self) {
        if self.state() == DragState::Dragging {
            self.targets.leave();
        }
    }

    /// Gesture ended outside any zone (or was abandoned). No mutation.
    pub fn end(&mut self) {
        if self.in_flight.is_none() {
            self.reset();
        }
    }

    /// Accept a drop. While the returned token is pending, further drops are
    /// rejected.
    pub fn begin_drop(&mut self, zone: DropZone) -> Result<PendingDrop, DropRejected> {
        if self.in_flight.is_some() {
            return Err(DropRejected::InFlight);
        }
        let image = self.dragged.clone().ok_or(DropRejected::NoDrag)?;
        let target = match zone {
            DropZone::EmptyCanvas => DropTarget::new_group(),
            // The highlight goes away as soon as the drop is accepted.
            DropZone::Target => match self.targets.take() {
                Some(t) => t,
                None => {
                    self.reset();
                    return Err(DropRejected::NoTarget);
                }
            },
        };

        self.generation += 1;
        self.in_flight = Some(self.generation);
        Ok(PendingDrop {
            generation: self.generation,
            image,
            target,
            zone,
        })
    }

    /// Complete a drop with its reachability result. Either way the gesture
    /// ends; only a reachable source yields a plan.
    pub fn finish_drop(&mut self, pending: PendingDrop, reachable: bool) -> DropResolution {
        if self.in_flight != Some(pending.generation) {
            return DropResolution::Stale;
        }
        self.reset();
        if !reachable {
            return DropResolution::Unreachable;
        }
        DropResolution::Apply(DropPlan {
            image: pending.image,
            target: pending.target,
            zone: pending.zone,
        })
    }

    fn reset(&mut self) {
        self.dragged = None;
        self.targets.leave();
        self.in_flight = None;
    }
}
