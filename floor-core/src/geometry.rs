//! Geometry Engine
//!
//! Pure placement math for the floor plan. Everything here is a total
//! function over numeric input: proposals outside the allowed range are
//! clamped, never rejected.
//!
//! - [`clamp_position`]: keep a footprint inside its container
//! - [`clamp_child`]: same, leaving the section margin free
//! - [`compute_minimum_bounds`]: smallest container that clips no child
//! - [`clamp_size`]: apply that minimum to a resize proposal

use shared::models::{BarOrientation, Placeable, PlaceableKind, Position, Section, Size};

/// Table footprint (square)
pub const TABLE_FOOTPRINT: Size = Size::new(96.0, 96.0);
/// Bar footprint, horizontal orientation (vertical swaps the axes)
pub const BAR_FOOTPRINT: Size = Size::new(192.0, 72.0);
/// Gap kept between the outermost child and the section edge
pub const CHILD_MARGIN: f64 = 16.0;
/// Floor for any section, even an empty one
pub const MIN_SECTION_SIZE: Size = Size::new(160.0, 120.0);
/// Size given to newly created sections
pub const DEFAULT_SECTION_SIZE: Size = Size::new(480.0, 320.0);
/// Default canvas the sections live on
pub const DEFAULT_CANVAS: Size = Size::new(2400.0, 1600.0);

/// Footprint of a placeable, fixed by kind and orientation
pub fn footprint(kind: &PlaceableKind) -> Size {
    match kind {
        PlaceableKind::Table => TABLE_FOOTPRINT,
        PlaceableKind::Bar {
            orientation: BarOrientation::Horizontal,
        } => BAR_FOOTPRINT,
        PlaceableKind::Bar {
            orientation: BarOrientation::Vertical,
        } => Size::new(BAR_FOOTPRINT.height, BAR_FOOTPRINT.width),
    }
}

/// Clamp one axis into `[0, max]`. NaN collapses to 0.
#[inline]
fn clamp_axis(value: f64, max: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, max.max(0.0))
}

/// Constrain a proposed top-left corner so the footprint stays inside the
/// container: `0 ≤ x ≤ container.width − footprint.width`, same for y.
///
/// A footprint wider than its container pins to 0 on that axis.
pub fn clamp_position(container: Size, footprint: Size, proposed: Position) -> Position {
    Position {
        x: clamp_axis(proposed.x, container.width - footprint.width),
        y: clamp_axis(proposed.y, container.height - footprint.height),
    }
}

/// [`clamp_position`] for a placeable inside its section: the far edges
/// keep [`CHILD_MARGIN`] free, so a clamped child never pushes the section
/// below its own [`compute_minimum_bounds`].
pub fn clamp_child(section: Size, footprint: Size, proposed: Position) -> Position {
    let inner = Size::new(section.width - CHILD_MARGIN, section.height - CHILD_MARGIN);
    clamp_position(inner, footprint, proposed)
}

/// Smallest container size that clips none of the children.
///
/// Each child is `(position, footprint)`; the result covers the furthest
/// child edge plus [`CHILD_MARGIN`] and never drops below
/// [`MIN_SECTION_SIZE`].
pub fn compute_minimum_bounds<I>(children: I) -> Size
where
    I: IntoIterator<Item = (Position, Size)>,
{
    children
        .into_iter()
        .fold(MIN_SECTION_SIZE, |acc, (pos, size)| Size {
            width: acc.width.max(pos.x + size.width + CHILD_MARGIN),
            height: acc.height.max(pos.y + size.height + CHILD_MARGIN),
        })
}

/// Minimum bounds implied by the placeables currently inside a section
pub fn section_minimum_bounds(section: &Section) -> Size {
    compute_minimum_bounds(section.placeables().map(placement))
}

/// `(position, footprint)` of a placeable
pub fn placement(placeable: &Placeable) -> (Position, Size) {
    (placeable.position, footprint(&placeable.kind))
}

/// Raise a proposed size to at least `minimum` on both axes
pub fn clamp_size(proposed: Size, minimum: Size) -> Size {
    let axis = |value: f64, min: f64| if value.is_nan() { min } else { value.max(min) };
    Size {
        width: axis(proposed.width, minimum.width),
        height: axis(proposed.height, minimum.height),
    }
}
