//! Layout Store
//!
//! [`FloorPlan`] is the single owned aggregate for the venue layout:
//! Sections → {Tables, Bars} → Accounts → AccountItems.
//!
//! The section tree sits behind an `Arc`. Every mutation resolves its target
//! by id on the shared tree first and only then calls `Arc::make_mut`, so a
//! mutation addressed at a missing node never copies anything, and a
//! [`FloorPlan::snapshot`] handed to the save worker stays untouched while
//! the session keeps editing.
//!
//! Addressing a node that does not exist is a no-op (`None` / `false`),
//! never an error: the UI may race a deletion with an in-flight action.

use std::sync::Arc;

use shared::models::{
    Account, AccountItem, BarOrientation, Placeable, PlaceableKind, Position, Section, Size,
    Status,
};
use tracing::debug;

use crate::accounts::money;
use crate::geometry::{self, CHILD_MARGIN, DEFAULT_CANVAS, DEFAULT_SECTION_SIZE};

/// Which ordered list of a section a placeable lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlaceableList {
    Tables,
    Bars,
}

/// Index path to a placeable, valid only until the next structural edit
#[derive(Debug, Clone, Copy)]
struct PlaceablePath {
    section: usize,
    list: PlaceableList,
    index: usize,
}

fn list_of(section: &Section, list: PlaceableList) -> &Vec<Placeable> {
    match list {
        PlaceableList::Tables => &section.tables,
        PlaceableList::Bars => &section.bars,
    }
}

fn list_of_mut(section: &mut Section, list: PlaceableList) -> &mut Vec<Placeable> {
    match list {
        PlaceableList::Tables => &mut section.tables,
        PlaceableList::Bars => &mut section.bars,
    }
}

fn list_for(kind: &PlaceableKind) -> PlaceableList {
    if kind.is_bar() {
        PlaceableList::Bars
    } else {
        PlaceableList::Tables
    }
}

/// Venue layout aggregate (楼面布局)
#[derive(Debug, Clone)]
pub struct FloorPlan {
    sections: Arc<Vec<Section>>,
    canvas: Size,
}

impl Default for FloorPlan {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl FloorPlan {
    pub fn new(sections: Vec<Section>) -> Self {
        Self::with_canvas(sections, DEFAULT_CANVAS)
    }

    pub fn with_canvas(sections: Vec<Section>, canvas: Size) -> Self {
        Self {
            sections: Arc::new(sections),
            canvas,
        }
    }

    /// Build a plan from rehydrated sections, repairing dangling
    /// current-account references left behind by older saves.
    pub fn rehydrate(mut sections: Vec<Section>) -> Self {
        for section in &mut sections {
            for placeable in section.tables.iter_mut().chain(section.bars.iter_mut()) {
                if !placeable.current_account_is_valid() {
                    tracing::warn!(
                        placeable_id = %placeable.id,
                        current_account_id = ?placeable.current_account_id,
                        "Dangling current account reference, resetting"
                    );
                    placeable.current_account_id = placeable.accounts.last().map(|a| a.id.clone());
                }
            }
        }
        Self::new(sections)
    }

    pub fn canvas(&self) -> Size {
        self.canvas
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Cheap immutable snapshot of the current tree (shares storage until
    /// the next mutation)
    pub fn snapshot(&self) -> Arc<Vec<Section>> {
        Arc::clone(&self.sections)
    }

    pub fn into_sections(self) -> Vec<Section> {
        Arc::unwrap_or_clone(self.sections)
    }

    // ========== Lookup ==========

    pub fn section(&self, section_id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == section_id)
    }

    fn section_index(&self, section_id: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.id == section_id)
    }

    fn locate(&self, placeable_id: &str) -> Option<PlaceablePath> {
        self.sections.iter().enumerate().find_map(|(si, section)| {
            [PlaceableList::Tables, PlaceableList::Bars]
                .into_iter()
                .find_map(|list| {
                    list_of(section, list)
                        .iter()
                        .position(|p| p.id == placeable_id)
                        .map(|index| PlaceablePath {
                            section: si,
                            list,
                            index,
                        })
                })
        })
    }

    pub fn placeable(&self, placeable_id: &str) -> Option<&Placeable> {
        self.sections
            .iter()
            .find_map(|s| s.find_placeable(placeable_id))
    }

    /// Section that contains the given placeable
    pub fn section_of(&self, placeable_id: &str) -> Option<&Section> {
        self.locate(placeable_id)
            .map(|path| &self.sections[path.section])
    }

    pub fn account(&self, placeable_id: &str, account_id: &str) -> Option<&Account> {
        self.placeable(placeable_id)?.account(account_id)
    }

    /// All placeables in layout order (section order, tables before bars)
    pub fn placeables(&self) -> impl Iterator<Item = &Placeable> {
        self.sections.iter().flat_map(|s| s.placeables())
    }

    // ========== Copy-on-write mutation ==========

    /// Apply `updater` to one section. Siblings are left untouched.
    pub fn update_section<R>(
        &mut self,
        section_id: &str,
        updater: impl FnOnce(&mut Section) -> R,
    ) -> Option<R> {
        let Some(index) = self.section_index(section_id) else {
            debug!(section_id, "Section not found, mutation skipped");
            return None;
        };
        let sections = Arc::make_mut(&mut self.sections);
        Some(updater(&mut sections[index]))
    }

    /// Apply `updater` to one table or bar
    pub fn update_placeable<R>(
        &mut self,
        placeable_id: &str,
        updater: impl FnOnce(&mut Placeable) -> R,
    ) -> Option<R> {
        let Some(path) = self.locate(placeable_id) else {
            debug!(placeable_id, "Placeable not found, mutation skipped");
            return None;
        };
        let sections = Arc::make_mut(&mut self.sections);
        let placeable = &mut list_of_mut(&mut sections[path.section], path.list)[path.index];
        Some(updater(placeable))
    }

    /// Apply `updater` to one account
    pub fn update_account<R>(
        &mut self,
        placeable_id: &str,
        account_id: &str,
        updater: impl FnOnce(&mut Account) -> R,
    ) -> Option<R> {
        if self.account(placeable_id, account_id).is_none() {
            debug!(placeable_id, account_id, "Account not found, mutation skipped");
            return None;
        }
        self.update_placeable(placeable_id, |p| p.account_mut(account_id).map(updater))
            .flatten()
    }

    /// Apply `updater` to one account item. The owning account's total is
    /// recomputed afterwards, whatever the updater did.
    pub fn update_item<R>(
        &mut self,
        placeable_id: &str,
        account_id: &str,
        item_id: &str,
        updater: impl FnOnce(&mut AccountItem) -> R,
    ) -> Option<R> {
        let exists = self
            .account(placeable_id, account_id)
            .is_some_and(|a| a.item(item_id).is_some());
        if !exists {
            debug!(placeable_id, account_id, item_id, "Item not found, mutation skipped");
            return None;
        }
        self.update_account(placeable_id, account_id, |account| {
            let result = account
                .items
                .iter_mut()
                .find(|i| i.id == item_id)
                .map(updater);
            money::recalculate_account(account);
            result
        })
        .flatten()
    }

    // ========== Sections ==========

    /// Append a section, clamped onto the canvas. Returns its id.
    pub fn add_section(&mut self, name: impl Into<String>, position: Position) -> String {
        let position = geometry::clamp_position(self.canvas, DEFAULT_SECTION_SIZE, position);
        let section = Section::new(name, position, DEFAULT_SECTION_SIZE);
        let id = section.id.clone();
        Arc::make_mut(&mut self.sections).push(section);
        id
    }

    /// Remove a section with every table, bar and account inside it.
    /// Open accounts are dropped without producing sales.
    pub fn remove_section(&mut self, section_id: &str) -> Option<Section> {
        let index = self.section_index(section_id)?;
        let removed = Arc::make_mut(&mut self.sections).remove(index);
        self.renumber();
        Some(removed)
    }

    pub fn rename_section(&mut self, section_id: &str, name: impl Into<String>) -> bool {
        let name = name.into();
        self.update_section(section_id, |s| s.name = name).is_some()
    }

    /// Move a section on the canvas. Returns the clamped position.
    pub fn move_section(&mut self, section_id: &str, proposed: Position) -> Option<Position> {
        let canvas = self.canvas;
        self.update_section(section_id, |s| {
            s.position = geometry::clamp_position(canvas, s.size, proposed);
            s.position
        })
    }

    /// Resize a section, never below the bounds of its current children.
    /// Returns the applied size.
    pub fn resize_section(&mut self, section_id: &str, proposed: Size) -> Option<Size> {
        self.update_section(section_id, |s| {
            s.size = geometry::clamp_size(proposed, geometry::section_minimum_bounds(s));
            s.size
        })
    }

    // ========== Tables / Bars ==========

    pub fn add_table(&mut self, section_id: &str) -> Option<String> {
        self.add_placeable(section_id, PlaceableKind::Table)
    }

    pub fn add_bar(&mut self, section_id: &str, orientation: BarOrientation) -> Option<String> {
        self.add_placeable(section_id, PlaceableKind::Bar { orientation })
    }

    fn add_placeable(&mut self, section_id: &str, kind: PlaceableKind) -> Option<String> {
        let index = self.section_index(section_id)?;
        let sections = Arc::make_mut(&mut self.sections);
        let section = &mut sections[index];

        // Staggered along the top edge, clamped inside the section
        let fp = geometry::footprint(&kind);
        let siblings = list_of(section, list_for(&kind)).len() as f64;
        let proposed = Position::new(
            CHILD_MARGIN + siblings * (fp.width + CHILD_MARGIN),
            CHILD_MARGIN,
        );
        let position = geometry::clamp_child(section.size, fp, proposed);

        let placeable = Placeable::new(String::new(), kind, position);
        let id = placeable.id.clone();
        list_of_mut(section, list_for(&kind)).push(placeable);
        // Grow the section if the footprint does not fit
        section.size = geometry::clamp_size(section.size, geometry::section_minimum_bounds(section));

        self.renumber();
        Some(id)
    }

    /// Remove a table or bar (and its accounts, without sales). Remaining
    /// placeables of the same kind are renumbered to stay contiguous.
    pub fn remove_placeable(&mut self, placeable_id: &str) -> Option<Placeable> {
        let path = self.locate(placeable_id)?;
        let sections = Arc::make_mut(&mut self.sections);
        let removed = list_of_mut(&mut sections[path.section], path.list).remove(path.index);
        self.renumber();
        Some(removed)
    }

    /// Move a table or bar inside its section. Returns the clamped position.
    pub fn move_placeable(&mut self, placeable_id: &str, proposed: Position) -> Option<Position> {
        let container = self.section_of(placeable_id)?.size;
        self.update_placeable(placeable_id, |p| {
            p.position = geometry::clamp_child(container, geometry::footprint(&p.kind), proposed);
            p.position
        })
    }

    /// Change a bar's orientation. The bar is re-clamped for its new
    /// footprint and the section grows if needed. Tables are ignored.
    pub fn set_bar_orientation(&mut self, placeable_id: &str, orientation: BarOrientation) -> bool {
        let Some(path) = self.locate(placeable_id) else {
            return false;
        };
        if path.list != PlaceableList::Bars {
            return false;
        }
        let sections = Arc::make_mut(&mut self.sections);
        let section = &mut sections[path.section];
        let container = section.size;
        let bar = &mut section.bars[path.index];
        bar.kind = PlaceableKind::Bar { orientation };
        bar.position = geometry::clamp_child(container, geometry::footprint(&bar.kind), bar.position);
        section.size = geometry::clamp_size(section.size, geometry::section_minimum_bounds(section));
        true
    }

    /// Manual status override (also used by reservation signals)
    pub fn set_status(&mut self, placeable_id: &str, status: Status) -> bool {
        self.update_placeable(placeable_id, |p| p.status = status)
            .is_some()
    }

    /// Rename every table "Table 1..N" and every bar "Bar 1..N" in layout
    /// order. Only touches names that actually change.
    fn renumber(&mut self) {
        let needs_rename = |sections: &[Section]| {
            let mut tables = 0;
            let mut bars = 0;
            sections.iter().any(|s| {
                s.tables.iter().any(|t| {
                    tables += 1;
                    t.name != format!("{} {tables}", t.kind.label())
                }) || s.bars.iter().any(|b| {
                    bars += 1;
                    b.name != format!("{} {bars}", b.kind.label())
                })
            })
        };
        if !needs_rename(&self.sections) {
            return;
        }

        let mut tables = 0;
        let mut bars = 0;
        for section in Arc::make_mut(&mut self.sections) {
            for table in &mut section.tables {
                tables += 1;
                table.name = format!("{} {tables}", table.kind.label());
            }
            for bar in &mut section.bars {
                bars += 1;
                bar.name = format!("{} {bars}", bar.kind.label());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::util;

    fn plan_with_section() -> (FloorPlan, String) {
        let mut plan = FloorPlan::default();
        let section_id = plan.add_section("Main Hall", Position::new(0.0, 0.0));
        (plan, section_id)
    }

    fn item(name: &str, quantity: u32, price: Decimal) -> AccountItem {
        AccountItem {
            id: util::new_id(),
            product_name: name.to_string(),
            quantity,
            unit_price: price,
            total: price * Decimal::from(quantity),
            timestamp: util::now(),
        }
    }

    #[test]
    fn test_tables_are_numbered_sequentially() {
        let (mut plan, section_id) = plan_with_section();
        for _ in 0..3 {
            plan.add_table(&section_id).unwrap();
        }
        let names: Vec<_> = plan.section(&section_id).unwrap().tables.iter().map(|t| t.name.clone()).collect();
        assert_eq!(names, ["Table 1", "Table 2", "Table 3"]);
    }

    #[test]
    fn test_removing_a_table_renumbers_the_rest() {
        let (mut plan, section_id) = plan_with_section();
        let ids: Vec<_> = (0..3).map(|_| plan.add_table(&section_id).unwrap()).collect();

        let removed = plan.remove_placeable(&ids[0]).unwrap();
        assert_eq!(removed.name, "Table 1");

        assert_eq!(plan.placeable(&ids[1]).unwrap().name, "Table 1");
        assert_eq!(plan.placeable(&ids[2]).unwrap().name, "Table 2");
    }

    #[test]
    fn test_numbering_spans_sections() {
        let mut plan = FloorPlan::default();
        let hall = plan.add_section("Hall", Position::new(0.0, 0.0));
        let terrace = plan.add_section("Terrace", Position::new(600.0, 0.0));
        let t1 = plan.add_table(&hall).unwrap();
        let t2 = plan.add_table(&terrace).unwrap();
        let b1 = plan.add_bar(&terrace, BarOrientation::Horizontal).unwrap();

        assert_eq!(plan.placeable(&t1).unwrap().name, "Table 1");
        assert_eq!(plan.placeable(&t2).unwrap().name, "Table 2");
        assert_eq!(plan.placeable(&b1).unwrap().name, "Bar 1");

        plan.remove_section(&hall).unwrap();
        assert_eq!(plan.placeable(&t2).unwrap().name, "Table 1");
        assert!(plan.placeable(&t1).is_none());
    }

    #[test]
    fn test_missing_targets_are_noops() {
        let (mut plan, _) = plan_with_section();
        let before = plan.snapshot();

        assert!(plan.add_table("nope").is_none());
        assert!(plan.move_placeable("nope", Position::new(1.0, 1.0)).is_none());
        assert!(plan.resize_section("nope", Size::new(900.0, 900.0)).is_none());
        assert!(!plan.set_status("nope", Status::Occupied));
        assert!(plan.update_account("nope", "acc", |_| ()).is_none());

        // Nothing was copied: the snapshot still shares storage
        assert!(Arc::ptr_eq(&before, &plan.snapshot()));
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_edits() {
        let (mut plan, section_id) = plan_with_section();
        let snapshot = plan.snapshot();
        plan.rename_section(&section_id, "Patio");

        assert_eq!(snapshot[0].name, "Main Hall");
        assert_eq!(plan.section(&section_id).unwrap().name, "Patio");
    }

    #[test]
    fn test_update_leaves_siblings_untouched() {
        let (mut plan, section_id) = plan_with_section();
        let a = plan.add_table(&section_id).unwrap();
        let b = plan.add_table(&section_id).unwrap();
        let b_before = plan.placeable(&b).unwrap().clone();

        plan.set_status(&a, Status::Reserved);

        assert_eq!(plan.placeable(&a).unwrap().status, Status::Reserved);
        assert_eq!(plan.placeable(&b).unwrap(), &b_before);
    }

    #[test]
    fn test_move_placeable_is_clamped_to_section() {
        let (mut plan, section_id) = plan_with_section();
        let t = plan.add_table(&section_id).unwrap();

        let pos = plan.move_placeable(&t, Position::new(-50.0, 9_999.0)).unwrap();
        assert_eq!(pos, Position::new(0.0, DEFAULT_SECTION_SIZE.height - 96.0 - CHILD_MARGIN));
    }

    #[test]
    fn test_edge_move_keeps_section_at_minimum() {
        let (mut plan, section_id) = plan_with_section();
        let t = plan.add_table(&section_id).unwrap();
        plan.move_placeable(&t, Position::new(9_999.0, 9_999.0)).unwrap();

        let section = plan.section(&section_id).unwrap();
        assert_eq!(geometry::section_minimum_bounds(section), DEFAULT_SECTION_SIZE);
        // Re-applying the current size changes nothing
        let size = plan.resize_section(&section_id, DEFAULT_SECTION_SIZE).unwrap();
        assert_eq!(size, DEFAULT_SECTION_SIZE);
    }

    #[test]
    fn test_resize_section_respects_children() {
        let (mut plan, section_id) = plan_with_section();
        let t = plan.add_table(&section_id).unwrap();
        plan.move_placeable(&t, Position::new(300.0, 200.0)).unwrap();

        let size = plan.resize_section(&section_id, Size::new(10.0, 10.0)).unwrap();
        assert_eq!(size, Size::new(300.0 + 96.0 + CHILD_MARGIN, 200.0 + 96.0 + CHILD_MARGIN));

        let size = plan.resize_section(&section_id, Size::new(1000.0, 800.0)).unwrap();
        assert_eq!(size, Size::new(1000.0, 800.0));
    }

    #[test]
    fn test_bar_rotation_reclamps_and_grows() {
        let (mut plan, section_id) = plan_with_section();
        plan.resize_section(&section_id, Size::new(240.0, 120.0)).unwrap();
        let bar = plan.add_bar(&section_id, BarOrientation::Horizontal).unwrap();

        assert!(plan.set_bar_orientation(&bar, BarOrientation::Vertical));

        let section = plan.section(&section_id).unwrap();
        let placed = section.find_placeable(&bar).unwrap();
        assert_eq!(geometry::footprint(&placed.kind), Size::new(72.0, 192.0));
        assert!(section.size.height >= placed.position.y + 192.0 + CHILD_MARGIN);
    }

    #[test]
    fn test_set_orientation_ignores_tables() {
        let (mut plan, section_id) = plan_with_section();
        let t = plan.add_table(&section_id).unwrap();
        assert!(!plan.set_bar_orientation(&t, BarOrientation::Vertical));
    }

    #[test]
    fn test_update_item_recomputes_total() {
        let (mut plan, section_id) = plan_with_section();
        let t = plan.add_table(&section_id).unwrap();
        let mut account = Account::new(None);
        let beer = item("Beer", 1, Decimal::new(500, 2));
        let beer_id = beer.id.clone();
        account.items.push(beer);
        account.total = Decimal::new(500, 2);
        let account_id = account.id.clone();
        plan.update_placeable(&t, |p| p.accounts.push(account));

        plan.update_item(&t, &account_id, &beer_id, |i| {
            i.quantity = 3;
            i.total = i.unit_price * Decimal::from(i.quantity);
        });

        assert_eq!(plan.account(&t, &account_id).unwrap().total, Decimal::new(1500, 2));
    }

    #[test]
    fn test_rehydrate_repairs_dangling_current_account() {
        let (mut plan, section_id) = plan_with_section();
        let t = plan.add_table(&section_id).unwrap();
        plan.update_placeable(&t, |p| {
            p.accounts.push(Account::new(None));
            p.current_account_id = Some("gone".to_string());
        });

        let repaired = FloorPlan::rehydrate(plan.into_sections());
        let p = repaired.placeable(&t).unwrap();
        assert!(p.current_account_is_valid());
        assert_eq!(p.current_account_id.as_deref(), Some(p.accounts[0].id.as_str()));
    }
}
