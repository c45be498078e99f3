//! Floor session (楼面会话)
//!
//! The single owned aggregate a host embeds: the [`FloorPlan`], the staged
//! order, the finalizer and the save worker. Every mutation goes through
//! here so it can be handed to the save worker with the right trigger:
//!
//! | Mutation | Save |
//! |----------|------|
//! | add/remove/rename section, add/remove placeable, orientation, status | immediate |
//! | drag/resize while moving | coalesced |
//! | drag/resize released | immediate |
//! | open/cancel/finalize/ready-to-charge/select, order commit | immediate |
//! | committed item edits | coalesced |
//!
//! Mutations that hit a missing node change nothing and save nothing.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use shared::models::{
    Account, BarOrientation, PaymentMethod, Placeable, Position, Reservation, Section, Size, Status,
};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::accounts::{self, FinalizeOutcome, FinalizeResult, Finalizer};
use crate::catalog::{Catalog, CatalogResult, CatalogSnapshot};
use crate::core::FloorConfig;
use crate::layout::{self, FloorPlan};
use crate::ledger::{SaleStorage, SalesLedger};
use crate::orders::{CommitReceipt, OrderBuilder, OrderResult};
use crate::persistence::{
    DragPhase, LayoutRepository, LayoutSaveHandle, LayoutStorage, SaveStatus, SaveTrigger, StorageResult,
};
use crate::reservations::{self, ReservationResult, ReservationSignal, ReservationSource};

/// Where the session's layout came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutOrigin {
    /// Rehydrated from the repository
    Stored,
    /// Nothing saved yet for this owner
    Default,
    /// The saved layout could not be loaded or read
    Fallback,
}

pub struct FloorSession {
    plan: FloorPlan,
    order: OrderBuilder,
    catalog: CatalogSnapshot,
    finalizer: Finalizer,
    saver: LayoutSaveHandle,
    origin: LayoutOrigin,
}

impl FloorSession {
    /// Load the owner's layout and start the save worker.
    ///
    /// A missing, unreachable or unreadable layout is not an error: the
    /// session starts from `default_layout` instead.
    pub async fn load(
        repo: Arc<dyn LayoutRepository>,
        ledger: Arc<dyn SalesLedger>,
        config: &FloorConfig,
        default_layout: Vec<Section>,
    ) -> Self {
        let owner_key = config.owner_key.as_str();
        let (sections, origin) = match repo.load_layout(owner_key).await {
            Ok(Some(wire)) => match layout::deserialize(&wire) {
                Ok(sections) => (sections, LayoutOrigin::Stored),
                Err(e) => {
                    warn!(owner_key, error = %e, "Saved layout unreadable, using default");
                    (default_layout, LayoutOrigin::Fallback)
                }
            },
            Ok(None) => {
                info!(owner_key, "No saved layout, using default");
                (default_layout, LayoutOrigin::Default)
            }
            Err(e) => {
                warn!(owner_key, error = %e, "Layout load failed, using default");
                (default_layout, LayoutOrigin::Fallback)
            }
        };

        let plan = FloorPlan::rehydrate(sections);
        info!(
            owner_key,
            origin = ?origin,
            sections = plan.sections().len(),
            placeables = plan.placeables().count(),
            "Floor session loaded"
        );

        Self {
            plan,
            order: OrderBuilder::new(),
            catalog: CatalogSnapshot::default(),
            finalizer: Finalizer::new(ledger, config.establishment_id.clone(), config.tax_rate),
            saver: LayoutSaveHandle::spawn(repo, config.owner_key.clone(), config.save_window()),
            origin,
        }
    }

    /// Open redb-backed layout and sales stores under the configured work
    /// directory and load the session from them.
    pub async fn open(config: &FloorConfig, default_layout: Vec<Section>) -> StorageResult<Self> {
        std::fs::create_dir_all(Path::new(&config.work_dir))?;
        let repo = Arc::new(LayoutStorage::open(config.layout_db_path())?);
        let ledger = Arc::new(SaleStorage::open(config.ledger_db_path())?);
        Ok(Self::load(repo, ledger, config, default_layout).await)
    }

    // ========== Accessors ==========

    pub fn plan(&self) -> &FloorPlan {
        &self.plan
    }

    pub fn sections(&self) -> &[Section] {
        self.plan.sections()
    }

    pub fn origin(&self) -> LayoutOrigin {
        self.origin
    }

    pub fn order(&self) -> &OrderBuilder {
        &self.order
    }

    /// Staged lines are not persisted, so they can be edited freely
    pub fn order_mut(&mut self) -> &mut OrderBuilder {
        &mut self.order
    }

    pub fn catalog(&self) -> &CatalogSnapshot {
        &self.catalog
    }

    pub fn finalizer(&self) -> &Finalizer {
        &self.finalizer
    }

    pub fn save_status(&self) -> SaveStatus {
        self.saver.status()
    }

    pub fn subscribe_save_status(&self) -> watch::Receiver<SaveStatus> {
        self.saver.subscribe()
    }

    fn persist(&self, trigger: SaveTrigger) {
        self.saver.notify(self.plan.snapshot(), trigger);
    }

    /// Forget the order target once it is no longer in the layout
    fn drop_stale_target(&mut self) {
        if let Some(target) = self.order.target()
            && self.plan.placeable(target).is_none()
        {
            tracing::debug!(placeable_id = %target, "Order target removed, selection cleared");
            self.order.clear_target();
        }
    }

    fn persist_if(&self, changed: bool, trigger: SaveTrigger) -> bool {
        if changed {
            self.persist(trigger);
        }
        changed
    }

    // ========== Sections ==========

    pub fn add_section(&mut self, name: impl Into<String>, position: Position) -> String {
        let id = self.plan.add_section(name, position);
        self.persist(SaveTrigger::Immediate);
        id
    }

    pub fn remove_section(&mut self, section_id: &str) -> Option<Section> {
        let removed = self.plan.remove_section(section_id)?;
        self.drop_stale_target();
        self.persist(SaveTrigger::Immediate);
        Some(removed)
    }

    pub fn rename_section(&mut self, section_id: &str, name: impl Into<String>) -> bool {
        let changed = self.plan.rename_section(section_id, name);
        self.persist_if(changed, SaveTrigger::Immediate)
    }

    pub fn move_section(&mut self, section_id: &str, proposed: Position, phase: DragPhase) -> Option<Position> {
        let position = self.plan.move_section(section_id, proposed)?;
        self.persist(phase.into());
        Some(position)
    }

    pub fn resize_section(&mut self, section_id: &str, proposed: Size, phase: DragPhase) -> Option<Size> {
        let size = self.plan.resize_section(section_id, proposed)?;
        self.persist(phase.into());
        Some(size)
    }

    // ========== Tables / Bars ==========

    pub fn add_table(&mut self, section_id: &str) -> Option<String> {
        let id = self.plan.add_table(section_id)?;
        self.persist(SaveTrigger::Immediate);
        Some(id)
    }

    pub fn add_bar(&mut self, section_id: &str, orientation: BarOrientation) -> Option<String> {
        let id = self.plan.add_bar(section_id, orientation)?;
        self.persist(SaveTrigger::Immediate);
        Some(id)
    }

    pub fn remove_placeable(&mut self, placeable_id: &str) -> Option<Placeable> {
        let removed = self.plan.remove_placeable(placeable_id)?;
        self.drop_stale_target();
        self.persist(SaveTrigger::Immediate);
        Some(removed)
    }

    pub fn move_placeable(&mut self, placeable_id: &str, proposed: Position, phase: DragPhase) -> Option<Position> {
        let position = self.plan.move_placeable(placeable_id, proposed)?;
        self.persist(phase.into());
        Some(position)
    }

    pub fn set_bar_orientation(&mut self, placeable_id: &str, orientation: BarOrientation) -> bool {
        let changed = self.plan.set_bar_orientation(placeable_id, orientation);
        self.persist_if(changed, SaveTrigger::Immediate)
    }

    pub fn set_status(&mut self, placeable_id: &str, status: Status) -> bool {
        let changed = self.plan.set_status(placeable_id, status);
        self.persist_if(changed, SaveTrigger::Immediate)
    }

    // ========== Accounts ==========

    pub fn open_account(&mut self, placeable_id: &str) -> Option<String> {
        let account_id = accounts::open_account(&mut self.plan, placeable_id)?;
        self.persist(SaveTrigger::Immediate);
        Some(account_id)
    }

    pub fn cancel_account(&mut self, placeable_id: &str, account_id: &str) -> Option<Account> {
        let account = accounts::cancel_account(&mut self.plan, placeable_id, account_id)?;
        self.persist(SaveTrigger::Immediate);
        Some(account)
    }

    pub fn remove_item(&mut self, placeable_id: &str, account_id: &str, item_id: &str) -> bool {
        let changed = accounts::remove_item(&mut self.plan, placeable_id, account_id, item_id);
        self.persist_if(changed, SaveTrigger::Coalesced)
    }

    pub fn adjust_item_quantity(&mut self, placeable_id: &str, account_id: &str, item_id: &str, delta: i32) -> bool {
        let changed = accounts::adjust_item_quantity(&mut self.plan, placeable_id, account_id, item_id, delta);
        self.persist_if(changed, SaveTrigger::Coalesced)
    }

    pub fn mark_ready_to_charge(&mut self, placeable_id: &str, account_id: &str) -> bool {
        let changed = accounts::mark_ready_to_charge(&mut self.plan, placeable_id, account_id);
        self.persist_if(changed, SaveTrigger::Immediate)
    }

    pub fn select_account(&mut self, placeable_id: &str, account_id: &str) -> bool {
        let changed = accounts::select_account(&mut self.plan, placeable_id, account_id);
        self.persist_if(changed, SaveTrigger::Immediate)
    }

    /// Bill an account through the sales ledger. On a ledger failure the
    /// layout is untouched and nothing is saved.
    pub async fn finalize_account(
        &mut self,
        placeable_id: &str,
        account_id: &str,
        payment_method: PaymentMethod,
    ) -> FinalizeResult<FinalizeOutcome> {
        let outcome = self
            .finalizer
            .finalize_account(&mut self.plan, placeable_id, account_id, payment_method)
            .await?;
        if outcome != FinalizeOutcome::NotFound {
            self.persist(SaveTrigger::Immediate);
        }
        Ok(outcome)
    }

    // ========== Orders ==========

    /// Replace the product snapshot. Lines already staged keep their prices.
    pub async fn refresh_catalog(&mut self, catalog: &dyn Catalog) -> CatalogResult<()> {
        self.catalog = CatalogSnapshot::fetch(catalog, self.finalizer.establishment_id()).await?;
        Ok(())
    }

    /// Stage a product from the current catalog snapshot. `None` if the
    /// product is not in the snapshot.
    pub fn add_product(&mut self, product_id: &str, quantity: u32) -> Option<OrderResult<String>> {
        let product = self.catalog.get(product_id)?;
        Some(self.order.add_line(product, quantity))
    }

    pub fn commit_order(&mut self) -> OrderResult<Option<CommitReceipt>> {
        let receipt = self.order.commit(&mut self.plan)?;
        if receipt.is_some() {
            self.persist(SaveTrigger::Immediate);
        }
        Ok(receipt)
    }

    // ========== Reservations ==========

    pub async fn apply_reservation_signal(
        &mut self,
        placeable_id: &str,
        source: &dyn ReservationSource,
    ) -> ReservationResult<ReservationSignal> {
        let today = Utc::now().date_naive();
        let signal = reservations::apply_reservation_signal(&mut self.plan, placeable_id, source, today).await?;
        if matches!(signal, ReservationSignal::Reserved(_)) {
            self.persist(SaveTrigger::Immediate);
        }
        Ok(signal)
    }

    pub async fn seat_reservation(
        &mut self,
        placeable_id: &str,
        source: &dyn ReservationSource,
    ) -> ReservationResult<Option<Reservation>> {
        let seated = reservations::seat_reservation(&mut self.plan, placeable_id, source).await?;
        if seated.is_some() {
            self.persist(SaveTrigger::Immediate);
        }
        Ok(seated)
    }

    // ========== Persistence ==========

    /// Write the current layout now, skipping the debounce window
    pub async fn flush(&self) -> StorageResult<()> {
        self.persist(SaveTrigger::Immediate);
        self.saver.flush().await
    }

    /// Stop the save worker after writing whatever is pending
    pub async fn shutdown(self) {
        self.saver.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use crate::layout::WireLayout;
    use crate::ledger::MemorySalesLedger;
    use crate::persistence::MemoryLayoutRepository;
    use rust_decimal::Decimal;
    use shared::models::Product;
    use std::time::Duration;

    fn config() -> FloorConfig {
        let mut config = FloorConfig::with_overrides("./unused", "owner-1");
        config.tax_rate = Decimal::new(16, 2);
        config.save_debounce_ms = 800;
        config
    }

    fn default_layout() -> Vec<Section> {
        vec![Section::new("Main hall", Position::new(0.0, 0.0), Size::new(480.0, 320.0))]
    }

    async fn stored_sections(repo: &MemoryLayoutRepository) -> Option<Vec<Section>> {
        let wire = repo.load_layout("owner-1").await.unwrap()?;
        Some(layout::deserialize(&wire).unwrap())
    }

    #[tokio::test]
    async fn test_load_without_saved_layout_uses_default() {
        let repo = Arc::new(MemoryLayoutRepository::new());
        let session =
            FloorSession::load(repo.clone(), Arc::new(MemorySalesLedger::new()), &config(), default_layout()).await;

        assert_eq!(session.origin(), LayoutOrigin::Default);
        assert_eq!(session.sections().len(), 1);
        assert_eq!(session.sections()[0].name, "Main hall");
        // Loading alone writes nothing
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_layout_falls_back() {
        let repo = Arc::new(MemoryLayoutRepository::new());
        repo.save_layout("owner-1", &WireLayout::from_text("{not json")).await.unwrap();

        let session =
            FloorSession::load(repo, Arc::new(MemorySalesLedger::new()), &config(), default_layout()).await;

        assert_eq!(session.origin(), LayoutOrigin::Fallback);
        assert_eq!(session.sections()[0].name, "Main hall");
    }

    #[tokio::test]
    async fn test_layout_survives_reload() {
        let repo = Arc::new(MemoryLayoutRepository::new());
        let ledger = Arc::new(MemorySalesLedger::new());

        let mut session = FloorSession::load(repo.clone(), ledger.clone(), &config(), vec![]).await;
        let section = session.add_section("Terrace", Position::new(40.0, 40.0));
        let table = session.add_table(&section).unwrap();
        let account_id = session.open_account(&table).unwrap();
        session.flush().await.unwrap();
        session.shutdown().await;

        let reloaded = FloorSession::load(repo, ledger, &config(), default_layout()).await;
        assert_eq!(reloaded.origin(), LayoutOrigin::Stored);
        let p = reloaded.plan().placeable(&table).unwrap();
        assert_eq!(p.name, "Table 1");
        assert_eq!(p.status, Status::Occupied);
        assert_eq!(p.current_account_id.as_deref(), Some(account_id.as_str()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drag_persists_only_after_release() {
        let repo = Arc::new(MemoryLayoutRepository::new());
        let mut session =
            FloorSession::load(repo.clone(), Arc::new(MemorySalesLedger::new()), &config(), vec![]).await;
        let section = session.add_section("Hall", Position::new(0.0, 0.0));
        let table = session.add_table(&section).unwrap();
        session.flush().await.unwrap();
        let start = stored_sections(&repo).await.unwrap()[0].tables[0].position;

        for step in 1..=5 {
            session.move_placeable(&table, Position::new(step as f64 * 10.0, 50.0), DragPhase::Moving);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(stored_sections(&repo).await.unwrap()[0].tables[0].position, start);

        session.move_placeable(&table, Position::new(60.0, 50.0), DragPhase::Released);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(
            stored_sections(&repo).await.unwrap()[0].tables[0].position,
            Position::new(60.0, 50.0)
        );
    }

    #[tokio::test]
    async fn test_missing_target_saves_nothing() {
        let repo = Arc::new(MemoryLayoutRepository::new());
        let mut session =
            FloorSession::load(repo.clone(), Arc::new(MemorySalesLedger::new()), &config(), vec![]).await;

        assert!(session.open_account("ghost").is_none());
        assert!(!session.set_status("ghost", Status::Reserved));
        session.saver.flush().await.unwrap();
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_catalog_order_and_finalize() {
        let repo = Arc::new(MemoryLayoutRepository::new());
        let ledger = Arc::new(MemorySalesLedger::new());
        let mut session = FloorSession::load(repo.clone(), ledger.clone(), &config(), vec![]).await;
        let section = session.add_section("Hall", Position::new(0.0, 0.0));
        let table = session.add_table(&section).unwrap();

        let catalog = StaticCatalog::new(vec![
            Product::new("p-1", "Mojito", Decimal::new(800, 2)),
            Product::new("p-2", "Beer", Decimal::new(500, 2)),
        ]);
        session.refresh_catalog(&catalog).await.unwrap();
        session.add_product("p-1", 2).unwrap().unwrap();
        session.add_product("p-2", 1).unwrap().unwrap();
        assert!(session.add_product("p-9", 1).is_none());

        session.order_mut().select_target(&table);
        let receipt = session.commit_order().unwrap().unwrap();
        assert_eq!(receipt.account_total, Decimal::new(2100, 2));

        let outcome = session
            .finalize_account(&table, &receipt.account_id, PaymentMethod::Cash)
            .await
            .unwrap();
        assert!(matches!(outcome, FinalizeOutcome::Finalized { ref sale, .. } if sale.total == Decimal::new(2436, 2)));
        assert_eq!(ledger.len(), 1);

        session.flush().await.unwrap();
        let stored = stored_sections(&repo).await.unwrap();
        assert!(stored[0].tables[0].accounts.is_empty());
        assert_eq!(stored[0].tables[0].status, Status::Free);
    }

    #[tokio::test]
    async fn test_removing_target_clears_selection() {
        let mut session = FloorSession::load(
            Arc::new(MemoryLayoutRepository::new()),
            Arc::new(MemorySalesLedger::new()),
            &config(),
            vec![],
        )
        .await;
        let section = session.add_section("Hall", Position::new(0.0, 0.0));
        let table = session.add_table(&section).unwrap();
        session.order_mut().select_target(&table);

        session.remove_placeable(&table).unwrap();
        assert_eq!(session.order().target(), None);
    }

    #[tokio::test]
    async fn test_removing_section_clears_selection_inside_it() {
        let mut session = FloorSession::load(
            Arc::new(MemoryLayoutRepository::new()),
            Arc::new(MemorySalesLedger::new()),
            &config(),
            vec![],
        )
        .await;
        let terrace = session.add_section("Terrace", Position::new(0.0, 0.0));
        let hall = session.add_section("Hall", Position::new(600.0, 0.0));
        let outside = session.add_table(&terrace).unwrap();
        let inside = session.add_table(&hall).unwrap();

        session.order_mut().select_target(&inside);
        session.remove_section(&terrace).unwrap();
        assert!(session.plan().placeable(&outside).is_none());
        assert_eq!(session.order().target(), Some(inside.as_str()));

        session.remove_section(&hall).unwrap();
        assert_eq!(session.order().target(), None);
    }

    #[tokio::test]
    async fn test_open_creates_redb_files() {
        let dir = tempfile::tempdir().unwrap();
        let work_dir = dir.path().join("floor");
        let config = FloorConfig::with_overrides(work_dir.to_string_lossy(), "owner-1");

        let mut session = FloorSession::open(&config, default_layout()).await.unwrap();
        let section_id = session.sections()[0].id.clone();
        assert!(session.rename_section(&section_id, "Patio"));
        session.flush().await.unwrap();
        session.shutdown().await;

        assert!(config.layout_db_path().exists());
        assert!(config.ledger_db_path().exists());
        let reopened = FloorSession::open(&config, vec![]).await.unwrap();
        assert_eq!(reopened.sections()[0].name, "Patio");
    }
}
