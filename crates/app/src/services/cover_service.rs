//! Cover service: use-cases for the running cover controllers.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;

use coverctl_domain::action::Action;
use coverctl_domain::config::{Automation, CoverConfig};
use coverctl_domain::diagnostics::Diagnostics;
use coverctl_domain::error::{CoverError, NotFoundError, ValidationError};
use coverctl_domain::id::{CoverId, EntityRef};
use coverctl_domain::sensor::SensorValue;
use coverctl_domain::site::Site;
use coverctl_domain::time::Timestamp;

use crate::controller::{
    ControllerContext, ControllerSettings, CoverController, CoverHandle, EngineSwitch,
};
use crate::ports::{Actuator, Clock};
use crate::sensor_store::SensorStore;
use crate::services::diagnostics_board::DiagnosticsBoard;

/// Shared pieces the service hands to every controller.
pub struct ServiceRuntime {
    pub sensors: SensorStore,
    pub board: Arc<DiagnosticsBoard>,
    pub clock: Arc<dyn Clock + Send + Sync>,
    pub settings: ControllerSettings,
    pub enabled: bool,
}

/// Summary of one cover for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverStatus {
    pub id: CoverId,
    pub name: String,
    pub manual_override_until: Option<Timestamp>,
    pub automation: Automation,
    /// `None` until the first evaluation finished.
    pub diagnostics: Option<Diagnostics>,
}

/// Application service owning one controller task per cover.
pub struct CoverService {
    handles: BTreeMap<CoverId, CoverHandle>,
    routes: HashMap<EntityRef, Vec<CoverId>>,
    sensors: SensorStore,
    board: Arc<DiagnosticsBoard>,
    switch: EngineSwitch,
    clock: Arc<dyn Clock + Send + Sync>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl CoverService {
    /// Validate every configuration and spawn one controller per cover.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`CoverError::Validation`] when the site or a cover is
    /// invalid, or when two covers share an id. Nothing is spawned then.
    pub fn start<A>(
        configs: Vec<CoverConfig>,
        site: &Site,
        actuator: A,
        runtime: ServiceRuntime,
    ) -> Result<Self, CoverError>
    where
        A: Actuator + Clone + Send + Sync + 'static,
    {
        site.validate()?;
        let mut seen = BTreeMap::new();
        for config in configs {
            config.validate()?;
            if seen.contains_key(&config.id) {
                return Err(ValidationError::DuplicateCover(config.id.to_string()).into());
            }
            seen.insert(config.id.clone(), config);
        }

        let switch = EngineSwitch::new(runtime.enabled);
        let mut routes: HashMap<EntityRef, Vec<CoverId>> = HashMap::new();
        let mut handles = BTreeMap::new();
        let mut tasks = Vec::with_capacity(seen.len());

        for (id, config) in seen {
            for entity in config.referenced_entities() {
                routes.entry(entity.clone()).or_default().push(id.clone());
            }
            if let Some(sun) = site.sun.entity() {
                let covers = routes.entry(sun.clone()).or_default();
                if !covers.contains(&id) {
                    covers.push(id.clone());
                }
            }

            let (controller, handle) = CoverController::new(
                Arc::new(config),
                site,
                ControllerContext {
                    actuator: actuator.clone(),
                    publisher: Arc::clone(&runtime.board),
                    clock: Arc::clone(&runtime.clock),
                    sensors: runtime.sensors.clone(),
                    switch: switch.clone(),
                    settings: runtime.settings,
                },
            );
            tasks.push(controller.spawn());
            handles.insert(id, handle);
        }

        tracing::info!(covers = handles.len(), enabled = switch.is_enabled(), "cover service started");

        Ok(Self {
            handles,
            routes,
            sensors: runtime.sensors,
            board: runtime.board,
            switch,
            clock: runtime.clock,
            tasks: Mutex::new(tasks),
        })
    }

    fn handle(&self, id: &CoverId) -> Result<&CoverHandle, CoverError> {
        self.handles.get(id).ok_or_else(|| {
            NotFoundError {
                entity: "Cover",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// Record a sensor value and wake the covers that read it.
    ///
    /// Returns the covers that were triggered; empty when the value did not
    /// change or no cover references the entity.
    pub fn handle_sensor_event(&self, entity: EntityRef, value: SensorValue) -> Vec<CoverId> {
        let covers = self.routes.get(&entity).cloned().unwrap_or_default();
        if !self.sensors.update(entity.clone(), value, self.clock.now()) {
            return Vec::new();
        }
        tracing::debug!(%entity, ?value, covers = covers.len(), "sensor changed");
        for id in &covers {
            if let Some(handle) = self.handles.get(id) {
                handle.trigger();
            }
        }
        covers
    }

    /// Pause automation of one cover.
    ///
    /// # Errors
    ///
    /// Returns [`CoverError::NotFound`] for an unknown cover and
    /// [`CoverError::InvalidCommand`] for a non-positive duration.
    pub fn set_manual_override(&self, id: &CoverId, minutes: i64) -> Result<Timestamp, CoverError> {
        let until = self.handle(id)?.set_manual_override(minutes, self.clock.now())?;
        tracing::info!(cover = %id, %until, "manual override set");
        Ok(until)
    }

    /// # Errors
    ///
    /// Returns [`CoverError::NotFound`] for an unknown cover.
    pub fn clear_manual_override(&self, id: &CoverId) -> Result<(), CoverError> {
        self.handle(id)?.clear_manual_override();
        tracing::info!(cover = %id, "manual override cleared");
        Ok(())
    }

    /// Force shading on the next evaluation.
    ///
    /// # Errors
    ///
    /// Returns [`CoverError::NotFound`] for an unknown cover and
    /// [`CoverError::InvalidCommand`] for a non-positive hold.
    pub fn activate_shading(&self, id: &CoverId, hold_minutes: Option<i64>) -> Result<(), CoverError> {
        self.handle(id)?.activate_shading(hold_minutes)?;
        tracing::info!(cover = %id, ?hold_minutes, "shading activated");
        Ok(())
    }

    /// The cover was moved outside the engine's control.
    ///
    /// Returns when automation resumes, `None` when no resume time could be
    /// computed.
    ///
    /// # Errors
    ///
    /// Returns [`CoverError::NotFound`] for an unknown cover.
    pub fn report_external_move(&self, id: &CoverId) -> Result<Option<Timestamp>, CoverError> {
        let until = self.handle(id)?.external_move(self.clock.now());
        tracing::info!(cover = %id, ?until, "external move detected");
        Ok(until)
    }

    /// Open or close a cover now and pause its automation.
    ///
    /// Returns when automation resumes.
    ///
    /// # Errors
    ///
    /// Returns [`CoverError::NotFound`] for an unknown cover and
    /// [`CoverError::InvalidCommand`] for anything but open or close.
    pub fn force_action(&self, id: &CoverId, action: Action) -> Result<Option<Timestamp>, CoverError> {
        let until = self.handle(id)?.force_action(action, self.clock.now())?;
        tracing::info!(cover = %id, %action, ?until, "forced action requested");
        Ok(until)
    }

    /// Replace the automation switches of one cover.
    ///
    /// # Errors
    ///
    /// Returns [`CoverError::NotFound`] for an unknown cover.
    pub fn set_automation(&self, id: &CoverId, automation: Automation) -> Result<(), CoverError> {
        self.handle(id)?.set_automation(automation);
        tracing::info!(cover = %id, ?automation, "automation switches changed");
        Ok(())
    }

    /// Request an immediate evaluation.
    ///
    /// # Errors
    ///
    /// Returns [`CoverError::NotFound`] for an unknown cover.
    pub fn evaluate(&self, id: &CoverId) -> Result<(), CoverError> {
        self.handle(id)?.trigger();
        Ok(())
    }

    /// Turn automation on or off. Turning it on re-evaluates every cover.
    pub fn set_enabled(&self, enabled: bool) {
        let previous = self.switch.set(enabled);
        if previous != enabled {
            tracing::info!(enabled, "automation switched");
        }
        if enabled {
            for handle in self.handles.values() {
                handle.trigger();
            }
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.switch.is_enabled()
    }

    #[must_use]
    pub fn list_covers(&self) -> Vec<CoverStatus> {
        let now = self.clock.now();
        self.handles
            .values()
            .map(|handle| self.status(handle, now))
            .collect()
    }

    /// # Errors
    ///
    /// Returns [`CoverError::NotFound`] for an unknown cover.
    pub fn get_cover(&self, id: &CoverId) -> Result<CoverStatus, CoverError> {
        let handle = self.handle(id)?;
        Ok(self.status(handle, self.clock.now()))
    }

    fn status(&self, handle: &CoverHandle, now: Timestamp) -> CoverStatus {
        CoverStatus {
            id: handle.id().clone(),
            name: handle.config().display_name().to_string(),
            manual_override_until: handle.paused_until(now),
            automation: handle.automation(),
            diagnostics: self.board.latest(handle.id()),
        }
    }

    #[must_use]
    pub fn board(&self) -> &Arc<DiagnosticsBoard> {
        &self.board
    }

    /// Stop every controller task.
    pub fn shutdown(&self) {
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        for task in &tasks {
            task.abort();
        }
        tracing::info!(tasks = tasks.len(), "cover controllers stopped");
    }
}

impl Drop for CoverService {
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut().unwrap_or_else(PoisonError::into_inner);
        for task in tasks.drain(..) {
            task.abort();
        }
    }
}
