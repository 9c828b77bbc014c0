//! In-memory actuator that simulates cover motors.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use coverctl_app::ports::{Actuator, ActuatorError, CoverCommand};
use coverctl_domain::id::CoverId;

/// Commands kept in the log; older ones are dropped.
pub const LOG_CAPACITY: usize = 256;

#[derive(Debug, Default)]
struct Motors {
    positions: HashMap<CoverId, u8>,
    log: VecDeque<(CoverId, CoverCommand)>,
    failing: HashSet<CoverId>,
}

/// A simulated actuator. Clones share the same motors.
///
/// `Stop` leaves the position where it was; every other command moves the
/// cover to the commanded position after the configured travel time.
#[derive(Debug, Clone, Default)]
pub struct VirtualActuator {
    motors: Arc<Mutex<Motors>>,
    travel_time: Duration,
}

impl VirtualActuator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every command by `travel_time`.
    #[must_use]
    pub fn with_travel_time(mut self, travel_time: Duration) -> Self {
        self.travel_time = travel_time;
        self
    }

    fn motors(&self) -> MutexGuard<'_, Motors> {
        self.motors.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current position of a cover, `None` until it was first moved.
    #[must_use]
    pub fn position(&self, cover: &CoverId) -> Option<u8> {
        self.motors().positions.get(cover).copied()
    }

    /// The last [`LOG_CAPACITY`] accepted commands, oldest first.
    #[must_use]
    pub fn commands(&self) -> Vec<(CoverId, CoverCommand)> {
        self.motors().log.iter().cloned().collect()
    }

    /// Make the cover report unavailable until set back.
    pub fn set_failing(&self, cover: &CoverId, failing: bool) {
        let mut motors = self.motors();
        if failing {
            motors.failing.insert(cover.clone());
        } else {
            motors.failing.remove(cover);
        }
    }
}

impl Actuator for VirtualActuator {
    async fn set_position(&self, cover: &CoverId, command: CoverCommand) -> Result<(), ActuatorError> {
        if self.motors().failing.contains(cover) {
            return Err(ActuatorError::Unavailable(cover.clone()));
        }
        if !self.travel_time.is_zero() {
            tokio::time::sleep(self.travel_time).await;
        }

        let mut motors = self.motors();
        if let Some(position) = command.position {
            motors.positions.insert(cover.clone(), position);
        }
        if motors.log.len() == LOG_CAPACITY {
            motors.log.pop_front();
        }
        motors.log.push_back((cover.clone(), command));
        tracing::debug!(%cover, action = %command.action, position = ?command.position, "virtual cover moved");
        Ok(())
    }
}
