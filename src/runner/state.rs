//! Runner session state and the operator control handle

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

use crate::common::types::{Mode, Position};

/// Runner lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunnerPhase {
    Idle,
    Running,
    EmergencyStopped,
    Stopped,
}

/// Session-scoped state, mutated only by the runner task itself
#[derive(Debug, Clone)]
pub struct RunnerState {
    pub mode: Mode,
    pub phase: RunnerPhase,
    pub position: Option<Position>,
    pub realized_pnl_today: Decimal,
    pnl_day: Option<NaiveDate>,
    pub last_trade_at: Option<DateTime<Utc>>,
}

impl RunnerState {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            phase: RunnerPhase::Idle,
            position: None,
            realized_pnl_today: Decimal::ZERO,
            pnl_day: None,
            last_trade_at: None,
        }
    }

    /// Fold a realized PnL amount into today's total, resetting the
    /// accumulator when the UTC day rolls over.
    pub fn record_realized(&mut self, pnl: Decimal, date: NaiveDate) -> Decimal {
        if self.pnl_day != Some(date) {
            self.realized_pnl_today = Decimal::ZERO;
            self.pnl_day = Some(date);
        }
        self.realized_pnl_today += pnl;
        self.realized_pnl_today
    }
}

/// Operator-facing handle shared with the runner task.
///
/// `stop` asks for an orderly shutdown, observable within one poll
/// cycle. The kill switch forces immediate flattening and suspends
/// entries until explicitly cleared; both flags wake the runner so an
/// assertion preempts the next scheduled action even mid-sleep.
#[derive(Debug, Clone, Default)]
pub struct ControlHandle {
    stop: Arc<AtomicBool>,
    emergency: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ControlHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Assert the kill switch
    pub fn emergency_stop(&self) {
        self.emergency.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Explicit operator action to leave the emergency state
    pub fn clear_emergency(&self) {
        self.emergency.store(false, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// The kill-switch evaluation point, identical for live and backtest
    pub fn kill_switch_triggered(&self) -> bool {
        self.emergency.load(Ordering::SeqCst)
    }

    pub async fn changed(&self) {
        self.notify.notified().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn realized_pnl_resets_on_day_rollover() {
        let mut state = RunnerState::new(Mode::Paper);
        let monday = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();

        assert_eq!(state.record_realized(dec!(10), monday), dec!(10));
        assert_eq!(state.record_realized(dec!(-4), monday), dec!(6));
        assert_eq!(state.record_realized(dec!(1), tuesday), dec!(1));
    }

    #[test]
    fn kill_switch_requires_explicit_clear() {
        let control = ControlHandle::new();
        assert!(!control.kill_switch_triggered());
        control.emergency_stop();
        assert!(control.kill_switch_triggered());
        control.clear_emergency();
        assert!(!control.kill_switch_triggered());
    }
}
