use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::AnalysisConfig;
use crate::data::{DriverSeries, LapRecord, SessionContext};
use crate::pipeline::{analyze_driver, DriverAnalysis};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectError {
    #[error("{0} is already selected")]
    AlreadySelected(String),
    #[error("at most {0} drivers can be selected")]
    LimitReached(usize),
}

/// Handle for one outstanding lap fetch. Only the most recent ticket of a
/// still-selected driver is accepted back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    driver: String,
    request: u64,
}

impl FetchTicket {
    pub fn driver(&self) -> &str {
        &self.driver
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DriverState {
    Pending { request: u64 },
    Ready(DriverAnalysis),
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Stored,
    Failed,
    /// Driver deselected or context changed while the fetch was in flight.
    Stale,
}

/// Selected drivers of one session and their analyses. Each driver's result is
/// computed and stored on its own; a failing driver never touches the others.
pub struct SessionBoard {
    context: SessionContext,
    config: AnalysisConfig,
    selected: Vec<String>,
    states: HashMap<String, DriverState>,
    next_request: u64,
}

impl SessionBoard {
    pub fn new(context: SessionContext, config: AnalysisConfig) -> Self {
        Self {
            context,
            config,
            selected: Vec::new(),
            states: HashMap::new(),
            next_request: 0,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn state(&self, driver: &str) -> Option<&DriverState> {
        self.states.get(driver)
    }

    /// Switches to another session. All selections and results are dropped;
    /// fetches still in flight become stale.
    pub fn set_context(&mut self, context: SessionContext) -> bool {
        if context == self.context {
            return false;
        }
        info!(
            year = context.year,
            circuit = %context.circuit,
            session = ?context.session,
            "session context changed"
        );
        self.context = context;
        self.selected.clear();
        self.states.clear();
        true
    }

    pub fn select(&mut self, driver: &str) -> Result<FetchTicket, SelectError> {
        if self.selected.iter().any(|d| d == driver) {
            return Err(SelectError::AlreadySelected(driver.to_string()));
        }
        if self.selected.len() >= self.config.max_selected_drivers {
            return Err(SelectError::LimitReached(self.config.max_selected_drivers));
        }

        self.next_request += 1;
        let request = self.next_request;
        self.selected.push(driver.to_string());
        self.states
            .insert(driver.to_string(), DriverState::Pending { request });
        debug!(driver, request, "driver selected");

        Ok(FetchTicket {
            driver: driver.to_string(),
            request,
        })
    }

    pub fn deselect(&mut self, driver: &str) -> bool {
        let before = self.selected.len();
        self.selected.retain(|d| d != driver);
        self.states.remove(driver);
        before != self.selected.len()
    }

    /// Accepts the outcome of a fetch. `position` is the externally known
    /// finishing position used for qualifying classification.
    pub fn deliver(
        &mut self,
        ticket: FetchTicket,
        fetched: Result<Vec<LapRecord>, String>,
        position: Option<u32>,
    ) -> Delivery {
        let current = matches!(
            self.states.get(&ticket.driver),
            Some(DriverState::Pending { request }) if *request == ticket.request
        );
        if !current {
            warn!(driver = %ticket.driver, request = ticket.request, "discarding stale lap delivery");
            return Delivery::Stale;
        }

        let outcome = fetched
            .and_then(|laps| DriverSeries::new(ticket.driver.clone(), laps).map_err(|e| e.to_string()));
        let (state, delivery) = match outcome {
            Ok(series) => {
                let analysis =
                    analyze_driver(&series, self.context.session, position, &self.config);
                (DriverState::Ready(analysis), Delivery::Stored)
            }
            Err(err) => {
                warn!(driver = %ticket.driver, error = %err, "lap fetch failed");
                (DriverState::Failed(err), Delivery::Failed)
            }
        };
        self.states.insert(ticket.driver, state);
        delivery
    }

    /// Finished analyses in selection order.
    pub fn analyses(&self) -> impl Iterator<Item = &DriverAnalysis> + '_ {
        self.selected
            .iter()
            .filter_map(|d| match self.states.get(d) {
                Some(DriverState::Ready(a)) => Some(a),
                _ => None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SessionKind;

    fn board() -> SessionBoard {
        SessionBoard::new(
            SessionContext::new(2024, "Bahrain Grand Prix", SessionKind::Race),
            AnalysisConfig::default(),
        )
    }

    fn laps() -> Vec<LapRecord> {
        (1..=6)
            .map(|i| LapRecord::new(i, 95.0 + i as f64 * 0.1, "MEDIUM", i))
            .collect()
    }

    #[test]
    fn delivered_laps_are_analysed() {
        let mut board = board();
        let ticket = board.select("VER").unwrap();
        assert!(matches!(board.state("VER"), Some(DriverState::Pending { .. })));
        assert_eq!(board.deliver(ticket, Ok(laps()), Some(1)), Delivery::Stored);
        let analyses: Vec<_> = board.analyses().collect();
        assert_eq!(analyses.len(), 1);
        assert_eq!(analyses[0].driver, "VER");
    }

    #[test]
    fn deselected_driver_is_not_resurrected() {
        let mut board = board();
        let ticket = board.select("HAM").unwrap();
        board.deselect("HAM");
        assert_eq!(board.deliver(ticket, Ok(laps()), None), Delivery::Stale);
        assert!(board.state("HAM").is_none());
        assert_eq!(board.analyses().count(), 0);
    }

    #[test]
    fn reselect_invalidates_older_ticket() {
        let mut board = board();
        let old = board.select("HAM").unwrap();
        board.deselect("HAM");
        let fresh = board.select("HAM").unwrap();
        assert_eq!(board.deliver(old, Ok(laps()), None), Delivery::Stale);
        assert_eq!(board.deliver(fresh, Ok(laps()), None), Delivery::Stored);
    }

    #[test]
    fn context_change_discards_everything() {
        let mut board = board();
        let done = board.select("LEC").unwrap();
        board.deliver(done, Ok(laps()), None);
        let in_flight = board.select("SAI").unwrap();

        let changed = board.set_context(SessionContext::new(
            2024,
            "Saudi Arabian Grand Prix",
            SessionKind::Race,
        ));
        assert!(changed);
        assert!(board.selected().is_empty());
        assert_eq!(board.deliver(in_flight, Ok(laps()), None), Delivery::Stale);
        assert_eq!(board.analyses().count(), 0);
    }

    #[test]
    fn failure_is_isolated_per_driver() {
        let mut board = board();
        let ok = board.select("NOR").unwrap();
        let bad = board.select("PIA").unwrap();
        let broken = vec![LapRecord::new(2, 90.0, "SOFT", 1), LapRecord::new(1, 90.0, "SOFT", 2)];

        assert_eq!(board.deliver(ok, Ok(laps()), None), Delivery::Stored);
        assert_eq!(board.deliver(bad, Ok(broken), None), Delivery::Failed);
        assert!(matches!(board.state("PIA"), Some(DriverState::Failed(_))));

        let third = board.select("RUS").unwrap();
        assert_eq!(board.deliver(third, Err("timeout".to_string()), None), Delivery::Failed);
        assert_eq!(board.analyses().map(|a| a.driver.as_str()).collect::<Vec<_>>(), vec!["NOR"]);
    }

    #[test]
    fn selection_limit_and_duplicates() {
        let mut board = board();
        for i in 0..10 {
            board.select(&format!("D{i}")).unwrap();
        }
        assert_eq!(board.select("D0"), Err(SelectError::AlreadySelected("D0".to_string())));
        assert_eq!(board.select("EXTRA"), Err(SelectError::LimitReached(10)));
        assert!(board.deselect("D3"));
        assert!(board.select("EXTRA").is_ok());
    }
}
