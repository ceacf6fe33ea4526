use std::fmt;

use thiserror::Error;

use crate::geo::sector_label;
use crate::report::{Assessment, Report, ReportError};

/// Lines kept in the system log panel
const MAX_LOG_LINES: usize = 200;

/// Randomly generated mission identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MissionId(u64);

impl MissionId {
    pub fn generate() -> Self {
        Self(rand::random())
    }

    /// Short four-digit tag used in log lines
    pub fn tag(&self) -> String {
        format!("{:04x}", self.0 >> 48)
    }
}

impl fmt::Display for MissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// A designated point on the map with its sector name
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub lon: f64,
    pub lat: f64,
    pub name: String,
}

impl Target {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self {
            lon,
            lat,
            name: sector_label(lon, lat),
        }
    }

    pub fn position(&self) -> (f64, f64) {
        (self.lon, self.lat)
    }
}

/// Mission lifecycle, in the only order it may be traversed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MissionStatus {
    Armed,
    Launching,
    Impacted,
    Analyzing,
    Complete,
}

impl MissionStatus {
    pub const SEQUENCE: [MissionStatus; 5] = [
        MissionStatus::Armed,
        MissionStatus::Launching,
        MissionStatus::Impacted,
        MissionStatus::Analyzing,
        MissionStatus::Complete,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MissionStatus::Armed => "ARMED",
            MissionStatus::Launching => "LAUNCHING",
            MissionStatus::Impacted => "IMPACTED",
            MissionStatus::Analyzing => "ANALYZING",
            MissionStatus::Complete => "COMPLETE",
        }
    }

    /// True once the warhead has landed
    pub fn is_hit(self) -> bool {
        matches!(
            self,
            MissionStatus::Impacted | MissionStatus::Analyzing | MissionStatus::Complete
        )
    }

    /// The only legal moves. Anything else is rejected.
    pub fn apply(self, event: MissionEvent) -> Result<Self, TransitionError> {
        match (self, event) {
            (MissionStatus::Armed, MissionEvent::Launch) => Ok(MissionStatus::Launching),
            (MissionStatus::Launching, MissionEvent::Impact) => Ok(MissionStatus::Impacted),
            (MissionStatus::Impacted, MissionEvent::BeginAnalysis) => Ok(MissionStatus::Analyzing),
            (MissionStatus::Analyzing, MissionEvent::Settle) => Ok(MissionStatus::Complete),
            (from, event) => Err(TransitionError::Illegal { from, event }),
        }
    }
}

/// Things that happen to a mission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionEvent {
    Launch,
    Impact,
    BeginAnalysis,
    Settle,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("cannot apply {event:?} to a mission that is {from:?}")]
    Illegal {
        from: MissionStatus,
        event: MissionEvent,
    },
    #[error("no mission with id {0}")]
    UnknownMission(MissionId),
}

/// One designated target and where it is in its lifecycle
#[derive(Debug, Clone)]
pub struct Mission {
    pub id: MissionId,
    pub target: Target,
    status: MissionStatus,
    history: Vec<MissionStatus>,
}

impl Mission {
    fn new(target: Target) -> Self {
        Self {
            id: MissionId::generate(),
            target,
            status: MissionStatus::Armed,
            history: vec![MissionStatus::Armed],
        }
    }

    pub fn status(&self) -> MissionStatus {
        self.status
    }

    /// Every status this mission has held, oldest first
    pub fn history(&self) -> &[MissionStatus] {
        &self.history
    }

    fn apply(&mut self, event: MissionEvent) -> Result<MissionStatus, TransitionError> {
        let next = self.status.apply(event)?;
        self.status = next;
        self.history.push(next);
        Ok(next)
    }
}

/// All client-side simulation state: missions, finished reports and the
/// operator-facing system log.
pub struct Simulation {
    missions: Vec<Mission>,
    /// Newest first
    reports: Vec<Report>,
    logs: Vec<String>,
}

impl Simulation {
    pub fn new() -> Self {
        let mut sim = Self {
            missions: Vec::new(),
            reports: Vec::new(),
            logs: Vec::new(),
        };
        sim.log("System initialized.");
        sim.log("Waiting for target designation...");
        sim.log("Multiple target selection enabled.");
        sim
    }

    pub fn missions(&self) -> &[Mission] {
        &self.missions
    }

    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    pub fn mission(&self, id: MissionId) -> Option<&Mission> {
        self.missions.iter().find(|m| m.id == id)
    }

    pub fn armed_count(&self) -> usize {
        self.count_where(|s| s == MissionStatus::Armed)
    }

    /// Missions still in play (the impacted instant is not counted)
    pub fn active_count(&self) -> usize {
        self.count_where(|s| s != MissionStatus::Complete && s != MissionStatus::Impacted)
    }

    fn count_where(&self, pred: impl Fn(MissionStatus) -> bool) -> usize {
        self.missions.iter().filter(|m| pred(m.status)).count()
    }

    fn log(&mut self, line: impl Into<String>) {
        self.logs.push(line.into());
        if self.logs.len() > MAX_LOG_LINES {
            let excess = self.logs.len() - MAX_LOG_LINES;
            self.logs.drain(..excess);
        }
    }

    fn mission_mut(&mut self, id: MissionId) -> Result<&mut Mission, TransitionError> {
        self.missions
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(TransitionError::UnknownMission(id))
    }

    /// Arm a new mission against `target`
    pub fn select_target(&mut self, target: Target) -> MissionId {
        let mission = Mission::new(target);
        let id = mission.id;
        self.log(format!("Target locked: {} [ID: {}]", mission.target.name, id.tag()));
        self.missions.push(mission);
        id
    }

    /// Launch every armed mission at once. Returns what left the silo.
    pub fn launch(&mut self) -> Vec<(MissionId, Target)> {
        let launched: Vec<(MissionId, Target)> = self
            .missions
            .iter_mut()
            .filter(|m| m.status == MissionStatus::Armed)
            .filter_map(|m| m.apply(MissionEvent::Launch).ok().map(|_| (m.id, m.target.clone())))
            .collect();

        if !launched.is_empty() {
            self.log(format!(
                "Launch authorization confirmed for {} vector(s).",
                launched.len()
            ));
            self.log("Initiating launch sequence...");
        }
        launched
    }

    /// Warhead arrived: launching -> impacted -> analyzing
    pub fn impact(&mut self, id: MissionId) -> Result<Target, TransitionError> {
        let mission = self.mission_mut(id)?;
        mission.apply(MissionEvent::Impact)?;
        mission.apply(MissionEvent::BeginAnalysis)?;
        let target = mission.target.clone();

        self.log(format!("Impact confirmed: {} [ID: {}]", target.name, id.tag()));
        self.log(format!("Deploying assessment drones for sector {}...", id.tag()));
        Ok(target)
    }

    /// The assessment call settled. Success or failure, the mission completes
    /// and exactly one report is filed at the head of the list.
    pub fn settle(
        &mut self,
        id: MissionId,
        outcome: Result<Assessment, ReportError>,
    ) -> Result<(), TransitionError> {
        let mission = self.mission_mut(id)?;
        mission.apply(MissionEvent::Settle)?;
        let name = mission.target.name.clone();

        let assessment = match outcome {
            Ok(assessment) => {
                self.log(format!("Analysis received for Sector {}.", name));
                assessment
            }
            Err(_) => {
                self.log(format!("Failed to analyze Sector {}.", name));
                Assessment::fallback(&name)
            }
        };

        self.reports.insert(0, Report::new(id, assessment));
        Ok(())
    }

    /// Forget every mission and report
    pub fn reset(&mut self) {
        self.missions.clear();
        self.reports.clear();
        self.logs.clear();
        self.log("System reset.");
        self.log("Waiting for target designation...");
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::FALLBACK_SUMMARY;

    fn assessment(location: &str) -> Assessment {
        Assessment {
            location: location.to_string(),
            impact_radius: "15.4 km".to_string(),
            casualty_estimate: "High probability of civilian displacement".to_string(),
            infrastructure_damage: "Grid offline".to_string(),
            environmental_impact: "Localized".to_string(),
            summary: "Target neutralized.".to_string(),
        }
    }

    fn is_prefix_of_sequence(history: &[MissionStatus]) -> bool {
        history.len() <= MissionStatus::SEQUENCE.len()
            && history.iter().zip(MissionStatus::SEQUENCE.iter()).all(|(a, b)| a == b)
    }

    fn reports_reference_complete_missions(sim: &Simulation) -> bool {
        sim.reports().iter().all(|r| {
            sim.mission(r.mission_id)
                .is_some_and(|m| m.status() == MissionStatus::Complete)
        })
    }

    #[test]
    fn test_selections_are_all_armed() {
        for n in 0..12 {
            let mut sim = Simulation::new();
            for i in 0..n {
                sim.select_target(Target::new(i as f64 * 10.0 - 60.0, i as f64 * 5.0 - 30.0));
            }
            assert_eq!(sim.missions().len(), n);
            assert!(sim.missions().iter().all(|m| m.status() == MissionStatus::Armed));
            assert_eq!(sim.armed_count(), n);
        }
    }

    #[test]
    fn test_mission_ids_are_distinct() {
        let mut sim = Simulation::new();
        let a = sim.select_target(Target::new(0.0, 0.0));
        let b = sim.select_target(Target::new(0.0, 0.0));
        assert_ne!(a, b);
    }

    #[test]
    fn test_launch_only_touches_armed() {
        let mut sim = Simulation::new();
        let first = sim.select_target(Target::new(10.0, 10.0));
        sim.launch();
        sim.impact(first).unwrap();
        let second = sim.select_target(Target::new(20.0, 20.0));
        let third = sim.select_target(Target::new(30.0, 30.0));

        let launched = sim.launch();
        let ids: Vec<MissionId> = launched.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![second, third]);

        assert_eq!(sim.mission(first).unwrap().status(), MissionStatus::Analyzing);
        assert_eq!(sim.mission(second).unwrap().status(), MissionStatus::Launching);
        assert_eq!(sim.mission(third).unwrap().status(), MissionStatus::Launching);
    }

    #[test]
    fn test_launch_with_nothing_armed_is_silent() {
        let mut sim = Simulation::new();
        let before = sim.logs().len();
        assert!(sim.launch().is_empty());
        assert_eq!(sim.logs().len(), before);
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        let mut sim = Simulation::new();
        let id = sim.select_target(Target::new(0.0, 0.0));

        // Cannot impact before launch
        assert_eq!(
            sim.impact(id),
            Err(TransitionError::Illegal {
                from: MissionStatus::Armed,
                event: MissionEvent::Impact
            })
        );
        // Cannot settle before analysis
        assert!(sim.settle(id, Ok(assessment("x"))).is_err());
        assert!(sim.reports().is_empty());
        assert_eq!(sim.mission(id).unwrap().history(), &[MissionStatus::Armed]);

        sim.launch();
        sim.impact(id).unwrap();
        // Double impact is a no-op error
        assert!(sim.impact(id).is_err());
        assert_eq!(sim.mission(id).unwrap().status(), MissionStatus::Analyzing);
    }

    #[test]
    fn test_status_history_is_prefix_of_sequence() {
        let mut sim = Simulation::new();
        let ids: Vec<MissionId> = (0..6)
            .map(|i| sim.select_target(Target::new(i as f64, i as f64)))
            .collect();

        // Advance missions to different depths, interleaved with bogus moves
        sim.launch();
        for (i, &id) in ids.iter().enumerate() {
            if i >= 2 {
                sim.impact(id).unwrap();
            }
            if i >= 4 {
                sim.settle(id, Ok(assessment("x"))).unwrap();
            }
            let _ = sim.impact(id);
            let _ = sim.settle(id, Err(ReportError::EmptyResponse));
        }

        for m in sim.missions() {
            assert!(is_prefix_of_sequence(m.history()), "{:?}", m.history());
            assert_eq!(m.history().last().copied(), Some(m.status()));
        }
        assert!(reports_reference_complete_missions(&sim));
    }

    #[test]
    fn test_full_lifecycle_scenario() {
        let mut sim = Simulation::new();
        let id = sim.select_target(Target::new(-78.0, 38.0));
        assert_eq!(sim.missions().len(), 1);
        assert_eq!(sim.mission(id).unwrap().status(), MissionStatus::Armed);
        assert_eq!(sim.mission(id).unwrap().target.name, "SECTOR 38N-78W");

        sim.launch();
        assert_eq!(sim.mission(id).unwrap().status(), MissionStatus::Launching);

        let target = sim.impact(id).unwrap();
        assert_eq!(target.name, "SECTOR 38N-78W");
        assert_eq!(
            sim.mission(id).unwrap().history(),
            &[
                MissionStatus::Armed,
                MissionStatus::Launching,
                MissionStatus::Impacted,
                MissionStatus::Analyzing
            ]
        );

        sim.settle(id, Ok(assessment("SECTOR 38N-78W"))).unwrap();
        assert_eq!(sim.mission(id).unwrap().status(), MissionStatus::Complete);
        assert_eq!(sim.reports().len(), 1);
        assert_eq!(sim.reports()[0].mission_id, id);
        assert_eq!(sim.reports()[0].assessment.summary, "Target neutralized.");
        assert_eq!(
            sim.logs().last().map(String::as_str),
            Some("Analysis received for Sector SECTOR 38N-78W.")
        );
    }

    #[test]
    fn test_failed_assessment_uses_fallback() {
        let mut sim = Simulation::new();
        let id = sim.select_target(Target::new(-78.0, 38.0));
        sim.launch();
        sim.impact(id).unwrap();
        sim.settle(id, Err(ReportError::MissingApiKey)).unwrap();

        assert_eq!(sim.mission(id).unwrap().status(), MissionStatus::Complete);
        assert_eq!(sim.reports().len(), 1);
        let report = &sim.reports()[0];
        assert_eq!(report.mission_id, id);
        assert_eq!(report.assessment.summary, FALLBACK_SUMMARY);
        assert_eq!(report.assessment.location, "SECTOR 38N-78W");
        assert!(sim.logs().iter().any(|l| l == "Failed to analyze Sector SECTOR 38N-78W."));
    }

    #[test]
    fn test_newest_report_first() {
        let mut sim = Simulation::new();
        let a = sim.select_target(Target::new(1.0, 1.0));
        let b = sim.select_target(Target::new(2.0, 2.0));
        sim.launch();
        sim.impact(a).unwrap();
        sim.impact(b).unwrap();
        // Responses arrive out of order
        sim.settle(b, Ok(assessment("b"))).unwrap();
        sim.settle(a, Ok(assessment("a"))).unwrap();
        assert_eq!(sim.reports()[0].mission_id, a);
        assert_eq!(sim.reports()[1].mission_id, b);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut sim = Simulation::new();
        let a = sim.select_target(Target::new(1.0, 1.0));
        sim.select_target(Target::new(2.0, 2.0));
        sim.launch();
        sim.impact(a).unwrap();
        sim.settle(a, Ok(assessment("a"))).unwrap();

        sim.reset();
        assert!(sim.missions().is_empty());
        assert!(sim.reports().is_empty());
        assert_eq!(sim.logs(), &["System reset.", "Waiting for target designation..."]);
        assert_eq!(sim.armed_count(), 0);
        assert_eq!(sim.active_count(), 0);
    }

    #[test]
    fn test_settle_after_reset_is_dropped() {
        let mut sim = Simulation::new();
        let id = sim.select_target(Target::new(1.0, 1.0));
        sim.launch();
        sim.impact(id).unwrap();
        sim.reset();

        assert_eq!(
            sim.settle(id, Ok(assessment("late"))),
            Err(TransitionError::UnknownMission(id))
        );
        assert!(sim.reports().is_empty());
    }

    #[test]
    fn test_counts() {
        let mut sim = Simulation::new();
        let a = sim.select_target(Target::new(1.0, 1.0));
        let b = sim.select_target(Target::new(2.0, 2.0));
        sim.launch();
        sim.select_target(Target::new(3.0, 3.0));
        sim.impact(a).unwrap();
        sim.impact(b).unwrap();
        sim.settle(b, Ok(assessment("b"))).unwrap();

        assert_eq!(sim.armed_count(), 1);
        // a analyzing + c armed
        assert_eq!(sim.active_count(), 2);
    }

    #[test]
    fn test_log_is_bounded() {
        let mut sim = Simulation::new();
        for i in 0..(MAX_LOG_LINES + 50) {
            sim.select_target(Target::new(i as f64 % 180.0, 0.0));
        }
        assert_eq!(sim.logs().len(), MAX_LOG_LINES);
        assert!(sim.logs()[0].starts_with("Target locked"));
    }
}
