//! The model repository: one immutable model per decision point.
//!
//! Models are loaded once per worker from a manifest — a JSON object mapping
//! decision-point names to model-file paths, resolved relative to the
//! manifest's directory:
//!
//! ```json
//! {
//!     "Day Pattern": "models/day_pattern.json",
//!     "Number Of Tours Work": "models/ntw.json",
//!     "Tour Mode Work": "models/tmw.json"
//! }
//! ```
//!
//! Any load failure is a `ModelDefinition` error and aborts the run — a bad
//! model would corrupt every person, not one.

use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;

use abm_core::Purpose;

use crate::model::ChoiceModel;
use crate::{ChoiceError, ChoiceResult};

// ── DecisionPoint ─────────────────────────────────────────────────────────────

/// Every decision point in the day-simulation sequence.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum DecisionPoint {
    DayPattern,
    NumToursWork,
    NumToursEducation,
    NumToursShopping,
    NumToursOthers,
    AttendUsualWork,
    TourModeWork,
    TourModeEducation,
    TourModeDestinationWork,
    TourModeDestinationShopping,
    TourModeDestinationOthers,
    TourTimeOfDayWork,
    TourTimeOfDayEducation,
    TourTimeOfDayOthers,
    StopGeneration,
    StopModeDestination,
    StopTimeOfDay,
    WorkBasedSubTours,
}

impl DecisionPoint {
    pub const ALL: [DecisionPoint; 18] = [
        DecisionPoint::DayPattern,
        DecisionPoint::NumToursWork,
        DecisionPoint::NumToursEducation,
        DecisionPoint::NumToursShopping,
        DecisionPoint::NumToursOthers,
        DecisionPoint::AttendUsualWork,
        DecisionPoint::TourModeWork,
        DecisionPoint::TourModeEducation,
        DecisionPoint::TourModeDestinationWork,
        DecisionPoint::TourModeDestinationShopping,
        DecisionPoint::TourModeDestinationOthers,
        DecisionPoint::TourTimeOfDayWork,
        DecisionPoint::TourTimeOfDayEducation,
        DecisionPoint::TourTimeOfDayOthers,
        DecisionPoint::StopGeneration,
        DecisionPoint::StopModeDestination,
        DecisionPoint::StopTimeOfDay,
        DecisionPoint::WorkBasedSubTours,
    ];

    /// The manifest key for this decision point.
    pub fn name(self) -> &'static str {
        match self {
            DecisionPoint::DayPattern => "Day Pattern",
            DecisionPoint::NumToursWork => "Number Of Tours Work",
            DecisionPoint::NumToursEducation => "Number Of Tours Education",
            DecisionPoint::NumToursShopping => "Number Of Tours Shopping",
            DecisionPoint::NumToursOthers => "Number Of Tours Others",
            DecisionPoint::AttendUsualWork => "Attend Usual Work",
            DecisionPoint::TourModeWork => "Tour Mode Work",
            DecisionPoint::TourModeEducation => "Tour Mode Education",
            DecisionPoint::TourModeDestinationWork => "Tour Mode/Destination Work",
            DecisionPoint::TourModeDestinationShopping => "Tour Mode/Destination Shopping",
            DecisionPoint::TourModeDestinationOthers => "Tour Mode/Destination Others",
            DecisionPoint::TourTimeOfDayWork => "Tour Time Of Day Work",
            DecisionPoint::TourTimeOfDayEducation => "Tour Time Of Day Education",
            DecisionPoint::TourTimeOfDayOthers => "Tour Time Of Day Others",
            DecisionPoint::StopGeneration => "Intermediate Stop Generation",
            DecisionPoint::StopModeDestination => "Intermediate Stop Mode/Destination",
            DecisionPoint::StopTimeOfDay => "Intermediate Stop Time Of Day",
            DecisionPoint::WorkBasedSubTours => "Work Based Sub-Tours",
        }
    }

    fn from_name(name: &str) -> Option<DecisionPoint> {
        DecisionPoint::ALL.into_iter().find(|dp| dp.name() == name)
    }

    /// The tour-count model for a purpose.
    pub fn num_tours(purpose: Purpose) -> DecisionPoint {
        match purpose {
            Purpose::Work => DecisionPoint::NumToursWork,
            Purpose::Education => DecisionPoint::NumToursEducation,
            Purpose::Shopping => DecisionPoint::NumToursShopping,
            Purpose::Others => DecisionPoint::NumToursOthers,
        }
    }

    /// The mode-only model for usual-location tours (fixed workplace or
    /// school).  Shopping and Others tours never have a usual location.
    pub fn tour_mode(purpose: Purpose) -> Option<DecisionPoint> {
        match purpose {
            Purpose::Work => Some(DecisionPoint::TourModeWork),
            Purpose::Education => Some(DecisionPoint::TourModeEducation),
            Purpose::Shopping | Purpose::Others => None,
        }
    }

    /// The joint mode/destination model for non-usual-location tours.
    /// Education tours always use their usual location.
    pub fn tour_mode_destination(purpose: Purpose) -> Option<DecisionPoint> {
        match purpose {
            Purpose::Work => Some(DecisionPoint::TourModeDestinationWork),
            Purpose::Shopping => Some(DecisionPoint::TourModeDestinationShopping),
            Purpose::Others => Some(DecisionPoint::TourModeDestinationOthers),
            Purpose::Education => None,
        }
    }

    /// The time-of-day model for a tour purpose.  Shopping shares the
    /// Others model.
    pub fn tour_time_of_day(purpose: Purpose) -> DecisionPoint {
        match purpose {
            Purpose::Work => DecisionPoint::TourTimeOfDayWork,
            Purpose::Education => DecisionPoint::TourTimeOfDayEducation,
            Purpose::Shopping | Purpose::Others => DecisionPoint::TourTimeOfDayOthers,
        }
    }
}

impl std::fmt::Display for DecisionPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ── ModelRepository ───────────────────────────────────────────────────────────

/// All loaded models for one worker.
///
/// Workers never share a repository: availability toggling makes models
/// transiently mutable, so each worker clones (or re-loads) its own copy.
#[derive(Clone, Default, Debug)]
pub struct ModelRepository {
    models: HashMap<DecisionPoint, ChoiceModel>,
}

impl ModelRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every model named in a manifest file.
    pub fn load_manifest(path: &Path) -> ChoiceResult<Self> {
        let file = std::fs::File::open(path)?;
        let entries: IndexMap<String, String> = serde_json::from_reader(file)
            .map_err(|e| ChoiceError::ModelDefinition(format!("manifest {}: {e}", path.display())))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let mut repository = Self::new();
        for (name, model_path) in entries {
            let decision = DecisionPoint::from_name(&name).ok_or_else(|| {
                ChoiceError::ModelDefinition(format!("manifest names unknown decision point {name:?}"))
            })?;
            let model = ChoiceModel::from_path(&base.join(model_path))?;
            repository.insert(decision, model);
        }
        Ok(repository)
    }

    pub fn insert(&mut self, decision: DecisionPoint, model: ChoiceModel) {
        self.models.insert(decision, model);
    }

    pub fn contains(&self, decision: DecisionPoint) -> bool {
        self.models.contains_key(&decision)
    }

    pub fn get(&self, decision: DecisionPoint) -> ChoiceResult<&ChoiceModel> {
        self.models.get(&decision).ok_or_else(|| {
            ChoiceError::ModelDefinition(format!("no model loaded for {:?}", decision.name()))
        })
    }

    pub fn get_mut(&mut self, decision: DecisionPoint) -> ChoiceResult<&mut ChoiceModel> {
        self.models.get_mut(&decision).ok_or_else(|| {
            ChoiceError::ModelDefinition(format!("no model loaded for {:?}", decision.name()))
        })
    }
}
