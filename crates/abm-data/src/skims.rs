//! Zone-to-zone travel-time and cost skims.
//!
//! # Shape
//!
//! Travel times are directional, bucketed by mode group (car-like modes share
//! one table, the transit modes another), and indexed by the 48-slot day
//! grid, with separate arrival-slot and departure-slot profiles.  A cell
//! holds `Some(hours)` or `None` — the explicit "unavailable" sentinel.
//! Callers map `None` to their own penalty; the table never invents a value.
//!
//! Costs come in three time-of-day periods (AM peak, PM peak, off-peak) per
//! origin-destination pair.  Walk times are derived from the AM/PM distance
//! skims rather than a time table, mirroring the estimation data the models
//! were fitted on.

use std::io::Read;

use rustc_hash::FxHashMap;

use abm_core::{Mode, ModeBucket, ZoneId, SLOT_COUNT};

use crate::{DataError, DataResult};

/// Assumed walking speed for distance-derived walk times, km/h.
pub const WALK_SPEED_KMH: f64 = 5.0;

// ── Period ────────────────────────────────────────────────────────────────────

/// Cost/distance skim period.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Period {
    AmPeak,
    PmPeak,
    OffPeak,
}

impl Period {
    /// Period of a 0-based day-grid slot: slots 9–12 (07:30–09:30) are the
    /// AM peak, slots 29–32 (17:30–19:30) the PM peak, everything else
    /// off-peak.
    pub fn of_slot(slot: usize) -> Period {
        match slot {
            9..=12 => Period::AmPeak,
            29..=32 => Period::PmPeak,
            _ => Period::OffPeak,
        }
    }

    fn index(self) -> usize {
        match self {
            Period::AmPeak => 0,
            Period::PmPeak => 1,
            Period::OffPeak => 2,
        }
    }
}

/// Which time profile a lookup reads: indexed by the slot the traveller
/// arrives in, or by the slot they depart in.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Direction {
    Arrival,
    Departure,
}

// ── Cells ─────────────────────────────────────────────────────────────────────

/// Per-slot travel times for one origin-destination pair, hours.
#[derive(Clone, Debug)]
pub struct TtProfile {
    pub arrival:   [Option<f64>; SLOT_COUNT],
    pub departure: [Option<f64>; SLOT_COUNT],
}

impl Default for TtProfile {
    fn default() -> Self {
        Self {
            arrival:   [None; SLOT_COUNT],
            departure: [None; SLOT_COUNT],
        }
    }
}

impl TtProfile {
    /// A profile with the same travel time in every slot — fixture helper.
    pub fn constant(tt: f64) -> Self {
        Self {
            arrival:   [Some(tt); SLOT_COUNT],
            departure: [Some(tt); SLOT_COUNT],
        }
    }

    fn get(&self, dir: Direction, slot: usize) -> Option<f64> {
        match dir {
            Direction::Arrival => self.arrival.get(slot).copied().flatten(),
            Direction::Departure => self.departure.get(slot).copied().flatten(),
        }
    }
}

/// Period cost skim cell for one origin-destination pair.
#[derive(Clone, Copy, Debug, Default)]
pub struct CostCell {
    /// Distance, km.
    pub distance: f64,
    /// Road-pricing charge for car modes.
    pub car_cost_erp: f64,
    /// Public-transport fare.
    pub pub_cost: f64,
}

// ── SkimTable ─────────────────────────────────────────────────────────────────

/// All zone-to-zone skims for one run.
#[derive(Default)]
pub struct SkimTable {
    car:     FxHashMap<(ZoneId, ZoneId), TtProfile>,
    transit: FxHashMap<(ZoneId, ZoneId), TtProfile>,
    costs:   [FxHashMap<(ZoneId, ZoneId), CostCell>; 3],
    parking: FxHashMap<ZoneId, f64>,
}

impl SkimTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Travel time in hours for `mode` from `origin` to `destination` at the
    /// given slot, or `None` if the skim marks the connection unavailable.
    ///
    /// An intra-zonal trip always takes zero time.
    pub fn travel_time(
        &self,
        mode:        Mode,
        origin:      ZoneId,
        destination: ZoneId,
        dir:         Direction,
        slot:        usize,
    ) -> Option<f64> {
        if origin == destination {
            return Some(0.0);
        }
        match mode.bucket() {
            ModeBucket::Car => self.car.get(&(origin, destination))?.get(dir, slot),
            ModeBucket::Transit => self.transit.get(&(origin, destination))?.get(dir, slot),
            ModeBucket::Walk => self.walk_time(origin, destination),
        }
    }

    /// Distance-derived walk time in hours, from the AM/PM distance skims.
    pub fn walk_time(&self, origin: ZoneId, destination: ZoneId) -> Option<f64> {
        if origin == destination {
            return Some(0.0);
        }
        let am = self.cost(Period::AmPeak, origin, destination)?;
        let pm = self.cost(Period::PmPeak, origin, destination)?;
        Some((am.distance - pm.distance) / WALK_SPEED_KMH)
    }

    pub fn cost(&self, period: Period, origin: ZoneId, destination: ZoneId) -> Option<&CostCell> {
        if origin == destination {
            return None;
        }
        self.costs[period.index()].get(&(origin, destination))
    }

    pub fn distance(&self, period: Period, origin: ZoneId, destination: ZoneId) -> Option<f64> {
        self.cost(period, origin, destination).map(|c| c.distance)
    }

    /// Hourly parking rate at `zone`; zones without an entry park free.
    pub fn parking_rate(&self, zone: ZoneId) -> f64 {
        self.parking.get(&zone).copied().unwrap_or(0.0)
    }

    // ── Builders ──────────────────────────────────────────────────────────

    /// Insert a travel-time profile.  `bucket` must be `Car` or `Transit`;
    /// walk times are distance-derived and have no profile table.
    pub fn insert_travel_times(
        &mut self,
        bucket:      ModeBucket,
        origin:      ZoneId,
        destination: ZoneId,
        profile:     TtProfile,
    ) {
        match bucket {
            ModeBucket::Car => {
                self.car.insert((origin, destination), profile);
            }
            ModeBucket::Transit => {
                self.transit.insert((origin, destination), profile);
            }
            ModeBucket::Walk => {
                debug_assert!(false, "walk has no travel-time table");
            }
        }
    }

    pub fn insert_cost(
        &mut self,
        period:      Period,
        origin:      ZoneId,
        destination: ZoneId,
        cell:        CostCell,
    ) {
        self.costs[period.index()].insert((origin, destination), cell);
    }

    pub fn set_parking_rate(&mut self, zone: ZoneId, rate: f64) {
        self.parking.insert(zone, rate);
    }

    // ── CSV loaders ───────────────────────────────────────────────────────

    /// Load travel-time profiles from CSV.
    ///
    /// Expected columns: `origin`, `destination`, then `tt_arrival_1` …
    /// `tt_arrival_48` and `tt_departure_1` … `tt_departure_48` (1-based
    /// slot numbers).  `NULL` or empty cells load as unavailable.
    pub fn load_travel_times_reader<R: Read>(
        &mut self,
        reader: R,
        bucket: ModeBucket,
    ) -> DataResult<()> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let headers = csv_reader
            .headers()
            .map_err(|e| DataError::Parse(e.to_string()))?
            .clone();

        let col = |name: &str| headers.iter().position(|h| h == name);
        let origin_col = col("origin")
            .ok_or_else(|| DataError::Parse("travel-time CSV has no origin column".into()))?;
        let dest_col = col("destination")
            .ok_or_else(|| DataError::Parse("travel-time CSV has no destination column".into()))?;

        let arrival_cols: Vec<Option<usize>> =
            (1..=SLOT_COUNT).map(|i| col(&format!("tt_arrival_{i}"))).collect();
        let departure_cols: Vec<Option<usize>> =
            (1..=SLOT_COUNT).map(|i| col(&format!("tt_departure_{i}"))).collect();

        for row in csv_reader.records() {
            let row = row.map_err(|e| DataError::Parse(e.to_string()))?;
            let origin = parse_zone(&row, origin_col)?;
            let destination = parse_zone(&row, dest_col)?;

            let mut profile = TtProfile::default();
            for slot in 0..SLOT_COUNT {
                profile.arrival[slot] = arrival_cols[slot].and_then(|c| parse_tt(&row, c));
                profile.departure[slot] = departure_cols[slot].and_then(|c| parse_tt(&row, c));
            }
            self.insert_travel_times(bucket, origin, destination, profile);
        }
        Ok(())
    }

    /// Load one period's cost skim from CSV with columns `origin`,
    /// `destination`, `distance`, `car_cost_erp`, `pub_cost`.
    pub fn load_costs_reader<R: Read>(&mut self, reader: R, period: Period) -> DataResult<()> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let headers = csv_reader
            .headers()
            .map_err(|e| DataError::Parse(e.to_string()))?
            .clone();
        let col = |name: &str| headers.iter().position(|h| h == name);

        let origin_col = col("origin")
            .ok_or_else(|| DataError::Parse("cost CSV has no origin column".into()))?;
        let dest_col = col("destination")
            .ok_or_else(|| DataError::Parse("cost CSV has no destination column".into()))?;
        let distance_col = col("distance");
        let erp_col = col("car_cost_erp");
        let fare_col = col("pub_cost");

        for row in csv_reader.records() {
            let row = row.map_err(|e| DataError::Parse(e.to_string()))?;
            let origin = parse_zone(&row, origin_col)?;
            let destination = parse_zone(&row, dest_col)?;
            let cell = CostCell {
                distance:     distance_col.and_then(|c| parse_tt(&row, c)).unwrap_or(0.0),
                car_cost_erp: erp_col.and_then(|c| parse_tt(&row, c)).unwrap_or(0.0),
                pub_cost:     fare_col.and_then(|c| parse_tt(&row, c)).unwrap_or(0.0),
            };
            self.insert_cost(period, origin, destination, cell);
        }
        Ok(())
    }
}

// ── Parse helpers ─────────────────────────────────────────────────────────────

fn parse_zone(row: &csv::StringRecord, col: usize) -> DataResult<ZoneId> {
    row.get(col)
        .and_then(|c| c.trim().parse::<u32>().ok())
        .map(ZoneId)
        .ok_or_else(|| DataError::Parse("bad zone id in skim CSV".into()))
}

fn parse_tt(row: &csv::StringRecord, col: usize) -> Option<f64> {
    let cell = row.get(col)?.trim();
    if cell.is_empty() || cell == "NULL" {
        return None;
    }
    cell.parse().ok()
}
