//! Row construction: flatten one completed `Person` into output rows.

use abm_core::Mode;
use abm_population::{Person, Tour};

use crate::row::{ActivityRow, PersonSummaryRow, TourRow};

/// The full output of one person, in emission order: the summary row, then
/// tour rows in post-discard order, then activity rows in trip-chain order.
#[derive(Debug, Clone)]
pub struct PersonOutput {
    pub summary:    PersonSummaryRow,
    pub tours:      Vec<TourRow>,
    pub activities: Vec<ActivityRow>,
}

/// Build every output row for one person.
pub fn person_output(person: &Person) -> PersonOutput {
    let summary = PersonSummaryRow {
        person_id:   person.id.0,
        num_tours:   person.tours.len() as u32,
        person_type: person.person_type,
    };

    let mut tours = Vec::with_capacity(person.tours.len());
    let mut activities = Vec::new();

    for (i, tour) in person.tours.iter().enumerate() {
        let tour_num = i as u32 + 1;
        tours.push(tour_row(person, tour, tour_num));

        for (j, activity) in tour.trip_chain.iter().enumerate() {
            activities.push(ActivityRow {
                person_id:    person.id.0,
                tour_num,
                stop_num:     j as u32 + 1,
                primary:      activity.primary,
                purpose:      activity.purpose.as_str(),
                tour_purpose: tour.purpose.as_str(),
                mode:         mode_code(activity.mode),
                arrival:      activity.arrival.unwrap_or(0.0),
                departure:    activity.departure.unwrap_or(0.0),
                destination:  activity.destination.map(|z| z.0).unwrap_or(0),
            });
        }
    }

    PersonOutput { summary, tours, activities }
}

fn tour_row(person: &Person, tour: &Tour, tour_num: u32) -> TourRow {
    let primary = tour.primary_activity();
    TourRow {
        person_id:         person.id.0,
        tour_num,
        purpose:           tour.purpose.as_str(),
        mode:              mode_code(tour.mode),
        num_stops:         tour.num_stops() as u32,
        start_time:        tour.start_time.unwrap_or(0.0),
        end_time:          tour.end_time.unwrap_or(0.0),
        primary_arrival:   primary.and_then(|a| a.arrival).unwrap_or(0.0),
        primary_departure: primary.and_then(|a| a.departure).unwrap_or(0.0),
        destination:       tour.destination.map(|z| z.0).unwrap_or(0),
        walk_distance_first:  tour.walk_distance_first,
        walk_distance_second: tour.walk_distance_second,
    }
}

fn mode_code(mode: Option<Mode>) -> u8 {
    mode.map(Mode::code).unwrap_or(0)
}
