use approx::assert_relative_eq;
use chrono::{TimeZone, Utc};

use sat_pool_planner::config::TimeGrid;
use sat_pool_planner::observer::{observe, GroundObserver, SignalModel};
use sat_pool_planner::orbit::constants::EARTH_RADIUS_KM;
use sat_pool_planner::orbit::{
    propagate, sidereal_angle, to_ground_frame, ClassicalElements, OrbitalElementSet,
    PropagationModel,
};
use sat_pool_planner::visibility::TimelineBuilder;

fn circular(
    id: &str,
    inclination: f64,
    raan: f64,
    arg_latitude: f64,
    model: PropagationModel,
) -> OrbitalElementSet {
    OrbitalElementSet {
        id: id.into(),
        constellation: "starlink".into(),
        epoch: Utc.with_ymd_and_hms(2025, 9, 1, 3, 17, 42).unwrap(),
        elements: ClassicalElements {
            semi_major_axis_km: EARTH_RADIUS_KM + 550.0,
            eccentricity: 0.0,
            inclination_deg: inclination,
            raan_deg: raan,
            arg_perigee_deg: 0.0,
            mean_anomaly_deg: arg_latitude,
        },
        drag_term: 0.0,
        model,
    }
}

/// Starting position of a circular orbit written out from the elements.
fn starting_position(set: &OrbitalElementSet) -> [f64; 3] {
    let el = &set.elements;
    let a = el.semi_major_axis_km;
    let (so, co) = el.raan_deg.to_radians().sin_cos();
    let (si, ci) = el.inclination_deg.to_radians().sin_cos();
    let (su, cu) = (el.arg_perigee_deg + el.mean_anomaly_deg).to_radians().sin_cos();
    [
        a * (co * cu - so * su * ci),
        a * (so * cu + co * su * ci),
        a * su * si,
    ]
}

fn observer_at(lat: f64, lon: f64, altitude_m: f64, mask: f64) -> GroundObserver {
    GroundObserver {
        latitude_deg: lat,
        longitude_deg: lon,
        altitude_m,
        min_elevation_deg: mask,
    }
}

#[test]
fn range_at_epoch_matches_independent_distance() {
    let observers = [
        observer_at(24.94, 121.37, 50.0, 10.0),
        observer_at(-33.9, 18.4, 0.0, 5.0),
        observer_at(64.1, -21.9, 1200.0, 10.0),
    ];
    let sets = [
        circular("A", 53.0, 10.0, 40.0, PropagationModel::TwoBody),
        circular("B", 87.9, 200.0, 310.0, PropagationModel::J2Secular),
        circular("C", 97.6, 95.0, 180.0, PropagationModel::J2Secular),
    ];

    for set in &sets {
        let state = propagate(set, 0.0).unwrap();
        let expected_inertial = starting_position(set);
        for k in 0..3 {
            assert_relative_eq!(state.position[k], expected_inertial[k], epsilon = 1e-6);
        }

        let gmst = sidereal_angle(set.epoch, 0.0);
        let (s, c) = gmst.sin_cos();
        let p = expected_inertial;
        let ground = [c * p[0] + s * p[1], -s * p[0] + c * p[1], p[2]];

        for observer in &observers {
            let site = observer.position_ecef_km();
            let independent = ((ground[0] - site[0]).powi(2)
                + (ground[1] - site[1]).powi(2)
                + (ground[2] - site[2]).powi(2))
            .sqrt();
            let ground_position = to_ground_frame(state.position, set.epoch, 0.0);
            let observed = observe(ground_position, observer).unwrap();
            assert_relative_eq!(observed.range_km, independent, epsilon = 1e-6);
        }
    }
}

#[test]
fn visible_flag_always_matches_the_mask() {
    let epoch = Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap();
    let grid = TimeGrid { start: epoch, step_s: 20.0, steps: 600 };
    let observer = GroundObserver {
        latitude_deg: 24.94,
        longitude_deg: 121.37,
        ..Default::default()
    };
    let builder = TimelineBuilder::new(grid, observer, SignalModel::default());

    for (k, threshold) in [0.0, 5.0, 10.0, 25.0].into_iter().enumerate() {
        let (raan, arg_latitude) = (k as f64 * 45.0, k as f64 * 90.0);
        let set = circular("S", 53.0, raan, arg_latitude, PropagationModel::J2Secular);
        let timeline = builder.build(&set, threshold).unwrap();
        assert_eq!(timeline.samples.len(), 600);
        for sample in &timeline.samples {
            assert_eq!(sample.visible, sample.elevation_deg >= threshold);
            assert!(sample.range_km > 0.0);
            assert!((0.0..360.0).contains(&sample.azimuth_deg));
        }
    }
}

#[test]
fn signal_falls_with_range_along_a_pass() {
    let epoch = Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap();
    let grid = TimeGrid { start: epoch, step_s: 10.0, steps: 1200 };
    let observer = GroundObserver { latitude_deg: 0.0, longitude_deg: 0.0, ..Default::default() };
    let builder = TimelineBuilder::new(grid, observer, SignalModel::default());
    let set = circular("EQ", 0.0, 0.0, 0.0, PropagationModel::TwoBody);
    let timeline = builder.build(&set, 10.0).unwrap();
    let visible: Vec<_> = timeline.samples.iter().filter(|s| s.visible).collect();
    assert!(!visible.is_empty());
    let nearest = visible.iter().min_by(|a, b| a.range_km.total_cmp(&b.range_km)).unwrap();
    let farthest = visible.iter().max_by(|a, b| a.range_km.total_cmp(&b.range_km)).unwrap();
    assert!(nearest.signal_dbm > farthest.signal_dbm);
}
