//! Great-circle distance via the spherical law of cosines, using each
//! point's precomputed `cos_lat` the way [`crate::parser::Position`]
//! carries it.

const EARTH_RADIUS_KM: f64 = 6371.0;

pub fn law_of_cosines_km(lat1: f64, cos_lat1: f64, lng1: f64, lat2: f64, cos_lat2: f64, lng2: f64) -> f64 {
    let central_angle_cos = lat1.sin() * lat2.sin() + cos_lat1 * cos_lat2 * (lng2 - lng1).cos();
    EARTH_RADIUS_KM * central_angle_cos.clamp(-1.0, 1.0).acos()
}
