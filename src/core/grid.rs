use crate::domain::model::{Coordinate, Region};

/// 緯度 1 度約 111 km
pub const LAT_DEGREE_KM: f64 = 111.0;

const GEOHASH_ALPHABET: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// 半徑換算成 (緯度, 經度) 的度數跨度；經度依中心緯度壓縮
pub fn degree_spans(center: Coordinate, radius_km: f64) -> (f64, f64) {
    let lon_degree_km = LAT_DEGREE_KM * center.lat.to_radians().cos();
    (radius_km / LAT_DEGREE_KM, radius_km / lon_degree_km)
}

/// 以中心點與半徑圍出的矩形，邊界包含在內
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    pub fn around(center: Coordinate, radius_km: f64) -> Self {
        let (span_lat, span_lng) = degree_spans(center, radius_km);
        Self {
            north: center.lat + span_lat,
            south: center.lat - span_lat,
            east: center.lng + span_lng,
            west: center.lng - span_lng,
        }
    }

    pub fn contains(&self, point: Coordinate) -> bool {
        (self.south..=self.north).contains(&point.lat) && (self.west..=self.east).contains(&point.lng)
    }
}

/// 標準 geohash（base32），經度位元在前
pub fn geohash(point: Coordinate, precision: usize) -> String {
    let mut lat_range = (-90.0_f64, 90.0_f64);
    let mut lng_range = (-180.0_f64, 180.0_f64);
    let mut hash = String::with_capacity(precision);
    let (mut bits, mut bit_count, mut lng_bit) = (0usize, 0, true);

    while hash.len() < precision {
        let (range, value) = if lng_bit {
            (&mut lng_range, point.lng)
        } else {
            (&mut lat_range, point.lat)
        };
        let mid = (range.0 + range.1) / 2.0;
        bits <<= 1;
        if value >= mid {
            bits |= 1;
            range.0 = mid;
        } else {
            range.1 = mid;
        }
        lng_bit = !lng_bit;
        bit_count += 1;

        if bit_count == 5 {
            hash.push(GEOHASH_ALPHABET[bits] as char);
            bits = 0;
            bit_count = 0;
        }
    }
    hash
}

/// 以 `center` 為中心、邊長 `2 * radius_km` 的正方形內產生 `steps x steps` 個探測點。
///
/// 使用局部平面近似：經度 1 度 = `111 * cos(中心緯度)` km，整個網格共用同一個壓縮比，
/// 只適合小半徑。`steps <= 1` 時只回傳中心點；`steps` 為奇數時正中央的點就是 `center`。
/// 順序為 row-major，`i`（緯度）在外層、`j`（經度）在內層。
pub fn generate_grid(center: Coordinate, radius_km: f64, steps: usize) -> Vec<Coordinate> {
    if steps <= 1 {
        return vec![center];
    }

    let (span_lat, span_lng) = degree_spans(center, radius_km);

    let last = (steps - 1) as f64;
    let fraction = |index: usize| (index as f64 / last - 0.5) * 2.0;

    let mut points = Vec::with_capacity(steps * steps);
    for i in 0..steps {
        let frac_i = fraction(i);
        for j in 0..steps {
            let frac_j = fraction(j);
            points.push(Coordinate::new(
                center.lat + frac_i * span_lat,
                center.lng + frac_j * span_lng,
            ));
        }
    }
    points
}

impl Region {
    pub fn probe_points(&self) -> Vec<Coordinate> {
        generate_grid(self.center, self.radius_km, self.steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CENTER: Coordinate = Coordinate {
        lat: 37.5,
        lng: 127.0,
    };

    #[test]
    fn test_single_step_returns_center() {
        assert_eq!(generate_grid(CENTER, 1.0, 1), vec![CENTER]);
        assert_eq!(generate_grid(CENTER, 1.0, 0), vec![CENTER]);
    }

    #[test]
    fn test_three_steps_reproduces_center() {
        let points = generate_grid(CENTER, 1.0, 3);
        assert_eq!(points.len(), 9);
        // (1,1) in row-major order
        assert_eq!(points[4], CENTER);
    }

    #[test]
    fn test_odd_steps_center_is_exact() {
        for steps in [5, 7, 9] {
            let points = generate_grid(CENTER, 2.5, steps);
            let mid = (steps - 1) / 2;
            assert_eq!(points[mid * steps + mid], CENTER, "steps = {}", steps);
        }
    }

    #[test]
    fn test_corners_follow_flat_earth_spans() {
        let points = generate_grid(CENTER, 1.0, 3);
        let lon_degree_km = 111.0 * 37.5_f64.to_radians().cos();
        assert!((lon_degree_km - 88.07).abs() < 0.01);

        // i = 2 (north), j = 0 (west)
        let north_west = points[6];
        assert!((north_west.lat - 37.5090).abs() < 1e-4);
        assert!((north_west.lng - (127.0 - 1.0 / lon_degree_km)).abs() < 1e-9);

        // i = 0 (south), j = 2 (east)
        let south_east = points[2];
        assert!((south_east.lat - (37.5 - 1.0 / 111.0)).abs() < 1e-9);
        assert!(south_east.lng > CENTER.lng);
    }

    #[test]
    fn test_row_major_ordering() {
        let points = generate_grid(CENTER, 1.0, 2);
        assert_eq!(points.len(), 4);
        assert!(points[0].lat < CENTER.lat && points[0].lng < CENTER.lng);
        assert!(points[1].lat < CENTER.lat && points[1].lng > CENTER.lng);
        assert!(points[2].lat > CENTER.lat && points[2].lng < CENTER.lng);
        assert_eq!(points[0].lat, points[1].lat);
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(generate_grid(CENTER, 0.8, 4), generate_grid(CENTER, 0.8, 4));
    }

    #[test]
    fn test_bounding_box_matches_grid_corners() {
        let bounds = BoundingBox::around(CENTER, 1.0);
        let points = generate_grid(CENTER, 1.0, 3);
        assert_eq!(bounds.south, points[0].lat);
        assert_eq!(bounds.west, points[0].lng);
        assert_eq!(bounds.north, points[8].lat);
        assert_eq!(bounds.east, points[8].lng);

        assert!(bounds.contains(CENTER));
        assert!(bounds.contains(points[6]));
        assert!(!bounds.contains(Coordinate::new(37.52, 127.0)));
        assert!(!bounds.contains(Coordinate::new(37.5, 126.98)));
    }

    #[test]
    fn test_geohash_known_values() {
        assert_eq!(geohash(Coordinate::new(57.64911, 10.40744), 11), "u4pruydqqvj");
        assert_eq!(geohash(CENTER, 4), "wydm");
        assert_eq!(geohash(Coordinate::new(37.5563, 126.9019), 4), "wydj");
    }

    #[test]
    fn test_region_probe_points() {
        let region = Region {
            name: "망원동".to_string(),
            center: CENTER,
            radius_km: 0.8,
            steps: 3,
        };
        assert_eq!(region.probe_points().len(), 9);
    }
}
