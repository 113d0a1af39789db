//! CIEDE2000 color difference.
//!
//! Follows Sharma, Wu & Dalal (2005), "The CIEDE2000 Color-Difference
//! Formula: Implementation Notes, Supplementary Test Data, and Mathematical
//! Observations", with kL = kC = kH = 1.

use crate::types::ColorValue;

const POW25_7: f64 = 6_103_515_625.0; // 25^7

/// ΔE00 between two Lab colors. Alpha is ignored.
pub fn delta_e_2000(c1: &ColorValue, c2: &ColorValue) -> f64 {
    let c1_star = c1.a.hypot(c1.b);
    let c2_star = c2.a.hypot(c2.b);
    let c_bar7 = ((c1_star + c2_star) / 2.0).powi(7);
    let g = 0.5 * (1.0 - (c_bar7 / (c_bar7 + POW25_7)).sqrt());

    let a1p = (1.0 + g) * c1.a;
    let a2p = (1.0 + g) * c2.a;
    let c1p = a1p.hypot(c1.b);
    let c2p = a2p.hypot(c2.b);
    let h1p = hue_degrees(c1.b, a1p);
    let h2p = hue_degrees(c2.b, a2p);

    let delta_lp = c2.l - c1.l;
    let delta_cp = c2p - c1p;

    let chroma_product = c1p * c2p;
    let delta_hp = if chroma_product == 0.0 {
        0.0
    } else {
        let diff = h2p - h1p;
        if diff.abs() <= 180.0 {
            diff
        } else if diff > 180.0 {
            diff - 360.0
        } else {
            diff + 360.0
        }
    };
    let delta_big_hp = 2.0 * chroma_product.sqrt() * (delta_hp / 2.0).to_radians().sin();

    let l_bar_p = (c1.l + c2.l) / 2.0;
    let c_bar_p = (c1p + c2p) / 2.0;
    let h_bar_p = if chroma_product == 0.0 {
        h1p + h2p
    } else if (h1p - h2p).abs() <= 180.0 {
        (h1p + h2p) / 2.0
    } else if h1p + h2p < 360.0 {
        (h1p + h2p + 360.0) / 2.0
    } else {
        (h1p + h2p - 360.0) / 2.0
    };

    let t = 1.0 - 0.17 * (h_bar_p - 30.0).to_radians().cos()
        + 0.24 * (2.0 * h_bar_p).to_radians().cos()
        + 0.32 * (3.0 * h_bar_p + 6.0).to_radians().cos()
        - 0.20 * (4.0 * h_bar_p - 63.0).to_radians().cos();

    let delta_theta = 30.0 * (-((h_bar_p - 275.0) / 25.0).powi(2)).exp();
    let c_bar_p7 = c_bar_p.powi(7);
    let r_c = 2.0 * (c_bar_p7 / (c_bar_p7 + POW25_7)).sqrt();
    let l_dev = (l_bar_p - 50.0).powi(2);
    let s_l = 1.0 + 0.015 * l_dev / (20.0 + l_dev).sqrt();
    let s_c = 1.0 + 0.045 * c_bar_p;
    let s_h = 1.0 + 0.015 * c_bar_p * t;
    let r_t = -(2.0 * delta_theta).to_radians().sin() * r_c;

    let dl = delta_lp / s_l;
    let dc = delta_cp / s_c;
    let dh = delta_big_hp / s_h;

    (dl * dl + dc * dc + dh * dh + r_t * dc * dh).max(0.0).sqrt()
}

fn hue_degrees(b: f64, a_prime: f64) -> f64 {
    if b == 0.0 && a_prime == 0.0 {
        return 0.0;
    }
    let h = b.atan2(a_prime).to_degrees();
    if h < 0.0 {
        h + 360.0
    } else {
        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(l1: f64, a1: f64, b1: f64, l2: f64, a2: f64, b2: f64, expected: f64) {
        let c1 = ColorValue::lab(l1, a1, b1);
        let c2 = ColorValue::lab(l2, a2, b2);
        let forward = delta_e_2000(&c1, &c2);
        let backward = delta_e_2000(&c2, &c1);
        assert!(
            (forward - expected).abs() < 1e-4,
            "expected {expected}, got {forward}"
        );
        assert!((forward - backward).abs() < 1e-12);
    }

    // Rows from the Sharma et al. supplementary test data.
    #[test]
    fn test_reference_pairs() {
        check(50.0, 2.6772, -79.7751, 50.0, 0.0, -82.7485, 2.0425);
        check(50.0, 3.1571, -77.2803, 50.0, 0.0, -82.7485, 2.8615);
        check(50.0, 2.8361, -74.0200, 50.0, 0.0, -82.7485, 3.4412);
        check(50.0, 0.0, 0.0, 50.0, -1.0, 2.0, 2.3669);
        check(50.0, 2.5, 0.0, 73.0, 25.0, -18.0, 27.1492);
        check(50.0, 2.5, 0.0, 50.0, 0.0, -2.5, 4.3065);
    }

    #[test]
    fn test_identity() {
        let c = ColorValue::lab(62.0, -12.5, 40.0);
        assert_eq!(delta_e_2000(&c, &c), 0.0);
        let grey = ColorValue::lab(40.0, 0.0, 0.0);
        assert_eq!(delta_e_2000(&grey, &grey), 0.0);
    }
}
