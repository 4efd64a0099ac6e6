//! Conversions between RGB and the HLS, HSV and YIQ spaces.
//!
//! All functions work on unit floats: RGB channels in [0, 1] and hue as a
//! fraction of a full turn. Scaling to the user-facing conventions (hue in
//! degrees, RGB in 0..=255) happens in the parent module.

const ONE_THIRD: f64 = 1.0 / 3.0;
const ONE_SIXTH: f64 = 1.0 / 6.0;
const TWO_THIRD: f64 = 2.0 / 3.0;

pub fn rgb_to_yiq(r: f64, g: f64, b: f64) -> [f64; 3] {
    let y = 0.30 * r + 0.59 * g + 0.11 * b;
    let i = 0.74 * (r - y) - 0.27 * (b - y);
    let q = 0.48 * (r - y) + 0.41 * (b - y);
    [y, i, q]
}

pub fn yiq_to_rgb(y: f64, i: f64, q: f64) -> [f64; 3] {
    // Exact inverse of the forward matrix above.
    let r = y + 0.946_882_217_090_069_3 * i + 0.623_556_581_986_143_3 * q;
    let g = y - 0.274_787_646_298_978_34 * i - 0.635_691_079_187_380_1 * q;
    let b = y - 1.108_545_034_642_032_2 * i + 1.709_006_928_406_466_6 * q;
    [r.clamp(0.0, 1.0), g.clamp(0.0, 1.0), b.clamp(0.0, 1.0)]
}

/// Hue fraction shared by the HLS and HSV forward conversions.
fn hue(r: f64, g: f64, b: f64, maxc: f64, rangec: f64) -> f64 {
    let rc = (maxc - r) / rangec;
    let gc = (maxc - g) / rangec;
    let bc = (maxc - b) / rangec;
    let h = if r == maxc {
        bc - gc
    } else if g == maxc {
        2.0 + rc - bc
    } else {
        4.0 + gc - rc
    };
    (h / 6.0).rem_euclid(1.0)
}

pub fn rgb_to_hls(r: f64, g: f64, b: f64) -> [f64; 3] {
    let maxc = r.max(g).max(b);
    let minc = r.min(g).min(b);
    let sumc = maxc + minc;
    let rangec = maxc - minc;
    let l = sumc / 2.0;
    if minc == maxc {
        return [0.0, l, 0.0];
    }
    let s = if l <= 0.5 {
        rangec / sumc
    } else {
        rangec / (2.0 - maxc - minc)
    };
    [hue(r, g, b, maxc, rangec), l, s]
}

pub fn hls_to_rgb(h: f64, l: f64, s: f64) -> [f64; 3] {
    if s == 0.0 {
        return [l, l, l];
    }
    let m2 = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let m1 = 2.0 * l - m2;
    [
        hls_channel(m1, m2, h + ONE_THIRD),
        hls_channel(m1, m2, h),
        hls_channel(m1, m2, h - ONE_THIRD),
    ]
}

fn hls_channel(m1: f64, m2: f64, hue: f64) -> f64 {
    let hue = hue.rem_euclid(1.0);
    if hue < ONE_SIXTH {
        m1 + (m2 - m1) * hue * 6.0
    } else if hue < 0.5 {
        m2
    } else if hue < TWO_THIRD {
        m1 + (m2 - m1) * (TWO_THIRD - hue) * 6.0
    } else {
        m1
    }
}

pub fn rgb_to_hsv(r: f64, g: f64, b: f64) -> [f64; 3] {
    let maxc = r.max(g).max(b);
    let minc = r.min(g).min(b);
    let rangec = maxc - minc;
    let v = maxc;
    if minc == maxc {
        return [0.0, 0.0, v];
    }
    [hue(r, g, b, maxc, rangec), rangec / maxc, v]
}

pub fn hsv_to_rgb(h: f64, s: f64, v: f64) -> [f64; 3] {
    if s == 0.0 {
        return [v, v, v];
    }
    let sector = (h * 6.0).trunc();
    let f = h * 6.0 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match (sector as i64).rem_euclid(6) {
        0 => [v, t, p],
        1 => [q, v, p],
        2 => [p, v, t],
        3 => [p, q, v],
        4 => [t, p, v],
        _ => [v, p, q],
    }
}
