use crate::error::SimError;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// (m) Minimum distance past the start line at which the line checkpoint can be passed.
pub const LINE_CHECKPOINT_MARGIN: f64 = 2.0;

/// * `name` - Track name
/// * `centerline_file` - CSV file with the centerline (x_m, y_m, w_tr_left_m, w_tr_right_m); if
/// not set or not readable a procedural ellipse is used
/// * `radius_x`, `radius_z` - (m) Semi-axes of the procedural ellipse
/// * `no_points` - Number of centerline points of the procedural ellipse
/// * `half_width` - (m) Distance from the centerline up to which a car is on track (procedural
/// track only, CSV tracks use their widths)
/// * `d_first_gridpos` - (m) Distance between the start line and the last grid position, should
/// be larger than twice the checkpoint radius plus `LINE_CHECKPOINT_MARGIN`
/// * `d_per_gridpos` - (m) Distance between two grid positions along the track
/// * `grid_lateral_offset` - (m) Lateral stagger of the grid positions
/// * `drs_zones` - Start and end of the DRS zones as lap fractions of the angular progress
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct TrackPars {
    pub name: String,
    pub centerline_file: Option<PathBuf>,
    pub radius_x: f64,
    pub radius_z: f64,
    pub no_points: usize,
    pub half_width: f64,
    pub d_first_gridpos: f64,
    pub d_per_gridpos: f64,
    pub grid_lateral_offset: f64,
    pub drs_zones: Vec<[f64; 2]>,
}

impl Default for TrackPars {
    fn default() -> Self {
        TrackPars {
            name: String::from("Oval"),
            centerline_file: None,
            radius_x: 400.0,
            radius_z: 250.0,
            no_points: 256,
            half_width: 12.0,
            d_first_gridpos: 70.0,
            d_per_gridpos: 8.0,
            grid_lateral_offset: 3.0,
            drs_zones: vec![[0.92, 0.06], [0.42, 0.56]],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CsvTrackEl {
    pub x_m: f64,
    pub y_m: f64,
    pub w_tr_left_m: f64,
    pub w_tr_right_m: f64,
}

/// TrackCheckpoint is an anchor on the centerline plus the per-entity `passed` flag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackCheckpoint {
    pub anchor: [f64; 2],
    pub passed: bool,
}

/// Track is the static, read-only geometry shared by all cars. Coordinates are on the ground
/// plane as [x, z].
#[derive(Debug, Clone)]
pub struct Track {
    pub name: String,
    pub centerline: Vec<[f64; 2]>,
    pub center: [f64; 2],
    pub half_width: f64,
    pub length: f64,
    pub d_first_gridpos: f64,
    pub d_per_gridpos: f64,
    pub grid_lateral_offset: f64,
    pub drs_zones: Vec<[f64; 2]>,
    // cumulated distance at every centerline point, the last entry closes the loop
    s_cum: Vec<f64>,
    // angular progress of every centerline point
    point_progress: Vec<f64>,
    start_angle: f64,
    // +1.0 if the centerline runs counter-clockwise around the center, -1.0 otherwise
    direction: f64,
}

/// read_centerline_csv reads a centerline in the usual x_m, y_m, w_tr_left_m, w_tr_right_m format.
/// The y coordinate of the file maps onto z of the ground plane. Returns the points and the mean
/// half width.
pub fn read_centerline_csv(filepath: &Path) -> anyhow::Result<(Vec<[f64; 2]>, f64)> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open track file {}!",
            filepath.to_string_lossy()
        ))?;

    let mut csv_reader = csv::Reader::from_reader(&fh);
    let mut centerline = vec![];
    let mut width_sum = 0.0;

    for result in csv_reader.deserialize() {
        let csv_track_el: CsvTrackEl = result.context(format!(
            "Failed to parse track file {}!",
            filepath.to_string_lossy()
        ))?;
        width_sum += (csv_track_el.w_tr_left_m + csv_track_el.w_tr_right_m) / 2.0;
        centerline.push([csv_track_el.x_m, csv_track_el.y_m]);
    }

    let half_width = if centerline.is_empty() {
        0.0
    } else {
        width_sum / centerline.len() as f64
    };
    Ok((centerline, half_width))
}

/// ellipse returns `no_points` points on an ellipse around the origin, counter-clockwise,
/// starting on the positive x axis.
pub fn ellipse(radius_x: f64, radius_z: f64, no_points: usize) -> Vec<[f64; 2]> {
    (0..no_points)
        .map(|i| {
            let theta = 2.0 * PI * i as f64 / no_points as f64;
            [radius_x * theta.cos(), radius_z * theta.sin()]
        })
        .collect()
}

fn dist(a: [f64; 2], b: [f64; 2]) -> f64 {
    ((b[0] - a[0]).powi(2) + (b[1] - a[1]).powi(2)).sqrt()
}

fn dist_to_segment(p: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    let ab = [b[0] - a[0], b[1] - a[1]];
    let len_sq = ab[0] * ab[0] + ab[1] * ab[1];
    if len_sq <= 0.0 {
        return dist(p, a);
    }
    let t = (((p[0] - a[0]) * ab[0] + (p[1] - a[1]) * ab[1]) / len_sq).clamp(0.0, 1.0);
    dist(p, [a[0] + t * ab[0], a[1] + t * ab[1]])
}

impl Track {
    pub fn new(
        name: &str,
        centerline: Vec<[f64; 2]>,
        half_width: f64,
        track_pars: &TrackPars,
    ) -> Result<Track, SimError> {
        let n = centerline.len();
        if n < 3 {
            return Err(SimError::TrackTooShort(n));
        }
        if let Some(p) = centerline
            .iter()
            .find(|p| !p[0].is_finite() || !p[1].is_finite())
        {
            return Err(SimError::InvalidParameter {
                name: "centerline",
                value: if p[0].is_finite() { p[1] } else { p[0] },
            });
        }
        if !(half_width > 0.0) || !half_width.is_finite() {
            return Err(SimError::InvalidParameter {
                name: "half_width",
                value: half_width,
            });
        }

        // center and orientation (shoelace formula)
        let center = [
            centerline.iter().map(|p| p[0]).sum::<f64>() / n as f64,
            centerline.iter().map(|p| p[1]).sum::<f64>() / n as f64,
        ];
        let mut area2 = 0.0;
        for i in 0..n {
            let a = centerline[i];
            let b = centerline[(i + 1) % n];
            area2 += a[0] * b[1] - b[0] * a[1];
        }
        let direction = if area2 < 0.0 { -1.0 } else { 1.0 };

        // cumulated distance
        let mut s_cum = Vec::with_capacity(n + 1);
        s_cum.push(0.0);
        for i in 0..n {
            let s_prev = s_cum[i];
            s_cum.push(s_prev + dist(centerline[i], centerline[(i + 1) % n]));
        }
        let length = s_cum[n];
        if !(length > 0.0) {
            return Err(SimError::InvalidParameter {
                name: "track_length",
                value: length,
            });
        }

        let start_angle = (centerline[0][1] - center[1]).atan2(centerline[0][0] - center[0]);

        let mut track = Track {
            name: name.to_owned(),
            centerline,
            center,
            half_width,
            length,
            d_first_gridpos: track_pars.d_first_gridpos,
            d_per_gridpos: track_pars.d_per_gridpos,
            grid_lateral_offset: track_pars.grid_lateral_offset,
            drs_zones: track_pars.drs_zones.to_owned(),
            s_cum,
            point_progress: vec![],
            start_angle,
            direction,
        };
        track.point_progress = track
            .centerline
            .iter()
            .map(|&p| track.angular_progress(p))
            .collect();

        Ok(track)
    }

    /// from_pars creates the track from a CSV centerline, falling back to the procedural
    /// ellipse if the file is not set or cannot be read.
    pub fn from_pars(track_pars: &TrackPars) -> anyhow::Result<Track> {
        if let Some(path) = &track_pars.centerline_file {
            match read_centerline_csv(path) {
                Ok((centerline, half_width)) => {
                    return Track::new(&track_pars.name, centerline, half_width, track_pars)
                        .context(format!("Invalid track file {}!", path.to_string_lossy()));
                }
                Err(e) => log::warn!("{:#}, using procedural track instead", e),
            }
        }

        let centerline = ellipse(
            track_pars.radius_x,
            track_pars.radius_z,
            track_pars.no_points,
        );
        let track = Track::new(
            &track_pars.name,
            centerline,
            track_pars.half_width,
            track_pars,
        )?;
        Ok(track)
    }

    /// angular_progress returns the position around the track center as a lap fraction in
    /// [0, 1[, measured from the start line in driving direction. This is a progress proxy that
    /// is only exact for star-convex layouts.
    pub fn angular_progress(&self, p: [f64; 2]) -> f64 {
        let angle = (p[1] - self.center[1]).atan2(p[0] - self.center[0]);
        let rel = ((angle - self.start_angle) * self.direction).rem_euclid(2.0 * PI);
        let frac = rel / (2.0 * PI);
        if frac.is_finite() && frac < 1.0 {
            frac
        } else {
            0.0
        }
    }

    /// lane_point returns the centerline point whose angular progress is closest to `progress`,
    /// scaled around the track center by `lane_scale` (1.0 = centerline).
    pub fn lane_point(&self, progress: f64, lane_scale: f64) -> [f64; 2] {
        let target = progress.rem_euclid(1.0);
        let mut idx_best = 0;
        let mut d_best = f64::INFINITY;

        for (i, &pp) in self.point_progress.iter().enumerate() {
            let d = (pp - target).abs();
            let d = d.min(1.0 - d);
            if d < d_best {
                d_best = d;
                idx_best = i;
            }
        }

        let p = self.centerline[idx_best];
        [
            self.center[0] + (p[0] - self.center[0]) * lane_scale,
            self.center[1] + (p[1] - self.center[1]) * lane_scale,
        ]
    }

    pub fn distance_to_centerline(&self, p: [f64; 2]) -> f64 {
        let n = self.centerline.len();
        (0..n)
            .map(|i| dist_to_segment(p, self.centerline[i], self.centerline[(i + 1) % n]))
            .fold(f64::INFINITY, f64::min)
    }

    pub fn is_off_track(&self, p: [f64; 2]) -> bool {
        self.distance_to_centerline(p) > self.half_width
    }

    /// is_in_drs_zone checks a lap fraction against the DRS zones, zones may wrap around the
    /// start line.
    pub fn is_in_drs_zone(&self, progress: f64) -> bool {
        for zone in &self.drs_zones {
            if zone[0] < zone[1] {
                // normal case: zone does not wrap around the start line
                if progress >= zone[0] && progress <= zone[1] {
                    return true;
                }
            } else {
                // wrap-around case: zone crosses the start line
                if progress >= zone[0] || progress <= zone[1] {
                    return true;
                }
            }
        }
        false
    }

    /// point_at_s returns the centerline position and its tangent heading at distance `s` from
    /// the start line.
    pub fn point_at_s(&self, s: f64) -> ([f64; 2], f64) {
        let n = self.centerline.len();
        let s = s.rem_euclid(self.length);

        // index of the segment that contains s
        let idx = match self
            .s_cum
            .binary_search_by(|probe| probe.partial_cmp(&s).unwrap_or(std::cmp::Ordering::Less))
        {
            Ok(i) => i.min(n - 1),
            Err(i) => i.saturating_sub(1).min(n - 1),
        };

        let a = self.centerline[idx];
        let b = self.centerline[(idx + 1) % n];
        let seg_len = self.s_cum[idx + 1] - self.s_cum[idx];
        let t = if seg_len > 0.0 {
            ((s - self.s_cum[idx]) / seg_len).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let heading = (b[1] - a[1]).atan2(b[0] - a[0]);

        ([a[0] + t * (b[0] - a[0]), a[1] + t * (b[1] - a[1])], heading)
    }

    /// start_pose returns position and heading of a grid slot. The grid lies just after the
    /// start line, slot 0 (pole) is the furthest ahead and the following slots alternate their
    /// lateral offset.
    pub fn start_pose(&self, grid_slot: usize, no_slots: usize) -> ([f64; 2], f64) {
        let slots_behind = no_slots.max(grid_slot + 1) - 1 - grid_slot;
        let s = self.d_first_gridpos + slots_behind as f64 * self.d_per_gridpos;
        let (p, heading) = self.point_at_s(s);
        let side = match grid_slot {
            0 => 0.0,
            k if k % 2 == 1 => 1.0,
            _ => -1.0,
        };
        let offset = side * self.grid_lateral_offset;
        (
            [p[0] - heading.sin() * offset, p[1] + heading.cos() * offset],
            heading,
        )
    }

    /// checkpoints returns `count` fresh checkpoints spread evenly along the track. The last one
    /// lies `radius + LINE_CHECKPOINT_MARGIN` past the start line, such that a lap is never
    /// completed before the angular progress has wrapped to the next lap.
    pub fn checkpoints(&self, count: usize, radius: f64) -> Vec<TrackCheckpoint> {
        let s_line = radius + LINE_CHECKPOINT_MARGIN;
        (0..count)
            .map(|k| TrackCheckpoint {
                anchor: self
                    .point_at_s(s_line + (k + 1) as f64 * self.length / count as f64)
                    .0,
                passed: false,
            })
            .collect()
    }
}
