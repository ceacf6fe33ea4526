use std::f64::consts::TAU;
use std::time::Duration;

use crate::geo::interpolate;
use crate::mission::MissionId;

/// Trajectory samples per flight path
const PATH_SAMPLES: usize = 100;

const TRAIL_FADE: Duration = Duration::from_millis(1000);
const SHAKE: Duration = Duration::from_millis(150);
/// Longest effect: last shockwave starts at 300ms and runs 1200ms
const BLAST_LIFETIME: Duration = Duration::from_millis(1500);

const FLASH_GROW_MS: f64 = 100.0;
const FLASH_FADE_MS: f64 = 200.0;
const FLASH_MAX_RADIUS: f64 = 36.0;

const SHOCKWAVE_DELAYS_MS: [f64; 3] = [0.0, 150.0, 300.0];
const SHOCKWAVE_MS: f64 = 1200.0;

const FIREBALL_GROW_MS: f64 = 200.0;
const FIREBALL_FADE_MS: f64 = 800.0;
const FIREBALL_RADIUS: f64 = 7.0;

const DEBRIS_COUNT: u64 = 12;
const DEBRIS_FLY_MS: f64 = 600.0;
const DEBRIS_FADE_MS: f64 = 300.0;

// d3-style easing curves over t in 0..=1

#[inline]
pub fn quad_in(t: f64) -> f64 {
    t * t
}

#[inline]
pub fn quad_out(t: f64) -> f64 {
    t * (2.0 - t)
}

#[inline]
pub fn cubic_out(t: f64) -> f64 {
    let u = t - 1.0;
    u * u * u + 1.0
}

/// Exponential ease-out, normalized so that 0 -> 0 and 1 -> 1 exactly
#[inline]
pub fn exp_out(t: f64) -> f64 {
    1.0 - (2f64.powf(-10.0 * t) - 0.0009765625) * 1.0009775171065494
}

#[inline]
fn ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// A missile in the air
pub struct Flight {
    pub mission_id: MissionId,
    pub from: (f64, f64),
    pub to: (f64, f64),
    pub duration: Duration,
    pub elapsed: Duration,
    path: Vec<(f64, f64)>,
}

impl Flight {
    pub fn new(mission_id: MissionId, from: (f64, f64), to: (f64, f64), duration: Duration) -> Self {
        let path = (0..=PATH_SAMPLES)
            .map(|i| interpolate(from, to, i as f64 / PATH_SAMPLES as f64))
            .collect();
        Self {
            mission_id,
            from,
            to,
            duration,
            elapsed: Duration::ZERO,
            path,
        }
    }

    /// Linear time fraction, 0..=1
    pub fn progress(&self) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    /// Current missile position. Accelerates towards the target.
    pub fn position(&self) -> (f64, f64) {
        interpolate(self.from, self.to, quad_in(self.progress()))
    }

    /// Sampled great-circle trajectory from launch site to target
    pub fn path(&self) -> &[(f64, f64)] {
        &self.path
    }

    pub fn is_done(&self) -> bool {
        self.elapsed >= self.duration
    }
}

/// Trajectory left behind after impact
pub struct Trail {
    path: Vec<(f64, f64)>,
    pub age: Duration,
}

impl Trail {
    pub fn path(&self) -> &[(f64, f64)] {
        &self.path
    }

    /// 1.0 at impact, 0.0 when gone
    pub fn opacity(&self) -> f64 {
        (1.0 - ms(self.age) / ms(TRAIL_FADE)).max(0.0)
    }
}

/// One impact's worth of effects
pub struct Blast {
    pub lon: f64,
    pub lat: f64,
    pub age: Duration,
    seed: u64,
}

impl Blast {
    pub fn new(lon: f64, lat: f64, seed: u64) -> Self {
        Self {
            lon,
            lat,
            age: Duration::ZERO,
            seed,
        }
    }

    /// Sensor-overload flash: radius and opacity
    pub fn flash(&self) -> Option<(f64, f64)> {
        let t = ms(self.age);
        if t < FLASH_GROW_MS {
            let k = exp_out(t / FLASH_GROW_MS);
            Some((1.0 + (FLASH_MAX_RADIUS - 1.0) * k, 1.0 - 0.5 * k))
        } else if t < FLASH_GROW_MS + FLASH_FADE_MS {
            let k = (t - FLASH_GROW_MS) / FLASH_FADE_MS;
            Some((FLASH_MAX_RADIUS, 0.5 * (1.0 - k)))
        } else {
            None
        }
    }

    /// Radii of the expanding shockwave rings currently visible, oldest first
    pub fn shockwaves(&self) -> Vec<f64> {
        let t = ms(self.age);
        SHOCKWAVE_DELAYS_MS
            .iter()
            .enumerate()
            .filter_map(|(i, &delay)| {
                let local = t - delay;
                if !(0.0..SHOCKWAVE_MS).contains(&local) {
                    return None;
                }
                let max = 20.0 + 5.0 * i as f64;
                Some(1.0 + (max - 1.0) * cubic_out(local / SHOCKWAVE_MS))
            })
            .collect()
    }

    /// Fireball radius and opacity
    pub fn fireball(&self) -> Option<(f64, f64)> {
        let t = ms(self.age);
        if t < FIREBALL_GROW_MS {
            Some((FIREBALL_RADIUS * exp_out(t / FIREBALL_GROW_MS), 1.0))
        } else if t < FIREBALL_GROW_MS + FIREBALL_FADE_MS {
            let k = (t - FIREBALL_GROW_MS) / FIREBALL_FADE_MS;
            Some((FIREBALL_RADIUS, 1.0 - k))
        } else {
            None
        }
    }

    /// Debris streak tips as pixel offsets from the impact point, plus a
    /// flag for the warm (yellow) palette
    pub fn debris(&self) -> Vec<((f64, f64), bool)> {
        let t = ms(self.age);
        if t >= DEBRIS_FLY_MS + DEBRIS_FADE_MS {
            return Vec::new();
        }
        let reach = quad_out((t / DEBRIS_FLY_MS).min(1.0));
        (0..DEBRIS_COUNT)
            .map(|i| {
                let angle = rand_simple(hash2(self.seed, i)) * TAU;
                let dist = 8.0 + rand_simple(hash2(self.seed, i + 100)) * 10.0;
                let warm = rand_simple(hash2(self.seed, i + 200)) > 0.5;
                (
                    (angle.cos() * dist * reach, angle.sin() * dist * reach),
                    warm,
                )
            })
            .collect()
    }

    pub fn is_done(&self) -> bool {
        self.age >= BLAST_LIFETIME
    }
}

/// All running animations. Driven by wall-clock deltas from the event
/// loop; radii are in braille pixels and do not scale with zoom.
pub struct Theater {
    pub flights: Vec<Flight>,
    pub trails: Vec<Trail>,
    pub blasts: Vec<Blast>,
    shake_left: Duration,
    clock: u64,
}

impl Theater {
    pub fn new() -> Self {
        Self {
            flights: Vec::new(),
            trails: Vec::new(),
            blasts: Vec::new(),
            shake_left: Duration::ZERO,
            clock: 0,
        }
    }

    /// Put a missile in the air
    pub fn launch(&mut self, mission_id: MissionId, from: (f64, f64), to: (f64, f64), duration: Duration) {
        self.flights.push(Flight::new(mission_id, from, to, duration));
    }

    /// Advance every animation by `dt`. Returns missions whose missile
    /// landed during this step, in launch order.
    pub fn advance(&mut self, dt: Duration) -> Vec<MissionId> {
        self.clock = self.clock.wrapping_add(1);
        self.shake_left = self.shake_left.saturating_sub(dt);

        for trail in &mut self.trails {
            trail.age += dt;
        }
        self.trails.retain(|t| t.age < TRAIL_FADE);

        for blast in &mut self.blasts {
            blast.age += dt;
        }
        self.blasts.retain(|b| !b.is_done());

        let mut landed = Vec::new();
        let mut still_flying = Vec::with_capacity(self.flights.len());
        for mut flight in self.flights.drain(..) {
            flight.elapsed += dt;
            if flight.is_done() {
                let seed = hash2(flight.to.0.to_bits(), flight.to.1.to_bits());
                self.blasts.push(Blast::new(flight.to.0, flight.to.1, seed));
                self.trails.push(Trail {
                    path: flight.path,
                    age: Duration::ZERO,
                });
                self.shake_left = SHAKE;
                landed.push(flight.mission_id);
            } else {
                still_flying.push(flight);
            }
        }
        self.flights = still_flying;

        landed
    }

    /// Screen-shake offset in braille pixels: out, back, settle
    pub fn shake_offset(&self) -> (i32, i32) {
        if self.shake_left.is_zero() {
            return (0, 0);
        }
        let remaining = ms(self.shake_left);
        let jx = (rand_simple(hash2(self.clock, 1)) * 2.0).round() as i32;
        let jy = (rand_simple(hash2(self.clock, 2)) * 2.0).round() as i32;
        if remaining > 100.0 {
            (jx, jy)
        } else if remaining > 50.0 {
            (-jx, -jy)
        } else {
            (0, 0)
        }
    }

    /// Drop every animation (full reset)
    pub fn clear(&mut self) {
        self.flights.clear();
        self.trails.clear();
        self.blasts.clear();
        self.shake_left = Duration::ZERO;
    }

    pub fn is_idle(&self) -> bool {
        self.flights.is_empty() && self.trails.is_empty() && self.blasts.is_empty()
    }
}

impl Default for Theater {
    fn default() -> Self {
        Self::new()
    }
}

/// Fast 2-value hash with xorshift
#[inline(always)]
fn hash2(a: u64, b: u64) -> u64 {
    let mut seed = a.wrapping_mul(2654435761).wrapping_add(b.wrapping_mul(2246822519));
    seed ^= seed << 13;
    seed ^= seed >> 7;
    seed ^= seed << 17;
    seed
}

/// Deterministic [0, 1) from a seed (splitmix64 finalizer)
#[inline(always)]
fn rand_simple(seed: u64) -> f64 {
    let mut x = seed.wrapping_mul(0x9e3779b97f4a7c15);
    x ^= x >> 30;
    x = x.wrapping_mul(0xbf58476d1ce4e5b9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94d049bb133111eb);
    x ^= x >> 31;
    (x >> 11) as f64 / 9007199254740992.0
}
