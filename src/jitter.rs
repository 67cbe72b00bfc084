// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Deterministic privacy jitter for published coordinates.
//!
//! Each project pin is moved by a bounded pseudo-random offset derived only
//! from the project's identity and the configured radius, so re-ingesting an
//! unchanged project reproduces exactly the same displayed position.
//!
//! 1. FNV-1a folds the seed string into 32 bits.
//! 2. Two mulberry32 draws are taken: one from the seed, one from the seed
//!    XOR an odd constant, so the radius and angle draws are uncorrelated.
//! 3. The offset is sampled uniformly over the disk area
//!    (`r = radius * sqrt(u1)`, `theta = 2 * pi * u2`).
//! 4. The meter offset becomes a latitude delta directly and a longitude
//!    delta scaled by `1 / cos(lat)`.

use std::f64::consts::PI;

/// Meters per degree of latitude (and of longitude at the equator).
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// XORed into the seed for the second, angle draw.
const ANGLE_SEED_MIX: u32 = 0x9E37_79B9;

const FNV_OFFSET_BASIS: u32 = 0x811C_9DC5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a hash of `input`.
pub fn fnv1a(input: &str) -> u32 {
    input.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// One mulberry32 draw in `[0, 1)`.
pub fn mulberry32(seed: u32) -> f64 {
    let mut t = seed.wrapping_add(0x6D2B_79F5);
    t = (t ^ (t >> 15)).wrapping_mul(t | 1);
    t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
    f64::from(t ^ (t >> 14)) / 4_294_967_296.0
}

/// Offset `(lat, lng)` by up to `radius_meters`, deterministically per `seed`.
///
/// A non-positive or non-finite radius returns the input unchanged.
pub fn jitter(lat: f64, lng: f64, radius_meters: f64, seed: &str) -> (f64, f64) {
    if !radius_meters.is_finite() || radius_meters <= 0.0 {
        return (lat, lng);
    }

    let hashed = fnv1a(seed);
    let u1 = mulberry32(hashed);
    let u2 = mulberry32(hashed ^ ANGLE_SEED_MIX);

    let distance = radius_meters * u1.sqrt();
    let theta = 2.0 * PI * u2;
    let north = distance * theta.sin();
    let east = distance * theta.cos();

    let new_lat = (lat + north / METERS_PER_DEGREE).clamp(-90.0, 90.0);

    let cos_lat = lat.to_radians().cos();
    let new_lng = if cos_lat.abs() < 1e-9 {
        // Meridians converge at the poles; there is no meaningful east offset
        lng
    } else {
        wrap_longitude(lng + east / (METERS_PER_DEGREE * cos_lat))
    };

    (new_lat, new_lng)
}

/// Wrap a longitude into `[-180, 180]`.
fn wrap_longitude(lng: f64) -> f64 {
    if (-180.0..=180.0).contains(&lng) {
        lng
    } else {
        (lng + 180.0).rem_euclid(360.0) - 180.0
    }
}
