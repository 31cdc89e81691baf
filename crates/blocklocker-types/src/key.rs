use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KeyError;

/// Vertical and horizontal limits declared by the host world.
///
/// Every [`CoordinateKey`] is validated against the bounds in effect when it
/// is constructed. The defaults match a modern overworld: build height
/// `-64..=319` and a 30 million block world border.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldBounds {
    /// Lowest buildable Y level (inclusive).
    pub min_y: i32,
    /// Highest buildable Y level (inclusive).
    pub max_y: i32,
    /// Maximum absolute value of the X and Z coordinates.
    pub horizontal_limit: i64,
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self {
            min_y: -64,
            max_y: 319,
            horizontal_limit: 30_000_000,
        }
    }
}

impl WorldBounds {
    /// Returns `true` if the position lies inside these bounds.
    pub fn contains(&self, x: i64, y: i32, z: i64) -> bool {
        (self.min_y..=self.max_y).contains(&y)
            && x.unsigned_abs() <= self.horizontal_limit.unsigned_abs()
            && z.unsigned_abs() <= self.horizontal_limit.unsigned_abs()
    }
}

/// Canonical identity of one protectable block position.
///
/// Two keys are equal exactly when their normalized world name and all three
/// coordinates are equal. World names are trimmed and lowercased on
/// construction, so `"World"` and `" world "` produce the same key.
///
/// The canonical text form is `world:x:y:z`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawKey")]
pub struct CoordinateKey {
    world: String,
    x: i64,
    y: i32,
    z: i64,
}

impl CoordinateKey {
    /// Build a key from raw host input, rejecting positions outside `bounds`.
    pub fn new(
        world: &str,
        x: i64,
        y: i32,
        z: i64,
        bounds: &WorldBounds,
    ) -> Result<Self, KeyError> {
        let world = normalize_world(world)?;
        if !bounds.contains(x, y, z) {
            return Err(KeyError::invalid(format!(
                "({x}, {y}, {z}) is outside world bounds y={}..={} |xz|<={}",
                bounds.min_y, bounds.max_y, bounds.horizontal_limit
            )));
        }
        Ok(Self { world, x, y, z })
    }

    /// The normalized world name.
    pub fn world(&self) -> &str {
        &self.world
    }

    pub fn x(&self) -> i64 {
        self.x
    }

    pub fn y(&self) -> i32 {
        self.y
    }

    pub fn z(&self) -> i64 {
        self.z
    }

    /// Re-check this key against a (possibly different) set of bounds.
    ///
    /// Keys decoded from a snapshot only carry a normalized world name; the
    /// registry uses this to re-validate them against the active bounds.
    pub fn check_bounds(&self, bounds: &WorldBounds) -> Result<(), KeyError> {
        if bounds.contains(self.x, self.y, self.z) {
            Ok(())
        } else {
            Err(KeyError::invalid(format!("{self} is outside world bounds")))
        }
    }
}

fn normalize_world(world: &str) -> Result<String, KeyError> {
    let trimmed = world.trim();
    if trimmed.is_empty() {
        return Err(KeyError::invalid("world name is empty"));
    }
    if trimmed.contains(':') {
        return Err(KeyError::invalid(format!(
            "world name '{trimmed}' must not contain ':'"
        )));
    }
    Ok(trimmed.to_lowercase())
}

impl fmt::Debug for CoordinateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CoordinateKey({self})")
    }
}

impl fmt::Display for CoordinateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", self.world, self.x, self.y, self.z)
    }
}

/// Parses the canonical `world:x:y:z` form using [`WorldBounds::default`].
impl FromStr for CoordinateKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.rsplitn(4, ':');
        let (Some(z), Some(y), Some(x), Some(world)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(KeyError::invalid(format!(
                "'{s}' is not of the form world:x:y:z"
            )));
        };

        let x = parse_axis(x, "x")?;
        let y = y
            .trim()
            .parse::<i32>()
            .map_err(|e| KeyError::invalid(format!("bad y '{y}': {e}")))?;
        let z = parse_axis(z, "z")?;
        Self::new(world, x, y, z, &WorldBounds::default())
    }
}

fn parse_axis(raw: &str, axis: &str) -> Result<i64, KeyError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|e| KeyError::invalid(format!("bad {axis} '{raw}': {e}")))
}

/// Wire shape of a key; deserialization re-applies world normalization.
#[derive(Deserialize)]
struct RawKey {
    world: String,
    x: i64,
    y: i32,
    z: i64,
}

impl TryFrom<RawKey> for CoordinateKey {
    type Error = KeyError;

    fn try_from(raw: RawKey) -> Result<Self, Self::Error> {
        Ok(Self {
            world: normalize_world(&raw.world)?,
            x: raw.x,
            y: raw.y,
            z: raw.z,
        })
    }
}
