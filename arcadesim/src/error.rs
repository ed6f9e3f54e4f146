use thiserror::Error;

/// SimError is used if some simulation option or parameter does not fulfill the posed
/// requirements, e.g. an upgrade level outside of [1, 10].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error("upgrade level `{name}` is {level}, must be in [1, 10]")]
    UpgradeLevel { name: &'static str, level: u8 },

    #[error("track centerline needs at least 3 points, got {0}")]
    TrackTooShort(usize),

    #[error("race needs at least one lap")]
    NoLaps,

    #[error("race needs at least one checkpoint")]
    NoCheckpoints,

    #[error("parameter `{name}` has invalid value {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}
