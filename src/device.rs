use std::fmt;
use std::str::FromStr;

use crate::errors::SiloError;

/// Compute device an inference call is dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Device {
    #[default]
    Cpu,
    Gpu(i32),
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Gpu(id) => write!(f, "gpu:{id}"),
        }
    }
}

/// Accepts `cpu`, `gpu` (device 0), `gpu:N` and the `cuda`/`cuda:N` aliases.
impl FromStr for Device {
    type Err = SiloError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let invalid = || SiloError::Validation {
            field: "device".to_string(),
            reason: format!("`{s}` is not one of `cpu`, `gpu`, `gpu:N`"),
        };

        match s.split_once(':') {
            None if s == "cpu" => Ok(Self::Cpu),
            None if s == "gpu" || s == "cuda" => Ok(Self::Gpu(0)),
            Some((kind, id)) if kind == "gpu" || kind == "cuda" => {
                let id = id.parse::<i32>().map_err(|_| invalid())?;
                if id < 0 {
                    return Err(invalid());
                }
                Ok(Self::Gpu(id))
            }
            _ => Err(invalid()),
        }
    }
}
