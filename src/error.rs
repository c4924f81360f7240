/**
 * Error conditions surfaced by the simulation. All of these are fatal: they
 * propagate to the driver, which reports them on stderr and exits nonzero.
 * The positivity violations carry the name of the kernel that detected them.
 */
#[derive(thiserror::Error, Debug)]
pub enum Error {

    #[error("{0}: negative mass density {1:.4e}")]
    NegativeDensity(&'static str, f64),

    #[error("{0}: negative energy density {1:.4e}")]
    NegativeEnergy(&'static str, f64),

    #[error("{0}: negative gas pressure {1:.4e}")]
    NegativePressure(&'static str, f64),

    #[error("rk must be 1 or 2, got {0}")]
    InvalidRungeKutta(i64),

    #[error("config item '{key}' {reason}")]
    Config { key: String, reason: String },

    #[error("checkpoint: {0}")]
    Checkpoint(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}




// ============================================================================
impl Error {
    pub fn config(key: &str, reason: &str) -> Self {
        Self::Config {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}
