//! Simulated user sessions.

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{ConfigError, ConfigResult};

/// Length of generated session ids (62^12 combinations).
pub const SESSION_ID_LEN: usize = 12;

/// One simulated user session: a random id and the action it performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub action: String,
    pub session_id: String,
}

/// Generates sessions from a configured action set.
///
/// Generic over the random source so tests can inject a seeded generator.
pub struct SessionFactory<R = StdRng> {
    actions: Vec<String>,
    rng: R,
}

impl SessionFactory<StdRng> {
    /// Create a factory backed by `StdRng`, seeded for reproducible runs or
    /// from OS entropy.
    pub fn seeded(actions: Vec<String>, seed: Option<u64>) -> ConfigResult<Self> {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(actions, rng)
    }
}

impl<R: Rng> SessionFactory<R> {
    /// Fails if `actions` is empty.
    pub fn with_rng(actions: Vec<String>, rng: R) -> ConfigResult<Self> {
        if actions.is_empty() {
            return Err(ConfigError::EmptyActions);
        }
        Ok(Self { actions, rng })
    }

    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    /// Draw a fresh session id and a uniformly chosen action.
    pub fn new_session(&mut self) -> Session {
        let index = self.rng.gen_range(0..self.actions.len());
        let session_id = (&mut self.rng)
            .sample_iter(&Alphanumeric)
            .take(SESSION_ID_LEN)
            .map(char::from)
            .collect();

        Session {
            action: self.actions[index].clone(),
            session_id,
        }
    }
}
