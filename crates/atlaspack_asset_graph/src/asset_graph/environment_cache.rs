use std::collections::HashMap;
use std::sync::Arc;

use crate::types::Environment;

/// Interns environments so equal environments share one allocation
#[derive(Clone, Debug, Default)]
pub struct EnvironmentCache {
  environments: HashMap<String, Arc<Environment>>,
}

impl EnvironmentCache {
  pub fn new() -> Self {
    Self::default()
  }

  /// Replaces `env` with the cached instance for its id and context, caching it if it is new
  pub fn normalize(&mut self, env: &mut Arc<Environment>) {
    let key = format!("{}-{}", env.id(), env.context);

    match self.environments.get(&key) {
      Some(cached) => *env = Arc::clone(cached),
      None => {
        self.environments.insert(key, Arc::clone(env));
      }
    }
  }

  pub fn len(&self) -> usize {
    self.environments.len()
  }

  pub fn is_empty(&self) -> bool {
    self.environments.is_empty()
  }
}
