use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use crate::frame::Frame;
use crate::keypoint::Person;

use super::backend::PoseBackend;

/// Thread-safe registry of pose backends.
///
/// Backends are wrapped in `Mutex` because `PoseBackend::estimate` takes `&mut self`.
pub struct BackendRegistry {
    backends: HashMap<String, Arc<Mutex<dyn PoseBackend>>>,
    default_name: Option<String>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
            default_name: None,
        }
    }

    /// Register a backend. The first registered backend becomes the default.
    pub fn register<B: PoseBackend + 'static>(&mut self, backend: B) {
        let name = backend.name().to_string();
        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.backends.insert(name, Arc::new(Mutex::new(backend)));
    }

    /// Get backend by name.
    pub fn get(&self, name: &str) -> Option<Arc<Mutex<dyn PoseBackend>>> {
        self.backends.get(name).cloned()
    }

    /// Get default backend.
    pub fn default_backend(&self) -> Option<Arc<Mutex<dyn PoseBackend>>> {
        self.default_name.as_ref().and_then(|name| self.get(name))
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default_name.as_deref()
    }

    /// List registered backends, sorted by name.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.keys().cloned().collect();
        names.sort();
        names
    }

    /// Warm up every registered backend.
    pub fn warm_up_all(&self) -> Result<()> {
        for (name, backend) in &self.backends {
            let mut guard = backend
                .lock()
                .map_err(|_| anyhow!("backend '{}' lock poisoned", name))?;
            guard.warm_up()?;
        }
        Ok(())
    }

    /// Run pose estimation with the default backend.
    pub fn estimate(&self, frame: &Frame) -> Result<Vec<Person>> {
        let backend = self
            .default_backend()
            .ok_or_else(|| anyhow!("no pose backend registered"))?;
        let mut guard = backend
            .lock()
            .map_err(|_| anyhow!("backend lock poisoned"))?;
        guard.estimate(frame)
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{ReplayBackend, StubBackend};

    #[test]
    fn first_registered_backend_is_default() -> Result<()> {
        let mut registry = BackendRegistry::new();
        assert!(registry.estimate(&Frame::filled(0, 8, 8, [0; 3])).is_err());

        registry.register(StubBackend::new());
        registry.register(ReplayBackend::from_frames(Vec::new(), 0.0));
        assert_eq!(registry.default_name(), Some("stub"));
        assert_eq!(registry.list(), vec!["replay", "stub"]);

        assert!(registry.get("replay").is_some());
        assert!(registry.get("tract").is_none());

        // the stub stays the default, so its two scripted people come back
        let people = registry.estimate(&Frame::filled(0, 8, 8, [0; 3]))?;
        assert_eq!(people.len(), 2);
        Ok(())
    }
}
