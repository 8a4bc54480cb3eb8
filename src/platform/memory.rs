//! In-memory platform: built-in datasets, sinks held per instance.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::errors::{MatrixError, MatrixResult};
use crate::platform::{Platform, SinkMode, Tap, TapKind, TapStore, NUMS_20};

pub const NAME: &str = "memory";

pub struct MemoryPlatform {
    store: Arc<MemoryStore>,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        let nums: Vec<String> = (1..=20).map(|n| n.to_string()).collect();
        Self::default().with_dataset(NUMS_20, nums)
    }

    pub fn with_dataset(self, dataset: impl Into<String>, lines: Vec<String>) -> Self {
        let mut datasets = self.store.datasets.clone();
        datasets.insert(dataset.into(), lines);
        Self {
            store: Arc::new(MemoryStore {
                datasets,
                sinks: Mutex::default(),
            }),
        }
    }
}

impl Default for MemoryPlatform {
    /// A platform with no datasets.
    fn default() -> Self {
        Self {
            store: Arc::new(MemoryStore::default()),
        }
    }
}

impl Platform for MemoryPlatform {
    fn name(&self) -> &str {
        NAME
    }

    fn store(&self) -> Arc<dyn TapStore> {
        self.store.clone()
    }

    fn input_source(&self, dataset: &str) -> MatrixResult<Tap> {
        if !self.store.datasets.contains_key(dataset) {
            return Err(MatrixError::UnknownDataset {
                dataset: dataset.to_string(),
                platform: NAME.to_string(),
            });
        }
        Ok(Tap::source(dataset))
    }
}

#[derive(Default)]
struct MemoryStore {
    datasets: HashMap<String, Vec<String>>,
    sinks: Mutex<HashMap<String, Vec<String>>>,
}

impl MemoryStore {
    fn sinks(&self) -> MutexGuard<'_, HashMap<String, Vec<String>>> {
        self.sinks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TapStore for MemoryStore {
    fn read_lines(&self, tap: &Tap) -> MatrixResult<Vec<String>> {
        let found = match tap.kind {
            TapKind::Source => self.datasets.get(&tap.identifier).cloned(),
            TapKind::Sink => self.sinks().get(&tap.identifier).cloned(),
        };
        found.ok_or_else(|| MatrixError::UnknownDataset {
            dataset: tap.identifier.clone(),
            platform: NAME.to_string(),
        })
    }

    fn write_lines(&self, tap: &Tap, lines: &[String]) -> MatrixResult<()> {
        let mut sinks = self.sinks();
        if tap.mode == SinkMode::Keep && sinks.contains_key(&tap.identifier) {
            return Err(MatrixError::SinkExists {
                path: tap.identifier.clone(),
            });
        }
        sinks.insert(tap.identifier.clone(), lines.to_vec());
        Ok(())
    }

    fn exists(&self, tap: &Tap) -> bool {
        match tap.kind {
            TapKind::Source => self.datasets.contains_key(&tap.identifier),
            TapKind::Sink => self.sinks().contains_key(&tap.identifier),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_dataset_has_twenty_lines() {
        let platform = MemoryPlatform::new();
        let source = platform.input_source(NUMS_20).unwrap();
        let lines = platform.store().read_lines(&source).unwrap();
        assert_eq!(lines.len(), 20);
        assert_eq!(lines.first().map(String::as_str), Some("1"));
    }

    #[test]
    fn keep_mode_refuses_existing_output() {
        let platform = MemoryPlatform::new();
        let store = platform.store();
        let replace = Tap::sink("out", SinkMode::Replace);
        store.write_lines(&replace, &["a".to_string()]).unwrap();
        store.write_lines(&replace, &["b".to_string()]).unwrap();
        assert_eq!(store.read_lines(&replace).unwrap(), vec!["b".to_string()]);

        let keep = Tap::sink("out", SinkMode::Keep);
        assert!(matches!(
            store.write_lines(&keep, &[]),
            Err(MatrixError::SinkExists { .. })
        ));
    }

    #[test]
    fn missing_dataset_is_reported() {
        assert!(matches!(
            MemoryPlatform::default().input_source(NUMS_20),
            Err(MatrixError::UnknownDataset { .. })
        ));
    }
}
