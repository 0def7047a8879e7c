// src/workplace_tests.rs

#[cfg(test)]
mod tests {
    use crate::backend::BackendError;
    use crate::workplace::*;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::sync::{Arc, Mutex};

    fn create_test_location(id: &str, is_active: bool) -> WorkplaceLocation {
        WorkplaceLocation {
            id: id.to_string(),
            name: format!("Site {}", id),
            latitude: 14.2753,
            longitude: 121.1298,
            radius_meters: 100,
            address: None,
            is_active,
        }
    }

    #[derive(Clone)]
    struct ScriptedSource {
        locations: Arc<Mutex<Vec<WorkplaceLocation>>>,
        failing: Arc<Mutex<bool>>,
        calls: Arc<Mutex<u32>>,
    }

    impl ScriptedSource {
        fn new(locations: Vec<WorkplaceLocation>) -> Self {
            Self {
                locations: Arc::new(Mutex::new(locations)),
                failing: Arc::new(Mutex::new(false)),
                calls: Arc::new(Mutex::new(0)),
            }
        }

        fn set_failing(&self, failing: bool) {
            *self.failing.lock().unwrap() = failing;
        }

        fn call_count(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl WorkplaceSource for ScriptedSource {
        async fn fetch_workplace_locations(
            &self,
        ) -> Result<Vec<WorkplaceLocation>, BackendError> {
            *self.calls.lock().unwrap() += 1;
            if *self.failing.lock().unwrap() {
                return Err(BackendError::Api {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "backend unavailable".to_string(),
                });
            }
            Ok(self.locations.lock().unwrap().clone())
        }
    }

    #[test]
    fn test_directory_starts_with_default_list() {
        let source = ScriptedSource::new(vec![]);
        let directory = WorkplaceDirectory::new(Arc::new(source.clone()));

        assert_eq!(directory.all(), default_locations());
        assert_eq!(source.call_count(), 0, "construction must not fetch");
    }

    #[tokio::test]
    async fn test_refresh_replaces_list_wholesale() {
        let fetched = vec![create_test_location("site-x", true)];
        let source = ScriptedSource::new(fetched.clone());
        let directory = WorkplaceDirectory::new(Arc::new(source));

        let returned = directory.refresh().await;
        assert_eq!(returned, fetched);
        assert_eq!(directory.all(), fetched, "old entries are not merged in");
    }

    #[tokio::test]
    async fn test_failed_refresh_returns_defaults_and_keeps_state() {
        let fetched = vec![create_test_location("site-x", true)];
        let source = ScriptedSource::new(fetched.clone());
        let directory = WorkplaceDirectory::new(Arc::new(source.clone()));

        directory.refresh().await;
        source.set_failing(true);

        let returned = directory.refresh().await;
        assert_eq!(returned, default_locations(), "caller gets the fallback");
        assert_eq!(
            directory.all(),
            fetched,
            "a failed fetch must not overwrite fetched state"
        );
    }

    #[test]
    fn test_active_filters_inactive_locations() {
        let source = ScriptedSource::new(vec![]);
        let directory = WorkplaceDirectory::new(Arc::new(source));

        let active = directory.active();
        assert!(!active.is_empty());
        assert!(active.iter().all(|l| l.is_active));
        assert!(active.len() < directory.all().len(), "defaults include an inactive site");
    }

    #[tokio::test]
    async fn test_lookup_by_id() {
        let source = ScriptedSource::new(vec![
            create_test_location("site-a", true),
            create_test_location("site-b", false),
        ]);
        let directory = WorkplaceDirectory::new(Arc::new(source));
        directory.refresh().await;

        assert_eq!(directory.by_id("site-b").unwrap().id, "site-b");
        assert!(directory.by_id("site-z").is_none());
    }
}
