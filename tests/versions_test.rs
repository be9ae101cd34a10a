//! Integration tests for the version store
//!
//! Runs the store over in-memory SQLite so persistence goes through the
//! real key-value table.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use narrative_workshop::error::{AppError, StorageError, WorkshopError};
use narrative_workshop::rubric::{AnalysisResult, CategoryScore, RubricCategory};
use narrative_workshop::storage::{SqliteStorage, Storage};
use narrative_workshop::versions::{Direction, VersionMetadata, VersionStore};

async fn create_store() -> (VersionStore, Arc<dyn Storage>) {
    let storage: Arc<dyn Storage> = Arc::new(
        SqliteStorage::new_in_memory()
            .await
            .expect("Failed to create in-memory storage"),
    );
    (VersionStore::new(storage.clone()), storage)
}

fn analysis(nqi: f64, voice: f64, stakes: f64) -> AnalysisResult {
    AnalysisResult::new(nqi)
        .with_category(CategoryScore::new(RubricCategory::Voice, voice, 10.0))
        .with_category(CategoryScore::new(RubricCategory::Stakes, stakes, 10.0))
        .with_engine("pipe:test")
}

#[cfg(test)]
mod history_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_versions_are_listed_newest_first() {
        let (store, _) = create_store().await;

        let first = store
            .save_version("robotics", "first draft", &analysis(50.0, 5.0, 4.0), VersionMetadata::default())
            .await
            .unwrap();
        let second = store
            .save_version("robotics", "second draft", &analysis(58.0, 6.0, 5.0), VersionMetadata::default())
            .await
            .unwrap();
        let third = store
            .save_version("robotics", "third draft", &analysis(66.0, 7.0, 6.0), VersionMetadata::default())
            .await
            .unwrap();

        let versions = store.get_versions("robotics").await.unwrap();
        let ids: Vec<&str> = versions.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec![third.id.as_str(), second.id.as_str(), first.id.as_str()]);
        assert!(third.created_at > second.created_at);
        assert!(second.created_at > first.created_at);
    }

    #[tokio::test]
    async fn test_saved_version_captures_scores_and_metadata() {
        let (store, _) = create_store().await;

        let version = store
            .save_version(
                "debate",
                "  I argued for the other side   once. ",
                &analysis(71.5, 8.0, 6.0).with_flag("generic_opening"),
                VersionMetadata::default().with_note("after mentor call"),
            )
            .await
            .unwrap();

        assert_eq!(version.word_count, 7);
        assert_eq!(version.nqi, 71.5);
        assert_eq!(version.engine, "pipe:test");
        assert_eq!(version.note.as_deref(), Some("after mentor call"));
        assert_eq!(version.flags, vec!["generic_opening".to_string()]);
        assert_eq!(version.category_scores[&RubricCategory::Voice].score, 8.0);
        assert_eq!(version.category_scores[&RubricCategory::Stakes].max_score, 10.0);
    }

    #[tokio::test]
    async fn test_activities_are_isolated() {
        let (store, _) = create_store().await;
        store
            .save_version("a", "one", &analysis(40.0, 4.0, 4.0), VersionMetadata::default())
            .await
            .unwrap();
        store
            .save_version("b", "two", &analysis(60.0, 6.0, 6.0), VersionMetadata::default())
            .await
            .unwrap();

        assert_eq!(store.get_versions("a").await.unwrap().len(), 1);
        assert_eq!(store.get_versions("b").await.unwrap().len(), 1);
        assert!(store.get_versions("c").await.unwrap().is_empty());

        let mut activities = store.activities().await.unwrap();
        activities.sort();
        assert_eq!(activities, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_concurrent_saves_lose_nothing() {
        let (store, _) = create_store().await;
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .save_version(
                            "music",
                            &format!("draft {}", i),
                            &analysis(50.0 + i as f64, 5.0, 5.0),
                            VersionMetadata::default(),
                        )
                        .await
                })
            })
            .collect();

        for handle in handles {
            tokio_test::assert_ok!(handle.await.unwrap());
        }

        let versions = store.get_versions("music").await.unwrap();
        assert_eq!(versions.len(), 8);
        for pair in versions.windows(2) {
            assert!(pair[0].created_at > pair[1].created_at);
        }
    }
}

#[cfg(test)]
mod summary_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_summary_of_empty_history() {
        let (store, _) = create_store().await;
        let summary = store.get_version_history_summary("none").await.unwrap();

        assert_eq!(summary.total_versions, 0);
        assert!(summary.latest_version.is_none());
        assert_eq!(summary.improvement.nqi_delta, 0.0);
        assert_eq!(summary.improvement.percent_change, 0.0);
    }

    #[tokio::test]
    async fn test_summary_measures_from_earliest_to_latest() {
        let (store, _) = create_store().await;
        store
            .save_version("essay", "v1", &analysis(50.0, 5.0, 5.0), VersionMetadata::default())
            .await
            .unwrap();
        store
            .save_version("essay", "v2", &analysis(45.0, 4.0, 5.0), VersionMetadata::default())
            .await
            .unwrap();
        let latest = store
            .save_version("essay", "v3", &analysis(60.0, 6.0, 6.0), VersionMetadata::default())
            .await
            .unwrap();

        let summary = store.get_version_history_summary("essay").await.unwrap();
        assert_eq!(summary.total_versions, 3);
        assert_eq!(summary.latest_version.map(|v| v.id), Some(latest.id));
        assert!((summary.improvement.nqi_delta - 10.0).abs() < 1e-9);
        assert!((summary.improvement.percent_change - 20.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_summary_with_zero_baseline_reports_no_percentage() {
        let (store, _) = create_store().await;
        store
            .save_version("essay", "v1", &analysis(0.0, 0.0, 0.0), VersionMetadata::default())
            .await
            .unwrap();
        store
            .save_version("essay", "v2", &analysis(30.0, 3.0, 3.0), VersionMetadata::default())
            .await
            .unwrap();

        let summary = store.summary_for_display("essay").await;
        assert!((summary.improvement.nqi_delta - 30.0).abs() < 1e-9);
        assert_eq!(summary.improvement.percent_change, 0.0);
    }
}

#[cfg(test)]
mod compare_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_compare_reports_category_and_text_deltas() {
        let (store, _) = create_store().await;
        let from = store
            .save_version("essay", "I built a robot.", &analysis(50.0, 5.0, 6.0), VersionMetadata::default())
            .await
            .unwrap();
        let to = store
            .save_version(
                "essay",
                "I built a robot that failed.",
                &analysis(62.0, 7.0, 6.0),
                VersionMetadata::default(),
            )
            .await
            .unwrap();

        let comparison = store.compare_versions("essay", &from.id, &to.id).await.unwrap();
        assert!((comparison.nqi_delta - 12.0).abs() < 1e-9);
        assert_eq!(comparison.text.added, 12);
        assert_eq!(comparison.text.removed, 0);
        assert_eq!(comparison.text.net, 12);

        let up: Vec<RubricCategory> = comparison.moved(Direction::Up).map(|d| d.category).collect();
        assert_eq!(up, vec![RubricCategory::Voice]);
        let same: Vec<RubricCategory> = comparison.moved(Direction::Same).map(|d| d.category).collect();
        assert_eq!(same, vec![RubricCategory::Stakes]);
    }

    #[tokio::test]
    async fn test_compare_is_antisymmetric() {
        let (store, _) = create_store().await;
        let a = store
            .save_version("essay", "short", &analysis(48.0, 3.0, 7.0), VersionMetadata::default())
            .await
            .unwrap();
        let b = store
            .save_version("essay", "a bit longer", &analysis(57.5, 6.0, 5.0), VersionMetadata::default())
            .await
            .unwrap();

        let forward = store.compare_versions("essay", &a.id, &b.id).await.unwrap();
        let backward = store.compare_versions("essay", &b.id, &a.id).await.unwrap();

        assert_eq!(forward.nqi_delta, -backward.nqi_delta);
        assert_eq!(forward.text.net, -backward.text.net);
        assert_eq!(forward.text.added, backward.text.removed);
        for (f, b) in forward.category_deltas.iter().zip(&backward.category_deltas) {
            assert_eq!(f.category, b.category);
            assert_eq!(f.delta, -b.delta);
        }
    }

    #[tokio::test]
    async fn test_compare_unknown_version_fails() {
        let (store, _) = create_store().await;
        let only = store
            .save_version("essay", "text", &analysis(50.0, 5.0, 5.0), VersionMetadata::default())
            .await
            .unwrap();

        let err = store
            .compare_versions("essay", &only.id, "missing")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::VersionNotFound { ref version_id, .. } if version_id == "missing"
        ));
    }
}

#[cfg(test)]
mod edit_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_delete_last_version_removes_key() {
        let (store, storage) = create_store().await;
        let version = store
            .save_version("essay", "text", &analysis(50.0, 5.0, 5.0), VersionMetadata::default())
            .await
            .unwrap();

        assert!(store.delete_version("essay", &version.id).await.unwrap());
        assert!(!store.delete_version("essay", &version.id).await.unwrap());
        assert!(storage.get("versions:essay").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_note_can_be_set_and_cleared() {
        let (store, _) = create_store().await;
        let version = store
            .save_version("essay", "text", &analysis(50.0, 5.0, 5.0), VersionMetadata::default())
            .await
            .unwrap();

        let noted = store
            .add_version_note("essay", &version.id, "tightened the ending")
            .await
            .unwrap();
        assert_eq!(noted.note.as_deref(), Some("tightened the ending"));

        let cleared = store.add_version_note("essay", &version.id, "   ").await.unwrap();
        assert!(cleared.note.is_none());

        let stored = store.get_version("essay", &version.id).await.unwrap();
        assert!(stored.and_then(|v| v.note).is_none());
    }
}

#[cfg(test)]
mod export_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_export_then_import_into_fresh_store() {
        let (source, _) = create_store().await;
        source
            .save_version("essay", "v1", &analysis(50.0, 5.0, 5.0), VersionMetadata::default())
            .await
            .unwrap();
        source
            .save_version("essay", "v2", &analysis(55.0, 6.0, 5.0), VersionMetadata::default())
            .await
            .unwrap();
        let document = source.export_activity("essay").await.unwrap();

        let (target, _) = create_store().await;
        let (activity_id, count) = target.import_activity(&document).await.unwrap();
        assert_eq!(activity_id, "essay");
        assert_eq!(count, 2);
        assert_eq!(
            target.get_versions("essay").await.unwrap(),
            source.get_versions("essay").await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_import_rejects_unknown_format() {
        let (store, _) = create_store().await;
        let document = serde_json::json!({
            "format_version": 99,
            "activity_id": "essay",
            "exported_at": "2026-01-01T00:00:00Z",
            "versions": []
        })
        .to_string();

        let err = store.import_activity(&document).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Workshop(WorkshopError::InvalidExport { .. })
        ));
    }

    #[tokio::test]
    async fn test_import_rejects_malformed_json() {
        let (store, _) = create_store().await;
        let err = store.import_activity("{not json").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Workshop(WorkshopError::InvalidExport { .. })
        ));
    }
}
