//! Integration tests for the reflection prompt cache
//!
//! Uses a hand-written generator that counts calls and can be slowed down,
//! so concurrent misses can be observed sharing one generation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use narrative_workshop::error::{LangbaseError, LangbaseResult, WorkshopError};
use narrative_workshop::reflection::{
    AnswerType, PromptDepth, ReflectionGenerator, ReflectionPrompt, ReflectionPromptCache,
    ReflectionRequest,
};
use narrative_workshop::rubric::{ActivityContext, AnalysisResult, CategoryScore, RubricCategory};
use narrative_workshop::storage::{MemoryStorage, SqliteStorage, Storage};
use narrative_workshop::teaching::{transform, TeachingIssue};

const DRAFT: &str = "We lost the regional final by one point.\n\nI told everyone I was fine. I wasn't.\n\nNext season I asked to lead warmups.";

struct SlowGenerator {
    calls: AtomicUsize,
    delay: Duration,
    /// Number of leading calls that fail.
    failures: usize,
}

impl SlowGenerator {
    fn new(delay_ms: u64) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(delay_ms),
            failures: 0,
        }
    }

    fn failing_first(mut self, failures: usize) -> Self {
        self.failures = failures;
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReflectionGenerator for SlowGenerator {
    async fn generate(&self, request: &ReflectionRequest) -> LangbaseResult<Vec<ReflectionPrompt>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if call < self.failures {
            return Err(LangbaseError::Api {
                status: 503,
                message: "generator overloaded".to_string(),
            });
        }
        Ok(vec![ReflectionPrompt::new(
            format!("What were you hiding when you wrote '{}'?", request.issue.from_draft),
            format!("{:?} probe", request.config.depth),
            AnswerType::LongText,
        )])
    }
}

fn issues() -> Vec<TeachingIssue> {
    let analysis = AnalysisResult::new(58.0)
        .with_category(
            CategoryScore::new(RubricCategory::Vulnerability, 4.0, 10.0)
                .with_evidence("I told everyone I was fine.")
                .with_comment("The emotional turn is stated, not shown."),
        )
        .with_category(
            CategoryScore::new(RubricCategory::Ending, 7.5, 10.0)
                .with_evidence("Next season I asked to lead warmups."),
        );
    transform(&analysis, None, DRAFT).teaching_issues
}

fn activity() -> ActivityContext {
    ActivityContext::new("basketball", "Varsity Basketball").with_role("Point guard")
}

#[cfg(test)]
mod single_flight_tests {
    use super::*;

    #[tokio::test]
    async fn test_overlapping_misses_share_one_generation() {
        let generator = Arc::new(SlowGenerator::new(100));
        let cache = ReflectionPromptCache::new(generator.clone());
        let issue = &issues()[0];
        let activity = activity();

        let (a, b, c) = tokio::join!(
            cache.generate_reflection_prompts_with_cache(issue, &activity, DRAFT),
            cache.generate_reflection_prompts_with_cache(issue, &activity, DRAFT),
            cache.generate_reflection_prompts_with_cache(issue, &activity, DRAFT),
        );
        let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());

        assert_eq!(generator.calls(), 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &c));
        assert_eq!(cache.stats().in_flight, 0);
        assert_eq!(cache.stats().entries, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_flight_across_tasks() {
        let generator = Arc::new(SlowGenerator::new(150));
        let cache = Arc::new(ReflectionPromptCache::new(generator.clone()));
        let issue = issues().remove(0);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let issue = issue.clone();
                tokio::spawn(async move {
                    cache
                        .generate_reflection_prompts_with_cache(&issue, &activity(), DRAFT)
                        .await
                })
            })
            .collect();

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(generator.calls(), 1);
        assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
    }

    #[tokio::test]
    async fn test_different_issues_generate_independently() {
        let generator = Arc::new(SlowGenerator::new(20));
        let cache = ReflectionPromptCache::new(generator.clone());
        let issues = issues();
        assert_eq!(issues.len(), 2);
        let activity = activity();

        let (first, second) = tokio::join!(
            cache.generate_reflection_prompts_with_cache(&issues[0], &activity, DRAFT),
            cache.generate_reflection_prompts_with_cache(&issues[1], &activity, DRAFT),
        );

        assert_eq!(generator.calls(), 2);
        assert_ne!(first.unwrap().issue_id, second.unwrap().issue_id);
    }

    #[tokio::test]
    async fn test_shared_failure_reaches_every_waiter_and_is_not_cached() {
        let generator = Arc::new(SlowGenerator::new(50).failing_first(1));
        let cache = ReflectionPromptCache::new(generator.clone());
        let issue = &issues()[0];
        let activity = activity();

        let (a, b) = tokio::join!(
            cache.generate_reflection_prompts_with_cache(issue, &activity, DRAFT),
            cache.generate_reflection_prompts_with_cache(issue, &activity, DRAFT),
        );

        assert_eq!(generator.calls(), 1);
        let err = a.unwrap_err();
        assert!(matches!(err, WorkshopError::Generation { .. }));
        assert_eq!(b.unwrap_err(), err);
        assert_eq!(cache.stats().entries, 0);

        let retry = cache
            .generate_reflection_prompts_with_cache(issue, &activity, DRAFT)
            .await;
        tokio_test::assert_ok!(retry);
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancelled_leader_hands_over_to_waiter() {
        let generator = Arc::new(SlowGenerator::new(300));
        let cache = Arc::new(ReflectionPromptCache::new(generator.clone()));
        let issue = issues().remove(0);

        let leader = {
            let cache = cache.clone();
            let issue = issue.clone();
            tokio::spawn(async move {
                cache
                    .generate_reflection_prompts_with_cache(&issue, &activity(), DRAFT)
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let waiter = {
            let cache = cache.clone();
            let issue = issue.clone();
            tokio::spawn(async move {
                cache
                    .generate_reflection_prompts_with_cache(&issue, &activity(), DRAFT)
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        leader.abort();
        assert!(leader.await.unwrap_err().is_cancelled());

        let set = waiter.await.unwrap().unwrap();
        assert_eq!(set.issue_id, issue.id);
        assert_eq!(generator.calls(), 2);
        assert_eq!(cache.stats().in_flight, 0);
    }
}

#[cfg(test)]
mod keying_tests {
    use super::*;

    #[tokio::test]
    async fn test_edit_outside_excerpt_paragraph_hits() {
        let generator = Arc::new(SlowGenerator::new(0));
        let cache = ReflectionPromptCache::new(generator.clone());
        let issue = &issues()[0];
        let activity = activity();

        let first = cache
            .generate_reflection_prompts_with_cache(issue, &activity, DRAFT)
            .await
            .unwrap();
        let edited = DRAFT.replace("Next season I asked to lead warmups.", "Next season I led warmups.");
        let second = cache
            .generate_reflection_prompts_with_cache(issue, &activity, &edited)
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(generator.calls(), 1);
        assert_eq!(cache.stats().hits, 1);
    }

    #[tokio::test]
    async fn test_edit_inside_excerpt_paragraph_misses() {
        let generator = Arc::new(SlowGenerator::new(0));
        let cache = ReflectionPromptCache::new(generator.clone());
        let issue = &issues()[0];
        let activity = activity();

        cache
            .generate_reflection_prompts_with_cache(issue, &activity, DRAFT)
            .await
            .unwrap();
        let edited = DRAFT.replace("I wasn't.", "I cried in the locker room.");
        cache
            .generate_reflection_prompts_with_cache(issue, &activity, &edited)
            .await
            .unwrap();

        assert_eq!(generator.calls(), 2);
        assert_eq!(cache.stats().entries, 2);
    }

    #[tokio::test]
    async fn test_depth_follows_severity() {
        let generator = Arc::new(SlowGenerator::new(0));
        let cache = ReflectionPromptCache::new(generator.clone());
        let activity = activity();

        for issue in issues() {
            let set = cache
                .generate_reflection_prompts_with_cache(&issue, &activity, DRAFT)
                .await
                .unwrap();
            let expected = format!("{:?} probe", PromptDepth::for_severity(issue.severity));
            assert_eq!(set.prompts[0].purpose, expected);
        }
    }
}

#[cfg(test)]
mod persistence_tests {
    use super::*;

    #[tokio::test]
    async fn test_persisted_sets_survive_a_new_cache() {
        let storage: Arc<dyn Storage> = Arc::new(SqliteStorage::new_in_memory().await.unwrap());
        let issue = &issues()[0];
        let activity = activity();

        let first_generator = Arc::new(SlowGenerator::new(0));
        let first = ReflectionPromptCache::new(first_generator.clone()).with_storage(storage.clone());
        let original = first
            .generate_reflection_prompts_with_cache(issue, &activity, DRAFT)
            .await
            .unwrap();

        let second_generator = Arc::new(SlowGenerator::new(0));
        let second = ReflectionPromptCache::new(second_generator.clone()).with_storage(storage);
        let restored = second
            .generate_reflection_prompts_with_cache(issue, &activity, DRAFT)
            .await
            .unwrap();

        assert_eq!(second_generator.calls(), 0);
        assert_eq!(*restored, *original);
    }

    #[tokio::test]
    async fn test_clear_removes_memory_and_storage() {
        let storage = Arc::new(MemoryStorage::new());
        let generator = Arc::new(SlowGenerator::new(0));
        let cache = ReflectionPromptCache::new(generator.clone()).with_storage(storage.clone());
        let activity = activity();

        for issue in issues() {
            cache
                .generate_reflection_prompts_with_cache(&issue, &activity, DRAFT)
                .await
                .unwrap();
        }
        assert_eq!(storage.len().await, 2);

        let removed = cache.clear().await.unwrap();
        assert_eq!(removed, 2);
        assert!(storage.is_empty().await);
        assert_eq!(cache.stats().entries, 0);

        let issue = &issues()[0];
        assert!(cache.peek(issue, DRAFT).is_none());
        cache
            .generate_reflection_prompts_with_cache(issue, &activity, DRAFT)
            .await
            .unwrap();
        assert_eq!(generator.calls(), 3);
    }
}
