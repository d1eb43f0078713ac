//! Job scheduling: one pending job per (content item, field, language).

use std::sync::Arc;

use super::error::{PipelineError, PipelineResult};
use super::job_store::{ContentSource, TranslationJobStore};
use super::settings::PipelineSettings;
use crate::models::stats::ScheduleOutcome;
use crate::models::translation_job::{
    compose_content_id, ContentField, ContentType, NewTranslationJob,
};

pub struct TranslationScheduler {
    store: Arc<dyn TranslationJobStore>,
    content: Arc<dyn ContentSource>,
    settings: Arc<PipelineSettings>,
}

impl TranslationScheduler {
    pub fn new(
        store: Arc<dyn TranslationJobStore>,
        content: Arc<dyn ContentSource>,
        settings: Arc<PipelineSettings>,
    ) -> Self {
        Self {
            store,
            content,
            settings,
        }
    }

    /// Resolves requested target languages against the configured set.
    ///
    /// Empty means every configured target. The source language is dropped,
    /// duplicates are collapsed and unknown languages are rejected.
    pub fn resolve_targets(&self, requested: &[String]) -> PipelineResult<Vec<String>> {
        if requested.is_empty() {
            return Ok(self
                .settings
                .target_languages
                .iter()
                .filter(|lang| **lang != self.settings.source_language)
                .cloned()
                .collect());
        }

        let mut targets: Vec<String> = Vec::with_capacity(requested.len());
        for language in requested {
            let language = language.trim().to_lowercase();
            if language == self.settings.source_language {
                continue;
            }
            if !self.settings.supports_target(&language) {
                return Err(PipelineError::UnsupportedLanguage(language));
            }
            if !targets.contains(&language) {
                targets.push(language);
            }
        }
        Ok(targets)
    }

    /// Inserts one pending job per non-blank field and target language.
    ///
    /// Re-scheduling the same item creates duplicate jobs.
    pub async fn schedule_content(
        &self,
        content_type: ContentType,
        content_id: &str,
        fields: &[ContentField],
        target_languages: &[String],
    ) -> PipelineResult<ScheduleOutcome> {
        shared::validation::validate_content_id(content_id)
            .map_err(|_| PipelineError::Invalid(format!("Invalid content id: {}", content_id)))?;
        let targets = self.resolve_targets(target_languages)?;

        let mut outcome = ScheduleOutcome {
            content_items: 1,
            ..ScheduleOutcome::default()
        };
        let mut jobs = Vec::new();

        for field in fields {
            if !shared::validation::is_translatable(&field.source_text) {
                outcome.skipped_fields += 1;
                continue;
            }
            let stored_id = compose_content_id(content_id, &field.field_name);
            for language in &targets {
                jobs.push(NewTranslationJob {
                    content_type: content_type.as_str().to_string(),
                    content_id: stored_id.clone(),
                    source_language: self.settings.source_language.clone(),
                    target_language: language.clone(),
                    source_content: field.source_text.clone(),
                });
            }
        }

        if !jobs.is_empty() {
            outcome.scheduled = self.store.insert_jobs(&jobs).await?;
        }

        tracing::debug!(
            content_type = %content_type,
            content_id = %content_id,
            scheduled = outcome.scheduled,
            skipped_fields = outcome.skipped_fields,
            "Scheduled translation jobs"
        );

        Ok(outcome)
    }

    /// Schedules every existing FAQ item and product, or only one type.
    pub async fn schedule_all_existing(
        &self,
        content_type: Option<ContentType>,
    ) -> PipelineResult<ScheduleOutcome> {
        let types: Vec<ContentType> = match content_type {
            Some(content_type) => vec![content_type],
            None => ContentType::ALL.to_vec(),
        };

        let mut total = ScheduleOutcome::default();
        for content_type in types {
            for item in self.content.list_items(content_type).await? {
                let outcome = self
                    .schedule_content(item.content_type, &item.content_id, &item.fields, &[])
                    .await?;
                total.scheduled += outcome.scheduled;
                total.content_items += outcome.content_items;
                total.skipped_fields += outcome.skipped_fields;
            }
        }

        tracing::info!(
            scheduled = total.scheduled,
            content_items = total.content_items,
            "Scheduled translations for existing content"
        );

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::translation_job::JobStatus;
    use crate::services::job_store::ContentItem;
    use crate::services::pipeline::test_support::pipeline_with;
    use crate::services::translation_provider::MockTranslationProvider;

    #[tokio::test]
    async fn test_schedule_skips_blank_fields() {
        let (store, pipeline) = pipeline_with(MockTranslationProvider::new());
        let fields = vec![
            ContentField::new("question", "Aká je záruka?"),
            ContentField::new("answer", "   "),
        ];

        let outcome = pipeline
            .scheduler
            .schedule_content(ContentType::Faq, "12", &fields, &[])
            .await
            .unwrap();
        assert_eq!(outcome.scheduled, 3);
        assert_eq!(outcome.skipped_fields, 1);

        let jobs = store.jobs();
        assert!(jobs.iter().all(|j| j.content_id == "12:question"));
        assert!(jobs.iter().all(|j| j.status == JobStatus::Pending));
        assert!(jobs.iter().all(|j| j.source_language == "sk"));
        let mut languages: Vec<&str> = jobs.iter().map(|j| j.target_language.as_str()).collect();
        languages.sort();
        assert_eq!(languages, vec!["cs", "de", "en"]);
    }

    #[tokio::test]
    async fn test_rescheduling_creates_duplicates() {
        let (store, pipeline) = pipeline_with(MockTranslationProvider::new());
        let fields = vec![ContentField::new("name", "Vysokozdvižný vozík")];
        let targets = vec!["en".to_string()];

        for _ in 0..2 {
            pipeline
                .scheduler
                .schedule_content(ContentType::Product, "abc", &fields, &targets)
                .await
                .unwrap();
        }
        let jobs = store.jobs();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].content_id, jobs[1].content_id);
        assert_ne!(jobs[0].id, jobs[1].id);
    }

    #[tokio::test]
    async fn test_schedule_counts_random_fields() {
        use fake::faker::lorem::en::Sentence;
        use fake::Fake;

        let (store, pipeline) = pipeline_with(MockTranslationProvider::new());
        let fields: Vec<ContentField> = (0..5)
            .map(|i| ContentField::new(format!("field_{}", i), Sentence(2..6).fake::<String>()))
            .chain(std::iter::once(ContentField::new("empty", "")))
            .collect();

        let outcome = pipeline
            .scheduler
            .schedule_content(ContentType::Product, "p-9", &fields, &[])
            .await
            .unwrap();
        assert_eq!(outcome.scheduled, 15);
        assert_eq!(outcome.skipped_fields, 1);
        assert_eq!(store.jobs().len(), 15);
    }

    #[tokio::test]
    async fn test_resolve_targets() {
        let (_, pipeline) = pipeline_with(MockTranslationProvider::new());
        let scheduler = &pipeline.scheduler;

        let targets = scheduler
            .resolve_targets(&["EN".to_string(), "sk".to_string(), "en".to_string()])
            .unwrap();
        assert_eq!(targets, vec!["en".to_string()]);

        let err = scheduler.resolve_targets(&["fr".to_string()]).unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedLanguage(ref l) if l == "fr"));
    }

    #[tokio::test]
    async fn test_invalid_content_id_rejected() {
        let (store, pipeline) = pipeline_with(MockTranslationProvider::new());
        let fields = vec![ContentField::new("name", "x")];
        let err = pipeline
            .scheduler
            .schedule_content(ContentType::Product, "a:b", &fields, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Invalid(_)));
        assert!(store.jobs().is_empty());
    }

    #[tokio::test]
    async fn test_schedule_all_existing() {
        let (store, pipeline) = pipeline_with(MockTranslationProvider::new());
        store.add_content(ContentItem {
            content_type: ContentType::Faq,
            content_id: "1".to_string(),
            fields: vec![
                ContentField::new("question", "Otázka"),
                ContentField::new("answer", "Odpoveď"),
            ],
        });
        store.add_content(ContentItem {
            content_type: ContentType::Product,
            content_id: "p-1".to_string(),
            fields: vec![
                ContentField::new("name", "Vozík"),
                ContentField::new("shortDescription", ""),
                ContentField::new("description", "Popis"),
            ],
        });

        let outcome = pipeline.scheduler.schedule_all_existing(None).await.unwrap();
        assert_eq!(outcome.content_items, 2);
        assert_eq!(outcome.scheduled, 12);
        assert_eq!(outcome.skipped_fields, 1);

        let faq_only = pipeline
            .scheduler
            .schedule_all_existing(Some(ContentType::Faq))
            .await
            .unwrap();
        assert_eq!(faq_only.content_items, 1);
        assert_eq!(faq_only.scheduled, 6);
        assert_eq!(store.jobs().len(), 18);
    }
}
