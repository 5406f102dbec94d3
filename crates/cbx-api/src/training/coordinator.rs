use std::collections::{HashMap, HashSet};

use cbx_db::{
    StoreError, TrainingStore,
    models::{CardTraining, DeckTraining, NewCardTraining},
};
use cbx_srs::{BoxOutcome, MIN_BOX, end_of_day, next_review_date, validate_box};
use chrono::{DateTime, Local, TimeZone, Utc};
use futures::future::join_all;
use serde::Deserialize;
use uuid::Uuid;

use super::TrainingError;

/// Box a client reports for one card after studying it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct StudySubmission {
    pub card_id: Uuid,
    #[serde(rename = "box")]
    pub box_number: i32,
}

/// Result of applying a batch of study submissions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyReport {
    pub updated: Vec<CardTraining>,
    /// How many cards failed at the top box and were moved back
    pub backtracked: usize,
}

/// Keeps the card trainings of a deck training in step with study activity.
///
/// Callers are expected to have checked ownership and publication before calling in:
/// the coordinator only knows deck training ids. "Today" ends at 23:59:59.999 in `Tz`.
#[derive(Debug, Clone)]
pub struct TrainingCoordinator<S, Tz = Local> {
    store: S,
    tz: Tz,
}

impl<S, Tz> TrainingCoordinator<S, Tz>
where
    S: TrainingStore,
    Tz: TimeZone + Send + Sync,
{
    pub const fn new(store: S, tz: Tz) -> Self {
        Self { store, tz }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Last instant of `now`'s day in the coordinator's time zone
    pub fn end_of_today(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        end_of_day(now, &self.tz)
    }

    /// Create one card training per card, in box 1 and due at `now`.
    ///
    /// Cards are shown unless `visibility` says otherwise. Inserts run concurrently; if
    /// any of them fails the whole call fails, but inserts that succeeded are kept.
    pub async fn enroll(
        &self,
        deck_training_id: Uuid,
        card_ids: &[Uuid],
        visibility: &HashMap<Uuid, bool>,
        now: DateTime<Utc>,
    ) -> Result<Vec<CardTraining>, TrainingError> {
        let inserts = card_ids.iter().map(|&card_id| {
            self.store.create_card_training(NewCardTraining {
                deck_training_id,
                card_id,
                box_number: MIN_BOX,
                next_training: now,
                is_shown: visibility.get(&card_id).copied().unwrap_or(true),
            })
        });
        let results = join_all(inserts).await;

        let failed = results.iter().filter(|result| result.is_err()).count();
        if failed > 0 {
            tracing::warn!(
                %deck_training_id,
                failed,
                card_count = results.len(),
                "card enrollment failed"
            );
        }

        results
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| match err {
                StoreError::Conflict(_) => TrainingError::Conflict(
                    "Card is already enrolled in this training".to_string(),
                ),
                StoreError::NotFound(_) => {
                    TrainingError::NotFound("Deck training not found".to_string())
                }
                other => other.into(),
            })
    }

    /// Remove the card trainings of `card_ids`; absent ones are skipped.
    ///
    /// Returns the number of records actually deleted.
    pub async fn unenroll(
        &self,
        deck_training_id: Uuid,
        card_ids: &[Uuid],
    ) -> Result<usize, TrainingError> {
        let deletes = card_ids
            .iter()
            .map(|&card_id| self.store.delete_card_training(deck_training_id, card_id));

        let deleted = join_all(deletes)
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;

        Ok(deleted.into_iter().filter(|removed| *removed).count())
    }

    /// Move every submitted card to its resolved box and reschedule it.
    ///
    /// All boxes are validated before anything is written. Submissions are then applied
    /// independently: the first failure is reported, successful updates stay applied.
    pub async fn submit_study_results(
        &self,
        deck_training_id: Uuid,
        submissions: &[StudySubmission],
        now: DateTime<Utc>,
    ) -> Result<StudyReport, TrainingError> {
        let mut seen = HashSet::with_capacity(submissions.len());
        for submission in submissions {
            validate_box(submission.box_number)?;
            if !seen.insert(submission.card_id) {
                return Err(TrainingError::Validation(format!(
                    "Card {} is submitted more than once",
                    submission.card_id
                )));
            }
        }

        let training = self.find_deck_training(deck_training_id).await?;

        let updates = submissions
            .iter()
            .map(|submission| self.apply_submission(&training, *submission, now));
        let results = join_all(updates).await;

        let mut report = StudyReport {
            updated: Vec::with_capacity(results.len()),
            backtracked: 0,
        };
        for result in results {
            let (card_training, backtracked) = result?;
            report.updated.push(card_training);
            report.backtracked += usize::from(backtracked);
        }

        tracing::debug!(
            %deck_training_id,
            card_count = report.updated.len(),
            backtracked = report.backtracked,
            "study results applied"
        );

        Ok(report)
    }

    async fn apply_submission(
        &self,
        training: &DeckTraining,
        submission: StudySubmission,
        now: DateTime<Utc>,
    ) -> Result<(CardTraining, bool), TrainingError> {
        let not_enrolled = || {
            TrainingError::NotFound(format!(
                "Card {} is not enrolled in this training",
                submission.card_id
            ))
        };

        let current = self
            .store
            .find_card_training(training.id, submission.card_id)
            .await?
            .ok_or_else(not_enrolled)?;

        let outcome = BoxOutcome::classify(submission.box_number, training.box_amount)?;
        let box_number =
            outcome.resolve(training.backtrack, current.box_number, training.box_amount);

        let updated = self
            .store
            .update_card_schedule(
                training.id,
                submission.card_id,
                box_number,
                next_review_date(box_number, now),
            )
            .await?
            .ok_or_else(not_enrolled)?;

        Ok((updated, outcome == BoxOutcome::Backtrack))
    }

    /// Visible cards due on or before the end of `now`'s day
    pub async fn list_due_today(
        &self,
        deck_training_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<CardTraining>, TrainingError> {
        self.find_deck_training(deck_training_id).await?;
        Ok(self
            .store
            .list_shown_card_trainings(deck_training_id, Some(self.end_of_today(now)))
            .await?)
    }

    /// Every visible card, due or not
    pub async fn list_all(
        &self,
        deck_training_id: Uuid,
    ) -> Result<Vec<CardTraining>, TrainingError> {
        self.find_deck_training(deck_training_id).await?;

        Ok(self
            .store
            .list_shown_card_trainings(deck_training_id, None)
            .await?)
    }

    pub async fn set_visibility(
        &self,
        deck_training_id: Uuid,
        card_id: Uuid,
        is_shown: bool,
    ) -> Result<CardTraining, TrainingError> {
        self.store
            .set_card_visibility(deck_training_id, card_id, is_shown)
            .await?
            .ok_or_else(|| {
                TrainingError::NotFound(format!("Card {card_id} is not enrolled in this training"))
            })
    }

    /// Fold one finished study session into the training's statistics
    pub async fn record_session(
        &self,
        deck_training_id: Uuid,
        completion_time_seconds: i32,
    ) -> Result<DeckTraining, TrainingError> {
        if completion_time_seconds < 0 {
            return Err(TrainingError::Validation(
                "completion_time_seconds must not be negative".to_string(),
            ));
        }

        self.store
            .record_session(deck_training_id, completion_time_seconds)
            .await?
            .ok_or_else(|| TrainingError::NotFound("Deck training not found".to_string()))
    }

    async fn find_deck_training(
        &self,
        deck_training_id: Uuid,
    ) -> Result<DeckTraining, TrainingError> {
        self.store
            .find_deck_training(deck_training_id)
            .await?
            .ok_or_else(|| TrainingError::NotFound("Deck training not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbx_db::{MemoryTrainingStore, models::NewDeckTraining};
    use cbx_srs::Backtrack;
    use chrono::Duration;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .expect("valid timestamp")
            .with_timezone(&Utc)
    }

    fn coordinator() -> TrainingCoordinator<MemoryTrainingStore, Utc> {
        TrainingCoordinator::new(MemoryTrainingStore::new(), Utc)
    }

    async fn deck_training(
        coordinator: &TrainingCoordinator<MemoryTrainingStore, Utc>,
        box_amount: i32,
        backtrack: Backtrack,
    ) -> DeckTraining {
        coordinator
            .store()
            .insert_deck_training(NewDeckTraining {
                user_id: Uuid::new_v4(),
                deck_id: Uuid::new_v4(),
                start_date: Utc::now(),
                box_amount,
                backtrack,
            })
            .await
            .expect("deck training")
    }

    fn submit(card_id: Uuid, box_number: i32) -> StudySubmission {
        StudySubmission {
            card_id,
            box_number,
        }
    }

    #[tokio::test]
    async fn test_enroll_creates_one_record_per_card() {
        let coordinator = coordinator();
        let dt = deck_training(&coordinator, 5, Backtrack::BacktrackFirst).await;
        let now = at("2024-05-02T10:00:00Z");
        let cards = [Uuid::new_v4(), Uuid::new_v4()];

        let created = coordinator
            .enroll(dt.id, &cards, &HashMap::new(), now)
            .await
            .expect("enroll");

        assert_eq!(created.len(), 2);
        for card_training in &created {
            assert_eq!(card_training.box_number, 1);
            assert!(card_training.is_shown);
            assert_eq!(card_training.next_training, now);
        }
        assert_eq!(coordinator.store().card_trainings(dt.id).await.len(), 2);
    }

    #[tokio::test]
    async fn test_enroll_applies_visibility_overrides() {
        let coordinator = coordinator();
        let dt = deck_training(&coordinator, 5, Backtrack::BacktrackFirst).await;
        let (hidden, shown) = (Uuid::new_v4(), Uuid::new_v4());
        let visibility = HashMap::from([(hidden, false)]);

        coordinator
            .enroll(dt.id, &[hidden, shown], &visibility, Utc::now())
            .await
            .expect("enroll");

        let visible = coordinator.list_all(dt.id).await.expect("list");
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].card_id, shown);
    }

    #[tokio::test]
    async fn test_reenroll_conflicts_and_keeps_existing_record() {
        let coordinator = coordinator();
        let dt = deck_training(&coordinator, 5, Backtrack::BacktrackFirst).await;
        let card = Uuid::new_v4();
        let first = at("2024-05-02T10:00:00Z");

        coordinator
            .enroll(dt.id, &[card], &HashMap::new(), first)
            .await
            .expect("enroll");
        let result = coordinator
            .enroll(dt.id, &[card], &HashMap::new(), first + Duration::days(3))
            .await;

        assert!(matches!(result, Err(TrainingError::Conflict(_))));
        let records = coordinator.store().card_trainings(dt.id).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].next_training, first);
    }

    #[tokio::test]
    async fn test_enroll_keeps_fresh_records_when_one_conflicts() {
        let coordinator = coordinator();
        let dt = deck_training(&coordinator, 5, Backtrack::BacktrackFirst).await;
        let (existing, fresh) = (Uuid::new_v4(), Uuid::new_v4());
        let now = at("2024-05-02T10:00:00Z");

        coordinator
            .enroll(dt.id, &[existing], &HashMap::new(), now)
            .await
            .expect("enroll");
        let result = coordinator
            .enroll(dt.id, &[existing, fresh], &HashMap::new(), now)
            .await;

        assert!(matches!(result, Err(TrainingError::Conflict(_))));
        let records = coordinator.store().card_trainings(dt.id).await;
        assert_eq!(records.len(), 2);
        assert!(records.iter().any(|ct| ct.card_id == fresh && ct.box_number == 1));
    }

    #[tokio::test]
    async fn test_enroll_into_missing_deck_training() {
        let coordinator = coordinator();
        let result = coordinator
            .enroll(Uuid::new_v4(), &[Uuid::new_v4()], &HashMap::new(), Utc::now())
            .await;
        assert!(matches!(result, Err(TrainingError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unenroll_is_idempotent() {
        let coordinator = coordinator();
        let dt = deck_training(&coordinator, 5, Backtrack::BacktrackFirst).await;
        let card = Uuid::new_v4();
        coordinator
            .enroll(dt.id, &[card], &HashMap::new(), Utc::now())
            .await
            .expect("enroll");

        assert_eq!(coordinator.unenroll(dt.id, &[card]).await.expect("unenroll"), 1);
        assert_eq!(coordinator.unenroll(dt.id, &[card]).await.expect("unenroll"), 0);
        assert!(coordinator.store().card_trainings(dt.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_submit_advances_and_reschedules() {
        let coordinator = coordinator();
        let dt = deck_training(&coordinator, 5, Backtrack::BacktrackFirst).await;
        let card = Uuid::new_v4();
        let now = at("2024-05-02T10:00:00Z");
        coordinator
            .enroll(dt.id, &[card], &HashMap::new(), now)
            .await
            .expect("enroll");

        let report = coordinator
            .submit_study_results(dt.id, &[submit(card, 5)], now)
            .await
            .expect("submit");

        assert_eq!(report.backtracked, 0);
        assert_eq!(report.updated.len(), 1);
        assert_eq!(report.updated[0].box_number, 5);
        assert_eq!(report.updated[0].next_training, now + Duration::days(8));
    }

    #[tokio::test]
    async fn test_submit_above_box_amount_backtracks_to_first_box() {
        let coordinator = coordinator();
        let dt = deck_training(&coordinator, 3, Backtrack::BacktrackFirst).await;
        let card = Uuid::new_v4();
        let now = at("2024-05-02T10:00:00Z");
        coordinator
            .enroll(dt.id, &[card], &HashMap::new(), now)
            .await
            .expect("enroll");
        coordinator
            .submit_study_results(dt.id, &[submit(card, 3)], now)
            .await
            .expect("advance");

        let report = coordinator
            .submit_study_results(dt.id, &[submit(card, 4)], now)
            .await
            .expect("backtrack");

        assert_eq!(report.backtracked, 1);
        assert_eq!(report.updated[0].box_number, 1);
        assert_eq!(report.updated[0].next_training, now + Duration::days(1));
    }

    #[tokio::test]
    async fn test_submit_above_box_amount_backtracks_to_prior_box() {
        let coordinator = coordinator();
        let dt = deck_training(&coordinator, 4, Backtrack::BacktrackPrior).await;
        let card = Uuid::new_v4();
        let now = at("2024-05-02T10:00:00Z");
        coordinator
            .enroll(dt.id, &[card], &HashMap::new(), now)
            .await
            .expect("enroll");
        coordinator
            .submit_study_results(dt.id, &[submit(card, 4)], now)
            .await
            .expect("advance");

        let report = coordinator
            .submit_study_results(dt.id, &[submit(card, 9)], now)
            .await
            .expect("backtrack");

        assert_eq!(report.backtracked, 1);
        assert_eq!(report.updated[0].box_number, 4);
        assert_eq!(report.updated[0].next_training, now + Duration::days(5));
    }

    #[tokio::test]
    async fn test_submit_validates_every_box_before_writing() {
        let coordinator = coordinator();
        let dt = deck_training(&coordinator, 5, Backtrack::BacktrackFirst).await;
        let (valid, invalid) = (Uuid::new_v4(), Uuid::new_v4());
        let now = at("2024-05-02T10:00:00Z");
        coordinator
            .enroll(dt.id, &[valid, invalid], &HashMap::new(), now)
            .await
            .expect("enroll");

        for bad_box in [0, -1, 14] {
            let result = coordinator
                .submit_study_results(dt.id, &[submit(valid, 2), submit(invalid, bad_box)], now)
                .await;
            assert!(matches!(result, Err(TrainingError::Validation(_))), "box {bad_box}");
        }

        let records = coordinator.store().card_trainings(dt.id).await;
        assert!(records.iter().all(|ct| ct.box_number == 1 && ct.next_training == now));
    }

    #[tokio::test]
    async fn test_submit_rejects_duplicate_cards() {
        let coordinator = coordinator();
        let dt = deck_training(&coordinator, 5, Backtrack::BacktrackFirst).await;
        let card = Uuid::new_v4();

        let result = coordinator
            .submit_study_results(dt.id, &[submit(card, 2), submit(card, 3)], Utc::now())
            .await;
        assert!(matches!(result, Err(TrainingError::Validation(_))));
    }

    #[tokio::test]
    async fn test_submit_reports_missing_records() {
        let coordinator = coordinator();
        let dt = deck_training(&coordinator, 5, Backtrack::BacktrackFirst).await;

        let unknown_card = coordinator
            .submit_study_results(dt.id, &[submit(Uuid::new_v4(), 2)], Utc::now())
            .await;
        assert!(matches!(unknown_card, Err(TrainingError::NotFound(_))));

        coordinator.store().remove_deck_training(dt.id).await;
        let deleted_training = coordinator
            .submit_study_results(dt.id, &[submit(Uuid::new_v4(), 2)], Utc::now())
            .await;
        assert!(matches!(deleted_training, Err(TrainingError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_submit_applies_valid_cards_when_one_is_missing() {
        let coordinator = coordinator();
        let dt = deck_training(&coordinator, 5, Backtrack::BacktrackFirst).await;
        let card = Uuid::new_v4();
        let now = at("2024-05-02T10:00:00Z");
        coordinator
            .enroll(dt.id, &[card], &HashMap::new(), now)
            .await
            .expect("enroll");

        let result = coordinator
            .submit_study_results(dt.id, &[submit(card, 3), submit(Uuid::new_v4(), 3)], now)
            .await;
        assert!(matches!(result, Err(TrainingError::NotFound(_))));

        let records = coordinator.store().card_trainings(dt.id).await;
        assert_eq!(records[0].box_number, 3);
    }

    #[tokio::test]
    async fn test_list_due_today_uses_end_of_day() {
        let coordinator = coordinator();
        let dt = deck_training(&coordinator, 5, Backtrack::BacktrackFirst).await;
        let (due, tomorrow) = (Uuid::new_v4(), Uuid::new_v4());
        let now = at("2024-05-02T10:00:00Z");
        coordinator
            .enroll(dt.id, &[due, tomorrow], &HashMap::new(), now)
            .await
            .expect("enroll");

        let store = coordinator.store();
        store
            .update_card_schedule(dt.id, due, 1, at("2024-05-02T23:59:59.999Z"))
            .await
            .expect("update");
        store
            .update_card_schedule(dt.id, tomorrow, 1, at("2024-05-03T00:00:00.001Z"))
            .await
            .expect("update");

        let listed = coordinator.list_due_today(dt.id, now).await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].card_id, due);
    }

    #[tokio::test]
    async fn test_list_due_today_empty_versus_missing() {
        let coordinator = coordinator();
        let dt = deck_training(&coordinator, 5, Backtrack::BacktrackFirst).await;

        let empty = coordinator
            .list_due_today(dt.id, Utc::now())
            .await
            .expect("list");
        assert!(empty.is_empty());

        let missing = coordinator.list_due_today(Uuid::new_v4(), Utc::now()).await;
        assert!(matches!(missing, Err(TrainingError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_all_ignores_due_date_but_not_visibility() {
        let coordinator = coordinator();
        let dt = deck_training(&coordinator, 5, Backtrack::BacktrackFirst).await;
        let (later, hidden) = (Uuid::new_v4(), Uuid::new_v4());
        let now = at("2024-05-02T10:00:00Z");
        coordinator
            .enroll(dt.id, &[later, hidden], &HashMap::new(), now)
            .await
            .expect("enroll");
        coordinator
            .submit_study_results(dt.id, &[submit(later, 5)], now)
            .await
            .expect("submit");
        coordinator
            .set_visibility(dt.id, hidden, false)
            .await
            .expect("hide");

        assert!(coordinator.list_due_today(dt.id, now).await.expect("due").is_empty());
        let all = coordinator.list_all(dt.id).await.expect("all");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].card_id, later);
    }

    #[tokio::test]
    async fn test_set_visibility_on_missing_record() {
        let coordinator = coordinator();
        let dt = deck_training(&coordinator, 5, Backtrack::BacktrackFirst).await;

        let result = coordinator.set_visibility(dt.id, Uuid::new_v4(), false).await;
        assert!(matches!(result, Err(TrainingError::NotFound(_))));
        assert!(coordinator.store().card_trainings(dt.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_record_session_keeps_running_average() {
        let coordinator = coordinator();
        let dt = deck_training(&coordinator, 5, Backtrack::BacktrackFirst).await;

        coordinator.record_session(dt.id, 30).await.expect("first");
        let updated = coordinator.record_session(dt.id, 61).await.expect("second");

        assert_eq!(updated.attempts, 2);
        assert_eq!(updated.avg_completion_time_seconds, 46);

        let negative = coordinator.record_session(dt.id, -1).await;
        assert!(matches!(negative, Err(TrainingError::Validation(_))));
    }

    #[tokio::test]
    async fn test_concurrent_sessions_are_all_counted() {
        let coordinator = coordinator();
        let dt = deck_training(&coordinator, 5, Backtrack::BacktrackFirst).await;

        let (first, second) = tokio::join!(
            coordinator.record_session(dt.id, 20),
            coordinator.record_session(dt.id, 40),
        );
        first.expect("first");
        second.expect("second");

        let stored = coordinator.find_deck_training(dt.id).await.expect("stored");
        assert_eq!(stored.attempts, 2);
        // 20 then 40, or 40 then 20: both fold to 30
        assert_eq!(stored.avg_completion_time_seconds, 30);
    }
}
