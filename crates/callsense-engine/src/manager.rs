use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::Mutex;
use tracing::{info, instrument};

use callsense_core::ids::{BusinessId, SessionId};
use callsense_core::{
    advisor, scoring, CallObjection, CallPainPoint, CallSession, ChecklistItem, ContactInfo,
    SessionStatus, SignalCatalog,
};
use callsense_store::businesses::BusinessRepo;
use callsense_store::objections::ObjectionRepo;
use callsense_store::pain_points::{NewPainPoint, PainPointRepo};
use callsense_store::sessions::{NewSession, SessionRepo, UpdateSession};
use callsense_store::{Database, StoreError};

use crate::clock::{Clock, SystemClock};
use crate::error::EngineError;
use crate::sync;
use crate::timer::CallTimer;

struct ActiveCall {
    session: CallSession,
    timer: CallTimer,
}

/// Orchestrates one live call at a time: lifecycle, signal capture, derived
/// score/tips on read, and post-call reconciliation.
///
/// All mutators are store-first — the local mirror only advances on a
/// successful write, so a failed mutation can be retried without losing the
/// rest of the session. `start` and `attach` spawn the tick task and must run
/// inside a tokio runtime.
pub struct CallSessionManager {
    sessions: SessionRepo,
    objections: ObjectionRepo,
    pain_points: PainPointRepo,
    businesses: BusinessRepo,
    catalog: Arc<SignalCatalog>,
    clock: Arc<dyn Clock>,
    active: Mutex<Option<ActiveCall>>,
}

impl CallSessionManager {
    pub fn new(db: Database, catalog: Arc<SignalCatalog>, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: SessionRepo::new(db.clone(), catalog.clone()),
            objections: ObjectionRepo::new(db.clone(), catalog.clone()),
            pain_points: PainPointRepo::new(db.clone()),
            businesses: BusinessRepo::new(db, catalog.clone()),
            catalog,
            clock,
            active: Mutex::new(None),
        }
    }

    pub fn with_system_clock(db: Database, catalog: Arc<SignalCatalog>) -> Self {
        Self::new(db, catalog, Arc::new(SystemClock))
    }

    // ── Lifecycle ────────────────────────────────────────────────────────

    /// Open a call against a business and start the timer at zero.
    ///
    /// Rejects when the business does not exist, when it already has an
    /// in-progress session, or when this manager is already driving a live
    /// call — end the current call first.
    #[instrument(skip(self, contact), fields(business_id = %business_id))]
    pub fn start(
        &self,
        business_id: &BusinessId,
        contact: ContactInfo,
    ) -> Result<CallSession, EngineError> {
        if let Some(active) = self.active.lock().as_ref() {
            return Err(EngineError::CallInProgress(
                active.session.business_id.to_string(),
            ));
        }

        let business = self.businesses.get(business_id).map_err(|e| match e {
            StoreError::NotFound(_) => EngineError::BusinessNotFound(business_id.to_string()),
            other => EngineError::Store(other),
        })?;

        if self.sessions.find_active(business_id)?.is_some() {
            return Err(EngineError::CallInProgress(business_id.to_string()));
        }

        let session = self
            .sessions
            .create(&NewSession {
                business_id: business_id.clone(),
                business_name: business.name.clone(),
                contact_name: contact.name,
                contact_role: contact.role,
                phone: business.phone.clone(),
                business_type: business.business_type.clone(),
                started_at: self.clock.now(),
            })
            .map_err(|e| match e {
                // the read check above is cosmetic; the store's unique index
                // is what actually closes the start/start race
                StoreError::Conflict(_) => EngineError::CallInProgress(business_id.to_string()),
                other => EngineError::Store(other),
            })?;

        let timer = CallTimer::start(0);
        *self.active.lock() = Some(ActiveCall {
            session: session.clone(),
            timer,
        });

        info!(session_id = %session.id, "call started");
        Ok(session)
    }

    /// Reattach to an interrupted call.
    ///
    /// If the business has an in-progress session, reconstruct the elapsed
    /// counter from `now − started_at` and resume ticking. No intermediate
    /// timer state is ever persisted, so this is the whole recovery story.
    #[instrument(skip(self), fields(business_id = %business_id))]
    pub fn attach(&self, business_id: &BusinessId) -> Result<Option<CallSession>, EngineError> {
        let Some(session) = self.sessions.find_active(business_id)? else {
            return Ok(None);
        };

        let elapsed = (self.clock.now() - session.started_at)
            .num_seconds()
            .max(0) as u64;
        let timer = CallTimer::start(elapsed);
        *self.active.lock() = Some(ActiveCall {
            session: session.clone(),
            timer,
        });

        info!(session_id = %session.id, elapsed, "reattached to in-progress call");
        Ok(Some(session))
    }

    /// Pause the elapsed counter. Local only — the session stays
    /// `in_progress` and nothing is persisted.
    pub fn pause(&self) {
        if let Some(active) = self.active.lock().as_ref() {
            active.timer.pause();
        }
    }

    /// Resume a paused counter.
    pub fn resume(&self) {
        if let Some(active) = self.active.lock().as_ref() {
            active.timer.resume();
        }
    }

    /// Close the active call: fix duration and score, persist completion,
    /// reconcile into the business record, and drop the local reference.
    ///
    /// A no-op returning `Ok(None)` when nothing is active. If persisting
    /// fails the call stays active and ticking, so `end` can simply be
    /// retried; if only reconciliation fails the session is already
    /// completed and `resync` retries that half alone.
    #[instrument(skip(self))]
    pub fn end(&self, disposition: Option<&str>) -> Result<Option<CallSession>, EngineError> {
        let mut guard = self.active.lock();
        let Some(active) = guard.as_ref() else {
            return Ok(None);
        };

        let session_id = active.session.id.clone();
        let elapsed = active.timer.elapsed_seconds();
        let ended_at = self.clock.now();
        let duration_minutes = elapsed.div_ceil(60) as u32;

        let objections = self.objections.list(&session_id)?;
        let pain_points = self.pain_points.list(&session_id)?;
        let deal_score = scoring::deal_score(&active.session, &objections, &pain_points);

        let completed = self.sessions.update(
            &session_id,
            &UpdateSession {
                status: Some(SessionStatus::Completed),
                ended_at: Some(ended_at),
                duration_minutes: Some(duration_minutes),
                deal_score: Some(deal_score),
                disposition: disposition.map(str::to_string),
                ..Default::default()
            },
        )?;

        // completion is persisted — now stop the tick task and let go
        if let Some(active) = guard.take() {
            active.timer.stop();
        }
        drop(guard);

        info!(session_id = %session_id, deal_score, duration_minutes, "call ended");

        sync::reconcile(
            &self.businesses,
            &self.catalog,
            ended_at,
            &completed,
            &objections,
            &pain_points,
        )?;

        Ok(Some(completed))
    }

    /// Re-run post-call reconciliation for an already-completed session.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub fn resync(&self, session_id: &SessionId) -> Result<(), EngineError> {
        let session = self.sessions.get(session_id)?;
        if session.status != SessionStatus::Completed {
            return Err(EngineError::SessionNotEnded(session_id.to_string()));
        }

        let objections = self.objections.list(session_id)?;
        let pain_points = self.pain_points.list(session_id)?;
        sync::reconcile(
            &self.businesses,
            &self.catalog,
            self.clock.now(),
            &session,
            &objections,
            &pain_points,
        )?;
        Ok(())
    }

    // ── Reads ────────────────────────────────────────────────────────────

    pub fn active_session(&self) -> Option<CallSession> {
        self.active.lock().as_ref().map(|a| a.session.clone())
    }

    pub fn elapsed_seconds(&self) -> Option<u64> {
        self.active.lock().as_ref().map(|a| a.timer.elapsed_seconds())
    }

    pub fn is_running(&self) -> bool {
        self.active
            .lock()
            .as_ref()
            .map(|a| a.timer.is_running())
            .unwrap_or(false)
    }

    /// Current deal score, re-derived from the session's signals and
    /// children on every read. `None` when no call is active.
    pub fn deal_score(&self) -> Result<Option<u8>, EngineError> {
        let guard = self.active.lock();
        let Some(active) = guard.as_ref() else {
            return Ok(None);
        };
        let objections = self.objections.list(&active.session.id)?;
        let pain_points = self.pain_points.list(&active.session.id)?;
        Ok(Some(scoring::deal_score(
            &active.session,
            &objections,
            &pain_points,
        )))
    }

    /// Current coaching tips, in the advisor's fixed order. Empty when no
    /// call is active or nothing matches.
    pub fn coaching_tips(&self) -> Result<Vec<String>, EngineError> {
        let guard = self.active.lock();
        let Some(active) = guard.as_ref() else {
            return Ok(Vec::new());
        };
        let objections = self.objections.list(&active.session.id)?;
        Ok(advisor::coaching_tips(&active.session, &objections))
    }

    // ── Signal capture ───────────────────────────────────────────────────

    pub fn set_buyer_type(&self, value: &str) -> Result<(), EngineError> {
        self.update_active(UpdateSession {
            buyer_type: Some(value.to_string()),
            ..Default::default()
        })
    }

    pub fn set_urgency(&self, value: &str) -> Result<(), EngineError> {
        self.update_active(UpdateSession {
            urgency: Some(value.to_string()),
            ..Default::default()
        })
    }

    pub fn set_authority(&self, value: &str) -> Result<(), EngineError> {
        self.update_active(UpdateSession {
            authority: Some(value.to_string()),
            ..Default::default()
        })
    }

    pub fn set_budget(&self, value: &str) -> Result<(), EngineError> {
        self.update_active(UpdateSession {
            budget: Some(value.to_string()),
            ..Default::default()
        })
    }

    /// Overwrite the whole notes field. Last write wins.
    pub fn set_notes(&self, text: &str) -> Result<(), EngineError> {
        self.update_active(UpdateSession {
            notes: Some(text.to_string()),
            ..Default::default()
        })
    }

    pub fn set_next_action(&self, text: &str) -> Result<(), EngineError> {
        self.update_active(UpdateSession {
            next_action: Some(text.to_string()),
            ..Default::default()
        })
    }

    pub fn set_follow_up_date(&self, date: NaiveDate) -> Result<(), EngineError> {
        self.update_active(UpdateSession {
            follow_up_date: Some(date),
            ..Default::default()
        })
    }

    pub fn set_checklist_flag(&self, item: ChecklistItem, value: bool) -> Result<(), EngineError> {
        let mut update = UpdateSession::default();
        match item {
            ChecklistItem::Demo => update.needs_demo = Some(value),
            ChecklistItem::Proposal => update.needs_proposal = Some(value),
            ChecklistItem::CaseStudy => update.needs_case_study = Some(value),
            ChecklistItem::Trial => update.needs_trial = Some(value),
        }
        self.update_active(update)
    }

    /// Toggle an objection: first call for a type raises it unaddressed,
    /// each further call flips the addressed flag. Never creates a second
    /// row for the same type.
    #[instrument(skip(self))]
    pub fn toggle_objection(&self, objection_type: &str) -> Result<CallObjection, EngineError> {
        let guard = self.active.lock();
        let active = guard.as_ref().ok_or(EngineError::NoActiveCall)?;

        match self
            .objections
            .find_by_type(&active.session.id, objection_type)?
        {
            Some(existing) => Ok(self.objections.set_addressed(
                &active.session.id,
                &existing.id,
                !existing.addressed,
            )?),
            None => Ok(self.objections.add(&active.session.id, objection_type)?),
        }
    }

    /// Append a pain point. There is no edit or delete, and duplicates are
    /// fine — it is a log, not a set.
    pub fn add_pain_point(
        &self,
        text: &str,
        severity: Option<u8>,
    ) -> Result<CallPainPoint, EngineError> {
        let guard = self.active.lock();
        let active = guard.as_ref().ok_or(EngineError::NoActiveCall)?;
        Ok(self.pain_points.add(
            &active.session.id,
            &NewPainPoint {
                pain_text: text.to_string(),
                severity,
            },
        )?)
    }

    fn update_active(&self, update: UpdateSession) -> Result<(), EngineError> {
        let mut guard = self.active.lock();
        let active = guard.as_mut().ok_or(EngineError::NoActiveCall)?;
        let updated = self.sessions.update(&active.session.id, &update)?;
        active.session = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use callsense_store::businesses::NewBusiness;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use std::time::Duration;

    fn setup() -> (CallSessionManager, BusinessId, ManualClock, Database) {
        let db = Database::in_memory().unwrap();
        let catalog = Arc::new(SignalCatalog::default());
        let clock = ManualClock::at(Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap());
        let businesses = BusinessRepo::new(db.clone(), catalog.clone());
        let business = businesses
            .create(&NewBusiness {
                name: "Fern & Fog Coffee".into(),
                phone: Some("+1 555 0131".into()),
                business_type: Some("cafe".into()),
            })
            .unwrap();
        let manager = CallSessionManager::new(db.clone(), catalog, Arc::new(clock.clone()));
        (manager, business.id, clock, db)
    }

    fn contact() -> ContactInfo {
        ContactInfo {
            name: "Dana".into(),
            role: Some("Owner".into()),
        }
    }

    // Let the tick task set up its interval, then step simulated time one
    // second at a time so every tick lands.
    async fn tick(seconds: u64) {
        tokio::task::yield_now().await;
        for _ in 0..seconds {
            tokio::time::advance(Duration::from_secs(1)).await;
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn start_rejects_unknown_business() {
        let (manager, _business_id, _clock, _db) = setup();
        let result = manager.start(&BusinessId::from_raw("biz_missing"), contact());
        assert!(matches!(result, Err(EngineError::BusinessNotFound(_))));
        assert!(manager.active_session().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn start_rejects_while_business_has_live_session() {
        let (manager, business_id, clock, db) = setup();
        manager.start(&business_id, contact()).unwrap();

        // a second manager (another tab, another process) sees the conflict
        // through the store, not through local state
        let other = CallSessionManager::new(
            db,
            Arc::new(SignalCatalog::default()),
            Arc::new(clock.clone()),
        );
        let result = other.start(&business_id, contact());
        assert!(matches!(result, Err(EngineError::CallInProgress(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn start_rejects_while_this_manager_is_on_a_call() {
        let (manager, business_id, _clock, db) = setup();
        let catalog = Arc::new(SignalCatalog::default());
        let other_business = BusinessRepo::new(db, catalog)
            .create(&NewBusiness {
                name: "Harbor Light Dental".into(),
                phone: None,
                business_type: None,
            })
            .unwrap();

        manager.start(&business_id, contact()).unwrap();
        let result = manager.start(&other_business.id, contact());
        assert!(matches!(result, Err(EngineError::CallInProgress(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn attach_reconstructs_elapsed_and_keeps_ticking() {
        let (manager, business_id, clock, db) = setup();
        manager.start(&business_id, contact()).unwrap();

        // the app dies; 125 seconds later a fresh manager reattaches
        drop(manager);
        clock.advance(ChronoDuration::seconds(125));
        let revived = CallSessionManager::new(
            db,
            Arc::new(SignalCatalog::default()),
            Arc::new(clock.clone()),
        );

        let session = revived.attach(&business_id).unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::InProgress);
        assert_eq!(revived.elapsed_seconds(), Some(125));

        tick(2).await;
        assert_eq!(revived.elapsed_seconds(), Some(127));
    }

    #[tokio::test(start_paused = true)]
    async fn attach_with_nothing_to_resume_returns_none() {
        let (manager, business_id, _clock, _db) = setup();
        assert!(manager.attach(&business_id).unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn pause_and_resume_gate_the_counter() {
        let (manager, business_id, _clock, _db) = setup();
        manager.start(&business_id, contact()).unwrap();
        tokio::task::yield_now().await;

        tick(3).await;
        manager.pause();
        assert!(!manager.is_running());
        tick(5).await;
        assert_eq!(manager.elapsed_seconds(), Some(3));

        manager.resume();
        tick(1).await;
        assert_eq!(manager.elapsed_seconds(), Some(4));

        // still in_progress in the store: pause is never persisted
        let session = manager.active_session().unwrap();
        assert_eq!(session.status, SessionStatus::InProgress);
    }

    #[tokio::test(start_paused = true)]
    async fn signal_capture_is_store_first_with_local_mirror() {
        let (manager, business_id, _clock, _db) = setup();
        manager.start(&business_id, contact()).unwrap();

        let result = manager.set_urgency("desperate");
        assert!(matches!(
            result,
            Err(EngineError::Store(StoreError::InvalidValue { .. }))
        ));
        // rejected write never reached the mirror
        assert!(manager.active_session().unwrap().urgency.is_none());

        manager.set_urgency("urgent").unwrap();
        manager.set_urgency("bleeding").unwrap();
        assert_eq!(
            manager.active_session().unwrap().urgency.as_deref(),
            Some("bleeding")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn mutators_require_an_active_call() {
        let (manager, _business_id, _clock, _db) = setup();
        assert!(matches!(
            manager.set_notes("hello"),
            Err(EngineError::NoActiveCall)
        ));
        assert!(matches!(
            manager.toggle_objection("price"),
            Err(EngineError::NoActiveCall)
        ));
        assert!(matches!(
            manager.add_pain_point("x", None),
            Err(EngineError::NoActiveCall)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_objection_flips_without_duplicating() {
        let (manager, business_id, _clock, db) = setup();
        let session = manager.start(&business_id, contact()).unwrap();

        let first = manager.toggle_objection("price").unwrap();
        assert!(!first.addressed);

        let second = manager.toggle_objection("price").unwrap();
        assert!(second.addressed);
        assert_eq!(second.id, first.id);

        let third = manager.toggle_objection("price").unwrap();
        assert!(!third.addressed);

        let rows = ObjectionRepo::new(db, Arc::new(SignalCatalog::default()))
            .list(&session.id)
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn deal_score_and_tips_rederive_on_read() {
        let (manager, business_id, _clock, _db) = setup();
        manager.start(&business_id, contact()).unwrap();

        assert_eq!(manager.deal_score().unwrap(), Some(50));
        assert!(manager.coaching_tips().unwrap().is_empty());

        manager.set_urgency("urgent").unwrap();
        assert_eq!(manager.deal_score().unwrap(), Some(65));

        manager.toggle_objection("price").unwrap();
        assert_eq!(manager.deal_score().unwrap(), Some(60));
        let tips = manager.coaching_tips().unwrap();
        assert_eq!(tips.len(), 1);
        assert!(tips[0].contains("price"));

        // addressing the objection removes both the penalty and the tip
        manager.toggle_objection("price").unwrap();
        assert_eq!(manager.deal_score().unwrap(), Some(65));
        assert!(manager.coaching_tips().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn end_fixes_duration_score_and_reconciles() {
        let (manager, business_id, clock, db) = setup();
        manager.start(&business_id, contact()).unwrap();
        tokio::task::yield_now().await;
        tick(125).await;

        manager.set_urgency("bleeding").unwrap();
        manager.set_authority("sole").unwrap();
        manager.set_budget("flexible").unwrap();
        manager.add_pain_point("no online booking", Some(8)).unwrap();
        let follow_up = NaiveDate::from_ymd_opt(2026, 3, 21).unwrap();
        manager.set_follow_up_date(follow_up).unwrap();

        clock.advance(ChronoDuration::seconds(125));
        let ended = manager.end(Some("closed_won")).unwrap().unwrap();

        assert_eq!(ended.status, SessionStatus::Completed);
        assert_eq!(ended.duration_minutes, Some(3)); // ceil(125 / 60)
        assert_eq!(ended.deal_score, Some(100));
        assert_eq!(ended.ended_at, Some(clock.now()));
        assert_eq!(ended.disposition.as_deref(), Some("closed_won"));
        assert!(manager.active_session().is_none());

        let catalog = Arc::new(SignalCatalog::default());
        let businesses = BusinessRepo::new(db, catalog);
        let business = businesses.get(&business_id).unwrap();
        assert_eq!(business.last_contacted_at, Some(clock.now()));
        assert_eq!(business.follow_up_date, Some(follow_up));
        assert_eq!(business.last_disposition.as_deref(), Some("closed_won"));

        let notes = businesses.list_outreach_notes(&business_id).unwrap();
        assert_eq!(notes.len(), 1);
        assert!(notes[0].note.contains("Score 100/100"), "got: {}", notes[0].note);
        assert!(notes[0].note.contains("3 min"));
        assert_eq!(notes[0].deal_score, Some(100));
    }

    #[tokio::test(start_paused = true)]
    async fn end_without_active_call_is_a_noop_twice() {
        let (manager, business_id, _clock, db) = setup();
        assert!(manager.end(None).unwrap().is_none());
        assert!(manager.end(None).unwrap().is_none());

        let businesses = BusinessRepo::new(db, Arc::new(SignalCatalog::default()));
        assert!(businesses
            .list_outreach_notes(&business_id)
            .unwrap()
            .is_empty());
        assert!(businesses.get(&business_id).unwrap().last_contacted_at.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn end_with_unknown_disposition_keeps_the_call_live() {
        let (manager, business_id, _clock, _db) = setup();
        manager.start(&business_id, contact()).unwrap();

        let result = manager.end(Some("ghosted"));
        assert!(matches!(
            result,
            Err(EngineError::Store(StoreError::InvalidValue { .. }))
        ));

        // still active and still in_progress — retry with a valid value works
        assert!(manager.elapsed_seconds().is_some());
        assert_eq!(
            manager.active_session().unwrap().status,
            SessionStatus::InProgress
        );
        assert!(manager.end(Some("no_decision")).unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn resync_repeats_reconciliation_for_completed_sessions() {
        let (manager, business_id, _clock, db) = setup();
        manager.start(&business_id, contact()).unwrap();
        let ended = manager.end(Some("not_now")).unwrap().unwrap();

        manager.resync(&ended.id).unwrap();

        let businesses = BusinessRepo::new(db, Arc::new(SignalCatalog::default()));
        let notes = businesses.list_outreach_notes(&business_id).unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].note, notes[1].note);
    }

    #[tokio::test(start_paused = true)]
    async fn resync_rejects_in_progress_sessions() {
        let (manager, business_id, _clock, _db) = setup();
        let session = manager.start(&business_id, contact()).unwrap();
        let result = manager.resync(&session.id);
        assert!(matches!(result, Err(EngineError::SessionNotEnded(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn checklist_next_action_and_notes_overwrite() {
        let (manager, business_id, _clock, _db) = setup();
        manager.start(&business_id, contact()).unwrap();

        manager.set_checklist_flag(ChecklistItem::Demo, true).unwrap();
        manager.set_checklist_flag(ChecklistItem::Trial, true).unwrap();
        manager.set_checklist_flag(ChecklistItem::Trial, false).unwrap();
        manager.set_next_action("send demo link").unwrap();
        manager.set_notes("wants Tuesday demo").unwrap();
        manager.set_buyer_type("driver").unwrap();

        let session = manager.active_session().unwrap();
        assert!(session.needs_demo);
        assert!(!session.needs_trial);
        assert_eq!(session.next_action.as_deref(), Some("send demo link"));
        assert_eq!(session.notes.as_deref(), Some("wants Tuesday demo"));
        assert_eq!(session.buyer_type.as_deref(), Some("driver"));
    }
}
