//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, Utc, Weekday};
use krs_core::{
  catalog::{ClashResource, NewCourse, NewPackage, NewSection, NewStudent, Section, TimeSlot},
  error::{NotFound, StateError, ValidationError},
  grade::{LetterGrade, ScoreEntry},
  registration::{Registration, RegistrationStatus},
  store::{AcademicStore, RegistrationQuery},
  term::{NewTerm, Term, TermKey, Window},
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

// ─── Fixtures ────────────────────────────────────────────────────────────────

const DAYS: [Weekday; 7] = [
  Weekday::Mon,
  Weekday::Tue,
  Weekday::Wed,
  Weekday::Thu,
  Weekday::Fri,
  Weekday::Sat,
  Weekday::Sun,
];

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn short_id() -> String { Uuid::new_v4().simple().to_string()[..8].to_owned() }

fn open_window() -> Window {
  let now = Utc::now();
  Window { opens_at: now - Duration::days(7), closes_at: now + Duration::days(7) }
}

fn past_window() -> Window {
  let now = Utc::now();
  Window { opens_at: now - Duration::days(30), closes_at: now - Duration::days(1) }
}

async fn term_with(
  s: &SqliteStore,
  label: &str,
  registration_window: Window,
  amendment_window: Option<Window>,
) -> Term {
  let key: TermKey = label.parse().unwrap();
  s.add_term(NewTerm {
    academic_year: key.year,
    period: key.period,
    registration_window,
    amendment_window,
  })
  .await
  .unwrap()
}

async fn active_term(s: &SqliteStore, label: &str) -> Term {
  let term = term_with(s, label, open_window(), None).await;
  s.activate_term(term.term_id).await.unwrap()
}

async fn student(s: &SqliteStore) -> Uuid {
  s.add_student(NewStudent {
    student_number: format!("NIM-{}", short_id()),
    name:           "Siti Rahma".into(),
    program:        "Informatika".into(),
    cohort:         2024,
  })
  .await
  .unwrap()
  .student_id
}

/// A section of a fresh course with its own room and instructor.
async fn section(
  s: &SqliteStore,
  term_id: Uuid,
  credits: u32,
  day: Weekday,
  start: (u16, u16),
  end: (u16, u16),
  seat_cap: u32,
) -> Section {
  let course = s
    .add_course(NewCourse {
      code:         format!("IF-{}", short_id()),
      name:         "Struktur Data".into(),
      credits,
      nominal_term: 1,
    })
    .await
    .unwrap();
  s.add_section(NewSection {
    term_id,
    course_id: course.course_id,
    instructor_id: Uuid::new_v4(),
    room: format!("R-{}", short_id()),
    label: "A".into(),
    slot: TimeSlot::from_hm(day, start, end).unwrap(),
    seat_cap,
  })
  .await
  .unwrap()
}

/// `n` non-overlapping sections of `credits` each, one per weekday.
async fn timetable(s: &SqliteStore, term_id: Uuid, credits: u32, n: usize) -> Vec<Uuid> {
  let mut ids = Vec::with_capacity(n);
  for day in DAYS.iter().take(n) {
    let sec = section(s, term_id, credits, *day, (8, 0), (10, 0), 40).await;
    ids.push(sec.section_id);
  }
  ids
}

async fn draft(s: &SqliteStore, student_id: Uuid, term_id: Uuid, sections: &[Uuid]) -> Registration {
  let reg = s.create_registration(student_id, term_id).await.unwrap();
  s.replace_lines(reg.registration_id, sections.to_vec()).await.unwrap()
}

/// Register, submit and approve.
async fn enroll(s: &SqliteStore, student_id: Uuid, term_id: Uuid, sections: &[Uuid]) -> Registration {
  let reg = draft(s, student_id, term_id, sections).await;
  s.submit_registration(reg.registration_id).await.unwrap();
  s.approve_registration(reg.registration_id, Uuid::new_v4())
    .await
    .unwrap()
}

async fn grade_and_finalize(s: &SqliteStore, section_id: Uuid, scores: &[(Uuid, f64)]) {
  let entries = scores
    .iter()
    .map(|&(student_id, score)| ScoreEntry { student_id, score })
    .collect();
  s.save_grades(section_id, entries).await.unwrap();
  s.finalize_section(section_id).await.unwrap();
}

fn core_error<T: std::fmt::Debug>(result: crate::Result<T>) -> krs_core::Error {
  match result.unwrap_err() {
    Error::Core(e) => e,
    other => panic!("expected a domain error, got {other:?}"),
  }
}

fn validation<T: std::fmt::Debug>(result: crate::Result<T>) -> ValidationError {
  match core_error(result) {
    krs_core::Error::Validation(e) => e,
    other => panic!("expected a validation error, got {other:?}"),
  }
}

fn state<T: std::fmt::Debug>(result: crate::Result<T>) -> StateError {
  match core_error(result) {
    krs_core::Error::State(e) => e,
    other => panic!("expected a state error, got {other:?}"),
  }
}

// ─── Terms ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn only_one_term_is_active() {
  let s = store().await;
  let ganjil = active_term(&s, "2024/2025-GANJIL").await;
  let genap = active_term(&s, "2024/2025-GENAP").await;

  let active = s.active_term().await.unwrap().unwrap();
  assert_eq!(active.term_id, genap.term_id);
  assert!(!s.get_term(ganjil.term_id).await.unwrap().unwrap().active);

  let student = student(&s).await;
  let err = state(s.create_registration(student, ganjil.term_id).await);
  assert_eq!(err, StateError::TermNotActive { term_id: ganjil.term_id });
}

#[tokio::test]
async fn activating_unknown_term_keeps_current_one() {
  let s = store().await;
  let term = active_term(&s, "2024/2025-GANJIL").await;

  let missing = Uuid::new_v4();
  let err = core_error(s.activate_term(missing).await);
  assert!(matches!(err, krs_core::Error::NotFound(NotFound::Term(id)) if id == missing));

  let active = s.active_term().await.unwrap().unwrap();
  assert_eq!(active.term_id, term.term_id);
}

#[tokio::test]
async fn terms_are_listed_in_calendar_order() {
  let s = store().await;
  for label in ["2025/2026-GANJIL", "2024/2025-GENAP", "999/1000-GENAP", "2024/2025-GANJIL"] {
    term_with(&s, label, open_window(), None).await;
  }
  let labels: Vec<String> =
    s.list_terms().await.unwrap().iter().map(Term::label).collect();
  assert_eq!(
    labels,
    ["999/1000-GENAP", "2024/2025-GANJIL", "2024/2025-GENAP", "2025/2026-GANJIL"]
  );
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn rooms_and_instructors_cannot_be_double_booked() {
  let s = store().await;
  let term = active_term(&s, "2024/2025-GANJIL").await;
  let first = section(&s, term.term_id, 3, Weekday::Mon, (8, 0), (10, 0), 30).await;

  let overlapping = |room: String, instructor_id: Uuid| NewSection {
    term_id: term.term_id,
    course_id: first.course_id,
    instructor_id,
    room,
    label: "B".into(),
    slot: TimeSlot::from_hm(Weekday::Mon, (9, 0), (11, 0)).unwrap(),
    seat_cap: 30,
  };

  let err = validation(
    s.add_section(overlapping(first.room.clone(), Uuid::new_v4())).await,
  );
  assert!(matches!(
    err,
    ValidationError::SectionClash { resource: ClashResource::Room, .. }
  ));

  let err = validation(
    s.add_section(overlapping("R-other".into(), first.instructor_id)).await,
  );
  assert!(matches!(
    err,
    ValidationError::SectionClash { resource: ClashResource::Instructor, .. }
  ));

  // Back-to-back in the same room is allowed.
  let touching = NewSection {
    slot: TimeSlot::from_hm(Weekday::Mon, (10, 0), (12, 0)).unwrap(),
    ..overlapping(first.room.clone(), first.instructor_id)
  };
  assert!(s.add_section(touching).await.is_ok());
}

#[tokio::test]
async fn section_detail_embeds_course() {
  let s = store().await;
  let term = active_term(&s, "2024/2025-GANJIL").await;
  let sec = section(&s, term.term_id, 4, Weekday::Wed, (13, 0), (15, 30), 25).await;

  let detail = s.get_section(sec.section_id).await.unwrap().unwrap();
  assert_eq!(detail.section, sec);
  assert_eq!(detail.credits(), 4);
  assert_eq!(detail.section.slot.to_string(), "Wed 13:00-15:30");
}

#[tokio::test]
async fn course_credits_must_be_positive() {
  let s = store().await;
  let err = validation(
    s.add_course(NewCourse {
      code:         "IF-000".into(),
      name:         "Nothing".into(),
      credits:      0,
      nominal_term: 1,
    })
    .await,
  );
  assert_eq!(err, ValidationError::InvalidCredits);
}

// ─── Registration ────────────────────────────────────────────────────────────

#[tokio::test]
async fn full_registration_lifecycle() {
  let s = store().await;
  let term = active_term(&s, "2024/2025-GANJIL").await;
  let sections = timetable(&s, term.term_id, 3, 4).await;
  let student = student(&s).await;

  let reg = draft(&s, student, term.term_id, &sections).await;
  assert_eq!(reg.status, RegistrationStatus::Draft);
  assert_eq!(reg.total_credits, 12);
  assert_eq!(reg.section_ids(), sections);

  let submitted = s.submit_registration(reg.registration_id).await.unwrap();
  assert_eq!(submitted.status, RegistrationStatus::Submitted);
  assert!(submitted.submitted_at.is_some());

  let approver = Uuid::new_v4();
  let approved = s
    .approve_registration(reg.registration_id, approver)
    .await
    .unwrap();
  assert_eq!(approved.status, RegistrationStatus::Approved);
  assert_eq!(approved.decided_by, Some(approver));

  let stored = s.get_registration(reg.registration_id).await.unwrap().unwrap();
  assert_eq!(stored, approved);

  let usage = s.seat_usage(sections[0]).await.unwrap();
  assert_eq!(usage.enrolled, 1);
}

#[tokio::test]
async fn second_registration_for_same_term_is_refused() {
  let s = store().await;
  let term = active_term(&s, "2024/2025-GANJIL").await;
  let student = student(&s).await;

  let first = s.create_registration(student, term.term_id).await.unwrap();
  let err = state(s.create_registration(student, term.term_id).await);
  assert_eq!(err, StateError::AlreadyRegistered {
    student_id:      student,
    term_id:         term.term_id,
    registration_id: first.registration_id,
  });
}

#[tokio::test]
async fn rejected_registration_can_be_recreated() {
  let s = store().await;
  let term = active_term(&s, "2024/2025-GANJIL").await;
  let sections = timetable(&s, term.term_id, 3, 4).await;
  let student = student(&s).await;

  let reg = draft(&s, student, term.term_id, &sections).await;
  s.submit_registration(reg.registration_id).await.unwrap();

  let err = validation(
    s.reject_registration(reg.registration_id, Uuid::new_v4(), "  ".into())
      .await,
  );
  assert_eq!(err, ValidationError::EmptyReason);

  let rejected = s
    .reject_registration(reg.registration_id, Uuid::new_v4(), "prerequisite missing".into())
    .await
    .unwrap();
  assert_eq!(rejected.status, RegistrationStatus::Rejected);
  assert_eq!(rejected.rejection_reason.as_deref(), Some("prerequisite missing"));

  // Rejected lines hold no seat.
  assert_eq!(s.seat_usage(sections[0]).await.unwrap().enrolled, 0);

  let again = s.create_registration(student, term.term_id).await.unwrap();
  assert_ne!(again.registration_id, reg.registration_id);

  // The rejection stays on record next to the new draft.
  let kept = s.get_registration(reg.registration_id).await.unwrap().unwrap();
  assert_eq!(kept.status, RegistrationStatus::Rejected);
  assert_eq!(kept.rejection_reason.as_deref(), Some("prerequisite missing"));
  assert_eq!(kept.lines.len(), 4);

  let history = s
    .list_registrations(&RegistrationQuery {
      student_id: Some(student),
      term_id: Some(term.term_id),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(history.len(), 2);

  // Only one registration that is not rejected may exist.
  let err = state(s.create_registration(student, term.term_id).await);
  assert!(matches!(err, StateError::AlreadyRegistered { registration_id, .. } if registration_id == again.registration_id));
}

#[tokio::test]
async fn submitted_registration_is_frozen() {
  let s = store().await;
  let term = active_term(&s, "2024/2025-GANJIL").await;
  let sections = timetable(&s, term.term_id, 3, 5).await;
  let student = student(&s).await;

  let reg = draft(&s, student, term.term_id, &sections[..4]).await;
  s.submit_registration(reg.registration_id).await.unwrap();

  let err = state(s.replace_lines(reg.registration_id, sections.clone()).await);
  assert!(matches!(err, StateError::NotDraft { .. }));
  let err = state(s.delete_registration(reg.registration_id).await);
  assert!(matches!(err, StateError::NotDraft { .. }));
  let err = state(s.submit_registration(reg.registration_id).await);
  assert!(matches!(err, StateError::NotDraft { .. }));

  let stored = s.get_registration(reg.registration_id).await.unwrap().unwrap();
  assert_eq!(stored.section_ids(), sections[..4]);
}

#[tokio::test]
async fn drafts_can_be_deleted() {
  let s = store().await;
  let term = active_term(&s, "2024/2025-GANJIL").await;
  let student = student(&s).await;

  let reg = s.create_registration(student, term.term_id).await.unwrap();
  s.delete_registration(reg.registration_id).await.unwrap();
  assert!(s.get_registration(reg.registration_id).await.unwrap().is_none());

  let err = core_error(s.delete_registration(reg.registration_id).await);
  assert!(matches!(err, krs_core::Error::NotFound(NotFound::Registration(_))));
}

#[tokio::test]
async fn approval_requires_submission() {
  let s = store().await;
  let term = active_term(&s, "2024/2025-GANJIL").await;
  let student = student(&s).await;

  let reg = s.create_registration(student, term.term_id).await.unwrap();
  let err = state(s.approve_registration(reg.registration_id, Uuid::new_v4()).await);
  assert_eq!(err, StateError::InvalidTransition {
    registration_id: reg.registration_id,
    from:            RegistrationStatus::Draft,
    to:              RegistrationStatus::Approved,
  });
}

#[tokio::test]
async fn lines_must_be_distinct_and_in_term() {
  let s = store().await;
  let other = term_with(&s, "2023/2024-GENAP", open_window(), None).await;
  let term = active_term(&s, "2024/2025-GANJIL").await;
  let sections = timetable(&s, term.term_id, 3, 2).await;
  let foreign = section(&s, other.term_id, 3, Weekday::Fri, (8, 0), (10, 0), 10).await;
  let student = student(&s).await;
  let reg = s.create_registration(student, term.term_id).await.unwrap();

  let err = validation(
    s.replace_lines(reg.registration_id, vec![sections[0], sections[1], sections[0]])
      .await,
  );
  assert_eq!(err, ValidationError::DuplicateSection { section_id: sections[0] });

  let err = validation(
    s.replace_lines(reg.registration_id, vec![sections[0], foreign.section_id])
      .await,
  );
  assert!(matches!(err, ValidationError::SectionOutsideTerm { section_id, .. } if section_id == foreign.section_id));
}

#[tokio::test]
async fn overlapping_sections_block_submission() {
  let s = store().await;
  let term = active_term(&s, "2024/2025-GANJIL").await;
  let morning = section(&s, term.term_id, 3, Weekday::Mon, (8, 0), (10, 0), 30).await;
  let clash = section(&s, term.term_id, 3, Weekday::Mon, (9, 0), (11, 0), 30).await;
  let touching = section(&s, term.term_id, 3, Weekday::Mon, (10, 0), (12, 0), 30).await;
  let rest = timetable(&s, term.term_id, 3, 3).await;

  let advisory = s
    .detect_conflicts(vec![morning.section_id, clash.section_id, touching.section_id])
    .await
    .unwrap();
  assert_eq!(advisory.len(), 2);

  let student_a = student(&s).await;
  let mut lines = vec![morning.section_id, clash.section_id];
  lines.extend(&rest[1..]);
  let reg = draft(&s, student_a, term.term_id, &lines).await;
  let err = validation(s.submit_registration(reg.registration_id).await);
  let ValidationError::ScheduleConflicts(conflicts) = err else {
    panic!("expected schedule conflicts, got {err:?}");
  };
  assert_eq!(conflicts.len(), 1);
  assert_eq!((conflicts[0].start_minute, conflicts[0].end_minute), (540, 600));

  let student_b = student(&s).await;
  let mut lines = vec![morning.section_id, touching.section_id];
  lines.extend(&rest[1..]);
  let reg = draft(&s, student_b, term.term_id, &lines).await;
  assert!(s.submit_registration(reg.registration_id).await.is_ok());
}

#[tokio::test]
async fn submission_stops_at_the_first_failing_check() {
  let s = store().await;
  let term = active_term(&s, "2024/2025-GANJIL").await;
  let early = section(&s, term.term_id, 3, Weekday::Mon, (8, 0), (10, 0), 30).await;
  let late = section(&s, term.term_id, 3, Weekday::Mon, (9, 0), (11, 0), 30).await;

  // 6 credits is also under the floor, but conflicts are checked first.
  let reg = draft(&s, student(&s).await, term.term_id, &[early.section_id, late.section_id]).await;
  let err = validation(s.submit_registration(reg.registration_id).await);
  let ValidationError::ScheduleConflicts(conflicts) = err else {
    panic!("expected schedule conflicts, got {err:?}");
  };
  assert_eq!(conflicts.len(), 1);
  assert_eq!(conflicts[0].day, Weekday::Mon);
  assert_eq!((conflicts[0].start_minute, conflicts[0].end_minute), (540, 600));
}

#[tokio::test]
async fn credit_floor_and_cap_are_enforced() {
  let s = store().await;
  let term = active_term(&s, "2024/2025-GANJIL").await;
  let light = timetable(&s, term.term_id, 3, 3).await;
  let heavy = timetable(&s, term.term_id, 4, 7).await;

  let student_a = student(&s).await;
  let reg = draft(&s, student_a, term.term_id, &light).await;
  let err = validation(s.submit_registration(reg.registration_id).await);
  assert_eq!(err, ValidationError::BelowCreditFloor { total: 9, floor: 12 });

  let student_b = student(&s).await;
  let reg = draft(&s, student_b, term.term_id, &heavy).await;
  let err = validation(s.submit_registration(reg.registration_id).await);
  assert_eq!(err, ValidationError::AboveCreditCap { total: 28, cap: 24 });
}

#[tokio::test]
async fn closed_window_falls_back_to_amendment_window() {
  let s = store().await;
  let closed = term_with(&s, "2024/2025-GANJIL", past_window(), None).await;
  s.activate_term(closed.term_id).await.unwrap();
  let sections = timetable(&s, closed.term_id, 3, 4).await;
  let student_id = student(&s).await;

  let reg = draft(&s, student_id, closed.term_id, &sections).await;
  let err = validation(s.submit_registration(reg.registration_id).await);
  assert!(matches!(err, ValidationError::WindowClosed { term_id, .. } if term_id == closed.term_id));

  let amended = term_with(&s, "2024/2025-GENAP", past_window(), Some(open_window())).await;
  s.activate_term(amended.term_id).await.unwrap();
  let sections = timetable(&s, amended.term_id, 3, 4).await;
  let reg = draft(&s, student_id, amended.term_id, &sections).await;
  assert!(s.submit_registration(reg.registration_id).await.is_ok());
}

#[tokio::test]
async fn package_seeds_a_draft() {
  let s = store().await;
  let term = active_term(&s, "2024/2025-GANJIL").await;
  let sections = timetable(&s, term.term_id, 3, 4).await;
  let package = s
    .add_package(NewPackage {
      name:        "Semester 1".into(),
      program:     "Informatika".into(),
      cohort:      2024,
      term_id:     term.term_id,
      section_ids: sections.clone(),
    })
    .await
    .unwrap();

  let student = student(&s).await;
  let reg = s.create_from_package(student, package.package_id).await.unwrap();
  assert_eq!(reg.status, RegistrationStatus::Draft);
  assert_eq!(reg.package_id, Some(package.package_id));
  assert_eq!(reg.section_ids(), sections);
  assert_eq!(reg.total_credits, 12);

  // Seeding is only a starting point; the draft still goes through submit.
  let submitted = s.submit_registration(reg.registration_id).await.unwrap();
  assert_eq!(submitted.status, RegistrationStatus::Submitted);
}

#[tokio::test]
async fn registrations_can_be_filtered() {
  let s = store().await;
  let term = active_term(&s, "2024/2025-GANJIL").await;
  let sections = timetable(&s, term.term_id, 3, 4).await;
  let a = student(&s).await;
  let b = student(&s).await;
  let reg_a = draft(&s, a, term.term_id, &sections).await;
  s.submit_registration(reg_a.registration_id).await.unwrap();
  s.create_registration(b, term.term_id).await.unwrap();

  let submitted = s
    .list_registrations(&RegistrationQuery {
      status: Some(RegistrationStatus::Submitted),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(submitted.len(), 1);
  assert_eq!(submitted[0].student_id, a);
  assert_eq!(submitted[0].lines.len(), 4);

  let all = s
    .list_registrations(&RegistrationQuery {
      term_id: Some(term.term_id),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(all.len(), 2);

  let err = validation(
    s.list_registrations(&RegistrationQuery { limit: Some(0), ..Default::default() })
      .await,
  );
  assert!(matches!(err, ValidationError::InvalidQuery(_)));
}

// ─── Quota ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn last_seat_goes_to_exactly_one_submitter() {
  let s = store().await;
  let term = active_term(&s, "2024/2025-GANJIL").await;
  let contested = section(&s, term.term_id, 3, Weekday::Mon, (7, 0), (9, 0), 30).await;
  let filler = timetable(&s, term.term_id, 3, 4).await;
  let mut lines = vec![contested.section_id];
  lines.extend(&filler[1..]);

  for _ in 0..29 {
    let id = student(&s).await;
    let reg = draft(&s, id, term.term_id, &lines).await;
    s.submit_registration(reg.registration_id).await.unwrap();
  }
  assert_eq!(s.seat_usage(contested.section_id).await.unwrap().remaining(), 1);

  let first = draft(&s, student(&s).await, term.term_id, &lines).await;
  let second = draft(&s, student(&s).await, term.term_id, &lines).await;

  let (a, b) = tokio::join!(
    s.submit_registration(first.registration_id),
    s.submit_registration(second.registration_id),
  );
  let (won, lost) = match (a, b) {
    (Ok(won), Err(lost)) | (Err(lost), Ok(won)) => (won, lost),
    (a, b) => panic!("expected exactly one success, got {a:?} and {b:?}"),
  };
  assert_eq!(won.status, RegistrationStatus::Submitted);

  let err = validation::<()>(Err(lost));
  let ValidationError::QuotaExceeded(shortfalls) = err else {
    panic!("expected a quota error, got {err:?}");
  };
  assert_eq!(shortfalls.len(), 1);
  assert_eq!(shortfalls[0].section_id, contested.section_id);
  assert_eq!(shortfalls[0].seat_cap, 30);

  let usage = s.seat_usage(contested.section_id).await.unwrap();
  assert_eq!(usage.enrolled, 30);
  assert!(!usage.available());
}

#[tokio::test]
async fn every_full_section_is_reported() {
  let s = store().await;
  let term = active_term(&s, "2024/2025-GANJIL").await;
  let first = section(&s, term.term_id, 3, Weekday::Mon, (8, 0), (10, 0), 1).await;
  let second = section(&s, term.term_id, 3, Weekday::Tue, (8, 0), (10, 0), 1).await;
  let open = section(&s, term.term_id, 3, Weekday::Wed, (8, 0), (10, 0), 40).await;
  let also_open = section(&s, term.term_id, 3, Weekday::Thu, (8, 0), (10, 0), 40).await;
  let lines = [
    first.section_id,
    second.section_id,
    open.section_id,
    also_open.section_id,
  ];

  let holder = draft(&s, student(&s).await, term.term_id, &lines).await;
  s.submit_registration(holder.registration_id).await.unwrap();

  let latecomer = draft(&s, student(&s).await, term.term_id, &lines).await;
  let err = validation(s.submit_registration(latecomer.registration_id).await);
  let ValidationError::QuotaExceeded(shortfalls) = err else {
    panic!("expected a quota error, got {err:?}");
  };
  let mut full: Vec<Uuid> = shortfalls.iter().map(|q| q.section_id).collect();
  full.sort();
  let mut expected = vec![first.section_id, second.section_id];
  expected.sort();
  assert_eq!(full, expected);
  assert!(shortfalls.iter().all(|q| q.enrolled == 1 && q.seat_cap == 1));

  let still_draft = s
    .get_registration(latecomer.registration_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(still_draft.status, RegistrationStatus::Draft);
}

// ─── Grades ──────────────────────────────────────────────────────────────────

/// One section with `n` approved students. Each student also carries three
/// filler sections so the registration meets the credit floor.
async fn roster(s: &SqliteStore, n: usize) -> (Term, Uuid, Vec<Uuid>) {
  let term = active_term(s, "2024/2025-GANJIL").await;
  let graded = section(s, term.term_id, 3, Weekday::Sat, (8, 0), (10, 0), 40).await;
  let filler = timetable(s, term.term_id, 3, 3).await;
  let mut lines = vec![graded.section_id];
  lines.extend(&filler);

  let mut students = Vec::with_capacity(n);
  for _ in 0..n {
    let id = student(s).await;
    enroll(s, id, term.term_id, &lines).await;
    students.push(id);
  }
  (term, graded.section_id, students)
}

#[tokio::test]
async fn scores_map_to_letters() {
  let s = store().await;
  let (_, section_id, students) = roster(&s, 3).await;

  let saved = s
    .save_grades(section_id, vec![
      ScoreEntry { student_id: students[0], score: 92.0 },
      ScoreEntry { student_id: students[1], score: 73.0 },
      ScoreEntry { student_id: students[2], score: 40.0 },
    ])
    .await
    .unwrap();
  let letters: Vec<LetterGrade> = saved.iter().map(|g| g.letter).collect();
  assert_eq!(letters, [LetterGrade::A, LetterGrade::BC, LetterGrade::E]);

  // Resaving overwrites in place.
  s.save_grades(section_id, vec![ScoreEntry { student_id: students[2], score: 55.5 }])
    .await
    .unwrap();
  let stored = s.list_grades(section_id).await.unwrap();
  assert_eq!(stored.len(), 3);
  let third = stored.iter().find(|g| g.student_id == students[2]).unwrap();
  assert_eq!(third.letter, LetterGrade::CD);
  assert_eq!(third.points, 1.5);
}

#[tokio::test]
async fn out_of_range_batch_is_not_applied() {
  let s = store().await;
  let (_, section_id, students) = roster(&s, 3).await;

  let err = validation(
    s.save_grades(section_id, vec![
      ScoreEntry { student_id: students[0], score: 80.0 },
      ScoreEntry { student_id: students[1], score: 101.0 },
      ScoreEntry { student_id: students[2], score: -1.0 },
    ])
    .await,
  );
  let ValidationError::ScoresOutOfRange(bad) = err else {
    panic!("expected out-of-range scores, got {err:?}");
  };
  assert_eq!(bad.len(), 2);
  assert!(s.list_grades(section_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn only_enrolled_students_can_be_graded() {
  let s = store().await;
  let (_, section_id, students) = roster(&s, 1).await;
  let stranger = student(&s).await;

  let err = validation(
    s.save_grades(section_id, vec![
      ScoreEntry { student_id: students[0], score: 80.0 },
      ScoreEntry { student_id: stranger, score: 80.0 },
    ])
    .await,
  );
  assert_eq!(err, ValidationError::NotEnrolled { section_id, students: vec![stranger] });
  assert!(s.list_grades(section_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn finalize_requires_every_grade() {
  let s = store().await;
  let (_, section_id, students) = roster(&s, 3).await;
  s.save_grades(section_id, vec![
    ScoreEntry { student_id: students[0], score: 80.0 },
    ScoreEntry { student_id: students[1], score: 70.0 },
  ])
  .await
  .unwrap();

  let err = validation(s.finalize_section(section_id).await);
  assert_eq!(err, ValidationError::MissingGrades { section_id, missing: 1 });
  assert!(s.list_grades(section_id).await.unwrap().iter().all(|g| !g.finalized));
}

#[tokio::test]
async fn empty_ledger_cannot_be_finalized() {
  let s = store().await;
  let term = active_term(&s, "2024/2025-GANJIL").await;
  let empty = section(&s, term.term_id, 3, Weekday::Mon, (8, 0), (10, 0), 10).await;

  let err = state(s.finalize_section(empty.section_id).await);
  assert_eq!(err, StateError::LedgerEmpty { section_id: empty.section_id });
}

#[tokio::test]
async fn finalized_ledger_is_locked_until_unlocked() {
  let s = store().await;
  let (term, section_id, students) = roster(&s, 2).await;
  let scores: Vec<(Uuid, f64)> = students.iter().map(|&id| (id, 85.0)).collect();
  grade_and_finalize(&s, section_id, &scores).await;

  assert!(s.list_grades(section_id).await.unwrap().iter().all(|g| g.finalized));

  let err = state(s.finalize_section(section_id).await);
  assert_eq!(err, StateError::LedgerAlreadyFinalized { section_id });

  let err = validation(
    s.save_grades(section_id, vec![ScoreEntry { student_id: students[0], score: 50.0 }])
      .await,
  );
  assert_eq!(err, ValidationError::LedgerLocked { section_id });

  assert_eq!(s.unlock_section(section_id).await.unwrap(), 2);
  assert_eq!(s.unlock_section(section_id).await.unwrap(), 0);
  s.save_grades(section_id, vec![ScoreEntry { student_id: students[0], score: 50.0 }])
    .await
    .unwrap();

  // Transcripts stay as last computed until the next finalize.
  let before = s.list_transcripts(students[0]).await.unwrap();
  assert_eq!(before[0].term_id, term.term_id);
  assert_eq!(before[0].semester_gpa, 3.5);

  let outcome = s.finalize_section(section_id).await.unwrap();
  assert_eq!(outcome.finalized, 2);
  let after = s.list_transcripts(students[0]).await.unwrap();
  assert_eq!(after[0].transcript_id, before[0].transcript_id);
  assert_eq!(after[0].semester_gpa, 1.0);
}

#[tokio::test]
async fn section_locks_are_released_after_use() {
  let s = store().await;
  for _ in 0..50 {
    let unknown = Uuid::new_v4();
    let entries = vec![ScoreEntry { student_id: Uuid::new_v4(), score: 70.0 }];
    assert!(s.save_grades(unknown, entries).await.is_err());
    assert!(s.unlock_section(unknown).await.is_err());
    assert!(s.finalize_section(unknown).await.is_err());
  }
  assert_eq!(s.section_lock_count(), 0);

  let (_, section_id, students) = roster(&s, 1).await;
  let (saved, unlocked) = tokio::join!(
    s.save_grades(section_id, vec![ScoreEntry { student_id: students[0], score: 70.0 }]),
    s.unlock_section(section_id),
  );
  saved.unwrap();
  unlocked.unwrap();
  s.finalize_section(section_id).await.unwrap();
  assert_eq!(s.section_lock_count(), 0);
}

// ─── Transcripts ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn semester_gpa_is_credit_weighted() {
  let s = store().await;
  let term = active_term(&s, "2024/2025-GANJIL").await;
  let sections = timetable(&s, term.term_id, 3, 4).await;
  let student_id = student(&s).await;
  enroll(&s, student_id, term.term_id, &sections).await;

  for (section_id, score) in sections.iter().zip([95.0, 91.0, 78.0, 74.0]) {
    grade_and_finalize(&s, *section_id, &[(student_id, score)]).await;
  }

  let transcripts = s.list_transcripts(student_id).await.unwrap();
  assert_eq!(transcripts.len(), 1);
  assert_eq!(transcripts[0].semester_gpa, 3.5);
  assert_eq!(transcripts[0].semester_credits, 12);
  assert_eq!(transcripts[0].cumulative_gpa, 3.5);
}

#[tokio::test]
async fn cumulative_gpa_follows_the_academic_calendar() {
  let s = store().await;
  let student_id = student(&s).await;

  // Inserted out of calendar order; each term gets one uniform letter.
  let plan = [
    ("2025/2026-GANJIL", 62.0, 2.0),
    ("2024/2025-GENAP", 75.0, 3.0),
    ("2024/2025-GANJIL", 95.0, 4.0),
  ];
  let mut terms = Vec::new();
  for (label, score, _) in plan {
    let term = active_term(&s, label).await;
    let sections = timetable(&s, term.term_id, 3, 4).await;
    enroll(&s, student_id, term.term_id, &sections).await;
    for section_id in &sections {
      grade_and_finalize(&s, *section_id, &[(student_id, score)]).await;
    }
    terms.push(term);
  }

  for term in &terms {
    s.recompute_transcripts(vec![student_id], term.term_id).await.unwrap();
  }

  let transcripts = s.list_transcripts(student_id).await.unwrap();
  let summary: Vec<(f64, f64, u32)> = transcripts
    .iter()
    .map(|t| (t.semester_gpa, t.cumulative_gpa, t.cumulative_credits))
    .collect();
  assert_eq!(summary, [(4.0, 4.0, 12), (3.0, 3.5, 24), (2.0, 3.0, 36)]);
  assert_eq!(transcripts[0].term_id, terms[2].term_id);
}

#[tokio::test]
async fn recompute_is_idempotent() {
  let s = store().await;
  let (term, section_id, students) = roster(&s, 2).await;
  grade_and_finalize(&s, section_id, &[(students[0], 88.0), (students[1], 59.0)]).await;

  let first = s.recompute_transcripts(students.clone(), term.term_id).await.unwrap();
  let second = s.recompute_transcripts(students.clone(), term.term_id).await.unwrap();
  assert_eq!(first.len(), 2);
  for (a, b) in first.iter().zip(&second) {
    assert_eq!(a.transcript_id, b.transcript_id);
    assert_eq!(a.semester_gpa.to_bits(), b.semester_gpa.to_bits());
    assert_eq!(a.cumulative_gpa.to_bits(), b.cumulative_gpa.to_bits());
    assert_eq!(a.semester_credits, b.semester_credits);
    assert_eq!(a.cumulative_credits, b.cumulative_credits);
  }
}

#[tokio::test]
async fn previous_semester_gpa_sets_next_load_cap() {
  let s = store().await;
  let first = active_term(&s, "2024/2025-GANJIL").await;
  let sections = timetable(&s, first.term_id, 4, 5).await;
  let student_id = student(&s).await;

  let limit = s.max_load(student_id, first.term_id).await.unwrap();
  assert_eq!((limit.floor, limit.cap), (12, 24));
  assert!(limit.basis.is_none());

  enroll(&s, student_id, first.term_id, &sections).await;
  // B, BC, C, C, C over 4 credits each: 46 / 20 = 2.3.
  for (section_id, score) in sections.iter().zip([75.0, 70.0, 62.0, 62.0, 62.0]) {
    grade_and_finalize(&s, *section_id, &[(student_id, score)]).await;
  }

  let next = active_term(&s, "2024/2025-GENAP").await;
  let limit = s.max_load(student_id, next.term_id).await.unwrap();
  assert_eq!(limit.cap, 18);
  let basis = limit.basis.unwrap();
  assert_eq!(basis.term_id, first.term_id);
  assert_eq!(basis.semester_gpa, 2.3);

  let heavy = timetable(&s, next.term_id, 4, 5).await;
  let reg = draft(&s, student_id, next.term_id, &heavy).await;
  let err = validation(s.submit_registration(reg.registration_id).await);
  assert_eq!(err, ValidationError::AboveCreditCap { total: 20, cap: 18 });
}
