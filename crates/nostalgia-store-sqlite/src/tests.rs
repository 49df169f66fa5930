//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, Utc};
use nostalgia_core::{
  book::NewBook,
  category::{Category, NewCategory},
  event::NewSignificantEvent,
  fact::{NewApiFact, NewInformationItem},
  job::{JobQueue, JobStatus, RefreshRequest},
  kv::KeyValueStore,
  store::{BookQuery, FactStore},
  submission::{
    ModerationStatus, NewSubmission, NotificationContact, Review, ReviewOutcome,
  },
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn category(s: &SqliteStore, name: &str) -> Category {
  s.add_category(NewCategory::named(name)).await.unwrap()
}

fn book(title: &str, year: i32, description: &str, category_ids: Vec<Uuid>) -> NewBook {
  NewBook {
    title: title.into(),
    author: "Jane Doe".into(),
    description: description.into(),
    year,
    category_ids,
    relevance: format!("Published in {year}; recommended for fiction."),
    isbn: None,
    cover_url: None,
    source_url: None,
  }
}

fn submission(user_id: Uuid, year: i32, category_ids: Vec<Uuid>) -> NewSubmission {
  NewSubmission {
    user_id,
    year,
    title: "The Y2K bug".into(),
    description: "Nothing happened, mostly.".into(),
    category_ids,
    source_url: "https://example.com/y2k".into(),
    notification: Some(NotificationContact::Email("a@example.com".into())),
  }
}

fn outcome(status: ModerationStatus, reviewer: Uuid) -> ReviewOutcome {
  ReviewOutcome {
    status,
    review: Review { reviewed_by: reviewer, reviewed_at: Utc::now() },
    notes: Some("checked".into()),
  }
}

// ─── Categories ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn categories_get_slugs_and_sort_by_name() {
  let s = store().await;
  category(&s, "Technology").await;
  category(&s, "Pop Culture").await;

  let all = s.list_categories().await.unwrap();
  let names: Vec<_> = all.iter().map(|c| c.name.as_str()).collect();
  assert_eq!(names, ["Pop Culture", "Technology"]);

  let found = s.category_by_slug("pop-culture").await.unwrap().unwrap();
  assert_eq!(found.name, "Pop Culture");
  assert!(s.category_by_slug("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_category_name_is_rejected() {
  let s = store().await;
  category(&s, "Science").await;
  assert!(s.add_category(NewCategory::named("Science")).await.is_err());
}

// ─── Curated items ───────────────────────────────────────────────────────────

#[tokio::test]
async fn items_in_category_ordered_by_year() {
  let s = store().await;
  let tech = category(&s, "Technology").await;
  let other = category(&s, "Music").await;

  for (year, title) in [(2010, "Smartphones"), (1995, "Dial-up")] {
    s.add_item(NewInformationItem {
      title: title.into(),
      description: "d".into(),
      year,
      category_ids: vec![tech.category_id],
      ..Default::default()
    })
    .await
    .unwrap();
  }
  s.add_item(NewInformationItem {
    title: "CDs".into(),
    description: "d".into(),
    year: 1999,
    category_ids: vec![other.category_id],
    is_outdated: true,
    ..Default::default()
  })
  .await
  .unwrap();

  let items = s.items_in_category(tech.category_id).await.unwrap();
  let titles: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
  assert_eq!(titles, ["Dial-up", "Smartphones"]);
  assert_eq!(items[0].categories, vec![tech]);
}

// ─── Events ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn event_upsert_keys_on_year_and_title() {
  let s = store().await;
  let first = s
    .upsert_event(NewSignificantEvent {
      title:       "Moon landing".into(),
      description: "Old text".into(),
      year:        1969,
      impact:      "Impact information not available.".into(),
      source_url:  None,
    })
    .await
    .unwrap();
  let second = s
    .upsert_event(NewSignificantEvent {
      title:       "Moon landing".into(),
      description: "New text".into(),
      year:        1969,
      impact:      "Space race".into(),
      source_url:  Some("https://en.wikipedia.org/wiki/Apollo_11".into()),
    })
    .await
    .unwrap();

  assert_eq!(first.event_id, second.event_id);
  assert_eq!(second.description, "New text");
  assert_eq!(s.events_since(1900, 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn event_titles_are_truncated() {
  let s = store().await;
  let event = s
    .upsert_event(NewSignificantEvent {
      title:       "x".repeat(250),
      description: "d".into(),
      year:        2001,
      impact:      "i".into(),
      source_url:  None,
    })
    .await
    .unwrap();
  assert_eq!(event.title.chars().count(), 200);
}

#[tokio::test]
async fn events_since_filters_orders_and_limits() {
  let s = store().await;
  for (year, title) in [(2005, "B"), (1999, "Old"), (2005, "A"), (2001, "C")] {
    s.upsert_event(NewSignificantEvent {
      title:       title.into(),
      description: "d".into(),
      year,
      impact:      "i".into(),
      source_url:  None,
    })
    .await
    .unwrap();
  }

  let events = s.events_since(2000, 10).await.unwrap();
  let keys: Vec<_> = events.iter().map(|e| (e.year, e.title.as_str())).collect();
  assert_eq!(keys, [(2001, "C"), (2005, "A"), (2005, "B")]);

  assert_eq!(s.events_since(2000, 2).await.unwrap().len(), 2);
}

// ─── Books ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn book_upsert_merges_categories() {
  let s = store().await;
  let fiction = category(&s, "Fiction").await;
  let history = category(&s, "History").await;

  let a = s.upsert_book(book("Dune", 1965, "Sand.", vec![fiction.category_id])).await.unwrap();
  let b = s.upsert_book(book("Dune", 1965, "Spice.", vec![history.category_id])).await.unwrap();

  assert_eq!(a.book_id, b.book_id);
  assert_eq!(b.description, "Spice.");
  let slugs: Vec<_> = b.categories.iter().map(|c| c.slug.as_str()).collect();
  assert_eq!(slugs, ["fiction", "history"]);
}

#[tokio::test]
async fn books_since_hides_blank_descriptions() {
  let s = store().await;
  let fiction = category(&s, "Fiction").await;
  let science = category(&s, "Science").await;

  s.upsert_book(book("Visible", 2001, "A story.", vec![fiction.category_id])).await.unwrap();
  s.upsert_book(book("Blank", 2002, "   ", vec![fiction.category_id])).await.unwrap();
  s.upsert_book(book("Too old", 1990, "Old.", vec![fiction.category_id])).await.unwrap();
  s.upsert_book(book("Other", 2003, "Facts.", vec![science.category_id])).await.unwrap();

  let all = s
    .books_since(&BookQuery { since_year: 2000, ..Default::default() })
    .await
    .unwrap();
  let titles: Vec<_> = all.iter().map(|b| b.title.as_str()).collect();
  assert_eq!(titles, ["Visible", "Other"]);

  let fiction_only = s
    .books_since(&BookQuery {
      since_year:  2000,
      category_id: Some(fiction.category_id),
      limit:       Some(5),
    })
    .await
    .unwrap();
  assert_eq!(fiction_only.len(), 1);
  assert_eq!(fiction_only[0].title, "Visible");
}

#[tokio::test]
async fn cleanup_removes_only_blank_books() {
  let s = store().await;
  s.upsert_book(book("Keep", 2001, "Text.", vec![])).await.unwrap();
  s.upsert_book(book("Drop", 2001, "", vec![])).await.unwrap();
  s.upsert_book(book("Drop too", 2001, " \n", vec![])).await.unwrap();

  assert_eq!(s.count_books_without_description().await.unwrap(), 2);
  assert_eq!(s.delete_books_without_description().await.unwrap(), 2);
  assert_eq!(s.count_books_without_description().await.unwrap(), 0);
  assert_eq!(s.delete_books_without_description().await.unwrap(), 0);
}

// ─── API facts ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn api_facts_exact_year_and_category() {
  let s = store().await;
  let tech = category(&s, "Technology").await;
  let music = category(&s, "Music").await;

  for (title, cat) in [("Zip drives", &tech), ("Boy bands", &music), ("Altavista", &tech)] {
    s.upsert_api_fact(NewApiFact {
      year:         1999,
      title:        title.into(),
      description:  "In 1999, something.".into(),
      source_url:   "https://en.wikipedia.org/wiki/X".into(),
      category_ids: vec![cat.category_id],
    })
    .await
    .unwrap();
  }
  s.upsert_api_fact(NewApiFact {
    year:         2000,
    title:        "Other year".into(),
    description:  "d".into(),
    source_url:   "https://en.wikipedia.org/wiki/Y".into(),
    category_ids: vec![],
  })
  .await
  .unwrap();

  let all = s.api_facts(1999, None).await.unwrap();
  let titles: Vec<_> = all.iter().map(|f| f.title.as_str()).collect();
  assert_eq!(titles, ["Altavista", "Boy bands", "Zip drives"]);

  let tech_only = s.api_facts(1999, Some(tech.category_id)).await.unwrap();
  assert_eq!(tech_only.len(), 2);
}

#[tokio::test]
async fn api_fact_upsert_overwrites_description() {
  let s = store().await;
  let input = |description: &str| NewApiFact {
    year:         2004,
    title:        "Facebook".into(),
    description:  description.into(),
    source_url:   "https://en.wikipedia.org/wiki/Facebook".into(),
    category_ids: vec![],
  };
  let a = s.upsert_api_fact(input("first")).await.unwrap();
  let b = s.upsert_api_fact(input("second")).await.unwrap();
  assert_eq!(a.fact_id, b.fact_id);
  assert_eq!(s.api_facts(2004, None).await.unwrap()[0].description, "second");
}

// ─── Submissions ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn new_submission_is_under_review() {
  let s = store().await;
  let tech = category(&s, "Technology").await;
  let user = Uuid::new_v4();

  let sub = s.insert_submission(submission(user, 2000, vec![tech.category_id])).await.unwrap();
  assert_eq!(sub.status, ModerationStatus::UnderReview);
  assert!(sub.review.is_none());
  assert_eq!(sub.categories, vec![tech]);
  assert_eq!(
    sub.notification,
    Some(NotificationContact::Email("a@example.com".into()))
  );

  let fetched = s.get_submission(sub.submission_id).await.unwrap().unwrap();
  assert_eq!(fetched.user_id, user);
  assert!(s.get_submission(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn review_applies_once() {
  let s = store().await;
  let admin = Uuid::new_v4();
  let sub = s.insert_submission(submission(Uuid::new_v4(), 2000, vec![])).await.unwrap();

  let reviewed = s
    .record_review(sub.submission_id, outcome(ModerationStatus::Approved, admin))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(reviewed.status, ModerationStatus::Approved);
  assert_eq!(reviewed.review.unwrap().reviewed_by, admin);
  assert_eq!(reviewed.review_notes.as_deref(), Some("checked"));

  let again = s
    .record_review(sub.submission_id, outcome(ModerationStatus::Denied, admin))
    .await
    .unwrap();
  assert!(again.is_none());
  let stored = s.get_submission(sub.submission_id).await.unwrap().unwrap();
  assert_eq!(stored.status, ModerationStatus::Approved);
}

#[tokio::test]
async fn undetermined_rows_cannot_be_reviewed() {
  let s = store().await;
  let sub = s.insert_submission(submission(Uuid::new_v4(), 2000, vec![])).await.unwrap();
  assert!(s.overwrite_status(sub.submission_id, ModerationStatus::Undetermined).await.unwrap());
  assert!(!s.overwrite_status(Uuid::new_v4(), ModerationStatus::Denied).await.unwrap());

  let result = s
    .record_review(sub.submission_id, outcome(ModerationStatus::Approved, Uuid::new_v4()))
    .await
    .unwrap();
  assert!(result.is_none());

  let stored = s.get_submission(sub.submission_id).await.unwrap().unwrap();
  assert_eq!(stored.status, ModerationStatus::Undetermined);
  assert!(stored.review.is_none());
}

#[tokio::test]
async fn approved_submissions_filter_by_year_and_category() {
  let s = store().await;
  let tech = category(&s, "Technology").await;
  let admin = Uuid::new_v4();

  let in_tech = s.insert_submission(submission(admin, 2000, vec![tech.category_id])).await.unwrap();
  let no_cat = s.insert_submission(submission(admin, 2000, vec![])).await.unwrap();
  let other_year = s.insert_submission(submission(admin, 2001, vec![])).await.unwrap();
  let pending = s.insert_submission(submission(admin, 2000, vec![])).await.unwrap();

  for id in [in_tech.submission_id, no_cat.submission_id, other_year.submission_id] {
    s.record_review(id, outcome(ModerationStatus::Approved, admin)).await.unwrap();
  }

  let year_2000 = s.approved_submissions(2000, None).await.unwrap();
  assert_eq!(year_2000.len(), 2);
  assert!(year_2000.iter().all(|f| f.submission_id != pending.submission_id));
  // Most recently reviewed first.
  assert_eq!(year_2000[0].submission_id, no_cat.submission_id);

  let tech_only = s.approved_submissions(2000, Some(tech.category_id)).await.unwrap();
  assert_eq!(tech_only.len(), 1);
  assert_eq!(tech_only[0].submission_id, in_tech.submission_id);

  let queue = s.submissions_with_status(ModerationStatus::UnderReview).await.unwrap();
  assert_eq!(queue.len(), 1);
  assert_eq!(queue[0].submission_id, pending.submission_id);
}

// ─── Key-value store ─────────────────────────────────────────────────────────

#[tokio::test]
async fn kv_set_get_delete() {
  let s = store().await;
  s.set("facts:2000:all", "[]".into(), Duration::hours(24)).await.unwrap();
  assert_eq!(s.get("facts:2000:all").await.unwrap().as_deref(), Some("[]"));

  s.delete("facts:2000:all").await.unwrap();
  assert!(s.get("facts:2000:all").await.unwrap().is_none());
}

#[tokio::test]
async fn kv_expired_entries_are_misses() {
  let s = store().await;
  s.set("gone", "x".into(), Duration::seconds(-1)).await.unwrap();
  assert!(s.get("gone").await.unwrap().is_none());
}

#[tokio::test]
async fn kv_increment_counts_and_restarts_after_expiry() {
  let s = store().await;
  assert_eq!(s.increment("submissions:u", Duration::hours(1)).await.unwrap(), 1);
  assert_eq!(s.increment("submissions:u", Duration::hours(1)).await.unwrap(), 2);

  // Written already expired: the next increment opens a fresh window.
  s.set("submissions:v", "9".into(), Duration::seconds(-1)).await.unwrap();
  assert_eq!(s.increment("submissions:v", Duration::hours(1)).await.unwrap(), 1);
  assert_eq!(s.get("submissions:v").await.unwrap().as_deref(), Some("1"));
}

#[tokio::test]
async fn kv_decrement_and_purge() {
  let s = store().await;
  s.increment("submissions:w", Duration::hours(1)).await.unwrap();
  s.increment("submissions:w", Duration::hours(1)).await.unwrap();
  s.decrement("submissions:w").await.unwrap();
  assert_eq!(s.get("submissions:w").await.unwrap().as_deref(), Some("1"));
  s.decrement("submissions:w").await.unwrap();
  s.decrement("submissions:w").await.unwrap();
  assert_eq!(s.get("submissions:w").await.unwrap().as_deref(), Some("0"));

  s.set("stale:a", "x".into(), Duration::seconds(-1)).await.unwrap();
  s.set("stale:b", "y".into(), Duration::seconds(-1)).await.unwrap();
  assert_eq!(s.purge_expired().await.unwrap(), 2);
  assert_eq!(s.purge_expired().await.unwrap(), 0);
  assert_eq!(s.get("submissions:w").await.unwrap().as_deref(), Some("0"));
}

// ─── Refresh jobs ────────────────────────────────────────────────────────────

fn lease() -> Duration { Duration::minutes(10) }

fn request(year: i32, category: Option<&str>) -> RefreshRequest {
  RefreshRequest { year, category: category.map(str::to_owned) }
}

#[tokio::test]
async fn duplicate_enqueue_is_a_no_op() {
  let s = store().await;
  let now = Utc::now();

  assert!(s.enqueue_refresh(request(2000, None), now).await.unwrap().is_some());
  assert!(s.enqueue_refresh(request(2000, None), now).await.unwrap().is_none());
  assert!(s.enqueue_refresh(request(2000, Some("science")), now).await.unwrap().is_some());
  assert_eq!(s.jobs_with_status(JobStatus::Pending).await.unwrap().len(), 2);
}

#[tokio::test]
async fn claim_retry_and_abandon() {
  let s = store().await;
  let now = Utc::now();
  let job = s.enqueue_refresh(request(1999, None), now).await.unwrap().unwrap();

  let claimed = s.claim_due_jobs(now, lease(), 10).await.unwrap();
  assert_eq!(claimed.len(), 1);
  assert_eq!(claimed[0].status, JobStatus::Running);
  assert_eq!(claimed[0].attempts, 1);
  // Running jobs still block duplicates.
  assert!(s.enqueue_refresh(request(1999, None), now).await.unwrap().is_none());

  let retry_at = now + Duration::seconds(60);
  s.retry_job(job.job_id, retry_at, "timeout".into()).await.unwrap();
  assert!(s.claim_due_jobs(now, lease(), 10).await.unwrap().is_empty());

  let again = s.claim_due_jobs(retry_at, lease(), 10).await.unwrap();
  assert_eq!(again[0].attempts, 2);
  assert_eq!(again[0].last_error.as_deref(), Some("timeout"));

  s.abandon_job(job.job_id, "gave up".into()).await.unwrap();
  let abandoned = s.jobs_with_status(JobStatus::Abandoned).await.unwrap();
  assert_eq!(abandoned.len(), 1);
  assert_eq!(abandoned[0].last_error.as_deref(), Some("gave up"));
  assert!(s.claim_due_jobs(retry_at, lease(), 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn completed_jobs_allow_a_new_enqueue() {
  let s = store().await;
  let now = Utc::now();
  let job = s.enqueue_refresh(request(2010, None), now).await.unwrap().unwrap();
  s.claim_due_jobs(now, lease(), 1).await.unwrap();
  s.complete_job(job.job_id).await.unwrap();

  assert_eq!(s.jobs_with_status(JobStatus::Done).await.unwrap().len(), 1);
  assert!(s.enqueue_refresh(request(2010, None), now).await.unwrap().is_some());
}

#[tokio::test]
async fn expired_leases_are_reclaimed() {
  let s = store().await;
  let now = Utc::now();
  let job = s.enqueue_refresh(request(2000, None), now).await.unwrap().unwrap();

  assert_eq!(s.claim_due_jobs(now, lease(), 10).await.unwrap().len(), 1);
  // Still leased: nobody else may pick it up.
  assert!(s.claim_due_jobs(now + Duration::minutes(5), lease(), 10).await.unwrap().is_empty());

  // The worker never reported back; once the lease lapses the job runs again.
  let later = now + Duration::minutes(11);
  let reclaimed = s.claim_due_jobs(later, lease(), 10).await.unwrap();
  assert_eq!(reclaimed.len(), 1);
  assert_eq!(reclaimed[0].job_id, job.job_id);
  assert_eq!(reclaimed[0].attempts, 2);
  assert!(reclaimed[0].available_at > later);

  s.complete_job(job.job_id).await.unwrap();
  assert!(s.enqueue_refresh(request(2000, None), later).await.unwrap().is_some());
}

#[tokio::test]
async fn pruning_keeps_recent_and_unfinished_jobs() {
  let s = store().await;
  let old = Utc::now() - Duration::days(30);
  let recent = Utc::now();

  let done_old = s.enqueue_refresh(request(2000, None), old).await.unwrap().unwrap();
  s.complete_job(done_old.job_id).await.unwrap();
  let abandoned_old = s.enqueue_refresh(request(2001, None), old).await.unwrap().unwrap();
  s.abandon_job(abandoned_old.job_id, "gave up".into()).await.unwrap();
  s.enqueue_refresh(request(2002, None), old).await.unwrap().unwrap();
  let done_recent = s.enqueue_refresh(request(2003, None), recent).await.unwrap().unwrap();
  s.complete_job(done_recent.job_id).await.unwrap();

  let cutoff = recent - Duration::days(7);
  assert_eq!(s.prune_finished_jobs(cutoff).await.unwrap(), 2);
  assert_eq!(s.prune_finished_jobs(cutoff).await.unwrap(), 0);
  assert_eq!(s.jobs_with_status(JobStatus::Pending).await.unwrap().len(), 1);
  assert_eq!(s.jobs_with_status(JobStatus::Done).await.unwrap().len(), 1);
}
