use crate::fixtures::*;
use chrono::Utc;
use std::sync::atomic::Ordering;
use sumi_harvest::harvester::{
    run_harvest, FeedTarget, HarvestRequest, ScrapeOutcome, UnreachableReason,
};
use sumi_harvest::model::MediaPayload;
use sumi_harvest::storage::{SqliteStorage, Storage};
use sumi_harvest::{RescrapeMode, Scope};

fn jack_feed() -> FeedTarget {
    FeedTarget::profile(profile("jack"), "jack", 7)
}

fn ids(outcome: ScrapeOutcome) -> Vec<String> {
    outcome.into_ids().unwrap_or_default()
}

// ===== Profile feed =====

#[tokio::test]
async fn test_second_run_finds_nothing_new() {
    let dir = tempfile::tempdir().unwrap();
    let page = timeline_page(&[Post::new("3", "third"), Post::new("2", "second")], None);

    let browser = FixtureBrowser::new().page(&profile("jack"), page.clone());
    let mut first = harvester(
        test_config(dir.path()),
        SqliteStorage::new_in_memory().unwrap(),
        browser,
        FixtureMedia::default(),
    );
    let outcome = first.scrape_feed(&jack_feed(), 10, RescrapeMode::None).await;
    assert_eq!(ids(outcome), vec!["3", "2"]);

    let storage = first.into_storage();
    let browser = FixtureBrowser::new().page(&profile("jack"), page);
    let mut second = harvester(test_config(dir.path()), storage, browser, FixtureMedia::default());
    let outcome = second.scrape_feed(&jack_feed(), 10, RescrapeMode::None).await;

    assert_eq!(outcome, ScrapeOutcome::NothingNew);
    assert_eq!(second.storage().count_records(Scope::Profile).unwrap(), 2);
}

#[tokio::test]
async fn test_force_both_stores_again() {
    let dir = tempfile::tempdir().unwrap();
    let page = timeline_page(&[Post::new("3", "third"), Post::new("2", "second")], None);

    let mut first = harvester(
        test_config(dir.path()),
        SqliteStorage::new_in_memory().unwrap(),
        FixtureBrowser::new().page(&profile("jack"), page.clone()),
        FixtureMedia::default(),
    );
    first.scrape_feed(&jack_feed(), 10, RescrapeMode::None).await;

    let mut second = harvester(
        test_config(dir.path()),
        first.into_storage(),
        FixtureBrowser::new().page(&profile("jack"), page),
        FixtureMedia::default(),
    );
    let outcome = second.scrape_feed(&jack_feed(), 10, RescrapeMode::Both).await;

    assert_eq!(ids(outcome), vec!["3", "2"]);
    assert_eq!(second.storage().count_records(Scope::Profile).unwrap(), 4);
    assert_eq!(second.storage().count_profiles().unwrap(), 1);
}

#[tokio::test]
async fn test_item_limit_keeps_feed_order() {
    let dir = tempfile::tempdir().unwrap();
    let page = timeline_page(
        &[
            Post::new("3", "third"),
            Post::new("2", "second"),
            Post::new("1", "first"),
        ],
        None,
    );

    let mut harvester = harvester(
        test_config(dir.path()),
        SqliteStorage::new_in_memory().unwrap(),
        FixtureBrowser::new().page(&profile("jack"), page),
        FixtureMedia::default(),
    );
    let outcome = harvester.scrape_feed(&jack_feed(), 2, RescrapeMode::None).await;

    assert_eq!(ids(outcome), vec!["3", "2"]);
    assert_eq!(harvester.storage().count_records(Scope::Profile).unwrap(), 2);
}

#[tokio::test]
async fn test_follows_load_more() {
    let dir = tempfile::tempdir().unwrap();
    let next = format!("{}?cursor=2", profile("jack"));

    let browser = FixtureBrowser::new()
        .page(
            &profile("jack"),
            timeline_page(&[Post::new("4", "four"), Post::new("3", "three")], Some("?cursor=2")),
        )
        .page(
            &next,
            timeline_page(&[Post::new("2", "two"), Post::new("1", "one")], None),
        );
    let visits = browser.visits();

    let mut harvester = harvester(
        test_config(dir.path()),
        SqliteStorage::new_in_memory().unwrap(),
        browser,
        FixtureMedia::default(),
    );
    let outcome = harvester.scrape_feed(&jack_feed(), 10, RescrapeMode::None).await;

    assert_eq!(ids(outcome), vec!["4", "3", "2", "1"]);
    assert_eq!(*visits.lock().unwrap(), vec![profile("jack"), next]);
}

#[tokio::test]
async fn test_archived_post_stops_the_feed() {
    let dir = tempfile::tempdir().unwrap();

    let mut first = harvester(
        test_config(dir.path()),
        SqliteStorage::new_in_memory().unwrap(),
        FixtureBrowser::new().page(&profile("jack"), timeline_page(&[Post::new("2", "two")], None)),
        FixtureMedia::default(),
    );
    first.scrape_feed(&jack_feed(), 10, RescrapeMode::None).await;

    let page = timeline_page(
        &[
            Post::new("3", "three"),
            Post::new("2", "two"),
            Post::new("1", "one"),
        ],
        None,
    );
    let mut second = harvester(
        test_config(dir.path()),
        first.into_storage(),
        FixtureBrowser::new().page(&profile("jack"), page),
        FixtureMedia::default(),
    );
    let outcome = second.scrape_feed(&jack_feed(), 10, RescrapeMode::None).await;

    assert_eq!(ids(outcome), vec!["3"]);
    assert_eq!(second.storage().count_records(Scope::Profile).unwrap(), 2);
}

#[tokio::test]
async fn test_archived_pinned_post_does_not_stop_the_feed() {
    let dir = tempfile::tempdir().unwrap();

    let mut first = harvester(
        test_config(dir.path()),
        SqliteStorage::new_in_memory().unwrap(),
        FixtureBrowser::new().page(
            &profile("jack"),
            timeline_page(&[Post::new("9", "pinned").pinned(), Post::new("2", "two")], None),
        ),
        FixtureMedia::default(),
    );
    first.scrape_feed(&jack_feed(), 10, RescrapeMode::None).await;

    let page = timeline_page(
        &[
            Post::new("9", "pinned").pinned(),
            Post::new("3", "three"),
            Post::new("2", "two"),
        ],
        None,
    );
    let mut second = harvester(
        test_config(dir.path()),
        first.into_storage(),
        FixtureBrowser::new().page(&profile("jack"), page),
        FixtureMedia::default(),
    );
    let outcome = second.scrape_feed(&jack_feed(), 10, RescrapeMode::None).await;

    assert_eq!(ids(outcome), vec!["3"]);
}

#[tokio::test]
async fn test_young_posts_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let page = timeline_page(
        &[Post::new("5", "fresh").at(Utc::now()), Post::new("4", "settled")],
        None,
    );

    let mut harvester = harvester(
        test_config(dir.path()),
        SqliteStorage::new_in_memory().unwrap(),
        FixtureBrowser::new().page(&profile("jack"), page),
        FixtureMedia::default(),
    );
    let outcome = harvester.scrape_feed(&jack_feed(), 10, RescrapeMode::None).await;

    assert_eq!(ids(outcome), vec!["4"]);
}

#[tokio::test]
async fn test_profile_card_stored_once() {
    let dir = tempfile::tempdir().unwrap();
    let page = timeline_page(&[Post::new("1", "one")], None);

    let mut first = harvester(
        test_config(dir.path()),
        SqliteStorage::new_in_memory().unwrap(),
        FixtureBrowser::new().page(&profile("jack"), page.clone()),
        FixtureMedia::default(),
    );
    first.scrape_feed(&jack_feed(), 10, RescrapeMode::None).await;

    let mut second = harvester(
        test_config(dir.path()),
        first.into_storage(),
        FixtureBrowser::new().page(&profile("jack"), page),
        FixtureMedia::default(),
    );
    second.scrape_feed(&jack_feed(), 10, RescrapeMode::Both).await;

    let storage = second.storage();
    assert_eq!(storage.count_profiles().unwrap(), 1);

    let card = storage.find_profile("jack").unwrap().unwrap();
    assert_eq!(card.fullname, "Jack");
    assert_eq!(card.counts.posts, 1_204);
}

// ===== Page failures =====

#[tokio::test]
async fn test_rate_limited_page_is_retried() {
    let dir = tempfile::tempdir().unwrap();
    let browser = FixtureBrowser::new()
        .response(&profile("jack"), FixturePage::RateLimited)
        .page(&profile("jack"), timeline_page(&[Post::new("1", "one")], None));
    let visits = browser.visits();

    let mut harvester = harvester(
        test_config(dir.path()),
        SqliteStorage::new_in_memory().unwrap(),
        browser,
        FixtureMedia::default(),
    );
    let outcome = harvester.scrape_feed(&jack_feed(), 10, RescrapeMode::None).await;

    assert_eq!(ids(outcome), vec!["1"]);
    assert_eq!(visits.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_rate_limit_banner_is_retried() {
    let dir = tempfile::tempdir().unwrap();
    let banner = r#"<html><body><div class="error-panel"><span>Instance has been rate limited.</span></div></body></html>"#;
    let browser = FixtureBrowser::new()
        .page(&profile("jack"), banner.to_string())
        .page(&profile("jack"), timeline_page(&[Post::new("1", "one")], None));
    let visits = browser.visits();

    let mut harvester = harvester(
        test_config(dir.path()),
        SqliteStorage::new_in_memory().unwrap(),
        browser,
        FixtureMedia::default(),
    );
    let outcome = harvester.scrape_feed(&jack_feed(), 10, RescrapeMode::None).await;

    assert_eq!(ids(outcome), vec!["1"]);
    assert_eq!(visits.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_error_banner_is_not_retried() {
    let dir = tempfile::tempdir().unwrap();
    let banner = r#"<html><body><div class="error-panel"><span>User "ghost" not found</span></div></body></html>"#;
    let browser = FixtureBrowser::new().page(&profile("ghost"), banner.to_string());
    let visits = browser.visits();

    let mut harvester = harvester(
        test_config(dir.path()),
        SqliteStorage::new_in_memory().unwrap(),
        browser,
        FixtureMedia::default(),
    );
    let target = FeedTarget::profile(profile("ghost"), "ghost", 7);
    let outcome = harvester.scrape_feed(&target, 10, RescrapeMode::None).await;

    assert_eq!(outcome, ScrapeOutcome::Unreachable(UnreachableReason::NotFound));
    assert_eq!(visits.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_page_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let browser = FixtureBrowser::new().response(
        &profile("ghost"),
        FixturePage::NotFound("<html><body>gone</body></html>".to_string()),
    );

    let mut harvester = harvester(
        test_config(dir.path()),
        SqliteStorage::new_in_memory().unwrap(),
        browser,
        FixtureMedia::default(),
    );
    let target = FeedTarget::profile(profile("ghost"), "ghost", 7);
    let outcome = harvester.scrape_feed(&target, 10, RescrapeMode::None).await;

    assert_eq!(outcome, ScrapeOutcome::Unreachable(UnreachableReason::NotFound));
}

#[tokio::test]
async fn test_empty_timeline_is_nothing_new() {
    let dir = tempfile::tempdir().unwrap();
    let empty = r#"<html><body><div class="timeline-none">No items found</div></body></html>"#;
    let browser = FixtureBrowser::new().page(&profile("jack"), empty.to_string());
    let visits = browser.visits();

    let mut harvester = harvester(
        test_config(dir.path()),
        SqliteStorage::new_in_memory().unwrap(),
        browser,
        FixtureMedia::default(),
    );
    let outcome = harvester.scrape_feed(&jack_feed(), 10, RescrapeMode::None).await;

    assert_eq!(outcome, ScrapeOutcome::NothingNew);
    assert_eq!(visits.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_layout_exhausts_attempts() {
    let dir = tempfile::tempdir().unwrap();
    let browser = FixtureBrowser::new().page(
        &profile("jack"),
        "<html><body><p>Loading...</p></body></html>".to_string(),
    );
    let visits = browser.visits();

    let config = test_config(dir.path());
    let max_attempts = config.harvester.max_attempts as usize;
    let mut harvester = harvester(
        config,
        SqliteStorage::new_in_memory().unwrap(),
        browser,
        FixtureMedia::default(),
    );
    let outcome = harvester.scrape_feed(&jack_feed(), 10, RescrapeMode::None).await;

    assert_eq!(
        outcome,
        ScrapeOutcome::Unreachable(UnreachableReason::AttemptsExhausted)
    );
    assert_eq!(visits.lock().unwrap().len(), max_attempts);

    let saved = std::fs::read_dir(dir.path()).unwrap().count();
    assert!(saved >= 1);
}

#[tokio::test]
async fn test_missing_pagination_keeps_partial_results() {
    let dir = tempfile::tempdir().unwrap();
    let page = timeline_page(&[Post::new("2", "two"), Post::new("1", "one")], None)
        .replace("No more items", "");

    let mut harvester = harvester(
        test_config(dir.path()),
        SqliteStorage::new_in_memory().unwrap(),
        FixtureBrowser::new().page(&profile("jack"), page),
        FixtureMedia::default(),
    );
    let outcome = harvester.scrape_feed(&jack_feed(), 10, RescrapeMode::None).await;

    match outcome {
        ScrapeOutcome::Harvested { items, partial } => {
            assert!(partial);
            let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
            assert_eq!(ids, vec!["2", "1"]);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(harvester.storage().count_records(Scope::Profile).unwrap(), 2);
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let dir = tempfile::tempdir().unwrap();
    let browser = FixtureBrowser::new()
        .page(&profile("jack"), timeline_page(&[Post::new("1", "one")], None));
    let visits = browser.visits();

    let mut harvester = harvester(
        test_config(dir.path()),
        SqliteStorage::new_in_memory().unwrap(),
        browser,
        FixtureMedia::default(),
    );
    harvester.cancel_flag().store(true, Ordering::Relaxed);
    let outcome = harvester.scrape_feed(&jack_feed(), 10, RescrapeMode::None).await;

    assert_eq!(outcome, ScrapeOutcome::Unreachable(UnreachableReason::Cancelled));
    assert!(visits.lock().unwrap().is_empty());
}

// ===== Media =====

#[tokio::test]
async fn test_oversize_media_stored_as_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let page = timeline_page(&[Post::new("1", "look").media(&["/pic/big.jpg"])], None);

    let mut harvester = harvester(
        test_config(dir.path()),
        SqliteStorage::new_in_memory().unwrap().with_document_limit(500),
        FixtureBrowser::new().page(&profile("jack"), page),
        FixtureMedia::default().file("/pic/big.jpg", 2_000),
    );
    let outcome = harvester.scrape_feed(&jack_feed(), 10, RescrapeMode::None).await;
    assert_eq!(ids(outcome), vec!["1"]);

    let bundles = harvester.storage().load_attachments().unwrap();
    assert_eq!(bundles.len(), 1);
    assert_eq!(bundles[0].owner_ref_id, "1");
    assert_eq!(bundles[0].media[0].payload, MediaPayload::Placeholder);
    assert_eq!(bundles[0].media[0].size_bytes, 2_000);
}

#[tokio::test]
async fn test_quote_media_stored_under_quote() {
    let dir = tempfile::tempdir().unwrap();
    let page = timeline_page(
        &[Post::new("1", "see this").quoting("77", &["/pic/quoted.jpg"])],
        None,
    );

    let mut harvester = harvester(
        test_config(dir.path()),
        SqliteStorage::new_in_memory().unwrap(),
        FixtureBrowser::new().page(&profile("jack"), page),
        FixtureMedia::default().file("/pic/quoted.jpg", 10),
    );
    harvester.scrape_feed(&jack_feed(), 10, RescrapeMode::None).await;

    let bundles = harvester.storage().load_attachments().unwrap();
    assert_eq!(bundles.len(), 1);
    assert!(bundles[0].is_quote);
    assert_eq!(bundles[0].owner_ref_id, "77");
    assert_eq!(bundles[0].media[0].url, format!("{}/pic/quoted.jpg", BASE));

    let stored = harvester.storage().load_records(Scope::Profile).unwrap();
    let quote = stored[0].quote.as_ref().unwrap();
    assert_eq!(quote.id.as_deref(), Some("77"));
}

#[tokio::test]
async fn test_media_not_stored_again_after_failed_record_write() {
    let dir = tempfile::tempdir().unwrap();
    let page = timeline_page(&[Post::new("1", "look").media(&["/pic/a.jpg"])], None)
        .replace(r#"<h2 class="timeline-end">No more items</h2>"#, "");

    let mut harvester = harvester(
        test_config(dir.path()),
        RejectingStorage::new(),
        FixtureBrowser::new().page(&profile("jack"), page),
        FixtureMedia::default().file("/pic/a.jpg", 10),
    );
    let outcome = harvester.scrape_feed(&jack_feed(), 10, RescrapeMode::None).await;

    assert_eq!(
        outcome,
        ScrapeOutcome::Unreachable(UnreachableReason::AttemptsExhausted)
    );
    let bundles = harvester.storage().load_attachments().unwrap();
    assert_eq!(bundles.len(), 1);
    assert_eq!(bundles[0].owner_ref_id, "1");
}

#[tokio::test]
async fn test_attachments_disabled_fetches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let page = timeline_page(&[Post::new("1", "look").media(&["/pic/a.jpg"])], None);

    let mut config = test_config(dir.path());
    config.harvester.attachments = false;
    let mut harvester = harvester(
        config,
        SqliteStorage::new_in_memory().unwrap(),
        FixtureBrowser::new().page(&profile("jack"), page),
        FixtureMedia::default().file("/pic/a.jpg", 10),
    );
    harvester.scrape_feed(&jack_feed(), 10, RescrapeMode::None).await;

    assert_eq!(harvester.storage().count_attachments().unwrap(), 0);
    assert_eq!(harvester.storage().count_records(Scope::Profile).unwrap(), 1);
}

// ===== Threads =====

#[tokio::test]
async fn test_walk_recurses_into_replies_with_replies() {
    let dir = tempfile::tempdir().unwrap();
    let root = Post::new("1", "root").replies(2);

    let browser = FixtureBrowser::new()
        .page(&profile("jack"), timeline_page(&[Post::new("1", "root").replies(2)], None))
        .page(
            &status("jack", "1"),
            thread_page(
                &root,
                &[
                    Post::new("11", "busy reply").by("amy").replies(3),
                    Post::new("12", "quiet reply").by("bob"),
                ],
            ),
        )
        .page(
            &status("amy", "11"),
            thread_page(
                &Post::new("11", "busy reply").by("amy").replies(3),
                &[Post::new("111", "nested").by("cat")],
            ),
        );
    let visits = browser.visits();

    let mut config = test_config(dir.path());
    config.harvester.max_comments = 10;
    config.harvester.deep = true;
    let mut harvester = harvester(
        config,
        SqliteStorage::new_in_memory().unwrap(),
        browser,
        FixtureMedia::default(),
    );

    let request = HarvestRequest {
        profile: "jack".to_string(),
        post: None,
    };
    let summary = run_harvest(&mut harvester, &request).await;

    assert_eq!(summary.posts_stored, 1);
    assert_eq!(summary.comments_stored, 3);
    assert_eq!(summary.threads_visited, 2);
    assert_eq!(
        *visits.lock().unwrap(),
        vec![profile("jack"), status("jack", "1"), status("amy", "11")]
    );

    let comments = harvester.storage().load_records(Scope::Thread).unwrap();
    let nested = comments.iter().find(|c| c.id == "111").unwrap();
    assert_eq!(nested.depth, 2);

    let ancestry = nested.ancestry.as_ref().unwrap();
    assert_eq!(ancestry.parent_ref_id, "11");
    assert_eq!(ancestry.parent_url, status("amy", "11"));
    assert_eq!(ancestry.root_ref_id, "1");
    assert_eq!(ancestry.root_url, status("jack", "1"));

    let direct = comments.iter().find(|c| c.id == "12").unwrap();
    assert_eq!(direct.depth, 1);
    assert_eq!(harvester.storage().max_stored_depth().unwrap(), Some(2));
}

#[tokio::test]
async fn test_shallow_walk_stops_at_direct_replies() {
    let dir = tempfile::tempdir().unwrap();

    let browser = FixtureBrowser::new()
        .page(&profile("jack"), timeline_page(&[Post::new("1", "root").replies(1)], None))
        .page(
            &status("jack", "1"),
            thread_page(
                &Post::new("1", "root").replies(1),
                &[Post::new("11", "busy reply").by("amy").replies(3)],
            ),
        );
    let visits = browser.visits();

    let mut config = test_config(dir.path());
    config.harvester.max_comments = 10;
    let mut harvester = harvester(
        config,
        SqliteStorage::new_in_memory().unwrap(),
        browser,
        FixtureMedia::default(),
    );

    let request = HarvestRequest {
        profile: "jack".to_string(),
        post: None,
    };
    let summary = run_harvest(&mut harvester, &request).await;

    assert_eq!(summary.comments_stored, 1);
    assert_eq!(visits.lock().unwrap().len(), 2);
    assert_eq!(harvester.storage().max_stored_depth().unwrap(), Some(1));
}

#[tokio::test]
async fn test_deep_walk_respects_max_depth() {
    let dir = tempfile::tempdir().unwrap();

    let browser = FixtureBrowser::new()
        .page(&profile("jack"), timeline_page(&[Post::new("1", "root").replies(1)], None))
        .page(
            &status("jack", "1"),
            thread_page(
                &Post::new("1", "root").replies(1),
                &[Post::new("11", "level one").by("amy").replies(1)],
            ),
        )
        .page(
            &status("amy", "11"),
            thread_page(
                &Post::new("11", "level one").by("amy").replies(1),
                &[Post::new("111", "level two").by("bob").replies(1)],
            ),
        )
        .page(
            &status("bob", "111"),
            thread_page(
                &Post::new("111", "level two").by("bob").replies(1),
                &[Post::new("1111", "level three").by("cat")],
            ),
        );
    let visits = browser.visits();

    let mut config = test_config(dir.path());
    config.harvester.max_comments = 10;
    config.harvester.deep = true;
    config.harvester.max_depth = 2;
    let mut harvester = harvester(
        config,
        SqliteStorage::new_in_memory().unwrap(),
        browser,
        FixtureMedia::default(),
    );

    let request = HarvestRequest {
        profile: "jack".to_string(),
        post: None,
    };
    let summary = run_harvest(&mut harvester, &request).await;

    assert_eq!(summary.comments_stored, 2);
    assert!(!visits.lock().unwrap().contains(&status("bob", "111")));
    assert_eq!(harvester.storage().max_stored_depth().unwrap(), Some(2));
}

#[tokio::test]
async fn test_failed_branch_does_not_stop_siblings() {
    let dir = tempfile::tempdir().unwrap();

    let browser = FixtureBrowser::new()
        .page(
            &profile("jack"),
            timeline_page(
                &[Post::new("2", "second").replies(1), Post::new("1", "first").replies(1)],
                None,
            ),
        )
        .response(
            &status("jack", "2"),
            FixturePage::NotFound("<html><body>gone</body></html>".to_string()),
        )
        .page(
            &status("jack", "1"),
            thread_page(
                &Post::new("1", "first").replies(1),
                &[Post::new("11", "reply").by("amy")],
            ),
        );

    let mut config = test_config(dir.path());
    config.harvester.max_comments = 10;
    let mut harvester = harvester(
        config,
        SqliteStorage::new_in_memory().unwrap(),
        browser,
        FixtureMedia::default(),
    );

    let request = HarvestRequest {
        profile: "jack".to_string(),
        post: None,
    };
    let summary = run_harvest(&mut harvester, &request).await;

    assert_eq!(summary.posts_stored, 2);
    assert_eq!(summary.failed_threads, 1);
    assert_eq!(summary.comments_stored, 1);
}

#[tokio::test]
async fn test_single_post_mode_harvests_thread() {
    let dir = tempfile::tempdir().unwrap();
    let root = Post::new("1", "root").replies(2);

    let browser = FixtureBrowser::new().page(
        &status("jack", "1"),
        thread_page(
            &root,
            &[
                Post::new("11", "first reply").by("amy"),
                Post::new("12", "second reply").by("bob"),
            ],
        ),
    );

    let mut config = test_config(dir.path());
    config.harvester.max_comments = 10;
    let mut harvester = harvester(
        config,
        SqliteStorage::new_in_memory().unwrap(),
        browser,
        FixtureMedia::default(),
    );

    let request = HarvestRequest {
        profile: "@jack".to_string(),
        post: Some("1".to_string()),
    };
    let summary = run_harvest(&mut harvester, &request).await;

    assert_eq!(summary.posts_stored, 1);
    assert_eq!(summary.comments_stored, 2);
    assert!(!summary.target_unreachable);

    let posts = harvester.storage().load_records(Scope::Profile).unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, "1");
    assert_eq!(posts[0].timeline.as_deref(), Some("jack"));
}
