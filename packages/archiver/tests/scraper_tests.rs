//! Scroll-engine session tests against the scripted browser double.

use archiver_core::testing::ScriptedBrowser;
use archiver_core::{FollowingCollector, ScrollConfig, ScrollEngine, ThreadCollector};

fn tweet_cell(path: &str) -> String {
    format!(
        r#"<div data-testid="cellInnerDiv">
             <article data-testid="tweet">
               <a href="{}"><time>t</time></a>
               <div data-testid="tweetText">text of {}</div>
             </article>
           </div>"#,
        path, path
    )
}

fn discover_more_cell() -> String {
    r#"<div data-testid="cellInnerDiv"><h2>Discover more</h2></div>"#.to_string()
}

fn user_cell(handle: &str) -> String {
    format!(
        r#"<div data-testid="cellInnerDiv">
             <div data-testid="UserCell">
               <a href="/{handle}"><span>User {handle}</span></a>
             </div>
           </div>"#
    )
}

fn config(max_steps: u32) -> ScrollConfig {
    ScrollConfig {
        max_steps,
        presses_per_step: 2,
        settle_ms: 0,
        max_items: None,
        keyless: Default::default(),
    }
}

#[tokio::test]
async fn overlapping_snapshots_deduplicate_and_terminate() {
    // Feed grows by one tweet per scroll, then stalls.
    let browser = ScriptedBrowser::new(vec![
        tweet_cell("/a/status/1"),
        format!("{}{}", tweet_cell("/a/status/1"), tweet_cell("/a/status/2")),
    ]);

    let session = ScrollEngine::new(config(10))
        .run(&browser, "https://x.com/a", &ThreadCollector)
        .await
        .unwrap();

    assert_eq!(session.item_count, 2);
    assert_eq!(session.output[0].status_url, "/a/status/1");
    assert_eq!(session.output[1].status_url, "/a/status/2");

    // stalled feed: two consecutive zero-new steps end the session early
    assert_eq!(session.steps_taken, 3);
    assert_eq!(browser.open_count(), 1);
    assert_eq!(browser.close_count(), 1);
}

#[tokio::test]
async fn unchanged_feed_stops_after_two_zero_steps() {
    let browser = ScriptedBrowser::new(vec![tweet_cell("/a/status/1")]);

    let session = ScrollEngine::new(config(30))
        .run(&browser, "https://x.com/a", &ThreadCollector)
        .await
        .unwrap();

    assert_eq!(session.item_count, 1);
    assert_eq!(session.steps_taken, 2);
    // one batch of presses per step
    assert_eq!(browser.key_presses.load(std::sync::atomic::Ordering::SeqCst), 4);
}

#[tokio::test]
async fn max_steps_bounds_a_feed_that_never_stalls() {
    // Every snapshot brings a fresh tweet.
    let snapshots: Vec<String> = (1..=20)
        .map(|i| tweet_cell(&format!("/a/status/{}", i)))
        .collect();
    let browser = ScriptedBrowser::new(snapshots);

    let session = ScrollEngine::new(config(4))
        .run(&browser, "https://x.com/a", &ThreadCollector)
        .await
        .unwrap();

    assert_eq!(session.steps_taken, 4);
    assert_eq!(session.item_count, 5);
}

#[tokio::test]
async fn recommendations_below_the_marker_never_enter_the_result() {
    let browser = ScriptedBrowser::new(vec![
        // real feed first
        tweet_cell("/a/status/1"),
        // then the boundary renders, followed by recommendations
        format!(
            "{}{}{}",
            tweet_cell("/a/status/1"),
            discover_more_cell(),
            tweet_cell("/rec/status/9")
        ),
        // a later snapshot re-renders the recommendation above the fold
        format!("{}{}", tweet_cell("/rec/status/9"), tweet_cell("/rec/status/10")),
    ]);

    let session = ScrollEngine::new(config(10))
        .run(&browser, "https://x.com/a", &ThreadCollector)
        .await
        .unwrap();

    assert!(session.boundary_seen);
    assert_eq!(session.item_count, 1);
    assert_eq!(session.output[0].status_url, "/a/status/1");
}

#[tokio::test]
async fn item_cap_ends_the_session() {
    let browser = ScriptedBrowser::new(vec![format!(
        "{}{}{}",
        tweet_cell("/a/status/1"),
        tweet_cell("/a/status/2"),
        tweet_cell("/a/status/3")
    )]);

    let mut cfg = config(10);
    cfg.max_items = Some(2);
    let session = ScrollEngine::new(cfg)
        .run(&browser, "https://x.com/a", &ThreadCollector)
        .await
        .unwrap();

    assert_eq!(session.item_count, 2);
    assert_eq!(session.steps_taken, 0);
}

#[tokio::test]
async fn page_is_released_when_the_session_errors() {
    let browser =
        ScriptedBrowser::new(vec![tweet_cell("/a/status/1")]).fail_snapshots_after(1);

    let result = ScrollEngine::new(config(10))
        .run(&browser, "https://x.com/a", &ThreadCollector)
        .await;

    assert!(result.is_err());
    assert_eq!(browser.open_count(), 1);
    assert_eq!(browser.close_count(), 1);
}

#[tokio::test]
async fn following_lists_collect_by_handle() {
    let browser = ScriptedBrowser::new(vec![
        format!("{}{}", user_cell("ada"), user_cell("grace")),
        format!("{}{}", user_cell("grace"), user_cell("linus")),
    ]);

    let session = ScrollEngine::new(config(10))
        .run(&browser, "https://x.com/a/following", &FollowingCollector)
        .await
        .unwrap();

    let handles: Vec<&str> = session.output.iter().map(|u| u.handle.as_str()).collect();
    assert_eq!(handles, vec!["ada", "grace", "linus"]);
}
