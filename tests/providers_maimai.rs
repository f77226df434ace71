// tests/providers_maimai.rs
use hotboard::error::FetchError;
use hotboard::ingest::providers::maimai::{
    MaimaiAdapter, MaimaiFixture, COMPANY_LABEL, FEED_LABEL,
};
use hotboard::ingest::SourceAdapter;

const FEED_JSON: &str = include_str!("fixtures/maimai_feed.json");
const COMPANY_JSON: &str = include_str!("fixtures/maimai_company.json");
const REJECTED_JSON: &str = include_str!("fixtures/maimai_rejected.json");

fn adapter(feed: Option<&str>, company: Option<&str>) -> MaimaiAdapter {
    MaimaiAdapter::from_fixture(
        "https://maimai.cn",
        MaimaiFixture {
            feed_json: feed.map(str::to_string),
            company_json: company.map(str::to_string),
        },
    )
}

#[tokio::test]
async fn maimai_feed_and_company_lists_are_merged() {
    let items = adapter(Some(FEED_JSON), Some(COMPANY_JSON))
        .fetch()
        .await
        .expect("maimai ok");
    // blank feed post dropped
    assert_eq!(items.len(), 4);

    let feed: Vec<_> = items.iter().filter(|i| i.source_label == FEED_LABEL).collect();
    assert_eq!(feed.len(), 2);
    assert!(feed[0].title.starts_with("[腾讯] 听说组里"));
    assert_eq!(feed[0].hot_score, 320 + 210);
    assert_eq!(
        feed[0].url.as_deref(),
        Some("https://maimai.cn/web/gossip_detail/28600001")
    );

    // long post: 80 chars plus an ellipsis, no company prefix
    assert_eq!(feed[1].title.chars().count(), 83);
    assert!(feed[1].title.ends_with("..."));

    let company: Vec<_> = items.iter().filter(|i| i.source_label == COMPANY_LABEL).collect();
    assert_eq!(company[0].title, "[字节跳动] 年终奖发放时间确定");
    assert_eq!(company[0].hot_score, 880);
    assert_eq!(company[1].title, "新办公园区启用");
}

#[tokio::test]
async fn maimai_rejection_on_both_channels_is_an_error() {
    let err = adapter(Some(REJECTED_JSON), Some(REJECTED_JSON))
        .fetch()
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Rejected(_)), "got {err:?}");
}

#[tokio::test]
async fn maimai_one_rejected_channel_still_returns_the_other() {
    let items = adapter(Some(REJECTED_JSON), Some(COMPANY_JSON))
        .fetch()
        .await
        .expect("company list survives");
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| i.source_label == COMPANY_LABEL));
}
