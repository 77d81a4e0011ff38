//! Runs against a real Redis when `GAMIFY_TEST_REDIS_URL` is set, otherwise
//! passes without doing anything.

use std::time::Duration;

use gamify_cache::{Cache, CachePolicy, RedisCache};

fn prefix() -> String {
    format!("gamify-test-{}", std::process::id())
}

async fn connect() -> Option<RedisCache> {
    let url = std::env::var("GAMIFY_TEST_REDIS_URL").ok()?;
    let policy = CachePolicy {
        timeout: Duration::from_millis(500),
        key_prefix: Some(prefix()),
    };
    Some(RedisCache::connect(&url, policy).await.expect("connect redis"))
}

#[tokio::test]
async fn round_trip_against_live_redis() {
    let Some(cache) = connect().await else {
        return;
    };

    cache
        .set_with_ttl("k", b"value", Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!(cache.get("k").await.unwrap(), Some(b"value".to_vec()));

    cache.delete(&["k".to_string()]).await.unwrap();
    assert_eq!(cache.get("k").await.unwrap(), None);
}

#[tokio::test]
async fn counter_against_live_redis() {
    let Some(cache) = connect().await else {
        return;
    };
    let key = "rl:counter";
    cache.delete(&[key.to_string()]).await.unwrap();

    let window = Duration::from_secs(30);
    assert_eq!(cache.increment_with_expiry(key, window).await.unwrap(), 1);
    assert_eq!(cache.increment_with_expiry(key, window).await.unwrap(), 2);

    cache.delete(&[key.to_string()]).await.unwrap();
}

#[tokio::test]
async fn counter_without_expiry_is_rearmed() {
    let Some(cache) = connect().await else {
        return;
    };
    let url = std::env::var("GAMIFY_TEST_REDIS_URL").unwrap();
    let client = redis::Client::open(url.as_str()).unwrap();
    let mut raw = client.get_multiplexed_async_connection().await.unwrap();

    // A counter whose first EXPIRE never landed.
    let key = "rl:orphan";
    let full_key = format!("{}:{key}", prefix());
    let _: () = redis::cmd("SET")
        .arg(&full_key)
        .arg(5)
        .query_async(&mut raw)
        .await
        .unwrap();

    let count = cache
        .increment_with_expiry(key, Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!(count, 6);

    let ttl: i64 = redis::cmd("TTL")
        .arg(&full_key)
        .query_async(&mut raw)
        .await
        .unwrap();
    assert!(ttl > 0 && ttl <= 30, "ttl was {ttl}");

    cache.delete(&[key.to_string()]).await.unwrap();
}
