//! Behaviour every [`Provider`] must exhibit, written once and run against
//! each backend.

use petit_core::{Alias, Provider, StorageError};
use std::sync::Arc;

fn alias(value: &str) -> Alias {
    Alias::new(value).expect("test alias is valid")
}

/// Store, look up, conflict and miss on a fresh provider.
pub async fn basic_contract<P: Provider + ?Sized>(provider: &P) {
    let url = "http://example.com";
    let example = alias("example");

    assert!(
        !provider.exists(&example).await.unwrap(),
        "fresh provider should not know the alias"
    );

    provider.store(url, &example).await.unwrap();

    assert!(provider.exists(&example).await.unwrap());
    assert_eq!(provider.get(&example).await.unwrap(), url);

    let err = provider
        .store("http://other.com", &example)
        .await
        .unwrap_err();
    assert!(
        matches!(err, StorageError::AlreadyExists(_)),
        "expected AlreadyExists, got {err:?}"
    );
    assert_eq!(
        provider.get(&example).await.unwrap(),
        url,
        "a rejected store must leave the first record unchanged"
    );

    let missing = alias("does-not-exist");
    let err = provider.get(&missing).await.unwrap_err();
    assert!(
        matches!(err, StorageError::NotFound(_)),
        "expected NotFound, got {err:?}"
    );
    assert!(!provider.exists(&missing).await.unwrap());
}

/// Targets come back exactly as stored.
pub async fn round_trips<P: Provider + ?Sized>(provider: &P) {
    let cases = [
        ("https://example.com/path?query=1&other=two#frag", "query"),
        ("https://例え.jp/パス", "unicode"),
        ("mailto:someone@example.com", "opaque"),
        ("https://example.com/a%20b", "percent"),
    ];

    for (target, key) in cases {
        provider.store(target, &alias(key)).await.unwrap();
    }

    for (target, key) in cases {
        assert_eq!(provider.get(&alias(key)).await.unwrap(), target);
        assert!(provider.exists(&alias(key)).await.unwrap());
    }
}

/// `writers` concurrent stores of one alias: exactly one wins and the
/// persisted target is the winner's.
pub async fn concurrent_store<P: Provider>(provider: Arc<P>, writers: usize) {
    let contested = alias("contested");
    let mut handles = Vec::with_capacity(writers);

    for i in 0..writers {
        let provider = Arc::clone(&provider);
        let contested = contested.clone();
        handles.push(tokio::spawn(async move {
            let target = format!("https://example{i}.com");
            let result = provider.store(&target, &contested).await;
            (target, result)
        }));
    }

    let mut winners = Vec::new();
    let mut conflicts = 0;
    for handle in handles {
        let (target, result) = handle.await.expect("store task panicked");
        match result {
            Ok(()) => winners.push(target),
            Err(StorageError::AlreadyExists(_)) => conflicts += 1,
            Err(other) => panic!("unexpected store error: {other:?}"),
        }
    }

    assert_eq!(winners.len(), 1, "exactly one store must succeed");
    assert_eq!(conflicts, writers - 1);
    assert_eq!(provider.get(&contested).await.unwrap(), winners[0]);
}

/// Stores of distinct aliases from many tasks all succeed.
pub async fn concurrent_distinct_stores<P: Provider>(provider: Arc<P>, writers: usize) {
    let mut handles = Vec::with_capacity(writers);

    for i in 0..writers {
        let provider = Arc::clone(&provider);
        handles.push(tokio::spawn(async move {
            provider
                .store(&format!("https://example{i}.com"), &alias(&format!("code-{i:03}")))
                .await
        }));
    }

    for handle in handles {
        handle.await.expect("store task panicked").unwrap();
    }

    for i in 0..writers {
        let target = provider.get(&alias(&format!("code-{i:03}"))).await.unwrap();
        assert_eq!(target, format!("https://example{i}.com"));
    }
}
