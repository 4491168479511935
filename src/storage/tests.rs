//! Tests for the storage contract across both backends.

use super::*;
use crate::remote::{KvService, NamespaceConfig, ServiceError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// In-process stand-in for the external service that counts every call.
#[derive(Default)]
struct FakeService {
    entries: Mutex<HashMap<(String, String), Vec<u8>>>,
    namespaces: Mutex<HashMap<String, NamespaceConfig>>,
    calls: AtomicUsize,
    fail_with: Mutex<Option<ServiceError>>,
    reject_namespaces: bool,
    delay: Option<Duration>,
}

impl FakeService {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail_next(&self, err: ServiceError) {
        *self.fail_with.lock().unwrap() = Some(err);
    }

    fn raw_put(&self, namespace: &str, key: &str, payload: &[u8]) {
        self.entries
            .lock()
            .unwrap()
            .insert((namespace.to_string(), key.to_string()), payload.to_vec());
    }

    fn raw_len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    fn record_call(&self) -> ServiceResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.fail_with.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn enter(&self) -> ServiceResult<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.record_call()
    }
}

#[async_trait::async_trait]
impl KvService for FakeService {
    async fn ensure_namespace(
        &self,
        name: &str,
        config: &NamespaceConfig,
    ) -> ServiceResult<()> {
        self.record_call()?;
        if self.reject_namespaces {
            return Err(ServiceError::Rejected {
                status: 400,
                message: "namespaces disabled".to_string(),
            });
        }
        self.namespaces
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_insert_with(|| config.clone());
        Ok(())
    }

    async fn fetch(&self, namespace: &str, key: &str) -> ServiceResult<Vec<u8>> {
        self.enter().await?;
        self.entries
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), key.to_string()))
            .cloned()
            .ok_or(ServiceError::KeyNotFound)
    }

    async fn upsert(
        &self,
        namespace: &str,
        key: &str,
        payload: Vec<u8>,
    ) -> ServiceResult<()> {
        self.enter().await?;
        self.raw_put(namespace, key, &payload);
        Ok(())
    }

    async fn remove(&self, namespace: &str, key: &str) -> ServiceResult<()> {
        self.enter().await?;
        self.entries
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), key.to_string()))
            .map(drop)
            .ok_or(ServiceError::KeyNotFound)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Profile {
    name: String,
    visits: u32,
}

fn profile(name: &str, visits: u32) -> Profile {
    Profile {
        name: name.to_string(),
        visits,
    }
}

async fn durable<V>(service: Arc<FakeService>) -> DurableStore<V, FakeService>
where
    V: Serialize + serde::de::DeserializeOwned + Send + 'static,
{
    DurableStore::with_service("profiles", service, &NamespaceConfig::default())
        .await
        .unwrap()
}

/// Exercises the contract through the trait only.
async fn check_contract<S: Storage<Profile>>(store: &mut S) {
    let ctx = Context::background();

    // get before put
    assert!(store.get(&ctx, "p1").await.unwrap_err().is_absent());
    assert_eq!(store.get_optional(&ctx, "p1").await.unwrap(), None);

    // put then get
    store.put(&ctx, "p1", profile("ada", 1)).await.unwrap();
    assert_eq!(store.get(&ctx, "p1").await.unwrap(), profile("ada", 1));

    // idempotent put
    store.put(&ctx, "p1", profile("ada", 1)).await.unwrap();
    assert_eq!(store.get(&ctx, "p1").await.unwrap(), profile("ada", 1));

    // last write wins
    store.put(&ctx, "p1", profile("ada", 2)).await.unwrap();
    assert_eq!(store.get(&ctx, "p1").await.unwrap(), profile("ada", 2));

    // delete of absent key
    store.delete(&ctx, "never-set").await.unwrap();

    // delete then get
    store.delete(&ctx, "p1").await.unwrap();
    assert!(store.get(&ctx, "p1").await.unwrap_err().is_absent());

    // repeated delete
    store.delete(&ctx, "p1").await.unwrap();
}

#[tokio::test]
async fn test_volatile_contract() {
    let mut store = VolatileStore::<Profile>::new();
    check_contract(&mut store).await;
}

#[tokio::test]
async fn test_durable_contract() {
    let mut store = durable::<Profile>(Arc::new(FakeService::default())).await;
    check_contract(&mut store).await;
}

#[tokio::test]
async fn test_boxed_trait_objects() {
    let service = Arc::new(FakeService::default());
    let stores: Vec<Box<dyn Storage<Profile>>> = vec![
        Box::new(VolatileStore::<Profile>::new()),
        Box::new(durable::<Profile>(service).await),
    ];

    for mut store in stores {
        check_contract(&mut store).await;
    }
}

#[tokio::test]
async fn test_volatile_string_scenario() {
    let mut store = VolatileStore::<String>::new();
    let ctx = Context::background();

    store.put(&ctx, "a", "1".to_string()).await.unwrap();
    store.put(&ctx, "b", "2".to_string()).await.unwrap();
    assert_eq!(store.get(&ctx, "a").await.unwrap(), "1");

    store.delete(&ctx, "a").await.unwrap();
    assert!(store.get(&ctx, "a").await.unwrap_err().is_absent());
    assert_eq!(store.get(&ctx, "b").await.unwrap(), "2");
}

#[tokio::test]
async fn test_durable_encode_failure_skips_service() {
    let service = Arc::new(FakeService::default());
    let mut store = durable::<HashMap<(u8, u8), String>>(service.clone()).await;
    let calls_after_open = service.calls();

    let mut value = HashMap::new();
    value.insert((1, 2), "unencodable".to_string());

    let err = store
        .put(&Context::background(), "k", value)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Encode);
    assert_eq!(service.calls(), calls_after_open);
    assert_eq!(service.raw_len(), 0);
}

#[tokio::test]
async fn test_durable_non_finite_float_is_encode_error() {
    let service = Arc::new(FakeService::default());
    let mut plain = durable::<f64>(service.clone()).await;
    let mut optional = durable::<Option<f64>>(service.clone()).await;
    let ctx = Context::background();
    let calls_after_open = service.calls();

    let err = plain.put(&ctx, "f", f64::NAN).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Encode);

    let err = optional
        .put(&ctx, "f", Some(f64::INFINITY))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Encode);
    assert!(optional.get(&ctx, "f").await.unwrap_err().is_absent());

    assert_eq!(service.calls(), calls_after_open + 1);
    assert_eq!(service.raw_len(), 0);
}

#[tokio::test]
async fn test_durable_missing_key_is_absent_not_backend() {
    let service = Arc::new(FakeService::default());
    let store = durable::<Profile>(service).await;

    let err = store
        .get(&Context::background(), "missing")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Absent);
}

#[tokio::test]
async fn test_durable_corrupt_payload_is_decode_error() {
    let service = Arc::new(FakeService::default());
    let store = durable::<Profile>(service.clone()).await;

    service.raw_put("profiles", "broken", br#"{"name":"ada","vis"#);
    let err = store
        .get(&Context::background(), "broken")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);

    service.raw_put("profiles", "wrong-shape", br#"{"title":"x"}"#);
    let err = store
        .get(&Context::background(), "wrong-shape")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
}

#[tokio::test]
async fn test_durable_backend_errors_propagate() {
    let service = Arc::new(FakeService::default());
    let mut store = durable::<Profile>(service.clone()).await;
    let ctx = Context::background();

    service.fail_next(ServiceError::Unavailable("maintenance".into()));
    let err = store.get(&ctx, "p").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Backend);
    assert!(err.is_retryable());

    service.fail_next(ServiceError::Rejected {
        status: 413,
        message: "quota exceeded".into(),
    });
    let err = store.put(&ctx, "p", profile("x", 0)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Backend);
    assert!(!err.is_retryable());

    service.fail_next(ServiceError::Unavailable("maintenance".into()));
    let err = store.delete(&ctx, "p").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Backend);

    // get_optional only swallows absence
    service.fail_next(ServiceError::Unavailable("maintenance".into()));
    assert!(store.get_optional(&ctx, "p").await.is_err());
}

#[tokio::test]
async fn test_durable_each_operation_is_one_call() {
    let service = Arc::new(FakeService::default());
    let mut store = durable::<Profile>(service.clone()).await;
    let ctx = Context::background();
    let base = service.calls();

    store.put(&ctx, "p", profile("a", 1)).await.unwrap();
    store.put(&ctx, "p", profile("a", 1)).await.unwrap();
    store.get(&ctx, "p").await.unwrap();
    store.delete(&ctx, "p").await.unwrap();

    assert_eq!(service.calls() - base, 4);
}

#[tokio::test]
async fn test_namespace_failure_at_construction() {
    let service = Arc::new(FakeService {
        reject_namespaces: true,
        ..FakeService::default()
    });

    let err = DurableStore::<Profile, _>::with_service("p", service, &NamespaceConfig::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Namespace);
}

#[tokio::test]
async fn test_cancelled_put_never_reaches_service() {
    let service = Arc::new(FakeService::default());
    let mut store = durable::<Profile>(service.clone()).await;
    let base = service.calls();

    let token = CancellationToken::new();
    token.cancel();
    let ctx = Context::with_token(token);

    let err = store.put(&ctx, "p", profile("a", 1)).await.unwrap_err();
    assert!(matches!(
        err,
        StorageError::Cancelled {
            reason: CancelReason::Cancelled,
            ..
        }
    ));
    assert_eq!(service.calls(), base);
    assert_eq!(service.raw_len(), 0);
}

#[tokio::test]
async fn test_deadline_aborts_slow_service() {
    let service = Arc::new(FakeService {
        delay: Some(Duration::from_secs(5)),
        ..FakeService::default()
    });
    let mut store = durable::<Profile>(service.clone()).await;
    let ctx = Context::with_timeout(Duration::from_millis(20));

    let err = store.put(&ctx, "p", profile("a", 1)).await.unwrap_err();
    assert!(matches!(
        err,
        StorageError::Cancelled {
            reason: CancelReason::DeadlineExceeded,
            ..
        }
    ));
    assert_eq!(service.raw_len(), 0);
}

#[tokio::test]
async fn test_clones_share_service() {
    let service = Arc::new(FakeService::default());
    let mut writer = durable::<Profile>(service.clone()).await;
    let reader = writer.clone();
    let ctx = Context::background();

    writer.put(&ctx, "shared", profile("b", 3)).await.unwrap();
    assert_eq!(reader.get(&ctx, "shared").await.unwrap(), profile("b", 3));
    assert_eq!(reader.name(), "profiles");
    assert!(Arc::ptr_eq(reader.service(), &service));
}

#[tokio::test]
async fn test_stores_are_isolated_by_namespace() {
    let service = Arc::new(FakeService::default());
    let mut first = durable::<Profile>(service.clone()).await;
    let second = DurableStore::<Profile, _>::with_service(
        "other",
        service.clone(),
        &NamespaceConfig::default(),
    )
    .await
    .unwrap();
    let ctx = Context::background();

    first.put(&ctx, "k", profile("a", 1)).await.unwrap();
    assert!(second.get(&ctx, "k").await.unwrap_err().is_absent());
}
