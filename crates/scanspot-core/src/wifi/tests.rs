//! WiFi 模块测试
//!
//! 包含标签翻译、回调注册表和广播控制器生命周期的单元测试

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::wifi::mock::MockRadio;

// ============================================================================
// 标签翻译测试
// ============================================================================

#[test]
fn test_publisher_status_labels() {
    assert_eq!(publisher_status::name(publisher_status::CREATED), "CREATED");
    assert_eq!(publisher_status::name(publisher_status::STARTED), "STARTED");
    assert_eq!(publisher_status::name(publisher_status::STOPPED), "STOPPED");
    assert_eq!(publisher_status::name(publisher_status::ABORTED), "ABORTED");
}

#[test]
fn test_wifi_error_labels() {
    assert_eq!(wifi_error::name(wifi_error::SUCCESS), "SUCCESS");
    assert_eq!(
        wifi_error::name(wifi_error::RADIO_NOT_AVAILABLE),
        "RADIO_NOT_AVAILABLE"
    );
    assert_eq!(
        wifi_error::name(wifi_error::RESOURCE_IN_USE),
        "RESOURCE_IN_USE"
    );
}

#[test]
fn test_discoverability_labels() {
    assert_eq!(discoverability::name(discoverability::NONE), "NONE");
    assert_eq!(discoverability::name(discoverability::NORMAL), "NORMAL");
    assert_eq!(
        discoverability::name(discoverability::INTENSIVE),
        "INTENSIVE"
    );
}

#[test]
fn test_device_kind_labels() {
    assert_eq!(
        device_kind::name(device_kind::ASSOCIATION_ENDPOINT),
        "ASSOCIATION_ENDPOINT"
    );
    assert_eq!(device_kind::name(device_kind::DEVICE), "DEVICE");
}

/// 已定义取值的标签非空，未知取值返回哨兵而不是 panic
#[test]
fn test_unknown_raw_values_get_sentinel() {
    for status in 0..=3 {
        assert_ne!(publisher_status::name(status), "UNKNOWN");
        assert!(!publisher_status::name(status).is_empty());
    }

    assert_eq!(publisher_status::name(99), "UNKNOWN");
    assert_eq!(wifi_error::name(99), "UNKNOWN");
    assert_eq!(discoverability::name(99), "UNKNOWN");
    assert_eq!(device_kind::name(99), "UNKNOWN");
}

// ============================================================================
// 广播配置测试
// ============================================================================

#[test]
fn test_advertisement_config_default() {
    let config = AdvertisementConfig::default();

    assert_eq!(config.ssid, "DIRECT-SCANNER1");
    assert_eq!(config.passphrase, "test1234");
    assert_eq!(config.discoverability, discoverability::INTENSIVE);
    assert!(config.autonomous_group_owner);
}

// ============================================================================
// 回调注册测试
// ============================================================================

#[tokio::test]
async fn test_callback_dispatch() {
    let radio = MockRadio::new();
    let seen = Arc::new(AtomicUsize::new(0));

    let seen_by_callback = seen.clone();
    let token = radio.add_status_changed(Box::new(move |_| {
        seen_by_callback.fetch_add(1, Ordering::SeqCst);
    }));

    radio.configure(&AdvertisementConfig::default()).await.unwrap();
    radio.start().await.unwrap();
    radio.stop().await.unwrap();

    assert_eq!(seen.load(Ordering::SeqCst), 2); // STARTED + STOPPED
    radio.remove_status_changed(token).unwrap();
    assert!(!radio.has_callbacks());
}

/// 同一凭据注销两次必须报错，不能静默成功
#[test]
fn test_remove_twice_fails() {
    let radio = MockRadio::new();
    let token = radio.add_status_changed(Box::new(|_| {}));

    radio.remove_status_changed(token).unwrap();
    let err = radio.remove_status_changed(token).unwrap_err();
    assert!(matches!(err, HotspotError::UnknownToken(_)));
}

#[test]
fn test_connection_token_remove_twice_fails() {
    let radio = MockRadio::new();
    let token = radio.add_connection_requested(Box::new(|_| {}));

    radio.remove_connection_requested(token).unwrap();
    assert!(matches!(
        radio.remove_connection_requested(token),
        Err(HotspotError::UnknownToken(_))
    ));
}

// ============================================================================
// 广播控制器测试
// ============================================================================

#[tokio::test]
async fn test_start_stop_lifecycle() {
    let radio = Arc::new(MockRadio::new());
    let mut advertiser = ApAdvertiser::new(radio.clone());
    let (token, mut status_rx) = advertiser.subscribe_status(16);

    advertiser.configure(&AdvertisementConfig::default()).await.unwrap();
    advertiser.start().await.unwrap();
    assert_eq!(radio.status(), publisher_status::STARTED);

    advertiser.stop().await.unwrap();
    assert_eq!(radio.status(), publisher_status::STOPPED);

    let started = status_rx.recv().await.unwrap();
    assert_eq!(started.status, publisher_status::STARTED);
    assert_eq!(started.error, wifi_error::SUCCESS);
    let stopped = status_rx.recv().await.unwrap();
    assert_eq!(stopped.status, publisher_status::STOPPED);

    // 停止之后不再有事件泄漏
    assert!(status_rx.try_recv().is_err());
    advertiser.remove_status_changed(token).unwrap();
}

#[tokio::test]
async fn test_configure_after_start_rejected() {
    let radio = Arc::new(MockRadio::new());
    let mut advertiser = ApAdvertiser::new(radio);

    advertiser.configure(&AdvertisementConfig::default()).await.unwrap();
    advertiser.start().await.unwrap();

    let err = advertiser
        .configure(&AdvertisementConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<HotspotError>(),
        Some(HotspotError::ConfigureAfterStart)
    ));
}

#[tokio::test]
async fn test_double_start_rejected() {
    let radio = Arc::new(MockRadio::new());
    let mut advertiser = ApAdvertiser::new(radio.clone());

    advertiser.configure(&AdvertisementConfig::default()).await.unwrap();
    advertiser.start().await.unwrap();

    let err = advertiser.start().await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<HotspotError>(),
        Some(HotspotError::AlreadyStarted)
    ));
    assert_eq!(radio.start_calls(), 1);
}

#[tokio::test]
async fn test_start_without_configure_rejected() {
    let radio = Arc::new(MockRadio::new());
    let mut advertiser = ApAdvertiser::new(radio);

    let err = advertiser.start().await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<HotspotError>(),
        Some(HotspotError::NotConfigured)
    ));
}

/// start 从未成功过时 stop 是空操作，不会打到硬件
#[tokio::test]
async fn test_stop_without_start_is_noop() {
    let radio = Arc::new(MockRadio::new());
    let mut advertiser = ApAdvertiser::new(radio.clone());

    advertiser.stop().await.unwrap();
    assert_eq!(radio.stop_calls(), 0);
    assert_eq!(radio.status(), publisher_status::CREATED);
}

/// 硬件级启动失败以 ABORTED 事件送达，start 本身不报错
#[tokio::test]
async fn test_aborted_start_surfaces_as_event() {
    let radio = Arc::new(MockRadio::new().fail_start_with(wifi_error::RADIO_NOT_AVAILABLE));
    let mut advertiser = ApAdvertiser::new(radio.clone());
    let (_token, mut status_rx) = advertiser.subscribe_status(16);

    advertiser.configure(&AdvertisementConfig::default()).await.unwrap();
    advertiser.start().await.unwrap();

    let event = status_rx.recv().await.unwrap();
    assert_eq!(event.status, publisher_status::ABORTED);
    assert_eq!(event.error, wifi_error::RADIO_NOT_AVAILABLE);

    // ABORTED 是终态，stop 不再迁移状态
    advertiser.stop().await.unwrap();
    assert_eq!(radio.status(), publisher_status::ABORTED);
}

// ============================================================================
// 连接监听器测试
// ============================================================================

#[tokio::test]
async fn test_connection_events_forwarded() {
    let radio = Arc::new(MockRadio::new());
    let watcher = ConnectionWatcher::new(radio.clone());
    let (token, mut connection_rx) = watcher.subscribe(16);

    let event = ConnectionEvent {
        device_name: "scanner-7".to_string(),
        device_id: "usb#vid_1234".to_string(),
        device_kind: device_kind::ASSOCIATION_ENDPOINT,
    };
    radio.push_connection(event.clone());

    assert_eq!(connection_rx.recv().await.unwrap(), event);

    watcher.remove(token).unwrap();
    assert!(matches!(
        watcher.remove(token),
        Err(HotspotError::UnknownToken(_))
    ));
    assert!(!radio.has_callbacks());
}
