use std::sync::Arc;

use deepcopy_cli::client::ClientError;
use deepcopy_cli::core::{CancellationFlag, CloneError, Phase, create_error_context};
use deepcopy_cli::models::EntryId;
use deepcopy_cli::pipeline::{CloneOptions, Cloner};
use deepcopy_cli::test_utils::{EntryBuilder, InMemoryCmsClient, sample_toolkit};
use deepcopy_cli::utils::progress::{ChannelSink, ProgressEvent, ProgressSink};

fn id(value: &str) -> EntryId {
    EntryId::new(value)
}

/// A dangling link fails discovery and creates nothing
#[tokio::test]
async fn test_missing_entry_fails_discovery() {
    let client = InMemoryCmsClient::with_entries([
        EntryBuilder::new("root", "toolkit").links("modules", ["m1", "gone"]).build(),
        EntryBuilder::new("m1", "contentModule").build(),
    ]);

    let error = Cloner::new(&client).run(&id("root")).await.unwrap_err();

    let CloneError::Fetch {
        id: failed,
        source,
    } = &error
    else {
        panic!("expected fetch error, got {error:?}");
    };
    assert_eq!(failed, &id("gone"));
    assert!(matches!(source, ClientError::NotFound { .. }));
    assert_eq!(client.create_calls(), 0);

    let context = create_error_context(&error);
    assert!(context.details.unwrap().contains("'gone'"));
}

/// A missing root is reported as such
#[tokio::test]
async fn test_missing_root() {
    let client = InMemoryCmsClient::new();
    let error = Cloner::new(&client).run(&id("nope")).await.unwrap_err();
    assert!(matches!(error, CloneError::Fetch { ref id, .. } if id.as_str() == "nope"));
}

/// Network failures during discovery surface the client error
#[tokio::test]
async fn test_fetch_network_failure() {
    let client = InMemoryCmsClient::with_entries(sample_toolkit());
    client.fail_fetch("image-1");

    let error = Cloner::new(&client).run(&id("toolkit")).await.unwrap_err();

    assert!(matches!(error.client_error(), Some(ClientError::Network { .. })));
    assert_eq!(client.create_calls(), 0);
}

/// A failed creation reports the clones left behind
#[tokio::test]
async fn test_create_failure_lists_orphans() {
    let client = InMemoryCmsClient::with_entries(sample_toolkit());
    client.fail_create_of("imageMetadata");
    let options = CloneOptions {
        max_concurrency: 1,
        ..CloneOptions::default()
    };

    let error = Cloner::new(&client).with_options(options).run(&id("toolkit")).await.unwrap_err();

    let CloneError::Create {
        original_id,
        content_type,
        orphaned,
        source,
    } = &error
    else {
        panic!("expected create error, got {error:?}");
    };
    assert_eq!(original_id, &id("image-1"));
    assert_eq!(content_type, "imageMetadata");
    assert!(matches!(source, ClientError::Validation { .. }));

    // every successful creation is reported, nothing is relinked
    let mut created = client.created_ids();
    let mut reported = orphaned.clone();
    created.sort();
    reported.sort();
    assert_eq!(reported, created);
    assert_eq!(client.update_calls(), 0);

    if !orphaned.is_empty() {
        let details = create_error_context(&error).details.unwrap();
        assert!(details.contains(orphaned[0].as_str()));
    }
}

/// Creation stops after the first failure
#[tokio::test]
async fn test_create_failure_stops_further_creates() {
    let client = InMemoryCmsClient::with_entries(sample_toolkit());
    client.fail_create_of("toolkit");
    let options = CloneOptions {
        max_concurrency: 1,
        ..CloneOptions::default()
    };

    let error = Cloner::new(&client).with_options(options).run(&id("toolkit")).await.unwrap_err();

    // the root is planned first, so it is the only creation attempted
    assert!(matches!(error, CloneError::Create { ref orphaned, .. } if orphaned.is_empty()));
    assert_eq!(client.create_calls(), 1);
}

/// A failed update names both ids and keeps every clone
#[tokio::test]
async fn test_update_failure() {
    let client = InMemoryCmsClient::with_entries(sample_toolkit());
    client.fail_update_of("contentModule");

    let error = Cloner::new(&client).run(&id("toolkit")).await.unwrap_err();

    let CloneError::Update {
        original_id,
        clone_id,
        orphaned,
        source,
    } = &error
    else {
        panic!("expected update error, got {error:?}");
    };
    assert!(original_id.as_str().starts_with("module-"));
    assert!(client.created_ids().contains(clone_id));
    assert!(matches!(source, ClientError::Conflict { .. }));
    assert_eq!(client.create_calls(), 5);

    // every clone is left behind for the operator
    let mut created = client.created_ids();
    let mut reported = orphaned.clone();
    created.sort();
    reported.sort();
    assert_eq!(reported, created);
    let details = create_error_context(&error).details.unwrap();
    assert!(details.contains(clone_id.as_str()));
}

/// A failing phase is reported to the sink so bars can be torn down
#[tokio::test]
async fn test_failed_phase_is_reported() {
    let client = InMemoryCmsClient::with_entries(sample_toolkit());
    client.fail_update_of("contentModule");
    let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();

    Cloner::new(&client)
        .with_progress(Arc::new(ChannelSink::new(sender)))
        .run(&id("toolkit"))
        .await
        .unwrap_err();

    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    assert_eq!(
        events.last(),
        Some(&ProgressEvent::PhaseFailed {
            phase: Phase::Rewrite
        })
    );
    assert!(!events.contains(&ProgressEvent::PhaseFinished {
        phase: Phase::Rewrite,
        count: 5
    }));
}

/// Cancels the flag as soon as `phase` starts.
struct CancelOnPhase {
    phase: Phase,
    flag: CancellationFlag,
}

impl ProgressSink for CancelOnPhase {
    fn notify(&self, event: &ProgressEvent) {
        if matches!(event, ProgressEvent::PhaseStarted { phase } if *phase == self.phase) {
            self.flag.cancel();
        }
    }
}

/// Cancelling before creation leaves nothing behind
#[tokio::test]
async fn test_cancel_before_transform() {
    let client = InMemoryCmsClient::with_entries(sample_toolkit());
    let flag = CancellationFlag::new();

    let error = Cloner::new(&client)
        .with_cancellation(flag.clone())
        .with_progress(Arc::new(CancelOnPhase {
            phase: Phase::Transform,
            flag,
        }))
        .run(&id("toolkit"))
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        CloneError::Cancelled { phase: Phase::Transform, ref orphaned } if orphaned.is_empty()
    ));
    assert_eq!(client.create_calls(), 0);
}

/// Cancelling before relinking reports every clone
#[tokio::test]
async fn test_cancel_before_rewrite() {
    let client = InMemoryCmsClient::with_entries(sample_toolkit());
    let flag = CancellationFlag::new();

    let error = Cloner::new(&client)
        .with_cancellation(flag.clone())
        .with_progress(Arc::new(CancelOnPhase {
            phase: Phase::Rewrite,
            flag,
        }))
        .run(&id("toolkit"))
        .await
        .unwrap_err();

    assert!(matches!(error, CloneError::Cancelled { phase: Phase::Rewrite, .. }));
    assert_eq!(error.orphaned().len(), 5);
    assert_eq!(client.update_calls(), 0);
}

/// Cancelling up front fetches nothing
#[tokio::test]
async fn test_cancel_before_start() {
    let client = InMemoryCmsClient::with_entries(sample_toolkit());
    let flag = CancellationFlag::new();
    flag.cancel();

    let error = Cloner::new(&client).with_cancellation(flag).run(&id("toolkit")).await.unwrap_err();

    assert!(matches!(error, CloneError::Cancelled { phase: Phase::Discovery, .. }));
    assert_eq!(client.total_fetches(), 0);
}

/// Progress events arrive in phase order
#[tokio::test]
async fn test_progress_events() {
    let client = InMemoryCmsClient::with_entries(sample_toolkit());
    let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();
    let options = CloneOptions {
        progress_every: 1,
        ..CloneOptions::default()
    };

    Cloner::new(&client)
        .with_options(options)
        .with_progress(Arc::new(ChannelSink::new(sender)))
        .run(&id("toolkit"))
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    let phases: Vec<Phase> = events
        .iter()
        .filter_map(|event| match event {
            ProgressEvent::PhaseFinished {
                phase, ..
            } => Some(*phase),
            _ => None,
        })
        .collect();
    assert_eq!(phases, vec![Phase::Discovery, Phase::Transform, Phase::Rewrite]);
    assert!(events.contains(&ProgressEvent::Created {
        created: 5,
        total: 5
    }));
    assert!(events.contains(&ProgressEvent::PhaseFinished {
        phase: Phase::Discovery,
        count: 7
    }));
}
