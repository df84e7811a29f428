mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde_json::json;

use common::{MockBot, message};
use ripple_core::{BoxedBot, Event, Message, StateContext, StorageError};
use ripple_framework::{
    DispatchError, Dispatcher, Extra, FilterArgs, FilterError, FilterOutcome, RegistryKind,
    filter_fn,
};

fn bot() -> BoxedBot {
    Arc::new(MockBot::new())
}

#[tokio::test]
async fn test_state_round_trip() {
    let seen = Arc::new(Mutex::new(Vec::<i64>::new()));
    let other = Arc::new(AtomicUsize::new(0));

    let mut dispatcher = Dispatcher::new(bot(), true);
    {
        let seen = seen.clone();
        dispatcher
            .on_message()
            .state("greeting")
            .handler(move |state: StateContext| {
                let seen = seen.clone();
                async move {
                    seen.lock().push(state.peer());
                }
            })
            .unwrap();
    }
    {
        let other = other.clone();
        dispatcher
            .on_message()
            .handler(move || {
                let other = other.clone();
                async move {
                    other.fetch_add(1, Ordering::SeqCst);
                }
            })
            .unwrap();
    }

    dispatcher
        .current_state(42)
        .unwrap()
        .set_state("greeting")
        .await
        .unwrap();

    assert!(dispatcher.route(Event::message_new(42, "hi")).await.unwrap());
    assert_eq!(*seen.lock(), vec![42]);
    assert_eq!(other.load(Ordering::SeqCst), 0);

    // A peer in the default state falls through to the catch-all.
    assert!(dispatcher.route(Event::message_new(7, "hi")).await.unwrap());
    assert_eq!(*seen.lock(), vec![42]);
    assert_eq!(other.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_handler_moves_peer_through_states() {
    async fn ask(state: StateContext) -> Result<(), StorageError> {
        state.set_state("asking").await
    }

    async fn answer(state: StateContext, message: Message) -> Result<(), StorageError> {
        let mut data = serde_json::Map::new();
        data.insert("answer".into(), json!(message.text));
        state.update_data(data).await?;
        state.finish().await
    }

    let mut dispatcher = Dispatcher::new(bot(), true);
    dispatcher.on_message().state("asking").handler(answer).unwrap();
    dispatcher.on_message().text("/ask").handler(ask).unwrap();

    dispatcher.route(Event::message_new(3, "/ask")).await.unwrap();
    assert_eq!(dispatcher.storage().get_state(3).await.unwrap(), "asking");

    dispatcher.route(Event::message_new(3, "blue")).await.unwrap();
    let state = dispatcher.current_state(3).unwrap();
    assert_eq!(state.get_state().await.unwrap(), "*");
    assert_eq!(state.get_data().await.unwrap()["answer"], json!("blue"));
}

#[tokio::test]
async fn test_at_most_one_handler_per_event() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut dispatcher = Dispatcher::new(bot(), true);

    for _ in 0..3 {
        let calls = calls.clone();
        dispatcher
            .on_message()
            .text_startswith("/")
            .handler(move || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                }
            })
            .unwrap();
    }

    dispatcher.route(Event::message_new(1, "/go")).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_text_filter_with_ignore_case() {
    let hits = Arc::new(Mutex::new(Vec::<String>::new()));
    let mut dispatcher = Dispatcher::new(bot(), false);
    {
        let hits = hits.clone();
        dispatcher
            .on_message()
            .text_startswith(vec!["/cmd"])
            .ignore_case()
            .handler(move |message: Message| {
                let hits = hits.clone();
                async move {
                    hits.lock().push(message.text);
                }
            })
            .unwrap();
    }

    assert!(dispatcher.route(Event::message_new(1, "/CMD now")).await.unwrap());
    assert!(!dispatcher.route(Event::message_new(1, "nope /cmd")).await.unwrap());
    assert_eq!(*hits.lock(), vec!["/CMD now".to_string()]);
}

#[tokio::test]
async fn test_unknown_argument_fails_at_registration() {
    let mut dispatcher = Dispatcher::new(bot(), true);

    let err = dispatcher
        .message_handler(|| async {}, FilterArgs::new().arg("bogus", "x"), [])
        .unwrap_err();
    match err {
        FilterError::UnknownArgument { registry, keys } => {
            assert_eq!(registry, RegistryKind::Message);
            assert_eq!(keys, vec!["bogus".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }

    // Message-only filters are unknown on the event registry.
    assert!(dispatcher.on_event().text("hi").handler(|| async {}).is_err());
    assert!(dispatcher.registry(RegistryKind::Event).is_empty());
}

#[tokio::test]
async fn test_custom_filter_data_reaches_declared_params() {
    let seen = Arc::new(Mutex::new(None));
    let mut dispatcher = Dispatcher::new(bot(), true);
    {
        let seen = seen.clone();
        dispatcher
            .on_message()
            .filter(filter_fn(|event: &Event| {
                let words = event.text().map(|t| t.split_whitespace().count()).unwrap_or(0);
                FilterOutcome::AcceptWith(
                    Extra::new().with("words", json!(words)).with("noise", json!(true)),
                )
            }))
            .params(["words"])
            .handler(move |extra: Extra| {
                let seen = seen.clone();
                async move {
                    *seen.lock() = Some((extra.get_json("words").cloned(), extra.len()));
                }
            })
            .unwrap();
    }

    dispatcher.route(Event::message_new(1, "one two three")).await.unwrap();
    assert_eq!(*seen.lock(), Some((Some(json!(3)), 1)));
}

#[tokio::test]
async fn test_state_filter_with_disabled_storage_errors() {
    let mut dispatcher = Dispatcher::new(bot(), false);
    dispatcher
        .on_message()
        .state("greeting")
        .handler(|| async {})
        .unwrap();

    let err = dispatcher.route(Event::message_new(1, "x")).await.unwrap_err();
    assert!(matches!(
        err,
        DispatchError::Filter(FilterError::Storage(StorageError::Disabled))
    ));
}

#[tokio::test]
async fn test_event_registry_routes_by_type() {
    let joined = Arc::new(AtomicUsize::new(0));
    let mut dispatcher = Dispatcher::new(bot(), true);
    {
        let joined = joined.clone();
        dispatcher
            .on_event()
            .event_type(vec!["group_join"])
            .handler(move |event: Arc<Event>| {
                let joined = joined.clone();
                async move {
                    assert_eq!(event.object()["user_id"], json!(5));
                    joined.fetch_add(1, Ordering::SeqCst);
                }
            })
            .unwrap();
    }

    let join = Event::from_value(common::update("group_join", json!({ "user_id": 5 }))).unwrap();
    let leave = Event::from_value(common::update("group_leave", json!({ "user_id": 5 }))).unwrap();
    let msg = Event::from_value(message(5, "hi")).unwrap();

    assert!(dispatcher.route(join).await.unwrap());
    assert!(!dispatcher.route(leave).await.unwrap());
    assert!(!dispatcher.route(msg).await.unwrap());
    assert_eq!(joined.load(Ordering::SeqCst), 1);
}
