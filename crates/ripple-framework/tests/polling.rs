mod common;

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;

use common::{MockBot, message, update};
use ripple_core::{BoxedBot, DecodeError, Message};
use ripple_framework::{DispatchError, Dispatcher, LongPollError, PollControl};

/// Records message texts; stops polling when it sees "bye".
fn recorder(
    log: Arc<Mutex<Vec<String>>>,
) -> impl Fn(Message, PollControl) -> std::future::Ready<()> + Clone + Send + Sync + 'static {
    move |message: Message, control: PollControl| {
        if message.text == "bye" {
            control.stop();
        }
        log.lock().push(message.text);
        std::future::ready(())
    }
}

#[tokio::test]
async fn test_batch_is_dispatched_in_order_until_stopped() {
    let bot = Arc::new(
        MockBot::new()
            .session("k", "https://lp", "1")
            .batch("2", vec![message(1, "a"), message(2, "b")])
            .batch("3", vec![message(1, "c"), message(1, "bye"), message(3, "after")]),
    );
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut dispatcher = Dispatcher::new(bot.clone(), true);
    dispatcher.on_message().handler(recorder(log.clone())).unwrap();

    dispatcher.start_polling().await.unwrap();

    // The stop request lands mid-batch; the rest of the batch still runs.
    assert_eq!(*log.lock(), vec!["a", "b", "c", "bye", "after"]);
    assert!(!dispatcher.is_polling());
    assert_eq!(*bot.acquisitions.lock(), 1);
}

#[tokio::test]
async fn test_failed_codes_are_recovered_inside_the_loop() {
    let bot = Arc::new(
        MockBot::new()
            .session("k1", "s1", "1")
            .session("k2", "s2", "50")
            .session("k3", "s3", "60")
            .poll(json!({ "failed": 1, "ts": "10" }))
            .poll(json!({ "failed": 2 }))
            .poll(json!({ "failed": 3 }))
            .batch("61", vec![message(1, "bye")]),
    );
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut dispatcher = Dispatcher::new(bot.clone(), true);
    dispatcher.on_message().handler(recorder(log.clone())).unwrap();

    dispatcher.start_polling().await.unwrap();

    assert_eq!(*log.lock(), vec!["bye"]);
    assert_eq!(*bot.acquisitions.lock(), 3);
}

#[tokio::test]
async fn test_second_start_is_rejected_while_polling() {
    let bot = Arc::new(MockBot::new().session("k", "s", "1").batch("2", vec![]));
    let dispatcher = Dispatcher::new(bot, true);

    let second = async {
        while !dispatcher.is_polling() {
            tokio::task::yield_now().await;
        }
        let result = dispatcher.start_polling().await;
        dispatcher.stop_polling();
        result
    };

    let (first, second) = tokio::join!(dispatcher.start_polling(), second);
    first.unwrap();
    assert!(matches!(second, Err(DispatchError::AlreadyPolling)));
    assert!(!dispatcher.is_polling());
}

#[tokio::test]
async fn test_handler_error_terminates_polling() {
    async fn failing(_message: Message) -> Result<(), std::io::Error> {
        Err(std::io::Error::other("handler exploded"))
    }

    let bot: BoxedBot = Arc::new(
        MockBot::new()
            .session("k", "s", "1")
            .batch("2", vec![message(1, "x")]),
    );
    let mut dispatcher = Dispatcher::new(bot, true);
    dispatcher.on_message().handler(failing).unwrap();

    let err = dispatcher.start_polling().await.unwrap_err();
    assert!(matches!(err, DispatchError::Handler(ref e) if e.to_string() == "handler exploded"));
    assert!(!dispatcher.is_polling());

    // The loop can be started again after it ended with an error.
    assert!(matches!(
        dispatcher.start_polling().await,
        Err(DispatchError::LongPoll(LongPollError::Transport(_)))
    ));
}

#[tokio::test]
async fn test_undecodable_update_propagates() {
    let bot: BoxedBot = Arc::new(
        MockBot::new()
            .session("k", "s", "1")
            .batch("2", vec![json!({ "object": {} })]),
    );
    let dispatcher = Dispatcher::new(bot, true);

    let err = dispatcher.start_polling().await.unwrap_err();
    assert!(matches!(err, DispatchError::Decode(DecodeError::MissingField("type"))));
}

#[tokio::test]
async fn test_protocol_error_ends_the_loop() {
    let bot: BoxedBot = Arc::new(
        MockBot::new()
            .session("k", "s", "1")
            .batch("2", vec![update("group_join", json!({ "user_id": 1 }))])
            .poll(json!({ "failed": 7 })),
    );
    let dispatcher = Dispatcher::new(bot, true);

    let err = dispatcher.start_polling().await.unwrap_err();
    assert!(matches!(err, DispatchError::LongPoll(LongPollError::Protocol(_))));
}
